//! Multi-endpoint node RPC client.
//!
//! [`MultiClient`] holds an ordered set of node endpoints, connects them
//! concurrently, and serves each request from whichever endpoint is healthy,
//! failing over to the next candidate when one errors or times out.

pub mod client;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod pool;
pub mod rpc;
#[cfg(test)]
mod test_util;
pub mod types;

pub use client::MultiClient;
pub use config::{ClientConfig, SelectionPolicy};
pub use error::{CoreError, RpcError};
pub use types::{ConnectOutcome, EndpointStatus, Health, Params, RequestEnvelope, ResponseEnvelope};
