//! Node RPC transport abstraction.
//!
//! Defines the [`Connector`] / [`Connection`] traits the endpoint pool talks
//! to, the [`RpcMethod`] descriptors for typed calls, and an HTTP JSON-RPC
//! implementation ([`HttpConnector`]) plus a scripted test backend
//! (`mock::MockConnector`).

mod http_adapter;
pub mod methods;
#[cfg(test)]
pub mod mock;

pub use http_adapter::HttpConnector;
pub use methods::{
    BlockDagInfo, CoinSupply, GetBlockDagInfo, GetCoinSupply, GetInfo, NoParams, NodeInfo,
    RpcMethod,
};

use async_trait::async_trait;

use crate::error::{CoreError, RpcError};
use crate::types::RequestEnvelope;

/// Opens transports to node addresses.
///
/// One connector is shared by every endpoint in a pool. The wire format is
/// entirely the connector's business; the pool only sees connections that
/// succeed or fail.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Reject addresses this connector can never reach. Called once per
    /// address when the client is constructed.
    fn validate_address(&self, address: &str) -> Result<(), CoreError> {
        let _ = address;
        Ok(())
    }

    /// Establish a live connection to `address`. A returned connection must
    /// have proven the node is answering.
    async fn connect(&self, address: &str) -> Result<Box<dyn Connection>, RpcError>;
}

/// A live, exclusively owned transport to one node.
///
/// Callers hold `&mut` for the whole call, so a connection never carries two
/// requests at once.
#[async_trait]
pub trait Connection: Send {
    /// Issue one request and return the raw result payload.
    async fn call(&mut self, request: &RequestEnvelope) -> Result<serde_json::Value, RpcError>;

    /// Release transport resources. The default does nothing.
    async fn close(&mut self) {}
}
