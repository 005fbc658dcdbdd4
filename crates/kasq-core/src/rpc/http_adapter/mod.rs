//! JSON-RPC 2.0 over HTTP(S) transport for node endpoints.
//!
//! Implements [`Connector`](super::Connector) using `reqwest`, with optional
//! basic auth, optional per-endpoint request rate limiting, and a probe call
//! that proves a node is answering before its connection is handed out.

mod client;
mod connection;
mod protocol;

pub use client::HttpConnector;
