use std::fmt::Write as _;
use std::time::Duration;

use crate::types::{ConnectOutcome, EndpointFailure};

/// A failure reported by one endpoint's transport.
///
/// These never reach callers of [`crate::MultiClient::request`] on their own;
/// they are wrapped with the endpoint address and aggregated by the failover
/// loop.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("server error {code}: {message}")]
    ServerError { code: i64, message: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("connection closed: {0}")]
    Closed(String),
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("failed to connect to {address}: {source}")]
    Connection {
        address: String,
        #[source]
        source: RpcError,
    },

    #[error("endpoint {address} is not connected")]
    NotConnected { address: String },

    #[error("request to {address} failed: {source}")]
    Request {
        address: String,
        #[source]
        source: RpcError,
    },

    #[error("no reachable endpoints: {}", render_outcomes(.outcomes))]
    NoReachableEndpoints { outcomes: Vec<ConnectOutcome> },

    #[error("no healthy endpoint available{}", render_failures_suffix(.failures))]
    NoHealthyEndpoint { failures: Vec<EndpointFailure> },

    #[error("request `{method}` failed on every candidate endpoint: {}", render_failures(.failures))]
    RequestExhausted {
        method: String,
        failures: Vec<EndpointFailure>,
    },

    #[error("deadline exceeded for request `{method}`{}", render_failures_suffix(.failures))]
    DeadlineExceeded {
        method: String,
        failures: Vec<EndpointFailure>,
    },

    #[error("invalid request for `{method}`: {message}")]
    InvalidRequest { method: String, message: String },

    #[error("invalid `{method}` response: {message}")]
    InvalidResponse { method: String, message: String },
}

impl CoreError {
    /// Per-endpoint causes carried by the aggregate failure variants.
    pub fn failures(&self) -> &[EndpointFailure] {
        match self {
            Self::NoHealthyEndpoint { failures }
            | Self::RequestExhausted { failures, .. }
            | Self::DeadlineExceeded { failures, .. } => failures,
            _ => &[],
        }
    }
}

fn render_failures(failures: &[EndpointFailure]) -> String {
    let mut out = String::new();
    for (i, failure) in failures.iter().enumerate() {
        if i > 0 {
            out.push_str("; ");
        }
        let _ = write!(out, "{}: {}", failure.address, failure.cause);
    }
    out
}

fn render_failures_suffix(failures: &[EndpointFailure]) -> String {
    if failures.is_empty() {
        String::new()
    } else {
        format!(" ({})", render_failures(failures))
    }
}

fn render_outcomes(outcomes: &[ConnectOutcome]) -> String {
    let mut out = String::new();
    for (i, outcome) in outcomes.iter().enumerate() {
        if i > 0 {
            out.push_str("; ");
        }
        match &outcome.error {
            Some(err) => {
                let _ = write!(out, "{}: {err}", outcome.address);
            }
            None => {
                let _ = write!(out, "{}: connected", outcome.address);
            }
        }
    }
    out
}
