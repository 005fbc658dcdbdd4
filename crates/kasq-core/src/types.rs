//! Shared value types for the multi-endpoint client.
//!
//! Contains the request/response envelopes that flow through endpoints,
//! the per-endpoint health enum, and the outcome/failure records used for
//! observability and aggregated error reporting.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{CoreError, RpcError};

/// Structured key-value request payload. Its shape is defined by the remote
/// method and is opaque to the client.
pub type Params = serde_json::Map<String, serde_json::Value>;

// ==============================================================================
// Health
// ==============================================================================

/// An endpoint's current believed reachability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Health {
    /// Never connected, or explicitly disconnected.
    Unconnected,
    Healthy,
    /// Last connect or request failed. May still hold a stale connection
    /// pending reconnection.
    Unhealthy,
}

impl std::fmt::Display for Health {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unconnected => write!(f, "unconnected"),
            Self::Healthy => write!(f, "healthy"),
            Self::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

// ==============================================================================
// Envelopes
// ==============================================================================

/// One logical call: a method name plus its payload. Built once per call and
/// reused unchanged across failover attempts.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestEnvelope {
    pub method: String,
    pub payload: Params,
}

impl RequestEnvelope {
    pub fn new(method: impl Into<String>, payload: Params) -> Self {
        Self {
            method: method.into(),
            payload,
        }
    }
}

/// A successful response, tagged with the method it answers and the endpoint
/// that served it. The payload is transported as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseEnvelope {
    pub method: String,
    pub endpoint: String,
    pub payload: serde_json::Value,
}

impl ResponseEnvelope {
    /// Decode the payload into a method-specific record.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, CoreError> {
        serde_json::from_value(self.payload.clone()).map_err(|e| CoreError::InvalidResponse {
            method: self.method.clone(),
            message: format!("{e} (served by {})", self.endpoint),
        })
    }
}

// ==============================================================================
// Observability Records
// ==============================================================================

/// Result of one endpoint's connection attempt during pool initialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectOutcome {
    pub address: String,
    /// `None` when the endpoint connected.
    pub error: Option<String>,
}

impl ConnectOutcome {
    pub fn is_connected(&self) -> bool {
        self.error.is_none()
    }
}

/// Point-in-time view of one endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndpointStatus {
    pub address: String,
    pub health: Health,
    pub last_error: Option<String>,
}

/// One endpoint's contribution to an aggregated request failure.
#[derive(Debug)]
pub struct EndpointFailure {
    pub address: String,
    pub cause: RpcError,
}
