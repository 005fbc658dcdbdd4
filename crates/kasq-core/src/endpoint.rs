use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::{CoreError, RpcError};
use crate::rpc::{Connection, Connector};
use crate::types::{EndpointStatus, Health, RequestEnvelope, ResponseEnvelope};

// ==============================================================================
// Endpoint
// ==============================================================================

/// One configured node address, its connection, and its health.
///
/// The connection sits behind an async mutex that is held for the whole of
/// a connect or send, so at most one request is in flight per endpoint and
/// concurrent callers queue. Health and the last error sit behind a separate
/// short-lived lock that is never held across an `.await`, so selection can
/// read them while a send is running.
pub struct Endpoint {
    address: String,
    connector: Arc<dyn Connector>,
    connection: tokio::sync::Mutex<Option<Box<dyn Connection>>>,
    state: Mutex<EndpointState>,
}

struct EndpointState {
    health: Health,
    last_error: Option<String>,
}

impl Endpoint {
    pub fn new(address: impl Into<String>, connector: Arc<dyn Connector>) -> Self {
        Self {
            address: address.into(),
            connector,
            connection: tokio::sync::Mutex::new(None),
            state: Mutex::new(EndpointState {
                health: Health::Unconnected,
                last_error: None,
            }),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn health(&self) -> Health {
        self.lock_state().health
    }

    pub fn last_error(&self) -> Option<String> {
        self.lock_state().last_error.clone()
    }

    pub fn status(&self) -> EndpointStatus {
        let state = self.lock_state();
        EndpointStatus {
            address: self.address.clone(),
            health: state.health,
            last_error: state.last_error.clone(),
        }
    }

    /// Establish the connection. A no-op while healthy.
    ///
    /// On failure the endpoint becomes unhealthy and any stale connection is
    /// kept until a later connect replaces it.
    pub async fn connect(&self, timeout: Duration) -> Result<(), CoreError> {
        if self.health() == Health::Healthy {
            return Ok(());
        }

        let mut connection = self.connection.lock().await;
        // Another caller may have reconnected while we waited for the lock.
        if self.health() == Health::Healthy && connection.is_some() {
            return Ok(());
        }

        debug!(endpoint = %self.address, "connecting");
        let result = match tokio::time::timeout(timeout, self.connector.connect(&self.address)).await
        {
            Ok(result) => result,
            Err(_) => Err(RpcError::Timeout(timeout)),
        };

        match result {
            Ok(conn) => {
                *connection = Some(conn);
                self.set_state(Health::Healthy, None);
                info!(endpoint = %self.address, "connected");
                Ok(())
            }
            Err(err) => {
                self.set_state(Health::Unhealthy, Some(err.to_string()));
                warn!(endpoint = %self.address, error = %err, "connect failed");
                Err(CoreError::Connection {
                    address: self.address.clone(),
                    source: err,
                })
            }
        }
    }

    /// Release the connection, if any. Safe to call repeatedly.
    pub async fn disconnect(&self) {
        let mut connection = self.connection.lock().await;
        if let Some(mut conn) = connection.take() {
            conn.close().await;
            debug!(endpoint = %self.address, "disconnected");
        }
        self.lock_state().health = Health::Unconnected;
    }

    /// Issue one request over the connection.
    ///
    /// Fails fast with `NotConnected` unless the endpoint is healthy. Any
    /// transport failure or timeout marks the endpoint unhealthy; the request
    /// is never retried here.
    pub async fn send(
        &self,
        request: &RequestEnvelope,
        timeout: Duration,
    ) -> Result<ResponseEnvelope, CoreError> {
        if self.health() != Health::Healthy {
            return Err(self.not_connected());
        }

        let mut guard = self.connection.lock().await;
        // Health can change while queued behind another send.
        if self.health() != Health::Healthy {
            return Err(self.not_connected());
        }
        let Some(connection) = guard.as_mut() else {
            return Err(self.not_connected());
        };

        let result = match tokio::time::timeout(timeout, connection.call(request)).await {
            Ok(result) => result,
            Err(_) => Err(RpcError::Timeout(timeout)),
        };

        match result {
            Ok(payload) => {
                self.lock_state().last_error = None;
                Ok(ResponseEnvelope {
                    method: request.method.clone(),
                    endpoint: self.address.clone(),
                    payload,
                })
            }
            Err(err) => {
                self.set_state(Health::Unhealthy, Some(err.to_string()));
                warn!(
                    endpoint = %self.address,
                    rpc.method = %request.method,
                    error = %err,
                    "request failed; endpoint marked unhealthy"
                );
                Err(CoreError::Request {
                    address: self.address.clone(),
                    source: err,
                })
            }
        }
    }

    fn not_connected(&self) -> CoreError {
        CoreError::NotConnected {
            address: self.address.clone(),
        }
    }

    fn set_state(&self, health: Health, last_error: Option<String>) {
        let mut state = self.lock_state();
        state.health = health;
        state.last_error = last_error;
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, EndpointState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
