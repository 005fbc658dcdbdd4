use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::debug;

use crate::config::SelectionPolicy;
use crate::endpoint::Endpoint;
use crate::error::CoreError;
use crate::rpc::Connector;
use crate::types::{ConnectOutcome, EndpointFailure, EndpointStatus, Health};

// ==============================================================================
// Endpoint Pool
// ==============================================================================

/// The fixed, ordered set of endpoints plus the selection policy.
///
/// Configuration order is the failover priority. Endpoints are never added
/// or removed after construction.
pub struct EndpointPool {
    endpoints: Vec<Endpoint>,
    policy: SelectionPolicy,
    connect_timeout: Duration,
    rotation: AtomicUsize,
}

impl EndpointPool {
    pub fn new(
        addresses: Vec<String>,
        connector: Arc<dyn Connector>,
        policy: SelectionPolicy,
        connect_timeout: Duration,
    ) -> Self {
        let endpoints = addresses
            .into_iter()
            .map(|address| Endpoint::new(address, Arc::clone(&connector)))
            .collect();
        Self {
            endpoints,
            policy,
            connect_timeout,
            rotation: AtomicUsize::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    pub fn status(&self) -> Vec<EndpointStatus> {
        self.endpoints.iter().map(Endpoint::status).collect()
    }

    /// Connect every endpoint concurrently and wait for all of them.
    ///
    /// Outcomes come back in configuration order. Fails only when no
    /// endpoint connected at all.
    pub async fn initialize_all(&self) -> Result<Vec<ConnectOutcome>, CoreError> {
        let attempts = self.endpoints.iter().map(|endpoint| async move {
            let error = endpoint
                .connect(self.connect_timeout)
                .await
                .err()
                .map(|err| match err {
                    CoreError::Connection { source, .. } => source.to_string(),
                    other => other.to_string(),
                });
            ConnectOutcome {
                address: endpoint.address().to_owned(),
                error,
            }
        });
        let outcomes = join_all(attempts).await;

        if outcomes.iter().any(ConnectOutcome::is_connected) {
            Ok(outcomes)
        } else {
            Err(CoreError::NoReachableEndpoints { outcomes })
        }
    }

    /// Starting offset for one logical request. Fixed at zero under
    /// `Priority`; advances by one per call under `RoundRobin`.
    pub fn next_rotation(&self) -> usize {
        match self.policy {
            SelectionPolicy::Priority => 0,
            SelectionPolicy::RoundRobin if self.endpoints.is_empty() => 0,
            SelectionPolicy::RoundRobin => {
                self.rotation.fetch_add(1, Ordering::Relaxed) % self.endpoints.len()
            }
        }
    }

    /// Pick the first healthy endpoint in configuration order that is not
    /// excluded, probing one non-healthy endpoint if none is healthy.
    pub async fn pick_endpoint(&self, excluding: &HashSet<String>) -> Result<&Endpoint, CoreError> {
        self.pick_endpoint_from(0, excluding, self.connect_timeout)
            .await
    }

    /// Like [`pick_endpoint`](Self::pick_endpoint), but walks the endpoints
    /// starting at `start` (wrapping) and bounds the reconnect probe by
    /// `probe_timeout`.
    ///
    /// The probe targets only the first non-healthy candidate. If it fails,
    /// the error is `NoHealthyEndpoint` carrying the probe's cause; with no
    /// candidate left at all, `failures` is empty.
    pub async fn pick_endpoint_from(
        &self,
        start: usize,
        excluding: &HashSet<String>,
        probe_timeout: Duration,
    ) -> Result<&Endpoint, CoreError> {
        let candidates = self.candidates(start, excluding);
        if let Some(endpoint) = candidates
            .iter()
            .copied()
            .find(|endpoint| endpoint.health() == Health::Healthy)
        {
            return Ok(endpoint);
        }

        let Some(&probe) = candidates.first() else {
            return Err(CoreError::NoHealthyEndpoint {
                failures: Vec::new(),
            });
        };

        debug!(endpoint = %probe.address(), "no healthy endpoint; probing reconnect");
        match probe.connect(probe_timeout.min(self.connect_timeout)).await {
            Ok(()) => Ok(probe),
            Err(CoreError::Connection { address, source }) => Err(CoreError::NoHealthyEndpoint {
                failures: vec![EndpointFailure {
                    address,
                    cause: source,
                }],
            }),
            Err(other) => Err(other),
        }
    }

    /// Shut down every connection.
    pub async fn disconnect_all(&self) {
        join_all(self.endpoints.iter().map(|endpoint| endpoint.disconnect())).await;
    }

    /// Endpoints in selection order from `start`, minus the excluded ones.
    fn candidates(&self, start: usize, excluding: &HashSet<String>) -> Vec<&Endpoint> {
        let len = self.endpoints.len();
        (0..len)
            .map(|offset| &self.endpoints[(start + offset) % len])
            .filter(|endpoint| !excluding.contains(endpoint.address()))
            .collect()
    }
}
