use std::collections::HashSet;
use std::sync::Arc;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::{CoreError, RpcError};
use crate::pool::EndpointPool;
use crate::rpc::{Connector, RpcMethod};
use crate::types::{
    ConnectOutcome, EndpointFailure, EndpointStatus, Params, RequestEnvelope, ResponseEnvelope,
};

// ==============================================================================
// MultiClient
// ==============================================================================

/// Node RPC client spread over several endpoints.
///
/// Construct one per process and pass it (by reference or `Arc`) to whatever
/// needs to query the network. Every logical request either succeeds against
/// some live endpoint or fails with the per-endpoint causes attached.
pub struct MultiClient {
    pool: EndpointPool,
    config: ClientConfig,
    max_attempts: usize,
}

impl MultiClient {
    /// Build a client over `addresses` (in priority order).
    ///
    /// Fails with `Configuration` if the list is empty, an address is
    /// rejected by the connector, or `config` is invalid. Nothing is
    /// connected until [`initialize_all`](Self::initialize_all).
    pub fn new<I, S>(
        addresses: I,
        connector: Arc<dyn Connector>,
        config: ClientConfig,
    ) -> Result<Self, CoreError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let addresses: Vec<String> = addresses.into_iter().map(Into::into).collect();
        if addresses.is_empty() {
            return Err(CoreError::Configuration(
                "at least one endpoint address is required".to_owned(),
            ));
        }
        config.validate()?;
        for address in &addresses {
            connector.validate_address(address)?;
        }

        let max_attempts = config.attempt_limit(addresses.len());
        let pool = EndpointPool::new(
            addresses,
            connector,
            config.selection,
            config.connect_timeout,
        );

        Ok(Self {
            pool,
            config,
            max_attempts,
        })
    }

    pub fn pool(&self) -> &EndpointPool {
        &self.pool
    }

    pub fn endpoint_status(&self) -> Vec<EndpointStatus> {
        self.pool.status()
    }

    /// Connect every endpoint concurrently.
    ///
    /// Succeeds with per-endpoint outcomes as long as one endpoint connected;
    /// endpoints that are down are logged.
    pub async fn initialize_all(&self) -> Result<Vec<ConnectOutcome>, CoreError> {
        let outcomes = self.pool.initialize_all().await?;
        for outcome in &outcomes {
            if let Some(error) = &outcome.error {
                warn!(endpoint = %outcome.address, %error, "endpoint unavailable at startup");
            }
        }
        let connected = outcomes.iter().filter(|o| o.is_connected()).count();
        info!(connected, configured = outcomes.len(), "endpoint pool initialized");
        Ok(outcomes)
    }

    /// Issue `method` with `payload`, failing over across endpoints.
    pub async fn request(
        &self,
        method: &str,
        payload: Params,
    ) -> Result<ResponseEnvelope, CoreError> {
        self.run_failover(RequestEnvelope::new(method, payload), None)
            .await
    }

    /// Like [`request`](Self::request), but no attempt runs past `deadline`.
    ///
    /// An attempt cut short by the deadline still counts as that endpoint's
    /// failure; the call ends with `DeadlineExceeded` once the deadline has
    /// passed.
    pub async fn request_with_deadline(
        &self,
        method: &str,
        payload: Params,
        deadline: Instant,
    ) -> Result<ResponseEnvelope, CoreError> {
        self.run_failover(RequestEnvelope::new(method, payload), Some(deadline))
            .await
    }

    /// Typed call: serialise `params`, issue `M::NAME`, decode the response.
    ///
    /// A response that does not decode is reported as `InvalidResponse` and
    /// is not retried elsewhere.
    pub async fn call<M: RpcMethod>(&self, params: &M::Params) -> Result<M::Response, CoreError> {
        let payload = params_to_object(M::NAME, params)?;
        let response = self.request(M::NAME, payload).await?;
        response.decode()
    }

    /// Disconnect every endpoint. The client can be re-initialized later.
    pub async fn shutdown(&self) {
        self.pool.disconnect_all().await;
    }

    async fn run_failover(
        &self,
        request: RequestEnvelope,
        deadline: Option<Instant>,
    ) -> Result<ResponseEnvelope, CoreError> {
        let start = self.pool.next_rotation();
        let mut excluded: HashSet<String> = HashSet::new();
        let mut failures: Vec<EndpointFailure> = Vec::new();
        let mut attempts = 0;

        loop {
            let Some(attempt_timeout) = self.attempt_timeout(deadline) else {
                return Err(CoreError::DeadlineExceeded {
                    method: request.method,
                    failures,
                });
            };

            let endpoint = match self
                .pool
                .pick_endpoint_from(start, &excluded, attempt_timeout)
                .await
            {
                Ok(endpoint) => endpoint,
                // A failed reconnect counts as that endpoint's attempt.
                Err(CoreError::NoHealthyEndpoint { failures: probed }) if !probed.is_empty() => {
                    for failure in probed {
                        excluded.insert(failure.address.clone());
                        failures.push(failure);
                        attempts += 1;
                    }
                    if let Some(err) =
                        self.stop_after_failure(&request.method, attempts, deadline, &mut failures)
                    {
                        return Err(err);
                    }
                    continue;
                }
                Err(CoreError::NoHealthyEndpoint { .. }) => {
                    if deadline_passed(deadline) {
                        return Err(CoreError::DeadlineExceeded {
                            method: request.method,
                            failures,
                        });
                    }
                    return Err(CoreError::NoHealthyEndpoint { failures });
                }
                Err(other) => return Err(other),
            };

            // The probe inside selection may have used up the remaining time.
            let Some(attempt_timeout) = self.attempt_timeout(deadline) else {
                return Err(CoreError::DeadlineExceeded {
                    method: request.method,
                    failures,
                });
            };

            debug!(
                endpoint = %endpoint.address(),
                rpc.method = %request.method,
                attempt = attempts + 1,
                max_attempts = self.max_attempts,
                "dispatching request"
            );
            match endpoint.send(&request, attempt_timeout).await {
                Ok(response) => return Ok(response),
                Err(err) => {
                    let address = endpoint.address().to_owned();
                    excluded.insert(address.clone());
                    failures.push(into_failure(address, err));
                    attempts += 1;
                    if let Some(err) =
                        self.stop_after_failure(&request.method, attempts, deadline, &mut failures)
                    {
                        return Err(err);
                    }
                }
            }
        }
    }

    /// Terminal error once a failed attempt used up the deadline or the
    /// attempt budget, taking the collected failures with it.
    fn stop_after_failure(
        &self,
        method: &str,
        attempts: usize,
        deadline: Option<Instant>,
        failures: &mut Vec<EndpointFailure>,
    ) -> Option<CoreError> {
        if deadline_passed(deadline) {
            return Some(CoreError::DeadlineExceeded {
                method: method.to_owned(),
                failures: std::mem::take(failures),
            });
        }
        if attempts >= self.max_attempts {
            warn!(
                rpc.method = %method,
                attempts,
                "request failed on every candidate endpoint"
            );
            return Some(CoreError::RequestExhausted {
                method: method.to_owned(),
                failures: std::mem::take(failures),
            });
        }
        None
    }

    /// Timeout for the next attempt, or `None` once the deadline has passed.
    fn attempt_timeout(&self, deadline: Option<Instant>) -> Option<std::time::Duration> {
        match deadline {
            None => Some(self.config.request_timeout),
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                (!remaining.is_zero()).then(|| remaining.min(self.config.request_timeout))
            }
        }
    }
}

fn deadline_passed(deadline: Option<Instant>) -> bool {
    deadline.is_some_and(|deadline| Instant::now() >= deadline)
}

fn into_failure(address: String, err: CoreError) -> EndpointFailure {
    let cause = match err {
        CoreError::Request { source, .. } | CoreError::Connection { source, .. } => source,
        CoreError::NotConnected { .. } => {
            RpcError::Closed("endpoint became unhealthy before the request was sent".to_owned())
        }
        other => RpcError::InvalidResponse(other.to_string()),
    };
    EndpointFailure { address, cause }
}

fn params_to_object<P: serde::Serialize>(method: &str, params: &P) -> Result<Params, CoreError> {
    let invalid = |message: String| CoreError::InvalidRequest {
        method: method.to_owned(),
        message,
    };
    match serde_json::to_value(params).map_err(|e| invalid(e.to_string()))? {
        serde_json::Value::Object(map) => Ok(map),
        serde_json::Value::Null => Ok(Params::new()),
        other => Err(invalid(format!(
            "params must serialize to a JSON object, got {other}"
        ))),
    }
}
