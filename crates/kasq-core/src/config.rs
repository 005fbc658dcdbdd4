use std::time::Duration;

use crate::error::CoreError;

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Order in which the pool offers endpoints to a logical request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SelectionPolicy {
    /// Always start from the first configured endpoint, so a designated
    /// primary is used whenever it is healthy.
    #[default]
    Priority,
    /// Rotate the starting endpoint by one per logical request.
    RoundRobin,
}

/// Tunables for [`crate::MultiClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Upper bound on a single endpoint connect (including reconnect probes).
    pub connect_timeout: Duration,
    /// Upper bound on a single request attempt against one endpoint.
    pub request_timeout: Duration,
    /// Attempts per logical request. `None` means one per configured
    /// endpoint; larger values are clamped to the endpoint count.
    pub max_attempts: Option<usize>,
    pub selection: SelectionPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_attempts: None,
            selection: SelectionPolicy::Priority,
        }
    }
}

impl ClientConfig {
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    pub fn with_selection(mut self, selection: SelectionPolicy) -> Self {
        self.selection = selection;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), CoreError> {
        if self.connect_timeout.is_zero() {
            return Err(CoreError::Configuration(
                "connect timeout must be greater than zero".to_owned(),
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(CoreError::Configuration(
                "request timeout must be greater than zero".to_owned(),
            ));
        }
        if self.max_attempts == Some(0) {
            return Err(CoreError::Configuration(
                "max attempts must be at least 1".to_owned(),
            ));
        }
        Ok(())
    }

    /// Effective attempt bound for a pool of `endpoint_count` endpoints.
    /// Retrying an endpoint twice within one call is never useful, so the
    /// bound never exceeds the endpoint count.
    pub(crate) fn attempt_limit(&self, endpoint_count: usize) -> usize {
        self.max_attempts
            .unwrap_or(endpoint_count)
            .clamp(1, endpoint_count.max(1))
    }
}
