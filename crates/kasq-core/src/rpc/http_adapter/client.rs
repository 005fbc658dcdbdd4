use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::{header, Url};
use tracing::{debug, trace};

use crate::error::{CoreError, RpcError};
use crate::types::{Params, RequestEnvelope};

use super::super::{Connection, Connector};
use super::connection::{parse_connection, resolve_auth};
use super::protocol::{check_response_id, parse_jsonrpc_error, JsonRpcRequest, JsonRpcResponse};

/// Method issued by `connect` to prove a node is answering.
const DEFAULT_PROBE_METHOD: &str = "ping";

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Opens JSON-RPC connections to node endpoints over HTTP(S).
///
/// All connections share one `reqwest` client (and its socket pool). A
/// connection is only handed out after the probe method succeeds.
pub struct HttpConnector {
    client: reqwest::Client,
    auth: Option<(String, String)>,
    requests_per_second: Option<NonZeroU32>,
    probe_method: String,
    next_id: Arc<AtomicU64>,
}

impl HttpConnector {
    /// Create a connector.
    ///
    /// `user` and `pass` enable basic auth and must be given together. If
    /// `requests_per_second` is set, each connection is rate-limited per
    /// outbound request.
    pub fn new(
        user: Option<&str>,
        pass: Option<&str>,
        requests_per_second: Option<u32>,
    ) -> Result<Self, CoreError> {
        let auth = resolve_auth(user, pass)?;

        let requests_per_second = match requests_per_second {
            None => None,
            Some(limit) => Some(NonZeroU32::new(limit).ok_or_else(|| {
                CoreError::Configuration("requests_per_second must be at least 1".to_owned())
            })?),
        };

        // Per-attempt deadlines are enforced by the endpoint; the client only
        // bounds the TCP/TLS handshake.
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(4)
            .tcp_nodelay(true)
            .build()
            .map_err(|e| CoreError::Configuration(format!("build HTTP client: {e}")))?;

        Ok(Self {
            client,
            auth,
            requests_per_second,
            probe_method: DEFAULT_PROBE_METHOD.to_owned(),
            next_id: Arc::new(AtomicU64::new(initial_request_id())),
        })
    }

    /// Use a different method for the connect probe.
    pub fn with_probe_method(mut self, method: impl Into<String>) -> Self {
        self.probe_method = method.into();
        self
    }
}

#[async_trait]
impl Connector for HttpConnector {
    fn validate_address(&self, address: &str) -> Result<(), CoreError> {
        parse_connection(address).map(|_| ())
    }

    async fn connect(&self, address: &str) -> Result<Box<dyn Connection>, RpcError> {
        let url = parse_connection(address).map_err(|e| RpcError::Closed(e.to_string()))?;
        let mut connection = HttpConnection {
            client: self.client.clone(),
            url,
            auth: self.auth.clone(),
            limiter: self
                .requests_per_second
                .map(|limit| RateLimiter::direct(Quota::per_second(limit))),
            next_id: Arc::clone(&self.next_id),
        };

        let probe = RequestEnvelope::new(self.probe_method.clone(), Params::new());
        connection.call(&probe).await?;
        debug!(endpoint = %connection.url, probe = %self.probe_method, "probe succeeded");

        Ok(Box::new(connection))
    }
}

struct HttpConnection {
    client: reqwest::Client,
    url: Url,
    auth: Option<(String, String)>,
    limiter: Option<DirectRateLimiter>,
    next_id: Arc<AtomicU64>,
}

impl HttpConnection {
    async fn wait_for_rate_limit(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }
}

#[async_trait]
impl Connection for HttpConnection {
    async fn call(&mut self, request: &RequestEnvelope) -> Result<serde_json::Value, RpcError> {
        self.wait_for_rate_limit().await;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!(
            endpoint = %self.url,
            rpc.id = id,
            rpc.method = %request.method,
            rpc.params = request.payload.len(),
            "rpc call"
        );
        let req = JsonRpcRequest {
            jsonrpc: "2.0",
            id,
            method: &request.method,
            params: &request.payload,
        };

        let mut builder = self
            .client
            .post(self.url.clone())
            .header(header::CONTENT_TYPE, "application/json")
            .json(&req);
        if let Some((ref user, ref pass)) = self.auth {
            builder = builder.basic_auth(user, Some(pass));
        }

        let response = builder.send().await?;
        let status = response.status();

        let body = response.text().await?;
        debug!(rpc.id = id, rpc.method = %request.method, %status, body_len = body.len(), "rpc response");
        trace!(rpc.id = id, rpc.method = %request.method, body = %body, "rpc response body");

        let decoded: JsonRpcResponse = serde_json::from_str(&body).map_err(|e| {
            RpcError::InvalidResponse(format!(
                "decode JSON-RPC response (HTTP {status}): {e}; body={body}"
            ))
        })?;
        check_response_id(id, decoded.id.as_ref())?;

        if let Some(err) = decoded.error.filter(|err| !err.is_null()) {
            return Err(parse_jsonrpc_error(err));
        }

        Ok(decoded.result.unwrap_or(serde_json::Value::Null))
    }
}

fn initial_request_id() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_zero_rate_limit() {
        let err = HttpConnector::new(None, None, Some(0))
            .err()
            .expect("zero rate limit must be rejected");
        assert!(err.to_string().contains("requests_per_second"));
    }

    #[test]
    fn validate_address_rejects_unsupported_scheme() {
        let connector = HttpConnector::new(None, None, None).expect("connector must build");
        assert!(connector.validate_address("127.0.0.1:16110").is_ok());
        assert!(connector.validate_address("ws://127.0.0.1:17110").is_err());
    }

    #[tokio::test]
    async fn connect_to_closed_port_fails_with_transport_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
        let address = listener.local_addr().expect("local addr").to_string();
        drop(listener);

        let connector = HttpConnector::new(None, None, None).expect("connector must build");
        let err = connector
            .connect(&address)
            .await
            .err()
            .expect("nothing is listening");
        assert!(matches!(err, RpcError::Transport(_)));
    }
}
