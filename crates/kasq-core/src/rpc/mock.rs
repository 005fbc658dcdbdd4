use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use crate::error::RpcError;
use crate::types::RequestEnvelope;

use super::{Connection, Connector};

/// How a scripted node reacts to connects and calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockBehavior {
    /// Accepts connections and answers every call.
    Healthy,
    /// Refuses every connection attempt.
    Unreachable,
    /// Accepts connections but fails every call.
    FailRequests,
    /// Accepts connections but never answers a call.
    Hang,
    /// Never completes a connection attempt.
    Blackhole,
}

/// A scripted node backend for testing. Nodes are keyed by address and can
/// change behaviour mid-test; every connect and call is counted.
pub struct MockConnector {
    nodes: HashMap<String, Arc<MockNode>>,
}

struct MockNode {
    address: String,
    behavior: Mutex<MockBehavior>,
    response: Option<serde_json::Value>,
    delay: Option<Duration>,
    connects: AtomicUsize,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockNode {
    fn behavior(&self) -> MockBehavior {
        *self
            .behavior
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl MockConnector {
    pub fn builder() -> MockConnectorBuilder {
        MockConnectorBuilder { nodes: Vec::new() }
    }

    pub fn set_behavior(&self, address: &str, behavior: MockBehavior) {
        let node = self.node(address);
        *node
            .behavior
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = behavior;
    }

    pub fn connects(&self, address: &str) -> usize {
        self.node(address).connects.load(Ordering::SeqCst)
    }

    pub fn calls(&self, address: &str) -> usize {
        self.node(address).calls.load(Ordering::SeqCst)
    }

    /// Highest number of calls ever observed in flight at once on `address`.
    pub fn max_in_flight(&self, address: &str) -> usize {
        self.node(address).max_in_flight.load(Ordering::SeqCst)
    }

    fn node(&self, address: &str) -> &Arc<MockNode> {
        self.nodes
            .get(address)
            .unwrap_or_else(|| panic!("mock node `{address}` was not configured"))
    }
}

pub struct MockConnectorBuilder {
    nodes: Vec<(String, MockBehavior, Option<serde_json::Value>, Option<Duration>)>,
}

impl MockConnectorBuilder {
    pub fn node(mut self, address: &str, behavior: MockBehavior) -> Self {
        self.nodes.push((address.to_owned(), behavior, None, None));
        self
    }

    /// A healthy node answering every call with `response`.
    pub fn node_with_response(mut self, address: &str, response: serde_json::Value) -> Self {
        self.nodes
            .push((address.to_owned(), MockBehavior::Healthy, Some(response), None));
        self
    }

    /// A healthy node that takes `delay` to answer each call.
    pub fn slow_node(mut self, address: &str, delay: Duration) -> Self {
        self.nodes
            .push((address.to_owned(), MockBehavior::Healthy, None, Some(delay)));
        self
    }

    pub fn build(self) -> Arc<MockConnector> {
        let nodes = self
            .nodes
            .into_iter()
            .map(|(address, behavior, response, delay)| {
                let node = MockNode {
                    address: address.clone(),
                    behavior: Mutex::new(behavior),
                    response,
                    delay,
                    connects: AtomicUsize::new(0),
                    calls: AtomicUsize::new(0),
                    in_flight: AtomicUsize::new(0),
                    max_in_flight: AtomicUsize::new(0),
                };
                (address, Arc::new(node))
            })
            .collect();
        Arc::new(MockConnector { nodes })
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, address: &str) -> Result<Box<dyn Connection>, RpcError> {
        let Some(node) = self.nodes.get(address) else {
            return Err(RpcError::Closed(format!("unknown mock node {address}")));
        };
        node.connects.fetch_add(1, Ordering::SeqCst);
        match node.behavior() {
            MockBehavior::Unreachable => {
                Err(RpcError::Closed(format!("{address} refused connection")))
            }
            MockBehavior::Blackhole => std::future::pending().await,
            _ => Ok(Box::new(MockConnection {
                node: Arc::clone(node),
            })),
        }
    }
}

struct MockConnection {
    node: Arc<MockNode>,
}

#[async_trait]
impl Connection for MockConnection {
    async fn call(&mut self, request: &RequestEnvelope) -> Result<serde_json::Value, RpcError> {
        let node = &self.node;
        node.calls.fetch_add(1, Ordering::SeqCst);
        let current = node.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        node.max_in_flight.fetch_max(current, Ordering::SeqCst);

        let result = match node.behavior() {
            MockBehavior::Healthy => {
                if let Some(delay) = node.delay {
                    tokio::time::sleep(delay).await;
                }
                Ok(node.response.clone().unwrap_or_else(|| {
                    json!({
                        "served_by": node.address,
                        "method": request.method,
                        "payload": request.payload,
                    })
                }))
            }
            MockBehavior::Unreachable | MockBehavior::FailRequests => Err(RpcError::ServerError {
                code: -32603,
                message: format!("{} failed {}", node.address, request.method),
            }),
            MockBehavior::Hang | MockBehavior::Blackhole => std::future::pending().await,
        };

        node.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Params;

    #[tokio::test]
    async fn unreachable_node_refuses_connects_and_counts_them() {
        let connector = MockConnector::builder()
            .node("A", MockBehavior::Unreachable)
            .build();
        assert!(connector.connect("A").await.is_err());
        assert!(connector.connect("A").await.is_err());
        assert_eq!(connector.connects("A"), 2);
    }

    #[tokio::test]
    async fn healthy_node_echoes_request_by_default() {
        let connector = MockConnector::builder()
            .node("A", MockBehavior::Healthy)
            .build();
        let mut conn = connector.connect("A").await.expect("healthy node connects");
        let value = conn
            .call(&RequestEnvelope::new("getInfo", Params::new()))
            .await
            .expect("healthy node answers");
        assert_eq!(value["served_by"], "A");
        assert_eq!(value["method"], "getInfo");
        assert_eq!(connector.calls("A"), 1);
    }

    #[tokio::test]
    async fn behavior_can_change_after_connect() {
        let connector = MockConnector::builder()
            .node("A", MockBehavior::Healthy)
            .build();
        let mut conn = connector.connect("A").await.expect("healthy node connects");
        connector.set_behavior("A", MockBehavior::FailRequests);
        let err = conn
            .call(&RequestEnvelope::new("getInfo", Params::new()))
            .await
            .expect_err("node now fails calls");
        assert!(err.to_string().contains("A failed getInfo"));
    }
}
