//! Reusable node fixtures and harness helpers for tests, demos, and
//! benchmarks.
//!
//! Everything here is plain public API; nothing is test-gated, so
//! integration tests and `demos/` can share the same fixtures.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::event_bus::Event;
use crate::node::{Node, NodeContext, NodeError, NodeUpdate};
use crate::state::StateSnapshot;
use crate::utils::collections::new_fields_map;

/// Node that changes nothing. Useful as graph filler in topology tests.
pub struct NoopNode;

#[async_trait]
impl Node for NoopNode {
    async fn run(&self, _snap: StateSnapshot, _ctx: NodeContext) -> Result<NodeUpdate, NodeError> {
        Ok(NodeUpdate::none())
    }
}

/// Node that patches one fixed field with one fixed value.
pub struct SetFieldNode {
    pub key: String,
    pub value: Value,
}

impl SetFieldNode {
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

#[async_trait]
impl Node for SetFieldNode {
    async fn run(&self, _snap: StateSnapshot, _ctx: NodeContext) -> Result<NodeUpdate, NodeError> {
        Ok(NodeUpdate::patch().with_field(self.key.clone(), self.value.clone()))
    }
}

/// Node that reads an integer field (missing counts as zero) and patches it
/// back incremented. The canonical loop-body fixture.
pub struct IncrementNode {
    pub key: String,
}

impl IncrementNode {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

#[async_trait]
impl Node for IncrementNode {
    async fn run(&self, snap: StateSnapshot, _ctx: NodeContext) -> Result<NodeUpdate, NodeError> {
        let current = snap.get_i64(&self.key).unwrap_or(0);
        Ok(NodeUpdate::patch().with_field(self.key.clone(), json!(current + 1)))
    }
}

/// Node that replaces the whole field map with a single field.
pub struct ReplaceWithNode {
    pub key: String,
    pub value: Value,
}

impl ReplaceWithNode {
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

#[async_trait]
impl Node for ReplaceWithNode {
    async fn run(&self, _snap: StateSnapshot, _ctx: NodeContext) -> Result<NodeUpdate, NodeError> {
        let mut fields = new_fields_map();
        fields.insert(self.key.clone(), self.value.clone());
        Ok(NodeUpdate::replace(fields))
    }
}

/// Node that always fails with a fixed message.
pub struct FailingNode {
    pub message: String,
}

impl FailingNode {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl Node for FailingNode {
    async fn run(&self, _snap: StateSnapshot, _ctx: NodeContext) -> Result<NodeUpdate, NodeError> {
        Err(NodeError::Other(self.message.clone()))
    }
}

/// Node that sleeps before patching a field, for concurrency and ordering
/// tests.
pub struct DelayedNode {
    pub millis: u64,
    pub key: String,
    pub value: Value,
}

impl DelayedNode {
    pub fn new(millis: u64, key: impl Into<String>, value: Value) -> Self {
        Self {
            millis,
            key: key.into(),
            value,
        }
    }
}

#[async_trait]
impl Node for DelayedNode {
    async fn run(&self, _snap: StateSnapshot, _ctx: NodeContext) -> Result<NodeUpdate, NodeError> {
        tokio::time::sleep(std::time::Duration::from_millis(self.millis)).await;
        Ok(NodeUpdate::patch().with_field(self.key.clone(), self.value.clone()))
    }
}

/// A context wired to a fresh channel, plus the receiver so the caller can
/// inspect emitted events.
pub fn test_context(node_id: &str, step: u64) -> (NodeContext, flume::Receiver<Event>) {
    let (tx, rx) = flume::unbounded();
    (
        NodeContext {
            node_id: node_id.to_string(),
            step,
            event_sender: tx,
        },
        rx,
    )
}

/// Snapshot with the given fields at version 1, bypassing `State`.
pub fn snapshot_of<I, K>(pairs: I) -> StateSnapshot
where
    I: IntoIterator<Item = (K, Value)>,
    K: Into<String>,
{
    StateSnapshot {
        fields: super::collections::fields_from(pairs),
        fields_version: 1,
    }
}
