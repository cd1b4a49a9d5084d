//! Node execution primitives: the [`Node`] trait, execution context, state
//! updates, and node-level errors.
//!
//! A node is an opaque unit of work. The engine hands it a
//! [`StateSnapshot`] and an execution context, and takes back a
//! [`NodeUpdate`] describing the fields the node wants changed. The engine
//! performs no retries and no sandboxing: a node error aborts the run.

use async_trait::async_trait;
use miette::Diagnostic;
use rustc_hash::FxHashMap;
use serde_json::Value;
use thiserror::Error;

use crate::event_bus::Event;
use crate::state::StateSnapshot;
use crate::utils::collections::new_fields_map;

/// An executable unit of work within a workflow.
///
/// Nodes read the whole state but must express changes exclusively through
/// their returned [`NodeUpdate`]; the snapshot they receive is a private
/// copy and mutating it has no effect on the run.
///
/// # Examples
///
/// ```rust
/// use stategraph::node::{Node, NodeContext, NodeError, NodeUpdate};
/// use stategraph::state::StateSnapshot;
/// use async_trait::async_trait;
/// use serde_json::json;
///
/// struct Add;
///
/// #[async_trait]
/// impl Node for Add {
///     async fn run(
///         &self,
///         snapshot: StateSnapshot,
///         _ctx: NodeContext,
///     ) -> Result<NodeUpdate, NodeError> {
///         let a = snapshot.get_i64("num1").ok_or(NodeError::MissingField { field: "num1" })?;
///         let b = snapshot.get_i64("num2").ok_or(NodeError::MissingField { field: "num2" })?;
///         Ok(NodeUpdate::patch().with_field("result", json!(a + b)))
///     }
/// }
/// ```
#[async_trait]
pub trait Node: Send + Sync {
    /// Execute this node against the given snapshot.
    async fn run(&self, snapshot: StateSnapshot, ctx: NodeContext)
        -> Result<NodeUpdate, NodeError>;
}

/// Execution context passed to a node for one wave.
#[derive(Clone, Debug)]
pub struct NodeContext {
    /// Name of the node being executed.
    pub node_id: String,
    /// Wave number, starting at 1.
    pub step: u64,
    /// Channel into the run's event bus.
    pub event_sender: flume::Sender<Event>,
}

impl NodeContext {
    /// Emit a node-scoped event tagged with this node's id and step.
    pub fn emit(
        &self,
        scope: impl Into<String>,
        message: impl Into<String>,
    ) -> Result<(), NodeContextError> {
        self.event_sender
            .send(Event::node_message_with_meta(
                self.node_id.clone(),
                self.step,
                scope,
                message,
            ))
            .map_err(|_| NodeContextError::EventBusUnavailable)
    }
}

/// The state change a node hands back to the barrier.
///
/// The two variants mirror the two result shapes a work capability may
/// produce: a partial mapping overlaying only the fields it names, or a
/// full state replacing the fields wholesale. Fields absent from a `Patch`
/// are untouched by the merge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeUpdate {
    /// Key-wise overlay: listed fields are overwritten, the rest survive.
    Patch(FxHashMap<String, Value>),
    /// Wholesale substitution of the entire field map.
    Replace(FxHashMap<String, Value>),
}

impl NodeUpdate {
    /// An empty patch: the node changes nothing.
    #[must_use]
    pub fn none() -> Self {
        NodeUpdate::Patch(new_fields_map())
    }

    /// Start a patch, to be populated via [`with_field`](Self::with_field).
    #[must_use]
    pub fn patch() -> Self {
        Self::none()
    }

    /// Build a full replacement from a field map.
    #[must_use]
    pub fn replace(fields: FxHashMap<String, Value>) -> Self {
        NodeUpdate::Replace(fields)
    }

    /// Add a field to this update.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        match &mut self {
            NodeUpdate::Patch(fields) | NodeUpdate::Replace(fields) => {
                fields.insert(key.into(), value);
            }
        }
        self
    }

    /// The fields this update carries, regardless of variant.
    #[must_use]
    pub fn fields(&self) -> &FxHashMap<String, Value> {
        match self {
            NodeUpdate::Patch(fields) | NodeUpdate::Replace(fields) => fields,
        }
    }
}

impl Default for NodeUpdate {
    fn default() -> Self {
        Self::none()
    }
}

/// Errors raised inside [`NodeContext`] helpers.
#[derive(Debug, Error, Diagnostic)]
pub enum NodeContextError {
    /// The event channel is disconnected.
    #[error("failed to emit event: event bus unavailable")]
    #[diagnostic(
        code(stategraph::node::event_bus_unavailable),
        help("The event bus may have shut down already. Check the run lifecycle.")
    )]
    EventBusUnavailable,
}

/// Fatal errors raised by a node's work capability.
///
/// Any `NodeError` aborts the in-flight invocation: the engine performs no
/// retries and salvages no partial result.
#[derive(Debug, Error, Diagnostic)]
pub enum NodeError {
    /// A field the node requires is absent from the snapshot.
    #[error("missing expected field: {field}")]
    #[diagnostic(
        code(stategraph::node::missing_field),
        help("Check that an upstream node produced the required field.")
    )]
    MissingField { field: &'static str },

    /// A field is present but holds an unusable value.
    #[error("invalid value in field {field}: {reason}")]
    #[diagnostic(code(stategraph::node::invalid_field))]
    InvalidField { field: &'static str, reason: String },

    /// An external collaborator (text-generation service, store, input
    /// source) failed. Propagated unmodified.
    #[error("collaborator error ({collaborator}): {message}")]
    #[diagnostic(code(stategraph::node::collaborator))]
    Collaborator {
        collaborator: &'static str,
        message: String,
    },

    /// JSON (de)serialization failure inside a node body.
    #[error(transparent)]
    #[diagnostic(code(stategraph::node::serde_json))]
    Serde(#[from] serde_json::Error),

    /// Event bus communication failure.
    #[error("event bus error: {0}")]
    #[diagnostic(code(stategraph::node::event_bus))]
    EventBus(#[from] NodeContextError),

    /// Free-form failure for node bodies with their own error domains.
    #[error("{0}")]
    #[diagnostic(code(stategraph::node::other))]
    Other(String),
}
