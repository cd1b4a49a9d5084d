use std::sync::Arc;

use rustc_hash::FxHashMap;

use super::compilation::{compile, DefinitionError};
use super::edges::{ConditionalEdge, Router};
use crate::node::Node;
use crate::state::StateSnapshot;
use crate::types::NodeId;
use crate::workflow::Workflow;

/// Fluent builder for workflow graphs.
///
/// Collects nodes and edges without validating anything; all structural
/// checks run in [`compile`](GraphBuilder::compile), which either returns an
/// immutable [`Workflow`] or the first [`DefinitionError`] found.
///
/// # Examples
///
/// ```rust
/// use stategraph::graphs::GraphBuilder;
/// use stategraph::types::NodeId;
/// use stategraph::utils::testing::NoopNode;
///
/// let workflow = GraphBuilder::new()
///     .add_node("work", NoopNode)
///     .add_edge(NodeId::Start, "work")
///     .add_edge("work", NodeId::End)
///     .compile()
///     .unwrap();
/// assert_eq!(workflow.node_count(), 1);
/// ```
#[derive(Default)]
pub struct GraphBuilder {
    nodes: FxHashMap<NodeId, Arc<dyn Node>>,
    edges: FxHashMap<NodeId, Vec<NodeId>>,
    conditional_edges: Vec<ConditionalEdge>,
    concurrency_limit: Option<usize>,
}

impl GraphBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an executable node under a name.
    ///
    /// Registering the same name again overwrites the prior definition.
    /// The virtual `Start`/`End` markers cannot carry a node; attempts are
    /// logged and ignored.
    #[must_use]
    pub fn add_node(mut self, id: impl Into<NodeId>, node: impl Node + 'static) -> Self {
        let id = id.into();
        if id.is_virtual() {
            tracing::warn!(node = %id, "ignoring node registration for virtual marker");
            return self;
        }
        self.nodes.insert(id, Arc::new(node));
        self
    }

    /// Add a static edge. Static edges fire on every completion of `from`.
    #[must_use]
    pub fn add_edge(mut self, from: impl Into<NodeId>, to: impl Into<NodeId>) -> Self {
        self.edges.entry(from.into()).or_default().push(to.into());
        self
    }

    /// Add a conditional edge: after `from` completes, `router` picks a
    /// route key which `mapping` translates into the next node.
    #[must_use]
    pub fn add_conditional_edge<F, I, K, T>(
        mut self,
        from: impl Into<NodeId>,
        router: F,
        mapping: I,
    ) -> Self
    where
        F: Fn(&StateSnapshot) -> String + Send + Sync + 'static,
        I: IntoIterator<Item = (K, T)>,
        K: Into<String>,
        T: Into<NodeId>,
    {
        let targets = mapping
            .into_iter()
            .map(|(k, t)| (k.into(), t.into()))
            .collect();
        self.conditional_edges.push(ConditionalEdge::new(
            from.into(),
            Arc::new(router) as Router,
            targets,
        ));
        self
    }

    /// Cap the number of nodes running concurrently within one wave.
    /// Unset means wave-wide parallelism.
    #[must_use]
    pub fn with_concurrency_limit(mut self, limit: usize) -> Self {
        self.concurrency_limit = Some(limit.max(1));
        self
    }

    /// Validate the graph and freeze it into an executable [`Workflow`].
    pub fn compile(self) -> Result<Workflow, DefinitionError> {
        compile(
            self.nodes,
            self.edges,
            self.conditional_edges,
            self.concurrency_limit,
        )
    }
}
