//! Compiled workflow execution: the wave loop, barrier merge, and frontier
//! computation.
//!
//! A [`Workflow`] is the frozen product of
//! [`GraphBuilder::compile`](crate::graphs::GraphBuilder::compile). Calling
//! [`invoke`](Workflow::invoke) consumes an initial [`State`] and drives the
//! graph wave by wave until every active branch has reached `End`, returning
//! the final merged state.
//!
//! # Examples
//!
//! ```rust
//! use stategraph::graphs::GraphBuilder;
//! use stategraph::node::{Node, NodeContext, NodeError, NodeUpdate};
//! use stategraph::state::{State, StateSnapshot};
//! use stategraph::types::NodeId;
//! use async_trait::async_trait;
//! use serde_json::json;
//!
//! struct Add;
//!
//! #[async_trait]
//! impl Node for Add {
//!     async fn run(
//!         &self,
//!         snap: StateSnapshot,
//!         _ctx: NodeContext,
//!     ) -> Result<NodeUpdate, NodeError> {
//!         let a = snap.get_i64("num1").ok_or(NodeError::MissingField { field: "num1" })?;
//!         let b = snap.get_i64("num2").ok_or(NodeError::MissingField { field: "num2" })?;
//!         Ok(NodeUpdate::patch().with_field("result", json!(a + b)))
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let workflow = GraphBuilder::new()
//!     .add_node("add", Add)
//!     .add_edge(NodeId::Start, "add")
//!     .add_edge("add", NodeId::End)
//!     .compile()?;
//!
//! let initial = State::builder()
//!     .with_field("num1", json!(5))
//!     .with_field("num2", json!(5))
//!     .build();
//!
//! let final_state = workflow.invoke(initial).await?;
//! assert_eq!(final_state.snapshot().get_i64("result"), Some(10));
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::Arc;

use miette::Diagnostic;
use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

use crate::channels::Channel;
use crate::event_bus::{Event, EventBus};
use crate::graphs::ConditionalEdge;
use crate::node::{Node, NodeUpdate};
use crate::schedulers::{Scheduler, SchedulerError, StepRunResult};
use crate::state::{State, StateSnapshot};
use crate::types::NodeId;

/// A validated, immutable, executable workflow graph.
///
/// Cheap to clone; node registrations are shared behind `Arc`. One
/// `Workflow` can serve many concurrent invocations, each with its own
/// [`State`].
#[derive(Clone)]
pub struct Workflow {
    nodes: FxHashMap<NodeId, Arc<dyn Node>>,
    edges: FxHashMap<NodeId, Vec<NodeId>>,
    conditional_edges: Vec<ConditionalEdge>,
    scheduler: Scheduler,
}

impl fmt::Debug for Workflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workflow")
            .field("nodes", &self.nodes.keys().collect::<Vec<_>>())
            .field("edges", &self.edges)
            .field("conditional_edges", &self.conditional_edges)
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}

/// Per-wave execution summary, emitted for observability.
#[derive(Clone, Debug)]
pub struct StepReport {
    /// Wave number, starting at 1.
    pub step: u64,
    /// Nodes that executed this wave, in frontier order.
    pub ran_nodes: Vec<NodeId>,
    /// Virtual markers skipped this wave.
    pub skipped_nodes: Vec<NodeId>,
    /// Whether the barrier merge changed any field.
    pub state_changed: bool,
    /// Frontier selected for the next wave.
    pub next_frontier: Vec<NodeId>,
}

/// Fatal errors raised while executing a workflow.
///
/// Any variant aborts the invocation; the in-flight state is discarded and
/// the caller keeps whatever they passed in (they handed ownership away, so
/// effectively nothing).
#[derive(Debug, Error, Diagnostic)]
pub enum WorkflowError {
    /// A wave failed: node error, panic, or join failure.
    #[error("wave execution failed")]
    #[diagnostic(code(stategraph::workflow::scheduler))]
    Scheduler(
        #[from]
        #[diagnostic_source]
        SchedulerError,
    ),

    /// A router returned a key its edge mapping does not contain.
    #[error("router on {node} returned unmapped route key {key:?}")]
    #[diagnostic(
        code(stategraph::workflow::unmapped_route_key),
        help("Add the key to the conditional edge's mapping, or fix the router.")
    )]
    UnmappedRouteKey { node: String, key: String },
}

impl Workflow {
    pub(crate) fn new(
        nodes: FxHashMap<NodeId, Arc<dyn Node>>,
        edges: FxHashMap<NodeId, Vec<NodeId>>,
        conditional_edges: Vec<ConditionalEdge>,
        concurrency_limit: Option<usize>,
    ) -> Self {
        let scheduler = match concurrency_limit {
            Some(limit) => Scheduler::new(limit),
            None => Scheduler::unbounded(),
        };
        Self {
            nodes,
            edges,
            conditional_edges,
            scheduler,
        }
    }

    /// Number of executable nodes registered in this workflow.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Static edges out of a node.
    #[must_use]
    pub fn static_targets(&self, from: &NodeId) -> &[NodeId] {
        self.edges.get(from).map(Vec::as_slice).unwrap_or_default()
    }

    /// Conditional edges defined on this workflow.
    #[must_use]
    pub fn conditional_edges(&self) -> &[ConditionalEdge] {
        &self.conditional_edges
    }

    /// Execute the workflow to completion with a default stdout event bus.
    pub async fn invoke(&self, initial_state: State) -> Result<State, WorkflowError> {
        let bus = EventBus::default();
        self.invoke_with_bus(initial_state, &bus).await
    }

    /// Execute the workflow to completion, publishing events to `bus`.
    ///
    /// The bus listener is started if it is not already running and stopped
    /// before returning, so captured sinks hold a complete record.
    #[tracing::instrument(skip_all)]
    pub async fn invoke_with_bus(
        &self,
        initial_state: State,
        bus: &EventBus,
    ) -> Result<State, WorkflowError> {
        bus.listen_for_events();
        let sender = bus.get_sender();
        let result = self.run_to_completion(initial_state, sender).await;
        bus.stop_listener().await;
        result
    }

    async fn run_to_completion(
        &self,
        mut state: State,
        sender: flume::Sender<Event>,
    ) -> Result<State, WorkflowError> {
        let mut frontier = self.next_frontier(&[NodeId::Start], &state.snapshot())?;
        let mut step: u64 = 0;

        while !Self::is_complete(&frontier) {
            step += 1;
            let snapshot = state.snapshot();

            let StepRunResult {
                ran_nodes,
                skipped_nodes,
                outputs,
            } = self
                .scheduler
                .superstep(&self.nodes, &frontier, snapshot, step, sender.clone())
                .await?;

            let state_changed = self.apply_barrier(&mut state, &outputs);
            let next = self.next_frontier(&ran_nodes, &state.snapshot())?;

            let report = StepReport {
                step,
                ran_nodes,
                skipped_nodes,
                state_changed,
                next_frontier: next.clone(),
            };
            tracing::debug!(
                step = report.step,
                ran = report.ran_nodes.len(),
                changed = report.state_changed,
                next = report.next_frontier.len(),
                "wave complete"
            );
            let _ = sender.send(Event::diagnostic(
                "wave",
                format!(
                    "step {} ran {} node(s), next frontier {}",
                    report.step,
                    report.ran_nodes.len(),
                    report.next_frontier.len()
                ),
            ));

            frontier = next;
        }

        let _ = sender.send(Event::diagnostic("run", "workflow completed"));
        Ok(state)
    }

    /// Merge node outputs into the state, in ran-node order.
    ///
    /// `Patch` overlays the fields it names; `Replace` substitutes the whole
    /// map. Later outputs win same-key collisions. The channel version bumps
    /// once per wave iff the merged content actually changed.
    fn apply_barrier(&self, state: &mut State, outputs: &[(NodeId, NodeUpdate)]) -> bool {
        let mut changed = false;
        for (id, update) in outputs {
            match update {
                NodeUpdate::Patch(fields) => {
                    let map = state.fields.get_mut();
                    for (key, value) in fields {
                        if map.get(key) != Some(value) {
                            map.insert(key.clone(), value.clone());
                            changed = true;
                        }
                    }
                }
                NodeUpdate::Replace(fields) => {
                    let map = state.fields.get_mut();
                    if map != fields {
                        *map = fields.clone();
                        changed = true;
                    }
                }
            }
            tracing::trace!(node = %id, fields = update.fields().len(), "merged update");
        }
        if changed {
            let version = state.fields.version();
            state.fields.set_version(version + 1);
        }
        changed
    }

    /// Targets activated by the given source nodes: static edges plus
    /// resolved conditional edges, deduplicated in activation order.
    fn next_frontier(
        &self,
        sources: &[NodeId],
        snapshot: &StateSnapshot,
    ) -> Result<Vec<NodeId>, WorkflowError> {
        let mut seen: FxHashSet<NodeId> = FxHashSet::default();
        let mut next = Vec::new();

        for source in sources {
            for target in self.static_targets(source) {
                if seen.insert(target.clone()) {
                    next.push(target.clone());
                }
            }
            for edge in self.conditional_edges.iter().filter(|e| e.from() == source) {
                let key = edge.route(snapshot);
                let target =
                    edge.target_for(&key)
                        .ok_or_else(|| WorkflowError::UnmappedRouteKey {
                            node: source.to_string(),
                            key: key.clone(),
                        })?;
                tracing::debug!(node = %source, key = %key, target = %target, "routed");
                if seen.insert(target.clone()) {
                    next.push(target.clone());
                }
            }
        }
        Ok(next)
    }

    // Completion: nothing left to run, or every survivor is the End marker.
    fn is_complete(frontier: &[NodeId]) -> bool {
        frontier.iter().all(NodeId::is_end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphs::GraphBuilder;
    use crate::utils::testing::{NoopNode, SetFieldNode};
    use serde_json::json;

    fn linear() -> Workflow {
        GraphBuilder::new()
            .add_node("a", SetFieldNode::new("a_ran", json!(true)))
            .add_edge(NodeId::Start, "a")
            .add_edge("a", NodeId::End)
            .compile()
            .unwrap()
    }

    #[test]
    fn empty_and_all_end_frontiers_complete() {
        assert!(Workflow::is_complete(&[]));
        assert!(Workflow::is_complete(&[NodeId::End, NodeId::End]));
        assert!(!Workflow::is_complete(&[NodeId::End, NodeId::named("a")]));
    }

    #[test]
    fn barrier_skips_version_bump_when_content_is_identical() {
        let workflow = linear();
        let mut state = State::builder().with_field("a_ran", json!(true)).build();
        let outputs = vec![(
            NodeId::named("a"),
            NodeUpdate::patch().with_field("a_ran", json!(true)),
        )];
        let changed = workflow.apply_barrier(&mut state, &outputs);
        assert!(!changed);
        assert_eq!(state.fields.version(), 1);
    }

    #[test]
    fn barrier_merges_in_output_order() {
        let workflow = linear();
        let mut state = State::new();
        let outputs = vec![
            (
                NodeId::named("first"),
                NodeUpdate::patch().with_field("winner", json!("first")),
            ),
            (
                NodeId::named("second"),
                NodeUpdate::patch().with_field("winner", json!("second")),
            ),
        ];
        assert!(workflow.apply_barrier(&mut state, &outputs));
        assert_eq!(state.snapshot().get_str("winner"), Some("second"));
        assert_eq!(state.fields.version(), 2);
    }

    #[tokio::test]
    async fn unmapped_route_key_aborts() {
        let workflow = GraphBuilder::new()
            .add_node("a", NoopNode)
            .add_edge(NodeId::Start, "a")
            .add_conditional_edge(
                "a",
                |_snap| "missing".to_string(),
                [("present", NodeId::End)],
            )
            .compile()
            .unwrap();

        let err = workflow.invoke(State::new()).await.unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::UnmappedRouteKey { ref node, ref key } if node == "a" && key == "missing"
        ));
    }
}
