//! Wave scheduling: concurrent node execution with a synchronization
//! barrier.
//!
//! A [`Scheduler`] runs one wave at a time. Every executable node in the
//! frontier is spawned against the same pre-wave snapshot, an optional
//! semaphore caps in-flight tasks, and the wave completes only when every
//! node has returned. The first node failure aborts the remaining tasks and
//! fails the whole wave.

use std::sync::Arc;

use miette::Diagnostic;
use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::event_bus::Event;
use crate::node::{Node, NodeContext, NodeError, NodeUpdate};
use crate::state::StateSnapshot;
use crate::types::NodeId;

/// Runs the nodes of one wave concurrently and collects their outputs.
#[derive(Clone, Debug, Default)]
pub struct Scheduler {
    concurrency_limit: Option<usize>,
}

/// Outcome of one wave.
#[derive(Debug, Default)]
pub struct StepRunResult {
    /// Executable nodes that ran, in frontier order.
    pub ran_nodes: Vec<NodeId>,
    /// Virtual markers present in the frontier (always skipped).
    pub skipped_nodes: Vec<NodeId>,
    /// One update per ran node, in the same order as `ran_nodes`. The
    /// barrier merges them in this order, so same-key collisions resolve
    /// deterministically by frontier position.
    pub outputs: Vec<(NodeId, NodeUpdate)>,
}

#[derive(Debug, Error, Diagnostic)]
pub enum SchedulerError {
    /// A node returned an error. The wave is abandoned; sibling tasks are
    /// aborted and their outputs discarded.
    #[error("node {id} failed at step {step}")]
    #[diagnostic(
        code(stategraph::scheduler::node_run),
        help("The invocation is aborted; no partial state is kept.")
    )]
    NodeRun {
        id: String,
        step: u64,
        #[source]
        source: NodeError,
    },

    /// The frontier names a node the registry does not hold. Compilation
    /// rules this out for well-formed workflows.
    #[error("frontier references unknown node: {id}")]
    #[diagnostic(code(stategraph::scheduler::missing_node))]
    MissingNode { id: String },

    /// A spawned node task panicked or was cancelled externally.
    #[error("node task join failure")]
    #[diagnostic(code(stategraph::scheduler::join))]
    Join(#[from] tokio::task::JoinError),

    /// A node task finished without reporting an update or an error.
    /// Indicates a scheduler bug; outputs must stay aligned with
    /// `ran_nodes` rather than silently shifting.
    #[error("node {id} produced no output at step {step}")]
    #[diagnostic(code(stategraph::scheduler::missing_output))]
    MissingOutput { id: String, step: u64 },
}

impl Scheduler {
    /// Scheduler capped at `limit` concurrent nodes per wave (minimum 1).
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            concurrency_limit: Some(limit.max(1)),
        }
    }

    /// Scheduler with wave-wide parallelism.
    #[must_use]
    pub fn unbounded() -> Self {
        Self {
            concurrency_limit: None,
        }
    }

    /// Execute one wave.
    ///
    /// Duplicate frontier entries are collapsed so each node runs at most
    /// once per wave; virtual markers are recorded as skipped. All tasks
    /// observe the same `snapshot`.
    #[tracing::instrument(skip_all, fields(step = step, frontier = frontier.len()))]
    pub async fn superstep(
        &self,
        nodes: &FxHashMap<NodeId, Arc<dyn Node>>,
        frontier: &[NodeId],
        snapshot: StateSnapshot,
        step: u64,
        event_sender: flume::Sender<Event>,
    ) -> Result<StepRunResult, SchedulerError> {
        let mut seen: FxHashSet<&NodeId> = FxHashSet::default();
        let mut ran_nodes = Vec::new();
        let mut skipped_nodes = Vec::new();

        for id in frontier {
            if !seen.insert(id) {
                continue;
            }
            if id.is_virtual() {
                skipped_nodes.push(id.clone());
            } else {
                ran_nodes.push(id.clone());
            }
        }

        let semaphore = self
            .concurrency_limit
            .map(|limit| Arc::new(Semaphore::new(limit)));

        let mut join_set: JoinSet<Result<(usize, NodeUpdate), SchedulerError>> = JoinSet::new();
        for (index, id) in ran_nodes.iter().enumerate() {
            let node = nodes
                .get(id)
                .cloned()
                .ok_or_else(|| SchedulerError::MissingNode { id: id.to_string() })?;
            let ctx = NodeContext {
                node_id: id.to_string(),
                step,
                event_sender: event_sender.clone(),
            };
            let snapshot = snapshot.clone();
            let semaphore = semaphore.clone();
            let id = id.clone();

            join_set.spawn(async move {
                // The semaphore is never closed; acquisition only waits.
                let _permit = match semaphore {
                    Some(sem) => sem.acquire_owned().await.ok(),
                    None => None,
                };
                tracing::debug!(node = %id, step, "running node");
                let update = node.run(snapshot, ctx).await.map_err(|source| {
                    SchedulerError::NodeRun {
                        id: id.to_string(),
                        step,
                        source,
                    }
                })?;
                Ok((index, update))
            });
        }

        let mut slots: Vec<Option<NodeUpdate>> = vec![None; ran_nodes.len()];
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(Ok((index, update))) => slots[index] = Some(update),
                Ok(Err(err)) => {
                    join_set.abort_all();
                    return Err(err);
                }
                Err(join_err) if join_err.is_cancelled() => continue,
                Err(join_err) => {
                    join_set.abort_all();
                    return Err(join_err.into());
                }
            }
        }

        let mut outputs = Vec::with_capacity(ran_nodes.len());
        for (id, slot) in ran_nodes.iter().zip(slots) {
            match slot {
                Some(update) => outputs.push((id.clone(), update)),
                None => {
                    return Err(SchedulerError::MissingOutput {
                        id: id.to_string(),
                        step,
                    })
                }
            }
        }

        Ok(StepRunResult {
            ran_nodes,
            skipped_nodes,
            outputs,
        })
    }
}
