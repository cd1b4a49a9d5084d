use std::collections::VecDeque;
use std::sync::Arc;

use miette::Diagnostic;
use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

use super::edges::ConditionalEdge;
use crate::node::Node;
use crate::types::NodeId;
use crate::workflow::Workflow;

/// Structural errors detected when freezing a graph definition.
///
/// Compilation checks topology only. Router outputs are opaque until
/// runtime, so an exhaustive route mapping cannot be verified here; an
/// unmapped route key surfaces later as a
/// [`WorkflowError::UnmappedRouteKey`](crate::workflow::WorkflowError::UnmappedRouteKey).
#[derive(Debug, Error, Diagnostic)]
pub enum DefinitionError {
    /// An edge or mapping references a node name that was never registered.
    #[error("edge references unknown node: {id}")]
    #[diagnostic(
        code(stategraph::graph::unknown_node),
        help("Register the node with add_node before referencing it in an edge.")
    )]
    UnknownNode { id: String },

    /// `End` is terminal; nothing may leave it.
    #[error("edge out of End (to {to}) is not allowed")]
    #[diagnostic(code(stategraph::graph::edge_from_end))]
    EdgeFromEnd { to: String },

    /// `Start` is an entry marker; nothing may enter it.
    #[error("edge into Start (from {from}) is not allowed")]
    #[diagnostic(code(stategraph::graph::edge_to_start))]
    EdgeToStart { from: String },

    /// `Start` has no outgoing edge at all, so no node would ever run.
    #[error("graph has no entry point: Start has no outgoing edge")]
    #[diagnostic(
        code(stategraph::graph::missing_entry),
        help("Add at least one edge (static or conditional) out of Start.")
    )]
    MissingEntry,

    /// No path from `Start` can ever reach `End`.
    #[error("End is unreachable from Start")]
    #[diagnostic(
        code(stategraph::graph::end_unreachable),
        help("Every workflow needs at least one path that terminates at End.")
    )]
    EndUnreachable,

    /// Static edges form a cycle. Static edges fire unconditionally every
    /// wave, so such a loop can never drain; loops must route through a
    /// conditional edge with an exit branch.
    #[error("static edges form a cycle: {}", nodes.join(" -> "))]
    #[diagnostic(
        code(stategraph::graph::unconditional_cycle),
        help("Break the loop with add_conditional_edge so one branch can leave it.")
    )]
    UnconditionalCycle { nodes: Vec<String> },
}

pub(crate) fn compile(
    nodes: FxHashMap<NodeId, Arc<dyn Node>>,
    edges: FxHashMap<NodeId, Vec<NodeId>>,
    conditional_edges: Vec<ConditionalEdge>,
    concurrency_limit: Option<usize>,
) -> Result<Workflow, DefinitionError> {
    check_marker_usage(&edges, &conditional_edges)?;
    check_references(&nodes, &edges, &conditional_edges)?;
    check_entry(&edges, &conditional_edges)?;
    check_end_reachable(&edges, &conditional_edges)?;
    check_static_cycles(&edges)?;

    Ok(Workflow::new(
        nodes,
        edges,
        conditional_edges,
        concurrency_limit,
    ))
}

fn check_marker_usage(
    edges: &FxHashMap<NodeId, Vec<NodeId>>,
    conditional_edges: &[ConditionalEdge],
) -> Result<(), DefinitionError> {
    for (from, targets) in edges {
        if from.is_end() {
            return Err(DefinitionError::EdgeFromEnd {
                to: targets
                    .first()
                    .map(ToString::to_string)
                    .unwrap_or_default(),
            });
        }
        for to in targets {
            if to.is_start() {
                return Err(DefinitionError::EdgeToStart {
                    from: from.to_string(),
                });
            }
        }
    }
    for edge in conditional_edges {
        if edge.from().is_end() {
            return Err(DefinitionError::EdgeFromEnd {
                to: "<conditional>".to_string(),
            });
        }
        for target in edge.targets().values() {
            if target.is_start() {
                return Err(DefinitionError::EdgeToStart {
                    from: edge.from().to_string(),
                });
            }
        }
    }
    Ok(())
}

fn check_references(
    nodes: &FxHashMap<NodeId, Arc<dyn Node>>,
    edges: &FxHashMap<NodeId, Vec<NodeId>>,
    conditional_edges: &[ConditionalEdge],
) -> Result<(), DefinitionError> {
    let known = |id: &NodeId| id.is_virtual() || nodes.contains_key(id);

    for (from, targets) in edges {
        for id in std::iter::once(from).chain(targets) {
            if !known(id) {
                return Err(DefinitionError::UnknownNode { id: id.to_string() });
            }
        }
    }
    for edge in conditional_edges {
        for id in std::iter::once(edge.from()).chain(edge.targets().values()) {
            if !known(id) {
                return Err(DefinitionError::UnknownNode { id: id.to_string() });
            }
        }
    }
    Ok(())
}

fn check_entry(
    edges: &FxHashMap<NodeId, Vec<NodeId>>,
    conditional_edges: &[ConditionalEdge],
) -> Result<(), DefinitionError> {
    let has_static = edges.get(&NodeId::Start).is_some_and(|t| !t.is_empty());
    let has_conditional = conditional_edges.iter().any(|e| e.from().is_start());
    if has_static || has_conditional {
        Ok(())
    } else {
        Err(DefinitionError::MissingEntry)
    }
}

// BFS over the union of static edges and all conditional mapping targets.
// Route keys are opaque, so every mapped target counts as reachable.
fn check_end_reachable(
    edges: &FxHashMap<NodeId, Vec<NodeId>>,
    conditional_edges: &[ConditionalEdge],
) -> Result<(), DefinitionError> {
    let mut visited: FxHashSet<NodeId> = FxHashSet::default();
    let mut queue = VecDeque::from([NodeId::Start]);

    while let Some(current) = queue.pop_front() {
        if current.is_end() {
            return Ok(());
        }
        if !visited.insert(current.clone()) {
            continue;
        }
        if let Some(targets) = edges.get(&current) {
            queue.extend(targets.iter().cloned());
        }
        for edge in conditional_edges.iter().filter(|e| *e.from() == current) {
            queue.extend(edge.targets().values().cloned());
        }
    }
    Err(DefinitionError::EndUnreachable)
}

// DFS cycle detection over static edges only. Conditional edges are
// excluded: a loop that can exit through a router is legitimate.
fn check_static_cycles(edges: &FxHashMap<NodeId, Vec<NodeId>>) -> Result<(), DefinitionError> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        InProgress,
        Done,
    }

    fn visit(
        id: &NodeId,
        edges: &FxHashMap<NodeId, Vec<NodeId>>,
        marks: &mut FxHashMap<NodeId, Mark>,
        stack: &mut Vec<NodeId>,
    ) -> Result<(), DefinitionError> {
        match marks.get(id) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::InProgress) => {
                let start = stack.iter().position(|n| n == id).unwrap_or(0);
                let mut nodes: Vec<String> = stack[start..].iter().map(ToString::to_string).collect();
                nodes.push(id.to_string());
                return Err(DefinitionError::UnconditionalCycle { nodes });
            }
            None => {}
        }
        marks.insert(id.clone(), Mark::InProgress);
        stack.push(id.clone());
        if let Some(targets) = edges.get(id) {
            for next in targets.iter().filter(|t| t.is_named()) {
                visit(next, edges, marks, stack)?;
            }
        }
        stack.pop();
        marks.insert(id.clone(), Mark::Done);
        Ok(())
    }

    let mut marks = FxHashMap::default();
    let mut stack = Vec::new();
    for from in edges.keys() {
        visit(from, edges, &mut marks, &mut stack)?;
    }
    Ok(())
}
