use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde_json::json;
use stategraph::node::Node;
use stategraph::schedulers::{Scheduler, SchedulerError};
use stategraph::types::NodeId;
use stategraph::utils::testing::{snapshot_of, DelayedNode, FailingNode, SetFieldNode};

fn registry(
    entries: Vec<(&str, Box<dyn Node>)>,
) -> FxHashMap<NodeId, Arc<dyn Node>> {
    entries
        .into_iter()
        .map(|(name, node)| (NodeId::named(name), Arc::from(node)))
        .collect()
}

#[tokio::test]
async fn outputs_follow_frontier_order() {
    let nodes = registry(vec![
        ("slow", Box::new(DelayedNode::new(30, "slow", json!(1)))),
        ("fast", Box::new(SetFieldNode::new("fast", json!(2)))),
    ]);
    let frontier = [NodeId::named("slow"), NodeId::named("fast")];
    let (tx, _rx) = flume::unbounded();

    let result = Scheduler::unbounded()
        .superstep(&nodes, &frontier, snapshot_of::<_, String>([]), 1, tx)
        .await
        .unwrap();

    assert_eq!(result.ran_nodes, frontier.to_vec());
    // The slow node finished last but its output still comes first.
    let order: Vec<&NodeId> = result.outputs.iter().map(|(id, _)| id).collect();
    assert_eq!(order, vec![&frontier[0], &frontier[1]]);
}

#[tokio::test]
async fn duplicate_frontier_entries_run_once() {
    let nodes = registry(vec![("a", Box::new(SetFieldNode::new("a", json!(1))))]);
    let frontier = [NodeId::named("a"), NodeId::named("a"), NodeId::named("a")];
    let (tx, _rx) = flume::unbounded();

    let result = Scheduler::unbounded()
        .superstep(&nodes, &frontier, snapshot_of::<_, String>([]), 1, tx)
        .await
        .unwrap();

    assert_eq!(result.ran_nodes, vec![NodeId::named("a")]);
    assert_eq!(result.outputs.len(), 1);
}

#[tokio::test]
async fn virtual_markers_are_skipped_not_run() {
    let nodes = registry(vec![("a", Box::new(SetFieldNode::new("a", json!(1))))]);
    let frontier = [NodeId::End, NodeId::named("a")];
    let (tx, _rx) = flume::unbounded();

    let result = Scheduler::unbounded()
        .superstep(&nodes, &frontier, snapshot_of::<_, String>([]), 1, tx)
        .await
        .unwrap();

    assert_eq!(result.skipped_nodes, vec![NodeId::End]);
    assert_eq!(result.ran_nodes, vec![NodeId::named("a")]);
}

#[tokio::test]
async fn first_failure_fails_the_whole_wave() {
    let nodes = registry(vec![
        ("ok", Box::new(DelayedNode::new(50, "ok", json!(1)))),
        ("boom", Box::new(FailingNode::new("bad input"))),
    ]);
    let frontier = [NodeId::named("ok"), NodeId::named("boom")];
    let (tx, _rx) = flume::unbounded();

    let err = Scheduler::unbounded()
        .superstep(&nodes, &frontier, snapshot_of::<_, String>([]), 4, tx)
        .await
        .unwrap_err();

    match err {
        SchedulerError::NodeRun { id, step, .. } => {
            assert_eq!(id, "boom");
            assert_eq!(step, 4);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn unknown_frontier_node_is_reported() {
    let nodes = registry(vec![]);
    let frontier = [NodeId::named("ghost")];
    let (tx, _rx) = flume::unbounded();

    let err = Scheduler::unbounded()
        .superstep(&nodes, &frontier, snapshot_of::<_, String>([]), 1, tx)
        .await
        .unwrap_err();
    assert!(matches!(err, SchedulerError::MissingNode { ref id } if id == "ghost"));
}

#[tokio::test]
async fn each_output_is_attributed_to_the_node_that_produced_it() {
    // Every node writes a field named after itself; each (node, update)
    // pair must hold that node's own field even when completion order is
    // scrambled by delays.
    let nodes = registry(vec![
        ("a", Box::new(DelayedNode::new(25, "a", json!("a")))),
        ("b", Box::new(SetFieldNode::new("b", json!("b")))),
        ("c", Box::new(DelayedNode::new(5, "c", json!("c")))),
    ]);
    let frontier = [NodeId::named("a"), NodeId::named("b"), NodeId::named("c")];
    let (tx, _rx) = flume::unbounded();

    let result = Scheduler::unbounded()
        .superstep(&nodes, &frontier, snapshot_of::<_, String>([]), 1, tx)
        .await
        .unwrap();

    assert_eq!(result.outputs.len(), result.ran_nodes.len());
    for (id, update) in &result.outputs {
        let name = id.to_string();
        assert_eq!(update.fields().get(&name), Some(&json!(name)));
    }
}

#[tokio::test]
async fn concurrency_limit_one_still_completes_the_wave() {
    let nodes = registry(vec![
        ("a", Box::new(DelayedNode::new(10, "a", json!(1)))),
        ("b", Box::new(DelayedNode::new(10, "b", json!(2)))),
        ("c", Box::new(DelayedNode::new(10, "c", json!(3)))),
    ]);
    let frontier = [NodeId::named("a"), NodeId::named("b"), NodeId::named("c")];
    let (tx, _rx) = flume::unbounded();

    let result = Scheduler::new(1)
        .superstep(&nodes, &frontier, snapshot_of::<_, String>([]), 1, tx)
        .await
        .unwrap();
    assert_eq!(result.outputs.len(), 3);
}
