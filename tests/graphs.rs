use serde_json::json;
use stategraph::graphs::{DefinitionError, GraphBuilder};
use stategraph::state::State;
use stategraph::types::NodeId;
use stategraph::utils::testing::{NoopNode, SetFieldNode};

#[test]
fn minimal_graph_compiles() {
    let workflow = GraphBuilder::new()
        .add_node("only", NoopNode)
        .add_edge(NodeId::Start, "only")
        .add_edge("only", NodeId::End)
        .compile()
        .unwrap();
    assert_eq!(workflow.node_count(), 1);
    assert_eq!(
        workflow.static_targets(&NodeId::Start),
        [NodeId::named("only")].as_slice()
    );
}

#[test]
fn edge_out_of_end_is_rejected() {
    let err = GraphBuilder::new()
        .add_node("a", NoopNode)
        .add_edge(NodeId::Start, "a")
        .add_edge("a", NodeId::End)
        .add_edge(NodeId::End, "a")
        .compile()
        .unwrap_err();
    assert!(matches!(err, DefinitionError::EdgeFromEnd { .. }));
}

#[test]
fn edge_into_start_is_rejected() {
    let err = GraphBuilder::new()
        .add_node("a", NoopNode)
        .add_edge(NodeId::Start, "a")
        .add_edge("a", NodeId::Start)
        .compile()
        .unwrap_err();
    assert!(matches!(err, DefinitionError::EdgeToStart { ref from } if from == "a"));
}

#[test]
fn conditional_mapping_to_start_is_rejected() {
    let err = GraphBuilder::new()
        .add_node("a", NoopNode)
        .add_edge(NodeId::Start, "a")
        .add_conditional_edge(
            "a",
            |_snap| "back".to_string(),
            [("back", NodeId::Start), ("out", NodeId::End)],
        )
        .compile()
        .unwrap_err();
    assert!(matches!(err, DefinitionError::EdgeToStart { .. }));
}

#[test]
fn conditional_target_must_be_registered() {
    let err = GraphBuilder::new()
        .add_node("a", NoopNode)
        .add_edge(NodeId::Start, "a")
        .add_conditional_edge("a", |_snap| "go".to_string(), [("go", "phantom")])
        .compile()
        .unwrap_err();
    assert!(matches!(err, DefinitionError::UnknownNode { ref id } if id == "phantom"));
}

#[test]
fn conditional_entry_alone_satisfies_the_entry_check() {
    let workflow = GraphBuilder::new()
        .add_node("a", NoopNode)
        .add_conditional_edge(
            NodeId::Start,
            |_snap| "go".to_string(),
            [("go", "a"), ("skip", "End")],
        )
        .add_edge("a", NodeId::End)
        .compile();
    assert!(workflow.is_ok());
}

#[test]
fn self_loop_on_static_edge_is_rejected() {
    let err = GraphBuilder::new()
        .add_node("a", NoopNode)
        .add_edge(NodeId::Start, "a")
        .add_edge("a", "a")
        .add_edge("a", NodeId::End)
        .compile()
        .unwrap_err();
    assert!(matches!(err, DefinitionError::UnconditionalCycle { ref nodes } if nodes.len() == 2));
}

// Re-registering a name replaces the node; the surviving definition is the
// last one added.
#[tokio::test]
async fn redefining_a_node_keeps_the_last_definition() {
    let workflow = GraphBuilder::new()
        .add_node("a", SetFieldNode::new("who", json!("first")))
        .add_node("a", SetFieldNode::new("who", json!("second")))
        .add_edge(NodeId::Start, "a")
        .add_edge("a", NodeId::End)
        .compile()
        .unwrap();

    let final_state = workflow.invoke(State::new()).await.unwrap();
    assert_eq!(final_state.snapshot().get_str("who"), Some("second"));
}
