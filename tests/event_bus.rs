use async_trait::async_trait;
use serde_json::json;
use stategraph::event_bus::{ChannelSink, Event, EventBus, MemorySink};
use tokio::sync::mpsc;
use stategraph::graphs::GraphBuilder;
use stategraph::node::{Node, NodeContext, NodeError, NodeUpdate};
use stategraph::state::{State, StateSnapshot};
use stategraph::types::NodeId;

struct ChattyNode;

#[async_trait]
impl Node for ChattyNode {
    async fn run(&self, _snap: StateSnapshot, ctx: NodeContext) -> Result<NodeUpdate, NodeError> {
        ctx.emit("work", "starting")?;
        ctx.emit("work", "finished")?;
        Ok(NodeUpdate::patch().with_field("done", json!(true)))
    }
}

#[tokio::test]
async fn memory_sink_captures_node_events_with_metadata() {
    let sink = MemorySink::new();
    let bus = EventBus::with_sink(sink.clone());

    let workflow = GraphBuilder::new()
        .add_node("chatty", ChattyNode)
        .add_edge(NodeId::Start, "chatty")
        .add_edge("chatty", NodeId::End)
        .compile()
        .unwrap();

    workflow.invoke_with_bus(State::new(), &bus).await.unwrap();

    let events = sink.snapshot();
    let node_events: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            Event::Node(n) => Some(n),
            _ => None,
        })
        .collect();
    assert_eq!(node_events.len(), 2);
    assert_eq!(node_events[0].node_id(), Some("chatty"));
    assert_eq!(node_events[0].step(), Some(1));
    assert_eq!(node_events[0].message(), "starting");
    assert_eq!(node_events[1].message(), "finished");

    // The engine also reports wave boundaries and completion.
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::Diagnostic(d) if d.message() == "workflow completed")));

    // Scope and node filters see the same events.
    assert_eq!(
        sink.node_messages("chatty"),
        vec!["starting".to_string(), "finished".to_string()]
    );
    assert_eq!(sink.scoped("work").len(), 2);
}

#[tokio::test]
async fn channel_sink_streams_an_invocation_to_a_consumer() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let bus = EventBus::with_sink(ChannelSink::new(tx));

    let workflow = GraphBuilder::new()
        .add_node("chatty", ChattyNode)
        .add_edge(NodeId::Start, "chatty")
        .add_edge("chatty", NodeId::End)
        .compile()
        .unwrap();

    workflow.invoke_with_bus(State::new(), &bus).await.unwrap();
    // Dropping the bus drops the sink's sender, closing the stream after
    // the buffered events.
    drop(bus);

    let mut received = Vec::new();
    while let Some(event) = rx.recv().await {
        received.push(event);
    }
    let node_messages: Vec<_> = received
        .iter()
        .filter_map(|e| match e {
            Event::Node(n) => Some(n.message().to_string()),
            _ => None,
        })
        .collect();
    assert_eq!(node_messages, vec!["starting", "finished"]);
    assert!(received
        .iter()
        .any(|e| matches!(e, Event::Diagnostic(d) if d.message() == "workflow completed")));
}

#[tokio::test]
async fn bus_fans_out_to_every_sink() {
    let first = MemorySink::new();
    let second = MemorySink::new();
    let bus = EventBus::with_sink(first.clone());
    bus.add_sink(second.clone());
    bus.listen_for_events();

    bus.get_sender()
        .send(Event::diagnostic("test", "hello"))
        .unwrap();
    bus.stop_listener().await;

    assert_eq!(first.snapshot().len(), 1);
    assert_eq!(second.snapshot().len(), 1);
}
