//! Smallest possible workflow: one node that adds two numbers from the
//! initial state.
//!
//! Run with: `cargo run --example add_two_numbers`

use async_trait::async_trait;
use serde_json::json;
use stategraph::graphs::GraphBuilder;
use stategraph::node::{Node, NodeContext, NodeError, NodeUpdate};
use stategraph::state::{State, StateSnapshot};
use stategraph::types::NodeId;

struct AddNumbers;

#[async_trait]
impl Node for AddNumbers {
    async fn run(&self, snap: StateSnapshot, ctx: NodeContext) -> Result<NodeUpdate, NodeError> {
        let a = snap
            .get_i64("num1")
            .ok_or(NodeError::MissingField { field: "num1" })?;
        let b = snap
            .get_i64("num2")
            .ok_or(NodeError::MissingField { field: "num2" })?;
        ctx.emit("math", format!("adding {a} + {b}"))?;
        Ok(NodeUpdate::patch().with_field("result", json!(a + b)))
    }
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    stategraph::telemetry::init();

    let workflow = GraphBuilder::new()
        .add_node("add", AddNumbers)
        .add_edge(NodeId::Start, "add")
        .add_edge("add", NodeId::End)
        .compile()?;

    let initial = State::builder()
        .with_field("num1", json!(5))
        .with_field("num2", json!(5))
        .build();

    let final_state = workflow.invoke(initial).await?;
    println!(
        "result = {}",
        final_state.snapshot().get_i64("result").unwrap_or_default()
    );
    Ok(())
}
