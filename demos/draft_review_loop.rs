//! Draft/review loop with an injected text generator.
//!
//! A `draft` node produces text through a [`TextGenerator`] collaborator, a
//! router inspects the review verdict and either loops back for another
//! attempt or finishes. The generator here is a canned stub; swap in a real
//! client by implementing the trait.
//!
//! Run with: `cargo run --example draft_review_loop`

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use stategraph::graphs::GraphBuilder;
use stategraph::node::{Node, NodeContext, NodeError, NodeUpdate};
use stategraph::state::{State, StateSnapshot};
use stategraph::types::NodeId;

/// External text-producing collaborator, injected into nodes at graph
/// construction time.
#[async_trait]
trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, NodeError>;
}

/// Stub generator: each call produces a longer draft than the last.
struct CannedGenerator;

#[async_trait]
impl TextGenerator for CannedGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, NodeError> {
        Ok(format!("draft for {prompt:?} ({} chars of effort)", prompt.len()))
    }
}

struct DraftNode {
    generator: Arc<dyn TextGenerator>,
}

#[async_trait]
impl Node for DraftNode {
    async fn run(&self, snap: StateSnapshot, ctx: NodeContext) -> Result<NodeUpdate, NodeError> {
        let topic = snap
            .get_str("topic")
            .ok_or(NodeError::MissingField { field: "topic" })?;
        let attempt = snap.get_i64("attempt").unwrap_or(0) + 1;
        let prompt = format!("{topic} (attempt {attempt})");

        let draft = self.generator.generate(&prompt).await?;
        ctx.emit("draft", format!("attempt {attempt}"))?;

        Ok(NodeUpdate::patch()
            .with_field("draft", json!(draft))
            .with_field("attempt", json!(attempt)))
    }
}

/// Approves anything from the third attempt onward.
struct ReviewNode;

#[async_trait]
impl Node for ReviewNode {
    async fn run(&self, snap: StateSnapshot, ctx: NodeContext) -> Result<NodeUpdate, NodeError> {
        let attempt = snap.get_i64("attempt").unwrap_or(0);
        let verdict = if attempt >= 3 { "approved" } else { "revise" };
        ctx.emit("review", format!("attempt {attempt}: {verdict}"))?;
        Ok(NodeUpdate::patch().with_field("verdict", json!(verdict)))
    }
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    stategraph::telemetry::init();

    let generator: Arc<dyn TextGenerator> = Arc::new(CannedGenerator);

    let workflow = GraphBuilder::new()
        .add_node("draft", DraftNode { generator })
        .add_node("review", ReviewNode)
        .add_edge(NodeId::Start, "draft")
        .add_edge("draft", "review")
        .add_conditional_edge(
            "review",
            |snap: &StateSnapshot| match snap.get_str("verdict") {
                Some("approved") => "done".to_string(),
                _ => "retry".to_string(),
            },
            [("retry", NodeId::named("draft")), ("done", NodeId::End)],
        )
        .compile()?;

    let initial = State::builder()
        .with_field("topic", json!("pelican migration"))
        .build();

    let final_state = workflow.invoke(initial).await?;
    let snap = final_state.snapshot();
    println!(
        "finished after {} attempt(s): {}",
        snap.get_i64("attempt").unwrap_or_default(),
        snap.get_str("draft").unwrap_or_default()
    );
    Ok(())
}
