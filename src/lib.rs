//! # stategraph
//!
//! A wave-based workflow engine: opaque async nodes wired into a graph,
//! executing concurrently over a shared, partially-updatable state.
//!
//! Define nodes by implementing [`node::Node`], wire them with static and
//! conditional edges through [`graphs::GraphBuilder`], compile into an
//! immutable [`workflow::Workflow`], and
//! [`invoke`](workflow::Workflow::invoke) it with an initial
//! [`state::State`]. Execution proceeds in waves: every node in the frontier
//! runs against the same snapshot, a barrier merges their updates in
//! deterministic order, and routers pick the next frontier. Cycles are
//! allowed as long as a conditional edge can exit them.
//!
//! ```rust
//! use stategraph::graphs::GraphBuilder;
//! use stategraph::state::State;
//! use stategraph::types::NodeId;
//! use stategraph::utils::testing::IncrementNode;
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let workflow = GraphBuilder::new()
//!     .add_node("count", IncrementNode::new("count"))
//!     .add_edge(NodeId::Start, "count")
//!     .add_conditional_edge(
//!         "count",
//!         |snap| {
//!             if snap.get_i64("count").unwrap_or(0) < 3 {
//!                 "again".to_string()
//!             } else {
//!                 "done".to_string()
//!             }
//!         },
//!         [("again", NodeId::named("count")), ("done", NodeId::End)],
//!     )
//!     .compile()?;
//!
//! let final_state = workflow.invoke(State::new()).await?;
//! assert_eq!(final_state.snapshot().get_i64("count"), Some(3));
//! # Ok(())
//! # }
//! ```

pub mod channels;
pub mod event_bus;
pub mod graphs;
pub mod node;
pub mod schedulers;
pub mod state;
pub mod telemetry;
pub mod types;
pub mod utils;
pub mod workflow;
