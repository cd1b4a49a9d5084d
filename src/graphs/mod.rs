//! Graph definition and compilation.
//!
//! A workflow starts life as a [`GraphBuilder`]: register nodes, wire static
//! and conditional edges, then [`compile`](GraphBuilder::compile) into an
//! immutable [`Workflow`](crate::workflow::Workflow). All structural
//! validation happens at compile time and surfaces as a [`DefinitionError`].

mod builder;
mod compilation;
mod edges;

pub use builder::GraphBuilder;
pub use compilation::DefinitionError;
pub use edges::{ConditionalEdge, Router};
