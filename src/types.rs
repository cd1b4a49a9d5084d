//! Core identifier types for the stategraph workflow engine.
//!
//! A workflow graph is addressed entirely through [`NodeId`]: caller-defined
//! nodes carry a name, while the virtual `Start` and `End` markers anchor the
//! topology without ever executing.
//!
//! # Examples
//!
//! ```rust
//! use stategraph::types::NodeId;
//!
//! let entry = NodeId::Start;
//! let work = NodeId::named("summarize");
//! let exit = NodeId::End;
//!
//! assert!(work.is_named());
//! assert_eq!(work.to_string(), "summarize");
//! assert_eq!(NodeId::from("End"), exit);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a node within a workflow graph.
///
/// `Start` and `End` are virtual: they participate in edges to define entry
/// points and termination, but they hold no work capability and are never
/// executed. Every executable node is `Named` with a string unique within
/// its graph; registering the same name twice overwrites the prior
/// definition.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeId {
    /// Virtual entry marker. Edges out of `Start` form the initial frontier.
    Start,
    /// Virtual terminal marker. A branch that routes to `End` stops.
    End,
    /// A caller-defined, executable node.
    Named(String),
}

impl NodeId {
    /// Convenience constructor for a named node.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        NodeId::Named(name.into())
    }

    /// Returns `true` for the virtual [`Start`](Self::Start) marker.
    #[must_use]
    pub fn is_start(&self) -> bool {
        matches!(self, Self::Start)
    }

    /// Returns `true` for the virtual [`End`](Self::End) marker.
    #[must_use]
    pub fn is_end(&self) -> bool {
        matches!(self, Self::End)
    }

    /// Returns `true` for an executable, caller-defined node.
    #[must_use]
    pub fn is_named(&self) -> bool {
        matches!(self, Self::Named(_))
    }

    /// Returns `true` for either virtual marker.
    #[must_use]
    pub fn is_virtual(&self) -> bool {
        !self.is_named()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "Start"),
            Self::End => write!(f, "End"),
            Self::Named(name) => write!(f, "{name}"),
        }
    }
}

// Developer experience: accept string literals wherever a NodeId is expected.
impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        match s {
            "Start" => NodeId::Start,
            "End" => NodeId::End,
            other => NodeId::Named(other.to_string()),
        }
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        NodeId::from(s.as_str())
    }
}
