use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::state::StateSnapshot;
use crate::types::NodeId;

/// Routing function for a conditional edge.
///
/// Runs at the wave boundary against the freshly merged snapshot and
/// returns a route key, which the edge's mapping translates into a target
/// node. Routers must be pure with respect to the snapshot; they cannot
/// mutate state.
pub type Router = Arc<dyn Fn(&StateSnapshot) -> String + Send + Sync + 'static>;

/// A dynamic edge: a source node, a router, and a key-to-target mapping.
///
/// The mapping is not validated against the router's possible outputs at
/// compile time. A router returning a key the mapping lacks is a runtime
/// routing error that aborts the invocation.
#[derive(Clone)]
pub struct ConditionalEdge {
    from: NodeId,
    router: Router,
    targets: FxHashMap<String, NodeId>,
}

impl ConditionalEdge {
    pub fn new(from: NodeId, router: Router, targets: FxHashMap<String, NodeId>) -> Self {
        Self {
            from,
            router,
            targets,
        }
    }

    pub fn from(&self) -> &NodeId {
        &self.from
    }

    pub fn targets(&self) -> &FxHashMap<String, NodeId> {
        &self.targets
    }

    /// Run the router against a snapshot, producing the route key.
    pub fn route(&self, snapshot: &StateSnapshot) -> String {
        (self.router)(snapshot)
    }

    /// Look up the target node for a route key.
    pub fn target_for(&self, key: &str) -> Option<&NodeId> {
        self.targets.get(key)
    }
}

impl fmt::Debug for ConditionalEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConditionalEdge")
            .field("from", &self.from)
            .field("targets", &self.targets)
            .finish_non_exhaustive()
    }
}
