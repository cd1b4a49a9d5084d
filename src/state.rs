//! State management for workflow execution.
//!
//! The data threaded through a run lives in a [`State`]: a versioned map
//! from field name to JSON value. Nodes never touch the container directly;
//! they receive an immutable [`StateSnapshot`] and hand changes back as a
//! [`NodeUpdate`](crate::node::NodeUpdate), which the wave barrier merges.
//!
//! # Examples
//!
//! ```rust
//! use stategraph::state::State;
//! use serde_json::json;
//!
//! let state = State::builder()
//!     .with_field("num1", json!(5))
//!     .with_field("num2", json!(5))
//!     .build();
//!
//! let snapshot = state.snapshot();
//! assert_eq!(snapshot.fields.get("num1"), Some(&json!(5)));
//! assert_eq!(snapshot.fields_version, 1);
//! ```

use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::channels::{Channel, FieldsChannel};
use crate::utils::collections::new_fields_map;

/// The mutable state container owned by a single invocation.
///
/// Created by the caller, consumed by
/// [`Workflow::invoke`](crate::workflow::Workflow::invoke), and returned as
/// the final merged state when every branch has reached `End`. The fields
/// channel version bumps once per wave iff the merged content changed.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct State {
    /// The single data channel: field name to JSON value.
    pub fields: FieldsChannel,
}

/// Immutable view of the state handed to nodes during a wave.
///
/// Snapshots are cheap clones taken at the wave boundary; nodes in the same
/// wave all observe the same snapshot, so sibling outputs cannot leak into
/// each other mid-wave.
#[derive(Clone, Debug)]
pub struct StateSnapshot {
    /// Field map at the time of the snapshot.
    pub fields: FxHashMap<String, Value>,
    /// Fields channel version when the snapshot was taken.
    pub fields_version: u32,
}

impl StateSnapshot {
    /// Look up a field by name.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Look up a field and coerce it to `i64`.
    ///
    /// Returns `None` when the field is absent or not an integer. Handy in
    /// routers and numeric nodes.
    #[must_use]
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.fields.get(key).and_then(Value::as_i64)
    }

    /// Look up a field and coerce it to `&str`.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }
}

impl State {
    /// Create an empty state (no fields, version 1).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a state from an existing field map.
    #[must_use]
    pub fn from_fields(fields: FxHashMap<String, Value>) -> Self {
        Self {
            fields: FieldsChannel::new(fields, 1),
        }
    }

    /// Fluent builder for states with several initial fields.
    ///
    /// ```rust
    /// use stategraph::state::State;
    /// use serde_json::json;
    ///
    /// let state = State::builder()
    ///     .with_field("topic", json!("pelicans"))
    ///     .with_field("attempt", json!(0))
    ///     .build();
    /// assert_eq!(state.snapshot().fields.len(), 2);
    /// ```
    #[must_use]
    pub fn builder() -> StateBuilder {
        StateBuilder::default()
    }

    /// Insert or overwrite a field. Chainable; does not bump the version
    /// (version bookkeeping belongs to the barrier).
    pub fn set_field(&mut self, key: impl Into<String>, value: Value) -> &mut Self {
        self.fields.get_mut().insert(key.into(), value);
        self
    }

    /// Take an immutable snapshot of the current fields and version.
    #[must_use]
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            fields: self.fields.snapshot(),
            fields_version: self.fields.version(),
        }
    }
}

/// Builder producing a [`State`] with initial fields at version 1.
#[derive(Debug, Default)]
pub struct StateBuilder {
    fields: FxHashMap<String, Value>,
}

impl StateBuilder {
    /// Add an initial field.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    /// Finish building.
    #[must_use]
    pub fn build(self) -> State {
        let mut fields = new_fields_map();
        fields.extend(self.fields);
        State::from_fields(fields)
    }
}
