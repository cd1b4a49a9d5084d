//! Versioned storage channels backing workflow state.
//!
//! A channel pairs a payload with a version counter. Nodes only ever see
//! snapshots of channel contents; mutations happen at the wave barrier,
//! which bumps the version exactly once per wave when the payload actually
//! changed. Keeping versions out of node hands is what makes wave merges
//! order-insensitive for disjoint writes.

use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::utils::collections::new_fields_map;

/// Common behavior of a versioned storage channel.
pub trait Channel {
    /// The payload stored in this channel.
    type Payload: Clone;

    /// Clone out the current payload.
    fn snapshot(&self) -> Self::Payload;

    /// Mutable access to the payload. Does not touch the version; version
    /// bumps are the barrier's responsibility.
    fn get_mut(&mut self) -> &mut Self::Payload;

    /// Current version counter.
    fn version(&self) -> u32;

    /// Overwrite the version counter.
    fn set_version(&mut self, version: u32);
}

/// The single channel of a workflow [`State`](crate::state::State): a map
/// from field name to JSON value.
///
/// # Examples
///
/// ```rust
/// use stategraph::channels::{Channel, FieldsChannel};
/// use serde_json::json;
///
/// let mut fields = FieldsChannel::default();
/// fields.get_mut().insert("count".into(), json!(0));
///
/// let snap = fields.snapshot();
/// fields.get_mut().insert("count".into(), json!(1));
///
/// // Snapshots are independent of later mutation.
/// assert_eq!(snap.get("count"), Some(&json!(0)));
/// assert_eq!(fields.version(), 1);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldsChannel {
    fields: FxHashMap<String, Value>,
    version: u32,
}

impl FieldsChannel {
    /// Create a channel from an initial payload and version.
    #[must_use]
    pub fn new(fields: FxHashMap<String, Value>, version: u32) -> Self {
        Self { fields, version }
    }

    /// Number of fields currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` when no fields are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Default for FieldsChannel {
    fn default() -> Self {
        Self {
            fields: new_fields_map(),
            version: 1,
        }
    }
}

impl Channel for FieldsChannel {
    type Payload = FxHashMap<String, Value>;

    fn snapshot(&self) -> Self::Payload {
        self.fields.clone()
    }

    fn get_mut(&mut self) -> &mut Self::Payload {
        &mut self.fields
    }

    fn version(&self) -> u32 {
        self.version
    }

    fn set_version(&mut self, version: u32) {
        self.version = version;
    }
}
