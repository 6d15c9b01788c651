//! Client identities and the updates delivered to them

use bytes::Bytes;

/// Unique identifier for a registered client
///
/// Assigned monotonically by the broker and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(pub u64);

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A committed value pushed to a subscriber
///
/// Cheap to clone: `Bytes` is reference counted, so every subscriber of a
/// key shares the same allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Update {
    /// Key that was written
    pub key: Bytes,
    /// Value committed for the key
    pub value: Bytes,
}

impl Update {
    /// Create an update
    pub fn new(key: impl Into<Bytes>, value: impl Into<Bytes>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}
