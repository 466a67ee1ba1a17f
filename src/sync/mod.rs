//! Per-field visibility policy and the `StateNode` contract state trees
//! implement to be walked by `SyncEngine`.

pub mod engine;
pub mod path_flattener;

use std::sync::Arc;

use crate::ids::PlayerID;
use crate::snapshot::SnapshotValue;

/// The five `SyncPolicy` variants are a closed sum type: rather than dynamic dispatch by protocol, each variant carries
/// the projection closure resolved once when the field registry is built.
#[derive(Clone)]
pub enum SyncPolicy {
    ServerOnly,
    Broadcast,
    PerPlayer(Arc<dyn Fn(&SnapshotValue, &PlayerID) -> Option<SnapshotValue> + Send + Sync>),
    Masked(Arc<dyn Fn(&SnapshotValue) -> SnapshotValue + Send + Sync>),
    Custom(Arc<dyn Fn(&PlayerID, &SnapshotValue) -> Option<SnapshotValue> + Send + Sync>),
}

impl SyncPolicy {
    pub fn per_player(
        f: impl Fn(&SnapshotValue, &PlayerID) -> Option<SnapshotValue> + Send + Sync + 'static,
    ) -> Self {
        SyncPolicy::PerPlayer(Arc::new(f))
    }

    pub fn masked(f: impl Fn(&SnapshotValue) -> SnapshotValue + Send + Sync + 'static) -> Self {
        SyncPolicy::Masked(Arc::new(f))
    }

    pub fn custom(
        f: impl Fn(&PlayerID, &SnapshotValue) -> Option<SnapshotValue> + Send + Sync + 'static,
    ) -> Self {
        SyncPolicy::Custom(Arc::new(f))
    }

    /// Projects `raw` for `observer`. Returns `None` for `serverOnly` or when
    /// the projection function hides the field for this observer.
    pub fn project(&self, raw: &SnapshotValue, observer: &PlayerID) -> Option<SnapshotValue> {
        match self {
            SyncPolicy::ServerOnly => None,
            SyncPolicy::Broadcast => Some(raw.clone()),
            SyncPolicy::PerPlayer(f) => f(raw, observer),
            SyncPolicy::Masked(f) => Some(f(raw)),
            SyncPolicy::Custom(f) => f(observer, raw),
        }
    }

    /// `true` for fields that project identically for every observer, used
    /// by the state-hash function to build the broadcast-only projection.
    pub fn is_broadcast(&self) -> bool {
        matches!(self, SyncPolicy::Broadcast | SyncPolicy::Masked(_))
    }

    pub fn is_server_only(&self) -> bool {
        matches!(self, SyncPolicy::ServerOnly)
    }
}

/// Static per-field metadata: declared name and resolved visibility policy.
#[derive(Clone)]
pub struct FieldMeta {
    pub name: &'static str,
    pub policy: SyncPolicy,
}

/// The shape a field's live value takes when walked by `SyncEngine`. Atomic
/// structs and primitives are both `Leaf` — neither decomposes further, the
/// diff for either emits (or replaces) the whole value at one path. Only
/// nested `StateNode`s recurse.
pub enum FieldValue<'a> {
    Leaf(SnapshotValue),
    Node(&'a dyn StateNode),
    Map(Vec<(String, FieldValue<'a>)>),
    Seq(Vec<FieldValue<'a>>),
}

/// A record with named, policy-annotated, dirty-tracked fields.
///
/// Implementations are normally hand-written per state type: a `fields()`
/// registry built once, and `field_value`/`is_field_dirty` delegating to the
/// struct's own members.
pub trait StateNode: Send + Sync {
    fn type_name(&self) -> &'static str;

    /// Declared fields in a stable, implementation-chosen order. Order only
    /// affects `FirstSync` patch ordering, never correctness.
    fn fields(&self) -> &[FieldMeta];

    fn field_value(&self, name: &str) -> FieldValue<'_>;

    /// `true` if the field's dirty bit is set, or if the field has never
    /// been read by this engine before (first appearance is always dirty).
    fn is_field_dirty(&self, name: &str) -> bool;

    /// Clears every field's dirty bit (called once per tick, after sync
    /// emission).
    fn clear_dirty(&mut self);
}

/// Marker wrapper for a struct that is compared/replaced as a whole rather
/// than recursed into field-by-field, even though it isn't a primitive. Any
/// `T: Serialize` works; the wrapper exists only to route the value through
/// `FieldValue::Leaf` instead of requiring `T` to implement `StateNode`.
#[derive(Debug, Clone, PartialEq)]
pub struct Atomic<T>(pub T);

impl<T> Atomic<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }
}

impl<T: serde::Serialize> Atomic<T> {
    /// Projects the wrapped value into the `FieldValue::Leaf` a
    /// `StateNode::field_value` impl returns for an atomic field — the
    /// struct is serialized whole and never decomposed by `SyncEngine`.
    pub fn field_value(&self) -> Result<FieldValue<'static>, crate::error::EncodingError> {
        to_snapshot_value(&self.0).map(FieldValue::Leaf)
    }
}

/// Converts any `serde::Serialize` value into a `SnapshotValue` leaf,
/// failing with the `EncodingError` contract.
pub fn to_snapshot_value<T: serde::Serialize>(
    value: &T,
) -> Result<SnapshotValue, crate::error::EncodingError> {
    serde_json::to_value(value)
        .map(SnapshotValue::from)
        .map_err(|e| crate::error::EncodingError {
            field: std::any::type_name::<T>().to_string(),
            reason: e.to_string(),
        })
}
