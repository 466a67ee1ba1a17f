//! `SyncEngine` — per-observer cached snapshot and minimal patch emission.

use std::collections::{BTreeMap, HashMap};

use crate::error::EncodingError;
use crate::ids::PlayerID;
use crate::snapshot::{
    escape_pointer_segment, join_pointer, SnapshotValue, StatePatch, StateSnapshot, SyncUpdate,
};
use crate::sync::{FieldValue, StateNode, SyncPolicy};

/// Cache representation for one observer. Unlike the public `StateSnapshot`
/// (a flat `SnapshotValue` tree), this keeps the line between "atomic leaf,
/// diffed whole" and "decomposable subtree, diffed field-by-field" that the
/// field registry draws — a plain JSON tree
/// can't tell the two apart once an atomic struct happens to serialize to a
/// JSON object.
#[derive(Clone, PartialEq)]
enum Cached {
    Leaf(SnapshotValue),
    Object(BTreeMap<String, Cached>),
}

impl Cached {
    fn flatten(&self) -> SnapshotValue {
        match self {
            Cached::Leaf(v) => v.clone(),
            Cached::Object(fields) => {
                SnapshotValue::Object(fields.iter().map(|(k, v)| (k.clone(), v.flatten())).collect())
            }
        }
    }
}

/// Maintains one cached snapshot per observer and diffs against it on every
/// `generateDiff` call. Missing an entry is never a panic: it is exactly the
/// trigger for `FirstSync`.
#[derive(Default)]
pub struct SyncEngine {
    cache: HashMap<PlayerID, BTreeMap<String, Cached>>,
}

impl SyncEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops an observer's cached snapshot.
    pub fn remove_observer(&mut self, player: &PlayerID) {
        self.cache.remove(player);
    }

    pub fn has_synced(&self, player: &PlayerID) -> bool {
        self.cache.contains_key(player)
    }

    /// Walks `state`, applying each field's `SyncPolicy` for `observer`.
    pub fn extract_snapshot(
        state: &dyn StateNode,
        observer: &PlayerID,
    ) -> Result<StateSnapshot, EncodingError> {
        let cached = extract_cached(state, observer)?;
        Ok(cached.iter().map(|(k, v)| (k.clone(), v.flatten())).collect())
    }

    /// Raw (unredacted) projection of every non-`serverOnly` field, used by
    /// the state-hash function. This is not what any
    /// observer receives; it exists purely so the hash is a function of
    /// state alone, independent of who is watching.
    pub fn extract_broadcast_snapshot(state: &dyn StateNode) -> Result<StateSnapshot, EncodingError> {
        let mut snapshot = StateSnapshot::new();
        for meta in state.fields() {
            if meta.policy.is_server_only() {
                continue;
            }
            let value = state.field_value(meta.name);
            snapshot.insert(meta.name.to_string(), raw_field_value(&value)?);
        }
        Ok(snapshot)
    }

    /// Computes the diff for `observer` against its cached snapshot,
    /// updating the cache in place.
    pub fn generate_diff(
        &mut self,
        observer: &PlayerID,
        state: &dyn StateNode,
        use_dirty_tracking: bool,
    ) -> Result<SyncUpdate, EncodingError> {
        self.generate_diff_scoped(observer, state, use_dirty_tracking, false)
    }

    /// As `generate_diff`, but fields whose policy isn't broadcast-equivalent
    /// (`SyncPolicy::is_broadcast`) are treated as absent, matching
    /// `ctx.syncBroadcastOnly()`: the same cache is shared
    /// with `generate_diff`, so a later full diff still reconciles any
    /// per-player fields this call skipped.
    pub fn generate_diff_broadcast_only(
        &mut self,
        observer: &PlayerID,
        state: &dyn StateNode,
        use_dirty_tracking: bool,
    ) -> Result<SyncUpdate, EncodingError> {
        self.generate_diff_scoped(observer, state, use_dirty_tracking, true)
    }

    fn generate_diff_scoped(
        &mut self,
        observer: &PlayerID,
        state: &dyn StateNode,
        use_dirty_tracking: bool,
        broadcast_only: bool,
    ) -> Result<SyncUpdate, EncodingError> {
        if !self.cache.contains_key(observer) {
            let snapshot = extract_cached_scoped(state, observer, broadcast_only)?;
            let mut patches = Vec::new();
            for (name, value) in &snapshot {
                leaf_patches(&[name.clone()], value, &mut patches);
            }
            self.cache.insert(observer.clone(), snapshot);
            return Ok(SyncUpdate::FirstSync(patches));
        }

        let dirty_fields: Option<Vec<&'static str>> = if use_dirty_tracking {
            Some(
                state
                    .fields()
                    .iter()
                    .filter(|meta| state.is_field_dirty(meta.name))
                    .map(|meta| meta.name)
                    .collect(),
            )
        } else {
            None
        };

        let previous = self.cache.get(observer).expect("checked above");
        let mut new_snapshot = previous.clone();
        let mut patches = Vec::new();

        for meta in state.fields() {
            if meta.policy.is_server_only() || (broadcast_only && !meta.policy.is_broadcast()) {
                continue;
            }
            let first_appearance = !previous.contains_key(meta.name);
            let field_is_dirty = dirty_fields
                .as_ref()
                .map(|dirty| dirty.contains(&meta.name))
                .unwrap_or(true);
            if !field_is_dirty && !first_appearance {
                continue;
            }

            let value = state.field_value(meta.name);
            let projected = project_field_value(&value, &meta.policy, observer)?;
            let prior = previous.get(meta.name);

            match (prior, projected) {
                (None, None) => {}
                (None, Some(new_value)) => {
                    leaf_patches(&[meta.name.to_string()], &new_value, &mut patches);
                    new_snapshot.insert(meta.name.to_string(), new_value);
                }
                (Some(_), None) => {
                    patches.push(StatePatch::delete(format!("/{}", meta.name)));
                    new_snapshot.remove(meta.name);
                }
                (Some(old_value), Some(new_value)) => {
                    diff_cached(&[meta.name.to_string()], old_value, &new_value, &mut patches);
                    new_snapshot.insert(meta.name.to_string(), new_value);
                }
            }
        }

        self.cache.insert(observer.clone(), new_snapshot);

        if patches.is_empty() {
            Ok(SyncUpdate::NoChange)
        } else {
            Ok(SyncUpdate::Diff(patches))
        }
    }
}

/// Emits one `Set` patch per leaf reachable from `value`, skipping `null`
/// leaves.
fn leaf_patches(path: &[String], value: &Cached, patches: &mut Vec<StatePatch>) {
    match value {
        Cached::Leaf(v) => {
            if !v.is_null() {
                patches.push(StatePatch::set(join_pointer(path), v.clone()));
            }
        }
        Cached::Object(fields) => {
            for (key, child) in fields {
                let mut child_path = path.to_vec();
                child_path.push(escape_pointer_segment(key));
                leaf_patches(&child_path, child, patches);
            }
        }
    }
}

/// Atomic (`Leaf`) values are always replaced whole at `path`. Only matched
/// `Object`/`Object` pairs — i.e. both sides are a decomposable subtree
/// (nested `StateNode` or mapping container) — recurse key-by-key.
fn diff_cached(path: &[String], old: &Cached, new: &Cached, patches: &mut Vec<StatePatch>) {
    if old == new {
        return;
    }
    match (old, new) {
        (Cached::Object(old_map), Cached::Object(new_map)) => {
            for (key, new_value) in new_map {
                let mut child_path = path.to_vec();
                child_path.push(escape_pointer_segment(key));
                match old_map.get(key) {
                    None => leaf_patches(&child_path, new_value, patches),
                    Some(old_value) => diff_cached(&child_path, old_value, new_value, patches),
                }
            }
            for key in old_map.keys() {
                if !new_map.contains_key(key) {
                    let mut child_path = path.to_vec();
                    child_path.push(escape_pointer_segment(key));
                    patches.push(StatePatch::delete(join_pointer(&child_path)));
                }
            }
        }
        _ => patches.push(StatePatch::set(join_pointer(path), new.flatten())),
    }
}

fn extract_cached(
    state: &dyn StateNode,
    observer: &PlayerID,
) -> Result<BTreeMap<String, Cached>, EncodingError> {
    extract_cached_scoped(state, observer, false)
}

fn extract_cached_scoped(
    state: &dyn StateNode,
    observer: &PlayerID,
    broadcast_only: bool,
) -> Result<BTreeMap<String, Cached>, EncodingError> {
    let mut out = BTreeMap::new();
    for meta in state.fields() {
        if meta.policy.is_server_only() || (broadcast_only && !meta.policy.is_broadcast()) {
            continue;
        }
        let value = state.field_value(meta.name);
        if let Some(projected) = project_field_value(&value, &meta.policy, observer)? {
            out.insert(meta.name.to_string(), projected);
        }
    }
    Ok(out)
}

/// Projects a `FieldValue` according to `policy`, recursing into nested
/// `StateNode`s and containers. `Leaf` never decomposes, regardless of the
/// JSON shape its value happens to take.
fn project_field_value(
    value: &FieldValue<'_>,
    policy: &SyncPolicy,
    observer: &PlayerID,
) -> Result<Option<Cached>, EncodingError> {
    match value {
        FieldValue::Leaf(raw) => Ok(policy.project(raw, observer).map(Cached::Leaf)),
        FieldValue::Node(node) => {
            // A nested StateNode's own per-field policies govern visibility
            // of its children; the parent field's policy gates the subtree
            // as a whole only when it would hide a raw marker value.
            let raw_marker = SnapshotValue::Bool(true);
            if policy.project(&raw_marker, observer).is_none() {
                return Ok(None);
            }
            Ok(Some(Cached::Object(extract_cached(*node, observer)?)))
        }
        FieldValue::Map(entries) => {
            let mut out = BTreeMap::new();
            for (key, entry) in entries {
                if let Some(projected) = project_field_value(entry, policy, observer)? {
                    out.insert(key.clone(), projected);
                }
            }
            Ok(Some(Cached::Object(out)))
        }
        FieldValue::Seq(items) => {
            // Sequences diff as a whole array value (no per-index patches);
            // element-level tracking would need stable identity that plain
            // sequences don't carry.
            let mut out = Vec::new();
            for item in items {
                if let Some(projected) = project_field_value(item, policy, observer)? {
                    out.push(projected.flatten());
                }
            }
            Ok(Some(Cached::Leaf(SnapshotValue::Array(out))))
        }
    }
}

fn raw_field_value(value: &FieldValue<'_>) -> Result<SnapshotValue, EncodingError> {
    match value {
        FieldValue::Leaf(raw) => Ok(raw.clone()),
        FieldValue::Node(node) => {
            Ok(SnapshotValue::Object(SyncEngine::extract_broadcast_snapshot(*node)?))
        }
        FieldValue::Map(entries) => {
            let mut out = BTreeMap::new();
            for (key, entry) in entries {
                out.insert(key.clone(), raw_field_value(entry)?);
            }
            Ok(SnapshotValue::Object(out))
        }
        FieldValue::Seq(items) => {
            let mut out = Vec::new();
            for item in items {
                out.push(raw_field_value(item)?);
            }
            Ok(SnapshotValue::Array(out))
        }
    }
}
