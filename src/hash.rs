//! FNV-1a-32 hashing and canonical JSON encoding.
//!
//! Every structural path and every recorded state hash in this crate goes
//! through this single hasher so replay comparisons and path routing stay
//! byte-for-byte reproducible across platforms.

use std::collections::BTreeMap;

use crate::snapshot::SnapshotValue;

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

pub fn fnv1a32(bytes: &[u8]) -> u32 {
    let mut hash = FNV_OFFSET_BASIS;
    for &byte in bytes {
        hash ^= byte as u32;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Canonical JSON text for a `SnapshotValue`: object keys sorted, numbers
/// rendered through a fixed representation. `BTreeMap` already keeps keys
/// sorted, so this is a straightforward recursive writer rather than a
/// generic canonicalizer.
pub fn canonical_json(value: &SnapshotValue) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &SnapshotValue, out: &mut String) {
    match value {
        SnapshotValue::Null => out.push_str("null"),
        SnapshotValue::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        SnapshotValue::Int(i) => out.push_str(&i.to_string()),
        SnapshotValue::Double(d) => out.push_str(&format_double(*d)),
        SnapshotValue::String(s) => {
            out.push_str(&serde_json::to_string(s).expect("string always serializes"));
        }
        SnapshotValue::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        SnapshotValue::Object(fields) => {
            out.push('{');
            for (i, (key, value)) in fields.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&serde_json::to_string(key).expect("string always serializes"));
                out.push(':');
                write_canonical(value, out);
            }
            out.push('}');
        }
    }
}

/// Fixed floating-point rendering so the same value never produces two
/// different canonical strings across platforms. State that
/// wants byte-stable hashes should prefer fixed-point representations and
/// route them through `SnapshotValue::Int`; this formatter only guards the
/// `Double` leaf against disagreement between `f64::to_string` variants.
fn format_double(d: f64) -> String {
    if d == d.trunc() && d.is_finite() && d.abs() < 1e15 {
        format!("{:.1}", d)
    } else {
        format!("{:e}", d)
    }
}

/// FNV-1a-32 of the canonical JSON of a field-name-sorted broadcast snapshot.
pub fn state_hash(broadcast_snapshot: &BTreeMap<String, SnapshotValue>) -> u32 {
    let value = SnapshotValue::Object(broadcast_snapshot.clone());
    fnv1a32(canonical_json(&value).as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic_across_key_order() {
        let mut a = BTreeMap::new();
        a.insert("count".to_string(), SnapshotValue::Int(5));
        a.insert("name".to_string(), SnapshotValue::String("x".into()));

        let mut b = BTreeMap::new();
        b.insert("name".to_string(), SnapshotValue::String("x".into()));
        b.insert("count".to_string(), SnapshotValue::Int(5));

        assert_eq!(state_hash(&a), state_hash(&b));
    }

    #[test]
    fn known_fnv1a32_vector() {
        assert_eq!(fnv1a32(b""), 0x811c_9dc5);
        assert_eq!(fnv1a32(b"a"), 0xe40c_292c);
    }
}
