//! `PathFlattener` + `PathHasher`: structural (schema-only)
//! paths with mapping keys/array indices replaced by `*`, each assigned a
//! deterministic FNV-1a-32 hash, plus a trie that resolves a concrete patch
//! path back to its structural hash at runtime.

use std::collections::HashMap;

use crate::hash::fnv1a32;

/// How a declared field's value routes through the structural-path walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldShape {
    /// Primitive or atomic struct — a path terminus.
    Leaf,
    /// Nested `StateNode` of the named registered type — recurse.
    Node(&'static str),
    /// Mapping whose values are the named registered `StateNode` type —
    /// the key becomes a wildcard segment, then recurse into the type.
    NodeMap(&'static str),
    /// Mapping whose values are leaves — the key becomes a wildcard segment
    /// terminus.
    LeafMap,
    /// Sequence of leaves — the index becomes a wildcard terminus.
    Sequence,
}

#[derive(Debug, Clone, Copy)]
pub struct SchemaField {
    pub name: &'static str,
    pub shape: FieldShape,
}

#[derive(Debug, Clone, Copy)]
pub struct TypeSchema {
    pub type_name: &'static str,
    pub fields: &'static [SchemaField],
}

/// Root type plus every registered nested type, keyed by `type_name`.
pub struct Schema {
    pub root: &'static str,
    pub types: HashMap<&'static str, TypeSchema>,
}

impl Schema {
    pub fn new(root: &'static str, types: impl IntoIterator<Item = TypeSchema>) -> Self {
        Self { root, types: types.into_iter().map(|t| (t.type_name, t)).collect() }
    }
}

const WILDCARD: &str = "*";

/// Every distinct structural path reachable from the schema root, with its
/// deterministic FNV-1a-32 hash.
pub struct PathFlattener {
    /// `structural_path -> hash`.
    pub paths: HashMap<String, u32>,
}

impl PathFlattener {
    pub fn flatten(schema: &Schema) -> Self {
        let mut paths = HashMap::new();
        if let Some(root) = schema.types.get(schema.root) {
            walk(schema, root, &mut Vec::new(), &mut paths);
        }
        Self { paths }
    }

    pub fn hash_of(&self, structural_path: &str) -> Option<u32> {
        self.paths.get(structural_path).copied()
    }
}

fn walk(schema: &Schema, ty: &TypeSchema, prefix: &mut Vec<String>, out: &mut HashMap<String, u32>) {
    for field in ty.fields {
        prefix.push(field.name.to_string());
        match field.shape {
            FieldShape::Leaf => record(prefix, out),
            FieldShape::Node(child_ty) => {
                if let Some(child) = schema.types.get(child_ty) {
                    walk(schema, child, prefix, out);
                } else {
                    record(prefix, out);
                }
            }
            FieldShape::NodeMap(child_ty) => {
                prefix.push(WILDCARD.to_string());
                if let Some(child) = schema.types.get(child_ty) {
                    walk(schema, child, prefix, out);
                } else {
                    record(prefix, out);
                }
                prefix.pop();
            }
            FieldShape::LeafMap | FieldShape::Sequence => {
                prefix.push(WILDCARD.to_string());
                record(prefix, out);
                prefix.pop();
            }
        }
        prefix.pop();
    }
}

fn record(path: &[String], out: &mut HashMap<String, u32>) {
    let structural = format!("/{}", path.join("/"));
    let hash = fnv1a32(structural.as_bytes());
    out.insert(structural, hash);
}

/// A segment in the trie: either a fixed field name or a wildcard matching
/// any concrete key/index.
enum TrieEdge {
    Field(&'static str),
    Wildcard,
}

struct TrieNode {
    edges: Vec<(TrieEdge, TrieNode)>,
    /// Set at a terminus: the structural path hash for everything routed here.
    hash: Option<u32>,
}

impl TrieNode {
    fn empty() -> Self {
        Self { edges: Vec::new(), hash: None }
    }
}

/// Resolution result for a concrete patch path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    pub structural_hash: u32,
    /// The first dynamic (wildcard) key encountered while walking, if any.
    pub first_dynamic_key: Option<String>,
}

/// Builds a trie over the schema's structural paths and resolves concrete
/// patch paths (e.g. `/monsters/6/position/v/x`) back to a structural hash
/// plus the first dynamic key captured along the way.
pub struct PathHasher {
    root: TrieNode,
}

impl PathHasher {
    pub fn build(schema: &Schema) -> Self {
        let mut root = TrieNode::empty();
        if let Some(ty) = schema.types.get(schema.root) {
            insert_type(schema, ty, &mut root, &mut Vec::new());
        }
        Self { root }
    }

    /// Resolves a concrete JSON-Pointer patch path. Falls back to treating
    /// the first and last components as static and everything between as
    /// wildcard when the trie has no match for an unknown path shape.
    pub fn resolve(&self, concrete_path: &str) -> ResolvedPath {
        let segments: Vec<&str> = concrete_path.trim_start_matches('/').split('/').collect();
        if let Some(resolved) = self.walk_trie(&segments) {
            return resolved;
        }
        self.fallback(&segments)
    }

    fn walk_trie(&self, segments: &[&str]) -> Option<ResolvedPath> {
        let mut node = &self.root;
        let mut first_dynamic_key = None;
        for segment in segments {
            let mut matched = None;
            for (edge, child) in &node.edges {
                match edge {
                    TrieEdge::Field(name) if *name == *segment => {
                        matched = Some(child);
                        break;
                    }
                    _ => {}
                }
            }
            if matched.is_none() {
                for (edge, child) in &node.edges {
                    if matches!(edge, TrieEdge::Wildcard) {
                        if first_dynamic_key.is_none() {
                            first_dynamic_key = Some((*segment).to_string());
                        }
                        matched = Some(child);
                        break;
                    }
                }
            }
            node = matched?;
        }
        node.hash.map(|hash| ResolvedPath { structural_hash: hash, first_dynamic_key })
    }

    fn fallback(&self, segments: &[&str]) -> ResolvedPath {
        let mut pattern_segments: Vec<String> = segments.iter().map(|s| s.to_string()).collect();
        let mut first_dynamic_key = None;
        if pattern_segments.len() > 2 {
            for seg in pattern_segments.iter_mut().take(pattern_segments.len() - 1).skip(1) {
                if first_dynamic_key.is_none() {
                    first_dynamic_key = Some(seg.clone());
                }
                *seg = WILDCARD.to_string();
            }
        }
        let structural = format!("/{}", pattern_segments.join("/"));
        ResolvedPath { structural_hash: fnv1a32(structural.as_bytes()), first_dynamic_key }
    }
}

fn insert_type(schema: &Schema, ty: &TypeSchema, node: &mut TrieNode, prefix: &mut Vec<String>) {
    for field in ty.fields {
        prefix.push(field.name.to_string());
        let child = find_or_insert(node, TrieEdge::Field(field.name));
        match field.shape {
            FieldShape::Leaf => child.hash = Some(structural_hash(prefix)),
            FieldShape::Node(child_ty) => {
                if let Some(inner) = schema.types.get(child_ty) {
                    insert_type(schema, inner, child, prefix);
                } else {
                    child.hash = Some(structural_hash(prefix));
                }
            }
            FieldShape::NodeMap(child_ty) => {
                prefix.push(WILDCARD.to_string());
                let wc = find_or_insert(child, TrieEdge::Wildcard);
                if let Some(inner) = schema.types.get(child_ty) {
                    insert_type(schema, inner, wc, prefix);
                } else {
                    wc.hash = Some(structural_hash(prefix));
                }
                prefix.pop();
            }
            FieldShape::LeafMap | FieldShape::Sequence => {
                prefix.push(WILDCARD.to_string());
                let wc = find_or_insert(child, TrieEdge::Wildcard);
                wc.hash = Some(structural_hash(prefix));
                prefix.pop();
            }
        }
        prefix.pop();
    }
}

fn find_or_insert<'a>(node: &'a mut TrieNode, edge: TrieEdge) -> &'a mut TrieNode {
    let pos = node.edges.iter().position(|(e, _)| match (&e, &edge) {
        (TrieEdge::Field(a), TrieEdge::Field(b)) => a == b,
        (TrieEdge::Wildcard, TrieEdge::Wildcard) => true,
        _ => false,
    });
    let idx = match pos {
        Some(idx) => idx,
        None => {
            node.edges.push((edge, TrieNode::empty()));
            node.edges.len() - 1
        }
    };
    &mut node.edges[idx].1
}

fn structural_hash(path: &[String]) -> u32 {
    let structural = format!("/{}", path.join("/"));
    fnv1a32(structural.as_bytes())
}
