//! Shared type map for the parallel parser phase.
//!
//! Multiple files may declare the same `(namespace, typeName)` (partial
//! declarations); parser workers merge their `RawType` stream into this map
//! concurrently. Each entry carries a per-entry lock; field updates are
//! compare-then-set under that lock (first writer wins, members dedup by
//! signature, base lists accumulate). Snapshot reads happen only after all
//! writers have joined.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex};

use crate::api::types::{MemberInfo, TypeKind};

// ─── Parser output ───────────────────────────────────────────────────

/// One type declaration as produced by a language front-end, before merging.
#[derive(Debug, Clone)]
pub struct RawType {
    pub namespace: String,
    /// Display name including generic parameters as written (`Response<T>`).
    pub name: String,
    pub kind: TypeKind,
    /// Raw base list as written; classified into base/interfaces later.
    pub bases: Vec<String>,
    pub doc: Option<String>,
    pub members: Vec<MemberInfo>,
    /// Enum value names in declaration order; `Some` only for enums.
    pub values: Option<Vec<String>>,
    /// Display names of every type referenced from the public surface of
    /// this declaration (bases, member return/parameter/field types,
    /// generic arguments). Fuel for dependency attribution.
    pub refs: Vec<String>,
}

/// A namespace-scope `using` directive observed in one file.
#[derive(Debug, Clone)]
pub struct UsingDirective {
    /// Imported namespace, or the aliased target for alias directives.
    pub target: String,
    /// `Some(alias)` for `using Alias = Target;`.
    pub alias: Option<String>,
}

// ─── Merged entry ────────────────────────────────────────────────────

/// Mutable accumulator for one `(namespace, name)` key. Read-only outside
/// the parsing phase.
#[derive(Debug, Clone)]
pub struct MergedType {
    pub namespace: String,
    pub name: String,
    pub kind: TypeKind,
    pub raw_bases: Vec<String>,
    pub doc: Option<String>,
    pub members: Vec<MemberInfo>,
    pub values: Option<Vec<String>>,
    pub refs: BTreeSet<String>,
    // Filled by the classification phase, after all writers join.
    pub base: Option<String>,
    pub interfaces: Vec<String>,
    pub entry_point: bool,
    pub is_error: bool,
    pub re_exported_from: Option<String>,
}

impl MergedType {
    fn from_raw(raw: RawType) -> Self {
        let mut merged = Self {
            namespace: raw.namespace,
            name: raw.name,
            kind: raw.kind,
            raw_bases: Vec::new(),
            doc: raw.doc,
            members: Vec::new(),
            values: raw.values,
            refs: raw.refs.into_iter().collect(),
            base: None,
            interfaces: Vec::new(),
            entry_point: false,
            is_error: false,
            re_exported_from: None,
        };
        for b in raw.bases {
            if !merged.raw_bases.contains(&b) {
                merged.raw_bases.push(b);
            }
        }
        let mut sigs = HashSet::new();
        for m in raw.members {
            if sigs.insert(m.sig.clone()) {
                merged.members.push(m);
            }
        }
        merged
    }

    /// Apply a later declaration of the same key. First writer wins for
    /// `doc` and `values`; `kind` keeps the first writer; bases accumulate;
    /// members deduplicate by signature (second writer silently drops).
    fn absorb(&mut self, raw: RawType) {
        if self.doc.is_none() {
            self.doc = raw.doc;
        }
        if self.values.is_none() {
            self.values = raw.values;
        }
        for b in raw.bases {
            if !self.raw_bases.contains(&b) {
                self.raw_bases.push(b);
            }
        }
        let existing: HashSet<&str> = self.members.iter().map(|m| m.sig.as_str()).collect();
        let mut fresh: Vec<MemberInfo> = Vec::new();
        for m in raw.members {
            if !existing.contains(m.sig.as_str())
                && !fresh.iter().any(|f: &MemberInfo| f.sig == m.sig)
            {
                fresh.push(m);
            }
        }
        self.members.extend(fresh);
        self.refs.extend(raw.refs);
    }

    /// Simple name with generic parameters stripped.
    pub fn simple_name(&self) -> &str {
        crate::strip_generics(&self.name)
    }
}

// ─── Concurrent map ──────────────────────────────────────────────────

type TypeKey = (String, String);

/// Concurrent keyed map of merged type entries. `merge` is safe to call from
/// any number of parser workers; `into_entries` must only run after every
/// writer has joined (the join provides the happens-before edge the
/// lock-free reads rely on).
#[derive(Default)]
pub struct TypeMap {
    entries: Mutex<HashMap<TypeKey, Arc<Mutex<MergedType>>>>,
}

impl TypeMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn merge(&self, raw: RawType) {
        use std::collections::hash_map::Entry;

        let key = (raw.namespace.clone(), raw.name.clone());
        let entry = {
            let mut map = self.entries.lock().unwrap_or_else(|e| e.into_inner());
            match map.entry(key) {
                Entry::Vacant(slot) => {
                    slot.insert(Arc::new(Mutex::new(MergedType::from_raw(raw))));
                    return;
                }
                Entry::Occupied(slot) => slot.get().clone(),
            }
        };
        // The outer map lock is released; only the per-entry lock is held
        // while fields are compared-then-set.
        let mut merged = entry.lock().unwrap_or_else(|e| e.into_inner());
        merged.absorb(raw);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drain the map into plain entries. Only valid after all writers joined.
    pub fn into_entries(self) -> Vec<MergedType> {
        let map = self.entries.into_inner().unwrap_or_else(|e| e.into_inner());
        map.into_values()
            .map(|arc| match Arc::try_unwrap(arc) {
                Ok(m) => m.into_inner().unwrap_or_else(|e| e.into_inner()),
                Err(shared) => shared.lock().unwrap_or_else(|e| e.into_inner()).clone(),
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "typemap_tests.rs"]
mod tests;
