//! Post-parse classification: split raw base lists into base vs interfaces,
//! and mark exception-derived types.
//!
//! Runs single-threaded after every parser worker has joined, so entries are
//! read and rewritten without locks.

use std::collections::{HashMap, HashSet};

use crate::api::typemap::MergedType;
use crate::api::types::TypeKind;
use crate::strip_generics;

// ─── Base vs interface ───────────────────────────────────────────────

/// Classify each entry's raw base bag.
///
/// Locally-declared kinds decide first; names the index does not define fall
/// back to the `I`-prefix convention, which is never applied to local types.
pub fn classify_bases(entries: &mut [MergedType]) {
    let local_kinds: HashMap<String, TypeKind> = {
        let mut kinds = HashMap::new();
        for entry in entries.iter() {
            kinds.entry(entry.simple_name().to_string()).or_insert(entry.kind);
        }
        kinds
    };

    for entry in entries.iter_mut() {
        let raw = std::mem::take(&mut entry.raw_bases);
        entry.base = None;
        entry.interfaces.clear();

        // Enum underlying types and delegate signatures are not inheritance.
        if matches!(entry.kind, TypeKind::Enum | TypeKind::Delegate) {
            continue;
        }

        if entry.kind == TypeKind::Interface {
            // Language rule: everything an interface extends is an interface.
            entry.interfaces = raw;
        } else {
            for base in raw {
                let simple = base_simple_name(&base);
                match local_kinds.get(simple) {
                    Some(TypeKind::Interface) => entry.interfaces.push(base),
                    Some(_) => {
                        if entry.base.is_none() {
                            entry.base = Some(base);
                        }
                    }
                    None => {
                        if looks_like_interface(simple) {
                            entry.interfaces.push(base);
                        } else if entry.base.is_none() {
                            entry.base = Some(base);
                        }
                    }
                }
            }
        }
        entry.interfaces.sort();
        entry.interfaces.dedup();
    }
}

/// Simple name of a base entry: last dotted segment, generics stripped.
fn base_simple_name(base: &str) -> &str {
    let no_generics = strip_generics(base);
    no_generics.rsplit('.').next().unwrap_or(no_generics)
}

/// Convention for names the index does not define: uppercase `I` followed by
/// another uppercase letter reads as an interface.
fn looks_like_interface(simple: &str) -> bool {
    let mut chars = simple.chars();
    chars.next() == Some('I') && chars.next().is_some_and(|c| c.is_ascii_uppercase())
}

// ─── Exception marking ───────────────────────────────────────────────

/// Mark types whose base chain leaves the index at the standard exception
/// root (or an `*Exception` foreign base). Cycles in local chains terminate
/// via the visited set.
pub fn mark_error_types(entries: &mut [MergedType]) {
    let local_bases: HashMap<String, Option<String>> = entries
        .iter()
        .map(|e| {
            (
                e.simple_name().to_string(),
                e.base.as_deref().map(|b| base_simple_name(b).to_string()),
            )
        })
        .collect();

    for entry in entries.iter_mut() {
        let mut visited: HashSet<String> = HashSet::new();
        let mut current = entry.base.as_deref().map(|b| base_simple_name(b).to_string());
        let mut is_error = false;
        while let Some(name) = current {
            if !visited.insert(name.clone()) {
                break;
            }
            match local_bases.get(&name) {
                Some(next) => current = next.clone(),
                None => {
                    // Foreign base: the chain left the source tree here.
                    is_error = name == "Exception" || name.ends_with("Exception");
                    current = None;
                }
            }
        }
        entry.is_error = is_error;
    }
}

#[cfg(test)]
#[path = "classify_tests.rs"]
mod tests;
