//! Reachability analysis: which types form the client surface.
//!
//! Builds a type-reference graph from member signatures (token-boundary-aware
//! identifier extraction filtered against known local names), adds
//! interface→implementer edges, selects roots from explicit entry points with
//! structural fallbacks, and BFS-walks to the reachable set. The final client
//! set is the reachable types that actually carry operations.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

use crate::api::{ApiIndex, MemberKind, TypeInfo, TypeKind};
use crate::{signature_idents, strip_generics};

// ─── Node model ──────────────────────────────────────────────────────

/// One locally-defined type in the reference graph, keyed by normalized
/// simple name (generic parameters stripped).
#[derive(Debug, Clone)]
pub struct TypeNode {
    pub name: String,
    pub has_operations: bool,
    pub is_explicit_entry_point: bool,
    /// Interfaces are never roots; they participate via implementer edges.
    pub is_root_candidate: bool,
    pub referenced_types: BTreeSet<String>,
}

/// A client type eligible for coverage scoring, with its scoreable
/// operations.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientType {
    pub name: String,
    pub operations: Vec<ClientOperation>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClientOperation {
    pub name: String,
    pub signature: String,
}

/// The coverage-eligible surface: reachable, operation-bearing types,
/// deduplicated by normalized simple name and sorted for determinism.
#[derive(Debug, Clone, Default)]
pub struct ClientSet {
    pub types: Vec<ClientType>,
}

impl ClientSet {
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.types.iter().map(|t| t.name.as_str()).collect()
    }

    /// Signature lookup table `"ClientType.Operation"` → full signature.
    pub fn signature_table(&self) -> HashMap<String, String> {
        let mut table = HashMap::new();
        for t in &self.types {
            for op in &t.operations {
                table.insert(format!("{}.{}", t.name, op.name), op.signature.clone());
            }
        }
        table
    }
}

// ─── Graph build ─────────────────────────────────────────────────────

/// Compute the client set for an index: graph build, root selection, BFS,
/// and the operations intersection.
pub fn client_set(index: &ApiIndex) -> ClientSet {
    let graph = Graph::build(index);
    let reachable = graph.reachable_from_roots();

    let mut picked: BTreeMap<String, ClientType> = BTreeMap::new();
    for (_, info) in index.all_types() {
        let name = strip_generics(&info.name).to_string();
        if !reachable.contains(&name) || !info.has_methods() {
            continue;
        }
        if info.kind == TypeKind::Interface && !graph.implementers.contains_key(&name) {
            continue;
        }
        let operations = operations_of(info);
        picked.entry(name.clone()).or_insert(ClientType { name, operations });
    }

    ClientSet { types: picked.into_values().collect() }
}

fn operations_of(info: &TypeInfo) -> Vec<ClientOperation> {
    info.members
        .as_deref()
        .unwrap_or_default()
        .iter()
        .filter(|m| m.kind == MemberKind::Method)
        .map(|m| ClientOperation { name: m.name.clone(), signature: m.sig.clone() })
        .collect()
}

struct Graph {
    nodes: HashMap<String, TypeNode>,
    /// interface simple name → implementing type simple names.
    implementers: HashMap<String, BTreeSet<String>>,
    /// referenced-by indegree over `referenced_types` edges.
    indegree: HashMap<String, usize>,
}

impl Graph {
    fn build(index: &ApiIndex) -> Self {
        let known: HashSet<String> = index
            .all_types()
            .map(|(_, t)| strip_generics(&t.name).to_string())
            .collect();

        let mut nodes: HashMap<String, TypeNode> = HashMap::new();
        let mut implementers: HashMap<String, BTreeSet<String>> = HashMap::new();

        for (_, info) in index.all_types() {
            let name = strip_generics(&info.name).to_string();

            let mut referenced: BTreeSet<String> = BTreeSet::new();
            for member in info.members.as_deref().unwrap_or_default() {
                for ident in signature_idents(&member.sig) {
                    if ident != name && known.contains(&ident) {
                        referenced.insert(ident);
                    }
                }
            }

            for iface in info.interfaces.as_deref().unwrap_or_default() {
                implementers
                    .entry(strip_generics(iface).to_string())
                    .or_default()
                    .insert(name.clone());
            }

            let node = TypeNode {
                name: name.clone(),
                has_operations: info.has_methods(),
                is_explicit_entry_point: info.entry_point == Some(true),
                is_root_candidate: info.kind != TypeKind::Interface,
                referenced_types: referenced,
            };
            // Partial declarations were merged upstream; same simple name in
            // two namespaces collapses to one node, unioning edges.
            match nodes.entry(name) {
                std::collections::hash_map::Entry::Vacant(v) => {
                    v.insert(node);
                }
                std::collections::hash_map::Entry::Occupied(mut o) => {
                    let existing = o.get_mut();
                    existing.has_operations |= node.has_operations;
                    existing.is_explicit_entry_point |= node.is_explicit_entry_point;
                    existing.referenced_types.extend(node.referenced_types);
                }
            }
        }

        let mut indegree: HashMap<String, usize> = HashMap::new();
        for node in nodes.values() {
            for target in &node.referenced_types {
                *indegree.entry(target.clone()).or_default() += 1;
            }
        }

        Self { nodes, implementers, indegree }
    }

    /// Root selection: explicit entry points; else indegree-zero operation
    /// carriers plus types referencing operation carriers; else every
    /// operation carrier.
    fn select_roots(&self) -> BTreeSet<String> {
        let mut roots: BTreeSet<String> = self
            .nodes
            .values()
            .filter(|n| n.is_explicit_entry_point && n.is_root_candidate)
            .map(|n| n.name.clone())
            .collect();
        if !roots.is_empty() {
            return roots;
        }

        for node in self.nodes.values() {
            if !node.is_root_candidate {
                continue;
            }
            let unreferenced = self.indegree.get(&node.name).copied().unwrap_or(0) == 0;
            if node.has_operations && unreferenced {
                roots.insert(node.name.clone());
            }
            let references_operations = node.referenced_types.iter().any(|t| {
                self.nodes.get(t).is_some_and(|n| n.has_operations)
            });
            if references_operations {
                roots.insert(node.name.clone());
            }
        }
        if !roots.is_empty() {
            return roots;
        }

        self.nodes
            .values()
            .filter(|n| n.has_operations)
            .map(|n| n.name.clone())
            .collect()
    }

    /// BFS over reference edges and interface→implementer edges. Cycles are
    /// tolerated via the visited set.
    fn reachable_from_roots(&self) -> HashSet<String> {
        let roots = self.select_roots();
        let mut visited: HashSet<String> = HashSet::new();
        let mut queue: VecDeque<String> = VecDeque::new();

        for root in roots {
            if visited.insert(root.clone()) {
                queue.push_back(root);
            }
        }
        while let Some(current) = queue.pop_front() {
            let mut neighbors: Vec<&String> = Vec::new();
            if let Some(node) = self.nodes.get(&current) {
                neighbors.extend(node.referenced_types.iter());
            }
            if let Some(impls) = self.implementers.get(&current) {
                neighbors.extend(impls.iter());
            }
            for next in neighbors {
                if self.nodes.contains_key(next) && visited.insert(next.clone()) {
                    queue.push_back(next.clone());
                }
            }
        }
        visited
    }
}

#[cfg(test)]
#[path = "graph_tests.rs"]
mod tests;
