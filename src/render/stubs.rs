//! Coverage-aware stub formatter.
//!
//! Renders the index as compact C#-shaped stubs under a character budget.
//! Types are admitted in priority order (clients, their dependencies,
//! errors, enums, models, everything else), each together with its direct
//! dependency types. In coverage mode only types with uncovered operations
//! (and what they reference) are rendered, with method lists filtered down
//! to the uncovered ones.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::api::{ApiIndex, MemberInfo, MemberKind, TypeInfo, TypeKind, UsageIndex};
use crate::{signature_idents, strip_generics, xml_escape};

/// Slack reserved for the truncation marker before the budget trips.
const BUDGET_RESERVE: usize = 100;

#[derive(Debug, Clone)]
pub struct StubOptions {
    /// Character budget; 0 means unlimited.
    pub budget: usize,
}

impl Default for StubOptions {
    fn default() -> Self {
        Self { budget: 60_000 }
    }
}

// ─── Entry point ─────────────────────────────────────────────────────

/// Render the stub bundle. With a `UsageIndex` the output leads with a
/// coverage summary and keeps only coverage-relevant types.
pub fn render_stubs(index: &ApiIndex, usage: Option<&UsageIndex>, options: &StubOptions) -> String {
    let mut out = String::new();
    out.push_str(&format!("// Package: {}", index.package));
    if let Some(v) = &index.version {
        out.push_str(&format!(" v{}", v));
    }
    out.push('\n');

    if let Some(u) = usage {
        out.push_str(&coverage_summary(u));
    }

    let plan = Plan::build(index, usage);
    let budget = if options.budget == 0 { usize::MAX } else { options.budget };

    let mut emitted: Vec<(String, String)> = Vec::new(); // (namespace, text)
    let mut emitted_names: HashSet<String> = HashSet::new();
    let mut count = out.len();
    let mut truncated_at: Option<usize> = None;

    for (i, candidate) in plan.ordered.iter().enumerate() {
        if emitted_names.contains(candidate) {
            continue;
        }
        // The candidate travels with its direct dependencies.
        let mut unit: Vec<&str> = vec![candidate.as_str()];
        for dep in plan.direct_deps(candidate) {
            if !emitted_names.contains(dep) && !unit.contains(&dep) {
                unit.push(dep);
            }
        }
        let rendered: Vec<(String, String)> = unit
            .iter()
            .filter_map(|name| plan.render_type(name))
            .collect();
        let unit_len: usize = rendered.iter().map(|(_, text)| text.len() + 1).sum();

        if budget != usize::MAX
            && count + unit_len > budget.saturating_sub(BUDGET_RESERVE)
            && !emitted.is_empty()
        {
            truncated_at = Some(i);
            break;
        }
        for name in &unit {
            emitted_names.insert(name.to_string());
        }
        count += unit_len;
        emitted.extend(rendered);
    }

    out.push_str(&group_by_namespace(emitted));

    if let Some(at) = truncated_at {
        let omitted = plan
            .ordered
            .iter()
            .skip(at)
            .filter(|c| !emitted_names.contains(*c))
            .count();
        out.push_str(&format!(
            "// ... truncated ({} types omitted, budget exceeded)\n",
            omitted
        ));
    }

    // Dependency appendix: referenced external surface, skipped when the
    // output is coverage-focused.
    if usage.is_none()
        && let Some(deps) = index.dependencies.as_deref()
    {
        for dep in deps {
            out.push('\n');
            let tag = if dep.is_stdlib == Some(true) { " (stdlib)" } else { "" };
            out.push_str(&format!("// Dependency: {}{}\n", dep.package, tag));
            for t in &dep.types {
                out.push_str(&format!("// - {}\n", t.name));
            }
        }
    }

    out
}

fn coverage_summary(usage: &UsageIndex) -> String {
    let mut covered: BTreeMap<&str, usize> = BTreeMap::new();
    let mut uncovered: BTreeMap<&str, usize> = BTreeMap::new();
    for op in &usage.covered_operations {
        *covered.entry(op.client_type.as_str()).or_default() += 1;
    }
    for op in &usage.uncovered_operations {
        *uncovered.entry(op.client_type.as_str()).or_default() += 1;
    }

    let total_covered = usage.covered_operations.len();
    let total = total_covered + usage.uncovered_operations.len();
    let mut out = format!(
        "// Coverage: {}/{} operations demonstrated across {} sample file(s)\n",
        total_covered, total, usage.file_count
    );
    let clients: HashSet<&str> = covered.keys().chain(uncovered.keys()).copied().collect();
    let mut clients: Vec<&str> = clients.into_iter().collect();
    clients.sort();
    for client in clients {
        out.push_str(&format!(
            "//   {}: {} covered, {} uncovered\n",
            client,
            covered.get(client).copied().unwrap_or(0),
            uncovered.get(client).copied().unwrap_or(0),
        ));
    }
    out
}

// ─── Selection plan ──────────────────────────────────────────────────

struct Plan<'a> {
    /// simple name → (namespace, type)
    by_name: HashMap<String, (&'a str, &'a TypeInfo)>,
    /// Candidate order after priority sort (and coverage filtering).
    ordered: Vec<String>,
    /// Coverage mode: uncovered operation names per client type.
    uncovered_ops: Option<HashMap<&'a str, HashSet<&'a str>>>,
}

impl<'a> Plan<'a> {
    fn build(index: &'a ApiIndex, usage: Option<&'a UsageIndex>) -> Self {
        let mut by_name: HashMap<String, (&str, &TypeInfo)> = HashMap::new();
        for (ns, t) in index.all_types() {
            by_name.entry(strip_generics(&t.name).to_string()).or_insert((ns, t));
        }

        let uncovered_ops: Option<HashMap<&str, HashSet<&str>>> = usage.map(|u| {
            let mut map: HashMap<&str, HashSet<&str>> = HashMap::new();
            for op in &u.uncovered_operations {
                map.entry(op.client_type.as_str())
                    .or_default()
                    .insert(op.operation.as_str());
            }
            map
        });

        let known: HashSet<&str> = by_name.keys().map(String::as_str).collect();
        let mut client_types: Vec<String> = Vec::new();
        let mut client_deps: Vec<String> = Vec::new();
        let mut errors: Vec<String> = Vec::new();
        let mut enums: Vec<String> = Vec::new();
        let mut models: Vec<String> = Vec::new();
        let mut rest: Vec<String> = Vec::new();

        let mut sorted: Vec<(&String, &(&str, &TypeInfo))> = by_name.iter().collect();
        sorted.sort_by_key(|(name, (ns, _))| (ns.to_string(), name.to_string()));

        for (name, (_, t)) in &sorted {
            if t.entry_point == Some(true) && t.has_methods() {
                client_types.push((*name).clone());
                for member in t.members.as_deref().unwrap_or_default() {
                    for ident in signature_idents(&member.sig) {
                        if known.contains(ident.as_str()) && ident != **name {
                            client_deps.push(ident);
                        }
                    }
                }
            }
        }
        for (name, (_, t)) in &sorted {
            if t.is_error == Some(true) {
                errors.push((*name).clone());
            } else if t.kind == TypeKind::Enum {
                enums.push((*name).clone());
            } else if matches!(
                t.kind,
                TypeKind::Class | TypeKind::Record | TypeKind::RecordStruct | TypeKind::Struct
            ) && t.has_properties()
                && !t.has_methods()
            {
                models.push((*name).clone());
            } else {
                rest.push((*name).clone());
            }
        }

        let mut ordered: Vec<String> = Vec::new();
        let mut picked: HashSet<String> = HashSet::new();
        for bucket in [client_types, client_deps, errors, enums, models, rest] {
            for name in bucket {
                if picked.insert(name.clone()) {
                    ordered.push(name);
                }
            }
        }

        // Coverage mode keeps types with uncovered operations plus their
        // reference closure, one hop.
        if let Some(uncovered) = &uncovered_ops {
            let with_uncovered: HashSet<&str> = uncovered.keys().copied().collect();
            let mut keep: HashSet<String> = HashSet::new();
            for name in with_uncovered.iter() {
                keep.insert((*name).to_string());
                if let Some((_, t)) = by_name.get(*name) {
                    for member in t.members.as_deref().unwrap_or_default() {
                        for ident in signature_idents(&member.sig) {
                            if known.contains(ident.as_str()) {
                                keep.insert(ident);
                            }
                        }
                    }
                }
            }
            ordered.retain(|name| keep.contains(name));
        }

        Self { by_name, ordered, uncovered_ops }
    }

    /// Direct dependency names of one type (signature tokens resolved in the
    /// index).
    fn direct_deps(&self, name: &str) -> Vec<&str> {
        let Some((_, t)) = self.by_name.get(name) else {
            return Vec::new();
        };
        let mut deps: Vec<&str> = Vec::new();
        for member in t.members.as_deref().unwrap_or_default() {
            for ident in signature_idents(&member.sig) {
                if ident == name {
                    continue;
                }
                if let Some((key, _)) = self.by_name.get_key_value(ident.as_str()) {
                    if !deps.contains(&key.as_str()) {
                        deps.push(key);
                    }
                }
            }
        }
        deps
    }

    fn render_type(&self, name: &str) -> Option<(String, String)> {
        let (ns, t) = self.by_name.get(name)?;
        // Method filtering applies only to types that actually have
        // uncovered operations; referenced types render in full.
        let filter = self.uncovered_ops.as_ref().and_then(|u| u.get(name).cloned());
        Some(((*ns).to_string(), type_stub(t, filter.as_ref())))
    }
}

// ─── Text rendering ──────────────────────────────────────────────────

fn group_by_namespace(emitted: Vec<(String, String)>) -> String {
    let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut order: Vec<String> = Vec::new();
    for (ns, text) in emitted {
        if !grouped.contains_key(&ns) {
            order.push(ns.clone());
        }
        grouped.entry(ns).or_default().push(text);
    }
    order.sort();

    let mut out = String::new();
    for ns in order {
        let types = grouped.remove(&ns).unwrap_or_default();
        if ns.is_empty() {
            for t in types {
                out.push_str(&t);
            }
        } else {
            out.push_str(&format!("namespace {} {{\n", ns));
            for t in types {
                for line in t.lines() {
                    if line.is_empty() {
                        out.push('\n');
                    } else {
                        out.push_str(&format!("    {}\n", line));
                    }
                }
            }
            out.push_str("}\n");
        }
    }
    out
}

fn kind_keyword(kind: TypeKind) -> &'static str {
    match kind {
        TypeKind::Class => "class",
        TypeKind::Record => "record",
        TypeKind::RecordStruct => "record struct",
        TypeKind::Struct => "struct",
        TypeKind::Interface => "interface",
        TypeKind::Enum => "enum",
        TypeKind::Delegate => "delegate",
        TypeKind::Type => "class",
    }
}

/// Render one type as a stub. `method_filter` (coverage mode) keeps
/// non-method members plus only the named methods.
fn type_stub(t: &TypeInfo, method_filter: Option<&HashSet<&str>>) -> String {
    let mut out = String::new();
    if let Some(doc) = &t.doc {
        out.push_str(&format!("/// <summary>{}</summary>\n", xml_escape(doc)));
    }

    let mut header = format!("public {} {}", kind_keyword(t.kind), t.name);
    let mut heritage: Vec<&str> = Vec::new();
    if let Some(base) = &t.base {
        heritage.push(base);
    }
    if let Some(interfaces) = t.interfaces.as_deref() {
        heritage.extend(interfaces.iter().map(String::as_str));
    }
    if !heritage.is_empty() {
        header.push_str(&format!(" : {}", heritage.join(", ")));
    }

    match t.kind {
        TypeKind::Enum => {
            let values = t.values.as_deref().unwrap_or_default().join(", ");
            out.push_str(&format!("{} {{ {} }}\n", header, values));
        }
        TypeKind::Delegate => {
            out.push_str(&format!("{};\n", header));
        }
        _ => {
            let members: Vec<&MemberInfo> = t
                .members
                .as_deref()
                .unwrap_or_default()
                .iter()
                .filter(|m| match method_filter {
                    Some(filter) => m.kind != MemberKind::Method || filter.contains(m.name.as_str()),
                    None => true,
                })
                .collect();
            if members.is_empty() {
                out.push_str(&format!("{} {{ }}\n", header));
            } else {
                out.push_str(&format!("{} {{\n", header));
                for m in members {
                    out.push_str(&member_stub(m));
                }
                out.push_str("}\n");
            }
        }
    }
    out
}

fn member_stub(m: &MemberInfo) -> String {
    let mut line = String::from("    ");
    if let Some(doc) = &m.doc {
        line.push_str(&format!("/// <summary>{}</summary>\n    ", xml_escape(doc)));
    }
    if m.is_static == Some(true) {
        line.push_str("static ");
    }
    match m.kind {
        MemberKind::Ctor => line.push_str(&format!("{}{};", m.name, m.sig)),
        MemberKind::Property | MemberKind::Indexer => line.push_str(&m.sig),
        _ => line.push_str(&format!("{};", m.sig)),
    }
    line.push('\n');
    line
}

#[cfg(test)]
#[path = "stubs_tests.rs"]
mod tests;
