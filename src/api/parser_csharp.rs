//! C# front-end: extracts the public API surface of one source file using
//! tree-sitter.
//!
//! Produces a `RawType` stream for the shared type map. Signatures are
//! normalized from the parsed type tree (never by string replacement):
//! `System.`-rooted qualifiers are dropped at qualified-name nodes, generic
//! structure is preserved, long parameter defaults collapse to `…`.

use std::collections::HashSet;

use crate::api::typemap::{RawType, UsingDirective};
use crate::api::types::{MemberInfo, MemberKind, TypeKind};
use crate::{strip_generics, truncate_doc};

/// Max characters of a parameter default expression shown verbatim.
const DEFAULT_VALUE_MAX: usize = 20;
/// Max characters of a const initializer shown verbatim.
const CONST_VALUE_MAX: usize = 30;

/// Return-type heads that mark a member as async even without the modifier.
const ASYNC_CARRIERS: [&str; 3] = ["Task", "ValueTask", "IAsyncEnumerable"];

/// Everything the front-end learned about one file.
#[derive(Debug, Default)]
pub struct FileSurface {
    pub types: Vec<RawType>,
    pub usings: Vec<UsingDirective>,
}

// ─── Entry point ─────────────────────────────────────────────────────

/// Parse one C# file and collect its public surface. A file that fails to
/// parse yields an empty surface; the caller logs and continues.
pub fn parse_file_surface(parser: &mut tree_sitter::Parser, source: &str) -> FileSurface {
    let tree = match parser.parse(source, None) {
        Some(t) => t,
        None => {
            tracing::warn!("tree-sitter returned no tree for file; skipping");
            return FileSurface::default();
        }
    };

    let mut surface = FileSurface::default();
    let bytes = source.as_bytes();
    walk_compilation_unit(tree.root_node(), bytes, "", &mut surface);
    surface
}

fn walk_compilation_unit(
    node: tree_sitter::Node,
    source: &[u8],
    namespace: &str,
    surface: &mut FileSurface,
) {
    for i in 0..node.child_count() {
        let child = node.child(i).unwrap();
        match child.kind() {
            "namespace_declaration" | "file_scoped_namespace_declaration" => {
                let name = child
                    .child_by_field_name("name")
                    .map(|n| node_text(n, source).to_string())
                    .unwrap_or_default();
                let nested = join_namespace(namespace, &name);
                // Block-scoped namespaces nest through their body; file-scoped
                // ones own the rest of the compilation unit.
                if let Some(body) = child.child_by_field_name("body") {
                    walk_compilation_unit(body, source, &nested, surface);
                } else {
                    walk_compilation_unit(child, source, &nested, surface);
                }
            }
            "using_directive" => {
                if let Some(using) = extract_using(child, source) {
                    surface.usings.push(using);
                }
            }
            "class_declaration" | "interface_declaration" | "struct_declaration"
            | "enum_declaration" | "record_declaration" | "record_struct_declaration"
            | "delegate_declaration" => {
                if let Some(raw) = extract_type(child, source, namespace) {
                    surface.types.push(raw);
                }
            }
            _ => {}
        }
    }
}

fn join_namespace(outer: &str, inner: &str) -> String {
    if outer.is_empty() {
        inner.to_string()
    } else if inner.is_empty() {
        outer.to_string()
    } else {
        format!("{}.{}", outer, inner)
    }
}

// ─── Using directives ────────────────────────────────────────────────

fn extract_using(node: tree_sitter::Node, source: &[u8]) -> Option<UsingDirective> {
    let mut alias = None;
    let mut target = None;
    for i in 0..node.child_count() {
        let child = node.child(i).unwrap();
        match child.kind() {
            "name_equals" => {
                alias = child
                    .named_child(0)
                    .map(|n| node_text(n, source).to_string());
            }
            "identifier" | "qualified_name" | "generic_name" | "alias_qualified_name" => {
                target = Some(node_text(child, source).split_whitespace().collect::<String>());
            }
            _ => {}
        }
    }
    target.map(|target| UsingDirective { target, alias })
}

// ─── Type extraction ─────────────────────────────────────────────────

fn extract_type(node: tree_sitter::Node, source: &[u8], namespace: &str) -> Option<RawType> {
    if !is_public(node, source) {
        return None;
    }

    let kind = match node.kind() {
        "class_declaration" => TypeKind::Class,
        "interface_declaration" => TypeKind::Interface,
        "struct_declaration" => TypeKind::Struct,
        "enum_declaration" => TypeKind::Enum,
        "record_struct_declaration" => TypeKind::RecordStruct,
        "record_declaration" => {
            if has_keyword_child(node, "struct") {
                TypeKind::RecordStruct
            } else {
                TypeKind::Record
            }
        }
        "delegate_declaration" => TypeKind::Delegate,
        _ => return None,
    };

    let name_node = node.child_by_field_name("name")?;
    let simple = node_text(name_node, source).to_string();
    let type_params = type_parameter_names(node, source);
    let display = match type_parameter_list_text(node, source) {
        Some(params) => format!("{}{}", simple, params),
        None => simple.clone(),
    };

    let mut raw = RawType {
        namespace: namespace.to_string(),
        name: display,
        kind,
        bases: Vec::new(),
        doc: extract_doc(node, source),
        members: Vec::new(),
        values: None,
        refs: Vec::new(),
    };

    // Raw base list; classification into base/interfaces happens later.
    if let Some(base_list) = find_child_by_kind(node, "base_list") {
        for i in 0..base_list.child_count() {
            let child = base_list.child(i).unwrap();
            if child.is_named() && child.kind() != "primary_constructor_base_type" {
                raw.bases.push(render_type(child, source));
                collect_type_refs(child, source, &type_params, &mut raw.refs);
            } else if child.kind() == "primary_constructor_base_type" {
                if let Some(ty) = child.child(0) {
                    raw.bases.push(render_type(ty, source));
                    collect_type_refs(ty, source, &type_params, &mut raw.refs);
                }
            }
        }
    }

    match kind {
        TypeKind::Enum => {
            raw.values = Some(extract_enum_values(node, source));
        }
        TypeKind::Delegate => {
            if let Some(ret) = node.child_by_field_name("type") {
                collect_type_refs(ret, source, &type_params, &mut raw.refs);
            }
            if let Some(params) = parameter_list(node) {
                collect_param_refs(params, source, &type_params, &mut raw.refs);
            }
        }
        _ => {
            // Positional record parameters surface as init-only properties
            // plus the primary constructor.
            if matches!(kind, TypeKind::Record | TypeKind::RecordStruct)
                && let Some(params) = parameter_list(node)
            {
                extract_record_primary_ctor(params, source, &simple, &type_params, &mut raw);
            }
            if let Some(body) = declaration_body(node) {
                extract_members(body, source, &simple, kind, &type_params, &mut raw);
            }
        }
    }

    Some(raw)
}

fn extract_enum_values(node: tree_sitter::Node, source: &[u8]) -> Vec<String> {
    let mut values = Vec::new();
    if let Some(body) = declaration_body(node) {
        for i in 0..body.child_count() {
            let child = body.child(i).unwrap();
            if child.kind() == "enum_member_declaration"
                && let Some(name) = child.child_by_field_name("name")
            {
                values.push(node_text(name, source).to_string());
            }
        }
    }
    values
}

fn extract_record_primary_ctor(
    params: tree_sitter::Node,
    source: &[u8],
    type_name: &str,
    type_params: &HashSet<String>,
    raw: &mut RawType,
) {
    let rendered = render_parameter_list(params, source);
    if rendered == "()" {
        return;
    }
    raw.members.push(MemberInfo {
        name: type_name.to_string(),
        kind: MemberKind::Ctor,
        sig: rendered,
        doc: None,
        is_static: None,
        is_async: None,
    });
    for i in 0..params.child_count() {
        let p = params.child(i).unwrap();
        if p.kind() != "parameter" {
            continue;
        }
        let Some(ty) = p.child_by_field_name("type") else { continue };
        let Some(name) = p.child_by_field_name("name") else { continue };
        let ty_str = render_type(ty, source);
        let prop_name = node_text(name, source).to_string();
        raw.members.push(MemberInfo {
            name: prop_name.clone(),
            kind: MemberKind::Property,
            sig: format!("{} {} {{ get; init; }}", ty_str, prop_name),
            doc: None,
            is_static: None,
            is_async: None,
        });
        collect_type_refs(ty, source, type_params, &mut raw.refs);
    }
}

// ─── Member extraction ───────────────────────────────────────────────

fn extract_members(
    body: tree_sitter::Node,
    source: &[u8],
    type_name: &str,
    type_kind: TypeKind,
    type_params: &HashSet<String>,
    raw: &mut RawType,
) {
    let implicit_public = type_kind == TypeKind::Interface;

    for i in 0..body.child_count() {
        let node = body.child(i).unwrap();
        let visible = if implicit_public {
            !has_non_public_modifier(node, source)
        } else {
            is_public(node, source)
        };
        if !visible {
            continue;
        }

        match node.kind() {
            "method_declaration" => {
                if let Some(m) = extract_method(node, source) {
                    raw.refs.extend(method_refs(node, source, type_params));
                    raw.members.push(m);
                }
            }
            "constructor_declaration" => {
                if let Some(params) = parameter_list(node) {
                    collect_param_refs(params, source, type_params, &mut raw.refs);
                    raw.members.push(MemberInfo {
                        name: type_name.to_string(),
                        kind: MemberKind::Ctor,
                        sig: render_parameter_list(params, source),
                        doc: extract_doc(node, source),
                        is_static: None,
                        is_async: None,
                    });
                }
            }
            "property_declaration" => {
                if let Some(m) = extract_property(node, source) {
                    if let Some(ty) = node.child_by_field_name("type") {
                        collect_type_refs(ty, source, type_params, &mut raw.refs);
                    }
                    raw.members.push(m);
                }
            }
            "indexer_declaration" => {
                if let Some(m) = extract_indexer(node, source) {
                    if let Some(ty) = node.child_by_field_name("type") {
                        collect_type_refs(ty, source, type_params, &mut raw.refs);
                    }
                    if let Some(params) = node
                        .child_by_field_name("parameters")
                        .or_else(|| find_child_by_kind(node, "bracketed_parameter_list"))
                    {
                        collect_param_refs(params, source, type_params, &mut raw.refs);
                    }
                    raw.members.push(m);
                }
            }
            "event_declaration" | "event_field_declaration" => {
                extract_event(node, source, type_params, raw);
            }
            "field_declaration" => {
                extract_fields(node, source, type_params, raw);
            }
            _ => {}
        }
    }
}

fn extract_method(node: tree_sitter::Node, source: &[u8]) -> Option<MemberInfo> {
    let name_node = node.child_by_field_name("name")?;
    let name = node_text(name_node, source).to_string();
    let ret_node = method_return_type(node)?;
    let ret = render_type(ret_node, source);
    let params_node = parameter_list(node)?;

    let generic = type_parameter_list_text(node, source).unwrap_or_default();
    let sig = format!(
        "{} {}{}{}",
        ret,
        name,
        generic,
        render_parameter_list(params_node, source)
    );

    let modifiers = modifier_texts(node, source);
    let is_async = modifiers.iter().any(|m| m == "async") || returns_async_carrier(ret_node, source);

    Some(MemberInfo {
        name,
        kind: MemberKind::Method,
        sig,
        doc: extract_doc(node, source),
        is_static: modifiers.iter().any(|m| m == "static").then_some(true),
        is_async: is_async.then_some(true),
    })
}

/// Referenced types for one method: return type, parameter types, and
/// generic constraint types; the method's own type parameters are skipped.
fn method_refs(node: tree_sitter::Node, source: &[u8], outer: &HashSet<String>) -> Vec<String> {
    let mut scope = outer.clone();
    scope.extend(type_parameter_names(node, source));

    let mut refs = Vec::new();
    if let Some(ret) = method_return_type(node) {
        collect_type_refs(ret, source, &scope, &mut refs);
    }
    if let Some(params) = parameter_list(node) {
        collect_param_refs(params, source, &scope, &mut refs);
    }
    for i in 0..node.child_count() {
        let child = node.child(i).unwrap();
        if child.kind() == "type_parameter_constraints_clause" {
            collect_type_refs(child, source, &scope, &mut refs);
        }
    }
    refs
}

fn extract_property(node: tree_sitter::Node, source: &[u8]) -> Option<MemberInfo> {
    let name_node = node.child_by_field_name("name")?;
    let name = node_text(name_node, source).to_string();
    let ty = render_type(node.child_by_field_name("type")?, source);

    let accessors = accessor_tokens(node, source);
    let sig = format!("{} {} {{ {} }}", ty, name, accessors.join(" "));

    let modifiers = modifier_texts(node, source);
    Some(MemberInfo {
        name,
        kind: MemberKind::Property,
        sig,
        doc: extract_doc(node, source),
        is_static: modifiers.iter().any(|m| m == "static").then_some(true),
        is_async: None,
    })
}

fn extract_indexer(node: tree_sitter::Node, source: &[u8]) -> Option<MemberInfo> {
    let ty = render_type(node.child_by_field_name("type")?, source);
    let params = node
        .child_by_field_name("parameters")
        .or_else(|| find_child_by_kind(node, "bracketed_parameter_list"))?;
    let inner = render_parameter_list(params, source);
    let inner = inner.trim_start_matches('(').trim_end_matches(')');

    Some(MemberInfo {
        name: "this[]".to_string(),
        kind: MemberKind::Indexer,
        sig: format!("{} this[{}]", ty, inner),
        doc: extract_doc(node, source),
        is_static: None,
        is_async: None,
    })
}

fn extract_event(
    node: tree_sitter::Node,
    source: &[u8],
    type_params: &HashSet<String>,
    raw: &mut RawType,
) {
    let modifiers = modifier_texts(node, source);
    let is_static = modifiers.iter().any(|m| m == "static").then_some(true);
    let doc = extract_doc(node, source);

    if node.kind() == "event_declaration" {
        let (Some(ty), Some(name)) = (
            node.child_by_field_name("type"),
            node.child_by_field_name("name"),
        ) else {
            return;
        };
        let ty_str = render_type(ty, source);
        collect_type_refs(ty, source, type_params, &mut raw.refs);
        let name = node_text(name, source).to_string();
        raw.members.push(MemberInfo {
            sig: format!("event {} {}", ty_str, name),
            name,
            kind: MemberKind::Event,
            doc,
            is_static,
            is_async: None,
        });
        return;
    }

    // event_field_declaration: `public event EventHandler<T> Changed;`
    let Some(var_decl) = find_child_by_kind(node, "variable_declaration") else {
        return;
    };
    let Some(ty) = var_decl.child_by_field_name("type") else {
        return;
    };
    let ty_str = render_type(ty, source);
    collect_type_refs(ty, source, type_params, &mut raw.refs);
    for i in 0..var_decl.child_count() {
        let child = var_decl.child(i).unwrap();
        if child.kind() == "variable_declarator"
            && let Some(name_node) = child.child_by_field_name("name")
        {
            let name = node_text(name_node, source).to_string();
            raw.members.push(MemberInfo {
                sig: format!("event {} {}", ty_str, name),
                name,
                kind: MemberKind::Event,
                doc: doc.clone(),
                is_static,
                is_async: None,
            });
        }
    }
}

fn extract_fields(
    node: tree_sitter::Node,
    source: &[u8],
    type_params: &HashSet<String>,
    raw: &mut RawType,
) {
    let modifiers = modifier_texts(node, source);
    let is_const = modifiers.iter().any(|m| m == "const");
    let is_static = (!is_const && modifiers.iter().any(|m| m == "static")).then_some(true);
    let doc = extract_doc(node, source);

    let Some(var_decl) = find_child_by_kind(node, "variable_declaration") else {
        return;
    };
    let Some(ty) = var_decl.child_by_field_name("type") else {
        return;
    };
    let ty_str = render_type(ty, source);
    collect_type_refs(ty, source, type_params, &mut raw.refs);

    for i in 0..var_decl.child_count() {
        let child = var_decl.child(i).unwrap();
        if child.kind() != "variable_declarator" {
            continue;
        }
        let Some(name_node) = child.child_by_field_name("name") else {
            continue;
        };
        let name = node_text(name_node, source).to_string();
        let sig = if is_const {
            let init = const_initializer_text(child, source);
            match init {
                Some(v) if v.chars().count() <= CONST_VALUE_MAX => {
                    format!("const {} {} = {}", ty_str, name, v)
                }
                _ => format!("const {} {}", ty_str, name),
            }
        } else {
            format!("{} {}", ty_str, name)
        };
        raw.members.push(MemberInfo {
            name,
            kind: if is_const { MemberKind::Const } else { MemberKind::Field },
            sig,
            doc: doc.clone(),
            is_static,
            is_async: None,
        });
    }
}

fn const_initializer_text(declarator: tree_sitter::Node, source: &[u8]) -> Option<String> {
    for i in 0..declarator.child_count() {
        let child = declarator.child(i).unwrap();
        if child.kind() == "equals_value_clause" {
            let expr = child.named_child(0)?;
            return Some(normalize_ws(node_text(expr, source)));
        }
    }
    None
}

// ─── Accessors ───────────────────────────────────────────────────────

fn accessor_tokens(node: tree_sitter::Node, source: &[u8]) -> Vec<String> {
    let mut tokens = Vec::new();
    if let Some(list) = find_child_by_kind(node, "accessor_list") {
        for i in 0..list.child_count() {
            let acc = list.child(i).unwrap();
            if acc.kind() != "accessor_declaration" {
                continue;
            }
            // Reduced-visibility accessors (private set) stay off the surface.
            if has_non_public_modifier(acc, source) {
                continue;
            }
            for j in 0..acc.child_count() {
                let tok = acc.child(j).unwrap();
                match tok.kind() {
                    "get" | "set" | "init" => tokens.push(format!("{};", tok.kind())),
                    _ => {}
                }
            }
        }
    }
    if tokens.is_empty() {
        // Expression-bodied property: `public int Count => _n;`
        tokens.push("get;".to_string());
    }
    tokens
}

// ─── Modifier / visibility helpers ───────────────────────────────────

fn modifier_texts(node: tree_sitter::Node, source: &[u8]) -> Vec<String> {
    let mut modifiers = Vec::new();
    for i in 0..node.child_count() {
        let child = node.child(i).unwrap();
        if child.kind() == "modifier" {
            modifiers.push(node_text(child, source).to_string());
        } else if matches!(
            child.kind(),
            "public" | "private" | "protected" | "internal" | "static" | "readonly"
                | "sealed" | "abstract" | "virtual" | "override" | "async" | "partial"
                | "new" | "extern" | "unsafe" | "volatile" | "const"
        ) {
            modifiers.push(node_text(child, source).to_string());
        }
    }
    modifiers
}

/// Publicly-visible declarations only: class/struct/record members and types
/// must carry the explicit `public` modifier.
fn is_public(node: tree_sitter::Node, source: &[u8]) -> bool {
    modifier_texts(node, source).iter().any(|m| m == "public")
}

fn has_non_public_modifier(node: tree_sitter::Node, source: &[u8]) -> bool {
    modifier_texts(node, source)
        .iter()
        .any(|m| matches!(m.as_str(), "private" | "internal" | "protected"))
}

fn has_keyword_child(node: tree_sitter::Node, keyword: &str) -> bool {
    for i in 0..node.child_count() {
        if node.child(i).unwrap().kind() == keyword {
            return true;
        }
    }
    false
}

// ─── Generic parameters ──────────────────────────────────────────────

fn type_parameter_list_text(node: tree_sitter::Node, source: &[u8]) -> Option<String> {
    find_child_by_kind(node, "type_parameter_list").map(|tp| {
        let names: Vec<&str> = (0..tp.child_count())
            .filter_map(|i| {
                let c = tp.child(i).unwrap();
                (c.kind() == "type_parameter").then(|| {
                    c.child_by_field_name("name")
                        .map(|n| node_text(n, source))
                        .unwrap_or_else(|| node_text(c, source))
                })
            })
            .collect();
        format!("<{}>", names.join(","))
    })
}

fn type_parameter_names(node: tree_sitter::Node, source: &[u8]) -> HashSet<String> {
    let mut names = HashSet::new();
    if let Some(tp) = find_child_by_kind(node, "type_parameter_list") {
        for i in 0..tp.child_count() {
            let c = tp.child(i).unwrap();
            if c.kind() == "type_parameter" {
                let name = c
                    .child_by_field_name("name")
                    .map(|n| node_text(n, source))
                    .unwrap_or_else(|| node_text(c, source));
                names.insert(name.to_string());
            }
        }
    }
    names
}

// ─── Type rendering ──────────────────────────────────────────────────

/// Render a parsed type node into normalized display form.
///
/// Standard-library qualifiers are dropped at the qualified-name node when
/// the leftmost segment is `System`; the strip recurses through generic
/// arguments but never touches substrings of an identifier.
pub(crate) fn render_type(node: tree_sitter::Node, source: &[u8]) -> String {
    match node.kind() {
        "predefined_type" | "identifier" | "implicit_type" => {
            node_text(node, source).to_string()
        }
        "qualified_name" => {
            let qualifier = node.child_by_field_name("qualifier");
            let name = node.child_by_field_name("name");
            match (qualifier, name) {
                (Some(q), Some(n)) => {
                    if leftmost_identifier(q, source) == Some("System") {
                        render_type(n, source)
                    } else {
                        format!("{}.{}", render_type(q, source), render_type(n, source))
                    }
                }
                _ => normalize_ws(node_text(node, source)),
            }
        }
        "alias_qualified_name" => match node.child_by_field_name("name") {
            Some(n) => render_type(n, source),
            None => normalize_ws(node_text(node, source)),
        },
        "generic_name" => {
            let head = node
                .named_child(0)
                .map(|n| node_text(n, source))
                .unwrap_or("");
            let args: Vec<String> = match find_child_by_kind(node, "type_argument_list") {
                Some(list) => (0..list.child_count())
                    .filter_map(|i| {
                        let c = list.child(i).unwrap();
                        c.is_named().then(|| render_type(c, source))
                    })
                    .collect(),
                None => Vec::new(),
            };
            format!("{}<{}>", head, args.join(","))
        }
        "nullable_type" => {
            let inner = node
                .named_child(0)
                .map(|n| render_type(n, source))
                .unwrap_or_default();
            format!("{}?", inner)
        }
        "array_type" => {
            let element = node
                .child_by_field_name("type")
                .map(|n| render_type(n, source))
                .unwrap_or_default();
            let rank = node
                .child_by_field_name("rank")
                .map(|n| normalize_ws(node_text(n, source)))
                .unwrap_or_else(|| "[]".to_string());
            format!("{}{}", element, rank)
        }
        "tuple_type" => {
            let elements: Vec<String> = (0..node.child_count())
                .filter_map(|i| {
                    let c = node.child(i).unwrap();
                    (c.kind() == "tuple_element").then(|| {
                        let ty = c
                            .child_by_field_name("type")
                            .map(|n| render_type(n, source))
                            .unwrap_or_default();
                        match c.child_by_field_name("name") {
                            Some(n) => format!("{} {}", ty, node_text(n, source)),
                            None => ty,
                        }
                    })
                })
                .collect();
            format!("({})", elements.join(", "))
        }
        "ref_type" => {
            let inner = node
                .named_child(0)
                .map(|n| render_type(n, source))
                .unwrap_or_default();
            format!("ref {}", inner)
        }
        _ => normalize_ws(node_text(node, source)),
    }
}

/// Leftmost identifier of a (possibly qualified) name node.
fn leftmost_identifier<'a>(node: tree_sitter::Node, source: &'a [u8]) -> Option<&'a str> {
    match node.kind() {
        "identifier" => Some(node_text(node, source)),
        "generic_name" => node.named_child(0).map(|n| node_text(n, source)),
        "qualified_name" => node
            .child_by_field_name("qualifier")
            .and_then(|q| leftmost_identifier(q, source)),
        "alias_qualified_name" => node
            .child_by_field_name("name")
            .and_then(|n| leftmost_identifier(n, source)),
        _ => None,
    }
}

/// Outermost identifier of a return-type node, for async-carrier detection.
/// Derived from the parsed node, never by substring match.
fn returns_async_carrier(node: tree_sitter::Node, source: &[u8]) -> bool {
    let head = match node.kind() {
        "identifier" => Some(node_text(node, source)),
        "generic_name" => node.named_child(0).map(|n| node_text(n, source)),
        "qualified_name" => node
            .child_by_field_name("name")
            .and_then(|n| match n.kind() {
                "identifier" => Some(node_text(n, source)),
                "generic_name" => n.named_child(0).map(|c| node_text(c, source)),
                _ => None,
            }),
        _ => None,
    };
    head.is_some_and(|h| ASYNC_CARRIERS.contains(&h))
}

fn method_return_type(node: tree_sitter::Node) -> Option<tree_sitter::Node> {
    node.child_by_field_name("type")
        .or_else(|| node.child_by_field_name("returns"))
}

/// Parameter list of a declaration; tolerant of grammar versions that do not
/// name the field.
fn parameter_list(node: tree_sitter::Node) -> Option<tree_sitter::Node> {
    node.child_by_field_name("parameters")
        .or_else(|| find_child_by_kind(node, "parameter_list"))
}

/// Declaration body; tolerant of grammar versions that do not name the field.
fn declaration_body(node: tree_sitter::Node) -> Option<tree_sitter::Node> {
    node.child_by_field_name("body")
        .or_else(|| find_child_by_kind(node, "declaration_list"))
        .or_else(|| find_child_by_kind(node, "enum_member_declaration_list"))
}

// ─── Parameter rendering ─────────────────────────────────────────────

fn render_parameter_list(params: tree_sitter::Node, source: &[u8]) -> String {
    let mut rendered = Vec::new();
    for i in 0..params.child_count() {
        let p = params.child(i).unwrap();
        if p.kind() == "parameter" {
            rendered.push(render_parameter(p, source));
        }
    }
    format!("({})", rendered.join(", "))
}

fn render_parameter(p: tree_sitter::Node, source: &[u8]) -> String {
    let mut parts = Vec::new();
    for i in 0..p.child_count() {
        let child = p.child(i).unwrap();
        if matches!(child.kind(), "ref" | "out" | "in" | "params" | "this" | "scoped") {
            parts.push(node_text(child, source).to_string());
        }
    }
    if let Some(ty) = p.child_by_field_name("type") {
        parts.push(render_type(ty, source));
    }
    if let Some(name) = p.child_by_field_name("name") {
        parts.push(node_text(name, source).to_string());
    }
    let mut out = parts.join(" ");
    if let Some(default) = parameter_default(p, source) {
        if default.chars().count() <= DEFAULT_VALUE_MAX {
            out.push_str(&format!(" = {}", default));
        } else {
            out.push_str(" = …");
        }
    }
    out
}

fn parameter_default(p: tree_sitter::Node, source: &[u8]) -> Option<String> {
    for i in 0..p.child_count() {
        let child = p.child(i).unwrap();
        if child.kind() == "equals_value_clause" {
            let expr = child.named_child(0)?;
            return Some(normalize_ws(node_text(expr, source)));
        }
    }
    None
}

// ─── Reference collection ────────────────────────────────────────────

/// Record every named type referenced under `node`, fully qualified as
/// written, with generic arguments split into their own references.
/// Nullable-of-T and array-of-T unwrap to the element type; predefined
/// types and in-scope type parameters are skipped.
fn collect_type_refs(
    node: tree_sitter::Node,
    source: &[u8],
    type_params: &HashSet<String>,
    refs: &mut Vec<String>,
) {
    match node.kind() {
        "predefined_type" | "implicit_type" => {}
        "identifier" => {
            let text = node_text(node, source);
            if !type_params.contains(text) {
                refs.push(text.to_string());
            }
        }
        "qualified_name" => {
            if let Some(display) = qualified_display(node, source, type_params) {
                refs.push(display);
            }
            // Generic arguments anywhere in the chain are separate refs.
            collect_generic_arg_refs(node, source, type_params, refs);
        }
        "generic_name" => {
            if let Some(head) = node.named_child(0) {
                let text = node_text(head, source);
                if !type_params.contains(text) {
                    refs.push(text.to_string());
                }
            }
            collect_generic_arg_refs(node, source, type_params, refs);
        }
        "nullable_type" | "array_type" | "ref_type" | "pointer_type" | "scoped_type" => {
            for i in 0..node.named_child_count() {
                collect_type_refs(node.named_child(i).unwrap(), source, type_params, refs);
            }
        }
        "tuple_type" | "type_parameter_constraints_clause" | "type_parameter_constraint" => {
            for i in 0..node.named_child_count() {
                collect_type_refs(node.named_child(i).unwrap(), source, type_params, refs);
            }
        }
        _ => {
            for i in 0..node.named_child_count() {
                collect_type_refs(node.named_child(i).unwrap(), source, type_params, refs);
            }
        }
    }
}

fn collect_generic_arg_refs(
    node: tree_sitter::Node,
    source: &[u8],
    type_params: &HashSet<String>,
    refs: &mut Vec<String>,
) {
    for i in 0..node.named_child_count() {
        let child = node.named_child(i).unwrap();
        if child.kind() == "type_argument_list" {
            for j in 0..child.named_child_count() {
                collect_type_refs(child.named_child(j).unwrap(), source, type_params, refs);
            }
        } else {
            collect_generic_arg_refs(child, source, type_params, refs);
        }
    }
}

/// Dotted identifier chain of a qualified name with generic arguments
/// stripped per segment: `System.Collections.Generic.List<int>` →
/// `System.Collections.Generic.List`. Returns `None` when the head is an
/// in-scope type parameter.
fn qualified_display(
    node: tree_sitter::Node,
    source: &[u8],
    type_params: &HashSet<String>,
) -> Option<String> {
    let mut segments = Vec::new();
    flatten_qualified(node, source, &mut segments);
    if segments.is_empty() {
        return None;
    }
    if segments.len() == 1 && type_params.contains(&segments[0]) {
        return None;
    }
    Some(segments.join("."))
}

fn flatten_qualified(node: tree_sitter::Node, source: &[u8], out: &mut Vec<String>) {
    match node.kind() {
        "qualified_name" => {
            if let Some(q) = node.child_by_field_name("qualifier") {
                flatten_qualified(q, source, out);
            }
            if let Some(n) = node.child_by_field_name("name") {
                flatten_qualified(n, source, out);
            }
        }
        "identifier" => out.push(node_text(node, source).to_string()),
        "generic_name" => {
            if let Some(head) = node.named_child(0) {
                out.push(node_text(head, source).to_string());
            }
        }
        "alias_qualified_name" => {
            if let Some(n) = node.child_by_field_name("name") {
                flatten_qualified(n, source, out);
            }
        }
        _ => {}
    }
}

fn collect_param_refs(
    params: tree_sitter::Node,
    source: &[u8],
    type_params: &HashSet<String>,
    refs: &mut Vec<String>,
) {
    for i in 0..params.child_count() {
        let p = params.child(i).unwrap();
        if p.kind() == "parameter"
            && let Some(ty) = p.child_by_field_name("type")
        {
            collect_type_refs(ty, source, type_params, refs);
        }
    }
}

// ─── Doc comments ────────────────────────────────────────────────────

/// Pull the `<summary>` text from the `///` comment block immediately
/// preceding a declaration. Tags are stripped, entities unescaped,
/// whitespace collapsed, and the result truncated to the doc cap.
fn extract_doc(node: tree_sitter::Node, source: &[u8]) -> Option<String> {
    let mut lines = Vec::new();
    let mut cursor = node.prev_sibling();
    while let Some(prev) = cursor {
        if prev.kind() != "comment" {
            break;
        }
        let text = node_text(prev, source);
        let Some(stripped) = text.strip_prefix("///") else {
            break;
        };
        lines.push(stripped.trim().to_string());
        cursor = prev.prev_sibling();
    }
    if lines.is_empty() {
        return None;
    }
    lines.reverse();
    let joined = lines.join(" ");

    let body = match (joined.find("<summary>"), joined.find("</summary>")) {
        (Some(start), Some(end)) if start + 9 <= end => &joined[start + 9..end],
        _ => joined.as_str(),
    };
    let unescaped = strip_doc_tags(body)
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&");
    let doc = truncate_doc(&unescaped);
    (!doc.is_empty()).then_some(doc)
}

/// Remove XML doc tags (`<see cref="..."/>`, `<paramref .../>`), keeping any
/// cref/name target as plain text.
fn strip_doc_tags(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(open) = rest.find('<') {
        out.push_str(&rest[..open]);
        let tail = &rest[open..];
        let Some(close) = tail.find('>') else {
            break;
        };
        let tag = &tail[1..close];
        for attr in ["cref=\"", "name=\""] {
            if let Some(pos) = tag.find(attr) {
                let val = &tag[pos + attr.len()..];
                if let Some(q) = val.find('"') {
                    let target = &val[..q];
                    out.push_str(strip_generics(target).rsplit('.').next().unwrap_or(target));
                }
                break;
            }
        }
        rest = &tail[close + 1..];
    }
    out.push_str(rest);
    out
}

// ─── AST helpers ─────────────────────────────────────────────────────

fn node_text<'a>(node: tree_sitter::Node, source: &'a [u8]) -> &'a str {
    node.utf8_text(source).unwrap_or("")
}

fn find_child_by_kind<'a>(node: tree_sitter::Node<'a>, kind: &str) -> Option<tree_sitter::Node<'a>> {
    for i in 0..node.child_count() {
        let child = node.child(i).unwrap();
        if child.kind() == kind {
            return Some(child);
        }
    }
    None
}

fn normalize_ws(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Build a parser for the C# grammar. Each worker thread owns one.
pub fn new_parser() -> tree_sitter::Parser {
    let mut parser = tree_sitter::Parser::new();
    parser
        .set_language(&tree_sitter_c_sharp::LANGUAGE.into())
        .expect("Error loading C# grammar");
    parser
}

#[cfg(test)]
#[path = "parser_csharp_tests.rs"]
mod tests;
