// End-to-end extraction tests over temp source trees.

use super::*;
use crate::CancelToken;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

fn extract_dir(root: &Path) -> Extraction {
    extract(root, &ExtractOptions::default(), &CancelToken::new()).unwrap()
}

fn find_type<'a>(index: &'a ApiIndex, name: &str) -> &'a TypeInfo {
    index
        .all_types()
        .find(|(_, t)| t.name == name)
        .map(|(_, t)| t)
        .unwrap_or_else(|| panic!("type {} not found", name))
}

// ─── Boundary behaviors ──────────────────────────────────────────────

#[test]
fn test_build_dirs_skipped_boundary_aware() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "src/Widget.cs", "namespace Acme;\npublic class Widget { }");
    write(dir.path(), "bin/Skipped.cs", "namespace Acme;\npublic class Skipped { }");
    write(dir.path(), "obj/AlsoSkipped.cs", "namespace Acme;\npublic class AlsoSkipped { }");
    // `binary` must not match the `bin` segment filter.
    write(dir.path(), "binary/Kept.cs", "namespace Acme;\npublic class Kept { }");

    let extraction = extract_dir(dir.path());
    let names: Vec<&str> = extraction
        .index
        .all_types()
        .map(|(_, t)| t.name.as_str())
        .collect();
    assert!(names.contains(&"Widget"));
    assert!(names.contains(&"Kept"));
    assert!(!names.contains(&"Skipped"));
    assert!(!names.contains(&"AlsoSkipped"));
}

#[test]
fn test_empty_tree_yields_empty_index() {
    let dir = tempfile::tempdir().unwrap();
    let extraction = extract_dir(dir.path());
    assert!(extraction.index.namespaces.is_empty());
    assert!(extraction.index.dependencies.is_none());
    assert_eq!(extraction.stats.file_count, 0);
}

#[test]
fn test_missing_root_is_path_not_found() {
    let result = extract(
        Path::new("/definitely/not/here"),
        &ExtractOptions::default(),
        &CancelToken::new(),
    );
    assert!(matches!(result, Err(SurfaceError::PathNotFound(_))));
}

#[test]
fn test_pre_cancelled_run_discards_results() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "Widget.cs", "namespace Acme;\npublic class Widget { }");
    let cancel = CancelToken::new();
    cancel.cancel();
    let result = extract(dir.path(), &ExtractOptions::default(), &cancel);
    assert!(matches!(result, Err(SurfaceError::Cancelled)));
}

// ─── Partial declarations ────────────────────────────────────────────

#[test]
fn test_partial_class_merged_across_files() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "A.cs",
        "namespace Acme;\npublic partial class C {\n    public void A() { }\n}",
    );
    write(
        dir.path(),
        "B.cs",
        "namespace Acme;\npublic partial class C {\n    public void B() { }\n}",
    );

    let extraction = extract_dir(dir.path());
    assert_eq!(extraction.index.type_count(), 1);
    let c = find_type(&extraction.index, "C");
    let mut names: Vec<&str> = c
        .members
        .as_deref()
        .unwrap()
        .iter()
        .map(|m| m.name.as_str())
        .collect();
    names.sort();
    assert_eq!(names, vec!["A", "B"]);
}

#[test]
fn test_partial_duplicate_member_dedup() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "A.cs", "namespace Acme;\npublic partial class C { public void A() { } }");
    write(dir.path(), "B.cs", "namespace Acme;\npublic partial class C { public void A() { } }");

    let extraction = extract_dir(dir.path());
    let c = find_type(&extraction.index, "C");
    assert_eq!(c.members.as_deref().unwrap().len(), 1);
}

// ─── Sorting & shape invariants ──────────────────────────────────────

#[test]
fn test_namespaces_and_types_sorted() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "Z.cs", "namespace Zeta;\npublic class Omega { }\npublic class Alpha { }");
    write(dir.path(), "A.cs", "namespace Alpha;\npublic class Thing { }");

    let index = extract_dir(dir.path()).index;
    let ns_names: Vec<&str> = index.namespaces.iter().map(|n| n.name.as_str()).collect();
    assert_eq!(ns_names, vec!["Alpha", "Zeta"]);
    let zeta_types: Vec<&str> = index.namespaces[1].types.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(zeta_types, vec!["Alpha", "Omega"]);
}

#[test]
fn test_enum_members_null_values_present() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "E.cs", "namespace Acme;\npublic enum Color { Red, Green }");

    let index = extract_dir(dir.path()).index;
    let color = find_type(&index, "Color");
    assert!(color.members.is_none());
    assert_eq!(
        color.values.as_deref(),
        Some(&["Red".to_string(), "Green".to_string()][..])
    );
}

#[test]
fn test_interface_base_null_and_folded() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "I.cs",
        "namespace Acme;\npublic interface IWide : INarrow { }\npublic interface INarrow { }",
    );

    let index = extract_dir(dir.path()).index;
    let wide = find_type(&index, "IWide");
    assert!(wide.base.is_none());
    assert_eq!(wide.interfaces.as_deref(), Some(&["INarrow".to_string()][..]));
}

// ─── Manifest integration ────────────────────────────────────────────

#[test]
fn test_entry_point_flags_from_manifest() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "Acme.Pkg.csproj",
        r#"<Project><PropertyGroup>
            <RootNamespace>Acme.Pkg</RootNamespace>
            <Version>0.9.0</Version>
        </PropertyGroup></Project>"#,
    );
    write(dir.path(), "Client.cs", "namespace Acme.Pkg;\npublic class Client { public void Go() { } }");
    write(dir.path(), "Model.cs", "namespace Acme.Pkg.Models;\npublic class Widget { }");
    write(dir.path(), "Inner.cs", "namespace Acme.Pkg.Internal;\npublic class Secret { }");
    write(dir.path(), "Deep.cs", "namespace Acme.Pkg.Models.Nested;\npublic class Deep { }");

    let extraction = extract_dir(dir.path());
    let index = &extraction.index;
    assert_eq!(index.package, "Acme.Pkg");
    assert_eq!(index.version.as_deref(), Some("0.9.0"));
    assert_eq!(find_type(index, "Client").entry_point, Some(true));
    assert_eq!(find_type(index, "Widget").entry_point, Some(true));
    assert_eq!(find_type(index, "Secret").entry_point, None);
    assert_eq!(find_type(index, "Deep").entry_point, None);
}

#[test]
fn test_no_manifest_falls_back_to_directory_name() {
    let dir = tempfile::tempdir().unwrap();
    let pkg_root = dir.path().join("MyPkg");
    std::fs::create_dir_all(&pkg_root).unwrap();
    write(&pkg_root, "C.cs", "namespace MyPkg;\npublic class Client { public void Go() { } }");

    let extraction = extract_dir(&pkg_root);
    assert_eq!(extraction.index.package, "MyPkg");
    assert_eq!(find_type(&extraction.index, "Client").entry_point, Some(true));
}

// ─── Dependencies ────────────────────────────────────────────────────

#[test]
fn test_dependencies_exclude_local_types() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "C.cs",
        r#"namespace Acme;
public class Client {
    public Widget Local() { return null; }
    public Newtonsoft.Json.JsonConverter External() { return null; }
}
public class Widget { }"#,
    );

    let index = extract_dir(dir.path()).index;
    let deps = index.dependencies.as_deref().unwrap();
    assert_eq!(deps.len(), 1);
    assert_eq!(deps[0].package, "Newtonsoft.Json");
    let dep_names: Vec<&str> = deps[0].types.iter().map(|t| t.name.as_str()).collect();
    assert!(!dep_names.contains(&"Widget"));
    assert!(dep_names.contains(&"JsonConverter"));
}

#[test]
fn test_stdlib_dependency_marked() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "C.cs",
        "namespace Acme;\npublic class Client { public System.Text.Json.JsonDocument Doc() { return null; } }",
    );

    let index = extract_dir(dir.path()).index;
    let deps = index.dependencies.as_deref().unwrap();
    assert_eq!(deps[0].package, "System.Text.Json");
    assert_eq!(deps[0].is_stdlib, Some(true));
}

// ─── Determinism & round-trip ────────────────────────────────────────

#[test]
fn test_extraction_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "A.cs", "namespace Acme;\npublic class A { public void M(B b) { } }");
    write(dir.path(), "B.cs", "namespace Acme;\npublic class B : A { }");
    write(dir.path(), "E.cs", "namespace Acme;\npublic enum E { X, Y }");

    let first = extract_dir(dir.path()).index;
    let second = extract_dir(dir.path()).index;
    assert_eq!(first, second);
}

#[test]
fn test_json_roundtrip_equality() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "C.cs",
        r#"namespace Acme;
/// <summary>Client for widgets.</summary>
public class Client {
    public Task<Widget> GetAsync(string id) { return null; }
}
public class Widget { public string Name { get; set; } }"#,
    );

    let index = extract_dir(dir.path()).index;
    let json = serde_json::to_string(&index).unwrap();
    let back: ApiIndex = serde_json::from_str(&json).unwrap();
    assert_eq!(back, index);
}

// ─── Universal invariants over a mixed tree ──────────────────────────

#[test]
fn test_universal_invariants() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "Mix.cs",
        r#"namespace Acme;
/// <summary>A client.</summary>
public class Client : ClientBase, IClient {
    public void Go() { }
    public void Go(int n) { }
}
public class ClientBase { }
public interface IClient { void Go(); }
public enum Mode { A, B }
public class AcmeException : System.Exception { }"#,
    );

    let index = extract_dir(dir.path()).index;

    // namespaces and types sorted
    let mut ns_sorted = index.namespaces.clone();
    ns_sorted.sort_by(|a, b| a.name.cmp(&b.name));
    assert_eq!(
        index.namespaces.iter().map(|n| &n.name).collect::<Vec<_>>(),
        ns_sorted.iter().map(|n| &n.name).collect::<Vec<_>>()
    );

    for (_, t) in index.all_types() {
        // members unique by sig
        if let Some(members) = t.members.as_deref() {
            let mut sigs: Vec<&str> = members.iter().map(|m| m.sig.as_str()).collect();
            let total = sigs.len();
            sigs.sort();
            sigs.dedup();
            assert_eq!(sigs.len(), total, "duplicate sigs in {}", t.name);
        }
        // interface invariant
        if t.kind == TypeKind::Interface {
            assert!(t.base.is_none());
        }
        // enum invariant
        if t.kind == TypeKind::Enum {
            assert!(t.values.is_some());
            assert!(t.members.is_none());
        }
        // doc cap
        if let Some(doc) = t.doc.as_deref() {
            assert!(doc.chars().count() <= crate::DOC_MAX_LEN);
        }
    }

    assert_eq!(find_type(&index, "AcmeException").is_error, Some(true));
    let client = find_type(&index, "Client");
    assert_eq!(client.base.as_deref(), Some("ClientBase"));
    assert_eq!(client.interfaces.as_deref(), Some(&["IClient".to_string()][..]));
}
