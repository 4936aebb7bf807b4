// Whole-pipeline tests: extract → client set → usage → render.

use std::path::Path;

use crate::api::{self, ExtractOptions};
use crate::graph;
use crate::render::{self, StubOptions};
use crate::usage::{self, UsageMode};
use crate::CancelToken;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

fn extract(root: &Path) -> api::Extraction {
    api::extract(root, &ExtractOptions::default(), &CancelToken::new()).unwrap()
}

/// A small but realistic SDK: manifest, entry-point client, model, error,
/// enum, and an internal namespace.
fn write_sdk(root: &Path) {
    write(
        root,
        "Acme.Widgets.csproj",
        r#"<Project Sdk="Microsoft.NET.Sdk">
            <PropertyGroup>
                <RootNamespace>Acme.Widgets</RootNamespace>
                <Version>2.1.0</Version>
            </PropertyGroup>
            <ItemGroup>
                <PackageReference Include="Azure.Core" Version="1.38.0" />
            </ItemGroup>
        </Project>"#,
    );
    write(
        root,
        "src/WidgetClient.cs",
        r#"namespace Acme.Widgets;

/// <summary>Client for the widget service.</summary>
public class WidgetClient
{
    public WidgetClient(string endpoint) { }

    /// <summary>Fetches one widget.</summary>
    public Task<Widget> GetAsync(string id) { return null; }

    public void Delete(string id) { }

    public WidgetCollection Widgets { get; }
}
"#,
    );
    write(
        root,
        "src/WidgetCollection.cs",
        r#"namespace Acme.Widgets;

public class WidgetCollection
{
    public IEnumerable<Widget> List(WidgetState state = WidgetState.Active) { return null; }
}
"#,
    );
    write(
        root,
        "src/Widget.cs",
        r#"namespace Acme.Widgets;

/// <summary>A widget resource.</summary>
public class Widget
{
    public string Name { get; set; }
    public WidgetState State { get; set; }
}

public enum WidgetState { Active, Retired }

public class WidgetException : System.Exception
{
    public string Code { get; }
}
"#,
    );
    write(
        root,
        "src/Internal/Helpers.cs",
        r#"namespace Acme.Widgets.Internal;

public class Scratch
{
    public void Noop() { }
}
"#,
    );
}

// ─── Pipeline scenarios ──────────────────────────────────────────────

#[test]
fn test_full_pipeline_native_coverage() {
    let dir = tempfile::tempdir().unwrap();
    let sdk = dir.path().join("sdk");
    std::fs::create_dir_all(&sdk).unwrap();
    write_sdk(&sdk);
    write(
        dir.path(),
        "samples/Program.cs",
        r#"
class Program {
    static void Main() {
        var client = new WidgetClient("https://acme");
        client.GetAsync("w1");
        client.Widgets.List();
    }
}
"#,
    );

    let extraction = extract(&sdk);
    assert_eq!(extraction.index.package, "Acme.Widgets");
    assert_eq!(extraction.index.version.as_deref(), Some("2.1.0"));

    let clients = graph::client_set(&extraction.index);
    let names = clients.names();
    assert!(names.contains(&"WidgetClient"), "got {:?}", names);
    assert!(names.contains(&"WidgetCollection"), "got {:?}", names);
    // Internal namespace types are not entry points and nothing reaches them.
    assert!(!names.contains(&"Scratch"), "got {:?}", names);

    let usage_index = usage::analyze(
        &extraction.index,
        &clients,
        &dir.path().join("samples"),
        &UsageMode::Native,
        &CancelToken::new(),
    )
    .unwrap();

    assert_eq!(usage_index.file_count, 1);
    let covered: Vec<(&str, &str)> = usage_index
        .covered_operations
        .iter()
        .map(|c| (c.client_type.as_str(), c.operation.as_str()))
        .collect();
    assert!(covered.contains(&("WidgetClient", "GetAsync")), "got {:?}", covered);
    assert!(covered.contains(&("WidgetCollection", "List")), "got {:?}", covered);
    let uncovered: Vec<&str> = usage_index
        .uncovered_operations
        .iter()
        .map(|u| u.operation.as_str())
        .collect();
    assert!(uncovered.contains(&"Delete"), "got {:?}", uncovered);
    assert!(!uncovered.contains(&"GetAsync"));

    let stubs = render::render_stubs(
        &extraction.index,
        Some(&usage_index),
        &StubOptions { budget: 0 },
    );
    assert!(stubs.starts_with("// Package: Acme.Widgets v2.1.0"));
    assert!(stubs.contains("void Delete(string id);"));
    assert!(!stubs.contains("Task<Widget> GetAsync(string id);"));
}

#[test]
fn test_reachability_interface_implementer_scenario() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "Acme.Pkg.csproj",
        "<Project><PropertyGroup><RootNamespace>Acme.Pkg</RootNamespace></PropertyGroup></Project>",
    );
    write(
        dir.path(),
        "Types.cs",
        r#"namespace Acme.Pkg;

public class Client
{
    public void Connect() { }
    public IWidgets Widgets { get; }
}

public interface IWidgets
{
    void List();
}

public class Widgets : IWidgets
{
    public void List() { }
}
"#,
    );

    let extraction = extract(dir.path());
    let clients = graph::client_set(&extraction.index);
    let names = clients.names();
    // The interface in the client's surface pulls in its implementer.
    assert!(names.contains(&"Client"), "got {:?}", names);
    assert!(names.contains(&"Widgets"), "got {:?}", names);
}

#[test]
fn test_json_contract_camel_case_omitted_nulls() {
    let dir = tempfile::tempdir().unwrap();
    write_sdk(dir.path());

    let extraction = extract(dir.path());
    let json = render::to_json(&extraction.index, false).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    assert_eq!(value["package"], "Acme.Widgets");
    let widget_client = value["namespaces"][0]["types"]
        .as_array()
        .unwrap()
        .iter()
        .find(|t| t["name"] == "WidgetClient")
        .unwrap();
    assert_eq!(widget_client["entryPoint"], true);
    let get_async = widget_client["members"]
        .as_array()
        .unwrap()
        .iter()
        .find(|m| m["name"] == "GetAsync")
        .unwrap();
    assert_eq!(get_async["isAsync"], true);
    assert_eq!(get_async["kind"], "method");
    // omitted, not null
    assert!(get_async.get("isStatic").is_none());
    assert!(widget_client.get("base").is_none());
}

#[test]
fn test_stubs_unlimited_every_public_type_once() {
    let dir = tempfile::tempdir().unwrap();
    write_sdk(dir.path());

    let extraction = extract(dir.path());
    let stubs = render::render_stubs(&extraction.index, None, &StubOptions { budget: 0 });

    for name in ["WidgetClient", "WidgetCollection", "Widget", "WidgetState", "WidgetException", "Scratch"] {
        let occurrences = stubs
            .match_indices(&format!(" {} ", name))
            .count();
        assert!(
            occurrences >= 1,
            "expected a stub for {}, output:\n{}",
            name,
            stubs
        );
    }
    assert!(!stubs.contains("truncated"));
    // error type is marked and rendered with its heritage
    assert!(stubs.contains("public class WidgetException : Exception"));
}

#[test]
fn test_pipeline_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    write_sdk(dir.path());

    let first = extract(dir.path());
    let second = extract(dir.path());
    assert_eq!(first.index, second.index);

    let json_a = render::to_json(&first.index, true).unwrap();
    let json_b = render::to_json(&second.index, true).unwrap();
    assert_eq!(json_a, json_b);
}

#[cfg(unix)]
#[test]
fn test_pipeline_helper_mode() {
    let dir = tempfile::tempdir().unwrap();
    let sdk = dir.path().join("sdk");
    std::fs::create_dir_all(&sdk).unwrap();
    write_sdk(&sdk);
    write(dir.path(), "samples/S.cs", "class P { }");

    // Helper validates it received JSON on stdin (package name present)
    // before reporting one covered operation.
    let script = dir.path().join("helper.sh");
    std::fs::write(
        &script,
        r#"#!/bin/sh
input=$(cat)
case "$input" in
  *Acme.Widgets*) ;;
  *) echo '{"type":"error","message":"no api json"}'; exit 1 ;;
esac
echo '{"type":"covered","clientType":"WidgetClient","operation":"GetAsync","file":"S.cs","line":2}'
"#,
    )
    .unwrap();
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

    let extraction = extract(&sdk);
    let clients = graph::client_set(&extraction.index);
    let usage_index = usage::analyze(
        &extraction.index,
        &clients,
        &dir.path().join("samples"),
        &UsageMode::Helper(usage::HelperConfig::new(&script)),
        &CancelToken::new(),
    )
    .unwrap();

    assert!(usage_index.errors.is_empty(), "helper errors: {:?}", usage_index.errors);
    assert_eq!(usage_index.covered_operations.len(), 1);
    assert_eq!(usage_index.covered_operations[0].client_type, "WidgetClient");
    assert_eq!(usage_index.covered_operations[0].operation, "GetAsync");
}
