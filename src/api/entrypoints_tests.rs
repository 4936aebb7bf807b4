// Manifest parsing and entry-point classification tests.

use super::*;

fn manifest_from(xml: &str) -> Manifest {
    parse_manifest_xml(xml, "Acme.Sdk".to_string()).unwrap()
}

// ─── Manifest parsing ────────────────────────────────────────────────

#[test]
fn test_recognized_properties_collected() {
    let m = manifest_from(
        r#"<Project Sdk="Microsoft.NET.Sdk">
            <PropertyGroup>
                <RootNamespace>Acme.Pkg</RootNamespace>
                <PackageId>Acme.Pkg.Client</PackageId>
                <AssemblyName>Acme.Pkg.Assembly</AssemblyName>
                <Version>1.2.3</Version>
            </PropertyGroup>
        </Project>"#,
    );
    assert_eq!(m.root_namespace.as_deref(), Some("Acme.Pkg"));
    assert_eq!(m.package_id.as_deref(), Some("Acme.Pkg.Client"));
    assert_eq!(m.assembly_name.as_deref(), Some("Acme.Pkg.Assembly"));
    assert_eq!(m.version.as_deref(), Some("1.2.3"));
    assert_eq!(m.package_name(), Some("Acme.Pkg.Client"));
}

#[test]
fn test_package_reference_version_attribute() {
    let m = manifest_from(
        r#"<Project>
            <ItemGroup>
                <PackageReference Include="Azure.Core" Version="1.38.0" />
            </ItemGroup>
        </Project>"#,
    );
    assert_eq!(
        m.package_refs,
        vec![PackageRef { name: "Azure.Core".to_string(), version: Some("1.38.0".to_string()) }]
    );
}

#[test]
fn test_package_reference_version_child_element() {
    let m = manifest_from(
        r#"<Project>
            <ItemGroup>
                <PackageReference Include="Newtonsoft.Json">
                    <Version>13.0.3</Version>
                </PackageReference>
            </ItemGroup>
        </Project>"#,
    );
    assert_eq!(
        m.package_refs,
        vec![PackageRef { name: "Newtonsoft.Json".to_string(), version: Some("13.0.3".to_string()) }]
    );
}

#[test]
fn test_element_namespaces_ignored() {
    // Matching is by local name; a namespaced manifest still parses.
    let m = manifest_from(
        r#"<msb:Project xmlns:msb="http://schemas.microsoft.com/developer/msbuild/2003">
            <msb:PropertyGroup>
                <msb:RootNamespace>Acme.Pkg</msb:RootNamespace>
            </msb:PropertyGroup>
        </msb:Project>"#,
    );
    assert_eq!(m.root_namespace.as_deref(), Some("Acme.Pkg"));
}

#[test]
fn test_malformed_manifest_is_error() {
    assert!(parse_manifest_xml("<Project><Unclosed", "X".to_string()).is_err());
}

#[test]
fn test_no_recognized_properties_falls_back_to_stem() {
    let m = manifest_from("<Project><PropertyGroup/></Project>");
    assert_eq!(m.package_name(), Some("Acme.Sdk"));
}

#[test]
fn test_find_manifest_prefers_shallowest() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("nested")).unwrap();
    std::fs::write(dir.path().join("nested/Inner.csproj"), "<Project/>").unwrap();
    std::fs::write(dir.path().join("Outer.csproj"), "<Project/>").unwrap();

    let found = find_manifest(dir.path()).unwrap();
    assert_eq!(found.file_name().unwrap(), "Outer.csproj");
}

#[test]
fn test_find_manifest_skips_build_dirs() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("obj")).unwrap();
    std::fs::write(dir.path().join("obj/Generated.csproj"), "<Project/>").unwrap();
    assert!(find_manifest(dir.path()).is_none());
}

// ─── Entry-point classification ──────────────────────────────────────

fn entry_set(root_namespace: &str) -> EntryPointSet {
    let manifest = Manifest {
        root_namespace: Some(root_namespace.to_string()),
        file_stem: root_namespace.to_string(),
        ..Manifest::default()
    };
    EntryPointSet::derive(Some(&manifest), Path::new("/tmp/x"))
}

#[test]
fn test_exact_namespace_is_entry_point() {
    assert!(entry_set("Acme.Pkg").is_entry_point("Acme.Pkg"));
}

#[test]
fn test_direct_child_is_entry_point() {
    assert!(entry_set("Acme.Pkg").is_entry_point("Acme.Pkg.Models"));
}

#[test]
fn test_internal_child_is_not_entry_point() {
    assert!(!entry_set("Acme.Pkg").is_entry_point("Acme.Pkg.Internal"));
    assert!(!entry_set("Acme.Pkg").is_entry_point("Acme.Pkg.Implementation"));
}

#[test]
fn test_deep_nesting_is_not_entry_point() {
    assert!(!entry_set("Acme.Pkg").is_entry_point("Acme.Pkg.Models.Nested"));
}

#[test]
fn test_matching_is_case_insensitive() {
    assert!(entry_set("Acme.Pkg").is_entry_point("ACME.PKG.MODELS"));
}

#[test]
fn test_sibling_prefix_is_not_entry_point() {
    // "Acme.PkgExtra" starts with the entry text but is not a dotted child.
    assert!(!entry_set("Acme.Pkg").is_entry_point("Acme.PkgExtra"));
}

#[test]
fn test_no_manifest_uses_directory_leaf() {
    let set = EntryPointSet::derive(None, Path::new("/home/sdk/MyPkg"));
    assert!(set.is_entry_point("MyPkg"));
    assert!(set.is_entry_point("MyPkg.Models"));
    assert!(!set.is_entry_point("Other"));
}

#[test]
fn test_global_namespace_never_entry_point() {
    assert!(!entry_set("Acme.Pkg").is_entry_point(""));
}
