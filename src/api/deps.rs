//! Dependency resolution: attribute externally-referenced types to packages.
//!
//! A semantic model built from all parsed declarations stands in for a full
//! compilation: locally-defined names are dropped, qualified references are
//! attributed by containing namespace (manifest-declared packages matched by
//! dotted prefix), and unresolved bare names fall back to their own display
//! name. Missing or unreadable dependency artifacts reduce precision but
//! never fail the run.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use semver::Version;
use tracing::{debug, warn};

use crate::api::entrypoints::Manifest;
use crate::api::typemap::MergedType;
use crate::api::types::{DependencyInfo, TypeInfo, TypeKind};
use crate::{strip_generics, CancelToken, SurfaceError};

/// Entries processed per batch; caps the working set the way the semantic
/// phase caps per-batch compilation memory.
const BATCH_SIZE: usize = 500;

/// Standard-library assembly roots. Frozen set; safe for concurrent reads.
const SYSTEM_ASSEMBLY_ROOTS: [&str; 7] = [
    "System",
    "mscorlib",
    "netstandard",
    "Microsoft.CSharp",
    "Microsoft.VisualBasic",
    "Microsoft.Win32",
    "WindowsBase",
];

/// Identifiers that parse as plain names but never denote external types.
const NON_TYPE_IDENTS: [&str; 3] = ["var", "dynamic", "nint"];

/// `true` when `package` equals a standard-library root or sits under one
/// (`root.` dotted prefix). Case-insensitive.
pub fn is_system_package(package: &str) -> bool {
    SYSTEM_ASSEMBLY_ROOTS.iter().any(|root| {
        package.eq_ignore_ascii_case(root)
            || (package.len() > root.len()
                && package[..root.len()].eq_ignore_ascii_case(root)
                && package.as_bytes()[root.len()] == b'.')
    })
}

// ─── Resolution ──────────────────────────────────────────────────────

/// Attribute every external reference collected during parsing to a package.
/// Returns `None` when nothing external is referenced.
pub fn resolve_dependencies(
    entries: &[MergedType],
    manifest: Option<&Manifest>,
    cancel: &CancelToken,
) -> Result<Option<Vec<DependencyInfo>>, SurfaceError> {
    let model = SemanticModel::build(entries);

    // Metadata-reference pass: confirm which declared dependencies have an
    // artifact on disk. Absence is tolerated with reduced precision.
    if let Some(m) = manifest {
        let cache = dependency_cache_root();
        for package_ref in &m.package_refs {
            if locate_package_artifact(&cache, &package_ref.name).is_none() {
                debug!(
                    package = %package_ref.name,
                    cache = %cache.display(),
                    "no dependency artifact found; attribution continues from source only"
                );
            }
        }
    }

    let mut grouped: BTreeMap<String, BTreeMap<String, TypeInfo>> = BTreeMap::new();
    for batch in entries.chunks(BATCH_SIZE) {
        cancel.check()?;
        for entry in batch {
            for reference in &entry.refs {
                let Some((package, type_name)) = model.attribute(reference, manifest) else {
                    continue;
                };
                grouped
                    .entry(package)
                    .or_default()
                    .entry(type_name.clone())
                    .or_insert_with(|| TypeInfo::new(type_name, TypeKind::Type));
            }
        }
    }

    if grouped.is_empty() {
        return Ok(None);
    }
    let deps = grouped
        .into_iter()
        .map(|(package, types)| DependencyInfo {
            is_stdlib: is_system_package(&package).then_some(true),
            types: types.into_values().collect(),
            package,
        })
        .collect();
    Ok(Some(deps))
}

/// Whole-program view over the parsed declarations: the locally-defined name
/// sets external references are checked against.
struct SemanticModel {
    local_simple: HashSet<String>,
    local_qualified: HashSet<String>,
}

impl SemanticModel {
    fn build(entries: &[MergedType]) -> Self {
        let mut local_simple = HashSet::new();
        let mut local_qualified = HashSet::new();
        for entry in entries {
            let simple = entry.simple_name().to_string();
            if !entry.namespace.is_empty() {
                local_qualified.insert(format!("{}.{}", entry.namespace, simple));
            }
            local_simple.insert(simple);
        }
        Self { local_simple, local_qualified }
    }

    /// Attribute one collected reference. Returns `(package, typeName)`, or
    /// `None` for locally-defined or non-type references.
    fn attribute(&self, reference: &str, manifest: Option<&Manifest>) -> Option<(String, String)> {
        let display = strip_generics(reference);
        let (namespace, simple) = match display.rsplit_once('.') {
            Some((ns, simple)) => (ns, simple),
            None => ("", display),
        };
        if NON_TYPE_IDENTS.contains(&simple) {
            return None;
        }
        if self.local_simple.contains(simple) || self.local_qualified.contains(display) {
            return None;
        }

        let package = if namespace.is_empty() {
            // Unresolved bare name: attributed to its own display name.
            display.to_string()
        } else {
            attribute_namespace(namespace, manifest)
        };
        Some((package, simple.to_string()))
    }
}

/// Package for a containing namespace: the longest manifest-declared package
/// whose name is the namespace or a dotted prefix of it; otherwise the
/// namespace itself (which also covers the standard-library roots).
fn attribute_namespace(namespace: &str, manifest: Option<&Manifest>) -> String {
    let mut best: Option<&str> = None;
    if let Some(m) = manifest {
        for package_ref in &m.package_refs {
            let name = package_ref.name.as_str();
            let matches = namespace.eq_ignore_ascii_case(name)
                || (namespace.len() > name.len()
                    && namespace[..name.len()].eq_ignore_ascii_case(name)
                    && namespace.as_bytes()[name.len()] == b'.');
            if matches && best.is_none_or(|b| name.len() > b.len()) {
                best = Some(name);
            }
        }
    }
    best.unwrap_or(namespace).to_string()
}

// ─── Dependency-artifact layout ──────────────────────────────────────

/// Framework folders, newest to oldest; the first present wins.
const FRAMEWORK_PREFERENCE: [&str; 10] = [
    "net9.0",
    "net8.0",
    "net7.0",
    "net6.0",
    "net5.0",
    "netstandard2.1",
    "netstandard2.0",
    "netcoreapp3.1",
    "net472",
    "net461",
];

/// Dependency cache root: the environment override, else the user-home
/// default. Resolved once per process.
pub fn dependency_cache_root() -> PathBuf {
    static ROOT: OnceLock<PathBuf> = OnceLock::new();
    ROOT.get_or_init(|| {
        if let Ok(root) = std::env::var("SURFACE_NUGET_ROOT") {
            return PathBuf::from(root);
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".nuget")
            .join("packages")
    })
    .clone()
}

/// Locate the best compiled artifact for a package in the cache layout
/// `<root>/<package>/<version>/lib/<framework>/<artifact>`: latest semantic
/// version (pre-release below its release), then the newest framework folder
/// containing an artifact.
pub fn locate_package_artifact(cache_root: &Path, package: &str) -> Option<PathBuf> {
    let package_dir = cache_root.join(package.to_lowercase());
    let mut versions: Vec<(Version, PathBuf)> = Vec::new();
    for entry in std::fs::read_dir(&package_dir).ok()?.flatten() {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        match Version::parse(&entry.file_name().to_string_lossy()) {
            Ok(v) => versions.push((v, path)),
            Err(_) => {
                warn!(path = %path.display(), "unparseable version folder in dependency cache");
            }
        }
    }
    versions.sort_by(|a, b| b.0.cmp(&a.0));

    for (_, version_dir) in versions {
        let lib = version_dir.join("lib");
        for framework in FRAMEWORK_PREFERENCE {
            let dir = lib.join(framework);
            let Ok(entries) = std::fs::read_dir(&dir) else {
                continue;
            };
            let mut dlls: Vec<PathBuf> = entries
                .flatten()
                .map(|e| e.path())
                .filter(|p| p.extension().is_some_and(|e| e.eq_ignore_ascii_case("dll")))
                .collect();
            dlls.sort();
            if let Some(dll) = dlls.into_iter().next() {
                return Some(dll);
            }
        }
    }
    None
}

#[cfg(test)]
#[path = "deps_tests.rs"]
mod tests;
