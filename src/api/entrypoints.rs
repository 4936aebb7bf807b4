//! Project-manifest parsing and entry-point namespace classification.
//!
//! The manifest is an XML project file. Matching is by local element name so
//! namespaced manifests work; text is read with quick-xml, which performs no
//! DTD processing or custom entity expansion (the secure-load contract).

use std::path::{Path, PathBuf};

use quick_xml::Reader;
use quick_xml::events::Event;
use tracing::warn;

// ─── Manifest model ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct PackageRef {
    pub name: String,
    pub version: Option<String>,
}

/// Recognized properties of a project manifest.
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    pub package_id: Option<String>,
    pub assembly_name: Option<String>,
    pub root_namespace: Option<String>,
    pub version: Option<String>,
    pub package_refs: Vec<PackageRef>,
    /// Project file stem (`Acme.Sdk.csproj` → `Acme.Sdk`).
    pub file_stem: String,
}

impl Manifest {
    /// Package identity: explicit id, then assembly name, then the project
    /// file stem.
    pub fn package_name(&self) -> Option<&str> {
        self.package_id
            .as_deref()
            .or(self.assembly_name.as_deref())
            .or((!self.file_stem.is_empty()).then_some(self.file_stem.as_str()))
    }
}

/// Locate the project manifest nearest to the root: shallowest `.csproj`
/// wins, ties broken by path order.
pub fn find_manifest(root: &Path) -> Option<PathBuf> {
    let mut found: Vec<(usize, PathBuf)> = Vec::new();
    collect_manifests(root, 0, &mut found);
    found.sort();
    found.into_iter().next().map(|(_, p)| p)
}

fn collect_manifests(dir: &Path, depth: usize, out: &mut Vec<(usize, PathBuf)>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            let name = entry.file_name();
            if !crate::api::is_skipped_dir(&name.to_string_lossy()) {
                collect_manifests(&path, depth + 1, out);
            }
        } else if path.extension().is_some_and(|e| e.eq_ignore_ascii_case("csproj")) {
            out.push((depth, path));
        }
    }
}

/// Parse a project manifest. A malformed file is recovered by the caller
/// (directory-name fallback), so errors surface as `None` plus a warning.
pub fn parse_manifest(path: &Path) -> Option<Manifest> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read project manifest");
            return None;
        }
    };
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    match parse_manifest_xml(&content, stem) {
        Ok(m) => Some(m),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "malformed project manifest");
            None
        }
    }
}

fn parse_manifest_xml(xml: &str, file_stem: String) -> Result<Manifest, quick_xml::Error> {
    let mut manifest = Manifest { file_stem, ..Manifest::default() };
    let mut reader = Reader::from_str(xml);

    // Element the next Text event belongs to.
    enum TextSlot {
        PackageId,
        AssemblyName,
        RootNamespace,
        Version,
        RefVersion,
        None,
    }
    let mut slot = TextSlot::None;
    let mut pending_ref: Option<PackageRef> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let local = e.local_name();
                match local.as_ref() {
                    b"PackageId" => slot = TextSlot::PackageId,
                    b"AssemblyName" => slot = TextSlot::AssemblyName,
                    b"RootNamespace" => slot = TextSlot::RootNamespace,
                    b"Version" if pending_ref.is_none() => slot = TextSlot::Version,
                    b"Version" => slot = TextSlot::RefVersion,
                    b"PackageReference" => {
                        pending_ref = package_ref_from_attrs(&e);
                    }
                    _ => slot = TextSlot::None,
                }
            }
            Event::Empty(e) => {
                if e.local_name().as_ref() == b"PackageReference"
                    && let Some(r) = package_ref_from_attrs(&e)
                {
                    manifest.package_refs.push(r);
                }
            }
            Event::Text(t) => {
                let text = t.unescape().unwrap_or_default().trim().to_string();
                if text.is_empty() {
                    continue;
                }
                match slot {
                    TextSlot::PackageId => manifest.package_id = Some(text),
                    TextSlot::AssemblyName => manifest.assembly_name = Some(text),
                    TextSlot::RootNamespace => manifest.root_namespace = Some(text),
                    TextSlot::Version => manifest.version = Some(text),
                    TextSlot::RefVersion => {
                        if let Some(r) = pending_ref.as_mut() {
                            r.version = Some(text);
                        }
                    }
                    TextSlot::None => {}
                }
                slot = TextSlot::None;
            }
            Event::End(e) => {
                if e.local_name().as_ref() == b"PackageReference"
                    && let Some(r) = pending_ref.take()
                {
                    manifest.package_refs.push(r);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(manifest)
}

fn package_ref_from_attrs(e: &quick_xml::events::BytesStart) -> Option<PackageRef> {
    let mut name = None;
    let mut version = None;
    for attr in e.attributes().flatten() {
        let value = attr.unescape_value().ok()?.into_owned();
        match attr.key.local_name().as_ref() {
            b"Include" => name = Some(value),
            b"Version" => version = Some(value),
            _ => {}
        }
    }
    name.map(|name| PackageRef { name, version })
}

// ─── Entry-point classification ──────────────────────────────────────

/// Case-insensitive set of entry-point namespace names derived from the
/// manifest, with the root directory's leaf name as the no-manifest fallback.
#[derive(Debug, Clone, Default)]
pub struct EntryPointSet {
    names: Vec<String>,
}

impl EntryPointSet {
    pub fn derive(manifest: Option<&Manifest>, root: &Path) -> Self {
        fn push(names: &mut Vec<String>, candidate: Option<&str>) {
            if let Some(c) = candidate {
                let lower = c.trim().to_lowercase();
                if !lower.is_empty() && !names.contains(&lower) {
                    names.push(lower);
                }
            }
        }

        let mut names: Vec<String> = Vec::new();
        if let Some(m) = manifest {
            push(&mut names, m.root_namespace.as_deref());
            push(&mut names, m.package_id.as_deref());
            push(&mut names, m.assembly_name.as_deref());
            push(&mut names, Some(m.file_stem.as_str()));
        }
        if names.is_empty() {
            push(&mut names, root.file_name().map(|n| n.to_string_lossy()).as_deref());
        }
        Self { names }
    }

    /// A namespace is an entry point when it exactly matches a collected
    /// name, or is a direct child of one that is neither an `Internal` nor an
    /// `Implementation` segment. Deeper nesting is supporting-type territory.
    pub fn is_entry_point(&self, namespace: &str) -> bool {
        let ns = namespace.to_lowercase();
        if ns.is_empty() {
            return false;
        }
        for entry in &self.names {
            if ns == *entry {
                return true;
            }
            if let Some(suffix) = ns.strip_prefix(entry).and_then(|s| s.strip_prefix('.')) {
                if suffix.contains('.') {
                    continue;
                }
                if suffix == "internal" || suffix == "implementation" {
                    continue;
                }
                return true;
            }
        }
        false
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
#[path = "entrypoints_tests.rs"]
mod tests;
