//! Extraction pipeline: source tree → `ApiIndex`.
//!
//! Phases, in order: file discovery (boundary-aware build-dir filter),
//! parallel parse into the shared type map (workers capped at
//! `min(cpu, 8)`), single-threaded classification after the join,
//! dependency attribution in batches, and the immutable snapshot.

mod classify;
mod deps;
mod entrypoints;
mod parser_csharp;
mod typemap;
mod types;

pub use classify::{classify_bases, mark_error_types};
pub use deps::{dependency_cache_root, is_system_package, locate_package_artifact, resolve_dependencies};
pub use entrypoints::{EntryPointSet, Manifest, PackageRef, find_manifest, parse_manifest};
pub use parser_csharp::{new_parser, parse_file_surface};
pub use typemap::{MergedType, RawType, TypeMap, UsingDirective};
pub use types::*;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Instant;

use ignore::WalkBuilder;
use tracing::{info, warn};

use crate::{CancelToken, SurfaceError};

/// Directory segments excluded from discovery. Matching is whole-segment:
/// `bin` never matches a directory named `binary`.
const SKIP_DIRS: [&str; 5] = ["obj", "bin", ".git", ".vs", "node_modules"];

/// Worker cap for the parse phase; past eight threads memory bandwidth
/// dominates parse throughput.
const MAX_PARSE_WORKERS: usize = 8;

pub(crate) fn is_skipped_dir(name: &str) -> bool {
    SKIP_DIRS.iter().any(|d| name.eq_ignore_ascii_case(d))
}

// ─── Language seam ───────────────────────────────────────────────────

/// Source language front-end. Parsers share the pipeline and differ only in
/// their front-end; C# is the one that ships.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    #[default]
    CSharp,
}

impl Language {
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Self::CSharp => &["cs"],
        }
    }

    /// Native front-ends are always available; the seam exists for languages
    /// whose extraction rides an external tool.
    pub fn is_available(&self) -> bool {
        true
    }

    pub fn unavailable_reason(&self) -> Option<String> {
        None
    }
}

// ─── Options & results ───────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    pub language: Language,
    /// Worker threads for the parse phase; 0 = auto. Capped at the
    /// bandwidth limit either way.
    pub threads: usize,
}

/// Everything one extraction run produced.
#[derive(Debug)]
pub struct Extraction {
    pub index: ApiIndex,
    pub stats: ExtractionStats,
    pub entry_points: EntryPointSet,
}

// ─── Pipeline ────────────────────────────────────────────────────────

/// Extract the public API surface of the package rooted at `root`.
pub fn extract(
    root: &Path,
    options: &ExtractOptions,
    cancel: &CancelToken,
) -> Result<Extraction, SurfaceError> {
    let start = Instant::now();
    if !root.is_dir() {
        return Err(SurfaceError::PathNotFound(root.display().to_string()));
    }
    let root = std::fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());

    // Manifest parse failures fall back to the directory name.
    let manifest = find_manifest(&root).and_then(|p| parse_manifest(&p));
    if manifest.is_none() {
        warn!(root = %root.display(), "no usable project manifest; deriving identity from directory name");
    }
    let entry_points = EntryPointSet::derive(manifest.as_ref(), &root);

    let files = discover_files(&root, options.language);
    info!(count = files.len(), root = %root.display(), "parsing source files");

    let (entries, usings, mut stats) = parse_phase(&files, options, cancel)?;

    let mut entries = entries;
    // Classifier and flags run strictly after the parse-phase join.
    entries.sort_by(|a, b| (a.namespace.as_str(), a.name.as_str()).cmp(&(b.namespace.as_str(), b.name.as_str())));
    classify_bases(&mut entries);
    mark_error_types(&mut entries);
    for entry in entries.iter_mut() {
        entry.entry_point = entry_points.is_entry_point(&entry.namespace);
    }
    mark_re_exports(&mut entries, &usings, manifest.as_ref());

    let dependencies = resolve_dependencies(&entries, manifest.as_ref(), cancel)?;

    let package = manifest
        .as_ref()
        .and_then(|m| m.package_name().map(str::to_string))
        .or_else(|| root.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "unknown".to_string());
    let version = manifest.as_ref().and_then(|m| m.version.clone());

    let index = snapshot(package, version, entries, dependencies);
    stats.elapsed_ms = start.elapsed().as_millis() as u64;
    info!(
        types = index.type_count(),
        namespaces = index.namespaces.len(),
        files = stats.file_count,
        parse_errors = stats.parse_errors,
        "extraction complete"
    );

    Ok(Extraction { index, stats, entry_points })
}

/// Enumerate source files, skipping build/vendor directory segments.
/// Sorted for deterministic downstream ordering.
pub(crate) fn discover_files(root: &Path, language: Language) -> Vec<PathBuf> {
    let extensions = language.extensions();
    let mut files: Vec<PathBuf> = WalkBuilder::new(root)
        .hidden(false)
        .git_ignore(true)
        .filter_entry(|entry| {
            let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
            !(is_dir && is_skipped_dir(&entry.file_name().to_string_lossy()))
        })
        .build()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_some_and(|ft| ft.is_file()))
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
        })
        .collect();
    files.sort();
    files
}

type ParseOutput = (Vec<MergedType>, Vec<UsingDirective>, ExtractionStats);

fn parse_phase(
    files: &[PathBuf],
    options: &ExtractOptions,
    cancel: &CancelToken,
) -> Result<ParseOutput, SurfaceError> {
    let cpu = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4);
    let workers = if options.threads > 0 {
        options.threads.min(MAX_PARSE_WORKERS)
    } else {
        cpu.min(MAX_PARSE_WORKERS)
    }
    .max(1);

    let map = TypeMap::new();
    let all_usings: Mutex<Vec<UsingDirective>> = Mutex::new(Vec::new());
    let chunk_size = files.len().div_ceil(workers).max(1);

    let worker_stats: Vec<(usize, usize)> = std::thread::scope(|s| {
        let handles: Vec<_> = files
            .chunks(chunk_size)
            .map(|chunk| {
                let map = &map;
                let all_usings = &all_usings;
                let cancel = cancel.clone();
                s.spawn(move || {
                    let mut parser = new_parser();
                    let mut parse_errors = 0usize;
                    let mut lossy = 0usize;
                    for file in chunk {
                        if cancel.is_cancelled() {
                            break;
                        }
                        let (content, was_lossy) = match crate::read_file_lossy(file) {
                            Ok(r) => r,
                            Err(e) => {
                                warn!(file = %file.display(), error = %e, "failed to read source file; skipping");
                                parse_errors += 1;
                                continue;
                            }
                        };
                        if was_lossy {
                            warn!(file = %file.display(), "file contains non-UTF8 bytes; lossy conversion applied");
                            lossy += 1;
                        }
                        let surface = parse_file_surface(&mut parser, &content);
                        for raw in surface.types {
                            map.merge(raw);
                        }
                        if !surface.usings.is_empty() {
                            all_usings
                                .lock()
                                .unwrap_or_else(|e| e.into_inner())
                                .extend(surface.usings);
                        }
                    }
                    (parse_errors, lossy)
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| {
                h.join().unwrap_or_else(|_| {
                    warn!("parser worker panicked; its chunk is dropped");
                    (0, 0)
                })
            })
            .collect()
    });

    // The scope join is the happens-before edge that makes the lock-free
    // snapshot read below sound.
    cancel.check()?;

    let stats = ExtractionStats {
        file_count: files.len(),
        parse_errors: worker_stats.iter().map(|(e, _)| e).sum(),
        lossy_file_count: worker_stats.iter().map(|(_, l)| l).sum(),
        elapsed_ms: 0,
    };
    let usings = all_usings.into_inner().unwrap_or_else(|e| e.into_inner());
    Ok((map.into_entries(), usings, stats))
}

/// Mark first-party types that merely re-expose an aliased foreign type:
/// `using Widget = Vendor.Widgets.Widget;` against a local `Widget`.
fn mark_re_exports(
    entries: &mut [MergedType],
    usings: &[UsingDirective],
    manifest: Option<&Manifest>,
) {
    let aliased: HashMap<&str, &str> = usings
        .iter()
        .filter_map(|u| {
            let alias = u.alias.as_deref()?;
            u.target.contains('.').then_some((alias, u.target.as_str()))
        })
        .collect();
    if aliased.is_empty() {
        return;
    }
    for entry in entries.iter_mut() {
        if let Some(&target) = aliased.get(entry.simple_name()) {
            let namespace = target.rsplit_once('.').map(|(ns, _)| ns).unwrap_or(target);
            // A target inside the package is not a re-export.
            let local = entries_namespace_prefix(manifest, namespace);
            if !local {
                entry.re_exported_from = Some(namespace.to_string());
            }
        }
    }
}

fn entries_namespace_prefix(manifest: Option<&Manifest>, namespace: &str) -> bool {
    manifest
        .and_then(|m| m.root_namespace.as_deref().or(m.package_id.as_deref()))
        .is_some_and(|root| {
            namespace.eq_ignore_ascii_case(root)
                || (namespace.len() > root.len()
                    && namespace[..root.len()].eq_ignore_ascii_case(root)
                    && namespace.as_bytes()[root.len()] == b'.')
        })
}

/// Freeze the mutable pipeline state into the immutable, shareable index.
fn snapshot(
    package: String,
    version: Option<String>,
    entries: Vec<MergedType>,
    dependencies: Option<Vec<DependencyInfo>>,
) -> ApiIndex {
    let mut by_namespace: HashMap<String, Vec<TypeInfo>> = HashMap::new();
    for entry in entries {
        let (info, namespace) = merged_to_info(entry);
        by_namespace.entry(namespace).or_default().push(info);
    }

    let mut namespaces: Vec<NamespaceInfo> = by_namespace
        .into_iter()
        .map(|(name, mut types)| {
            types.sort_by(|a, b| a.name.cmp(&b.name));
            types.dedup_by(|a, b| a.name == b.name);
            NamespaceInfo { name, types }
        })
        .collect();
    namespaces.sort_by(|a, b| a.name.cmp(&b.name));

    ApiIndex { package, version, namespaces, dependencies }
}

fn merged_to_info(entry: MergedType) -> (TypeInfo, String) {
    let namespace = entry.namespace;
    let is_enum = entry.kind == TypeKind::Enum;
    let info = TypeInfo {
        name: entry.name,
        kind: entry.kind,
        entry_point: entry.entry_point.then_some(true),
        is_error: entry.is_error.then_some(true),
        re_exported_from: entry.re_exported_from,
        base: entry.base,
        interfaces: (!entry.interfaces.is_empty()).then_some(entry.interfaces),
        doc: entry.doc,
        members: if is_enum || entry.members.is_empty() {
            None
        } else {
            Some(entry.members)
        },
        values: if is_enum {
            Some(entry.values.unwrap_or_default())
        } else {
            None
        },
    };
    (info, namespace)
}

#[cfg(test)]
#[path = "extract_tests.rs"]
mod tests;
