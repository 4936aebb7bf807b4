//! Sample-coverage analysis: which client operations do the samples call.
//!
//! Two modes share one result shape: the native syntactic walk (Mode A) and
//! the external helper protocol (Mode B). Covered pairs deduplicate on
//! `(clientType, operation)` with first occurrence winning; everything a
//! client declares that no sample demonstrates lands in
//! `uncoveredOperations`.

mod helper;
mod native;

pub use helper::{HelperConfig, HelperEvent, run_helper};
pub use native::{SampleCall, calls_in_file};

use std::collections::HashSet;
use std::path::Path;

use tracing::{info, warn};

use crate::api::{ApiIndex, CoveredOperation, Language, UncoveredOperation, UsageIndex};
use crate::graph::{ClientOperation, ClientSet, ClientType};
use crate::{CancelToken, SurfaceError};

/// Analyzer selection; the engine picks per language based on helper
/// availability, preferring the helper when one is configured.
#[derive(Debug, Clone)]
pub enum UsageMode {
    Native,
    Helper(HelperConfig),
}

// ─── Analysis ────────────────────────────────────────────────────────

/// Score the sample corpus under `samples_root` against the client set.
pub fn analyze(
    index: &ApiIndex,
    clients: &ClientSet,
    samples_root: &Path,
    mode: &UsageMode,
    cancel: &CancelToken,
) -> Result<UsageIndex, SurfaceError> {
    if clients.is_empty() {
        return Ok(UsageIndex::default());
    }
    if !samples_root.is_dir() {
        return Err(SurfaceError::PathNotFound(samples_root.display().to_string()));
    }

    let mut usage = match mode {
        UsageMode::Native => native_scan(clients, samples_root, cancel)?,
        UsageMode::Helper(config) => helper_scan(index, clients, samples_root, config, cancel)?,
    };

    fill_uncovered(&mut usage, clients);
    info!(
        files = usage.file_count,
        covered = usage.covered_operations.len(),
        uncovered = usage.uncovered_operations.len(),
        "coverage analysis complete"
    );
    Ok(usage)
}

fn native_scan(
    clients: &ClientSet,
    samples_root: &Path,
    cancel: &CancelToken,
) -> Result<UsageIndex, SurfaceError> {
    let files = crate::api::discover_files(samples_root, Language::CSharp);
    let mut parser = crate::api::new_parser();
    let mut usage = UsageIndex { file_count: files.len(), ..UsageIndex::default() };
    let mut seen: HashSet<String> = HashSet::new();

    for file in &files {
        cancel.check()?;
        let content = match crate::read_file_lossy(file) {
            Ok((content, _)) => content,
            Err(e) => {
                warn!(file = %file.display(), error = %e, "failed to read sample file; skipping");
                continue;
            }
        };
        let rel = file
            .strip_prefix(samples_root)
            .unwrap_or(file)
            .to_string_lossy()
            .into_owned();
        for call in calls_in_file(&mut parser, &content) {
            let Some((client, operation)) = match_call(clients, &call.receiver, &call.method)
            else {
                continue;
            };
            if seen.insert(format!("{}.{}", client, operation)) {
                usage.covered_operations.push(CoveredOperation {
                    client_type: client,
                    operation,
                    file: rel.clone(),
                    line: call.line,
                });
            }
        }
    }
    Ok(usage)
}

fn helper_scan(
    index: &ApiIndex,
    clients: &ClientSet,
    samples_root: &Path,
    config: &HelperConfig,
    cancel: &CancelToken,
) -> Result<UsageIndex, SurfaceError> {
    // An uninstalled helper degrades to an empty result with a reason; it
    // never fails the pipeline.
    if let Err(reason) = config.availability() {
        return Ok(UsageIndex { errors: vec![reason], ..UsageIndex::default() });
    }

    let api_json = crate::render::to_json(index, false)?;
    let events = run_helper(config, &api_json, samples_root, cancel)?;

    let mut usage = UsageIndex::default();
    let mut seen: HashSet<String> = HashSet::new();
    for event in events {
        match event {
            HelperEvent::Covered { client_type, operation, file, line, signature: _ } => {
                // Normalize to the declared operation name so dedup and the
                // uncovered diff line up with the API.
                let (client_type, operation) = clients
                    .types
                    .iter()
                    .find(|c| c.name == client_type)
                    .and_then(|c| {
                        operation_match(c, &operation)
                            .map(|op| (c.name.clone(), op.name.clone()))
                    })
                    .unwrap_or((client_type, operation));
                if seen.insert(format!("{}.{}", client_type, operation)) {
                    usage.covered_operations.push(CoveredOperation {
                        client_type,
                        operation,
                        file,
                        line,
                    });
                }
            }
            HelperEvent::Error { message } => usage.errors.push(message),
        }
    }
    usage.file_count = crate::api::discover_files(samples_root, Language::CSharp).len();
    Ok(usage)
}

/// Diff the declared surface against the covered set; signatures come from
/// the `"ClientType.Operation"` lookup table.
fn fill_uncovered(usage: &mut UsageIndex, clients: &ClientSet) {
    let table = clients.signature_table();
    let covered: HashSet<(String, String)> = usage
        .covered_operations
        .iter()
        .map(|c| (c.client_type.clone(), c.operation.clone()))
        .collect();

    for client in &clients.types {
        for op in &client.operations {
            if covered.contains(&(client.name.clone(), op.name.clone())) {
                continue;
            }
            let key = format!("{}.{}", client.name, op.name);
            usage.uncovered_operations.push(UncoveredOperation {
                client_type: client.name.clone(),
                operation: op.name.clone(),
                signature: table.get(&key).cloned().unwrap_or_else(|| op.signature.clone()),
            });
        }
    }
}

// ─── Call matching heuristics ────────────────────────────────────────

/// Match one observed call against the client set. The receiver tier runs
/// first (receiver mentions the client's base name). When no receiver
/// matches, including the suffix/underscore "client-ish" shapes, any
/// client declaring the method takes it.
pub(crate) fn match_call(
    clients: &ClientSet,
    receiver: &str,
    method: &str,
) -> Option<(String, String)> {
    for client in &clients.types {
        if receiver_names_client(receiver, &client.name)
            && let Some(op) = operation_match(client, method)
        {
            return Some((client.name.clone(), op.name.clone()));
        }
    }
    for client in &clients.types {
        if let Some(op) = operation_match(client, method) {
            return Some((client.name.clone(), op.name.clone()));
        }
    }
    None
}

/// Client base name: one known suffix stripped (`WidgetClient` → `Widget`).
fn client_base_name(client: &str) -> &str {
    for suffix in ["Client", "Service", "Manager"] {
        if let Some(base) = client.strip_suffix(suffix)
            && !base.is_empty()
        {
            return base;
        }
    }
    client
}

fn receiver_names_client(receiver: &str, client: &str) -> bool {
    receiver
        .to_lowercase()
        .contains(&client_base_name(client).to_lowercase())
}

/// Operation lookup tolerating an `Async` suffix mismatch in either
/// direction.
fn operation_match<'a>(client: &'a ClientType, method: &str) -> Option<&'a ClientOperation> {
    client.operations.iter().find(|op| {
        op.name == method
            || op.name.strip_suffix("Async").is_some_and(|base| base == method)
            || method.strip_suffix("Async").is_some_and(|base| base == op.name)
    })
}

#[cfg(test)]
#[path = "usage_tests.rs"]
mod tests;
