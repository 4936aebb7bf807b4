//! # surface — Public API Surface & Sample-Coverage Engine
//!
//! Parses an SDK package's source tree into a compact semantic model of its
//! public API (`ApiIndex`), classifies which types form the client-facing
//! entry-point surface, graphs transitive type references, scores how much of
//! that surface a sample corpus demonstrates, and renders a token-compact
//! stub view of the result.
//!
//! ## Library usage
//!
//! The crate is primarily a CLI tool, but the full pipeline is exposed as a
//! library: `api::extract` → `graph::client_set` → `usage::analyze` →
//! `render::render_stubs`.

use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

pub mod api;
pub mod cli;
pub mod error;
pub mod graph;
pub mod render;
pub mod usage;

pub use error::SurfaceError;

// ─── Path & file helpers ─────────────────────────────────────────────

/// Strip the `\\?\` extended-length path prefix that Windows canonicalize adds.
pub fn clean_path(p: &str) -> String {
    p.strip_prefix(r"\\?\").unwrap_or(p).to_string()
}

/// Read a file as UTF-8, falling back to lossy conversion for files with
/// invalid byte sequences. Returns `(content, was_lossy)`.
pub fn read_file_lossy(path: &Path) -> std::io::Result<(String, bool)> {
    let mut bytes = Vec::new();
    std::fs::File::open(path)?.read_to_end(&mut bytes)?;
    match String::from_utf8(bytes) {
        Ok(s) => Ok((s, false)),
        Err(e) => Ok((String::from_utf8_lossy(e.as_bytes()).into_owned(), true)),
    }
}

// ─── Signature tokenizer ─────────────────────────────────────────────

/// Extract identifier tokens from a signature string.
///
/// Token boundaries are any non-identifier character, so `Policy` never
/// matches inside `PolicyList`. Tokens starting with a digit are dropped
/// (numeric literals in default values are not identifiers).
///
/// # Examples
///
/// ```
/// use surface::signature_idents;
///
/// let idents = signature_idents("Response<Widget> Get(WidgetKey key)");
/// assert!(idents.contains(&"Widget".to_string()));
/// assert!(idents.contains(&"WidgetKey".to_string()));
/// assert!(!idents.contains(&"Widge".to_string()));
/// ```
pub fn signature_idents(sig: &str) -> Vec<String> {
    sig.split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|s| !s.is_empty())
        .filter(|s| !s.chars().next().is_some_and(|c| c.is_ascii_digit()))
        .map(|s| s.to_string())
        .collect()
}

/// Strip a trailing generic parameter list: `Map<K,V>` → `Map`.
pub fn strip_generics(name: &str) -> &str {
    match name.find('<') {
        Some(i) => &name[..i],
        None => name,
    }
}

// ─── Documentation text helpers ──────────────────────────────────────

/// Maximum length of a doc summary before truncation.
pub const DOC_MAX_LEN: usize = 150;

/// Collapse whitespace and truncate a doc summary to [`DOC_MAX_LEN`]
/// characters, appending `…` when truncated.
pub fn truncate_doc(text: &str) -> String {
    let collapsed: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= DOC_MAX_LEN {
        return collapsed;
    }
    let truncated: String = collapsed.chars().take(DOC_MAX_LEN - 1).collect();
    format!("{}…", truncated)
}

/// Escape `&`, `<`, `>` for interpolation into generated doc-comment markup.
pub fn xml_escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

// ─── Cancellation ────────────────────────────────────────────────────

/// Cooperative cancellation token, shared across worker threads and child
/// process waits. Cloning is cheap; all clones observe the same flag.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Return `Err(SurfaceError::Cancelled)` when the flag is set. Called at
    /// every suspension point (per file, per batch, around child waits).
    pub fn check(&self) -> Result<(), SurfaceError> {
        if self.is_cancelled() {
            Err(SurfaceError::Cancelled)
        } else {
            Ok(())
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
#[path = "e2e_tests.rs"]
mod e2e_tests;


// ─── Property-based tests (proptest) ─────────────────────────────────
