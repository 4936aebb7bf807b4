//! Deterministic renderers for the extraction result: the JSON contract and
//! the token-compact stub view.

mod stubs;

pub use stubs::{StubOptions, render_stubs};

use crate::SurfaceError;
use crate::api::ApiIndex;

/// Serialize an index to its JSON contract (camelCase keys, nulls omitted).
pub fn to_json(index: &ApiIndex, pretty: bool) -> Result<String, SurfaceError> {
    let json = if pretty {
        serde_json::to_string_pretty(index)?
    } else {
        serde_json::to_string(index)?
    };
    Ok(json)
}
