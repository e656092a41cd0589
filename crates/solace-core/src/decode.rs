//! Tolerant JSON extraction from generator output.
//!
//! The generator frequently wraps its JSON in prose or markdown fences.
//! Decoding is an explicit step returning `Result<T, DecodeError>`; a
//! decode failure always maps to a documented default at the call site
//! and never propagates as an unhandled fault.

use serde::de::DeserializeOwned;
use thiserror::Error;

/// Why a generator response could not be decoded.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// No JSON object or array found in the response text.
    #[error("no JSON payload in response")]
    Missing,

    /// A payload was found but did not parse into the expected shape.
    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// Extract and parse the first JSON object or array embedded in `raw`.
pub fn decode_json<T: DeserializeOwned>(raw: &str) -> Result<T, DecodeError> {
    let payload = extract_payload(raw).ok_or(DecodeError::Missing)?;
    Ok(serde_json::from_str(payload)?)
}

/// Slice out the outermost `{...}` or `[...]` span, whichever opens first.
fn extract_payload(raw: &str) -> Option<&str> {
    let obj = span(raw, '{', '}');
    let arr = span(raw, '[', ']');
    match (obj, arr) {
        (Some(o), Some(a)) => {
            if o.0 < a.0 {
                Some(&raw[o.0..o.1])
            } else {
                Some(&raw[a.0..a.1])
            }
        }
        (Some(o), None) => Some(&raw[o.0..o.1]),
        (None, Some(a)) => Some(&raw[a.0..a.1]),
        (None, None) => None,
    }
}

fn span(raw: &str, open: char, close: char) -> Option<(usize, usize)> {
    let start = raw.find(open)?;
    let end = raw.rfind(close)?;
    if end < start {
        return None;
    }
    Some((start, end + close.len_utf8()))
}
