//! Parsing of the backend's fixed response shape.
//!
//! ```text
//! { "response": { "numFound": <integer>, "docs": [ { "id": <string>, ... }, ... ] } }
//! ```

use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
struct Envelope {
    response: Body,
}

#[derive(Debug, Deserialize)]
struct Body {
    #[serde(rename = "numFound")]
    num_found: u64,
    docs: Vec<Map<String, Value>>,
}

/// Parsed view of one backend response
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ParsedResponse {
    pub total: u64,
    pub docs: Vec<Map<String, Value>>,
    pub document_ids: Vec<String>,
}

/// Read total, docs and ids out of `raw`; the error is a human-readable reason.
pub(crate) fn parse(raw: &Value) -> Result<ParsedResponse, String> {
    let envelope = Envelope::deserialize(raw).map_err(|e| format!("malformed response: {e}"))?;
    let document_ids = envelope
        .response
        .docs
        .iter()
        .enumerate()
        .map(|(position, doc)| match doc.get("id") {
            Some(Value::String(id)) => Ok(id.clone()),
            Some(other) => Err(format!("document {position} has non-string id {other}")),
            None => Err(format!("document {position} has no id")),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ParsedResponse {
        total: envelope.response.num_found,
        docs: envelope.response.docs,
        document_ids,
    })
}
