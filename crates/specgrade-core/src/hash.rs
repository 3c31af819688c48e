//! Content digests for provenance and deduplication.
//!
//! - `spec_hash` digests the *normalized source text* of a document: UTF-8
//!   BOM stripped, CRLF and lone CR converted to LF. Two files that differ
//!   only in line-ending style hash identically.
//! - `canonical_json_hash` digests a JSON value through canonical bytes
//!   (sorted object keys, compact, array order preserved). Used for catalog
//!   content hashes.
//!
//! Digests are lowercase hex prefixed with `sha256:`.

use serde_json::Value;
use sha2::{Digest, Sha256};

const PREFIX: &str = "sha256:";

/// Normalize document text before hashing or parsing.
pub fn normalize_source(text: &str) -> String {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// Digest of the normalized document source.
pub fn spec_hash(source: &str) -> String {
    sha256_prefixed(normalize_source(source).as_bytes())
}

/// Digest of a JSON value's canonical bytes.
pub fn canonical_json_hash(value: &Value) -> String {
    sha256_prefixed(&canonical_json_bytes(value))
}

/// SHA-256 over raw bytes, `sha256:`-prefixed lowercase hex.
pub fn sha256_prefixed(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{}{}", PREFIX, hex::encode(hasher.finalize()))
}

/// Canonical JSON: keys sorted by UTF-8 bytes, no insignificant whitespace.
pub fn canonical_json_bytes(value: &Value) -> Vec<u8> {
    let mut out = Vec::with_capacity(256);
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));

            out.push(b'{');
            for (i, (key, child)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_scalar(&Value::String(key.clone()), out);
                out.push(b':');
                write_canonical(child, out);
            }
            out.push(b'}');
        }
        Value::Array(items) => {
            out.push(b'[');
            for (i, child) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_canonical(child, out);
            }
            out.push(b']');
        }
        scalar => write_scalar(scalar, out),
    }
}

fn write_scalar(value: &Value, out: &mut Vec<u8>) {
    // Scalars have exactly one serde_json rendering.
    let rendered = value.to_string();
    out.extend_from_slice(rendered.as_bytes());
}
