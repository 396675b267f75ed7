//! Input validation for session identifiers and endpoint paths.
//!
//! Both checks run before any value reaches the wire or a log line.

use percent_encoding::percent_decode_str;

/// Maximum accepted session id length.
const MAX_SESSION_ID_LENGTH: usize = 256;

/// Validate an opaque session id received from a server.
///
/// Accepts non-empty strings of at most 256 characters drawn from
/// `[A-Za-z0-9._-]`. Anything else is rejected before it can reach logs
/// or request headers.
pub fn is_valid_session_id(session_id: &str) -> bool {
    if session_id.is_empty() || session_id.len() > MAX_SESSION_ID_LENGTH {
        return false;
    }
    session_id
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b == b'.')
}

/// Validate and normalize an endpoint path before URL construction.
///
/// Rejects:
/// - null bytes and other ASCII control characters
/// - backslashes (Windows-style traversal variants)
/// - literal `..` segments
/// - percent-encoded traversal (`%2e%2e` in any casing) and the
///   doubly-encoded form (`%252e`), checked by decoding up to twice
///
/// Remaining `.` segments are dropped during normalization, and the
/// result must still begin with `/` (it can never escape the base).
///
/// Returns the normalized path on success.
pub fn validate_endpoint_path(path: &str) -> Option<String> {
    if path.is_empty() {
        return Some("/".to_string());
    }

    if path.bytes().any(|b| b == 0 || b.is_ascii_control()) {
        return None;
    }
    if path.contains('\\') {
        return None;
    }

    // Decode twice so %252e (which decodes to %2e, then to '.') cannot
    // smuggle a traversal past a single-pass check.
    let once = percent_decode_str(path).decode_utf8().ok()?;
    let twice = percent_decode_str(&once).decode_utf8().ok()?;
    for candidate in [path, once.as_ref(), twice.as_ref()] {
        if candidate.bytes().any(|b| b == 0 || b.is_ascii_control()) {
            return None;
        }
        if candidate.contains('\\') {
            return None;
        }
        if has_dotdot_segment(candidate) {
            return None;
        }
    }

    if !path.starts_with('/') {
        return None;
    }

    // Normalize: drop '.' segments; '..' was already rejected above.
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            other => segments.push(other),
        }
    }
    let mut normalized = String::from("/");
    normalized.push_str(&segments.join("/"));
    Some(normalized)
}

fn has_dotdot_segment(path: &str) -> bool {
    path.split(['/', '\\']).any(|segment| segment == "..")
}
