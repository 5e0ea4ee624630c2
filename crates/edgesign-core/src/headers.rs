//! Header reconciliation between the edge format and the signer.
//!
//! Inbound headers are filtered down to [`READ_ONLY_HEADERS`] before signing;
//! the signed set is then re-encoded into the edge format, replacing the
//! request's headers wholesale.

use edgesign_auth::HttpRequest;

use crate::model::{EdgeHeaders, HeaderEntry};

/// Headers forwarded to the origin. Everything else the edge delivers is dropped.
pub const READ_ONLY_HEADERS: [&str; 8] = [
    "accept-encoding",
    "content-length",
    "if-modified-since",
    "if-none-match",
    "if-range",
    "if-unmodified-since",
    "transfer-encoding",
    "via",
];

/// Whether `name` is on the forwarding allow-list, ignoring case.
#[must_use]
pub fn is_read_only(name: &str) -> bool {
    READ_ONLY_HEADERS
        .iter()
        .any(|allowed| allowed.eq_ignore_ascii_case(name))
}

/// Select the allow-listed headers as `(original-case name, value)` pairs.
///
/// Only the first entry of each header is kept. The entry's `key` supplies
/// the casing only when it names the same header as the map key; otherwise
/// the map name is used, so the forwarded name is always on the allow-list.
#[must_use]
pub fn select_read_only(headers: &EdgeHeaders) -> Vec<(String, String)> {
    headers
        .iter()
        .filter(|(name, _)| is_read_only(name))
        .filter_map(|(name, entries)| {
            entries.first().map(|entry| {
                let key = entry
                    .key
                    .as_ref()
                    .filter(|key| key.eq_ignore_ascii_case(name))
                    .unwrap_or(name);
                (key.clone(), entry.value.clone())
            })
        })
        .collect()
}

/// Re-encode a signed request's headers into the edge format.
///
/// The map key is the lowercased name; the entry's `key` keeps the casing the
/// signer produced.
#[must_use]
pub fn to_edge_headers(request: &HttpRequest) -> EdgeHeaders {
    request
        .headers()
        .iter()
        .map(|(name, value)| {
            (
                name.to_ascii_lowercase(),
                vec![HeaderEntry::new(name.clone(), value.clone())],
            )
        })
        .collect()
}
