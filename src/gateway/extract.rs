//! Pulls bus-facing inputs out of the HTTP request: the subject from the
//! path, bridged headers, and the `reply`/`timeout` query parameters.

use crate::bus::BusHeaders;
use crate::error::GatewayError;
use axum::extract::Query;
use axum::http::{HeaderMap, Uri};
use percent_encoding::percent_decode_str;
use serde::Deserialize;
use std::time::Duration;

/// Headers carrying this prefix (in any casing) cross the bridge onto the
/// bus message; everything else stays on the HTTP side.
pub(crate) const HEADER_PREFIX: &str = "Natsh-";

/// Applied when the `timeout` parameter is absent, unparsable, or zero.
pub(crate) const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

/// The bus subject is the last non-empty segment of the percent-decoded
/// path, so `/a/b`, `/b` and `/b/` all address `b`, and `/orders.%3E`
/// addresses the wildcard subject `orders.>`. Decoding happens before the
/// split, so an encoded slash separates segments. A path with no segment
/// at all is the caller's mistake and is rejected before anything touches
/// the bus.
pub(crate) fn bus_subject(path: &str) -> Result<String, GatewayError> {
    let decoded = percent_decode_str(path).decode_utf8_lossy();
    decoded
        .rsplit('/')
        .find(|segment| !segment.is_empty())
        .map(str::to_string)
        .ok_or(GatewayError::MissingSubject)
}

/// Collects the prefixed request headers into bus headers.
///
/// The prefix is stripped and the first letter of the remainder is
/// lowercased, so `Natsh-Trace-Id` arrives on the bus as `trace-Id`. Only
/// the first value of a repeated header crosses the bridge.
pub(crate) fn bus_headers(headers: &HeaderMap) -> BusHeaders {
    let mut bridged = BusHeaders::new();
    for name in headers.keys() {
        let Some(stripped) = strip_prefix_ignore_case(name.as_str(), HEADER_PREFIX) else {
            continue;
        };
        if stripped.is_empty() {
            continue;
        }
        if let Some(value) = headers.get(name) {
            let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
            bridged.insert(lowercase_first(stripped), vec![value]);
        }
    }
    bridged
}

fn strip_prefix_ignore_case<'a>(name: &'a str, prefix: &str) -> Option<&'a str> {
    if name.len() < prefix.len() {
        return None;
    }
    let (head, tail) = name.split_at(prefix.len());
    head.eq_ignore_ascii_case(prefix).then_some(tail)
}

fn lowercase_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Query parameters the gateway understands. Anything else on the query
/// string is ignored.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct GatewayParams {
    reply: Option<String>,
    timeout: Option<String>,
}

impl GatewayParams {
    /// A malformed query string never fails a request; it reads as no
    /// parameters at all.
    pub(crate) fn from_uri(uri: &Uri) -> Self {
        Query::<Self>::try_from_uri(uri)
            .map(|Query(params)| params)
            .unwrap_or_default()
    }

    pub(crate) fn reply_to(&self) -> Option<String> {
        self.reply
            .as_deref()
            .filter(|reply| !reply.is_empty())
            .map(str::to_string)
    }

    /// The request timeout in milliseconds. Unparsable and zero values
    /// fall back to [`DEFAULT_TIMEOUT`] rather than failing the request.
    pub(crate) fn timeout(&self) -> Duration {
        self.timeout
            .as_deref()
            .and_then(|raw| raw.parse::<u64>().ok())
            .filter(|&millis| millis > 0)
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_TIMEOUT)
    }
}
