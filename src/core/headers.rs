//! Header sanitization for the proxy boundary.
//!
//! Derives the header set sent upstream from the inbound set: hop-by-hop
//! headers, the caller's credential headers and `content-length` are dropped,
//! everything else passes through with duplicate instances preserved in
//! order, and the upstream credential header is set last, overwriting any
//! client-supplied value under that name.
use http::{HeaderMap, HeaderName, HeaderValue};

/// Headers meaningful only for a single transport leg; never relayed.
const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailers",
    "transfer-encoding",
    "upgrade",
];

/// Upstream response headers describing the now-invalid transport framing of
/// the upstream connection; stripped before relaying.
const RESPONSE_EXCLUDED: [&str; 3] = ["content-encoding", "transfer-encoding", "connection"];

pub struct HeaderSanitizer {
    upstream_key_header: HeaderName,
    upstream_key: HeaderValue,
}

impl HeaderSanitizer {
    pub fn new(upstream_key_header: HeaderName, upstream_key: HeaderValue) -> Self {
        Self {
            upstream_key_header,
            upstream_key,
        }
    }

    /// Map inbound headers to the set sent upstream.
    pub fn sanitize(&self, inbound: &HeaderMap) -> HeaderMap {
        let mut out = HeaderMap::with_capacity(inbound.len() + 1);

        // HeaderMap::iter repeats the name for duplicate values, so append
        // keeps multi-instance headers intact and ordered.
        for (name, value) in inbound.iter() {
            if is_dropped_request_header(name) {
                continue;
            }
            out.append(name.clone(), value.clone());
        }

        // Overwrite, never append: a client-supplied header of the same name
        // must not survive next to the real credential.
        out.insert(self.upstream_key_header.clone(), self.upstream_key.clone());
        out
    }
}

fn is_dropped_request_header(name: &HeaderName) -> bool {
    let name = name.as_str();
    HOP_BY_HOP.contains(&name)
        || name == "authorization"
        || name == "x-api-key"
        || name == "content-length"
}

/// Strip transport-framing headers from an upstream response before relaying
/// it to the caller. Everything else is copied verbatim, duplicates included.
pub fn strip_response_headers(upstream: &HeaderMap) -> HeaderMap {
    let mut out = HeaderMap::with_capacity(upstream.len());
    for (name, value) in upstream.iter() {
        if RESPONSE_EXCLUDED.contains(&name.as_str()) {
            continue;
        }
        out.append(name.clone(), value.clone());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sanitizer() -> HeaderSanitizer {
        HeaderSanitizer::new(
            HeaderName::from_static("x-api-key"),
            HeaderValue::from_static("upstream-key"),
        )
    }

    fn values(map: &HeaderMap, name: &str) -> Vec<String> {
        map.get_all(name)
            .iter()
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
            .collect()
    }

    #[test]
    fn hop_by_hop_headers_are_dropped() {
        let mut inbound = HeaderMap::new();
        for name in HOP_BY_HOP {
            inbound.append(
                HeaderName::from_static(name),
                HeaderValue::from_static("x"),
            );
        }
        inbound.insert("accept", HeaderValue::from_static("application/json"));

        let out = sanitizer().sanitize(&inbound);
        for name in HOP_BY_HOP {
            assert!(!out.contains_key(name), "{name} should be dropped");
        }
        assert_eq!(out.get("accept").unwrap(), "application/json");
    }

    #[test]
    fn credential_and_content_length_headers_are_dropped() {
        let mut inbound = HeaderMap::new();
        inbound.insert("authorization", HeaderValue::from_static("Bearer secret"));
        inbound.insert("content-length", HeaderValue::from_static("42"));
        inbound.insert("x-api-key", HeaderValue::from_static("caller-key"));

        let out = sanitizer().sanitize(&inbound);
        assert!(!out.contains_key("authorization"));
        assert!(!out.contains_key("content-length"));
        // x-api-key is also the upstream credential header here: exactly one
        // instance, holding the configured value, not the caller's.
        assert_eq!(values(&out, "x-api-key"), vec!["upstream-key"]);
    }

    #[test]
    fn upstream_credential_overwrites_spoofed_header() {
        let sanitizer = HeaderSanitizer::new(
            HeaderName::from_static("x-controller-key"),
            HeaderValue::from_static("real-key"),
        );
        let mut inbound = HeaderMap::new();
        inbound.append("x-controller-key", HeaderValue::from_static("spoof-1"));
        inbound.append("x-controller-key", HeaderValue::from_static("spoof-2"));

        let out = sanitizer.sanitize(&inbound);
        assert_eq!(values(&out, "x-controller-key"), vec!["real-key"]);
    }

    #[test]
    fn duplicate_instances_are_preserved_in_order() {
        let mut inbound = HeaderMap::new();
        inbound.append("x-trace", HeaderValue::from_static("first"));
        inbound.append("x-trace", HeaderValue::from_static("second"));
        inbound.append("x-trace", HeaderValue::from_static("third"));

        let out = sanitizer().sanitize(&inbound);
        assert_eq!(values(&out, "x-trace"), vec!["first", "second", "third"]);
    }

    #[test]
    fn sanitize_is_idempotent() {
        let sanitizer = sanitizer();
        let mut inbound = HeaderMap::new();
        inbound.insert("authorization", HeaderValue::from_static("Bearer secret"));
        inbound.insert("connection", HeaderValue::from_static("keep-alive"));
        inbound.append("accept", HeaderValue::from_static("*/*"));

        let once = sanitizer.sanitize(&inbound);
        let twice = sanitizer.sanitize(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn response_framing_headers_are_stripped() {
        let mut upstream = HeaderMap::new();
        upstream.insert("content-encoding", HeaderValue::from_static("gzip"));
        upstream.insert("transfer-encoding", HeaderValue::from_static("chunked"));
        upstream.insert("connection", HeaderValue::from_static("close"));
        upstream.insert("content-type", HeaderValue::from_static("application/json"));
        upstream.append("set-cookie", HeaderValue::from_static("a=1"));
        upstream.append("set-cookie", HeaderValue::from_static("b=2"));

        let out = strip_response_headers(&upstream);
        assert!(!out.contains_key("content-encoding"));
        assert!(!out.contains_key("transfer-encoding"));
        assert!(!out.contains_key("connection"));
        assert_eq!(out.get("content-type").unwrap(), "application/json");
        assert_eq!(values(&out, "set-cookie"), vec!["a=1", "b=2"]);
    }
}
