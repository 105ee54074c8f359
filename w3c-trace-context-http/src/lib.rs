//! [`http::HeaderMap`] carriers for the `traceparent` and `tracestate`
//! headers.
//!
//! ```
//! use w3c_trace_context::propagation::TraceContextPropagator;
//! use w3c_trace_context_http::{HeaderExtractor, HeaderInjector};
//!
//! let mut headers = http::HeaderMap::new();
//! headers.insert(
//!     "traceparent",
//!     "00-0af7651916cd43dd8448eb211c80319c-b7ad6b7169203331-01".parse().unwrap(),
//! );
//!
//! let propagator = TraceContextPropagator::new();
//! let cx = propagator.extract(&HeaderExtractor(&headers)).unwrap();
//!
//! let mut outgoing = http::HeaderMap::new();
//! propagator.inject(&cx.new_child(), &mut HeaderInjector(&mut outgoing));
//! assert!(outgoing.contains_key("traceparent"));
//! ```
#![warn(
    future_incompatible,
    missing_debug_implementations,
    missing_docs,
    nonstandard_style,
    rust_2018_idioms,
    unreachable_pub,
    unused
)]

use std::borrow::Cow;

use w3c_trace_context::propagation::{Extractor, Injector};
use w3c_trace_context::tc_warn;

/// Helper for injecting headers into HTTP Requests. This is used for trace
/// context propagation over HTTP.
#[derive(Debug)]
pub struct HeaderInjector<'a>(pub &'a mut http::HeaderMap);

impl Injector for HeaderInjector<'_> {
    /// Set a key and value in the HeaderMap. Does nothing if the key or value are not valid inputs.
    fn set(&mut self, key: &str, value: String) {
        let Ok(name) = http::header::HeaderName::from_bytes(key.as_bytes()) else {
            tc_warn!(name: "HeaderInjector.InvalidName", header = key);
            return;
        };
        match http::header::HeaderValue::from_str(&value) {
            Ok(val) => {
                self.0.insert(name, val);
            }
            Err(_) => {
                tc_warn!(name: "HeaderInjector.InvalidValue", header = key);
            }
        }
    }

    /// Reserves capacity for at least `additional` more headers.
    fn reserve(&mut self, additional: usize) {
        self.0.reserve(additional);
    }
}

/// Helper for extracting headers from HTTP Requests. This is used for trace
/// context propagation over HTTP.
#[derive(Debug)]
pub struct HeaderExtractor<'a>(pub &'a http::HeaderMap);

impl Extractor for HeaderExtractor<'_> {
    /// Get a value for a key from the HeaderMap. If the value is not valid ASCII, returns None.
    fn get(&self, key: &str) -> Option<Cow<'_, str>> {
        self.0
            .get(key)
            .and_then(|value| value.to_str().ok())
            .map(Cow::Borrowed)
    }

    /// Collect all the keys from the HeaderMap.
    fn keys(&self) -> Vec<Cow<'_, str>> {
        self.0
            .keys()
            .map(|value| Cow::Borrowed(value.as_str()))
            .collect::<Vec<_>>()
    }

    /// Get every line of a header. Values that are not valid ASCII are skipped.
    fn get_all(&self, key: &str) -> Option<Vec<Cow<'_, str>>> {
        let values = self
            .0
            .get_all(key)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .map(Cow::Borrowed)
            .collect::<Vec<_>>();

        if values.is_empty() {
            None
        } else {
            Some(values)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::HeaderValue;
    use rstest::rstest;
    use w3c_trace_context::propagation::TraceContextPropagator;

    const TRACEPARENT: &str = "00-0af7651916cd43dd8448eb211c80319c-b7ad6b7169203331-01";

    #[test]
    fn http_headers_get() {
        let mut carrier = http::HeaderMap::new();
        HeaderInjector(&mut carrier).set("headerName", "value".to_string());

        assert_eq!(
            HeaderExtractor(&carrier).get("HEADERNAME"),
            Some(Cow::Borrowed("value")),
            "case insensitive extraction"
        )
    }

    #[test]
    fn http_headers_keys() {
        let mut carrier = http::HeaderMap::new();
        HeaderInjector(&mut carrier).set("headerName1", "value1".to_string());
        HeaderInjector(&mut carrier).set("headerName2", "value2".to_string());

        let extractor = HeaderExtractor(&carrier);
        let got = extractor.keys();
        assert_eq!(got.len(), 2);
        assert!(got.contains(&Cow::Borrowed("headername1")));
        assert!(got.contains(&Cow::Borrowed("headername2")));
    }

    #[rstest]
    #[case("bad header", "value")]
    #[case("tracestate", "line\nbreak")]
    fn http_headers_set_ignores_invalid(#[case] key: &str, #[case] value: &str) {
        let mut carrier = http::HeaderMap::new();
        HeaderInjector(&mut carrier).set(key, value.to_string());

        assert!(carrier.is_empty());
    }

    #[test]
    fn http_headers_get_all() {
        let mut carrier = http::HeaderMap::new();
        carrier.append("tracestate", HeaderValue::from_static("rojo=1"));
        carrier.append("tracestate", HeaderValue::from_static("congo=2"));

        let extractor = HeaderExtractor(&carrier);
        assert_eq!(
            extractor.get_all("tracestate"),
            Some(vec![Cow::Borrowed("rojo=1"), Cow::Borrowed("congo=2")])
        );
        assert_eq!(extractor.get_all("traceparent"), None);
    }

    #[test]
    fn propagate_through_header_map() {
        let mut incoming = http::HeaderMap::new();
        incoming.insert("traceparent", HeaderValue::from_static(TRACEPARENT));
        incoming.append("tracestate", HeaderValue::from_static("rojo=1"));
        incoming.append("tracestate", HeaderValue::from_static("congo=2,rojo=3"));

        let propagator = TraceContextPropagator::new();
        let cx = propagator.extract(&HeaderExtractor(&incoming)).unwrap();
        assert_eq!(cx.tracestate_header().as_deref(), Some("rojo=1,congo=2"));

        let mut outgoing = http::HeaderMap::new();
        propagator.inject(&cx, &mut HeaderInjector(&mut outgoing));
        assert_eq!(outgoing.get("traceparent").unwrap(), TRACEPARENT);
        assert_eq!(outgoing.get("tracestate").unwrap(), "rojo=1,congo=2");
    }
}
