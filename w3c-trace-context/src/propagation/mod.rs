//! # Trace context propagation
//!
//! The codecs only deal with header values. Moving those values in and out
//! of a request goes through two carrier traits, so the same
//! [`TraceContextPropagator`] works for HTTP header maps, plain maps and the
//! environment of a child process:
//!
//! - [`Extractor`] looks up header values on the receiving side.
//! - [`Injector`] stores header values on the sending side.
//!
//! Header names are case-insensitive. Carriers that store names verbatim
//! normalise them: `HashMap<String, String>` keeps lowercase names and the
//! environment carriers in [`env`] use `TRACEPARENT`/`TRACESTATE`.
use std::borrow::Cow;
use std::collections::HashMap;
use std::hash::BuildHasher;

pub mod env;
mod trace_context;

pub use env::EnvExtractor;
pub use trace_context::{TraceContextPropagator, TRACEPARENT_HEADER, TRACESTATE_HEADER};

/// Stores outgoing header values in a carrier.
pub trait Injector {
    /// Store `value` under the header `key`, replacing any earlier value.
    fn set(&mut self, key: &str, value: String);

    /// Called before `additional` headers are set. Carriers that can
    /// preallocate may override it.
    #[allow(unused_variables)]
    fn reserve(&mut self, additional: usize) {}
}

/// Reads incoming header values from a carrier.
pub trait Extractor {
    /// The value of the header `key`. When the header occurs more than once
    /// carriers return one of its values.
    fn get(&self, key: &str) -> Option<Cow<'_, str>>;

    /// Names of all headers in the carrier.
    fn keys(&self) -> Vec<Cow<'_, str>>;

    /// Every value of the header `key`, in carrier order.
    ///
    /// `tracestate` may be split over several header lines, so carriers that
    /// can hold repeated headers should override this.
    fn get_all(&self, key: &str) -> Option<Vec<Cow<'_, str>>> {
        self.get(key).map(|value| vec![value])
    }
}

impl<S: BuildHasher> Injector for HashMap<String, String, S> {
    fn set(&mut self, key: &str, value: String) {
        self.insert(key.to_ascii_lowercase(), value);
    }

    fn reserve(&mut self, additional: usize) {
        HashMap::reserve(self, additional);
    }
}

impl<S: BuildHasher> Extractor for HashMap<String, String, S> {
    fn get(&self, key: &str) -> Option<Cow<'_, str>> {
        HashMap::get(self, &key.to_ascii_lowercase()).map(|value| Cow::Borrowed(value.as_str()))
    }

    fn keys(&self) -> Vec<Cow<'_, str>> {
        HashMap::keys(self).map(|key| Cow::Borrowed(key.as_str())).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRACEPARENT: &str = "00-0af7651916cd43dd8448eb211c80319c-b7ad6b7169203331-01";

    #[test]
    fn hash_map_normalises_header_names() {
        let mut carrier: HashMap<String, String> = HashMap::new();
        carrier.set("TraceParent", TRACEPARENT.to_string());

        assert_eq!(carrier.get("traceparent").map(String::as_str), Some(TRACEPARENT));
        assert_eq!(
            Extractor::get(&carrier, "TRACEPARENT"),
            Some(Cow::Borrowed(TRACEPARENT))
        );
        assert_eq!(Extractor::keys(&carrier), vec![Cow::Borrowed("traceparent")]);
    }

    #[test]
    fn hash_map_holds_one_line_per_header() {
        let mut carrier: HashMap<String, String> = HashMap::new();
        carrier.set("tracestate", "rojo=1".to_string());
        carrier.set("tracestate", "congo=2".to_string());

        assert_eq!(
            Extractor::get_all(&carrier, "tracestate"),
            Some(vec![Cow::Borrowed("congo=2")])
        );
        assert_eq!(Extractor::get_all(&carrier, "traceparent"), None);
    }
}
