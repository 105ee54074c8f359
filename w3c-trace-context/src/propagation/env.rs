//! Passing a trace context to a child process.
//!
//! The parent injects into the [`Command`] it is about to spawn, which sets
//! `TRACEPARENT` and `TRACESTATE` in the child's environment. The child reads
//! them back with [`EnvExtractor`].
//!
//! ```no_run
//! use std::process::Command;
//! use w3c_trace_context::propagation::TraceContextPropagator;
//! use w3c_trace_context::{TraceContext, TraceFlags};
//!
//! let cx = TraceContext::new_root(TraceFlags::SAMPLED);
//! let mut child = Command::new("worker");
//! TraceContextPropagator::new().inject(&cx, &mut child);
//! child.spawn().unwrap();
//! ```
use std::borrow::Cow;
use std::env;
use std::process::Command;

use super::{Extractor, Injector, TRACEPARENT_HEADER, TRACESTATE_HEADER};

fn variable_name(header: &str) -> String {
    header.to_ascii_uppercase()
}

/// Reads `traceparent` and `tracestate` from the environment of the current
/// process, as `TRACEPARENT` and `TRACESTATE`.
#[derive(Debug, Default)]
pub struct EnvExtractor {
    _private: (),
}

impl EnvExtractor {
    /// Create an extractor over the current process environment.
    pub fn new() -> Self {
        EnvExtractor { _private: () }
    }
}

impl Extractor for EnvExtractor {
    /// Values that are not valid unicode are treated as missing.
    fn get(&self, key: &str) -> Option<Cow<'_, str>> {
        env::var(variable_name(key)).ok().map(Cow::Owned)
    }

    /// Only the trace context headers that are set are listed; the rest of
    /// the environment is not a header carrier.
    fn keys(&self) -> Vec<Cow<'_, str>> {
        [TRACEPARENT_HEADER, TRACESTATE_HEADER]
            .into_iter()
            .filter(|header| env::var_os(variable_name(header)).is_some())
            .map(Cow::Borrowed)
            .collect()
    }
}

/// Sets each header as an uppercase environment variable of the child.
impl Injector for Command {
    fn set(&mut self, key: &str, value: String) {
        self.env(variable_name(key), value);
    }
}
