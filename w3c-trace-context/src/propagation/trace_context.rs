//! # W3C Trace Context Propagator
//!
use std::iter::Copied;
use std::slice;

use super::{Extractor, Injector};
use crate::{tc_debug, TraceContext, TraceParent, TraceState};

/// Name of the header carrying the trace parent.
pub const TRACEPARENT_HEADER: &str = "traceparent";
/// Name of the header carrying the vendor trace state.
pub const TRACESTATE_HEADER: &str = "tracestate";

// Vendors must propagate at least this many bytes of `tracestate`.
const DEFAULT_MAX_TRACE_STATE_LEN: usize = 512;

static TRACE_CONTEXT_HEADER_FIELDS: [&str; 2] = [TRACEPARENT_HEADER, TRACESTATE_HEADER];

/// Propagates [`TraceContext`]s in [W3C TraceContext] format under `traceparent` and `tracestate` header.
///
/// The `traceparent` header represents the incoming request in a
/// tracing system in a common format, understood by all vendors.
/// Here's an example of a `traceparent` header.
///
/// `traceparent: 00-0af7651916cd43dd8448eb211c80319c-b7ad6b7169203331-01`
///
/// The `tracestate` header provides additional vendor-specific trace
/// identification information across different distributed tracing systems.
/// Here's an example of a `tracestate` header
///
/// `tracestate: vendorname1=opaqueValue1,vendorname2=opaqueValue2`
///
/// An invalid `traceparent` means there is no context to extract, and the
/// `tracestate` header is then ignored as well. An invalid `tracestate` only
/// loses its invalid members.
///
/// See the [w3c trace-context docs] for more details.
///
/// [w3c trace-context docs]: https://w3c.github.io/trace-context/
/// [W3C TraceContext]: https://www.w3.org/TR/trace-context/
#[derive(Clone, Debug)]
pub struct TraceContextPropagator {
    max_trace_state_len: usize,
}

impl Default for TraceContextPropagator {
    fn default() -> Self {
        TraceContextPropagator {
            max_trace_state_len: DEFAULT_MAX_TRACE_STATE_LEN,
        }
    }
}

impl TraceContextPropagator {
    /// Create a new `TraceContextPropagator`.
    pub fn new() -> Self {
        TraceContextPropagator::default()
    }

    /// Bound the length of injected `tracestate` headers.
    ///
    /// Longer headers are shortened with [`TraceState::header_with_max_len`].
    /// Defaults to 512.
    pub fn with_max_trace_state_len(mut self, max_len: usize) -> Self {
        self.max_trace_state_len = max_len;
        self
    }

    /// Extract trace context from w3c trace-context headers.
    ///
    /// Returns `None` if there is no `traceparent` header or it is invalid.
    pub fn extract(&self, extractor: &dyn Extractor) -> Option<TraceContext> {
        let header_value = extractor.get(TRACEPARENT_HEADER)?;
        let parent = match TraceParent::parse(&header_value) {
            Ok(parent) => parent,
            Err(err) => {
                tc_debug!(
                    name: "TraceContextPropagator.Extract.InvalidTraceParent",
                    error = err.to_string().as_str(),
                );
                return None;
            }
        };

        // A header repeated in the carrier is one comma separated list.
        let trace_state = extractor
            .get_all(TRACESTATE_HEADER)
            .map(|lines| TraceState::from_header(&lines.join(",")))
            .unwrap_or_default();

        Some(TraceContext::from_parts(&parent, trace_state))
    }

    /// Properly encodes the values of the [`TraceContext`] and injects them
    /// into the `Injector`.
    ///
    /// Nothing is written for an invalid context, and `tracestate` is left out
    /// when it has no members.
    pub fn inject(&self, cx: &TraceContext, injector: &mut dyn Injector) {
        if !cx.is_valid() {
            tc_debug!(name: "TraceContextPropagator.Inject.InvalidContext");
            return;
        }

        injector.reserve(TRACE_CONTEXT_HEADER_FIELDS.len());
        injector.set(TRACEPARENT_HEADER, cx.traceparent_header());
        if let Some(trace_state) = cx
            .trace_state()
            .header_with_max_len(self.max_trace_state_len)
        {
            injector.set(TRACESTATE_HEADER, trace_state);
        }
    }

    /// The header names this propagator reads and writes.
    pub fn fields(&self) -> Copied<slice::Iter<'static, &'static str>> {
        TRACE_CONTEXT_HEADER_FIELDS.iter().copied()
    }
}
