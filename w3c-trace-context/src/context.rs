use crate::error::TraceParentError;
use crate::ids::{IdGenerator, RandomIdGenerator};
use crate::{SpanId, TraceFlags, TraceId, TraceParent, TraceState};

/// The propagated identity of one hop in a distributed trace.
///
/// Combines the `traceparent` fields with the `tracestate` list. It is a
/// plain value: cloning it gives an independent copy and nothing is shared.
///
/// Contexts that do not have the `sampled` flag set in their [`TraceFlags`]
/// will be ignored by most tracing tools.
///
/// # Examples
///
/// ```
/// use w3c_trace_context::TraceContext;
///
/// let mut cx = TraceContext::from_headers(
///     "00-0af7651916cd43dd8448eb211c80319c-b7ad6b7169203331-01",
///     Some("congo=t61rcWkgMzE"),
/// )
/// .unwrap();
///
/// cx.trace_state_mut().insert("rojo", "00f067aa0ba902b7").unwrap();
///
/// assert_eq!(
///     cx.tracestate_header().as_deref(),
///     Some("rojo=00f067aa0ba902b7,congo=t61rcWkgMzE")
/// );
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TraceContext {
    trace_id: TraceId,
    span_id: SpanId,
    trace_flags: TraceFlags,
    trace_state: TraceState,
}

impl TraceContext {
    /// Construct a new `TraceContext`
    pub fn new(
        trace_id: TraceId,
        span_id: SpanId,
        trace_flags: TraceFlags,
        trace_state: TraceState,
    ) -> Self {
        TraceContext {
            trace_id,
            span_id,
            trace_flags,
            trace_state,
        }
    }

    /// Start a new trace with random ids and an empty `TraceState`.
    pub fn new_root(trace_flags: TraceFlags) -> Self {
        TraceContext::new_root_with(&RandomIdGenerator::default(), trace_flags)
    }

    /// Start a new trace with ids from `generator`.
    pub fn new_root_with(generator: &dyn IdGenerator, trace_flags: TraceFlags) -> Self {
        TraceContext::new(
            generator.new_trace_id(),
            generator.new_span_id(),
            trace_flags,
            TraceState::default(),
        )
    }

    /// Decodes a context from the `traceparent` and optional `tracestate`
    /// header values.
    ///
    /// A bad `traceparent` fails the whole context. A bad `tracestate` never
    /// does; its invalid members are dropped.
    pub fn from_headers(
        traceparent: &str,
        tracestate: Option<&str>,
    ) -> Result<Self, TraceParentError> {
        let parent = TraceParent::parse(traceparent)?;
        let trace_state = tracestate.map(TraceState::from_header).unwrap_or_default();
        Ok(TraceContext::from_parts(&parent, trace_state))
    }

    /// Combine an already parsed `traceparent` with a `TraceState`.
    pub fn from_parts(parent: &TraceParent, trace_state: TraceState) -> Self {
        TraceContext::new(
            parent.trace_id(),
            parent.parent_id(),
            parent.trace_flags(),
            trace_state,
        )
    }

    /// The [`TraceId`] for this trace context.
    pub fn trace_id(&self) -> TraceId {
        self.trace_id
    }

    /// The [`SpanId`] of the span that made the current call.
    pub fn span_id(&self) -> SpanId {
        self.span_id
    }

    /// Returns details about the trace.
    ///
    /// Unlike `TraceState` values, these are present in all traces. The current
    /// version of W3C Trace Context only defines a single flag [`TraceFlags::SAMPLED`].
    pub fn trace_flags(&self) -> TraceFlags {
        self.trace_flags
    }

    /// A reference to the trace context's [`TraceState`].
    pub fn trace_state(&self) -> &TraceState {
        &self.trace_state
    }

    /// Mutable access to the [`TraceState`], e.g. to record this vendor's entry.
    pub fn trace_state_mut(&mut self) -> &mut TraceState {
        &mut self.trace_state
    }

    /// Returns `true` if the trace context has a valid (non-zero) `trace_id` and a
    /// valid (non-zero) `span_id`.
    pub fn is_valid(&self) -> bool {
        self.trace_id.is_valid() && self.span_id.is_valid()
    }

    /// Returns `true` if the `sampled` trace flag is set.
    pub fn is_sampled(&self) -> bool {
        self.trace_flags.is_sampled()
    }

    /// Replace the span id, e.g. before calling the next service.
    pub fn set_span_id(&mut self, span_id: SpanId) {
        self.span_id = span_id;
    }

    /// Replace the trace flags.
    pub fn set_trace_flags(&mut self, trace_flags: TraceFlags) {
        self.trace_flags = trace_flags;
    }

    /// Set or clear the `sampled` flag, keeping all other bits.
    pub fn set_sampled(&mut self, sampled: bool) {
        self.trace_flags = self.trace_flags.with_sampled(sampled);
    }

    /// A copy of this context for an outbound call, with a fresh random
    /// span id.
    pub fn new_child(&self) -> Self {
        self.new_child_with(&RandomIdGenerator::default())
    }

    /// Like [`TraceContext::new_child`] with the span id taken from `generator`.
    pub fn new_child_with(&self, generator: &dyn IdGenerator) -> Self {
        let mut child = self.clone();
        child.span_id = generator.new_span_id();
        child
    }

    /// The `traceparent` fields of this context, as version `00`.
    pub fn trace_parent(&self) -> TraceParent {
        TraceParent::new(self.trace_id, self.span_id, self.trace_flags)
    }

    /// Renders the `traceparent` header value.
    pub fn traceparent_header(&self) -> String {
        self.trace_parent().to_header()
    }

    /// Renders the `tracestate` header value, or `None` when the header
    /// should be omitted.
    pub fn tracestate_header(&self) -> Option<String> {
        self.trace_state.header()
    }
}
