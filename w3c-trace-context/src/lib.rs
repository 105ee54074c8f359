//! Encoding and decoding of the [W3C Trace Context] headers.
//!
//! A distributed trace crosses process boundaries in two HTTP headers:
//!
//! * `traceparent` carries the version, the [`TraceId`], the id of the calling
//!   span ([`SpanId`]) and the [`TraceFlags`], for example
//!   `00-0af7651916cd43dd8448eb211c80319c-b7ad6b7169203331-01`.
//! * `tracestate` carries an ordered list of vendor specific `key=value`
//!   members, for example `rojo=00f067aa0ba902b7,congo=t61rcWkgMzE`.
//!
//! [`TraceParent`] and [`TraceState`] are the codecs for these two headers and
//! [`TraceContext`] combines them into the identity of one hop. The
//! [`propagation`] module moves a context in and out of arbitrary carriers.
//!
//! # Getting Started
//!
//! ```
//! use std::collections::HashMap;
//! use w3c_trace_context::propagation::TraceContextPropagator;
//!
//! let propagator = TraceContextPropagator::new();
//!
//! // Incoming request headers
//! let mut incoming = HashMap::new();
//! incoming.insert(
//!     "traceparent".to_string(),
//!     "00-0af7651916cd43dd8448eb211c80319c-b7ad6b7169203331-01".to_string(),
//! );
//! incoming.insert("tracestate".to_string(), "congo=t61rcWkgMzE".to_string());
//!
//! let parent = propagator.extract(&incoming).expect("valid traceparent");
//!
//! // Record our own entry and call the next service with a fresh span id
//! let mut child = parent.new_child();
//! child.trace_state_mut().insert("rojo", "00f067aa0ba902b7").unwrap();
//!
//! let mut outgoing: HashMap<String, String> = HashMap::new();
//! propagator.inject(&child, &mut outgoing);
//!
//! assert_eq!(outgoing["tracestate"], "rojo=00f067aa0ba902b7,congo=t61rcWkgMzE");
//! ```
//!
//! # Crate Feature Flags
//!
//! * `internal-logs` (enabled by default): emits `tracing` events when
//!   headers are rejected or shortened.
//! * `serde`: `Serialize` and `Deserialize` for the id and flag types as hex
//!   strings.
//!
//! [W3C Trace Context]: https://www.w3.org/TR/trace-context/
#![warn(
    future_incompatible,
    missing_debug_implementations,
    missing_docs,
    nonstandard_style,
    rust_2018_idioms,
    unreachable_pub,
    unused
)]
#![cfg_attr(
    docsrs,
    feature(doc_cfg, doc_auto_cfg),
    deny(rustdoc::broken_intra_doc_links)
)]

mod internal_logging;

pub mod hex;
pub mod propagation;

mod context;
mod error;
mod ids;
mod trace_parent;
mod trace_state;

pub use context::TraceContext;
pub use error::{DecodingError, Error, Result, TraceParentError, TraceStateError};
pub use ids::{IdGenerator, RandomIdGenerator, SpanId, TraceFlags, TraceId};
pub use trace_parent::{TraceParent, SUPPORTED_VERSION};
pub use trace_state::{TraceState, MAX_LIST_MEMBERS};

#[cfg(feature = "internal-logs")]
#[doc(hidden)]
pub mod _private {
    pub use tracing::{debug, warn};
}
