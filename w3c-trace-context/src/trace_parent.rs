use crate::error::TraceParentError;
use crate::hex;
use crate::{SpanId, TraceFlags, TraceId};
use std::fmt;
use std::str::FromStr;

/// The only `traceparent` version this crate emits.
pub const SUPPORTED_VERSION: u8 = 0;
const INVALID_VERSION: u8 = 0xff;

const VERSION_LEN: usize = 2;
const TRACE_ID_LEN: usize = 32;
const PARENT_ID_LEN: usize = 16;
const TRACE_FLAGS_LEN: usize = 2;

/// The decoded value of a `traceparent` header.
///
/// The header identifies the incoming request in a tracing system. It has
/// four fields:
///
///    - version
///    - trace-id
///    - parent-id
///    - trace-flags
///
/// For example `00-0af7651916cd43dd8448eb211c80319c-b7ad6b7169203331-01`.
///
/// Headers of a future version may carry more fields after the flags. Those
/// are kept verbatim in [`TraceParent::extension`] but never interpreted, and
/// the header is always written back as version `00`.
///
/// [W3C TraceContext]: https://www.w3.org/TR/trace-context/#traceparent-header
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TraceParent {
    version: u8,
    trace_id: TraceId,
    parent_id: SpanId,
    trace_flags: TraceFlags,
    extension: Option<String>,
}

impl TraceParent {
    /// Construct a version `00` trace parent.
    pub fn new(trace_id: TraceId, parent_id: SpanId, trace_flags: TraceFlags) -> Self {
        TraceParent {
            version: SUPPORTED_VERSION,
            trace_id,
            parent_id,
            trace_flags,
            extension: None,
        }
    }

    /// Parses a `traceparent` header value.
    ///
    /// Optional whitespace around the value is ignored. Everything else is
    /// strict; any invalid field rejects the whole header.
    ///
    /// # Examples
    ///
    /// ```
    /// use w3c_trace_context::{TraceParent, TraceParentError};
    ///
    /// let parent = TraceParent::parse("00-0af7651916cd43dd8448eb211c80319c-b7ad6b7169203331-01").unwrap();
    /// assert!(parent.trace_flags().is_sampled());
    ///
    /// assert_eq!(
    ///     TraceParent::parse("00-0af7651916cd43dd8448eb211c80319c-b7ad6b7169203331"),
    ///     Err(TraceParentError::MalformedHeader)
    /// );
    /// ```
    pub fn parse(header: &str) -> Result<Self, TraceParentError> {
        let header = header.trim_matches(|c| c == ' ' || c == '\t');
        let mut fields = header.splitn(5, '-');
        let (Some(version), Some(trace_id), Some(parent_id), Some(trace_flags)) =
            (fields.next(), fields.next(), fields.next(), fields.next())
        else {
            return Err(TraceParentError::MalformedHeader);
        };
        let rest = fields.next();

        if version.len() != VERSION_LEN
            || trace_id.len() != TRACE_ID_LEN
            || parent_id.len() != PARENT_ID_LEN
            || trace_flags.len() != TRACE_FLAGS_LEN
        {
            return Err(TraceParentError::MalformedHeader);
        }

        let version_bytes = version.as_bytes();
        let version = hex::decode_pair(version_bytes[0], version_bytes[1])?;
        if version == INVALID_VERSION {
            return Err(TraceParentError::InvalidVersion(version));
        }
        // For version 0 there must be exactly 4 fields.
        if version == SUPPORTED_VERSION && rest.is_some() {
            return Err(TraceParentError::MalformedHeader);
        }

        let trace_id = TraceId::from_hex(trace_id)?;
        let parent_id = SpanId::from_hex(parent_id)?;
        if !trace_id.is_valid() || !parent_id.is_valid() {
            return Err(TraceParentError::InvalidIdentifier);
        }

        let trace_flags = TraceFlags::from_hex(trace_flags)?;

        Ok(TraceParent {
            version,
            trace_id,
            parent_id,
            trace_flags,
            extension: rest.filter(|rest| !rest.is_empty()).map(str::to_owned),
        })
    }

    /// The version of the header this value was parsed from.
    pub fn version(&self) -> u8 {
        self.version
    }

    /// The trace id.
    pub fn trace_id(&self) -> TraceId {
        self.trace_id
    }

    /// The id of the calling span.
    pub fn parent_id(&self) -> SpanId {
        self.parent_id
    }

    /// The trace flags, including any reserved bits that were set.
    pub fn trace_flags(&self) -> TraceFlags {
        self.trace_flags
    }

    /// Fields following the flags in a header of a future version.
    pub fn extension(&self) -> Option<&str> {
        self.extension.as_deref()
    }

    /// Renders the header value, always as version `00`.
    pub fn to_header(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for TraceParent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02x}-{}-{}-{:02x}",
            SUPPORTED_VERSION, self.trace_id, self.parent_id, self.trace_flags
        )
    }
}

impl FromStr for TraceParent {
    type Err = TraceParentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TraceParent::parse(s)
    }
}
