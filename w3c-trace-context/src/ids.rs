use crate::error::DecodingError;
use crate::hex;
use rand::RngCore;
use std::fmt;
use std::ops::{BitAnd, BitOr, Not};
use std::str::FromStr;

/// Flags that can be set on a `TraceContext`.
///
/// The current version of W3C Trace Context only defines a single flag
/// [`TraceFlags::SAMPLED`]. All other bits are reserved; they are kept as-is
/// so that a parsed value serializes back unchanged.
///
/// See the W3C TraceContext specification's [trace-flags] section for more
/// details.
///
/// [trace-flags]: https://www.w3.org/TR/trace-context/#trace-flags
#[derive(Clone, Debug, Default, PartialEq, Eq, Copy, Hash)]
pub struct TraceFlags(u8);

impl TraceFlags {
    /// Trace flags with the `sampled` flag set to `0`.
    ///
    /// Spans that are not sampled will be ignored by most tracing tools.
    /// See the `sampled` section of the [W3C TraceContext specification] for details.
    ///
    /// [W3C TraceContext specification]: https://www.w3.org/TR/trace-context/#sampled-flag
    pub const NOT_SAMPLED: TraceFlags = TraceFlags(0x00);

    /// Trace flags with the `sampled` flag set to `1`.
    ///
    /// Spans that are not sampled will be ignored by most tracing tools.
    /// See the `sampled` section of the [W3C TraceContext specification] for details.
    ///
    /// [W3C TraceContext specification]: https://www.w3.org/TR/trace-context/#sampled-flag
    pub const SAMPLED: TraceFlags = TraceFlags(0x01);

    /// Construct new trace flags
    pub const fn new(flags: u8) -> Self {
        TraceFlags(flags)
    }

    /// Returns `true` if the `sampled` flag is set
    pub fn is_sampled(&self) -> bool {
        (*self & TraceFlags::SAMPLED) == TraceFlags::SAMPLED
    }

    /// Returns copy of the current flags with the `sampled` flag set.
    pub fn with_sampled(&self, sampled: bool) -> Self {
        if sampled {
            *self | TraceFlags::SAMPLED
        } else {
            *self & !TraceFlags::SAMPLED
        }
    }

    /// Returns the flags as a `u8`
    pub fn to_u8(self) -> u8 {
        self.0
    }

    /// Decodes flags from exactly two lowercase hex characters.
    ///
    /// Every bit pattern is accepted.
    pub fn from_hex(hex: &str) -> Result<Self, DecodingError> {
        hex::decode_array::<1>(hex).map(|[flags]| TraceFlags(flags))
    }

    /// Two lowercase hex characters, as used in the `traceparent` header.
    pub fn to_hex(self) -> String {
        hex::encode([self.0])
    }
}

impl BitAnd for TraceFlags {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        Self(self.0 & rhs.0)
    }
}

impl BitOr for TraceFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl Not for TraceFlags {
    type Output = Self;

    fn not(self) -> Self::Output {
        Self(!self.0)
    }
}

impl fmt::LowerHex for TraceFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

impl FromStr for TraceFlags {
    type Err = DecodingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TraceFlags::from_hex(s)
    }
}

/// A 16-byte value which identifies a given trace.
///
/// The id is valid if it contains at least one non-zero byte. An all-zero id
/// can be constructed but is never accepted from a `traceparent` header.
///
/// [W3C TraceContext: trace-id](https://www.w3.org/TR/trace-context/#trace-id)
#[derive(Clone, PartialEq, Eq, Copy, Hash, PartialOrd, Ord)]
pub struct TraceId([u8; 16]);

impl TraceId {
    /// Invalid trace id
    pub const INVALID: TraceId = TraceId([0; 16]);

    /// Create a trace id from its representation as a byte array.
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        TraceId(bytes)
    }

    /// Create a trace id from a big-endian `u128`.
    pub const fn from_u128(value: u128) -> Self {
        TraceId(value.to_be_bytes())
    }

    /// Return the representation of this trace id as a byte array.
    pub const fn to_bytes(self) -> [u8; 16] {
        self.0
    }

    /// Borrow the 16 bytes making up this trace id.
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Replace all 16 bytes of this trace id.
    pub fn set_bytes(&mut self, bytes: [u8; 16]) {
        self.0 = bytes;
    }

    /// Gives `f` scoped, mutable access to the bytes of this trace id.
    pub fn with_bytes_mut<R>(&mut self, f: impl FnOnce(&mut [u8; 16]) -> R) -> R {
        f(&mut self.0)
    }

    /// Returns `true` unless every byte is zero.
    pub fn is_valid(&self) -> bool {
        *self != TraceId::INVALID
    }

    /// Create a random trace id from two `u64` words of `rng`, stored
    /// big-endian.
    pub fn random_with<R: RngCore + ?Sized>(rng: &mut R) -> Self {
        let mut bytes = [0u8; 16];
        bytes[..8].copy_from_slice(&rng.next_u64().to_be_bytes());
        bytes[8..].copy_from_slice(&rng.next_u64().to_be_bytes());
        TraceId(bytes)
    }

    /// Create a random trace id using the thread-local cryptographically
    /// secure generator.
    pub fn random() -> Self {
        TraceId::random_with(&mut rand::rng())
    }

    /// Converts 32 lowercase hex characters to a trace id.
    ///
    /// # Examples
    ///
    /// ```
    /// use w3c_trace_context::TraceId;
    ///
    /// assert!(TraceId::from_hex("58406520a006649127e371903a2de979").is_ok());
    ///
    /// assert!(TraceId::from_hex("42").is_err());
    /// assert!(TraceId::from_hex("58406520A006649127E371903A2DE979").is_err());
    /// ```
    pub fn from_hex(hex: &str) -> Result<Self, DecodingError> {
        hex::decode_array(hex).map(TraceId)
    }

    /// The 32 character lowercase hex form used in `traceparent`.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    fn write_hex(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut buf = [0u8; 32];
        hex::encode_to_slice(&self.0, &mut buf);
        buf.iter().try_for_each(|&c| fmt::Write::write_char(f, char::from(c)))
    }
}

impl From<[u8; 16]> for TraceId {
    fn from(bytes: [u8; 16]) -> Self {
        TraceId(bytes)
    }
}

impl From<u128> for TraceId {
    fn from(value: u128) -> Self {
        TraceId::from_u128(value)
    }
}

impl FromStr for TraceId {
    type Err = DecodingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TraceId::from_hex(s)
    }
}

impl fmt::Debug for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_hex(f)
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_hex(f)
    }
}

impl fmt::LowerHex for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&u128::from_be_bytes(self.0), f)
    }
}

/// An 8-byte value which identifies a given span.
///
/// The id is valid if it contains at least one non-zero byte.
///
/// [W3C TraceContext: parent-id](https://www.w3.org/TR/trace-context/#parent-id)
#[derive(Clone, PartialEq, Eq, Copy, Hash, PartialOrd, Ord)]
pub struct SpanId([u8; 8]);

impl SpanId {
    /// Invalid span id
    pub const INVALID: SpanId = SpanId([0; 8]);

    /// Create a span id from its representation as a byte array.
    pub const fn from_bytes(bytes: [u8; 8]) -> Self {
        SpanId(bytes)
    }

    /// Create a span id from a big-endian `u64`.
    pub const fn from_u64(value: u64) -> Self {
        SpanId(value.to_be_bytes())
    }

    /// Return the representation of this span id as a byte array.
    pub const fn to_bytes(self) -> [u8; 8] {
        self.0
    }

    /// Borrow the 8 bytes making up this span id.
    pub fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }

    /// Replace all 8 bytes of this span id.
    pub fn set_bytes(&mut self, bytes: [u8; 8]) {
        self.0 = bytes;
    }

    /// Gives `f` scoped, mutable access to the bytes of this span id.
    pub fn with_bytes_mut<R>(&mut self, f: impl FnOnce(&mut [u8; 8]) -> R) -> R {
        f(&mut self.0)
    }

    /// Returns `true` unless every byte is zero.
    pub fn is_valid(&self) -> bool {
        *self != SpanId::INVALID
    }

    /// Create a random span id from one `u64` word of `rng`, stored
    /// big-endian.
    pub fn random_with<R: RngCore + ?Sized>(rng: &mut R) -> Self {
        SpanId(rng.next_u64().to_be_bytes())
    }

    /// Create a random span id using the thread-local cryptographically
    /// secure generator.
    pub fn random() -> Self {
        SpanId::random_with(&mut rand::rng())
    }

    /// Converts 16 lowercase hex characters to a span id.
    ///
    /// # Examples
    ///
    /// ```
    /// use w3c_trace_context::SpanId;
    ///
    /// assert!(SpanId::from_hex("58406520a0066491").is_ok());
    ///
    /// assert!(SpanId::from_hex("not_hex").is_err());
    /// ```
    pub fn from_hex(hex: &str) -> Result<Self, DecodingError> {
        hex::decode_array(hex).map(SpanId)
    }

    /// The 16 character lowercase hex form used in `traceparent`.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    fn write_hex(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut buf = [0u8; 16];
        hex::encode_to_slice(&self.0, &mut buf);
        buf.iter().try_for_each(|&c| fmt::Write::write_char(f, char::from(c)))
    }
}

impl From<[u8; 8]> for SpanId {
    fn from(bytes: [u8; 8]) -> Self {
        SpanId(bytes)
    }
}

impl From<u64> for SpanId {
    fn from(value: u64) -> Self {
        SpanId::from_u64(value)
    }
}

impl FromStr for SpanId {
    type Err = DecodingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SpanId::from_hex(s)
    }
}

impl fmt::Debug for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_hex(f)
    }
}

impl fmt::Display for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_hex(f)
    }
}

impl fmt::LowerHex for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&u64::from_be_bytes(self.0), f)
    }
}

/// Interface for generating IDs
pub trait IdGenerator: Send + Sync + fmt::Debug {
    /// Generate a new `TraceId`
    fn new_trace_id(&self) -> TraceId;

    /// Generate a new `SpanId`
    fn new_span_id(&self) -> SpanId;
}

/// Default [`IdGenerator`] implementation.
///
/// Generates Trace and Span ids using the thread-local random number
/// generator, drawing again in the unlikely case of an all-zero id.
#[derive(Clone, Debug, Default)]
pub struct RandomIdGenerator {
    _private: (),
}

impl RandomIdGenerator {
    /// Create a new `RandomIdGenerator`.
    pub fn new() -> Self {
        RandomIdGenerator { _private: () }
    }
}

impl IdGenerator for RandomIdGenerator {
    fn new_trace_id(&self) -> TraceId {
        let mut rng = rand::rng();
        loop {
            let id = TraceId::random_with(&mut rng);
            if id.is_valid() {
                return id;
            }
        }
    }

    fn new_span_id(&self) -> SpanId {
        let mut rng = rand::rng();
        loop {
            let id = SpanId::random_with(&mut rng);
            if id.is_valid() {
                return id;
            }
        }
    }
}

#[cfg(feature = "serde")]
mod serialize {
    use super::{SpanId, TraceFlags, TraceId};
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    impl Serialize for TraceId {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.collect_str(self)
        }
    }

    impl<'de> Deserialize<'de> for TraceId {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            let hex = String::deserialize(deserializer)?;
            TraceId::from_hex(&hex).map_err(D::Error::custom)
        }
    }

    impl Serialize for SpanId {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.collect_str(self)
        }
    }

    impl<'de> Deserialize<'de> for SpanId {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            let hex = String::deserialize(deserializer)?;
            SpanId::from_hex(&hex).map_err(D::Error::custom)
        }
    }

    impl Serialize for TraceFlags {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.serialize_str(&self.to_hex())
        }
    }

    impl<'de> Deserialize<'de> for TraceFlags {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            let hex = String::deserialize(deserializer)?;
            TraceFlags::from_hex(&hex).map_err(D::Error::custom)
        }
    }
}
