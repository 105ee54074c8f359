//! Lowercase hex codec shared by every identifier's text form.
//!
//! The W3C Trace Context format only allows lowercase hex digits, so unlike
//! `u128::from_str_radix` this codec rejects `A-F`.
use crate::error::DecodingError;

/// Lookup table for converting a nibble into its ASCII hex digit.
const LOOKUP: &[u8; 16] = b"0123456789abcdef";

/// Writes the lowercase hex form of `bytes` into `out`.
///
/// `out` must be exactly twice as long as `bytes`.
pub(crate) fn encode_to_slice(bytes: &[u8], out: &mut [u8]) {
    debug_assert_eq!(out.len(), bytes.len() * 2, "target needs twice the space");
    for (byte, pair) in bytes.iter().zip(out.chunks_exact_mut(2)) {
        pair[0] = LOOKUP[(byte >> 4) as usize];
        pair[1] = LOOKUP[(byte & 0x0f) as usize];
    }
}

/// Returns the lowercase hex form of `bytes`.
///
/// # Examples
///
/// ```
/// assert_eq!(w3c_trace_context::hex::encode([0x00u8, 0x0a, 0xff]), "000aff");
/// ```
pub fn encode<T: AsRef<[u8]>>(bytes: T) -> String {
    let bytes = bytes.as_ref();
    let mut out = vec![0u8; bytes.len() * 2];
    encode_to_slice(bytes, &mut out);
    // Every byte written comes from `LOOKUP`, which is ASCII.
    out.into_iter().map(char::from).collect()
}

fn nibble(c: u8) -> Result<u8, DecodingError> {
    match c {
        b'0'..=b'9' => Ok(c - b'0'),
        b'a'..=b'f' => Ok(c - b'a' + 10),
        _ => Err(DecodingError::InvalidCharacter(c)),
    }
}

/// Decodes a single byte from its two-character hex form.
///
/// # Examples
///
/// ```
/// use w3c_trace_context::{hex, DecodingError};
///
/// assert_eq!(hex::decode_pair(b'0', b'a'), Ok(0x0a));
/// assert_eq!(hex::decode_pair(b'0', b'A'), Err(DecodingError::InvalidCharacter(b'A')));
/// ```
pub fn decode_pair(major: u8, minor: u8) -> Result<u8, DecodingError> {
    Ok((nibble(major)? << 4) | nibble(minor)?)
}

/// Decodes `ascii` into `target`, which must be exactly half its length.
///
/// On error the already written prefix of `target` is unspecified and the
/// buffer should be discarded.
pub fn decode_to_slice(ascii: &[u8], target: &mut [u8]) -> Result<(), DecodingError> {
    if ascii.len() != target.len() * 2 {
        return Err(DecodingError::InvalidLength {
            expected: target.len() * 2,
            actual: ascii.len(),
        });
    }

    for (pair, byte) in ascii.chunks_exact(2).zip(target.iter_mut()) {
        *byte = decode_pair(pair[0], pair[1])?;
    }

    Ok(())
}

/// Decodes hex text into a fixed-size byte array.
pub(crate) fn decode_array<const N: usize>(hex: &str) -> Result<[u8; N], DecodingError> {
    let mut bytes = [0u8; N];
    decode_to_slice(hex.as_bytes(), &mut bytes)?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn encode_uses_lowercase_digits() {
        assert_eq!(encode([0u8, 10, 20, 50, 100, 150, 200, 255]), "000a14326496c8ff");
        assert_eq!(encode([0u8; 0]), "");
    }

    #[test]
    fn decode_inverts_encode_for_every_byte() {
        let all: Vec<u8> = (0..=u8::MAX).collect();
        let text = encode(&all);
        let mut back = vec![0u8; all.len()];
        decode_to_slice(text.as_bytes(), &mut back).unwrap();
        assert_eq!(back, all);
    }

    #[rstest]
    #[case(b'0', b'0', 0x00)]
    #[case(b'0', b'9', 0x09)]
    #[case(b'a', b'f', 0xaf)]
    #[case(b'f', b'f', 0xff)]
    fn decode_pair_valid(#[case] major: u8, #[case] minor: u8, #[case] expected: u8) {
        assert_eq!(decode_pair(major, minor), Ok(expected));
    }

    #[rstest]
    #[case(b'A', b'0', b'A')]
    #[case(b'0', b'F', b'F')]
    #[case(b'g', b'0', b'g')]
    #[case(b'-', b'0', b'-')]
    #[case(b'0', b' ', b' ')]
    fn decode_pair_rejects(#[case] major: u8, #[case] minor: u8, #[case] bad: u8) {
        assert_eq!(
            decode_pair(major, minor),
            Err(DecodingError::InvalidCharacter(bad))
        );
    }

    #[test]
    fn decode_to_slice_checks_length() {
        let mut target = [0u8; 2];
        assert_eq!(
            decode_to_slice(b"abc", &mut target),
            Err(DecodingError::InvalidLength {
                expected: 4,
                actual: 3
            })
        );
    }

    #[test]
    fn decode_to_slice_reports_first_bad_character() {
        let mut target = [0u8; 3];
        assert_eq!(
            decode_to_slice(b"00zzXX", &mut target),
            Err(DecodingError::InvalidCharacter(b'z'))
        );
    }

    #[test]
    fn decode_array_fills_fixed_width() {
        assert_eq!(decode_array::<2>("beef"), Ok([0xbe, 0xef]));
        assert!(decode_array::<2>("BEEF").is_err());
    }
}
