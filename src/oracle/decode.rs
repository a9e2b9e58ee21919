//! Fixed-point cumulative-reserve buffer decoding.
//!
//! Pump state arrives as an opaque byte buffer: a 32-byte word holding the
//! data offset, a 32-byte word at that offset holding the array length, then
//! `length` consecutive 16-byte little-endian Q64.64 values. Each value is a
//! base-2 logarithm of the reserve, so decoding converts via `round(2^x)`,
//! an exponential conversion rather than a bit reinterpretation.

use crate::error::EngineError;

const WORD: usize = 32;
const VALUE_WIDTH: usize = 16;

/// Upper bound on the decoded array length; anything larger is corruption,
/// not a real pool.
const MAX_VALUES: usize = 64;

/// 2^64 as f64, for normalizing the Q64.64 fractional part.
const TWO_POW_64: f64 = 18_446_744_073_709_551_616.0;

/// Decode a cumulative-reserve buffer into unsigned reserve accumulators.
///
/// Malformed buffers (out-of-bounds offset, implausible length, truncated
/// value section) are a fatal decode error, never a silently-truncated
/// result.
pub fn decode_cumulative_reserves(data: &[u8]) -> Result<Vec<u128>, EngineError> {
    let offset = read_word(data, 0)? as usize;
    let length = read_word(data, offset)? as usize;

    if length > MAX_VALUES {
        return Err(EngineError::MalformedBuffer(format!(
            "implausible array length {length}"
        )));
    }

    let values_start = offset + WORD;
    let values_end = values_start
        .checked_add(length * VALUE_WIDTH)
        .ok_or_else(|| EngineError::MalformedBuffer("value section overflows".to_string()))?;
    if data.len() < values_end {
        return Err(EngineError::MalformedBuffer(format!(
            "buffer holds {} bytes, value section ends at {values_end}",
            data.len()
        )));
    }

    let mut reserves = Vec::with_capacity(length);
    for i in 0..length {
        let at = values_start + i * VALUE_WIDTH;
        let mut buf = [0u8; VALUE_WIDTH];
        buf.copy_from_slice(&data[at..at + VALUE_WIDTH]);
        reserves.push(q64_to_reserve(u128::from_le_bytes(buf))?);
    }
    Ok(reserves)
}

fn read_word(data: &[u8], at: usize) -> Result<u64, EngineError> {
    let end = at
        .checked_add(WORD)
        .ok_or_else(|| EngineError::MalformedBuffer("word offset overflows".to_string()))?;
    if data.len() < end {
        return Err(EngineError::MalformedBuffer(format!(
            "word at byte {at} out of bounds ({} bytes)",
            data.len()
        )));
    }

    let word = &data[at..end];
    if word[..WORD - 8].iter().any(|b| *b != 0) {
        return Err(EngineError::MalformedBuffer(format!(
            "oversized header word at byte {at}"
        )));
    }

    let mut buf = [0u8; 8];
    buf.copy_from_slice(&word[WORD - 8..]);
    Ok(u64::from_be_bytes(buf))
}

/// Convert a Q64.64 log2-encoded value into a reserve: `round(2^x)`.
fn q64_to_reserve(raw: u128) -> Result<u128, EngineError> {
    let int_part = (raw >> 64) as u32;
    if int_part >= 128 {
        return Err(EngineError::MalformedBuffer(format!(
            "exponent {int_part} exceeds reserve width"
        )));
    }

    let frac = (raw & u64::MAX as u128) as u64;
    let exponent = int_part as f64 + frac as f64 / TWO_POW_64;
    let value = exponent.exp2().round();
    if !value.is_finite() {
        return Err(EngineError::MalformedBuffer(format!(
            "exponent {exponent} does not decode to a finite reserve"
        )));
    }
    Ok(value as u128)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Assemble a buffer the way the pump emits it: offset word, length word,
    /// then 16-byte little-endian Q64.64 values.
    fn build_buffer(values: &[u128]) -> Vec<u8> {
        let mut data = Vec::new();
        let mut offset_word = [0u8; 32];
        offset_word[24..].copy_from_slice(&32u64.to_be_bytes());
        data.extend_from_slice(&offset_word);

        let mut length_word = [0u8; 32];
        length_word[24..].copy_from_slice(&(values.len() as u64).to_be_bytes());
        data.extend_from_slice(&length_word);

        for value in values {
            data.extend_from_slice(&value.to_le_bytes());
        }
        data
    }

    fn q64(int_part: u128, frac: u64) -> u128 {
        (int_part << 64) | frac as u128
    }

    #[test]
    fn test_decode_integer_exponents() {
        let data = build_buffer(&[q64(3, 0), q64(10, 0)]);
        let reserves = decode_cumulative_reserves(&data).unwrap();
        assert_eq!(reserves, vec![8, 1_024]);
    }

    #[test]
    fn test_decode_fractional_exponent() {
        // x = 0.5 -> round(2^0.5) = round(1.4142...) = 1
        let data = build_buffer(&[q64(0, 1u64 << 63)]);
        assert_eq!(decode_cumulative_reserves(&data).unwrap(), vec![1]);

        // x = 20.5 -> round(2^20.5) = round(1482910.4...) = 1482910
        let data = build_buffer(&[q64(20, 1u64 << 63)]);
        assert_eq!(decode_cumulative_reserves(&data).unwrap(), vec![1_482_910]);
    }

    #[test]
    fn test_decode_empty_array() {
        let data = build_buffer(&[]);
        assert_eq!(decode_cumulative_reserves(&data).unwrap(), Vec::<u128>::new());
    }

    #[test]
    fn test_truncated_buffer_is_fatal() {
        let mut data = build_buffer(&[q64(3, 0)]);
        data.truncate(data.len() - 1);
        assert!(matches!(
            decode_cumulative_reserves(&data),
            Err(EngineError::MalformedBuffer(_))
        ));
    }

    #[test]
    fn test_out_of_bounds_offset_is_fatal() {
        let mut data = build_buffer(&[q64(3, 0)]);
        data[24..32].copy_from_slice(&10_000u64.to_be_bytes());
        assert!(matches!(
            decode_cumulative_reserves(&data),
            Err(EngineError::MalformedBuffer(_))
        ));
    }

    #[test]
    fn test_implausible_length_is_fatal() {
        let mut data = build_buffer(&[q64(3, 0)]);
        data[56..64].copy_from_slice(&1_000u64.to_be_bytes());
        assert!(matches!(
            decode_cumulative_reserves(&data),
            Err(EngineError::MalformedBuffer(_))
        ));
    }

    #[test]
    fn test_oversized_exponent_is_fatal() {
        let data = build_buffer(&[q64(128, 0)]);
        assert!(matches!(
            decode_cumulative_reserves(&data),
            Err(EngineError::MalformedBuffer(_))
        ));
    }

    #[test]
    fn test_empty_input_is_fatal() {
        assert!(matches!(
            decode_cumulative_reserves(&[]),
            Err(EngineError::MalformedBuffer(_))
        ));
    }
}
