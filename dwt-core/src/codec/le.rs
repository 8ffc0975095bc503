use crate::error::{DwtError, Result};

#[inline]
pub fn u16le(n: u16) -> [u8; 2] {
    n.to_le_bytes()
}

#[inline]
pub fn u32le(n: u32) -> [u8; 4] {
    n.to_le_bytes()
}

/// Keeps only the low 16 bits.
#[inline]
pub fn u16le_lossy(n: u64) -> [u8; 2] {
    u16le((n & 0xFFFF) as u16)
}

/// Keeps only the low 32 bits.
#[inline]
pub fn u32le_lossy(n: u64) -> [u8; 4] {
    u32le((n & 0xFFFF_FFFF) as u32)
}

fn whole_number(n: f64) -> Result<u64> {
    if !n.is_finite() || n < 0.0 || n.fract() != 0.0 {
        return Err(DwtError::InvalidInput(format!(
            "expected a non-negative integer, got {n}"
        )));
    }
    // Saturates above u64::MAX; the lossy encoders then keep the low bits.
    Ok(n as u64)
}

/// Encoder for untyped numbers (JSON, user input). Rejects negative and
/// fractional values; oversized values are truncated like `u16le_lossy`.
pub fn u16le_checked(n: f64) -> Result<[u8; 2]> {
    whole_number(n).map(u16le_lossy)
}

pub fn u32le_checked(n: f64) -> Result<[u8; 4]> {
    whole_number(n).map(u32le_lossy)
}

/// Narrow an in-memory length/offset to a 16-bit header field.
pub fn field_u16(n: usize, what: &str) -> Result<u16> {
    u16::try_from(n)
        .map_err(|_| DwtError::InvalidInput(format!("{what} {n} does not fit in 16 bits")))
}

/// Narrow an in-memory length/offset to a 32-bit header field.
pub fn field_u32(n: usize, what: &str) -> Result<u32> {
    u32::try_from(n)
        .map_err(|_| DwtError::InvalidInput(format!("{what} {n} does not fit in 32 bits")))
}

#[inline]
pub fn read_u16le(x: &[u8]) -> u16 {
    u16::from_le_bytes([x[0], x[1]])
}

#[inline]
pub fn read_u32le(x: &[u8]) -> u32 {
    u32::from_le_bytes([x[0], x[1], x[2], x[3]])
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn byte_order() {
        assert_eq!(u16le(0x0201), [0x01, 0x02]);
        assert_eq!(u32le(0x0605_4B50), [0x50, 0x4B, 0x05, 0x06]);
    }

    #[test]
    fn lossy_keeps_low_bits() {
        assert_eq!(u16le_lossy(0x1_0001), [0x01, 0x00]);
        assert_eq!(u32le_lossy(0x1_0000_0002), [0x02, 0, 0, 0]);
    }

    #[test]
    fn checked_rejects_bad_numbers() {
        assert!(matches!(u16le_checked(-1.0), Err(DwtError::InvalidInput(_))));
        assert!(matches!(u32le_checked(1.5), Err(DwtError::InvalidInput(_))));
        assert!(matches!(u32le_checked(f64::NAN), Err(DwtError::InvalidInput(_))));
        assert!(matches!(u32le_checked(f64::INFINITY), Err(DwtError::InvalidInput(_))));
        assert_eq!(u16le_checked(513.0).unwrap(), [0x01, 0x02]);
        assert_eq!(u16le_checked(65_537.0).unwrap(), [0x01, 0x00]);
    }

    #[test]
    fn field_overflow() {
        assert_eq!(field_u16(65_535, "name length").unwrap(), u16::MAX);
        assert!(matches!(
            field_u16(65_536, "name length"),
            Err(DwtError::InvalidInput(_))
        ));
        assert!(field_u32(usize::MAX, "offset").is_err() || usize::BITS == 32);
    }

    proptest! {
        #[test]
        fn u16_round_trip(n in any::<u16>()) {
            prop_assert_eq!(read_u16le(&u16le(n)), n);
        }

        #[test]
        fn u32_round_trip(n in any::<u32>()) {
            prop_assert_eq!(read_u32le(&u32le(n)), n);
        }
    }
}
