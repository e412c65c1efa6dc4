//! Byte-level value decoders
//!
//! The controller bus packs temperatures and small signed decimals into
//! single bytes. These helpers turn one raw byte into the value the operator
//! would type when searching for it.

const HALF_BIT: u8 = 0b0000_0001;
const OFFSET_BIT: u8 = 0b0100_0000;
const SIGN_BIT: u8 = 0b1000_0000;

/// Offset applied to temperatures encoded in the low range
const LOW_RANGE_OFFSET: f64 = 30.0;

/// Decode a temperature byte
///
/// Layout: bit0 adds 0.5, bits 1-5 hold the integer magnitude, bit6 adds 2,
/// bit7 negates the result. When `low_range` is set, 30 is subtracted from
/// the magnitude before the sign is applied.
pub fn decode_temperature(byte: u8, low_range: bool) -> f64 {
    let mut magnitude = f64::from((byte >> 1) & 0x1F);

    if byte & OFFSET_BIT != 0 {
        magnitude += 2.0;
    }
    if low_range {
        magnitude -= LOW_RANGE_OFFSET;
    }
    if byte & HALF_BIT != 0 {
        magnitude += 0.5;
    }

    if byte & SIGN_BIT != 0 {
        -magnitude
    } else {
        magnitude
    }
}

/// Decode a signed decimal byte
///
/// Layout: bit0 adds 0.5, bits 1-6 hold the integer magnitude, bit7 negates.
pub fn decode_decimal(byte: u8) -> f64 {
    let mut magnitude = f64::from((byte >> 1) & 0x3F);

    if byte & HALF_BIT != 0 {
        magnitude += 0.5;
    }

    if byte & SIGN_BIT != 0 {
        -magnitude
    } else {
        magnitude
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temperature_zero() {
        assert_eq!(decode_temperature(0x00, false), 0.0);
    }

    #[test]
    fn test_temperature_half_and_integer() {
        // 0x2A = 0b0010_1010 -> 21
        assert_eq!(decode_temperature(0x2A, false), 21.0);
        // 0x2B adds the half bit
        assert_eq!(decode_temperature(0x2B, false), 21.5);
    }

    #[test]
    fn test_temperature_offset_bit_adds_two() {
        for byte in [0x00u8, 0x02, 0x2A, 0x3F] {
            let base = decode_temperature(byte, false);
            let with_offset = decode_temperature(byte | OFFSET_BIT, false);
            assert_eq!(with_offset - base, 2.0, "byte {:#04x}", byte);
        }
    }

    #[test]
    fn test_temperature_low_range_subtracts_thirty() {
        assert_eq!(decode_temperature(0x2A, true), -9.0);
        assert_eq!(decode_temperature(0x00, true), -30.0);
    }

    #[test]
    fn test_temperature_sign_negates_final_magnitude() {
        // 21 + 2 (offset) = 23, negated
        assert_eq!(decode_temperature(0x2A | OFFSET_BIT | SIGN_BIT, false), -23.0);
        // (21 - 30) = -9, negated
        assert_eq!(decode_temperature(0x2A | SIGN_BIT, true), 9.0);
        assert_eq!(decode_temperature(0x2B | SIGN_BIT, false), -21.5);
    }

    #[test]
    fn test_decimal_negative_with_half() {
        assert_eq!(decode_decimal(0b1000_1011), -5.5);
    }

    #[test]
    fn test_decimal_uses_six_magnitude_bits() {
        // bits 1-6 all set -> 63
        assert_eq!(decode_decimal(0b0111_1110), 63.0);
        assert_eq!(decode_decimal(0b0111_1111), 63.5);
        assert_eq!(decode_decimal(0x00), 0.0);
    }
}
