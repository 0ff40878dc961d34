//! A32 modified-immediate folding: an 8-bit base rotated right by an even amount.

use super::EncodeError;

/// Fold `value` into the 12-bit `rot:4 | base:8` field.
///
/// The smallest rotation wins when several encodings exist. Values with no encoding
/// are an error; the caller either splits the constant or loads it from a literal.
pub fn encode_imm(value: u32) -> Result<u32, EncodeError> {
    if value < 0x100 {
        return Ok(value);
    }
    for rot in 1..16u32 {
        let base = value.rotate_left(2 * rot);
        if base < 0x100 {
            return Ok((rot << 8) | base);
        }
    }
    Err(EncodeError::UnencodableImmediate { value })
}

#[inline]
pub fn is_encodable(value: u32) -> bool {
    encode_imm(value).is_ok()
}

/// Value represented by a 12-bit immediate field.
#[inline]
pub fn decode_imm(field: u32) -> u32 {
    let rot = (field >> 8) & 0xF;
    (field & 0xFF).rotate_right(2 * rot)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smallest_rotation_is_chosen() {
        assert_eq!(encode_imm(0x1200).unwrap(), 0xc12);
        assert_eq!(encode_imm(0x0012_0000).unwrap(), 0x812);
        assert_eq!(encode_imm(0xff).unwrap(), 0x0ff);
    }

    #[test]
    fn unencodable_is_an_error_not_zero() {
        assert_eq!(
            encode_imm(0x101),
            Err(EncodeError::UnencodableImmediate { value: 0x101 })
        );
        assert!(!is_encodable(0x00ff_ffff));
        assert!(is_encodable(0));
    }
}
