//! LEB128 variable-width integers as used inside the dex data section.
//!
//! Dex values are 32-bit, so a valid encoding never exceeds five bytes.
//! Decoders return `None` when the input ends before the final byte.

pub fn encode_uleb128(value: u32) -> Vec<u8> {
    let mut result = Vec::new();
    let mut remaining = value;

    if remaining == 0 {
        result.push(0);
        return result;
    }

    while remaining != 0 {
        let mut byte = (remaining & 0x7F) as u8;
        remaining >>= 7;

        if remaining != 0 {
            byte |= 0x80;
        }

        result.push(byte);
    }

    result
}

/// Decodes an unsigned value, returning it with the number of bytes consumed.
pub fn decode_uleb128(encoded: &[u8]) -> Option<(u32, usize)> {
    let mut value: u32 = 0;
    let mut shift: u32 = 0;

    for (count, &byte) in encoded.iter().enumerate() {
        let low = (byte & 0x7F) as u32;
        if shift < 32 {
            value |= low.wrapping_shl(shift);
        }
        shift += 7;

        if (byte & 0x80) == 0 || count == 4 {
            return Some((value, count + 1));
        }
    }

    None
}

pub fn encode_sleb128(value: i32) -> Vec<u8> {
    let mut result = Vec::new();
    let mut remaining = value;

    loop {
        let mut byte = (remaining & 0x7F) as u8;
        remaining >>= 7;

        let is_more =
            !((remaining == 0 && (byte & 0x40) == 0) || (remaining == -1 && (byte & 0x40) != 0));
        if is_more {
            byte |= 0x80;
        }

        result.push(byte);

        if !is_more {
            break;
        }
    }

    result
}

pub fn decode_sleb128(encoded: &[u8]) -> Option<(i32, usize)> {
    let mut value: i32 = 0;
    let mut shift: u32 = 0;

    for (count, &byte) in encoded.iter().enumerate() {
        let low = (byte & 0x7F) as i32;
        if shift < 32 {
            value |= low.wrapping_shl(shift);
        }
        shift += 7;

        if (byte & 0x80) == 0 || count == 4 {
            // Sign-extend if we didn't fill all 32 bits
            if (byte & 0x40) != 0 && shift < 32 {
                value |= (-1i32).wrapping_shl(shift);
            }
            return Some((value, count + 1));
        }
    }

    None
}

/// `uleb128p1` stores `value + 1`, so `NO_INDEX` (-1) encodes as a single zero byte.
pub fn decode_uleb128p1(encoded: &[u8]) -> Option<(i32, usize)> {
    decode_uleb128(encoded).map(|(v, c)| ((v as i32).wrapping_sub(1), c))
}
