//! 7-bit packed byte codec.
//!
//! The host spreads raw bytes across a stream of packed bytes that carry
//! at most 7 significant bits each, least significant bits first. Every 7
//! raw bytes (56 bits) travel as 8 packed bytes.
//!
//! ```text
//! raw      │ b0 ........ │ b1 ........ │ ... │ b6 ........ │
//! packed   │ p0 .7 bits  │ p1 .7 bits  │ ... │ p6 │ p7 .7 bits │
//!          b0 = p0[0..7] | p1[0] << 7
//!          b1 = p1[1..7] | p2[0..2] << 6
//!          b6 = p6[6]    | p7[0..7] << 1
//! ```
//!
//! Only decoding lives on the device side.

use crate::error::{FrameError, Result};

/// Number of packed bytes that carry `count` raw bytes: `ceil(8 * count / 7)`.
pub const fn packed_len(count: usize) -> usize {
    (count * 8).div_ceil(7)
}

/// Unpack `count` raw bytes from the front of `packed`.
pub fn unpack(count: usize, packed: &[u8]) -> Result<Vec<u8>> {
    let mut out = vec![0u8; count];
    unpack_into(packed, &mut out)?;
    Ok(out)
}

/// Unpack `out.len()` raw bytes from the front of `packed` into `out`.
///
/// Reads exactly [`packed_len`]`(out.len())` packed bytes.
pub fn unpack_into(packed: &[u8], out: &mut [u8]) -> Result<()> {
    let needed = packed_len(out.len());
    if packed.len() < needed {
        return Err(FrameError::ShortPacked {
            count: out.len(),
            needed,
            available: packed.len(),
        });
    }

    let mut cursor = 0usize;
    for (i, slot) in out.iter_mut().enumerate() {
        let shift = (i % 7) as u32;
        let low = (packed[cursor] >> shift) & (0x7f_u8 >> shift);
        let high = packed[cursor + 1] & (0x7f_u8 >> (6 - shift));
        *slot = low | (high << (7 - shift));

        // the 8th packed byte of a group is fully consumed by output byte 6
        if shift == 6 {
            cursor += 1;
        }
        cursor += 1;
    }

    Ok(())
}

/// Unpack a single raw byte (2 packed bytes).
pub fn unpack_u8(packed: &[u8]) -> Result<u8> {
    let mut out = [0u8; 1];
    unpack_into(packed, &mut out)?;
    Ok(out[0])
}

/// Unpack a 2-byte little-endian value (3 packed bytes).
pub fn unpack_u16_le(packed: &[u8]) -> Result<u16> {
    let mut out = [0u8; 2];
    unpack_into(packed, &mut out)?;
    Ok(u16::from_le_bytes(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Independent bit-stream packer: raw bits are laid out least
    /// significant first and cut into 7-bit groups.
    fn reference_pack(raw: &[u8]) -> Vec<u8> {
        let total_bits = raw.len() * 8;
        let mut packed = vec![0u8; total_bits.div_ceil(7)];
        for bit in 0..total_bits {
            if (raw[bit / 8] >> (bit % 8)) & 1 == 1 {
                packed[bit / 7] |= 1 << (bit % 7);
            }
        }
        packed
    }

    fn sample(len: usize, seed: u32) -> Vec<u8> {
        let mut state = seed;
        (0..len)
            .map(|_| {
                state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
                (state >> 16) as u8
            })
            .collect()
    }

    #[test]
    fn roundtrip_against_reference_packer() {
        for len in 0..=40 {
            for seed in [1u32, 7, 0xdead_beef] {
                let raw = sample(len, seed);
                let packed = reference_pack(&raw);
                assert!(packed.iter().all(|b| b & 0x80 == 0));
                assert_eq!(unpack(len, &packed).unwrap(), raw, "len {len} seed {seed}");
            }
        }
    }

    #[test]
    fn extremes_roundtrip() {
        for raw in [vec![0x00; 15], vec![0xff; 15], vec![0x80; 9], vec![0x7f; 9]] {
            let packed = reference_pack(&raw);
            assert_eq!(unpack(raw.len(), &packed).unwrap(), raw);
        }
    }

    #[test]
    fn empty_input_unpacks_to_empty_output() {
        assert!(unpack(0, &[]).unwrap().is_empty());
    }

    #[test]
    fn seven_bytes_consume_exactly_eight_packed_bytes() {
        let raw = [0x12, 0x34, 0x56, 0x78, 0x9a, 0xbc, 0xde];
        let packed = reference_pack(&raw);
        assert_eq!(packed.len(), 8);

        // nothing beyond the 8th byte is needed
        assert_eq!(unpack(7, &packed).unwrap(), raw);

        // trailing bytes are ignored
        let mut extended = packed.clone();
        extended.extend_from_slice(&[0x7f, 0x7f]);
        assert_eq!(unpack(7, &extended).unwrap(), raw);
    }

    #[test]
    fn packed_len_matches_ceiling() {
        assert_eq!(packed_len(0), 0);
        assert_eq!(packed_len(1), 2);
        assert_eq!(packed_len(2), 3);
        assert_eq!(packed_len(7), 8);
        assert_eq!(packed_len(8), 10);
        assert_eq!(packed_len(14), 16);
    }

    #[test]
    fn short_input_is_rejected() {
        let err = unpack(2, &[0x68, 0x07]).unwrap_err();
        assert!(matches!(
            err,
            FrameError::ShortPacked {
                count: 2,
                needed: 3,
                available: 2
            }
        ));

        assert!(unpack(7, &[0u8; 7]).is_err());
    }

    #[test]
    fn known_vectors() {
        // 1000 = 0x03e8
        assert_eq!(unpack_u16_le(&[0x68, 0x07, 0x00]).unwrap(), 1000);
        assert_eq!(unpack_u8(&[0x7f, 0x01]).unwrap(), 0xff);
        assert_eq!(unpack_u8(&[0x2a, 0x00]).unwrap(), 42);
    }

    #[test]
    fn high_bit_of_packed_bytes_is_ignored() {
        let raw = sample(9, 3);
        let packed: Vec<u8> = reference_pack(&raw).iter().map(|b| b | 0x80).collect();
        assert_eq!(unpack(9, &packed).unwrap(), raw);
    }

    #[test]
    fn little_endian_reassembly() {
        let packed = reference_pack(&[0x34, 0x12]);
        assert_eq!(unpack_u16_le(&packed).unwrap(), 0x1234);
    }
}
