//! Big-endian packing between byte strings and 32-bit words.
//!
//! The MEGA scheme is specified in terms of 32-bit words; everything that
//! crosses the wire is big-endian.

/// Unpack a byte string into 32-bit words. Trailing bytes that do not
/// fill a whole word are ignored; callers pad first where it matters.
pub fn bytes_to_a32(bytes: &[u8]) -> Vec<u32> {
    bytes
        .chunks_exact(4)
        .map(|c| u32::from_be_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

/// Pack 32-bit words into a byte string.
pub fn a32_to_bytes(words: &[u32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(words.len() * 4);
    for w in words {
        out.extend_from_slice(&w.to_be_bytes());
    }
    out
}

/// Right-pad with NUL bytes to a multiple of `block`.
pub fn zero_pad(data: &[u8], block: usize) -> Vec<u8> {
    let mut out = data.to_vec();
    let rem = out.len() % block;
    if rem != 0 {
        out.resize(out.len() + block - rem, 0);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_on_aligned_input() {
        let bytes: Vec<u8> = (0u8..32).collect();
        assert_eq!(a32_to_bytes(&bytes_to_a32(&bytes)), bytes);

        let words = [0xdeadbeef, 0x01020304, 0, u32::MAX];
        assert_eq!(bytes_to_a32(&a32_to_bytes(&words)), words);
    }

    #[test]
    fn test_big_endian_layout() {
        assert_eq!(a32_to_bytes(&[0x01020304]), vec![1, 2, 3, 4]);
        assert_eq!(bytes_to_a32(&[1, 2, 3, 4]), vec![0x01020304]);
    }

    #[test]
    fn test_zero_pad() {
        assert_eq!(zero_pad(b"abc", 16).len(), 16);
        assert_eq!(zero_pad(&[0u8; 16], 16).len(), 16);
        assert_eq!(zero_pad(&[], 16).len(), 0);
        let padded = zero_pad(b"abc", 16);
        assert_eq!(&padded[..3], b"abc");
        assert!(padded[3..].iter().all(|&b| b == 0));
    }
}
