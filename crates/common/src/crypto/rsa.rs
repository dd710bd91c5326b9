//! Recovery of the session id from the login response: the RSA private
//! key arrives encrypted under the master key as a sequence of
//! length-prefixed MPIs, and the csid is an RSA ciphertext under it.

use num_bigint::BigUint;

use super::aes::ecb_decrypt_in_place;
use super::{b64, CryptoError};

const SID_LEN: usize = 43;

/// Parse one MPI: a 2-byte big-endian bit count followed by the
/// magnitude bytes. Returns the integer and the remaining input.
fn read_mpi(data: &[u8]) -> Result<(BigUint, &[u8]), CryptoError> {
    if data.len() < 2 {
        return Err(CryptoError::BadPrivateKey);
    }
    let bits = u16::from_be_bytes([data[0], data[1]]) as usize;
    let len = (bits + 7) / 8;
    if data.len() < 2 + len {
        return Err(CryptoError::BadPrivateKey);
    }
    Ok((BigUint::from_bytes_be(&data[2..2 + len]), &data[2 + len..]))
}

/// Decrypt the private-key blob with the master key, pull out `p`, `q`
/// and `d` (the fourth MPI is not needed), RSA-decrypt the csid and
/// return the 43-byte session id, base64url-encoded.
pub fn decrypt_session_id(
    privk_b64: &str,
    csid_b64: &str,
    master_key: &[u8; 16],
) -> Result<String, CryptoError> {
    let mut privk = b64::decode(privk_b64)?;
    ecb_decrypt_in_place(master_key, &mut privk);

    let (p, rest) = read_mpi(&privk)?;
    let (q, rest) = read_mpi(rest)?;
    let (d, _rest) = read_mpi(rest)?;

    let csid = b64::decode(csid_b64)?;
    let (c, _) = read_mpi(&csid)?;

    let n = &p * &q;
    let m = c.modpow(&d, &n);

    // BigUint::to_bytes_be strips leading zeros; the session id is the
    // first 43 bytes of the normalized plaintext.
    let bytes = m.to_bytes_be();
    if bytes.len() < SID_LEN {
        return Err(CryptoError::BadSessionId);
    }
    Ok(b64::encode(&bytes[..SID_LEN]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mpi(value: &BigUint) -> Vec<u8> {
        let bytes = value.to_bytes_be();
        let bits = value.bits() as u16;
        let mut out = bits.to_be_bytes().to_vec();
        out.extend_from_slice(&bytes);
        out
    }

    #[test]
    fn test_read_mpi() {
        let v = BigUint::from(0xbeefu32);
        let encoded = mpi(&v);
        let (parsed, rest) = read_mpi(&encoded).unwrap();
        assert_eq!(parsed, v);
        assert!(rest.is_empty());
    }

    #[test]
    fn test_read_mpi_sequence() {
        let a = BigUint::from(61u32);
        let b = BigUint::from(53u32);
        let mut buf = mpi(&a);
        buf.extend_from_slice(&mpi(&b));
        let (pa, rest) = read_mpi(&buf).unwrap();
        let (pb, rest) = read_mpi(rest).unwrap();
        assert_eq!((pa, pb), (a, b));
        assert!(rest.is_empty());
    }

    #[test]
    fn test_read_mpi_truncated() {
        assert!(read_mpi(&[0x01]).is_err());
        assert!(read_mpi(&[0x00, 0x20, 0xff]).is_err());
    }

    #[test]
    fn test_textbook_rsa_round_trip() {
        // p=61, q=53, e=17, d=413: classic toy parameters
        let p = BigUint::from(61u32);
        let q = BigUint::from(53u32);
        let e = BigUint::from(17u32);
        let d = BigUint::from(413u32);
        let n = &p * &q;
        let msg = BigUint::from(65u32);
        let cipher = msg.modpow(&e, &n);
        assert_eq!(cipher.modpow(&d, &n), msg);
    }
}
