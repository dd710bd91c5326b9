//! Encrypted node attributes: `"MEGA" + JSON`, NUL-padded to a block
//! boundary, CBC-encrypted with a zero IV, base64url-encoded.

use serde::{Deserialize, Serialize};

use super::aes::{cbc_decrypt_zero_iv, cbc_encrypt_zero_iv};
use super::words::zero_pad;
use super::{b64, CryptoError};

const MAGIC: &[u8] = b"MEGA";

/// The decrypted attribute object. Only the name is used; unknown
/// fields the server may add are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeAttr {
    #[serde(rename = "n")]
    pub name: String,
}

impl NodeAttr {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

pub fn encrypt_attr(key: &[u8; 16], attr: &NodeAttr) -> Result<String, CryptoError> {
    let json = serde_json::to_vec(attr)?;
    let mut plain = Vec::with_capacity(MAGIC.len() + json.len());
    plain.extend_from_slice(MAGIC);
    plain.extend_from_slice(&json);
    let mut padded = zero_pad(&plain, 16);
    cbc_encrypt_zero_iv(key, &mut padded);
    Ok(b64::encode(&padded))
}

pub fn decrypt_attr(key: &[u8; 16], blob: &str) -> Result<NodeAttr, CryptoError> {
    let mut buf = b64::decode(blob)?;
    if buf.is_empty() || buf.len() % 16 != 0 {
        return Err(CryptoError::BadAttribute);
    }
    cbc_decrypt_zero_iv(key, &mut buf);
    if !buf.starts_with(MAGIC) || buf.get(MAGIC.len()) != Some(&b'{') {
        return Err(CryptoError::BadAttribute);
    }
    let json = &buf[MAGIC.len()..];
    let end = json
        .iter()
        .position(|&b| b == 0)
        .unwrap_or(json.len());
    serde_json::from_slice(&json[..end]).map_err(|_| CryptoError::BadAttribute)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: [u8; 16] = [3u8; 16];

    #[test]
    fn test_round_trip() {
        let attr = NodeAttr::new("hello.txt");
        let blob = encrypt_attr(&KEY, &attr).unwrap();
        assert_eq!(decrypt_attr(&KEY, &blob).unwrap(), attr);
    }

    #[test]
    fn test_round_trip_block_boundary_name() {
        // "MEGA" + {"n":"abcd"} is exactly 16 bytes, so no padding NULs
        let attr = NodeAttr::new("abcd");
        let blob = encrypt_attr(&KEY, &attr).unwrap();
        assert_eq!(decrypt_attr(&KEY, &blob).unwrap(), attr);
    }

    #[test]
    fn test_wrong_key_is_bad_attribute() {
        let blob = encrypt_attr(&KEY, &NodeAttr::new("x")).unwrap();
        let wrong = [4u8; 16];
        assert!(matches!(
            decrypt_attr(&wrong, &blob),
            Err(CryptoError::BadAttribute)
        ));
    }

    #[test]
    fn test_garbage_blob_is_bad_attribute() {
        assert!(decrypt_attr(&KEY, "!!not base64!!").is_err());
        assert!(matches!(
            decrypt_attr(&KEY, &b64::encode(&[0u8; 32])),
            Err(CryptoError::BadAttribute)
        ));
        assert!(matches!(
            decrypt_attr(&KEY, &b64::encode(b"short")),
            Err(CryptoError::BadAttribute)
        ));
    }
}
