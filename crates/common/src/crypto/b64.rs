//! MEGA's base64 dialect: URL-safe alphabet (`-_`), no padding.

use base64::prelude::{Engine, BASE64_URL_SAFE_NO_PAD};

use super::CryptoError;

pub fn encode(data: &[u8]) -> String {
    BASE64_URL_SAFE_NO_PAD.encode(data)
}

pub fn decode(s: &str) -> Result<Vec<u8>, CryptoError> {
    Ok(BASE64_URL_SAFE_NO_PAD.decode(s)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_safe_alphabet_no_padding() {
        let data = [0xfb, 0xff, 0x3e, 0x01];
        let encoded = encode(&data);
        assert!(!encoded.contains('='));
        assert!(!encoded.contains('+'));
        assert!(!encoded.contains('/'));
        assert_eq!(decode(&encoded).unwrap(), data);
    }

    #[test]
    fn test_decode_rejects_standard_alphabet() {
        assert!(decode("a+b/").is_err());
    }
}
