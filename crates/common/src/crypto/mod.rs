pub mod aes;
pub mod attr;
pub mod b64;
pub mod kdf;
pub mod rsa;
pub mod words;

pub use attr::NodeAttr;

#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("bad attribute blob")]
    BadAttribute,
    #[error("malformed rsa private key")]
    BadPrivateKey,
    #[error("session id too short")]
    BadSessionId,
    #[error("attribute encoding: {0}")]
    Json(#[from] serde_json::Error),
}
