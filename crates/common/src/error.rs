use crate::crypto::CryptoError;

/// Server-declared error codes, as returned on the wire as a bare
/// negative integer or a one-element array of one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ErrorCode {
    #[error("internal error occured")]
    Internal,
    #[error("invalid arguments")]
    Args,
    #[error("try again")]
    Again,
    #[error("rate limit reached")]
    RateLimit,
    #[error("request failed permanently")]
    Failed,
    #[error("too many requests for this resource")]
    TooMany,
    #[error("resource access out of range")]
    Range,
    #[error("resource expired")]
    Expired,
    #[error("object not found")]
    NoEnt,
    #[error("circular linkage detected")]
    Circular,
    #[error("access denied")]
    Access,
    #[error("object already exists")]
    Exist,
    #[error("request incomplete")]
    Incomplete,
    #[error("cryptographic error")]
    Key,
    #[error("bad session id")]
    Sid,
    #[error("resource administratively blocked")]
    Blocked,
    #[error("quota exceeded")]
    OverQuota,
    #[error("resource temporarily unavailable")]
    TempUnavail,
    #[error("too many connections on this resource")]
    TooManyConnections,
    #[error("file could not be written to")]
    Write,
    #[error("file could not be read from")]
    Read,
    #[error("invalid or missing application key")]
    AppKey,
    #[error("server error {0}")]
    Other(i64),
}

impl ErrorCode {
    pub fn from_code(code: i64) -> Self {
        match code {
            -1 => Self::Internal,
            -2 => Self::Args,
            -3 => Self::Again,
            -4 => Self::RateLimit,
            -5 => Self::Failed,
            -6 => Self::TooMany,
            -7 => Self::Range,
            -8 => Self::Expired,
            -9 => Self::NoEnt,
            -10 => Self::Circular,
            -11 => Self::Access,
            -12 => Self::Exist,
            -13 => Self::Incomplete,
            -14 => Self::Key,
            -15 => Self::Sid,
            -16 => Self::Blocked,
            -17 => Self::OverQuota,
            -18 => Self::TempUnavail,
            -19 => Self::TooManyConnections,
            -20 => Self::Write,
            -21 => Self::Read,
            -22 => Self::AppKey,
            other => Self::Other(other),
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            Self::Internal => -1,
            Self::Args => -2,
            Self::Again => -3,
            Self::RateLimit => -4,
            Self::Failed => -5,
            Self::TooMany => -6,
            Self::Range => -7,
            Self::Expired => -8,
            Self::NoEnt => -9,
            Self::Circular => -10,
            Self::Access => -11,
            Self::Exist => -12,
            Self::Incomplete => -13,
            Self::Key => -14,
            Self::Sid => -15,
            Self::Blocked => -16,
            Self::OverQuota => -17,
            Self::TempUnavail => -18,
            Self::TooManyConnections => -19,
            Self::Write => -20,
            Self::Read => -21,
            Self::AppKey => -22,
            Self::Other(code) => *code,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("server error: {0}")]
    Server(ErrorCode),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("bad response from server")]
    BadResponse,
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),
    #[error("mac mismatch on downloaded file")]
    MacMismatch,
    #[error("chunk transfer failed with http status {0}")]
    ChunkFailed(u16),
    #[error("worker count exceeds limit of {0}")]
    WorkerLimitExceeded(usize),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("node not found in filesystem")]
    NodeNotFound,
    #[error("node is not a file")]
    NotAFile,
    #[error("no share key known for owner {0}")]
    MissingShareKey(String),
    #[error("malformed node key")]
    BadNodeKey,
    #[error("not logged in")]
    NotLoggedIn,
    #[error("session already established")]
    AlreadyLoggedIn,
}

impl Error {
    /// Whether this is the server's `NoEnt`, which several operations
    /// treat as an ordinary control value rather than a failure.
    pub fn is_noent(&self) -> bool {
        matches!(self, Error::Server(ErrorCode::NoEnt))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_round_trip() {
        for code in [-1, -3, -9, -11, -12, -14, -17, -18, -22] {
            assert_eq!(ErrorCode::from_code(code).code(), code);
        }
    }

    #[test]
    fn test_unknown_code_preserved() {
        let code = ErrorCode::from_code(-42);
        assert_eq!(code, ErrorCode::Other(-42));
        assert_eq!(code.code(), -42);
    }
}
