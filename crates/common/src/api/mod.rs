//! The authenticated JSON request channel.
//!
//! Every command is wrapped in a one-element array and POSTed to
//! `/cs?id=<sn>[&sid=<session>]`. The sequence number advances exactly
//! once per call regardless of retries; the transient "try again" code
//! pauses briefly without consuming the attempt budget.

pub mod proto;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::Options;
use crate::error::{Error, ErrorCode, Result};

const EAGAIN_PAUSE: Duration = Duration::from_millis(10);

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    retries: usize,
    sn: AtomicU64,
    sid: OnceLock<String>,
}

impl ApiClient {
    pub fn new(opts: &Options) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(opts.timeout).build()?;
        Ok(Self {
            http,
            base_url: opts.api_base().to_string(),
            retries: opts.retries,
            // 32 random bits seed the per-session sequence
            sn: AtomicU64::new(rand::random::<u32>() as u64),
            sid: OnceLock::new(),
        })
    }

    /// Attach the session id; all subsequent requests carry it. May only
    /// happen once per client.
    pub fn set_session_id(&self, sid: String) -> Result<()> {
        self.sid.set(sid).map_err(|_| Error::AlreadyLoggedIn)
    }

    pub fn session_id(&self) -> Option<&str> {
        self.sid.get().map(String::as_str)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The raw HTTP client, for chunk transfers and the event stream.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Send a typed command and parse the one-element response array.
    pub async fn request<Req, Resp>(&self, req: &Req) -> Result<Resp>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        let body = self.send(serde_json::to_vec(&[req])?).await?;
        let mut batch: Vec<Resp> = serde_json::from_slice(&body)?;
        batch.pop().ok_or(Error::BadResponse)
    }

    /// Send a typed command whose response carries no payload beyond the
    /// success code.
    pub async fn command<Req: Serialize>(&self, req: &Req) -> Result<()> {
        self.send(serde_json::to_vec(&[req])?).await?;
        Ok(())
    }

    /// POST a serialized command batch, retrying transport failures up
    /// to `retries + 1` times, and decode server error codes.
    pub async fn send(&self, payload: Vec<u8>) -> Result<Vec<u8>> {
        let sn = self.sn.fetch_add(1, Ordering::SeqCst);
        let mut url = format!("{}/cs?id={}", self.base_url, sn);
        if let Some(sid) = self.session_id() {
            url.push_str("&sid=");
            url.push_str(sid);
        }

        let mut attempt = 0;
        let mut last_err = Error::BadResponse;
        while attempt <= self.retries {
            let resp = match self
                .http
                .post(&url)
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(payload.clone())
                .send()
                .await
            {
                Ok(resp) if resp.status().is_success() => resp,
                Ok(resp) => {
                    tracing::debug!(status = %resp.status(), "api request failed, retrying");
                    last_err = Error::Server(ErrorCode::Failed);
                    attempt += 1;
                    continue;
                }
                Err(e) => {
                    tracing::debug!(error = %e, "api transport error, retrying");
                    last_err = e.into();
                    attempt += 1;
                    continue;
                }
            };

            let body = match resp.bytes().await {
                Ok(b) => b,
                Err(e) => {
                    last_err = e.into();
                    attempt += 1;
                    continue;
                }
            };

            match decode_error_code(&body) {
                Some(code) if code < 0 => {
                    let code = ErrorCode::from_code(code);
                    if code == ErrorCode::Again {
                        tokio::time::sleep(EAGAIN_PAUSE).await;
                        continue;
                    }
                    return Err(Error::Server(code));
                }
                // a bare non-negative code is a payload-free success
                _ => return Ok(body.to_vec()),
            }
        }

        Err(last_err)
    }
}

/// Decode a server error-code body: either a bare integer or a
/// one-element array of one. Anything else is a regular response.
pub(crate) fn decode_error_code(body: &[u8]) -> Option<i64> {
    if let Ok(code) = serde_json::from_slice::<i64>(body) {
        return Some(code);
    }
    if let Ok(batch) = serde_json::from_slice::<Vec<i64>>(body) {
        if batch.len() == 1 {
            return Some(batch[0]);
        }
    }
    None
}
