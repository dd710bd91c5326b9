//! Wire message types for the `/cs` command channel and the `/sc` event
//! stream. Commands go out as a one-element array; responses come back
//! the same way, or as a bare/bracketed error code.

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    #[serde(rename = "a")]
    pub cmd: &'static str,
    pub user: &'a str,
    pub uh: &'a str,
}

impl<'a> LoginRequest<'a> {
    pub fn new(user: &'a str, uh: &'a str) -> Self {
        Self { cmd: "us", user, uh }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub csid: String,
    #[serde(default)]
    pub privk: String,
    #[serde(default)]
    pub k: String,
}

#[derive(Debug, Serialize)]
pub struct UserInfoRequest {
    #[serde(rename = "a")]
    pub cmd: &'static str,
}

impl UserInfoRequest {
    pub fn new() -> Self {
        Self { cmd: "ug" }
    }
}

impl Default for UserInfoRequest {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UserInfoResponse {
    /// User handle.
    #[serde(default)]
    pub u: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct FilesRequest {
    #[serde(rename = "a")]
    pub cmd: &'static str,
    pub c: u8,
}

impl FilesRequest {
    pub fn new() -> Self {
        Self { cmd: "f", c: 1 }
    }
}

impl Default for FilesRequest {
    fn default() -> Self {
        Self::new()
    }
}

/// One node record from the `f` array or a `t` event.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileNode {
    #[serde(default, rename = "h")]
    pub hash: String,
    #[serde(default, rename = "p")]
    pub parent: String,
    #[serde(default, rename = "u")]
    pub user: String,
    #[serde(default, rename = "t")]
    pub kind: i64,
    #[serde(default, rename = "a")]
    pub attr: String,
    #[serde(default, rename = "k")]
    pub key: String,
    #[serde(default, rename = "s")]
    pub size: u64,
    #[serde(default, rename = "ts")]
    pub ts: i64,
    #[serde(default, rename = "su")]
    pub share_user: String,
    #[serde(default, rename = "sk")]
    pub share_key: String,
}

/// Share key record from the `ok` array of the `f` response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShareKey {
    #[serde(default, rename = "h")]
    pub hash: String,
    #[serde(default, rename = "k")]
    pub key: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct FilesResponse {
    #[serde(default)]
    pub f: Vec<FileNode>,
    #[serde(default)]
    pub ok: Vec<ShareKey>,
    #[serde(default)]
    pub sn: String,
}

#[derive(Debug, Serialize)]
pub struct DownloadRequest<'a> {
    #[serde(rename = "a")]
    pub cmd: &'static str,
    pub g: u8,
    pub n: &'a str,
}

impl<'a> DownloadRequest<'a> {
    pub fn new(hash: &'a str) -> Self {
        Self { cmd: "g", g: 1, n: hash }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct DownloadResponse {
    /// Resource URL chunk ranges are fetched from.
    #[serde(default)]
    pub g: String,
    #[serde(default, rename = "s")]
    pub size: u64,
    #[serde(default, rename = "at")]
    pub attr: String,
}

#[derive(Debug, Serialize)]
pub struct UploadRequest {
    #[serde(rename = "a")]
    pub cmd: &'static str,
    #[serde(rename = "s")]
    pub size: u64,
}

impl UploadRequest {
    pub fn new(size: u64) -> Self {
        Self { cmd: "u", size }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UploadResponse {
    /// Upload URL chunks are POSTed to.
    #[serde(default)]
    pub p: String,
}

/// New node description inside a `p` (put) command: a completion handle
/// (or the folder placeholder), node type, encrypted attributes and the
/// master-key-encrypted node key.
#[derive(Debug, Serialize)]
pub struct NewNode {
    pub h: String,
    pub t: i64,
    pub a: String,
    pub k: String,
}

#[derive(Debug, Serialize)]
pub struct PutRequest {
    #[serde(rename = "a")]
    pub cmd: &'static str,
    pub t: String,
    pub n: [NewNode; 1],
    pub i: String,
}

impl PutRequest {
    pub fn new(parent: String, node: NewNode, idempotence: String) -> Self {
        Self { cmd: "p", t: parent, n: [node], i: idempotence }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PutResponse {
    #[serde(default)]
    pub f: Vec<FileNode>,
}

#[derive(Debug, Serialize)]
pub struct MoveRequest<'a> {
    #[serde(rename = "a")]
    pub cmd: &'static str,
    pub n: &'a str,
    pub t: &'a str,
    pub i: String,
}

impl<'a> MoveRequest<'a> {
    pub fn new(node: &'a str, parent: &'a str, idempotence: String) -> Self {
        Self { cmd: "m", n: node, t: parent, i: idempotence }
    }
}

#[derive(Debug, Serialize)]
pub struct SetAttrRequest<'a> {
    #[serde(rename = "a")]
    pub cmd: &'static str,
    pub attr: String,
    pub key: String,
    pub n: &'a str,
    pub i: String,
}

impl<'a> SetAttrRequest<'a> {
    pub fn new(node: &'a str, attr: String, key: String, idempotence: String) -> Self {
        Self { cmd: "a", attr, key, n: node, i: idempotence }
    }
}

#[derive(Debug, Serialize)]
pub struct DeleteRequest<'a> {
    #[serde(rename = "a")]
    pub cmd: &'static str,
    pub n: &'a str,
    pub i: String,
}

impl<'a> DeleteRequest<'a> {
    pub fn new(node: &'a str, idempotence: String) -> Self {
        Self { cmd: "d", n: node, i: idempotence }
    }
}

#[derive(Debug, Serialize)]
pub struct LinkRequest<'a> {
    #[serde(rename = "a")]
    pub cmd: &'static str,
    pub n: &'a str,
}

impl<'a> LinkRequest<'a> {
    pub fn new(hash: &'a str) -> Self {
        Self { cmd: "l", n: hash }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_envelope_field_names() {
        let req = LoginRequest::new("user@example.com", "handle");
        let json = serde_json::to_string(&[&req]).unwrap();
        assert_eq!(
            json,
            r#"[{"a":"us","user":"user@example.com","uh":"handle"}]"#
        );
    }

    #[test]
    fn test_file_node_parses_server_record() {
        let raw = r#"{"h":"h1","p":"h0","u":"owner","t":0,"a":"attr","k":"owner:key","s":17,"ts":1700000000}"#;
        let node: FileNode = serde_json::from_str(raw).unwrap();
        assert_eq!(node.hash, "h1");
        assert_eq!(node.kind, 0);
        assert_eq!(node.size, 17);
        assert!(node.share_user.is_empty());
    }

    #[test]
    fn test_files_response_tolerates_missing_fields() {
        let resp: FilesResponse = serde_json::from_str(r#"{"f":[]}"#).unwrap();
        assert!(resp.ok.is_empty());
        assert!(resp.sn.is_empty());
    }
}
