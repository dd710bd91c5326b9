//! The `Mega` handle: session establishment, tree fetch, node
//! operations and transfers.
//!
//! The handle is cheaply cloneable; every clone shares the same request
//! channel, session and filesystem. Session material is written exactly
//! once at login and never mutated afterwards.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::api::proto::{
    DeleteRequest, DownloadRequest, DownloadResponse, FilesRequest, FilesResponse, LinkRequest,
    LoginRequest, LoginResponse, MoveRequest, NewNode, PutRequest, PutResponse, SetAttrRequest,
    UploadRequest, UploadResponse, UserInfoRequest, UserInfoResponse,
};
use crate::api::ApiClient;
use crate::config::{Options, DOWNLOAD_URL};
use crate::crypto::aes::{ecb_decrypt_in_place, ecb_encrypt_in_place};
use crate::crypto::attr::{encrypt_attr, NodeAttr};
use crate::crypto::words::a32_to_bytes;
use crate::crypto::{b64, kdf, rsa};
use crate::error::{Error, Result};
use crate::events;
use crate::fs::{FileSystem, NodeKind, NodeMeta, RootBase};
use crate::transfer::{self, Progress};

pub(crate) struct Session {
    pub master_key: [u8; 16],
    #[allow(dead_code)]
    pub user_handle: String,
}

#[derive(Clone)]
pub struct Mega {
    opts: Arc<Options>,
    api: Arc<ApiClient>,
    session: Arc<OnceLock<Session>>,
    fs: FileSystem,
    polling: Arc<AtomicBool>,
}

impl Mega {
    pub fn new(opts: Options) -> Result<Self> {
        opts.validate()?;
        let api = ApiClient::new(&opts)?;
        Ok(Self {
            opts: Arc::new(opts),
            api: Arc::new(api),
            session: Arc::new(OnceLock::new()),
            fs: FileSystem::new(),
            polling: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn filesystem(&self) -> &FileSystem {
        &self.fs
    }

    pub(crate) fn api(&self) -> &ApiClient {
        &self.api
    }

    pub(crate) fn session(&self) -> Result<&Session> {
        self.session.get().ok_or(Error::NotLoggedIn)
    }

    /// Authenticate, then load the filesystem and start the poller.
    pub async fn login(&self, email: &str, password: &str) -> Result<()> {
        let pass_key = kdf::password_key(password);
        let handle = kdf::string_hash(email, &pass_key);
        let resp: LoginResponse = self.api.request(&LoginRequest::new(email, &handle)).await?;

        let mut key_buf = b64::decode(&resp.k)?;
        ecb_decrypt_in_place(&pass_key, &mut key_buf);
        let master_key: [u8; 16] = key_buf
            .get(..16)
            .and_then(|s| s.try_into().ok())
            .ok_or(Error::BadResponse)?;

        let sid = rsa::decrypt_session_id(&resp.privk, &resp.csid, &master_key)?;
        self.api.set_session_id(sid)?;
        self.session
            .set(Session {
                master_key,
                user_handle: handle,
            })
            .map_err(|_| Error::AlreadyLoggedIn)?;

        self.fetch_filesystem().await
    }

    /// Fetch the complete node set, ingest it, and (once) spawn the
    /// event poller at the server-state sequence the snapshot names.
    pub async fn fetch_filesystem(&self) -> Result<()> {
        let master_key = self.session()?.master_key;
        let mut fs = self.fs.lock().await;
        let resp: FilesResponse = self.api.request(&FilesRequest::new()).await?;
        for sk in resp.ok {
            fs.add_share_key(sk.hash, sk.key);
        }
        for rec in &resp.f {
            fs.ingest(rec, &master_key)?;
        }
        drop(fs);

        if !self.polling.swap(true, Ordering::SeqCst) {
            tokio::spawn(events::run(self.clone(), resp.sn));
        }
        Ok(())
    }

    pub async fn user_info(&self) -> Result<UserInfoResponse> {
        self.session()?;
        self.api.request(&UserInfoRequest::new()).await
    }

    /// Download a file node to `dst`. The filesystem lock is held for
    /// the whole transfer, serializing it against tree mutation.
    pub async fn download_file(&self, hash: &str, dst: &Path, progress: Progress) -> Result<()> {
        let fs = self.fs.lock().await;
        let node = fs.hash_lookup(hash).ok_or(Error::NodeNotFound)?;
        let meta = node.meta().clone();
        let NodeMeta::File { key, mac, .. } = meta else {
            return Err(Error::NotAFile);
        };
        let iv = node.meta().iv_words().expect("file meta carries an iv");

        let resp: DownloadResponse = self.api.request(&DownloadRequest::new(hash)).await?;
        if dst.exists() {
            std::fs::remove_file(dst)?;
        }

        let params = transfer::DownloadParams {
            url: resp.g,
            size: resp.size,
            key,
            iv,
            mac,
        };
        transfer::download_to_file(
            self.api.http(),
            self.opts.retries,
            self.opts.download_workers,
            &params,
            dst,
            &progress,
        )
        .await
    }

    /// Upload a local file under `parent_hash` as `name`; returns the
    /// hash of the new node. Holds the filesystem lock throughout.
    pub async fn upload_file(
        &self,
        parent_hash: &str,
        src: &Path,
        name: &str,
        progress: Progress,
    ) -> Result<String> {
        let master_key = self.session()?.master_key;
        let mut fs = self.fs.lock().await;
        fs.hash_lookup(parent_hash).ok_or(Error::NodeNotFound)?;

        let size = std::fs::metadata(src)?.len();
        let resp: UploadResponse = self.api.request(&UploadRequest::new(size)).await?;

        let ukey: [u32; 6] = rand::random();
        let key: [u8; 16] = a32_to_bytes(&ukey[..4]).try_into().expect("4 words");
        let iv = [ukey[4], ukey[5]];

        let outcome = transfer::upload_from_file(
            self.api.http(),
            self.opts.retries,
            self.opts.upload_workers,
            &resp.p,
            src,
            size,
            key,
            iv,
            &progress,
        )
        .await?;

        let attr = encrypt_attr(&key, &NodeAttr::new(name))?;
        let mac = outcome.meta_mac;
        let compkey = [
            ukey[0] ^ ukey[4],
            ukey[1] ^ ukey[5],
            ukey[2] ^ mac[0],
            ukey[3] ^ mac[1],
            ukey[4],
            ukey[5],
            mac[0],
            mac[1],
        ];
        let mut key_enc = a32_to_bytes(&compkey);
        ecb_encrypt_in_place(&master_key, &mut key_enc);

        let req = PutRequest::new(
            parent_hash.to_string(),
            NewNode {
                h: outcome.completion_handle,
                t: NodeKind::File.as_i64(),
                a: attr,
                k: b64::encode(&key_enc),
            },
            idempotence_id(),
        );
        let resp: PutResponse = self.api.request(&req).await?;
        let rec = resp.f.first().ok_or(Error::BadResponse)?;
        fs.ingest(rec, &master_key)
    }

    /// Move a node under a new parent.
    pub async fn move_node(&self, hash: &str, new_parent: &str) -> Result<()> {
        let mut fs = self.fs.lock().await;
        fs.hash_lookup(hash).ok_or(Error::NodeNotFound)?;
        fs.hash_lookup(new_parent).ok_or(Error::NodeNotFound)?;
        self.api
            .command(&MoveRequest::new(hash, new_parent, idempotence_id()))
            .await?;
        fs.reparent(hash, new_parent);
        Ok(())
    }

    /// Re-encrypt the node's attributes under its own key with a new
    /// name and push them to the server.
    pub async fn rename(&self, hash: &str, name: &str) -> Result<()> {
        let master_key = self.session()?.master_key;
        let mut fs = self.fs.lock().await;
        let (attr_key, compkey) = {
            let node = fs.hash_lookup(hash).ok_or(Error::NodeNotFound)?;
            let attr_key = node.meta().attr_key().ok_or(Error::NodeNotFound)?;
            let compkey = node.meta().compkey().expect("meta with key").to_vec();
            (attr_key, compkey)
        };

        let attr = encrypt_attr(&attr_key, &NodeAttr::new(name))?;
        let mut key_enc = compkey;
        ecb_encrypt_in_place(&master_key, &mut key_enc);
        self.api
            .command(&SetAttrRequest::new(
                hash,
                attr,
                b64::encode(&key_enc),
                idempotence_id(),
            ))
            .await?;

        if let Some(node) = fs.node_mut(hash) {
            node.name = name.to_string();
        }
        Ok(())
    }

    /// Create a folder named `name` under `parent_hash`; returns the new
    /// node's hash.
    pub async fn create_dir(&self, name: &str, parent_hash: &str) -> Result<String> {
        let master_key = self.session()?.master_key;
        let mut fs = self.fs.lock().await;
        fs.hash_lookup(parent_hash).ok_or(Error::NodeNotFound)?;

        let ckey: [u32; 4] = rand::random();
        let key: [u8; 16] = a32_to_bytes(&ckey).try_into().expect("4 words");
        let attr = encrypt_attr(&key, &NodeAttr::new(name))?;
        let mut key_enc = key.to_vec();
        ecb_encrypt_in_place(&master_key, &mut key_enc);

        let req = PutRequest::new(
            parent_hash.to_string(),
            NewNode {
                h: "xxxxxxxx".to_string(),
                t: NodeKind::Folder.as_i64(),
                a: attr,
                k: b64::encode(&key_enc),
            },
            idempotence_id(),
        );
        let resp: PutResponse = self.api.request(&req).await?;
        let rec = resp.f.first().ok_or(Error::BadResponse)?;
        fs.ingest(rec, &master_key)
    }

    /// Hard-delete a node, or move it to the trash when `destroy` is
    /// false.
    pub async fn delete(&self, hash: &str, destroy: bool) -> Result<()> {
        if !destroy {
            let trash = self
                .fs
                .base(RootBase::Trash)
                .await
                .ok_or(Error::NodeNotFound)?;
            return self.move_node(hash, trash.hash()).await;
        }

        let mut fs = self.fs.lock().await;
        fs.hash_lookup(hash).ok_or(Error::NodeNotFound)?;
        self.api
            .command(&DeleteRequest::new(hash, idempotence_id()))
            .await?;
        fs.remove_node(hash);
        Ok(())
    }

    /// Export a public link for a node, with or without the decryption
    /// key embedded.
    pub async fn link(&self, hash: &str, include_key: bool) -> Result<String> {
        let fs = self.fs.lock().await;
        let compkey = fs
            .hash_lookup(hash)
            .ok_or(Error::NodeNotFound)?
            .meta()
            .compkey()
            .map(b64::encode);

        let id: String = self.api.request(&LinkRequest::new(hash)).await?;
        match (include_key, compkey) {
            (true, Some(key)) => Ok(format!("{}/#!{}!{}", DOWNLOAD_URL, id, key)),
            _ => Ok(format!("{}/#!{}", DOWNLOAD_URL, id)),
        }
    }
}

/// 10-character idempotence token carried by mutating commands.
fn idempotence_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(10)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idempotence_id_shape() {
        let id = idempotence_id();
        assert_eq!(id.len(), 10);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(idempotence_id(), idempotence_id());
    }

    #[test]
    fn test_new_rejects_excess_workers() {
        let opts = Options {
            upload_workers: 64,
            ..Options::default()
        };
        assert!(Mega::new(opts).is_err());
    }

    #[tokio::test]
    async fn test_operations_require_login() {
        let mega = Mega::new(Options::default()).unwrap();
        assert!(matches!(mega.user_info().await, Err(Error::NotLoggedIn)));
        assert!(matches!(
            mega.fetch_filesystem().await,
            Err(Error::NotLoggedIn)
        ));
    }
}
