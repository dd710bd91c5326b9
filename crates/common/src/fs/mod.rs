//! Client-side mirror of the remote filesystem.
//!
//! All nodes live in a hash-keyed index; parent and child references are
//! hashes into that index, so the tree carries no ownership cycles. A
//! single mutex guards every structural read and write, including for
//! the whole duration of tree-serialized operations such as transfers.

mod node;

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};

pub use node::{Node, NodeKind, NodeMeta, BAD_ATTRIBUTE};

use crate::api::proto::FileNode;
use crate::crypto::aes::ecb_decrypt_in_place;
use crate::crypto::attr::decrypt_attr;
use crate::crypto::words::bytes_to_a32;
use crate::crypto::b64;
use crate::error::{Error, Result};

/// Which special root a path walk starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootBase {
    Cloud,
    Trash,
    Inbox,
}

#[derive(Debug, Default)]
pub struct FsInner {
    nodes: HashMap<String, Node>,
    root: Option<String>,
    inbox: Option<String>,
    trash: Option<String>,
    sroots: Vec<String>,
    /// Hash of a share root to its still-encrypted share key, used to
    /// decrypt nodes inherited from that share.
    skmap: HashMap<String, String>,
}

impl FsInner {
    pub fn hash_lookup(&self, hash: &str) -> Option<&Node> {
        self.nodes.get(hash)
    }

    pub(crate) fn node_mut(&mut self, hash: &str) -> Option<&mut Node> {
        self.nodes.get_mut(hash)
    }

    pub fn base(&self, base: RootBase) -> Option<&Node> {
        let hash = match base {
            RootBase::Cloud => self.root.as_ref()?,
            RootBase::Trash => self.trash.as_ref()?,
            RootBase::Inbox => self.inbox.as_ref()?,
        };
        self.nodes.get(hash)
    }

    pub fn shared_roots(&self) -> Vec<&Node> {
        self.sroots
            .iter()
            .filter_map(|h| self.nodes.get(h))
            .collect()
    }

    pub fn children_of(&self, hash: &str) -> Vec<&Node> {
        match self.nodes.get(hash) {
            Some(n) => n
                .children
                .iter()
                .filter_map(|h| self.nodes.get(h))
                .collect(),
            None => Vec::new(),
        }
    }

    pub(crate) fn add_share_key(&mut self, hash: String, key: String) {
        self.skmap.insert(hash, key);
    }

    /// Walk `segments` by name from `root`. Returns the nodes matched so
    /// far (possibly shorter than the input) and whether the whole path
    /// resolved.
    pub fn resolve(&self, root: &str, segments: &[String]) -> (Vec<Node>, bool) {
        let mut path = Vec::new();
        let Some(mut current) = self.nodes.get(root) else {
            return (path, false);
        };
        for segment in segments {
            let next = current
                .children
                .iter()
                .filter_map(|h| self.nodes.get(h))
                .find(|c| c.name == *segment);
            match next {
                Some(child) => {
                    path.push(child.clone());
                    current = child;
                }
                None => return (path, false),
            }
        }
        (path, true)
    }

    /// Ingest one node record: decrypt its key per the ownership/share
    /// policy, decrypt its name, and splice it into the tree. Unknown
    /// parents are pre-created as placeholder folders and filled in when
    /// their own record arrives.
    pub(crate) fn ingest(&mut self, rec: &FileNode, master_key: &[u8; 16]) -> Result<String> {
        let kind = NodeKind::from_i64(rec.kind).ok_or(Error::BadResponse)?;

        let mut name = String::new();
        let mut meta = NodeMeta::None;

        if matches!(kind, NodeKind::File | NodeKind::Folder) {
            let (owner, enc_key) = rec.key.split_once(':').ok_or(Error::BadNodeKey)?;
            let mut key_buf = b64::decode(enc_key).map_err(|_| Error::BadNodeKey)?;

            if owner == rec.user {
                // owned by the authenticated user
                ecb_decrypt_in_place(master_key, &mut key_buf);
            } else if !rec.share_user.is_empty() && !rec.share_key.is_empty() {
                // this node is a share root carrying its own share key
                let sk = self.decrypt_share_key(&rec.share_key, master_key)?;
                self.skmap.insert(rec.hash.clone(), rec.share_key.clone());
                ecb_decrypt_in_place(&sk, &mut key_buf);
            } else {
                // inherited from a share root seen earlier
                let stored = self
                    .skmap
                    .get(owner)
                    .cloned()
                    .ok_or_else(|| Error::MissingShareKey(owner.to_string()))?;
                let sk = self.decrypt_share_key(&stored, master_key)?;
                ecb_decrypt_in_place(&sk, &mut key_buf);
            }

            let compkey = bytes_to_a32(&key_buf);
            meta = match kind {
                NodeKind::File if compkey.len() >= 8 => node::file_meta(&compkey[..8]),
                NodeKind::Folder if compkey.len() >= 4 => node::folder_meta(&compkey[..4]),
                _ => return Err(Error::BadNodeKey),
            };

            let attr_key = meta.attr_key().expect("file and folder meta carry a key");
            name = match decrypt_attr(&attr_key, &rec.attr) {
                Ok(attr) => attr.name,
                Err(_) => BAD_ATTRIBUTE.to_string(),
            };
        }

        match kind {
            NodeKind::Root => name = "Cloud Drive".to_string(),
            NodeKind::Inbox => name = "InBox".to_string(),
            NodeKind::Trash => name = "Trash".to_string(),
            _ => {}
        }

        // a re-ingest may move the node; drop the stale parent link first
        if let Some(prev) = self.nodes.get(&rec.hash).and_then(|n| n.parent.clone()) {
            if prev != rec.parent {
                self.detach_child(&prev, &rec.hash);
            }
        }

        let entry = self
            .nodes
            .entry(rec.hash.clone())
            .or_insert_with(|| Node::placeholder(rec.hash.clone()));
        entry.kind = kind;
        entry.size = rec.size;
        entry.ts = rec.ts;
        entry.name = name;
        entry.meta = meta;
        entry.parent = (!rec.parent.is_empty()).then(|| rec.parent.clone());

        if !rec.parent.is_empty() {
            if !self.nodes.contains_key(&rec.parent) {
                self.nodes
                    .insert(rec.parent.clone(), Node::placeholder(rec.parent.clone()));
            }
            // remove-before-insert keeps children duplicate-free
            self.detach_child(&rec.parent, &rec.hash);
            self.attach_child(&rec.parent, &rec.hash);
        }

        match kind {
            NodeKind::Root => self.root = Some(rec.hash.clone()),
            NodeKind::Inbox => self.inbox = Some(rec.hash.clone()),
            NodeKind::Trash => self.trash = Some(rec.hash.clone()),
            _ => {}
        }

        if !rec.share_user.is_empty()
            && !rec.share_key.is_empty()
            && !self.sroots.contains(&rec.hash)
        {
            self.sroots.push(rec.hash.clone());
        }

        Ok(rec.hash.clone())
    }

    fn decrypt_share_key(&self, encrypted_b64: &str, master_key: &[u8; 16]) -> Result<[u8; 16]> {
        let mut sk = b64::decode(encrypted_b64).map_err(|_| Error::BadNodeKey)?;
        ecb_decrypt_in_place(master_key, &mut sk);
        sk.get(..16)
            .and_then(|s| <[u8; 16]>::try_from(s).ok())
            .ok_or(Error::BadNodeKey)
    }

    /// Detach a node from its parent and drop it from the index.
    pub(crate) fn remove_node(&mut self, hash: &str) -> bool {
        let Some(parent) = self.nodes.get(hash).map(|n| n.parent.clone()) else {
            return false;
        };
        if let Some(parent) = parent {
            self.detach_child(&parent, hash);
        }
        self.nodes.remove(hash);
        true
    }

    /// Re-link a node under a new parent after a server-acknowledged move.
    pub(crate) fn reparent(&mut self, hash: &str, new_parent: &str) {
        if let Some(prev) = self.nodes.get(hash).and_then(|n| n.parent.clone()) {
            self.detach_child(&prev, hash);
        }
        self.detach_child(new_parent, hash);
        self.attach_child(new_parent, hash);
        if let Some(node) = self.nodes.get_mut(hash) {
            node.parent = Some(new_parent.to_string());
        }
    }

    fn attach_child(&mut self, parent: &str, child: &str) {
        if let Some(p) = self.nodes.get_mut(parent) {
            p.children.push(child.to_string());
        }
    }

    fn detach_child(&mut self, parent: &str, child: &str) {
        if let Some(p) = self.nodes.get_mut(parent) {
            p.children.retain(|h| h != child);
        }
    }
}

/// Shared handle to the filesystem index. Cloning is cheap; all clones
/// see the same tree through the same lock.
#[derive(Debug, Clone, Default)]
pub struct FileSystem {
    inner: Arc<Mutex<FsInner>>,
}

impl FileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the coarse filesystem lock. Held for the entire duration of
    /// every tree-reading or tree-mutating operation.
    pub(crate) async fn lock(&self) -> MutexGuard<'_, FsInner> {
        self.inner.lock().await
    }

    pub async fn node(&self, hash: &str) -> Option<Node> {
        self.inner.lock().await.hash_lookup(hash).cloned()
    }

    pub async fn base(&self, base: RootBase) -> Option<Node> {
        self.inner.lock().await.base(base).cloned()
    }

    pub async fn children_of(&self, hash: &str) -> Vec<Node> {
        self.inner
            .lock()
            .await
            .children_of(hash)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Resolve `segments` from the given base; see [`FsInner::resolve`].
    pub async fn resolve(&self, base: RootBase, segments: &[String]) -> Option<(Vec<Node>, bool)> {
        let inner = self.inner.lock().await;
        let root = inner.base(base)?.hash().to_string();
        Some(inner.resolve(&root, segments))
    }

    pub async fn shared_roots(&self) -> Vec<Node> {
        self.inner
            .lock()
            .await
            .shared_roots()
            .into_iter()
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::aes::ecb_encrypt_in_place;
    use crate::crypto::attr::{encrypt_attr, NodeAttr};
    use crate::crypto::words::a32_to_bytes;

    const MASTER: [u8; 16] = [11u8; 16];

    fn special(hash: &str, kind: NodeKind) -> FileNode {
        FileNode {
            hash: hash.to_string(),
            kind: kind.as_i64(),
            user: "me".to_string(),
            ..FileNode::default()
        }
    }

    fn owned(hash: &str, parent: &str, name: &str, kind: NodeKind, size: u64) -> FileNode {
        let compkey: Vec<u32> = match kind {
            NodeKind::File => (1..=8).map(|i| i * 0x0101 + hash.len() as u32).collect(),
            _ => (1..=4).map(|i| i * 0x0202 + hash.len() as u32).collect(),
        };
        let attr_key: [u8; 16] = match kind {
            NodeKind::File => a32_to_bytes(&[
                compkey[0] ^ compkey[4],
                compkey[1] ^ compkey[5],
                compkey[2] ^ compkey[6],
                compkey[3] ^ compkey[7],
            ])
            .try_into()
            .unwrap(),
            _ => a32_to_bytes(&compkey).try_into().unwrap(),
        };
        let attr = encrypt_attr(&attr_key, &NodeAttr::new(name)).unwrap();
        let mut key_buf = a32_to_bytes(&compkey);
        ecb_encrypt_in_place(&MASTER, &mut key_buf);
        FileNode {
            hash: hash.to_string(),
            parent: parent.to_string(),
            user: "me".to_string(),
            kind: kind.as_i64(),
            attr,
            key: format!("me:{}", b64::encode(&key_buf)),
            size,
            ts: 1_700_000_000,
            ..FileNode::default()
        }
    }

    fn seeded() -> FsInner {
        let mut fs = FsInner::default();
        fs.ingest(&special("root", NodeKind::Root), &MASTER).unwrap();
        fs.ingest(&special("trash", NodeKind::Trash), &MASTER).unwrap();
        fs.ingest(&special("inbox", NodeKind::Inbox), &MASTER).unwrap();
        fs
    }

    #[test]
    fn test_special_roots() {
        let fs = seeded();
        assert_eq!(fs.base(RootBase::Cloud).unwrap().name(), "Cloud Drive");
        assert_eq!(fs.base(RootBase::Trash).unwrap().name(), "Trash");
        assert_eq!(fs.base(RootBase::Inbox).unwrap().name(), "InBox");
    }

    #[test]
    fn test_ingest_owned_file() {
        let mut fs = seeded();
        fs.ingest(&owned("f1", "root", "b.txt", NodeKind::File, 17), &MASTER)
            .unwrap();

        let node = fs.hash_lookup("f1").unwrap();
        assert_eq!(node.name(), "b.txt");
        assert_eq!(node.size(), 17);
        assert_eq!(node.kind(), NodeKind::File);
        assert!(matches!(node.meta(), NodeMeta::File { .. }));

        let children = fs.children_of("root");
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].hash(), "f1");
    }

    #[test]
    fn test_reingest_keeps_children_unique() {
        let mut fs = seeded();
        let rec = owned("f1", "root", "b.txt", NodeKind::File, 17);
        fs.ingest(&rec, &MASTER).unwrap();
        fs.ingest(&rec, &MASTER).unwrap();
        assert_eq!(fs.children_of("root").len(), 1);
    }

    #[test]
    fn test_reingest_moves_between_parents() {
        let mut fs = seeded();
        fs.ingest(&owned("d1", "root", "a", NodeKind::Folder, 0), &MASTER)
            .unwrap();
        fs.ingest(&owned("f1", "root", "b.txt", NodeKind::File, 1), &MASTER)
            .unwrap();
        fs.ingest(&owned("f1", "d1", "b.txt", NodeKind::File, 1), &MASTER)
            .unwrap();

        assert!(fs.children_of("root").iter().all(|c| c.hash() != "f1"));
        assert_eq!(fs.children_of("d1").len(), 1);
        assert_eq!(fs.hash_lookup("f1").unwrap().parent_hash(), Some("d1"));
    }

    #[test]
    fn test_placeholder_parent_filled_in_later() {
        let mut fs = seeded();
        // child arrives before its parent is known
        fs.ingest(&owned("f1", "d1", "b.txt", NodeKind::File, 1), &MASTER)
            .unwrap();
        let placeholder = fs.hash_lookup("d1").unwrap();
        assert_eq!(placeholder.kind(), NodeKind::Folder);
        assert!(placeholder.name().is_empty());
        assert_eq!(fs.children_of("d1").len(), 1);

        // the real record fills it in without dropping the child
        fs.ingest(&owned("d1", "root", "docs", NodeKind::Folder, 0), &MASTER)
            .unwrap();
        let parent = fs.hash_lookup("d1").unwrap();
        assert_eq!(parent.name(), "docs");
        assert_eq!(fs.children_of("d1").len(), 1);
    }

    #[test]
    fn test_remove_node() {
        let mut fs = seeded();
        fs.ingest(&owned("f1", "root", "b.txt", NodeKind::File, 1), &MASTER)
            .unwrap();
        assert!(fs.remove_node("f1"));
        assert!(fs.hash_lookup("f1").is_none());
        assert!(fs.children_of("root").is_empty());
        assert!(!fs.remove_node("f1"));
    }

    #[test]
    fn test_resolve_full_and_partial() {
        let mut fs = seeded();
        fs.ingest(&owned("d1", "root", "a", NodeKind::Folder, 0), &MASTER)
            .unwrap();
        fs.ingest(&owned("f1", "d1", "b.txt", NodeKind::File, 5), &MASTER)
            .unwrap();

        let (path, complete) =
            fs.resolve("root", &["a".to_string(), "b.txt".to_string()]);
        assert!(complete);
        assert_eq!(path.len(), 2);
        assert_eq!(path[1].name(), "b.txt");

        let (path, complete) =
            fs.resolve("root", &["a".to_string(), "missing".to_string()]);
        assert!(!complete);
        assert_eq!(path.len(), 1);

        let (path, complete) = fs.resolve("root", &[]);
        assert!(complete);
        assert!(path.is_empty());
    }

    #[test]
    fn test_bad_attribute_is_tolerated() {
        let mut fs = seeded();
        let mut rec = owned("f1", "root", "b.txt", NodeKind::File, 1);
        rec.attr = b64::encode(&[0u8; 32]);
        fs.ingest(&rec, &MASTER).unwrap();
        assert_eq!(fs.hash_lookup("f1").unwrap().name(), BAD_ATTRIBUTE);
    }

    #[test]
    fn test_share_root_and_inherited_node() {
        let mut fs = seeded();

        // the share key as the sharing user generated it
        let sk: [u8; 16] = [5u8; 16];
        let mut sk_enc = sk.to_vec();
        ecb_encrypt_in_place(&MASTER, &mut sk_enc);
        let sk_enc_b64 = b64::encode(&sk_enc);

        // share root: node key encrypted under the share key
        let compkey: [u32; 4] = [21, 22, 23, 24];
        let attr_key: [u8; 16] = a32_to_bytes(&compkey).try_into().unwrap();
        let attr = encrypt_attr(&attr_key, &NodeAttr::new("shared")).unwrap();
        let mut key_buf = a32_to_bytes(&compkey);
        ecb_encrypt_in_place(&sk, &mut key_buf);
        let sroot = FileNode {
            hash: "s1".to_string(),
            parent: "root".to_string(),
            user: "me".to_string(),
            kind: 1,
            attr,
            key: format!("friend:{}", b64::encode(&key_buf)),
            share_user: "friend".to_string(),
            share_key: sk_enc_b64,
            ..FileNode::default()
        };
        fs.ingest(&sroot, &MASTER).unwrap();
        assert_eq!(fs.hash_lookup("s1").unwrap().name(), "shared");
        assert_eq!(fs.shared_roots().len(), 1);

        // a file inside the share: owner field names the share root
        let fkey: [u32; 8] = [31, 32, 33, 34, 35, 36, 37, 38];
        let eff: [u8; 16] = a32_to_bytes(&[
            fkey[0] ^ fkey[4],
            fkey[1] ^ fkey[5],
            fkey[2] ^ fkey[6],
            fkey[3] ^ fkey[7],
        ])
        .try_into()
        .unwrap();
        let attr = encrypt_attr(&eff, &NodeAttr::new("inner.txt")).unwrap();
        let mut key_buf = a32_to_bytes(&fkey);
        ecb_encrypt_in_place(&sk, &mut key_buf);
        let inherited = FileNode {
            hash: "s2".to_string(),
            parent: "s1".to_string(),
            user: "friend".to_string(),
            kind: 0,
            attr,
            key: format!("s1:{}", b64::encode(&key_buf)),
            size: 9,
            ..FileNode::default()
        };
        fs.ingest(&inherited, &MASTER).unwrap();
        assert_eq!(fs.hash_lookup("s2").unwrap().name(), "inner.txt");
    }

    #[test]
    fn test_inherited_node_without_share_key_fails() {
        let mut fs = seeded();
        let rec = FileNode {
            hash: "x".to_string(),
            parent: "root".to_string(),
            user: "friend".to_string(),
            kind: 0,
            key: format!("unknown:{}", b64::encode(&[0u8; 32])),
            ..FileNode::default()
        };
        assert!(matches!(
            fs.ingest(&rec, &MASTER),
            Err(Error::MissingShareKey(_))
        ));
    }
}
