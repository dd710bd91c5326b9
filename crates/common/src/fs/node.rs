use crate::crypto::words::{a32_to_bytes, bytes_to_a32};

/// Replacement name for nodes whose attribute blob fails to decrypt.
pub const BAD_ATTRIBUTE: &str = "BAD ATTRIBUTE";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    File,
    Folder,
    Root,
    Inbox,
    Trash,
}

impl NodeKind {
    pub fn from_i64(t: i64) -> Option<Self> {
        match t {
            0 => Some(Self::File),
            1 => Some(Self::Folder),
            2 => Some(Self::Root),
            3 => Some(Self::Inbox),
            4 => Some(Self::Trash),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> i64 {
        match self {
            Self::File => 0,
            Self::Folder => 1,
            Self::Root => 2,
            Self::Inbox => 3,
            Self::Trash => 4,
        }
    }

    /// Whether children may be attached under this node.
    pub fn is_container(&self) -> bool {
        !matches!(self, Self::File)
    }
}

/// Decrypted key material attached to a node. Files carry the effective
/// AES key plus the IV and MAC words folded into the composite key;
/// folders carry just the key (their composite key equals it). The full
/// composite key is retained for link export and re-keying on rename.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeMeta {
    None,
    Folder {
        key: [u8; 16],
        compkey: [u8; 16],
    },
    File {
        key: [u8; 16],
        iv: [u8; 8],
        mac: [u8; 8],
        compkey: [u8; 32],
    },
}

impl NodeMeta {
    /// The AES key attributes are encrypted under, if any.
    pub fn attr_key(&self) -> Option<[u8; 16]> {
        match self {
            NodeMeta::File { key, .. } | NodeMeta::Folder { key, .. } => Some(*key),
            NodeMeta::None => None,
        }
    }

    pub fn compkey(&self) -> Option<&[u8]> {
        match self {
            NodeMeta::File { compkey, .. } => Some(compkey),
            NodeMeta::Folder { compkey, .. } => Some(compkey),
            NodeMeta::None => None,
        }
    }

    /// The two IV words of a file key.
    pub fn iv_words(&self) -> Option<[u32; 2]> {
        match self {
            NodeMeta::File { iv, .. } => {
                let w = bytes_to_a32(iv);
                Some([w[0], w[1]])
            }
            _ => None,
        }
    }
}

/// One node of the remote filesystem. Parent and children are referenced
/// by hash; the index owning all nodes lives in
/// [`FileSystem`](super::FileSystem).
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) hash: String,
    pub(crate) name: String,
    pub(crate) kind: NodeKind,
    pub(crate) size: u64,
    pub(crate) ts: i64,
    pub(crate) parent: Option<String>,
    pub(crate) children: Vec<String>,
    pub(crate) meta: NodeMeta,
}

impl Node {
    pub(crate) fn placeholder(hash: String) -> Self {
        Self {
            hash,
            name: String::new(),
            kind: NodeKind::Folder,
            size: 0,
            ts: 0,
            parent: None,
            children: Vec::new(),
            meta: NodeMeta::None,
        }
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Modification time, unix seconds.
    pub fn timestamp(&self) -> i64 {
        self.ts
    }

    pub fn parent_hash(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub fn children(&self) -> &[String] {
        &self.children
    }

    pub fn meta(&self) -> &NodeMeta {
        &self.meta
    }
}

/// Build the file meta from the 8-word composite key: the effective key
/// is the XOR of the two halves, the IV is words 4-5, the MAC words 6-7.
pub(crate) fn file_meta(compkey: &[u32]) -> NodeMeta {
    let key = [
        compkey[0] ^ compkey[4],
        compkey[1] ^ compkey[5],
        compkey[2] ^ compkey[6],
        compkey[3] ^ compkey[7],
    ];
    NodeMeta::File {
        key: a32_to_bytes(&key).try_into().expect("4 words"),
        iv: a32_to_bytes(&[compkey[4], compkey[5]])
            .try_into()
            .expect("2 words"),
        mac: a32_to_bytes(&[compkey[6], compkey[7]])
            .try_into()
            .expect("2 words"),
        compkey: a32_to_bytes(compkey).try_into().expect("8 words"),
    }
}

pub(crate) fn folder_meta(compkey: &[u32]) -> NodeMeta {
    let key: [u8; 16] = a32_to_bytes(compkey).try_into().expect("4 words");
    NodeMeta::Folder { key, compkey: key }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trip() {
        for t in 0..5 {
            assert_eq!(NodeKind::from_i64(t).unwrap().as_i64(), t);
        }
        assert!(NodeKind::from_i64(5).is_none());
        assert!(NodeKind::from_i64(-1).is_none());
    }

    #[test]
    fn test_file_meta_derivation() {
        let compkey = [1, 2, 3, 4, 5, 6, 7, 8];
        let meta = file_meta(&compkey);
        let NodeMeta::File { key, iv, mac, compkey: ck } = meta else {
            panic!("expected file meta");
        };
        assert_eq!(bytes_to_a32(&key), vec![1 ^ 5, 2 ^ 6, 3 ^ 7, 4 ^ 8]);
        assert_eq!(bytes_to_a32(&iv), vec![5, 6]);
        assert_eq!(bytes_to_a32(&mac), vec![7, 8]);
        assert_eq!(bytes_to_a32(&ck), compkey);
    }

    #[test]
    fn test_folder_meta_compkey_equals_key() {
        let meta = folder_meta(&[9, 10, 11, 12]);
        let NodeMeta::Folder { key, compkey } = meta else {
            panic!("expected folder meta");
        };
        assert_eq!(key, compkey);
    }
}
