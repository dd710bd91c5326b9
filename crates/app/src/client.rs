//! Path-resolving operations over a [`Mega`] handle: listing,
//! transfers with conflict policy, move/rename, mkdir and sync.

use std::fmt;
use std::path::{Path, PathBuf};

use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tokio::task::JoinHandle;
use walkdir::WalkDir;

use common::error::Error as MegaError;
use common::fs::{Node, NodeKind};
use common::prelude::{Mega, Progress};

use crate::config::Config;
use crate::path::Resource;
use crate::progress::spawn_renderer;

const PATH_WIDTH: usize = 50;
const SIZE_WIDTH: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid mega path")]
    InvalidPath,
    #[error("requested object is not a file")]
    NotFile,
    #[error("invalid destination path")]
    InvalidDest,
    #[error("invalid source path")]
    InvalidSrc,
    #[error("invalid sync command parameters")]
    InvalidSync,
    #[error("a non-directory exists at this path")]
    NotDirectory,
    #[error("file with same name already exists")]
    FileExists,
    #[error("directory with same name already exists")]
    DirExists,
    #[error("object not found")]
    NotFound,
    #[error(transparent)]
    Mega(#[from] MegaError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// One listing or sync entry: path segments under a string prefix.
#[derive(Debug, Clone)]
pub struct RemotePath {
    pub prefix: String,
    pub segments: Vec<String>,
    pub kind: NodeKind,
    pub size: u64,
    pub ts: i64,
}

impl RemotePath {
    /// Prefix-qualified path string; containers carry a trailing slash.
    pub fn path(&self) -> String {
        let mut out = self.prefix.trim_end_matches('/').to_string();
        for segment in &self.segments {
            out.push('/');
            out.push_str(segment);
        }
        if self.kind.is_container() {
            out.push('/');
        }
        out
    }
}

impl fmt::Display for RemotePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<PATH_WIDTH$} {:<SIZE_WIDTH$} {}",
            self.path(),
            self.size,
            format_timestamp(self.ts),
        )
    }
}

fn format_timestamp(ts: i64) -> String {
    OffsetDateTime::from_unix_timestamp(ts)
        .ok()
        .and_then(|t| t.format(&Rfc3339).ok())
        .unwrap_or_else(|| "-".to_string())
}

pub struct MegaClient {
    mega: Mega,
    cfg: Config,
}

impl MegaClient {
    pub fn new(cfg: Config) -> Result<Self, ClientError> {
        let mega = Mega::new(cfg.options())?;
        Ok(Self { mega, cfg })
    }

    pub async fn login(&self) -> Result<(), ClientError> {
        self.mega.login(&self.cfg.user, &self.cfg.password).await?;
        Ok(())
    }

    async fn base_node(&self, res: &Resource) -> Result<Node, ClientError> {
        self.mega
            .filesystem()
            .base(res.base())
            .await
            .ok_or(ClientError::Mega(MegaError::NotLoggedIn))
    }

    async fn resolve(&self, res: &Resource) -> Result<(Vec<Node>, bool), ClientError> {
        self.mega
            .filesystem()
            .resolve(res.base(), &res.segments)
            .await
            .ok_or(ClientError::Mega(MegaError::NotLoggedIn))
    }

    /// Depth-first entries for `node` and (when `recursive`) its
    /// subtree. Every entry's segments start with the node's own name.
    async fn remote_paths(&self, node: &Node, recursive: bool) -> Vec<RemotePath> {
        let fs = self.mega.filesystem();
        let mut out = Vec::new();
        let mut stack = vec![(node.clone(), vec![node.name().to_string()])];
        while let Some((current, segments)) = stack.pop() {
            out.push(RemotePath {
                prefix: String::new(),
                segments: segments.clone(),
                kind: current.kind(),
                size: current.size(),
                ts: current.timestamp(),
            });
            if recursive && current.kind().is_container() {
                for child in fs.children_of(current.hash()).await {
                    let mut path = segments.clone();
                    path.push(child.name().to_string());
                    stack.push((child, path));
                }
            }
        }
        out
    }

    /// List a resource. A fully resolved target without a trailing slash
    /// yields a single info entry; anything else enumerates children.
    pub async fn list(&self, resource: &str) -> Result<Vec<RemotePath>, ClientError> {
        let res = Resource::parse(resource)?;
        let root = self.base_node(&res).await?;
        let (nodes, complete) = self.resolve(&res).await?;
        if !complete {
            return Err(ClientError::NotFound);
        }

        if !res.segments.is_empty() && !res.dir_like {
            let target = nodes.last().expect("non-empty resolved path");
            return Ok(vec![RemotePath {
                prefix: resource.to_string(),
                segments: Vec::new(),
                kind: target.kind(),
                size: target.size(),
                ts: target.timestamp(),
            }]);
        }

        let target = nodes.last().unwrap_or(&root);
        let mut paths = Vec::new();
        for child in self.mega.filesystem().children_of(target.hash()).await {
            for mut entry in self.remote_paths(&child, self.cfg.recursive).await {
                entry.prefix = resource.to_string();
                paths.push(entry);
            }
        }
        Ok(paths)
    }

    /// Delete a node; without `--force` it is moved to the trash.
    pub async fn delete(&self, resource: &str) -> Result<(), ClientError> {
        let res = Resource::parse(resource)?;
        if res.segments.is_empty() {
            return Err(ClientError::InvalidPath);
        }
        let (nodes, complete) = self.resolve(&res).await?;
        if !complete {
            return Err(ClientError::NotFound);
        }
        let node = nodes.last().expect("non-empty resolved path");
        self.mega.delete(node.hash(), self.cfg.force).await?;
        Ok(())
    }

    /// Move a node, renaming when the destination names a new final
    /// segment. A destination that exactly matches an existing file (or
    /// a folder without a trailing slash) is refused.
    pub async fn move_to(&self, src: &str, dst: &str) -> Result<(), ClientError> {
        let sres = Resource::parse(src)?;
        if sres.segments.is_empty() {
            return Err(ClientError::InvalidPath);
        }
        let (snodes, scomplete) = self.resolve(&sres).await?;
        if !scomplete {
            return Err(ClientError::NotFound);
        }
        let src_node = snodes.last().expect("non-empty resolved path");

        let dres = Resource::parse(dst)?;
        let droot = self.base_node(&dres).await?;
        let (dnodes, dcomplete) = self.resolve(&dres).await?;
        let lp = dres.segments.len();
        let ln = dnodes.len();

        let (parent_hash, rename) = if dcomplete {
            if lp == 0 {
                (droot.hash().to_string(), None)
            } else {
                let target = dnodes.last().expect("non-empty resolved path");
                match target.kind() {
                    NodeKind::Folder if dres.dir_like => (target.hash().to_string(), None),
                    NodeKind::Folder => return Err(ClientError::DirExists),
                    NodeKind::File => return Err(ClientError::FileExists),
                    _ => (target.hash().to_string(), None),
                }
            }
        } else if lp == ln + 1 {
            let parent = dnodes.last().unwrap_or(&droot);
            if !parent.kind().is_container() {
                return Err(ClientError::NotDirectory);
            }
            (
                parent.hash().to_string(),
                Some(dres.segments[lp - 1].clone()),
            )
        } else {
            return Err(ClientError::NotFound);
        };

        self.mega.move_node(src_node.hash(), &parent_hash).await?;
        if let Some(name) = rename {
            if name != src_node.name() {
                self.mega.rename(src_node.hash(), &name).await?;
            }
        }
        Ok(())
    }

    /// Download a remote file. Returns the number of bytes on disk.
    pub async fn get(&self, src: &str, dst: impl AsRef<Path>) -> Result<u64, ClientError> {
        let res = Resource::parse(src)?;
        if res.segments.is_empty() {
            return Err(ClientError::InvalidPath);
        }
        let (nodes, complete) = self.resolve(&res).await?;
        if !complete {
            return Err(ClientError::NotFound);
        }
        let node = nodes.last().expect("non-empty resolved path");
        if node.kind() != NodeKind::File {
            return Err(ClientError::NotFile);
        }

        let mut dst = dst.as_ref().to_path_buf();
        if dst.is_dir() {
            dst.push(res.last_segment().expect("non-empty segments"));
        }
        match std::fs::metadata(&dst) {
            Ok(existing) if existing.is_file() => {
                if self.cfg.skip_same_size && existing.len() == node.size() {
                    return Ok(node.size());
                }
                if self.cfg.force {
                    std::fs::remove_file(&dst)?;
                } else {
                    return Err(ClientError::FileExists);
                }
            }
            Ok(_) => return Err(ClientError::InvalidDest),
            Err(_) => {
                let parent = dst
                    .parent()
                    .filter(|p| !p.as_os_str().is_empty())
                    .unwrap_or_else(|| Path::new("."));
                if !parent.is_dir() {
                    return Err(ClientError::InvalidDest);
                }
            }
        }

        let (progress, renderer) = self.progress(node.size(), src, &dst.display().to_string());
        let result = self.mega.download_file(node.hash(), &dst, progress).await;
        if let Some(renderer) = renderer {
            let _ = renderer.await;
        }
        result?;
        Ok(node.size())
    }

    /// Upload a local file. The destination names either a container
    /// (name taken from the local file) or the final remote name.
    pub async fn put(&self, src: impl AsRef<Path>, dst: &str) -> Result<(), ClientError> {
        let src = src.as_ref();
        let src_meta = std::fs::metadata(src).map_err(|_| ClientError::InvalidSrc)?;
        if !src_meta.is_file() {
            return Err(ClientError::InvalidSrc);
        }

        let res = Resource::parse(dst)?;
        let root = self.base_node(&res).await?;
        let (nodes, complete) = self.resolve(&res).await?;
        let lp = res.segments.len();
        let ln = nodes.len();

        let (parent_hash, name) = if complete {
            let target = nodes.last().unwrap_or(&root);
            if target.kind() == NodeKind::File {
                // the destination is an existing file: upload beside it
                // under that name, subject to the conflict policy below
                let parent = target
                    .parent_hash()
                    .ok_or(ClientError::InvalidDest)?
                    .to_string();
                (parent, target.name().to_string())
            } else {
                let name = src
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .ok_or(ClientError::InvalidSrc)?;
                (target.hash().to_string(), name)
            }
        } else if lp == ln + 1 {
            let parent = nodes.last().unwrap_or(&root);
            if !parent.kind().is_container() {
                return Err(ClientError::NotDirectory);
            }
            (
                parent.hash().to_string(),
                res.segments[lp - 1].clone(),
            )
        } else {
            return Err(ClientError::NotFound);
        };

        let existing = self
            .mega
            .filesystem()
            .children_of(&parent_hash)
            .await
            .into_iter()
            .find(|c| c.name() == name);
        if let Some(existing) = existing {
            if self.cfg.skip_same_size
                && existing.kind() == NodeKind::File
                && existing.size() == src_meta.len()
            {
                return Ok(());
            }
            if self.cfg.force {
                self.mega.delete(existing.hash(), false).await?;
            } else {
                return Err(ClientError::FileExists);
            }
        }

        let (progress, renderer) =
            self.progress(src_meta.len(), &src.display().to_string(), dst);
        let result = self.mega.upload_file(&parent_hash, src, &name, progress).await;
        if let Some(renderer) = renderer {
            let _ = renderer.await;
        }
        result?;
        Ok(())
    }

    /// Create every missing folder along the path. Creating an existing
    /// folder is a no-op; a file along the way fails.
    pub async fn mkdir(&self, resource: &str) -> Result<(), ClientError> {
        let res = Resource::parse(resource)?;
        if res.segments.is_empty() {
            return Ok(());
        }
        let root = self.base_node(&res).await?;
        let (nodes, complete) = self.resolve(&res).await?;
        let deepest = nodes.last().unwrap_or(&root);

        if complete {
            if deepest.kind() == NodeKind::File {
                return Err(ClientError::NotDirectory);
            }
            return Ok(());
        }
        if !deepest.kind().is_container() {
            return Err(ClientError::NotDirectory);
        }

        let mut parent = deepest.hash().to_string();
        for segment in &res.segments[nodes.len()..] {
            parent = self.mega.create_dir(segment, &parent).await?;
        }
        Ok(())
    }

    /// Mirror one side to the other; exactly one side must be remote.
    pub async fn sync(&self, src: &str, dst: &str) -> Result<(), ClientError> {
        match (Resource::parse(src), Resource::parse(dst)) {
            (Ok(remote), Err(_)) => self.sync_down(src, &remote, Path::new(dst)).await,
            (Err(_), Ok(_)) => self.sync_up(Path::new(src), dst).await,
            _ => Err(ClientError::InvalidSync),
        }
    }

    async fn sync_down(
        &self,
        raw_src: &str,
        remote: &Resource,
        local_root: &Path,
    ) -> Result<(), ClientError> {
        let root = self.base_node(remote).await?;
        let (nodes, complete) = self.resolve(remote).await?;
        if !complete {
            return Err(ClientError::NotFound);
        }
        let target = nodes.last().unwrap_or(&root);

        let mut entries = Vec::new();
        for child in self.mega.filesystem().children_of(target.hash()).await {
            entries.extend(self.remote_paths(&child, true).await);
        }
        if self.cfg.verbose > 0 {
            tracing::info!("found {} entries to be copied", entries.len());
        }

        for entry in entries {
            let local: PathBuf = entry
                .segments
                .iter()
                .fold(local_root.to_path_buf(), |p, s| p.join(s));
            if entry.kind.is_container() {
                std::fs::create_dir_all(&local)?;
            } else {
                if let Some(parent) = local.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                let remote_file = join_resource(raw_src, &entry.segments);
                self.get(&remote_file, &local).await?;
            }
        }
        Ok(())
    }

    async fn sync_up(&self, local_root: &Path, raw_dst: &str) -> Result<(), ClientError> {
        let entries = local_paths(local_root, self.cfg.skip_error)?;
        if self.cfg.verbose > 0 {
            tracing::info!("found {} entries to be copied", entries.len());
        }

        for (segments, is_dir) in entries {
            let remote = join_resource(raw_dst, &segments);
            if is_dir {
                self.mkdir(&remote).await?;
            } else {
                self.mkdir(&join_resource(raw_dst, &segments[..segments.len() - 1]))
                    .await?;
                let local: PathBuf = segments
                    .iter()
                    .fold(local_root.to_path_buf(), |p, s| p.join(s));
                self.put(&local, &remote).await?;
            }
        }
        Ok(())
    }

    fn progress(&self, total: u64, src: &str, dst: &str) -> (Progress, Option<JoinHandle<()>>) {
        if self.cfg.verbose > 0 {
            let (progress, rx) = Progress::channel();
            let renderer = spawn_renderer(rx, total, src.to_string(), dst.to_string());
            (progress, Some(renderer))
        } else {
            (Progress::none(), None)
        }
    }
}

/// Append path segments to a resource string.
fn join_resource(base: &str, segments: &[String]) -> String {
    let mut out = base.trim_end_matches('/').to_string();
    for segment in segments {
        out.push('/');
        out.push_str(segment);
    }
    out
}

/// Walk a local tree into relative path segments, directories before
/// their contents. Unreadable entries are skipped when `skip_error` is
/// set; non-regular files are always skipped.
fn local_paths(root: &Path, skip_error: bool) -> Result<Vec<(Vec<String>, bool)>, ClientError> {
    let mut out = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if skip_error => {
                tracing::warn!(error = %e, "skipping unreadable entry");
                continue;
            }
            Err(e) => return Err(ClientError::Io(e.into())),
        };
        let rel = entry
            .path()
            .strip_prefix(root)
            .expect("walked entries live under the root");
        if rel.as_os_str().is_empty() {
            continue;
        }
        let file_type = entry.file_type();
        if !file_type.is_dir() && !file_type.is_file() {
            continue;
        }
        let segments: Vec<String> = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        out.push((segments, file_type.is_dir()));
    }
    Ok(out)
}
