//! Resource strings: `mega:/segment/segment[/]` or `trash:/…`.

use common::fs::RootBase;

use crate::client::ClientError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    Cloud,
    Trash,
}

impl Namespace {
    pub fn base(&self) -> RootBase {
        match self {
            Namespace::Cloud => RootBase::Cloud,
            Namespace::Trash => RootBase::Trash,
        }
    }
}

/// A parsed resource string. `dir_like` records whether the raw input
/// ended in a slash, which several operations use to tell "the
/// container itself" apart from "an entry inside it".
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub namespace: Namespace,
    pub segments: Vec<String>,
    pub dir_like: bool,
}

impl Resource {
    pub fn parse(resource: &str) -> Result<Self, ClientError> {
        let resource = resource.trim();
        let (namespace, path) = resource.split_once(':').ok_or(ClientError::InvalidPath)?;
        if !path.starts_with('/') {
            return Err(ClientError::InvalidPath);
        }
        let namespace = match namespace {
            "mega" => Namespace::Cloud,
            "trash" => Namespace::Trash,
            _ => return Err(ClientError::InvalidPath),
        };

        let mut segments: Vec<String> = path.split('/').skip(1).map(str::to_string).collect();

        // one empty trailing segment comes from an ordinary trailing
        // slash; a second one (as in `mega:/a//`) additionally swallows
        // the segment before it, preserving the historical behavior
        if segments.last().is_some_and(|s| s.is_empty()) {
            segments.pop();
        }
        if segments.last().is_some_and(|s| s.is_empty()) {
            if segments.len() == 1 {
                segments.clear();
            } else {
                segments.truncate(segments.len() - 2);
            }
        }

        Ok(Self {
            namespace,
            segments,
            dir_like: path.ends_with('/'),
        })
    }

    pub fn base(&self) -> RootBase {
        self.namespace.base()
    }

    pub fn last_segment(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }
}
