//! Translation between hierarchical paths and flat object keys.
//!
//! A qualified path looks like `scheme://container/seg/seg`. The host names
//! the container, the remaining segments joined by `/` form the object key.
//! The root of a container maps to the empty key.

use std::fmt;
use std::str::FromStr;

use bucketfs_common::error::{FsError, Result};
use percent_encoding::percent_decode_str;
use url::Url;

pub const SEPARATOR: char = '/';

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FsPath {
    authority: Option<(String, String)>,
    absolute: bool,
    segments: Vec<String>,
}

impl FsPath {
    /// Root of `container` under `scheme`.
    pub fn root(scheme: &str, container: &str) -> Self {
        Self {
            authority: Some((scheme.to_string(), container.to_string())),
            absolute: true,
            segments: Vec::new(),
        }
    }

    pub fn scheme(&self) -> Option<&str> {
        self.authority.as_ref().map(|(scheme, _)| scheme.as_str())
    }

    pub fn container(&self) -> Option<&str> {
        self.authority.as_ref().map(|(_, container)| container.as_str())
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_qualified(&self) -> bool {
        self.authority.is_some()
    }

    pub fn is_absolute(&self) -> bool {
        self.absolute
    }

    pub fn is_root(&self) -> bool {
        self.absolute && self.segments.is_empty()
    }

    /// Last segment, empty for the root.
    pub fn name(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or("")
    }

    pub fn parent(&self) -> Option<FsPath> {
        if self.segments.is_empty() {
            return None;
        }
        let mut parent = self.clone();
        parent.segments.pop();
        Some(parent)
    }

    pub fn child(&self, name: &str) -> FsPath {
        let mut child = self.clone();
        child
            .segments
            .extend(name.split(SEPARATOR).filter(|s| !s.is_empty()).map(str::to_string));
        child
    }

    /// Strict ancestors, nearest first, ending at the root.
    pub fn ancestors(&self) -> impl Iterator<Item = FsPath> {
        std::iter::successors(self.parent(), FsPath::parent)
    }

    /// Whether `self` is a strict ancestor of `other`.
    pub fn is_ancestor_of(&self, other: &FsPath) -> bool {
        other.ancestors().any(|ancestor| ancestor == *self)
    }
}

impl FromStr for FsPath {
    type Err = FsError;

    fn from_str(value: &str) -> Result<Self> {
        if value.contains("://") {
            return parse_uri(value);
        }
        if value.is_empty() {
            return Err(FsError::InvalidPath("empty path".to_string()));
        }
        Ok(Self {
            authority: None,
            absolute: value.starts_with(SEPARATOR),
            segments: split_segments(value.split(SEPARATOR).map(str::to_string)),
        })
    }
}

impl fmt::Display for FsPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some((scheme, container)) = &self.authority {
            write!(f, "{scheme}://{container}")?;
        }
        if self.absolute {
            write!(f, "/")?;
        }
        write!(f, "{}", self.segments.join("/"))
    }
}

fn parse_uri(value: &str) -> Result<FsPath> {
    let url = Url::parse(value).map_err(|err| FsError::InvalidPath(format!("{value}: {err}")))?;
    let container = url
        .host_str()
        .filter(|host| !host.is_empty())
        .ok_or_else(|| FsError::InvalidPath(format!("{value}: missing container")))?;

    let mut raw = Vec::new();
    for segment in url.path_segments().into_iter().flatten() {
        let decoded = percent_decode_str(segment)
            .decode_utf8()
            .map_err(|err| FsError::InvalidPath(format!("{value}: {err}")))?;
        // An encoded separator still separates segments.
        raw.extend(decoded.split(SEPARATOR).map(str::to_string));
    }

    Ok(FsPath {
        authority: Some((url.scheme().to_string(), container.to_string())),
        absolute: true,
        segments: split_segments(raw),
    })
}

/// Drops empty and `.` segments and folds `..` into its predecessor.
/// Leading `..` segments of a relative path are kept for later qualification.
fn split_segments<I>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut segments: Vec<String> = Vec::new();
    for segment in raw {
        match segment.as_str() {
            "" | "." => {}
            ".." => match segments.last().map(String::as_str) {
                Some("..") | None => segments.push(segment),
                Some(_) => {
                    segments.pop();
                }
            },
            _ => segments.push(segment),
        }
    }
    segments
}

/// Resolves `path` against the fixed `working_dir`, which must be qualified.
pub fn qualify(path: &FsPath, working_dir: &FsPath) -> FsPath {
    let authority = path
        .authority
        .clone()
        .or_else(|| working_dir.authority.clone());

    let raw: Vec<String> = if path.absolute {
        path.segments.clone()
    } else {
        working_dir
            .segments
            .iter()
            .chain(path.segments.iter())
            .cloned()
            .collect()
    };

    // `..` above the root stays at the root.
    let segments = split_segments(raw)
        .into_iter()
        .filter(|segment| segment != "..")
        .collect();

    FsPath {
        authority,
        absolute: true,
        segments,
    }
}

/// Object key of a qualified path; the empty string denotes the root.
pub fn to_key(path: &FsPath) -> String {
    path.segments.join("/")
}

/// Prefix form of a key under which its descendants are stored.
pub fn dir_key(key: &str) -> String {
    if key.is_empty() {
        String::new()
    } else {
        format!("{key}{SEPARATOR}")
    }
}

/// Key of `name` placed inside the directory whose key is `parent`.
pub fn join_key(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}{SEPARATOR}{name}")
    }
}

/// Last segment of a key.
pub fn basename(key: &str) -> &str {
    let trimmed = key.trim_end_matches(SEPARATOR);
    trimmed.rsplit(SEPARATOR).next().unwrap_or(trimmed)
}

/// Reverse mapping of a key within the container `anchor` belongs to.
pub fn key_to_path(anchor: &FsPath, key: &str) -> FsPath {
    FsPath {
        authority: anchor.authority.clone(),
        absolute: true,
        segments: split_segments(key.split(SEPARATOR).map(str::to_string)),
    }
}
