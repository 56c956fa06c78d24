use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use crate::foundation::error::{AnimError, AnimResult};

const FILE_URI_SCHEME: &str = "file://";

/// Where the bytes of an animation come from.
#[derive(Clone, Debug)]
pub enum GifSource {
    /// In-memory stream; identified by content.
    Bytes(Arc<[u8]>),
    /// Local file; relative paths resolve against [`crate::CacheOpts::base_dir`].
    File(PathBuf),
    /// URI; only `file://` URIs are resolvable.
    Uri(String),
}

impl GifSource {
    /// Wrap an owned or shared byte buffer.
    pub fn bytes(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self::Bytes(bytes.into())
    }

    /// Local file path.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File(path.into())
    }
}

/// Canonical identity of a source; equal keys share one cache entry.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SourceKey {
    /// Absolute, lexically normalized file path.
    File(PathBuf),
    /// xxh3-128 content hash and length of an in-memory buffer.
    Buffer {
        /// 128-bit content hash.
        hash: u128,
        /// Buffer length in bytes.
        len: usize,
    },
}

impl std::fmt::Display for SourceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File(p) => write!(f, "file:{}", p.display()),
            Self::Buffer { hash, len } => write!(f, "buffer:{hash:032x}/{len}"),
        }
    }
}

/// Compute the canonical key of `source`.
pub(crate) fn resolve_key(source: &GifSource, base_dir: Option<&Path>) -> AnimResult<SourceKey> {
    match source {
        GifSource::Bytes(b) => Ok(buffer_key(b)),
        GifSource::File(p) => resolve_path(p, base_dir).map(SourceKey::File),
        GifSource::Uri(uri) => resolve_path(&file_uri_path(uri)?, base_dir).map(SourceKey::File),
    }
}

/// Load the bytes behind `source`, whose key is `key`.
pub(crate) fn load_bytes(source: &GifSource, key: &SourceKey) -> AnimResult<Arc<[u8]>> {
    use anyhow::Context as _;

    match (source, key) {
        (GifSource::Bytes(b), _) => Ok(Arc::clone(b)),
        (_, SourceKey::File(path)) => {
            let bytes = std::fs::read(path)
                .with_context(|| format!("failed to read gif '{}'", path.display()))?;
            Ok(bytes.into())
        }
        (_, SourceKey::Buffer { .. }) => Err(AnimError::unsupported(
            "buffer key without an in-memory source",
        )),
    }
}

pub(crate) fn buffer_key(bytes: &[u8]) -> SourceKey {
    SourceKey::Buffer {
        hash: xxhash_rust::xxh3::xxh3_128(bytes),
        len: bytes.len(),
    }
}

fn file_uri_path(uri: &str) -> AnimResult<PathBuf> {
    let Some(rest) = uri.strip_prefix(FILE_URI_SCHEME) else {
        return Err(AnimError::unsupported(format!(
            "only file:// URIs can be resolved, got '{uri}'"
        )));
    };
    let rest = rest.strip_prefix("localhost").unwrap_or(rest);
    if !rest.starts_with('/') {
        return Err(AnimError::unsupported(format!(
            "file URI must carry an absolute path, got '{uri}'"
        )));
    }
    Ok(PathBuf::from(rest))
}

/// Absolute, lexically normalized form of `path`.
///
/// `.` segments are dropped and `..` removes the previous segment; `..` never climbs above the
/// root. The filesystem is not consulted.
pub(crate) fn resolve_path(path: &Path, base_dir: Option<&Path>) -> AnimResult<PathBuf> {
    if path.as_os_str().is_empty() {
        return Err(AnimError::unsupported("gif path must be non-empty"));
    }
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        match base_dir {
            Some(base) if base.is_absolute() => base.join(path),
            Some(base) => {
                return Err(AnimError::unsupported(format!(
                    "base directory '{}' must be absolute",
                    base.display()
                )));
            }
            None => {
                return Err(AnimError::unsupported(format!(
                    "relative gif path '{}' needs a base directory",
                    path.display()
                )));
            }
        }
    };
    Ok(normalize_lexically(&joined))
}

fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(out.components().next_back(), Some(Component::Normal(_))) {
                    out.pop();
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/cache/source.rs"]
mod tests;
