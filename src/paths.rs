//! Sandboxed path resolution for chunk and final-artifact directories
//!
//! The only module that interprets client-supplied path strings. Every
//! resolved directory is guaranteed to sit under the configured chunk or
//! final storage root.

use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result};

/// Maps `(identifier, relative_path)` pairs onto sandboxed on-disk
/// directories and creates them idempotently.
#[derive(Debug)]
pub struct PathResolver {
    chunk_root: PathBuf,
    final_root: PathBuf,
}

impl PathResolver {
    /// Create a resolver over the two storage roots
    pub fn new(chunk_root: impl Into<PathBuf>, final_root: impl Into<PathBuf>) -> Self {
        Self {
            chunk_root: chunk_root.into(),
            final_root: final_root.into(),
        }
    }

    /// The chunk storage root
    pub fn chunk_root(&self) -> &Path {
        &self.chunk_root
    }

    /// The final artifact storage root
    pub fn final_root(&self) -> &Path {
        &self.final_root
    }

    /// Resolve (and create) the chunk directory for one transfer:
    /// `<chunk_root>/<identifier>/<relative dirs>/`
    pub async fn resolve_chunk_dir(&self, identifier: &str, relative_path: &str) -> Result<PathBuf> {
        let identifier = sanitize_segment(identifier)?;
        let relative_dir = relative_dir(relative_path)?;
        let dir = self.chunk_root.join(identifier).join(relative_dir);
        tokio::fs::create_dir_all(&dir).await?;
        Ok(dir)
    }

    /// Resolve (and create) the final destination directory for one transfer:
    /// `<final_root>/<relative dirs>/` (no identifier subtree)
    pub async fn resolve_final_dir(&self, relative_path: &str) -> Result<PathBuf> {
        let relative_dir = relative_dir(relative_path)?;
        let dir = self.final_root.join(relative_dir);
        tokio::fs::create_dir_all(&dir).await?;
        Ok(dir)
    }
}

/// Normalize a client-supplied relative path, rejecting anything that could
/// escape a storage root.
///
/// Rejects empty paths, absolute paths (Unix `/` or Windows prefixes), and
/// any `..` segment; `.` segments are dropped.
pub fn sanitize_relative(relative_path: &str) -> Result<PathBuf> {
    if relative_path.trim().is_empty() {
        return Err(Error::MissingParameter {
            name: "relativePath".into(),
        });
    }

    let path = Path::new(relative_path);
    if path.is_absolute() {
        return Err(reject(relative_path));
    }

    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(segment) => normalized.push(segment),
            Component::CurDir => {}
            Component::ParentDir | Component::Prefix(_) | Component::RootDir => {
                return Err(reject(relative_path));
            }
        }
    }

    if normalized.as_os_str().is_empty() {
        return Err(reject(relative_path));
    }
    Ok(normalized)
}

/// The directory component of a normalized relative path (empty when the
/// file sits directly under the root).
pub fn relative_dir(relative_path: &str) -> Result<PathBuf> {
    let normalized = sanitize_relative(relative_path)?;
    Ok(normalized
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default())
}

/// Validate an opaque value that must be a single sane path segment
/// (the transfer identifier).
pub fn sanitize_segment(value: &str) -> Result<&str> {
    if value.trim().is_empty() {
        return Err(Error::MissingParameter {
            name: "identifier".into(),
        });
    }
    if value == "." || value == ".." || value.contains('/') || value.contains('\\') {
        return Err(reject(value));
    }
    Ok(value)
}

/// Reduce a client-supplied filename to a safe leaf name, discarding any
/// directory components it may carry.
pub fn sanitize_leaf(filename: &str) -> Result<String> {
    let sanitized = sanitize_relative(filename)?;
    let leaf = sanitized
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| reject(filename))?;
    Ok(leaf.to_string())
}

fn reject(path: &str) -> Error {
    tracing::warn!(path = %path, "rejected path escaping storage root");
    Error::PathTraversal { path: path.into() }
}
