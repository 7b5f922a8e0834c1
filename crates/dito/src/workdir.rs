//! Read-only file access relative to a working directory.
//!
//! File-backed matchers and responses never touch the filesystem directly;
//! they go through a [`WorkDir`] so the DSL is independent of where the
//! files actually live.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::io;
use std::path::{Component, Path, PathBuf};

#[async_trait]
pub trait WorkDir: Send + Sync {
    /// Read a whole file. Used while serving requests.
    async fn read(&self, path: &str) -> io::Result<Bytes>;

    /// Read a whole file synchronously. Used while compiling rules.
    fn read_blocking(&self, path: &str) -> io::Result<Bytes>;
}

/// Files below a directory on disk.
///
/// Paths must be relative and may not climb out of the root.
#[derive(Debug, Clone)]
pub struct DirWorkDir {
    root: PathBuf,
}

impl DirWorkDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> io::Result<PathBuf> {
        let relative = Path::new(path);
        let escapes = relative.components().any(|c| {
            matches!(
                c,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        });
        if escapes || path.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("invalid path '{path}': must be relative to the working directory"),
            ));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl WorkDir for DirWorkDir {
    async fn read(&self, path: &str) -> io::Result<Bytes> {
        let resolved = self.resolve(path)?;
        tokio::fs::read(resolved).await.map(Bytes::from)
    }

    fn read_blocking(&self, path: &str) -> io::Result<Bytes> {
        let resolved = self.resolve(path)?;
        std::fs::read(resolved).map(Bytes::from)
    }
}

/// In-memory files, handy for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryWorkDir {
    files: HashMap<String, Bytes>,
}

impl MemoryWorkDir {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<String>, contents: impl Into<Bytes>) -> Self {
        self.files.insert(path.into(), contents.into());
        self
    }

    fn lookup(&self, path: &str) -> io::Result<Bytes> {
        self.files.get(path).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("file '{path}' not found"))
        })
    }
}

#[async_trait]
impl WorkDir for MemoryWorkDir {
    async fn read(&self, path: &str) -> io::Result<Bytes> {
        self.lookup(path)
    }

    fn read_blocking(&self, path: &str) -> io::Result<Bytes> {
        self.lookup(path)
    }
}
