// src/fs/mod.rs

//! Read-only filesystem queries used by artifact shape validation.
//!
//! Validation never touches `std::fs` directly; it goes through a
//! [`FilesystemProbe`] so tests can substitute [`mock::MockFileSystem`].

use std::fmt::Debug;
use std::path::{Path, PathBuf};

pub mod mock;

/// Side-effect-free queries over the filesystem a process ran against.
pub trait FilesystemProbe: Send + Sync + Debug {
    fn exists(&self, path: &Path) -> bool;
    fn is_file(&self, path: &Path) -> bool;
    fn is_dir(&self, path: &Path) -> bool;
}

/// Probe backed by `std::fs`, resolving relative paths against an
/// execution root.
#[derive(Debug, Clone)]
pub struct RealFileSystem {
    root: PathBuf,
}

impl RealFileSystem {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

impl Default for RealFileSystem {
    fn default() -> Self {
        Self::new(".")
    }
}

impl FilesystemProbe for RealFileSystem {
    fn exists(&self, path: &Path) -> bool {
        self.resolve(path).exists()
    }

    fn is_file(&self, path: &Path) -> bool {
        self.resolve(path).is_file()
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.resolve(path).is_dir()
    }
}
