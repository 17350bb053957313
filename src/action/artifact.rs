// src/action/artifact.rs

//! Build-graph handles to files and directories.
//!
//! An [`Artifact`] is identified by its root and its root-relative path. Its
//! *declared* shape ([`DeclaredShape`]) is fixed when the graph is built; its
//! *actual* shape on disk is only known by probing the filesystem at
//! validation time and is never cached here.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Whether a root holds checked-in sources or generated outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RootKind {
    Source,
    Output,
}

/// The directory an artifact's path is relative to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArtifactRoot {
    path: Arc<Path>,
    kind: RootKind,
}

impl ArtifactRoot {
    pub fn source(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Arc::from(path.into()),
            kind: RootKind::Source,
        }
    }

    pub fn output(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Arc::from(path.into()),
            kind: RootKind::Output,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> RootKind {
        self.kind
    }

    pub fn is_source(&self) -> bool {
        self.kind == RootKind::Source
    }
}

/// Statically declared shape of an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DeclaredShape {
    /// A regular file. Directory-shape checks apply.
    File,
    /// A directory ("tree artifact"). Exempt from the regular-file checks.
    Tree,
}

/// Immutable handle to a file or directory node of the build graph.
///
/// Cloning is cheap; all clones share the same path storage and compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Artifact {
    root: ArtifactRoot,
    path: Arc<Path>,
    shape: DeclaredShape,
}

impl Artifact {
    pub fn new(root: ArtifactRoot, path: impl Into<PathBuf>, shape: DeclaredShape) -> Self {
        Self {
            root,
            path: Arc::from(path.into()),
            shape,
        }
    }

    /// A regular-file artifact.
    pub fn file(root: ArtifactRoot, path: impl Into<PathBuf>) -> Self {
        Self::new(root, path, DeclaredShape::File)
    }

    /// A directory-shaped (tree) artifact.
    pub fn tree(root: ArtifactRoot, path: impl Into<PathBuf>) -> Self {
        Self::new(root, path, DeclaredShape::Tree)
    }

    pub fn root(&self) -> &ArtifactRoot {
        &self.root
    }

    /// Path relative to [`root`](Self::root).
    pub fn root_relative_path(&self) -> &Path {
        &self.path
    }

    /// Path as seen from the execution root.
    ///
    /// A root of `""` or `"."` is elided so that diagnostics name `a.txt`
    /// rather than `./a.txt`.
    pub fn exec_path(&self) -> PathBuf {
        let root = self.root.path();
        if root.as_os_str().is_empty() || root == Path::new(".") {
            self.path.to_path_buf()
        } else {
            root.join(&self.path)
        }
    }

    pub fn shape(&self) -> DeclaredShape {
        self.shape
    }

    pub fn is_tree(&self) -> bool {
        self.shape == DeclaredShape::Tree
    }

    pub fn is_source_file(&self) -> bool {
        self.root.is_source()
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.exec_path().display())
    }
}
