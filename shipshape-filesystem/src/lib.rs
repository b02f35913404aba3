//! Provides an abstract [`Filesystem`] trait, together with a physical
//! ([`DiskFilesystem`]) and virtual ([`MemoryFilesystem`]) implementation,
//! and the permission model shared by both.
#![warn(missing_docs)]

use camino::{Utf8Path, Utf8PathBuf};

mod attributes;
mod memory;
mod physical;

pub use self::{
    attributes::{
        compute_mode, Attrs, BaseType, Mode, Perms, PermsError, SetAttrs, DEFAULT_DIRECTORY_MODE,
        DEFAULT_FILE_MODE,
    },
    memory::MemoryFilesystem,
    physical::DiskFilesystem,
};

/// What kind of node occupies a path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// A regular file
    File,
    /// A directory
    Directory,
    /// A symbolic link
    Symlink,
    /// Any other object (socket, fifo, device)
    Other,
}

/// A classified failure from a filesystem or identity operation
#[derive(thiserror::Error, Debug)]
pub enum FsError {
    /// The path does not exist
    #[error("no such path: {0}")]
    NotFound(Utf8PathBuf),

    /// The operating system rejected the operation
    #[error("permission denied: {0}")]
    PermissionDenied(Utf8PathBuf),

    /// A node of the wrong type occupies the path
    #[error("{detail}: {path}")]
    TypeMismatch {
        /// The path holding the unexpected node
        path: Utf8PathBuf,
        /// What was wrong with it
        detail: &'static str,
    },

    /// No user with the given name exists
    #[error("no such user: {0}")]
    UnknownUser(String),

    /// No group with the given name exists
    #[error("no such group: {0}")]
    UnknownGroup(String),

    /// Any other I/O failure
    #[error("{path}: {source}")]
    Io {
        /// The path the operation was applied to
        path: Utf8PathBuf,
        /// The underlying error
        source: std::io::Error,
    },
}

/// Operations of a file system
///
/// Paths are expected to be absolute; relative paths are the caller's
/// mistake and surface as [`FsError::NotFound`].
pub trait Filesystem {
    /// Returns what occupies `path`, inspected without following a symlink
    /// at the leaf, or `None` if nothing does
    fn node_kind(&self, path: impl AsRef<Utf8Path>) -> Option<NodeKind>;

    /// Create a directory at the given path
    fn create_directory(&mut self, path: impl AsRef<Utf8Path>) -> Result<(), FsError>;

    /// Create a symlink pointing to the given target
    fn create_symlink(
        &mut self,
        path: impl AsRef<Utf8Path>,
        target: impl AsRef<Utf8Path>,
    ) -> Result<(), FsError>;

    /// Reads the path pointed to by the given symbolic link
    fn read_link(&self, path: impl AsRef<Utf8Path>) -> Result<Utf8PathBuf, FsError>;

    /// Reads the contents of the given file
    fn read_file(&self, path: impl AsRef<Utf8Path>) -> Result<String, FsError>;

    /// Writes a file with the given content, replacing any previous content
    fn write_file(&mut self, path: impl AsRef<Utf8Path>, content: &str) -> Result<(), FsError>;

    /// Copies a file's content and permission bits to a new path
    fn copy_file(
        &mut self,
        from: impl AsRef<Utf8Path>,
        to: impl AsRef<Utf8Path>,
    ) -> Result<(), FsError>;

    /// Unlinks the node at the given path; refuses directories
    fn remove(&mut self, path: impl AsRef<Utf8Path>) -> Result<(), FsError>;

    /// Renames a node over to a new path
    fn rename(
        &mut self,
        from: impl AsRef<Utf8Path>,
        to: impl AsRef<Utf8Path>,
    ) -> Result<(), FsError>;

    /// Returns the owner, group and mode of the given node
    ///
    /// Symlinks are followed. An owner or group whose id has no known name
    /// is reported as the decimal id, after logging an error.
    fn attributes(&self, path: impl AsRef<Utf8Path>) -> Result<Attrs, FsError>;

    /// Resolves the owner and group names and applies ownership and mode
    /// to the given node, following symlinks
    fn set_attributes(&mut self, path: impl AsRef<Utf8Path>, attrs: SetAttrs)
        -> Result<(), FsError>;

    /// Returns true if anything occupies the path (symlinks not followed)
    fn exists(&self, path: impl AsRef<Utf8Path>) -> bool {
        self.node_kind(path).is_some()
    }
}
