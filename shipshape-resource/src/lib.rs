//! Desired-state descriptors for the four manageable resource kinds, and
//! the [`Report`] produced by verifying one against the disk.
#![warn(missing_docs)]

use std::fmt;

use base64::Engine as _;
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;

use shipshape_filesystem::Perms;

mod report;

pub use report::Report;

/// The four manageable filesystem object types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    /// A symbolic link
    SymLink,
    /// A directory
    Directory,
    /// Ownership and permissions of an existing object
    Permissions,
    /// A file whose full content is managed
    ConfigFile,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceKind::SymLink => "SymLink",
            ResourceKind::Directory => "Directory",
            ResourceKind::Permissions => "Permissions",
            ResourceKind::ConfigFile => "ConfigFile",
        };
        write!(f, "{name}")
    }
}

/// The owner, group and permissions a descriptor declares
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Ownership {
    /// Owning user, by name
    pub owner: String,
    /// Owning group, by name
    pub group: String,
    /// Permission string, canonicalized to four octal digits
    pub perms: Perms,
}

/// How declared file content is encoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    /// Content is the literal text
    #[default]
    Plain,
    /// Content is base64-encoded text
    Base64,
}

/// A single desired-state record, identified by its absolute path
///
/// Descriptors are read-only inputs to the engine: verification returns a
/// separate [`Report`] and installation only ever touches the disk.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind")]
pub enum Resource {
    /// A symbolic link at `name` pointing to `to`
    SymLink {
        /// Absolute path of the link
        name: Utf8PathBuf,
        /// The target the link must point to
        to: Utf8PathBuf,
    },
    /// A directory at `name` with the given ownership
    Directory {
        /// Absolute path of the directory
        name: Utf8PathBuf,
        /// Declared owner, group and permissions
        #[serde(flatten)]
        ownership: Ownership,
    },
    /// Ownership and permissions applied to whatever exists at `name`
    Permissions {
        /// Absolute path of the object to adjust
        name: Utf8PathBuf,
        /// Declared owner, group and permissions
        #[serde(flatten)]
        ownership: Ownership,
    },
    /// A file at `name` with fully managed content
    ConfigFile {
        /// Absolute path of the file
        name: Utf8PathBuf,
        /// Declared owner, group and permissions
        #[serde(flatten)]
        ownership: Ownership,
        /// The declared content; may be absent only when `empty` is set
        #[serde(default)]
        content: Option<String>,
        /// How `content` is encoded
        #[serde(default)]
        encoding: Encoding,
        /// When set, the file's content is the empty string regardless of
        /// `content`
        #[serde(default)]
        empty: bool,
        /// Requests a backup copy of the previous file before overwriting
        #[serde(default)]
        paranoid: bool,
    },
}

impl Resource {
    /// The kind tag of this descriptor
    pub fn kind(&self) -> ResourceKind {
        match self {
            Resource::SymLink { .. } => ResourceKind::SymLink,
            Resource::Directory { .. } => ResourceKind::Directory,
            Resource::Permissions { .. } => ResourceKind::Permissions,
            Resource::ConfigFile { .. } => ResourceKind::ConfigFile,
        }
    }

    /// The absolute path this descriptor manages (its identity)
    pub fn name(&self) -> &Utf8Path {
        match self {
            Resource::SymLink { name, .. }
            | Resource::Directory { name, .. }
            | Resource::Permissions { name, .. }
            | Resource::ConfigFile { name, .. } => name,
        }
    }
}

/// A failure to resolve the content a descriptor declares
#[derive(thiserror::Error, Debug)]
pub enum ContentError {
    /// Neither content nor the `empty` flag was given
    #[error("no content given and the empty flag is not set")]
    MissingContent,

    /// The declared content is not valid base64
    #[error("content is not valid base64: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    /// The decoded content is not text
    #[error("decoded content is not valid UTF-8: {0}")]
    NotText(#[from] std::string::FromUtf8Error),
}

/// Resolves the text a managed file is declared to carry
///
/// The `empty` flag wins over everything else; base64 content is decoded
/// (ignoring embedded whitespace); plain content is taken verbatim. A
/// descriptor with neither content nor the `empty` flag is incomplete and
/// yields [`ContentError::MissingContent`].
pub fn resolve_content(
    content: Option<&str>,
    encoding: Encoding,
    empty: bool,
) -> Result<String, ContentError> {
    if empty {
        return Ok(String::new());
    }
    let content = content.ok_or(ContentError::MissingContent)?;
    match encoding {
        Encoding::Plain => Ok(content.to_owned()),
        Encoding::Base64 => {
            let packed: String = content.chars().filter(|c| !c.is_ascii_whitespace()).collect();
            let bytes = base64::engine::general_purpose::STANDARD.decode(packed)?;
            Ok(String::from_utf8(bytes)?)
        }
    }
}
