//! The reconciliation engine: read-only verification of a [`Resource`]
//! against a [`Filesystem`], and corrective installation when it differs.
//!
//! The two operations are deliberately independent: an orchestrator calls
//! [`verify`], decides, then calls [`install`]; installation does not
//! re-verify its own work.
#![warn(missing_docs)]

use anyhow::{bail, Context as _, Result};
use camino::Utf8PathBuf;

use shipshape_filesystem::Filesystem;
use shipshape_resource::{resolve_content, Report, Resource};

mod diff;
mod install;
mod materialize;
mod verify;

/// Settings that apply across all resources of a reconciliation pass
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Enables backup copies for file descriptors that request them
    pub paranoid: bool,
    /// Where backup copies are placed
    pub backup_dir: Utf8PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            paranoid: false,
            backup_dir: Utf8PathBuf::from("/var/cache/shipshape"),
        }
    }
}

/// Compares the on-disk state at the descriptor's path against the
/// descriptor, without changing anything
///
/// This never fails: every problem encountered becomes a non-matching
/// [`Report`] carrying whatever diagnostics could be gathered, and the
/// descriptor itself is left untouched.
pub fn verify<FS: Filesystem>(fs: &FS, resource: &Resource) -> Report {
    match resource {
        Resource::SymLink { name, to } => verify::symlink(fs, name, to),
        Resource::Directory { name, ownership } | Resource::Permissions { name, ownership } => {
            verify::ownership(fs, name, ownership)
        }
        Resource::ConfigFile {
            name,
            ownership,
            content,
            encoding,
            empty,
            ..
        } => verify::config_file(fs, name, ownership, content.as_deref(), *encoding, *empty),
    }
}

/// Applies the descriptor's desired state to the filesystem
///
/// Partial progress is left in place on failure; there are no retries and
/// no rollback. Every failure is logged before being returned.
pub fn install<FS: Filesystem>(
    fs: &mut FS,
    resource: &Resource,
    settings: &Settings,
) -> Result<()> {
    let result = try_install(fs, resource, settings);
    if let Err(error) = &result {
        log::error!(
            "install of {} {} failed: {error:#}",
            resource.kind(),
            resource.name()
        );
    }
    result
}

fn try_install<FS: Filesystem>(
    fs: &mut FS,
    resource: &Resource,
    settings: &Settings,
) -> Result<()> {
    if !resource.name().is_absolute() {
        bail!("resource path must be absolute: {}", resource.name());
    }
    match resource {
        Resource::SymLink { name, to } => install::symlink(fs, name, to),
        Resource::Directory { name, ownership } => install::directory(fs, name, ownership),
        Resource::Permissions { name, ownership } => install::permissions(fs, name, ownership),
        Resource::ConfigFile {
            name,
            ownership,
            content,
            encoding,
            empty,
            paranoid,
        } => {
            // An incomplete descriptor fails before anything is touched
            let data = resolve_content(content.as_deref(), *encoding, *empty)
                .with_context(|| format!("resolving content for {name}"))?;
            install::config_file(fs, settings, name, ownership, &data, *paranoid)
        }
    }
}
