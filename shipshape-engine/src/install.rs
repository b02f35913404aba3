use anyhow::{Context as _, Result};
use camino::{Utf8Path, Utf8PathBuf};

use shipshape_filesystem::{compute_mode, BaseType, Filesystem, FsError, NodeKind, SetAttrs};
use shipshape_resource::Ownership;

use crate::{materialize, Settings};

/// Replaces whatever occupies `name` with a symlink to `to`
///
/// Cleanup of the previous occupant is best-effort: a directory is moved
/// aside to `<name>.bak` to preserve its data, anything else is unlinked,
/// and either failure is only logged. The call's result is that of
/// creating the link itself.
pub(crate) fn symlink<FS: Filesystem>(fs: &mut FS, name: &Utf8Path, to: &Utf8Path) -> Result<()> {
    log::info!("installing symlink {name} -> {to}");
    match fs.node_kind(name) {
        Some(NodeKind::Directory) => {
            let backup = suffixed(name, ".bak");
            log::debug!("directory already at {name}, moving aside to {backup}");
            if let Err(error) = fs.rename(name, &backup) {
                log::warn!("could not move {name} aside: {error}");
            }
        }
        Some(_) => {
            log::debug!("non-directory already at {name}");
            if let Err(error) = fs.remove(name) {
                log::warn!("cleanup of {name} failed: {error}");
            }
        }
        None => {}
    }
    fs.create_symlink(name, to)
        .with_context(|| format!("creating symlink {name}"))
}

/// Creates the directory at `name` if needed and applies its ownership
pub(crate) fn directory<FS: Filesystem>(
    fs: &mut FS,
    name: &Utf8Path,
    ownership: &Ownership,
) -> Result<()> {
    log::info!("installing directory {name}");
    let present = match fs.node_kind(name) {
        Some(NodeKind::Directory) => true,
        Some(_) => {
            log::debug!("non-directory at {name}, removing");
            fs.remove(name)
                .with_context(|| format!("removing non-directory at {name}"))?;
            false
        }
        None => false,
    };
    if !present {
        materialize::ancestors(fs, name)?;
        fs.create_directory(name)
            .with_context(|| format!("creating directory {name}"))?;
    }
    apply_ownership(fs, name, ownership, BaseType::Directory)
}

/// Applies ownership and permissions to whatever already exists at `name`
pub(crate) fn permissions<FS: Filesystem>(
    fs: &mut FS,
    name: &Utf8Path,
    ownership: &Ownership,
) -> Result<()> {
    log::info!("installing permissions on {name}");
    let base = match fs.node_kind(name) {
        None => {
            return Err(FsError::NotFound(name.to_owned()))
                .with_context(|| format!("adjusting permissions of {name}"))
        }
        Some(NodeKind::Directory) => BaseType::Directory,
        Some(_) => BaseType::Regular,
    };
    apply_ownership(fs, name, ownership, base)
}

/// Writes a managed file by staging it next to its final path
///
/// Ownership and mode are applied to the staging file before the final
/// rename, so `name` is never visible with the right content but the
/// wrong attributes, and never with partially-written content.
pub(crate) fn config_file<FS: Filesystem>(
    fs: &mut FS,
    settings: &Settings,
    name: &Utf8Path,
    ownership: &Ownership,
    data: &str,
    paranoid: bool,
) -> Result<()> {
    log::info!("installing file {name}");
    materialize::ancestors(fs, name)?;
    let staging = suffixed(name, ".new");
    if let Err(error) = fs.write_file(&staging, data) {
        if let FsError::PermissionDenied(_) = error {
            log::error!("failed to open {staging} for writing");
        }
        return Err(error).with_context(|| format!("writing {staging}"));
    }
    apply_ownership(fs, &staging, ownership, BaseType::Regular)?;
    if paranoid && settings.paranoid {
        backup(fs, settings, name);
    }
    fs.rename(&staging, name)
        .with_context(|| format!("replacing {name}"))
}

/// Best-effort copy of the current file into the backup directory
fn backup<FS: Filesystem>(fs: &mut FS, settings: &Settings, name: &Utf8Path) {
    let base = match name.file_name() {
        Some(base) if fs.node_kind(name) == Some(NodeKind::File) => base,
        _ => return,
    };
    let target = settings.backup_dir.join(base);
    if let Err(error) = fs.copy_file(name, &target) {
        log::warn!("backup copy of {name} to {target} failed: {error}");
    }
}

fn apply_ownership<FS: Filesystem>(
    fs: &mut FS,
    path: &Utf8Path,
    ownership: &Ownership,
    base: BaseType,
) -> Result<()> {
    let mode = compute_mode(base, &ownership.perms);
    fs.set_attributes(
        path,
        SetAttrs {
            owner: &ownership.owner,
            group: &ownership.group,
            mode,
        },
    )
    .with_context(|| format!("applying ownership and mode to {path}"))
}

fn suffixed(name: &Utf8Path, suffix: &str) -> Utf8PathBuf {
    Utf8PathBuf::from(format!("{name}{suffix}"))
}
