use std::{
    fs, io,
    os::unix::fs::{symlink, MetadataExt, PermissionsExt},
};

use camino::{Utf8Path, Utf8PathBuf};
use nix::unistd::{Gid, Uid};
use users::{Groups, Users, UsersCache};

use super::{Attrs, Filesystem, FsError, Mode, NodeKind, SetAttrs};

/// Access to a real file system
pub struct DiskFilesystem {
    users: UsersCache,
}

impl DiskFilesystem {
    /// Creates a physical filesystem handle with an empty identity cache
    pub fn new() -> Self {
        DiskFilesystem {
            users: UsersCache::new(),
        }
    }
}

impl Default for DiskFilesystem {
    fn default() -> Self {
        Self::new()
    }
}

impl Filesystem for DiskFilesystem {
    fn node_kind(&self, path: impl AsRef<Utf8Path>) -> Option<NodeKind> {
        let file_type = fs::symlink_metadata(path.as_ref()).ok()?.file_type();
        Some(if file_type.is_dir() {
            NodeKind::Directory
        } else if file_type.is_symlink() {
            NodeKind::Symlink
        } else if file_type.is_file() {
            NodeKind::File
        } else {
            NodeKind::Other
        })
    }

    fn create_directory(&mut self, path: impl AsRef<Utf8Path>) -> Result<(), FsError> {
        let path = path.as_ref();
        fs::create_dir(path).map_err(|e| classify(path, e))
    }

    fn create_symlink(
        &mut self,
        path: impl AsRef<Utf8Path>,
        target: impl AsRef<Utf8Path>,
    ) -> Result<(), FsError> {
        let path = path.as_ref();
        symlink(target.as_ref(), path).map_err(|e| classify(path, e))
    }

    fn read_link(&self, path: impl AsRef<Utf8Path>) -> Result<Utf8PathBuf, FsError> {
        let path = path.as_ref();
        let target = fs::read_link(path).map_err(|e| classify(path, e))?;
        Utf8PathBuf::from_path_buf(target).map_err(|_| FsError::Io {
            path: path.to_owned(),
            source: io::Error::new(io::ErrorKind::InvalidData, "link target is not UTF-8"),
        })
    }

    fn read_file(&self, path: impl AsRef<Utf8Path>) -> Result<String, FsError> {
        let path = path.as_ref();
        fs::read_to_string(path).map_err(|e| classify(path, e))
    }

    fn write_file(&mut self, path: impl AsRef<Utf8Path>, content: &str) -> Result<(), FsError> {
        let path = path.as_ref();
        fs::write(path, content).map_err(|e| classify(path, e))
    }

    fn copy_file(
        &mut self,
        from: impl AsRef<Utf8Path>,
        to: impl AsRef<Utf8Path>,
    ) -> Result<(), FsError> {
        let from = from.as_ref();
        fs::copy(from, to.as_ref())
            .map(|_| ())
            .map_err(|e| classify(from, e))
    }

    fn remove(&mut self, path: impl AsRef<Utf8Path>) -> Result<(), FsError> {
        let path = path.as_ref();
        fs::remove_file(path).map_err(|e| classify(path, e))
    }

    fn rename(
        &mut self,
        from: impl AsRef<Utf8Path>,
        to: impl AsRef<Utf8Path>,
    ) -> Result<(), FsError> {
        let from = from.as_ref();
        fs::rename(from, to.as_ref()).map_err(|e| classify(from, e))
    }

    fn attributes(&self, path: impl AsRef<Utf8Path>) -> Result<Attrs, FsError> {
        let path = path.as_ref();
        let meta = fs::metadata(path).map_err(|e| classify(path, e))?;
        let (uid, gid) = (meta.uid(), meta.gid());
        let owner = match self.users.get_user_by_uid(uid) {
            Some(user) => user.name().to_string_lossy().into_owned(),
            None => {
                log::error!("no user with uid {uid} (owner of {path})");
                uid.to_string()
            }
        };
        let group = match self.users.get_group_by_gid(gid) {
            Some(group) => group.name().to_string_lossy().into_owned(),
            None => {
                log::error!("no group with gid {gid} (group of {path})");
                gid.to_string()
            }
        };
        Ok(Attrs {
            owner,
            group,
            mode: Mode::from((meta.mode() & 0o7777) as u16),
        })
    }

    fn set_attributes(
        &mut self,
        path: impl AsRef<Utf8Path>,
        attrs: SetAttrs,
    ) -> Result<(), FsError> {
        let path = path.as_ref();
        let uid = self
            .users
            .get_user_by_name(attrs.owner)
            .ok_or_else(|| FsError::UnknownUser(attrs.owner.to_owned()))?
            .uid();
        let gid = self
            .users
            .get_group_by_name(attrs.group)
            .ok_or_else(|| FsError::UnknownGroup(attrs.group.to_owned()))?
            .gid();
        nix::unistd::chown(
            path.as_std_path(),
            Some(Uid::from_raw(uid)),
            Some(Gid::from_raw(gid)),
        )
        .map_err(|errno| classify(path, io::Error::from_raw_os_error(errno as i32)))?;
        fs::set_permissions(path, fs::Permissions::from_mode(attrs.mode.into()))
            .map_err(|e| classify(path, e))
    }
}

fn classify(path: &Utf8Path, err: io::Error) -> FsError {
    match err.kind() {
        io::ErrorKind::NotFound => FsError::NotFound(path.to_owned()),
        io::ErrorKind::PermissionDenied => FsError::PermissionDenied(path.to_owned()),
        _ => FsError::Io {
            path: path.to_owned(),
            source: err,
        },
    }
}
