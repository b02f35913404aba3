use std::{cell::RefCell, collections::HashMap, io};

use camino::{Utf8Path, Utf8PathBuf};

use super::{
    Attrs, Filesystem, FsError, Mode, NodeKind, SetAttrs, DEFAULT_DIRECTORY_MODE,
    DEFAULT_FILE_MODE,
};

const MAX_LINK_HOPS: usize = 8;

/// An in-memory representation of a file system, with node attributes and
/// a registry of known users and groups
///
/// Newly created nodes are owned by `root:root` until
/// [`set_attributes`](Filesystem::set_attributes) says otherwise.
#[derive(Debug)]
pub struct MemoryFilesystem {
    inner: RefCell<Inner>,
}

#[derive(Debug)]
struct Inner {
    map: HashMap<Utf8PathBuf, Node>,
    users: Vec<String>,
    groups: Vec<String>,
}

#[derive(Debug)]
struct Node {
    payload: Payload,
    owner: String,
    group: String,
    mode: Mode,
}

#[derive(Debug)]
enum Payload {
    File { content: String },
    Directory { children: Vec<String> },
    Symlink { target: Utf8PathBuf },
}

impl Node {
    fn new(payload: Payload, mode: Mode) -> Self {
        Node {
            payload,
            owner: "root".to_owned(),
            group: "root".to_owned(),
            mode,
        }
    }

    fn kind(&self) -> NodeKind {
        match self.payload {
            Payload::File { .. } => NodeKind::File,
            Payload::Directory { .. } => NodeKind::Directory,
            Payload::Symlink { .. } => NodeKind::Symlink,
        }
    }
}

impl MemoryFilesystem {
    /// Creates a filesystem holding only a root directory, with `root` as
    /// the only known user and group
    pub fn new() -> Self {
        let mut map = HashMap::new();
        map.insert(
            Utf8PathBuf::from("/"),
            Node::new(
                Payload::Directory { children: vec![] },
                DEFAULT_DIRECTORY_MODE,
            ),
        );
        MemoryFilesystem {
            inner: RefCell::new(Inner {
                map,
                users: vec!["root".to_owned()],
                groups: vec!["root".to_owned()],
            }),
        }
    }

    /// Registers a user name that [`set_attributes`](Filesystem::set_attributes)
    /// will accept
    pub fn with_user(self, name: impl Into<String>) -> Self {
        self.inner.borrow_mut().users.push(name.into());
        self
    }

    /// Registers a group name that [`set_attributes`](Filesystem::set_attributes)
    /// will accept
    pub fn with_group(self, name: impl Into<String>) -> Self {
        self.inner.borrow_mut().groups.push(name.into());
        self
    }
}

impl Default for MemoryFilesystem {
    fn default() -> Self {
        Self::new()
    }
}

impl Filesystem for MemoryFilesystem {
    fn node_kind(&self, path: impl AsRef<Utf8Path>) -> Option<NodeKind> {
        self.inner.borrow().map.get(path.as_ref()).map(Node::kind)
    }

    fn create_directory(&mut self, path: impl AsRef<Utf8Path>) -> Result<(), FsError> {
        let path = path.as_ref();
        self.inner.borrow_mut().insert_node(
            path,
            Node::new(
                Payload::Directory { children: vec![] },
                DEFAULT_DIRECTORY_MODE,
            ),
        )
    }

    fn create_symlink(
        &mut self,
        path: impl AsRef<Utf8Path>,
        target: impl AsRef<Utf8Path>,
    ) -> Result<(), FsError> {
        let path = path.as_ref();
        self.inner.borrow_mut().insert_node(
            path,
            Node::new(
                Payload::Symlink {
                    target: target.as_ref().to_owned(),
                },
                Mode::from(0o777),
            ),
        )
    }

    fn read_link(&self, path: impl AsRef<Utf8Path>) -> Result<Utf8PathBuf, FsError> {
        let path = path.as_ref();
        let inner = self.inner.borrow();
        match inner.map.get(path) {
            None => Err(FsError::NotFound(path.to_owned())),
            Some(Node {
                payload: Payload::Symlink { target },
                ..
            }) => Ok(target.clone()),
            Some(_) => Err(FsError::TypeMismatch {
                path: path.to_owned(),
                detail: "not a symlink",
            }),
        }
    }

    fn read_file(&self, path: impl AsRef<Utf8Path>) -> Result<String, FsError> {
        let inner = self.inner.borrow();
        let path = inner.resolve(path.as_ref())?;
        match inner.map.get(&path) {
            None => Err(FsError::NotFound(path)),
            Some(Node {
                payload: Payload::File { content },
                ..
            }) => Ok(content.clone()),
            Some(_) => Err(FsError::TypeMismatch {
                path,
                detail: "not a regular file",
            }),
        }
    }

    fn write_file(&mut self, path: impl AsRef<Utf8Path>, content: &str) -> Result<(), FsError> {
        let path = path.as_ref();
        let mut inner = self.inner.borrow_mut();
        if !inner.map.contains_key(path) {
            return inner.insert_node(
                path,
                Node::new(
                    Payload::File {
                        content: content.to_owned(),
                    },
                    DEFAULT_FILE_MODE,
                ),
            );
        }
        match inner.map.get_mut(path) {
            Some(Node {
                payload: Payload::File { content: existing },
                ..
            }) => {
                *existing = content.to_owned();
                Ok(())
            }
            _ => Err(FsError::TypeMismatch {
                path: path.to_owned(),
                detail: "not a regular file",
            }),
        }
    }

    fn copy_file(
        &mut self,
        from: impl AsRef<Utf8Path>,
        to: impl AsRef<Utf8Path>,
    ) -> Result<(), FsError> {
        let (content, mode) = {
            let inner = self.inner.borrow();
            let from = inner.resolve(from.as_ref())?;
            match inner.map.get(&from) {
                None => return Err(FsError::NotFound(from)),
                Some(Node {
                    payload: Payload::File { content },
                    mode,
                    ..
                }) => (content.clone(), *mode),
                Some(_) => {
                    return Err(FsError::TypeMismatch {
                        path: from,
                        detail: "not a regular file",
                    })
                }
            }
        };
        let to = to.as_ref();
        self.write_file(to, &content)?;
        if let Some(node) = self.inner.borrow_mut().map.get_mut(to) {
            node.mode = mode;
        }
        Ok(())
    }

    fn remove(&mut self, path: impl AsRef<Utf8Path>) -> Result<(), FsError> {
        let path = path.as_ref();
        let mut inner = self.inner.borrow_mut();
        match inner.map.get(path) {
            None => return Err(FsError::NotFound(path.to_owned())),
            Some(Node {
                payload: Payload::Directory { .. },
                ..
            }) => {
                return Err(FsError::TypeMismatch {
                    path: path.to_owned(),
                    detail: "is a directory",
                })
            }
            Some(_) => {}
        }
        inner.map.remove(path);
        inner.forget_child(path);
        Ok(())
    }

    fn rename(
        &mut self,
        from: impl AsRef<Utf8Path>,
        to: impl AsRef<Utf8Path>,
    ) -> Result<(), FsError> {
        let from = from.as_ref();
        let to = to.as_ref();
        let mut inner = self.inner.borrow_mut();
        if !inner.map.contains_key(from) {
            return Err(FsError::NotFound(from.to_owned()));
        }
        if from == to {
            return Ok(());
        }
        match inner.map.get(to).map(Node::kind) {
            Some(NodeKind::Directory) => {
                return Err(FsError::TypeMismatch {
                    path: to.to_owned(),
                    detail: "rename target is a directory",
                })
            }
            Some(_) => {
                inner.map.remove(to);
                inner.forget_child(to);
            }
            None => {}
        }
        // The parent of the new name must already be a directory
        let parent = parent_of(to);
        match inner.map.get_mut(&parent) {
            Some(Node {
                payload: Payload::Directory { children },
                ..
            }) => {
                children.push(name_of(to).to_owned());
            }
            Some(_) => {
                return Err(FsError::TypeMismatch {
                    path: parent,
                    detail: "parent is not a directory",
                })
            }
            None => return Err(FsError::NotFound(parent)),
        }
        inner.forget_child(from);
        // Move the node itself, then any keys nested beneath it
        let node = inner.map.remove(from).expect("checked above");
        let is_directory = matches!(node.payload, Payload::Directory { .. });
        inner.map.insert(to.to_owned(), node);
        if is_directory {
            let prefix = format!("{from}/");
            let nested: Vec<Utf8PathBuf> = inner
                .map
                .keys()
                .filter(|key| key.as_str().starts_with(&prefix))
                .cloned()
                .collect();
            for old_key in nested {
                let new_key =
                    Utf8PathBuf::from(format!("{to}/{}", &old_key.as_str()[prefix.len()..]));
                let node = inner.map.remove(&old_key).expect("collected above");
                inner.map.insert(new_key, node);
            }
        }
        Ok(())
    }

    fn attributes(&self, path: impl AsRef<Utf8Path>) -> Result<Attrs, FsError> {
        let inner = self.inner.borrow();
        let path = inner.resolve(path.as_ref())?;
        match inner.map.get(&path) {
            None => Err(FsError::NotFound(path)),
            Some(node) => Ok(Attrs {
                owner: node.owner.clone(),
                group: node.group.clone(),
                mode: Mode::from(node.mode.permissions()),
            }),
        }
    }

    fn set_attributes(
        &mut self,
        path: impl AsRef<Utf8Path>,
        attrs: SetAttrs,
    ) -> Result<(), FsError> {
        let mut inner = self.inner.borrow_mut();
        if !inner.users.iter().any(|u| u == attrs.owner) {
            return Err(FsError::UnknownUser(attrs.owner.to_owned()));
        }
        if !inner.groups.iter().any(|g| g == attrs.group) {
            return Err(FsError::UnknownGroup(attrs.group.to_owned()));
        }
        let path = inner.resolve(path.as_ref())?;
        match inner.map.get_mut(&path) {
            None => Err(FsError::NotFound(path)),
            Some(node) => {
                node.owner = attrs.owner.to_owned();
                node.group = attrs.group.to_owned();
                node.mode = attrs.mode;
                Ok(())
            }
        }
    }
}

impl Inner {
    /// Inserts a new node; the parent must already be a directory
    fn insert_node(&mut self, path: &Utf8Path, node: Node) -> Result<(), FsError> {
        if self.map.contains_key(path) {
            return Err(FsError::Io {
                path: path.to_owned(),
                source: io::Error::new(io::ErrorKind::AlreadyExists, "file exists"),
            });
        }
        let parent = parent_of(path);
        match self.map.get_mut(&parent) {
            None => return Err(FsError::NotFound(parent)),
            Some(Node {
                payload: Payload::Directory { children },
                ..
            }) => children.push(name_of(path).to_owned()),
            Some(_) => {
                return Err(FsError::TypeMismatch {
                    path: parent,
                    detail: "parent is not a directory",
                })
            }
        }
        self.map.insert(path.to_owned(), node);
        Ok(())
    }

    /// Drops a path from its parent directory's listing
    fn forget_child(&mut self, path: &Utf8Path) {
        let parent = parent_of(path);
        let name = name_of(path);
        if let Some(Node {
            payload: Payload::Directory { children },
            ..
        }) = self.map.get_mut(&parent)
        {
            children.retain(|child| child != name);
        }
    }

    /// Follows symlinks at the leaf of the path
    fn resolve(&self, path: &Utf8Path) -> Result<Utf8PathBuf, FsError> {
        let mut path = path.to_owned();
        for _ in 0..MAX_LINK_HOPS {
            match self.map.get(&path) {
                Some(Node {
                    payload: Payload::Symlink { target },
                    ..
                }) => {
                    path = if target.is_absolute() {
                        target.clone()
                    } else {
                        parent_of(&path).join(target)
                    };
                }
                _ => return Ok(path),
            }
        }
        Err(FsError::Io {
            path,
            source: io::Error::new(
                io::ErrorKind::Other,
                "too many levels of symbolic links",
            ),
        })
    }
}

fn parent_of(path: &Utf8Path) -> Utf8PathBuf {
    path.parent().unwrap_or(Utf8Path::new("/")).to_owned()
}

fn name_of(path: &Utf8Path) -> &str {
    path.file_name().unwrap_or("")
}
