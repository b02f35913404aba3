use anyhow::{Context as _, Result};
use camino::{Utf8Component, Utf8Path, Utf8PathBuf};

use shipshape_filesystem::{Filesystem, NodeKind};

/// Ensures every ancestor directory of `target` exists
///
/// Nothing is done when the target's parent already exists, whatever its
/// type. Otherwise each ancestor from the root down to the parent is
/// inspected without following symlinks: a missing one is created, one
/// occupied by a non-directory is removed and recreated as a directory.
/// The first failure aborts the walk.
pub(crate) fn ancestors<FS: Filesystem>(fs: &mut FS, target: &Utf8Path) -> Result<()> {
    let parent = match target.parent() {
        Some(parent) => parent,
        None => return Ok(()),
    };
    if parent == "/" || fs.exists(parent) {
        return Ok(());
    }
    log::debug!("creating parent path for {target}");
    let mut walked = Utf8PathBuf::from("/");
    for component in parent.components() {
        if component == Utf8Component::RootDir {
            continue;
        }
        walked.push(component);
        match fs.node_kind(&walked) {
            Some(NodeKind::Directory) => {}
            Some(_) => {
                fs.remove(&walked)
                    .with_context(|| format!("clearing non-directory ancestor {walked}"))?;
                fs.create_directory(&walked)
                    .with_context(|| format!("creating ancestor {walked}"))?;
            }
            None => {
                fs.create_directory(&walked)
                    .with_context(|| format!("creating ancestor {walked}"))?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use shipshape_filesystem::MemoryFilesystem;

    use super::*;

    #[test]
    fn creates_all_missing_ancestors() {
        let mut fs = MemoryFilesystem::new();
        ancestors(&mut fs, "/a/b/c/leaf".into()).unwrap();
        for path in ["/a", "/a/b", "/a/b/c"] {
            assert_eq!(fs.node_kind(path), Some(NodeKind::Directory), "{path}");
        }
        // The leaf itself is the caller's business
        assert!(!fs.exists("/a/b/c/leaf"));
    }

    #[test]
    fn replaces_non_directory_ancestor() {
        let mut fs = MemoryFilesystem::new();
        fs.create_directory("/a").unwrap();
        fs.write_file("/a/b", "in the way").unwrap();
        fs.create_directory("/a/other").unwrap();
        ancestors(&mut fs, "/a/b/c/leaf".into()).unwrap();
        assert_eq!(fs.node_kind("/a/b"), Some(NodeKind::Directory));
        assert_eq!(fs.node_kind("/a/b/c"), Some(NodeKind::Directory));
    }

    #[test]
    fn existing_parent_short_circuits() {
        let mut fs = MemoryFilesystem::new();
        fs.write_file("/parent", "a file, not a directory").unwrap();
        // The parent exists (as the wrong type); no walk happens
        ancestors(&mut fs, "/parent/leaf".into()).unwrap();
        assert_eq!(fs.node_kind("/parent"), Some(NodeKind::File));
    }

    #[test]
    fn root_level_target_needs_nothing() {
        let mut fs = MemoryFilesystem::new();
        ancestors(&mut fs, "/leaf".into()).unwrap();
        assert!(!fs.exists("/leaf"));
    }
}
