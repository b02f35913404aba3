use camino::Utf8PathBuf;

use shipshape_filesystem::Perms;

/// The outcome of comparing a descriptor against the on-disk state
///
/// Verification returns this; it never mutates the descriptor and
/// installation never produces one. Each observed delta is populated
/// independently, so several can be present at once.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Report {
    /// True when the on-disk object fully matches the descriptor
    pub matches: bool,
    /// False when nothing usable exists at the path
    pub exists: bool,
    /// The owner found on disk, when it differs from the desired one
    pub observed_owner: Option<String>,
    /// The group found on disk, when it differs from the desired one
    pub observed_group: Option<String>,
    /// The permissions found on disk, when they differ from the desired ones
    pub observed_perms: Option<Perms>,
    /// Where a symlink actually points, when it differs from the desired
    /// target
    pub observed_target: Option<Utf8PathBuf>,
    /// A line diff between on-disk and desired file content
    pub content_diff: Option<String>,
}

impl Report {
    /// A report for an object that fully matches
    pub fn matching() -> Self {
        Report {
            matches: true,
            exists: true,
            ..Default::default()
        }
    }

    /// A report for an object that exists but differs
    pub fn mismatch() -> Self {
        Report {
            matches: false,
            exists: true,
            ..Default::default()
        }
    }

    /// A report for a path with nothing usable at it
    pub fn missing() -> Self {
        Report {
            matches: false,
            exists: false,
            ..Default::default()
        }
    }
}
