use camino::Utf8Path;

use shipshape_filesystem::{Filesystem, FsError, Perms};
use shipshape_resource::{resolve_content, Encoding, Ownership, Report};

use crate::diff;

/// Compares a symlink's target against the descriptor
pub(crate) fn symlink<FS: Filesystem>(fs: &FS, name: &Utf8Path, to: &Utf8Path) -> Report {
    match fs.read_link(name) {
        Err(_) => {
            log::debug!("symlink {name} missing or unreadable");
            Report::missing()
        }
        // The comparison is exact; trailing slashes and dots count
        Ok(actual) if actual.as_str() == to.as_str() => Report::matching(),
        Ok(actual) => {
            log::debug!("symlink {name} points to {actual}, should be {to}");
            Report {
                observed_target: Some(actual),
                ..Report::mismatch()
            }
        }
    }
}

/// Compares owner, group and permissions against the descriptor
///
/// Serves Directory and Permissions resources directly, and doubles as
/// the metadata half of the ConfigFile check. Every differing field is
/// recorded in the report on its own.
pub(crate) fn ownership<FS: Filesystem>(fs: &FS, name: &Utf8Path, want: &Ownership) -> Report {
    let attrs = match fs.attributes(name) {
        Err(FsError::NotFound(_)) => {
            log::debug!("{name} does not exist");
            return Report::missing();
        }
        Err(error) => {
            log::error!("unable to inspect {name}: {error}");
            return Report::mismatch();
        }
        Ok(attrs) => attrs,
    };
    let perms = Perms::from_mode(attrs.mode);
    let mut report = Report::matching();
    if attrs.owner != want.owner {
        log::debug!(
            "{name} ownership wrong: is {}, should be {}",
            attrs.owner,
            want.owner
        );
        report.matches = false;
        report.observed_owner = Some(attrs.owner);
    }
    if attrs.group != want.group {
        log::debug!(
            "{name} group wrong: is {}, should be {}",
            attrs.group,
            want.group
        );
        report.matches = false;
        report.observed_group = Some(attrs.group);
    }
    if perms != want.perms {
        log::debug!(
            "{name} permissions wrong: are {perms}, should be {}",
            want.perms
        );
        report.matches = false;
        report.observed_perms = Some(perms);
    }
    report
}

/// Checks a managed file's metadata and its exact content
pub(crate) fn config_file<FS: Filesystem>(
    fs: &FS,
    name: &Utf8Path,
    want: &Ownership,
    content: Option<&str>,
    encoding: Encoding,
    empty: bool,
) -> Report {
    let mut report = ownership(fs, name, want);
    let desired = match resolve_content(content, encoding, empty) {
        Ok(desired) => desired,
        Err(error) => {
            log::error!("cannot verify {name}: {error}");
            report.matches = false;
            return report;
        }
    };
    let actual = match fs.read_file(name) {
        Ok(actual) => actual,
        Err(error) => {
            log::debug!("unable to read {name}: {error}");
            if matches!(error, FsError::NotFound(_)) {
                report.exists = false;
            }
            report.matches = false;
            return report;
        }
    };
    if actual != desired {
        log::debug!("{name} content is out of date");
        report.matches = false;
        report.content_diff = Some(diff::unified(&actual, &desired));
    }
    report
}

#[cfg(test)]
mod tests {
    use shipshape_filesystem::{MemoryFilesystem, Mode, SetAttrs};

    use super::*;

    fn want(owner: &str, group: &str, perms: &str) -> Ownership {
        Ownership {
            owner: owner.to_owned(),
            group: group.to_owned(),
            perms: perms.parse().unwrap(),
        }
    }

    fn fs_with_tmp() -> MemoryFilesystem {
        let mut fs = MemoryFilesystem::new();
        fs.create_directory("/tmp").unwrap();
        fs
    }

    #[test]
    fn symlink_in_place_matches() {
        let mut fs = fs_with_tmp();
        fs.create_symlink("/tmp/link", "/etc/foo").unwrap();
        let report = symlink(&fs, "/tmp/link".into(), "/etc/foo".into());
        assert!(report.matches);
        assert!(report.exists);
    }

    #[test]
    fn symlink_pointing_elsewhere_reports_target() {
        let mut fs = fs_with_tmp();
        fs.create_symlink("/tmp/link", "/etc/bar").unwrap();
        let report = symlink(&fs, "/tmp/link".into(), "/etc/foo".into());
        assert!(!report.matches);
        assert!(report.exists);
        assert_eq!(report.observed_target.as_deref(), Some("/etc/bar".into()));
    }

    #[test]
    fn symlink_missing_reports_absence() {
        let fs = fs_with_tmp();
        let report = symlink(&fs, "/tmp/link".into(), "/etc/foo".into());
        assert!(!report.matches);
        assert!(!report.exists);
    }

    #[test]
    fn symlink_over_regular_file_reports_absence() {
        let mut fs = fs_with_tmp();
        fs.write_file("/tmp/link", "not a link").unwrap();
        let report = symlink(&fs, "/tmp/link".into(), "/etc/foo".into());
        assert!(!report.matches);
        assert!(!report.exists);
    }

    #[test]
    fn ownership_matching() {
        let mut fs = fs_with_tmp();
        fs.create_directory("/tmp/dir").unwrap();
        let report = ownership(&fs, "/tmp/dir".into(), &want("root", "root", "0755"));
        assert!(report.matches);
        assert_eq!(report, Report::matching());
    }

    #[test]
    fn ownership_missing_reports_absence() {
        let fs = fs_with_tmp();
        let report = ownership(&fs, "/tmp/dir".into(), &want("root", "root", "0755"));
        assert!(!report.matches);
        assert!(!report.exists);
    }

    #[test]
    fn ownership_reports_each_field_independently() {
        let mut fs = fs_with_tmp();
        fs.create_directory("/tmp/dir").unwrap();
        fs.set_attributes(
            "/tmp/dir",
            SetAttrs {
                owner: "root",
                group: "root",
                mode: Mode::from(0o700),
            },
        )
        .unwrap();
        let report = ownership(&fs, "/tmp/dir".into(), &want("daemon", "wheel", "0755"));
        assert!(!report.matches);
        assert!(report.exists);
        assert_eq!(report.observed_owner.as_deref(), Some("root"));
        assert_eq!(report.observed_group.as_deref(), Some("root"));
        assert_eq!(
            report.observed_perms.as_ref().map(Perms::as_str),
            Some("0700")
        );
    }

    #[test]
    fn ownership_reports_only_differing_fields() {
        let mut fs = fs_with_tmp();
        fs.create_directory("/tmp/dir").unwrap();
        let report = ownership(&fs, "/tmp/dir".into(), &want("root", "root", "0700"));
        assert!(!report.matches);
        assert_eq!(report.observed_owner, None);
        assert_eq!(report.observed_group, None);
        assert_eq!(
            report.observed_perms.as_ref().map(Perms::as_str),
            Some("0755")
        );
    }

    #[test]
    fn config_file_matching() {
        let mut fs = fs_with_tmp();
        fs.write_file("/tmp/motd", "hello\n").unwrap();
        let report = config_file(
            &fs,
            "/tmp/motd".into(),
            &want("root", "root", "0644"),
            Some("hello\n"),
            Encoding::Plain,
            false,
        );
        assert!(report.matches, "got {report:?}");
    }

    #[test]
    fn config_file_content_mismatch_attaches_diff() {
        let mut fs = fs_with_tmp();
        fs.write_file("/tmp/motd", "old line\n").unwrap();
        let report = config_file(
            &fs,
            "/tmp/motd".into(),
            &want("root", "root", "0644"),
            Some("new line\n"),
            Encoding::Plain,
            false,
        );
        assert!(!report.matches);
        let diff = report.content_diff.expect("diff attached");
        assert!(diff.contains("-old line"));
        assert!(diff.contains("+new line"));
    }

    #[test]
    fn config_file_metadata_mismatch_fails_even_with_matching_content() {
        let mut fs = fs_with_tmp();
        fs.write_file("/tmp/motd", "hello\n").unwrap();
        let report = config_file(
            &fs,
            "/tmp/motd".into(),
            &want("root", "root", "0600"),
            Some("hello\n"),
            Encoding::Plain,
            false,
        );
        assert!(!report.matches);
        assert!(report.content_diff.is_none());
        assert!(report.observed_perms.is_some());
    }

    #[test]
    fn config_file_missing_reports_absence() {
        let fs = fs_with_tmp();
        let report = config_file(
            &fs,
            "/tmp/motd".into(),
            &want("root", "root", "0644"),
            Some("hello\n"),
            Encoding::Plain,
            false,
        );
        assert!(!report.matches);
        assert!(!report.exists);
    }

    #[test]
    fn config_file_incomplete_descriptor_never_matches() {
        let mut fs = fs_with_tmp();
        fs.write_file("/tmp/motd", "hello\n").unwrap();
        let report = config_file(
            &fs,
            "/tmp/motd".into(),
            &want("root", "root", "0644"),
            None,
            Encoding::Plain,
            false,
        );
        assert!(!report.matches);
    }

    #[test]
    fn config_file_empty_flag_compares_against_empty() {
        let mut fs = fs_with_tmp();
        fs.write_file("/tmp/motd", "").unwrap();
        let report = config_file(
            &fs,
            "/tmp/motd".into(),
            &want("root", "root", "0644"),
            None,
            Encoding::Plain,
            true,
        );
        assert!(report.matches, "got {report:?}");
    }
}
