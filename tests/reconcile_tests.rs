use indoc::indoc;

use shipshape_engine::{install, verify, Settings};
use shipshape_filesystem::{Filesystem, MemoryFilesystem, NodeKind, Perms};
use shipshape_resource::Resource;

fn resource(text: &str) -> Resource {
    toml::from_str(text).expect("descriptor parses")
}

fn fs_with_tmp() -> MemoryFilesystem {
    let mut fs = MemoryFilesystem::new();
    fs.create_directory("/tmp").unwrap();
    fs
}

#[test]
fn directory_install_creates_missing_ancestors_then_verifies() {
    let mut fs = fs_with_tmp();
    let dir = resource(indoc!(
        r#"
        kind = "Directory"
        name = "/tmp/ex/sub"
        owner = "root"
        group = "root"
        perms = "755"
        "#
    ));

    let before = verify(&fs, &dir);
    assert!(!before.matches);
    assert!(!before.exists);

    install(&mut fs, &dir, &Settings::default()).unwrap();
    assert_eq!(fs.node_kind("/tmp/ex"), Some(NodeKind::Directory));
    assert_eq!(fs.node_kind("/tmp/ex/sub"), Some(NodeKind::Directory));
    let attrs = fs.attributes("/tmp/ex/sub").unwrap();
    assert_eq!(attrs.owner, "root");
    assert_eq!(attrs.group, "root");
    assert_eq!(Perms::from_mode(attrs.mode).as_str(), "0755");

    assert!(verify(&fs, &dir).matches);
}

#[test]
fn symlink_install_replaces_regular_file_then_verifies() {
    let mut fs = fs_with_tmp();
    fs.write_file("/tmp/link", "a file, not a link").unwrap();
    let link = resource(indoc!(
        r#"
        kind = "SymLink"
        name = "/tmp/link"
        to = "/etc/foo"
        "#
    ));

    let before = verify(&fs, &link);
    assert!(!before.matches);
    assert!(!before.exists);

    install(&mut fs, &link, &Settings::default()).unwrap();
    assert_eq!(fs.read_link("/tmp/link").unwrap(), "/etc/foo");
    assert!(verify(&fs, &link).matches);
}

#[test]
fn config_file_round_trip() {
    let mut fs = fs_with_tmp();
    let file = resource(indoc!(
        r#"
        kind = "ConfigFile"
        name = "/tmp/app.conf"
        owner = "root"
        group = "root"
        perms = "0644"
        content = "setting = on\n"
        "#
    ));

    install(&mut fs, &file, &Settings::default()).unwrap();
    assert!(verify(&fs, &file).matches);

    let changed = resource(indoc!(
        r#"
        kind = "ConfigFile"
        name = "/tmp/app.conf"
        owner = "root"
        group = "root"
        perms = "0644"
        content = "setting = off\n"
        "#
    ));
    let report = verify(&fs, &changed);
    assert!(!report.matches);
    let diff = report.content_diff.expect("diff attached");
    assert!(!diff.is_empty());
    assert!(diff.contains("-setting = on"), "got:\n{diff}");
    assert!(diff.contains("+setting = off"), "got:\n{diff}");
}

#[test]
fn config_file_base64_round_trip() {
    let mut fs = fs_with_tmp();
    // "key = value\n"
    let file = resource(indoc!(
        r#"
        kind = "ConfigFile"
        name = "/tmp/app.conf"
        owner = "root"
        group = "root"
        perms = "0600"
        content = "a2V5ID0gdmFsdWUK"
        encoding = "base64"
        "#
    ));

    install(&mut fs, &file, &Settings::default()).unwrap();
    assert_eq!(fs.read_file("/tmp/app.conf").unwrap(), "key = value\n");
    assert!(verify(&fs, &file).matches);
}

#[test]
fn config_file_empty_round_trip() {
    let mut fs = fs_with_tmp();
    let file = resource(indoc!(
        r#"
        kind = "ConfigFile"
        name = "/tmp/empty.conf"
        owner = "root"
        group = "root"
        perms = "0644"
        empty = true
        "#
    ));

    install(&mut fs, &file, &Settings::default()).unwrap();
    assert_eq!(fs.read_file("/tmp/empty.conf").unwrap(), "");
    assert!(verify(&fs, &file).matches);
}

#[test]
fn permissions_adjust_existing_file() {
    let mut fs = fs_with_tmp();
    fs.write_file("/tmp/secrets", "s3kr1t\n").unwrap();
    let perms = resource(indoc!(
        r#"
        kind = "Permissions"
        name = "/tmp/secrets"
        owner = "root"
        group = "root"
        perms = "0600"
        "#
    ));

    let before = verify(&fs, &perms);
    assert!(!before.matches);
    assert_eq!(
        before.observed_perms.as_ref().map(Perms::as_str),
        Some("0644")
    );

    install(&mut fs, &perms, &Settings::default()).unwrap();
    assert!(verify(&fs, &perms).matches);
    // Content untouched
    assert_eq!(fs.read_file("/tmp/secrets").unwrap(), "s3kr1t\n");
}

#[test]
fn verify_leaves_the_disk_alone() {
    let mut fs = fs_with_tmp();
    fs.write_file("/tmp/app.conf", "old\n").unwrap();
    let file = resource(indoc!(
        r#"
        kind = "ConfigFile"
        name = "/tmp/app.conf"
        owner = "root"
        group = "root"
        perms = "0644"
        content = "new\n"
        "#
    ));

    let report = verify(&fs, &file);
    assert!(!report.matches);
    assert_eq!(fs.read_file("/tmp/app.conf").unwrap(), "old\n");
    assert!(!fs.exists("/tmp/app.conf.new"));
}
