use super::*;
use tempfile::TempDir;

fn template(root: &Path) -> PathBuf {
    let dist = root.join("dist");
    fs::create_dir_all(dist.join("bin")).unwrap();
    fs::create_dir_all(dist.join("modules/system/layers")).unwrap();
    fs::write(dist.join("jboss-modules.jar"), b"jar").unwrap();
    fs::write(dist.join("bin/standalone.sh"), b"#!/bin/sh\necho hi\n").unwrap();
    fs::write(dist.join("modules/system/layers/base.txt"), b"base").unwrap();
    dist
}

#[test]
fn test_copy_tree_copies_nested_files() {
    let temp = TempDir::new().unwrap();
    let dist = template(temp.path());
    let target = temp.path().join("copy");

    copy_tree(&dist, &target).unwrap();

    assert_eq!(fs::read(target.join("jboss-modules.jar")).unwrap(), b"jar");
    assert_eq!(
        fs::read_to_string(target.join("modules/system/layers/base.txt")).unwrap(),
        "base"
    );
}

#[cfg(unix)]
#[test]
fn test_copy_tree_preserves_permissions_and_symlinks() {
    use std::os::unix::fs::PermissionsExt;

    let temp = TempDir::new().unwrap();
    let dist = template(temp.path());
    let script = dist.join("bin/standalone.sh");
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
    std::os::unix::fs::symlink("standalone.sh", dist.join("bin/run.sh")).unwrap();

    let target = temp.path().join("copy");
    copy_tree(&dist, &target).unwrap();

    let mode = fs::metadata(target.join("bin/standalone.sh"))
        .unwrap()
        .permissions()
        .mode();
    assert_eq!(mode & 0o777, 0o755);
    assert_eq!(
        fs::read_link(target.join("bin/run.sh")).unwrap(),
        PathBuf::from("standalone.sh")
    );
}

#[test]
fn test_remove_tree_missing_path_is_ok() {
    let temp = TempDir::new().unwrap();
    assert!(remove_tree(&temp.path().join("never-created")).is_ok());
}

#[test]
fn test_scratch_dir_with_adversarial_name() {
    let temp = TempDir::new().unwrap();
    let dist = template(temp.path());
    let parent = temp.path().join("scratch");

    let name = "wf  2 spaces & (parens) \u{00e9}";
    let scratch = ScratchDir::create(&dist, &parent, name).unwrap();
    assert_eq!(scratch.name(), name);
    assert_eq!(scratch.path(), parent.join(name));
    assert!(scratch.path().join("bin/standalone.sh").exists());

    let path = scratch.path().to_path_buf();
    scratch.remove().unwrap();
    assert!(!path.exists());
}

#[test]
fn test_scratch_dir_replaces_leftovers() {
    let temp = TempDir::new().unwrap();
    let dist = template(temp.path());
    let parent = temp.path().join("scratch");
    let stale = parent.join("wf");
    fs::create_dir_all(&stale).unwrap();
    fs::write(stale.join("stale.lock"), b"").unwrap();

    let scratch = ScratchDir::create(&dist, &parent, "wf").unwrap();
    assert!(!scratch.path().join("stale.lock").exists());
    assert!(scratch.path().join("jboss-modules.jar").exists());
}

#[test]
fn test_scratch_dir_removed_on_drop() {
    let temp = TempDir::new().unwrap();
    let dist = template(temp.path());
    let parent = temp.path().join("scratch");

    let path = {
        let scratch = ScratchDir::create(&dist, &parent, "wf#hash").unwrap();
        scratch.path().to_path_buf()
    };
    assert!(!path.exists());
    assert!(dist.join("jboss-modules.jar").exists());
}

#[test]
fn test_scratch_dir_inside_template_is_rejected() {
    let temp = TempDir::new().unwrap();
    let dist = template(temp.path());

    let err = ScratchDir::create(&dist, &dist, "inner").unwrap_err();
    assert!(matches!(err, HarnessError::Stage { .. }));
    assert!(!dist.join("inner").exists());
}
