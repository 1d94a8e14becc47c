use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use walkdir::WalkDir;

/// Best-effort recursive chmod for trees that were shipped read-only.
#[cfg(unix)]
fn make_writable_recursive(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    let Ok(meta) = fs::symlink_metadata(path) else {
        return;
    };
    if meta.file_type().is_symlink() {
        return;
    }
    let extra = if meta.is_dir() { 0o700 } else { 0o200 };
    let mode = meta.permissions().mode() | extra;
    let _ = fs::set_permissions(path, fs::Permissions::from_mode(mode));
    if meta.is_dir() {
        if let Ok(entries) = fs::read_dir(path) {
            for entry in entries.flatten() {
                make_writable_recursive(&entry.path());
            }
        }
    }
}

#[cfg(not(unix))]
fn make_writable_recursive(path: &Path) {
    let Ok(meta) = fs::symlink_metadata(path) else {
        return;
    };
    if meta.file_type().is_symlink() {
        return;
    }
    let mut perms = meta.permissions();
    if perms.readonly() {
        #[allow(clippy::permissions_set_readonly_false)]
        perms.set_readonly(false);
        let _ = fs::set_permissions(path, perms);
    }
    if meta.is_dir() {
        if let Ok(entries) = fs::read_dir(path) {
            for entry in entries.flatten() {
                make_writable_recursive(&entry.path());
            }
        }
    }
}

/// Whether anything (including a dangling link) occupies `path`.
pub(crate) fn entry_exists(path: &Path) -> Result<bool> {
    match fs::symlink_metadata(path) {
        Ok(_) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err).with_context(|| format!("failed to stat {}", path.display())),
    }
}

/// Whether `path` is a symlink that reads back as `target`.
pub(crate) fn is_link_to(path: &Path, target: &Path) -> bool {
    fs::read_link(path).is_ok_and(|current| current == target)
}

/// Remove whatever sits at `path` without following links.
///
/// Returns `false` when nothing was there. A link is removed on its own; its target is never
/// touched.
pub(crate) fn remove_entry(path: &Path) -> Result<bool> {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(err) => return Err(err).with_context(|| format!("failed to stat {}", path.display())),
    };
    let file_type = meta.file_type();

    if file_type.is_symlink() {
        fs::remove_file(path)
            .or_else(|err| {
                if err.kind() == io::ErrorKind::NotFound {
                    return Ok(());
                }
                // Windows directory links are removed as directories.
                fs::remove_dir(path).or_else(|dir_err| {
                    if dir_err.kind() == io::ErrorKind::NotFound {
                        Ok(())
                    } else {
                        Err(dir_err)
                    }
                })
            })
            .with_context(|| format!("failed to remove symlink {}", path.display()))?;
        return Ok(true);
    }

    if file_type.is_dir() {
        make_writable_recursive(path);
        match fs::remove_dir_all(path) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to remove dir {}", path.display()));
            }
        }
        return Ok(true);
    }

    match fs::remove_file(path) {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => {
            return Err(err).with_context(|| format!("failed to remove file {}", path.display()));
        }
    }
    Ok(true)
}

/// Replace `link` with a symlink pointing at `target`.
///
/// Whatever occupied `link` before is removed without following it. A concurrent writer that
/// created the same link first counts as success.
pub(crate) fn replace_link(target: &Path, link: &Path) -> Result<()> {
    if !target.exists() {
        return Err(anyhow!(
            "cannot create link; target does not exist: {}",
            target.display()
        ));
    }
    if let Some(parent) = link.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    if is_link_to(link, target) {
        return Ok(());
    }
    remove_entry(link)?;

    match symlink(target, link) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists && is_link_to(link, target) => {
            Ok(())
        }
        Err(err) => Err(err).with_context(|| {
            format!(
                "failed to create symlink {} -> {}",
                link.display(),
                target.display()
            )
        }),
    }
}

#[cfg(unix)]
fn symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn symlink(target: &Path, link: &Path) -> io::Result<()> {
    if target.is_dir() {
        std::os::windows::fs::symlink_dir(target, link)
    } else {
        std::os::windows::fs::symlink_file(target, link)
    }
}

#[cfg(not(any(unix, windows)))]
fn symlink(_target: &Path, _link: &Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "symlinks are not supported on this platform",
    ))
}

/// Copy a file or directory tree, recreating symlinks instead of following them.
pub(crate) fn copy_tree(src: &Path, dst: &Path) -> Result<()> {
    let meta =
        fs::symlink_metadata(src).with_context(|| format!("failed to stat {}", src.display()))?;
    if !meta.is_dir() {
        return copy_entry(src, dst, &meta);
    }
    for entry in WalkDir::new(src).follow_links(false) {
        let entry = entry.with_context(|| format!("failed to walk {}", src.display()))?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .with_context(|| format!("walked outside {}", src.display()))?;
        let target = dst.join(rel);
        let meta = entry
            .path()
            .symlink_metadata()
            .with_context(|| format!("failed to stat {}", entry.path().display()))?;
        if meta.is_dir() {
            fs::create_dir_all(&target)
                .with_context(|| format!("failed to create {}", target.display()))?;
        } else {
            copy_entry(entry.path(), &target, &meta)?;
        }
    }
    Ok(())
}

fn copy_entry(src: &Path, dst: &Path, meta: &fs::Metadata) -> Result<()> {
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    if meta.file_type().is_symlink() {
        let target =
            fs::read_link(src).with_context(|| format!("failed to read link {}", src.display()))?;
        return symlink(&target, dst)
            .with_context(|| format!("failed to recreate link {}", dst.display()));
    }
    fs::copy(src, dst)
        .with_context(|| format!("failed to copy {} to {}", src.display(), dst.display()))?;
    Ok(())
}

/// Move `src` to `dst` through a staging copy when a plain rename cannot cross devices.
///
/// The staging entry lives beside `dst` so the final step is a same-directory rename and `dst`
/// never appears half-written. `src` is removed only after `dst` is in place.
pub(crate) fn move_across_devices(src: &Path, dst: &Path) -> io::Result<()> {
    let parent = dst
        .parent()
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    let staging_root = tempfile::Builder::new()
        .prefix(".hoist-staging-")
        .tempdir_in(&parent)?;
    let staged = staging_root.path().join("entry");
    copy_tree(src, &staged).map_err(io::Error::other)?;
    fs::rename(&staged, dst)?;
    remove_entry(src).map_err(io::Error::other)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Barrier};

    #[test]
    fn remove_entry_leaves_link_target_alone() {
        let temp = tempfile::tempdir().expect("tempdir");
        let target = temp.path().join("target");
        fs::create_dir_all(&target).expect("target dir");
        fs::write(target.join("payload"), b"keep").expect("payload");
        let link = temp.path().join("link");
        replace_link(&target, &link).expect("link");

        assert!(remove_entry(&link).expect("remove link"));
        assert!(!entry_exists(&link).expect("stat link"));
        assert_eq!(fs::read(target.join("payload")).expect("payload"), b"keep");
    }

    #[test]
    fn remove_entry_reports_missing_paths() {
        let temp = tempfile::tempdir().expect("tempdir");
        assert!(!remove_entry(&temp.path().join("absent")).expect("remove"));
    }

    #[cfg(unix)]
    #[test]
    fn remove_entry_clears_read_only_trees() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempfile::tempdir().expect("tempdir");
        let tree = temp.path().join("tree");
        let nested = tree.join("nested");
        fs::create_dir_all(&nested).expect("nested");
        fs::write(nested.join("file.txt"), b"hello").expect("file");
        fs::set_permissions(&nested, fs::Permissions::from_mode(0o555)).expect("chmod");

        assert!(remove_entry(&tree).expect("remove tree"));
        assert!(!tree.exists());
    }

    #[test]
    fn replace_link_overwrites_existing_file() {
        let temp = tempfile::tempdir().expect("tempdir");
        let target = temp.path().join("shared.bin");
        fs::write(&target, b"shared").expect("target");
        let link = temp.path().join("app").join("local.bin");
        fs::create_dir_all(link.parent().expect("parent")).expect("app dir");
        fs::write(&link, b"local").expect("local");

        replace_link(&target, &link).expect("replace");
        assert!(is_link_to(&link, &target));
        assert_eq!(fs::read(&link).expect("read through link"), b"shared");
    }

    #[test]
    fn replace_link_requires_target() {
        let temp = tempfile::tempdir().expect("tempdir");
        let err = replace_link(&temp.path().join("missing"), &temp.path().join("link"))
            .expect_err("missing target");
        assert!(err.to_string().contains("target does not exist"));
    }

    #[test]
    fn replace_link_tolerates_concurrent_replace() {
        let temp = tempfile::tempdir().expect("tempdir");
        let target = temp.path().join("target");
        fs::create_dir_all(&target).expect("target dir");
        let link = temp.path().join("link");

        for _ in 0..25 {
            let barrier = Arc::new(Barrier::new(3));
            let handles: Vec<_> = (0..2)
                .map(|_| {
                    let target = target.clone();
                    let link = link.clone();
                    let barrier = barrier.clone();
                    std::thread::spawn(move || {
                        barrier.wait();
                        replace_link(&target, &link)
                    })
                })
                .collect();
            barrier.wait();
            for handle in handles {
                handle.join().expect("thread").expect("replace");
            }
            assert!(is_link_to(&link, &target));
        }
    }

    #[cfg(unix)]
    #[test]
    fn copy_tree_preserves_nested_links() {
        let temp = tempfile::tempdir().expect("tempdir");
        let src = temp.path().join("Framework.framework");
        fs::create_dir_all(src.join("Versions").join("A")).expect("versions");
        fs::write(src.join("Versions").join("A").join("lib"), b"bin").expect("lib");
        std::os::unix::fs::symlink("A", src.join("Versions").join("Current")).expect("link");

        let dst = temp.path().join("copy");
        copy_tree(&src, &dst).expect("copy");
        assert_eq!(
            fs::read_link(dst.join("Versions").join("Current")).expect("link copied"),
            Path::new("A")
        );
        assert_eq!(
            fs::read(dst.join("Versions").join("A").join("lib")).expect("lib"),
            b"bin"
        );
    }

    #[test]
    fn move_across_devices_replaces_source() {
        let temp = tempfile::tempdir().expect("tempdir");
        let src = temp.path().join("src");
        fs::create_dir_all(src.join("inner")).expect("src");
        fs::write(src.join("inner").join("f"), b"data").expect("file");
        let dst = temp.path().join("shared").join("dst");
        fs::create_dir_all(dst.parent().expect("parent")).expect("shared");

        move_across_devices(&src, &dst).expect("move");
        assert!(!src.exists());
        assert_eq!(fs::read(dst.join("inner").join("f")).expect("moved"), b"data");
        let leftovers: Vec<_> = fs::read_dir(temp.path().join("shared"))
            .expect("list")
            .flatten()
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(leftovers, ["dst"]);
    }
}
