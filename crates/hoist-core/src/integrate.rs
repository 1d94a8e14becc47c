use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::config::StateLayout;
use crate::error::InstallError;

/// Copy the resolved icon into the icon store, replacing any earlier entry for `id`.
///
/// The copy is staged next to its final name and renamed into place, so a failed copy never
/// leaves a truncated icon behind.
pub fn store_icon(icon: &Path, layout: &StateLayout, id: &str) -> Result<PathBuf, InstallError> {
    let dest = layout.icon_path(id);
    store_icon_at(icon, &dest).map_err(|source| InstallError::Integration {
        path: dest.clone(),
        source,
    })?;
    debug!(path = %dest.display(), "stored icon");
    Ok(dest)
}

fn store_icon_at(icon: &Path, dest: &Path) -> Result<()> {
    let mut src = File::open(icon).with_context(|| format!("failed to open {}", icon.display()))?;
    write_atomically(dest, |writer| {
        io::copy(&mut src, writer)?;
        Ok(())
    })
}

/// Freedesktop launcher entry for an installed app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LauncherEntry {
    pub name: String,
    pub exec: PathBuf,
    pub icon: PathBuf,
}

impl LauncherEntry {
    #[must_use]
    pub fn render(&self) -> String {
        format!(
            "[Desktop Entry]\nName={}\nExec=\"{}\"\nIcon={}\nType=Application\n",
            self.name,
            self.exec.display(),
            self.icon.display()
        )
    }
}

/// Write the launcher entry for `id`, replacing any earlier one.
pub fn write_launcher(
    layout: &StateLayout,
    id: &str,
    entry: &LauncherEntry,
) -> Result<PathBuf, InstallError> {
    let dest = layout.launcher_path(id);
    let contents = entry.render();
    write_atomically(&dest, |writer| writer.write_all(contents.as_bytes())).map_err(|source| {
        InstallError::Integration {
            path: dest.clone(),
            source,
        }
    })?;
    debug!(path = %dest.display(), "wrote launcher entry");
    Ok(dest)
}

fn write_atomically<F>(dest: &Path, fill: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<&mut File>) -> io::Result<()>,
{
    let parent = dest
        .parent()
        .with_context(|| format!("{} has no parent directory", dest.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("failed to create {}", parent.display()))?;
    let mut tmp = NamedTempFile::new_in(parent)
        .with_context(|| format!("failed to stage {}", dest.display()))?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        fill(&mut writer).with_context(|| format!("failed to write {}", dest.display()))?;
        writer
            .flush()
            .with_context(|| format!("failed to flush {}", dest.display()))?;
    }
    tmp.as_file()
        .sync_all()
        .with_context(|| format!("failed to sync {}", dest.display()))?;
    make_world_readable(tmp.as_file())
        .with_context(|| format!("failed to set permissions on {}", dest.display()))?;
    tmp.persist(dest)
        .map_err(|err| err.error)
        .with_context(|| format!("failed to replace {}", dest.display()))?;
    Ok(())
}

/// Staged files start out owner-only; stored icons and launchers are read by the desktop.
#[cfg(unix)]
fn make_world_readable(file: &File) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
#[allow(clippy::unnecessary_wraps)]
fn make_world_readable(_file: &File) -> io::Result<()> {
    Ok(())
}
