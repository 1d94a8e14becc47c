//! Icon acquisition: resolve a URL or local path into a temp file the rest of the run can
//! read from.

use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use tracing::{debug, warn};
use url::Url;

use crate::config::NetworkConfig;
use crate::error::InstallError;
use crate::net;

/// Where an icon reference points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IconSource {
    Remote(Url),
    Local(PathBuf),
}

impl IconSource {
    /// Only absolute `http`/`https` URLs are fetched. `file://` URLs become paths, and anything
    /// else (including `C:\icons\app.png`, which parses with scheme `c`) is a local path.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match Url::parse(raw) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Self::Remote(url),
            Ok(url) if url.scheme() == "file" => url
                .to_file_path()
                .map_or_else(|()| Self::Local(PathBuf::from(raw)), Self::Local),
            _ => Self::Local(PathBuf::from(raw)),
        }
    }
}

/// Owns the temp file holding the resolved icon.
///
/// The file (and the temp directory, when this handle allocated one) is deleted by
/// [`TempIconHandle::release`] or on drop, whichever comes first.
#[derive(Debug)]
pub struct TempIconHandle {
    path: PathBuf,
    dir: Option<tempfile::TempDir>,
    released: bool,
}

impl TempIconHandle {
    fn allocate(work_dir: Option<&Path>, id: &str) -> Result<Self> {
        let file_name = format!("hoist-{id}.png");
        match work_dir {
            Some(root) => {
                fs::create_dir_all(root)
                    .with_context(|| format!("failed to create {}", root.display()))?;
                Ok(Self {
                    path: root.join(file_name),
                    dir: None,
                    released: false,
                })
            }
            None => {
                let dir = tempfile::Builder::new()
                    .prefix("hoist-icon-")
                    .tempdir()
                    .context("failed to create temp dir for icon")?;
                Ok(Self {
                    path: dir.path().join(file_name),
                    dir: Some(dir),
                    released: false,
                })
            }
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the temp file; later calls are no-ops.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        match self.dir.take() {
            Some(dir) => {
                let dir_path = dir.path().to_path_buf();
                if let Err(err) = dir.close() {
                    warn!(path = %dir_path.display(), %err, "failed to remove icon temp dir");
                }
            }
            None => match fs::remove_file(&self.path) {
                Ok(()) => {}
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(err) => {
                    warn!(path = %self.path.display(), %err, "failed to remove icon temp file");
                }
            },
        }
        debug!(path = %self.path.display(), "released icon temp file");
    }
}

impl Drop for TempIconHandle {
    fn drop(&mut self) {
        self.release();
    }
}

/// Resolve `icon` into a temp file named after `id`.
///
/// `work_dir` injects a per-run temp root; without it a fresh temp directory is allocated. On
/// failure nothing is left behind.
pub fn acquire(
    icon: &str,
    work_dir: Option<&Path>,
    id: &str,
    network: &NetworkConfig,
) -> Result<TempIconHandle, InstallError> {
    acquire_inner(icon, work_dir, id, network).map_err(|source| InstallError::Acquisition {
        icon: icon.to_string(),
        source,
    })
}

fn acquire_inner(
    icon: &str,
    work_dir: Option<&Path>,
    id: &str,
    network: &NetworkConfig,
) -> Result<TempIconHandle> {
    let handle = TempIconHandle::allocate(work_dir, id)?;
    match IconSource::parse(icon) {
        IconSource::Remote(url) => {
            let written = fetch_to(&url, handle.path(), network)?;
            debug!(%url, bytes = written, path = %handle.path().display(), "fetched icon");
        }
        IconSource::Local(src) => {
            let written = fs::copy(&src, handle.path()).with_context(|| {
                format!(
                    "failed to copy {} to {}",
                    src.display(),
                    handle.path().display()
                )
            })?;
            debug!(src = %src.display(), bytes = written, "copied icon");
        }
    }
    Ok(handle)
}

fn fetch_to(url: &Url, dest: &Path, network: &NetworkConfig) -> Result<u64> {
    let client = net::http_client(network)?;
    let mut response = client
        .get(url.clone())
        .send()
        .with_context(|| format!("failed to fetch {url}"))?;
    let status = response.status();
    if !status.is_success() {
        return Err(anyhow!("unexpected response for {url}: {status}"));
    }

    let file = File::create(dest).with_context(|| format!("failed to create {}", dest.display()))?;
    let mut writer = BufWriter::new(file);
    let written =
        io::copy(&mut response, &mut writer).with_context(|| format!("stream error for {url}"))?;
    writer
        .into_inner()
        .map_err(io::IntoInnerError::into_error)
        .and_then(|file| file.sync_all())
        .with_context(|| format!("failed to flush {}", dest.display()))?;
    Ok(written)
}
