use std::path::{self, PathBuf};

use anyhow::Context;
use hoist_domain::{InstallRequest, Platform};
use serde::Serialize;
use tracing::{info, info_span};

use crate::acquire::acquire;
use crate::config::{HoistConfig, StateLayout};
use crate::error::InstallError;
use crate::integrate::{store_icon, write_launcher, LauncherEntry};
use crate::materialize::{AppMaterializer, MaterializeRequest};
use crate::relocate::{relocate, RelocationOutcome, RelocationReport};

/// Host-side settings for one install run.
#[derive(Debug, Clone)]
pub struct InstallOptions {
    pub layout: StateLayout,
    pub platform: Platform,
    /// Per-run temp root; a fresh temp dir is allocated when unset.
    pub temp_dir: Option<PathBuf>,
    pub config: HoistConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct InstallSummary {
    pub app_dir: PathBuf,
    pub shared_dir: PathBuf,
    pub icon_path: PathBuf,
    pub launcher_path: Option<PathBuf>,
    pub relocation: RelocationReport,
}

/// acquire → materialize → relocate → integrate.
///
/// Stages run strictly in order and the first failure ends the run. The temp icon is released
/// on every path out of this function.
pub fn install(
    request: &InstallRequest,
    options: &InstallOptions,
    materializer: &dyn AppMaterializer,
) -> Result<InstallSummary, InstallError> {
    let _span = info_span!("install", id = %request.id, platform = %options.platform).entered();
    request.validate()?;

    let mut icon = acquire(
        &request.icon,
        options.temp_dir.as_deref(),
        &request.id,
        options.config.network(),
    )?;
    info!(icon = %icon.path().display(), "icon ready");

    let app_dir = materializer
        .materialize(&MaterializeRequest {
            id: &request.id,
            name: &request.name,
            url: &request.url,
            icon: icon.path(),
            install_root: &request.install_root,
        })
        .and_then(|dir| {
            path::absolute(&dir).with_context(|| format!("failed to resolve {}", dir.display()))
        })
        .map_err(|source| InstallError::Materialization {
            id: request.id.clone(),
            source,
        })?;
    info!(app_dir = %app_dir.display(), "app materialized");

    let shared_dir = options.layout.version_dir(&request.runtime_version);
    let relocation = relocate(&app_dir, &shared_dir, options.platform)?;

    let icon_path = store_icon(icon.path(), &options.layout, &request.id)?;
    let launcher_path = if options.platform.writes_launcher() {
        let entry = LauncherEntry {
            name: request.name.clone(),
            exec: app_dir.join(&request.name),
            icon: icon_path.clone(),
        };
        Some(write_launcher(&options.layout, &request.id, &entry)?)
    } else {
        None
    };
    icon.release();

    info!(
        hoisted = relocation.count(RelocationOutcome::Hoisted),
        reused = relocation.count(RelocationOutcome::Reused),
        "install complete"
    );
    Ok(InstallSummary {
        app_dir,
        shared_dir,
        icon_path,
        launcher_path,
        relocation,
    })
}
