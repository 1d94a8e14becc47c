use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Result};
use serde::Serialize;

const STATE_DIR_NAME: &str = ".hoist";
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub(crate) struct EnvSnapshot {
    vars: HashMap<String, String>,
}

impl EnvSnapshot {
    pub(crate) fn capture() -> Self {
        Self {
            vars: env::vars().collect(),
        }
    }

    pub(crate) fn var(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    #[cfg(test)]
    pub(crate) fn testing(pairs: &[(&str, &str)]) -> Self {
        let vars = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Self { vars }
    }
}

/// Process-level knobs read once per run.
#[derive(Debug, Clone)]
pub struct HoistConfig {
    pub(crate) network: NetworkConfig,
}

#[derive(Debug, Clone)]
pub struct NetworkConfig {
    pub keep_proxies: bool,
    pub timeout: Duration,
}

impl HoistConfig {
    /// Builds a configuration snapshot from the current process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_snapshot(&EnvSnapshot::capture())
    }

    pub(crate) fn from_snapshot(snapshot: &EnvSnapshot) -> Self {
        let timeout = snapshot
            .var("HOIST_HTTP_TIMEOUT_SECS")
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map_or(DEFAULT_HTTP_TIMEOUT, Duration::from_secs);
        Self {
            network: NetworkConfig {
                keep_proxies: crate::net::keep_proxies(snapshot),
                timeout,
            },
        }
    }

    #[must_use]
    pub fn network(&self) -> &NetworkConfig {
        &self.network
    }
}

impl Default for HoistConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig {
                keep_proxies: false,
                timeout: DEFAULT_HTTP_TIMEOUT,
            },
        }
    }
}

/// Home root of the invoking user, for runs that do not name one.
pub fn user_home() -> Result<PathBuf> {
    dirs_next::home_dir().ok_or_else(|| anyhow!("unable to determine the home directory"))
}

/// On-disk locations shared by every install for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateLayout {
    pub state_root: PathBuf,
    pub applications_dir: PathBuf,
}

impl StateLayout {
    /// Default layout under `home`: `~/.hoist` for state and the XDG applications dir for
    /// launcher entries.
    #[must_use]
    pub fn under_home(home: &Path) -> Self {
        Self {
            state_root: home.join(STATE_DIR_NAME),
            applications_dir: home.join(".local").join("share").join("applications"),
        }
    }

    #[must_use]
    pub fn with_overrides(
        home: &Path,
        state_root: Option<PathBuf>,
        applications_dir: Option<PathBuf>,
    ) -> Self {
        let defaults = Self::under_home(home);
        Self {
            state_root: state_root.unwrap_or(defaults.state_root),
            applications_dir: applications_dir.unwrap_or(defaults.applications_dir),
        }
    }

    #[must_use]
    pub fn icons_dir(&self) -> PathBuf {
        self.state_root.join("icons")
    }

    #[must_use]
    pub fn icon_path(&self, id: &str) -> PathBuf {
        self.icons_dir().join(format!("{id}.png"))
    }

    #[must_use]
    pub fn versions_dir(&self) -> PathBuf {
        self.state_root.join("versions")
    }

    /// Shared directory holding hoisted payloads for one runtime version.
    #[must_use]
    pub fn version_dir(&self, runtime_version: &str) -> PathBuf {
        self.versions_dir().join(runtime_version)
    }

    #[must_use]
    pub fn launcher_path(&self, id: &str) -> PathBuf {
        self.applications_dir.join(format!("hoist-{id}.desktop"))
    }
}
