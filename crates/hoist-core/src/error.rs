use std::path::PathBuf;

use hoist_domain::RequestError;

pub mod codes {
    pub const INVALID_REQUEST: &str = "HX100";
    pub const ACQUISITION: &str = "HX200";
    pub const MATERIALIZATION: &str = "HX300";
    pub const RELOCATION: &str = "HX400";
    pub const INTEGRATION: &str = "HX500";
}

/// Stage-level failures of an install run.
///
/// Each variant keeps its underlying cause as `source` so the reported stack carries the full
/// chain down to the I/O or transport error.
#[derive(Debug, thiserror::Error)]
pub enum InstallError {
    #[error("[HX100] invalid install request: {0}")]
    InvalidRequest(#[from] RequestError),
    #[error("[HX200] failed to acquire icon from {icon}")]
    Acquisition {
        icon: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("[HX300] app builder failed for {id}")]
    Materialization {
        id: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("[HX400] failed to relocate {subpath}")]
    Relocation {
        subpath: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("[HX500] failed to integrate {path}")]
    Integration {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
}

impl InstallError {
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => codes::INVALID_REQUEST,
            Self::Acquisition { .. } => codes::ACQUISITION,
            Self::Materialization { .. } => codes::MATERIALIZATION,
            Self::Relocation { .. } => codes::RELOCATION,
            Self::Integration { .. } => codes::INTEGRATION,
        }
    }
}
