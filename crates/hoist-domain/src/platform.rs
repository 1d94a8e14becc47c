use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Platform family an install targets.
///
/// Policy lookups are keyed by this value rather than by `cfg!` checks so every table can be
/// exercised on any host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Platform {
    MacOs,
    Windows,
    Linux,
    Other,
}

impl Platform {
    #[must_use]
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Self::MacOs
        } else if cfg!(target_os = "windows") {
            Self::Windows
        } else if cfg!(target_os = "linux") {
            Self::Linux
        } else {
            Self::Other
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MacOs => "macos",
            Self::Windows => "windows",
            Self::Linux => "linux",
            Self::Other => "other",
        }
    }

    /// Whether installs on this platform register a freedesktop launcher entry.
    #[must_use]
    pub fn writes_launcher(self) -> bool {
        matches!(self, Self::Linux)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown platform '{0}' (expected one of: macos, windows, linux, other)")]
pub struct UnknownPlatform(pub String);

impl FromStr for Platform {
    type Err = UnknownPlatform;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "macos" | "darwin" | "mac" => Ok(Self::MacOs),
            "windows" | "win32" => Ok(Self::Windows),
            "linux" => Ok(Self::Linux),
            "other" => Ok(Self::Other),
            other => Err(UnknownPlatform(other.to_string())),
        }
    }
}
