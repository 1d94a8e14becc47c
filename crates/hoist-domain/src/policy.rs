//! Per-platform dedup candidates.
//!
//! Each table lists the relative paths inside an installed app bundle that are byte-identical
//! across every app built against the same runtime version. Sizes are approximate and only
//! used for logging.

use std::path::PathBuf;

use serde::Serialize;

use crate::Platform;

/// What the relocator may do with a candidate on a given platform.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DedupPolicy {
    /// Move into the shared version directory and link back.
    Hoist,
    /// Leave the app-local copy untouched.
    KeepLocal,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct CandidateSubpath {
    components: &'static [&'static str],
    pub approx_size_mb: f32,
    pub policy: DedupPolicy,
}

impl CandidateSubpath {
    #[must_use]
    pub const fn hoist(components: &'static [&'static str], approx_size_mb: f32) -> Self {
        Self {
            components,
            approx_size_mb,
            policy: DedupPolicy::Hoist,
        }
    }

    #[must_use]
    pub const fn keep_local(components: &'static [&'static str], approx_size_mb: f32) -> Self {
        Self {
            components,
            approx_size_mb,
            policy: DedupPolicy::KeepLocal,
        }
    }

    /// Platform-native relative path for this candidate.
    #[must_use]
    pub fn relative_path(&self) -> PathBuf {
        self.components.iter().collect()
    }

    /// Forward-slash form used in logs and reports.
    #[must_use]
    pub fn display(&self) -> String {
        self.components.join("/")
    }
}

const MACOS: &[CandidateSubpath] = &[
    CandidateSubpath::hoist(&["Contents", "Resources", "app.asar"], 299.1),
    CandidateSubpath::hoist(
        &["Contents", "Resources", "app.asar.unpacked", "node_modules"],
        25.6,
    ),
    CandidateSubpath::hoist(&["Contents", "Frameworks", "Electron Framework.framework"], 118.0),
];

// Symlinked payloads break the Windows loader, so these stay inside each app.
const WINDOWS: &[CandidateSubpath] = &[
    CandidateSubpath::keep_local(&["resources", "app.asar"], 251.0),
    CandidateSubpath::keep_local(&["content_shell.pak"], 11.4),
    CandidateSubpath::keep_local(&["node.dll"], 17.7),
];

const LINUX: &[CandidateSubpath] = &[
    CandidateSubpath::hoist(&["resources", "app.asar"], 172.0),
    CandidateSubpath::hoist(&["resources", "app.asar.unpacked", "node_modules"], 7.2),
    CandidateSubpath::hoist(&["content_shell.pak"], 12.0),
    CandidateSubpath::hoist(&["libnode.so"], 21.1),
    CandidateSubpath::hoist(&["icudtl.dat"], 10.0),
    CandidateSubpath::hoist(&["libffmpeg.so"], 3.0),
    CandidateSubpath::hoist(&["snapshot_blob.bin"], 1.4),
];

/// Ordered dedup candidates for `platform`; empty for platforms without a table.
#[must_use]
pub fn candidates_for(platform: Platform) -> &'static [CandidateSubpath] {
    match platform {
        Platform::MacOs => MACOS,
        Platform::Windows => WINDOWS,
        Platform::Linux => LINUX,
        Platform::Other => &[],
    }
}
