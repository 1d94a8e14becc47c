//! Hoist version-identical payloads out of an installed app into the shared version directory.
//!
//! Every candidate is handled on its own: check the shared copy, then move or discard the app
//! copy, then link the app path at the shared copy. Candidates run in parallel and share no
//! state beyond the filesystem. Concurrent installs may race on the same shared entry; the move
//! step reports a lost race as [`MoveOutcome::Claimed`] and the loser adopts the winner's copy.

use std::fs as stdfs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use hoist_domain::{candidates_for, CandidateSubpath, DedupPolicy, Platform};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::InstallError;
use crate::fs;

/// What happened to one candidate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RelocationOutcome {
    /// App copy moved into the shared directory, then linked.
    Hoisted,
    /// Shared copy already present; app copy discarded and linked.
    Reused,
    /// App copy was gone but the shared copy existed; link recreated.
    Relinked,
    /// App path already links to the shared copy.
    AlreadyLinked,
    /// Platform policy keeps this payload inside the app.
    KeptLocal,
    /// Neither the app nor the shared directory has this payload.
    Missing,
}

#[derive(Clone, Debug, Serialize)]
pub struct SubpathReport {
    pub subpath: String,
    pub outcome: RelocationOutcome,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct RelocationReport {
    pub entries: Vec<SubpathReport>,
}

impl RelocationReport {
    #[must_use]
    pub fn count(&self, outcome: RelocationOutcome) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.outcome == outcome)
            .count()
    }

    #[must_use]
    pub fn outcome_of(&self, subpath: &str) -> Option<RelocationOutcome> {
        self.entries
            .iter()
            .find(|entry| entry.subpath == subpath)
            .map(|entry| entry.outcome)
    }
}

/// Result of trying to move an app payload into the shared directory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum MoveOutcome {
    Moved,
    /// Another installer put an entry at the destination first.
    Claimed,
}

/// Relocate the platform's candidates from `app_dir` into `shared_dir`.
pub fn relocate(
    app_dir: &Path,
    shared_dir: &Path,
    platform: Platform,
) -> Result<RelocationReport, InstallError> {
    relocate_candidates(app_dir, shared_dir, candidates_for(platform))
}

/// Relocate an explicit candidate list; the first failure stops the remaining work.
///
/// Relative directories are resolved against the working directory first. Links always carry
/// an absolute target.
pub fn relocate_candidates(
    app_dir: &Path,
    shared_dir: &Path,
    candidates: &[CandidateSubpath],
) -> Result<RelocationReport, InstallError> {
    let app_dir = absolute_dir(app_dir)?;
    let shared_dir = absolute_dir(shared_dir)?;
    let entries = candidates
        .par_iter()
        .map(|candidate| {
            let subpath = candidate.display();
            match relocate_one(&app_dir, &shared_dir, candidate) {
                Ok(outcome) => {
                    info!(
                        subpath = %subpath,
                        outcome = ?outcome,
                        approx_mb = candidate.approx_size_mb,
                        "relocated"
                    );
                    Ok(SubpathReport { subpath, outcome })
                }
                Err(source) => Err(InstallError::Relocation { subpath, source }),
            }
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(RelocationReport { entries })
}

fn absolute_dir(dir: &Path) -> Result<PathBuf, InstallError> {
    std::path::absolute(dir).map_err(|err| InstallError::Relocation {
        subpath: dir.display().to_string(),
        source: anyhow::Error::new(err).context(format!("failed to resolve {}", dir.display())),
    })
}

fn relocate_one(
    app_dir: &Path,
    shared_dir: &Path,
    candidate: &CandidateSubpath,
) -> Result<RelocationOutcome> {
    if candidate.policy == DedupPolicy::KeepLocal {
        return Ok(RelocationOutcome::KeptLocal);
    }
    let rel = candidate.relative_path();
    let origin = app_dir.join(&rel);
    let dest = shared_dir.join(&rel);

    if fs::is_link_to(&origin, &dest) && dest.exists() {
        return Ok(RelocationOutcome::AlreadyLinked);
    }

    let outcome = if dest.exists() {
        if fs::remove_entry(&origin)? {
            RelocationOutcome::Reused
        } else {
            RelocationOutcome::Relinked
        }
    } else {
        match stdfs::symlink_metadata(&origin) {
            Ok(meta) if meta.file_type().is_symlink() => {
                return Err(anyhow!(
                    "{} is a link but {} does not exist",
                    origin.display(),
                    dest.display()
                ));
            }
            Ok(_) => match move_into_shared(&origin, &dest)? {
                MoveOutcome::Moved => RelocationOutcome::Hoisted,
                MoveOutcome::Claimed => {
                    debug!(dest = %dest.display(), "shared entry claimed by another installer");
                    fs::remove_entry(&origin)?;
                    RelocationOutcome::Reused
                }
            },
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                match absent_origin_outcome(&origin, &dest)? {
                    RelocationOutcome::Missing => return Ok(RelocationOutcome::Missing),
                    outcome => outcome,
                }
            }
            Err(err) => {
                return Err(err).with_context(|| format!("failed to stat {}", origin.display()));
            }
        }
    };

    fs::replace_link(&dest, &origin)?;
    Ok(outcome)
}

/// Outcome for an origin found absent after `dest` was seen missing.
///
/// `dest` is checked again: another installer may have created it in between, in which case
/// only the link is left to complete.
fn absent_origin_outcome(origin: &Path, dest: &Path) -> Result<RelocationOutcome> {
    if fs::entry_exists(dest)? {
        debug!(dest = %dest.display(), "shared entry appeared while origin was absent");
        Ok(RelocationOutcome::Relinked)
    } else {
        debug!(origin = %origin.display(), "candidate not present");
        Ok(RelocationOutcome::Missing)
    }
}

/// Move `origin` to `dest`, classifying a lost race instead of failing on it.
///
/// A rename that fails while `dest` exists means another installer created `dest` between our
/// existence check and the rename. That includes `origin` having vanished because the other
/// installer already moved it.
pub(crate) fn move_into_shared(origin: &Path, dest: &Path) -> Result<MoveOutcome> {
    if let Some(parent) = dest.parent() {
        stdfs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let err = match stdfs::rename(origin, dest) {
        Ok(()) => return Ok(MoveOutcome::Moved),
        Err(err) => err,
    };
    if fs::entry_exists(dest)? {
        return Ok(MoveOutcome::Claimed);
    }
    if err.kind() != io::ErrorKind::CrossesDevices {
        return Err(err).with_context(|| {
            format!("failed to move {} to {}", origin.display(), dest.display())
        });
    }

    match fs::move_across_devices(origin, dest) {
        Ok(()) => Ok(MoveOutcome::Moved),
        Err(err) => {
            if fs::entry_exists(dest)? {
                return Ok(MoveOutcome::Claimed);
            }
            Err(err).with_context(|| {
                format!(
                    "failed to copy {} across devices to {}",
                    origin.display(),
                    dest.display()
                )
            })
        }
    }
}
