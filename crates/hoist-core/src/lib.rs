#![deny(clippy::all, warnings)]

mod acquire;
mod config;
mod error;
mod fs;
mod integrate;
mod materialize;
mod net;
mod pipeline;
mod relocate;
mod report;

pub use crate::acquire::{acquire, IconSource, TempIconHandle};
pub use crate::config::{user_home, HoistConfig, NetworkConfig, StateLayout};
pub use crate::error::{codes as error_codes, InstallError};
pub use crate::integrate::{store_icon, write_launcher, LauncherEntry};
pub use crate::materialize::{AppMaterializer, CommandMaterializer, MaterializeRequest};
pub use crate::pipeline::{install, InstallOptions, InstallSummary};
pub use crate::relocate::{
    relocate, relocate_candidates, RelocationOutcome, RelocationReport, SubpathReport,
};
pub use crate::report::{
    install_panic_hook, supervise, FailureReport, JsonLineSink, ReportSink, Terminal,
    EXIT_FAILURE, EXIT_SUCCESS,
};

pub use hoist_domain::{InstallRequest, Platform};
