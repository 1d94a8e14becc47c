use std::path::PathBuf;

use clap::{ArgAction, Parser};
use hoist_domain::{InstallRequest, Platform};

pub const HOIST_BEFORE_HELP: &str = concat!(
    "hoist-install ",
    env!("CARGO_PKG_VERSION"),
    " - install a web app and share its runtime payloads\n\n",
    "Stages: fetch icon, build app, hoist shared payloads, register icon and launcher.\n",
    "Failures are reported as one {message, stack} JSON line on stdout; logs go to stderr.\n",
);

#[derive(Parser, Debug)]
#[command(author, version, before_help = HOIST_BEFORE_HELP)]
pub struct HoistCli {
    #[arg(long, env = "HOIST_ID", help = "Stable app identifier (names the icon and launcher)")]
    pub id: String,
    #[arg(long, env = "HOIST_NAME", help = "Display name; also the app's directory name")]
    pub name: String,
    #[arg(long, env = "HOIST_URL", help = "Address the installed app opens")]
    pub url: String,
    #[arg(long, env = "HOIST_ICON", help = "Icon as an http(s) URL or a local path")]
    pub icon: String,
    #[arg(
        long,
        env = "HOIST_INSTALL_ROOT",
        value_name = "DIR",
        help = "Directory the builder installs the app under"
    )]
    pub install_root: PathBuf,
    #[arg(
        long,
        env = "HOIST_HOME",
        value_name = "DIR",
        help = "Home root for hoist state (default: the current user's home)"
    )]
    pub home: Option<PathBuf>,
    #[arg(
        long,
        env = "HOIST_RUNTIME_VERSION",
        value_name = "VERSION",
        help = "Runtime version tag; apps with the same tag share payloads"
    )]
    pub runtime_version: String,
    #[arg(
        long,
        env = "HOIST_TEMP_DIR",
        value_name = "DIR",
        help = "Temp root for the downloaded icon (default: a fresh system temp dir)"
    )]
    pub temp_dir: Option<PathBuf>,
    #[arg(
        long,
        env = "HOIST_STATE_DIR",
        value_name = "DIR",
        help = "State root (default: <home>/.hoist)"
    )]
    pub state_dir: Option<PathBuf>,
    #[arg(
        long,
        env = "HOIST_APPLICATIONS_DIR",
        value_name = "DIR",
        help = "Launcher directory (default: <home>/.local/share/applications)"
    )]
    pub applications_dir: Option<PathBuf>,
    #[arg(
        long,
        env = "HOIST_BUILDER",
        value_name = "PROGRAM",
        help = "Program that builds the app and prints its directory"
    )]
    pub builder: Option<PathBuf>,
    #[arg(
        long = "builder-arg",
        value_name = "ARG",
        allow_hyphen_values = true,
        help = "Argument passed to the builder before the generated flags (repeatable)"
    )]
    pub builder_args: Vec<String>,
    #[arg(
        long,
        env = "HOIST_PLATFORM",
        help = "Platform layout to apply: macos, windows, linux, other (default: host)"
    )]
    pub platform: Option<Platform>,
    #[arg(short, long, action = ArgAction::Count, help = "Increase logging (-vv reaches trace)")]
    pub verbose: u8,
    #[arg(long, help = "Force trace logging regardless of -v")]
    pub trace: bool,
}

impl HoistCli {
    pub fn request(&self, home: PathBuf) -> InstallRequest {
        InstallRequest {
            id: self.id.clone(),
            name: self.name.clone(),
            url: self.url.clone(),
            icon: self.icon.clone(),
            install_root: self.install_root.clone(),
            home,
            runtime_version: self.runtime_version.clone(),
        }
    }

    pub fn platform(&self) -> Platform {
        self.platform.unwrap_or_else(Platform::current)
    }
}
