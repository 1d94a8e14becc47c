use std::path::{self, Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use hoist_core::{
    install, install_panic_hook, supervise, user_home, CommandMaterializer, HoistConfig,
    InstallOptions, JsonLineSink, StateLayout,
};
use tracing::debug;

mod cli;

use cli::HoistCli;

fn main() {
    if std::env::var_os("RUST_LIB_BACKTRACE").is_none() {
        std::env::set_var("RUST_LIB_BACKTRACE", "1");
    }
    install_panic_hook();

    let terminal = supervise(run);
    let code = terminal.report_to(&mut JsonLineSink::stdout());
    std::process::exit(code);
}

fn run() -> Result<()> {
    let cli = match HoistCli::try_parse() {
        Ok(cli) => cli,
        // --help and --version
        Err(err) if !err.use_stderr() => {
            err.print()?;
            return Ok(());
        }
        Err(err) => return Err(anyhow!(usage_message(&err))),
    };
    init_tracing(cli.trace, cli.verbose);

    let home = match &cli.home {
        Some(home) => home.clone(),
        None => user_home().context("pass --home or set HOIST_HOME")?,
    };
    let request = cli.request(home.clone());
    let options = InstallOptions {
        layout: layout(&cli, &home)?,
        platform: cli.platform(),
        temp_dir: cli.temp_dir.clone(),
        config: HoistConfig::from_env(),
    };
    debug!(layout = ?options.layout, platform = %options.platform, "resolved install options");

    let builder = cli
        .builder
        .clone()
        .ok_or_else(|| anyhow!("no app builder configured (pass --builder or set HOIST_BUILDER)"))?;
    let materializer = CommandMaterializer::new(builder).with_args(&cli.builder_args);

    install(&request, &options, &materializer)?;
    Ok(())
}

/// Symlinks point at the shared directory by absolute path, so the layout is resolved up front.
fn layout(cli: &HoistCli, home: &Path) -> Result<StateLayout> {
    let layout = StateLayout::with_overrides(
        home,
        cli.state_dir.clone(),
        cli.applications_dir.clone(),
    );
    Ok(StateLayout {
        state_root: absolute(&layout.state_root)?,
        applications_dir: absolute(&layout.applications_dir)?,
    })
}

fn absolute(path: &Path) -> Result<PathBuf> {
    path::absolute(path).with_context(|| format!("failed to resolve {}", path.display()))
}

fn usage_message(err: &clap::Error) -> String {
    let rendered = err.to_string();
    rendered
        .lines()
        .find(|line| !line.trim().is_empty())
        .map_or_else(
            || "invalid arguments".to_string(),
            |line| line.trim_start_matches("error: ").to_string(),
        )
}

fn init_tracing(trace: bool, verbose: u8) {
    let level = if trace {
        "trace"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = format!("hoist_core={level},hoist_install={level}");
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
