//! FSX AutoSave — periodic flight saving for FSX/Prepar3D over SimConnect.

use anyhow::Result;
use clap::{Parser, Subcommand};

use autosave_core::store;

#[derive(Parser)]
#[command(name = "fsx-autosave", about = "Periodically saves the current flight through SimConnect")]
struct Cli {
    /// Run even when not launched by the simulator.
    #[arg(short, long)]
    force: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Open the settings dialog.
    Options,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let settings_path = store::default_path();

    match cli.command {
        Some(Command::Options) => {
            let path = settings_path
                .ok_or_else(|| anyhow::anyhow!("no config directory available on this platform"))?;
            fsx_autosave::options::run_options_dialog(path)
        }
        None => run_client(cli.force, settings_path),
    }
}

#[cfg(windows)]
fn run_client(force: bool, settings_path: Option<std::path::PathBuf>) -> Result<()> {
    use fsx_autosave::pump;

    // The simulator's EXE.xml launcher entry passes -f; a bare double-click
    // gets a warning instead of silently racing a running instance.
    if !cfg!(debug_assertions) && !force {
        pump::warning_box(
            "FSX AutoSave was started outside of the simulator. Running multiple \
             instances may misbehave; pass -f to override.",
        );
        std::process::exit(1);
    }

    let settings = match &settings_path {
        Some(path) => store::load(path),
        None => autosave_core::Settings::default(),
    };
    log::info!("settings loaded: {settings:?}");

    pump::run(settings, settings_path)
}

#[cfg(not(windows))]
fn run_client(_force: bool, _settings_path: Option<std::path::PathBuf>) -> Result<()> {
    anyhow::bail!("the autosave client needs SimConnect and only runs on Windows; `options` works everywhere")
}
