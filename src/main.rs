use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

mod backend;
mod config;
mod error;
mod menu;
mod models;
mod registry;
mod snapshot;
mod tmux;
mod zellij;

use backend::MultiplexerBackend;
use config::Config;
use menu::Menu;
use registry::Registry;
use tmux::TmuxBackend;
use zellij::ZellijBackend;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Multiplexer backend to drive
    #[arg(short, long, value_enum, default_value_t = BackendKind::Tmux, global = true)]
    backend: BackendKind,

    /// Optional config file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Dry run - only print information without making changes
    #[arg(short = 'n', long = "dry-run", global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum BackendKind {
    Tmux,
    Zellij,
}

#[derive(Subcommand)]
enum Commands {
    /// Save a snapshot of the live sessions
    Save,

    /// Recreate sessions from the saved snapshot
    Restore,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "muxman=warn".into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let backend: Box<dyn MultiplexerBackend> = match cli.backend {
        BackendKind::Tmux => Box::new(TmuxBackend::new()),
        BackendKind::Zellij => Box::new(ZellijBackend::new()),
    };

    let config_path = match cli.config {
        Some(path) => path,
        None => Config::default_config_file()?,
    };
    let config = Config::load(&config_path);

    match &cli.command {
        Some(Commands::Save) => {
            if cli.dry_run {
                let records = snapshot::take(backend.as_ref())?;
                println!("Would save to: {}\n", config.session_file.display());
                snapshot::print_records(&records);
            } else {
                snapshot::save(backend.as_ref(), &config.session_file)
                    .context("Failed to save session snapshot")?;
                println!("Snapshot saved to: {}", config.session_file.display());
            }
        }

        Some(Commands::Restore) => {
            let records = snapshot::load(&config.session_file).with_context(|| {
                format!("Failed to read snapshot {}", config.session_file.display())
            })?;
            if cli.dry_run {
                snapshot::print_records(&records);
            } else {
                let created = snapshot::restore(backend.as_ref(), &records)?;
                println!("Restored {created} session(s)");
            }
        }

        None => {
            // Replay the snapshot once, before the first render.
            match snapshot::restore_at_startup(&config, backend.as_ref()) {
                Ok(0) => {}
                Ok(created) => println!("Restored {created} session(s) from snapshot"),
                Err(err) => tracing::warn!("startup restore failed: {err}"),
            }

            let mut menu = Menu::new(config, Registry::new(backend));
            menu.run().context("menu loop failed")?;
        }
    }

    Ok(())
}
