//! Main entry point for the devcore CLI application.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use devcore::commands::{self, Session};
use devcore::{Cli, ConfigStore};

/// Parses the command line, loads the configuration, runs the command and
/// saves the configuration if the command changed it.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let store = ConfigStore::locate(cli.config.clone())?;
    let mut config = store.load()?;
    let loaded = config.clone();

    let mut session = Session {
        config: &mut config,
        bin_dir: cli.bin_dir.clone(),
    };
    commands::execute(cli.command, &mut session).await?;

    if config != loaded {
        store.save(&config)?;
    }
    Ok(())
}

/// Logs go to stderr so command output on stdout stays clean.
fn init_tracing(debug: bool) {
    let default = if debug { "devcore=debug" } else { "devcore=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
