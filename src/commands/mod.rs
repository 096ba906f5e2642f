//! Command handlers, one module per top-level subcommand.
//!
//! Handlers read and mutate the [`Config`] held by the [`Session`]; the
//! binary decides whether it needs saving afterwards.

mod docker_compose;
mod jenkins;
mod kind;
mod project;
mod tools;

use anyhow::{Result, bail};
use std::path::PathBuf;
use tracing::debug;

use crate::cli::{Command, ConfigCommand, HelmCommand, Resource};
use crate::config::Config;
use crate::process;
use crate::registry;

pub struct Session<'a> {
    pub config: &'a mut Config,
    pub bin_dir: PathBuf,
}

pub async fn execute(command: Command, session: &mut Session<'_>) -> Result<()> {
    debug!(?command, "dispatching");
    match command {
        Command::Tools { command } => tools::tools(command, session).await,
        Command::Servers { command } => tools::servers(command, session).await,
        Command::Config {
            command: ConfigCommand::RestoreDefaultToolsVersions,
        } => {
            session.config.restore_default_tools_versions();
            println!("Default tools versions restored");
            Ok(())
        }
        Command::DockerCompose { command } => docker_compose::execute(command, session.config).await,
        Command::Jenkins { command } => jenkins::execute(command, session.config).await,
        Command::Project { command } => project::execute(command, session.config).await,
        Command::Helm { command } => helm(command).await,
        Command::Kind { command } => kind::execute(command).await,
        Command::Open { resource } => open(resource, session.config).await,
        Command::Version { verbose } => {
            print!("{}", version(verbose));
            Ok(())
        }
    }
}

async fn helm(command: HelmCommand) -> Result<()> {
    match command {
        HelmCommand::Install {
            release,
            chart,
            namespace,
        } => {
            let mut args = vec!["install".to_string(), release, chart];
            if let Some(namespace) = namespace {
                process::run(&mut process::command(
                    "kubectl",
                    ["create", "namespace", namespace.as_str()],
                ))
                .await?;
                args.extend(["-n".to_string(), namespace]);
            }
            process::run(&mut process::command("helm", &args)).await
        }
        HelmCommand::Uninstall { release, namespace } => {
            let mut args = vec!["uninstall".to_string(), release];
            if let Some(namespace) = namespace {
                args.extend(["-n".to_string(), namespace]);
            }
            process::run(&mut process::command("helm", &args)).await
        }
    }
}

async fn open(resource: Resource, config: &Config) -> Result<()> {
    let folder = match resource {
        Resource::Projects | Resource::ProjectsDir => &config.projects_dir,
        Resource::Servers | Resource::ServersDir => &config.servers_dir,
    };
    if !folder.exists() {
        bail!("The resource to open does not exist: {}", folder.display());
    }
    process::open(&folder.to_string_lossy()).await
}

fn version(verbose: bool) -> String {
    let mut text = format!("devcore version {}\n", env!("CARGO_PKG_VERSION"));
    if verbose {
        text.push_str("- Supported tools for installation with their default version:\n");
        for tool in registry::TOOLS {
            text.push_str(&format!("  - {} {}\n", tool.name, tool.default_version));
        }
        text.push_str("- Supported servers for installation with their default version:\n");
        for server in registry::SERVERS {
            text.push_str(&format!("  - {} {}\n", server.name, server.default_version));
        }
        text.push_str(
            "- Docker compose contexts can be created, listed, started, stopped and deleted\n\
             - Jenkins contexts can be created, started and queried for their admin password\n\
             - The Jenkins CLI can be downloaded and executed\n\
             - git projects can be cloned, checked and updated\n\
             - Helm charts can be installed and uninstalled\n\
             - kind clusters can be created with a Kubernetes dashboard and deleted\n",
        );
    }
    text
}

/// `* name` for the current context, `  name` otherwise.
fn marker(current: bool) -> &'static str {
    if current { "* " } else { "  " }
}
