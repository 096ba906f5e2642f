use anyhow::{Context, Result, bail};
use std::path::Path;

use super::marker;
use crate::cli::{ComposeContextCommand, DockerComposeCommand};
use crate::config::{Config, ContextSet, DockerComposeContext};
use crate::process;

pub async fn execute(command: DockerComposeCommand, config: &mut Config) -> Result<()> {
    let DockerComposeCommand::Context { command } = command;
    let contexts = &mut config.docker_compose;

    match command {
        ComposeContextCommand::Create {
            name,
            file,
            description,
        } => {
            create(contexts, name, &file, description)?;
            Ok(())
        }
        ComposeContextCommand::List { verbose } => {
            print!("{}", list(contexts, verbose));
            Ok(())
        }
        ComposeContextCommand::Delete { name } => {
            let name = contexts.resolve(name.as_deref())?.name.clone();
            contexts.remove(&name)?;
            println!("Docker compose context '{name}' deleted");
            Ok(())
        }
        ComposeContextCommand::SetCurrent { name } => {
            contexts.set_current(&name)?;
            println!("Current docker compose context set to '{name}'");
            Ok(())
        }
        ComposeContextCommand::Start { name } => {
            let context = contexts.resolve(name.as_deref())?;
            println!("Starting context '{}'", context.name);
            process::run(&mut compose(context, &["up", "-d"])).await
        }
        ComposeContextCommand::Stop { name } => {
            let context = contexts.resolve(name.as_deref())?;
            println!("Stopping context '{}'", context.name);
            process::run(&mut compose(context, &["down", "-v"])).await
        }
        ComposeContextCommand::OpenFolder { name } => {
            let context = contexts.resolve(name.as_deref())?;
            process::open(&context.dir().to_string_lossy()).await
        }
    }
}

/// Register a new context and make it current.
fn create(
    contexts: &mut ContextSet<DockerComposeContext>,
    name: String,
    file: &Path,
    description: String,
) -> Result<()> {
    if !file.is_file() {
        bail!("The file {} does not exist", file.display());
    }
    // Stored absolute so the context works from any directory.
    let file = std::path::absolute(file)
        .with_context(|| format!("cannot resolve {}", file.display()))?;

    contexts.add(DockerComposeContext {
        name: name.clone(),
        description,
        file,
    })?;
    contexts.set_current(&name)?;
    Ok(())
}

fn compose(context: &DockerComposeContext, action: &[&str]) -> tokio::process::Command {
    let mut command = process::command("docker", ["compose", "-f"]);
    command.arg(&context.file).args(action);
    command
}

fn list(contexts: &ContextSet<DockerComposeContext>, verbose: bool) -> String {
    let mut text = String::new();
    for context in contexts.iter() {
        let current = marker(contexts.is_current(&context.name));
        if verbose {
            text.push_str(&format!("{current}Name: {}\n", context.name));
            text.push_str(&format!("  Description: {}\n", context.description));
            text.push_str(&format!("  File: {}\n\n", context.file.display()));
        } else {
            text.push_str(&format!("{current}{}\n", context.name));
        }
    }
    text
}
