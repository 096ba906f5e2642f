use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

use super::marker;
use crate::cli::{JenkinsCliCommand, JenkinsCommand, JenkinsContextArgs, JenkinsContextCommand};
use crate::config::{Config, ConfigError, ContextSet, Jenkins, JenkinsContext};
use crate::io::{Download, HttpDownloader};
use crate::process;

const CLI_JAR: &str = "jenkins-cli.jar";

pub async fn execute(command: JenkinsCommand, config: &mut Config) -> Result<()> {
    match command {
        JenkinsCommand::Cli { url, command } => match command {
            JenkinsCliCommand::Get => {
                let directory = std::env::current_dir()?;
                let jar = get_cli(&HttpDownloader::new()?, &url, &directory, &mut config.jenkins)
                    .await?;
                println!("The Jenkins CLI has been downloaded to {}", jar.display());
                Ok(())
            }
            JenkinsCliCommand::Exec {
                auth,
                websockets,
                args,
            } => {
                let jar = registered_cli(&config.jenkins)?;
                let mut command = cli_command(&jar, &url, websockets, auth.as_deref(), &args);
                process::run(&mut command).await
            }
        },
        JenkinsCommand::Context { command } => context(command, &mut config.jenkins.contexts).await,
    }
}

async fn context(
    command: JenkinsContextCommand,
    contexts: &mut ContextSet<JenkinsContext>,
) -> Result<()> {
    match command {
        JenkinsContextCommand::Create(args) => create(contexts, args),
        JenkinsContextCommand::List { verbose } => {
            print!("{}", list(contexts, verbose));
            Ok(())
        }
        JenkinsContextCommand::Delete { names } => {
            for name in names {
                match contexts.remove(&name) {
                    Ok(_) => println!("Jenkins context '{name}' deleted"),
                    Err(ConfigError::ContextNotFound { .. }) => {
                        println!("Context {name} not found.")
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            Ok(())
        }
        JenkinsContextCommand::SetCurrent { name } => {
            contexts.set_current(&name)?;
            println!("Current Jenkins context set to '{name}'");
            Ok(())
        }
        JenkinsContextCommand::Start { name, jvm_options } => {
            let context = contexts.resolve(name.as_deref())?;
            println!("Starting context '{}'", context.name);
            process::run(&mut start_command(context, &jvm_options)).await
        }
        JenkinsContextCommand::AdminPassword { name } => {
            let context = contexts.resolve(name.as_deref())?;
            println!("{}", admin_password(context)?);
            Ok(())
        }
    }
}

/// Download `jenkins-cli.jar` from the instance into `directory` and
/// remember where it is.
async fn get_cli(
    downloader: &impl Download,
    url: &str,
    directory: &Path,
    jenkins: &mut Jenkins,
) -> Result<PathBuf> {
    let jar = directory.join(CLI_JAR);
    let source = format!("{}/jnlpJars/{}", url.trim_end_matches('/'), CLI_JAR);
    downloader.download(&source, &jar).await?;
    jenkins.cli = jar.to_string_lossy().into_owned();
    Ok(jar)
}

fn registered_cli(jenkins: &Jenkins) -> Result<PathBuf> {
    if jenkins.cli.is_empty() {
        bail!("No {} registered. Use 'jenkins cli get' first", CLI_JAR);
    }
    let jar = PathBuf::from(&jenkins.cli);
    let metadata = std::fs::metadata(&jar)
        .with_context(|| format!("cannot access {}", jar.display()))?;
    if metadata.is_dir() {
        bail!("{} is a directory", jar.display());
    }
    Ok(jar)
}

fn cli_command(
    jar: &Path,
    url: &str,
    websockets: bool,
    auth: Option<&str>,
    args: &[String],
) -> Command {
    let mut command = process::command("java", ["-jar"]);
    command.arg(jar).args(["-s", url]);
    if websockets {
        command.arg("-webSocket");
    }
    if let Some(auth) = auth {
        command.args(["-auth", auth]);
    }
    command.args(args);
    command
}

fn create(contexts: &mut ContextSet<JenkinsContext>, args: JenkinsContextArgs) -> Result<()> {
    if !args.war.is_file() {
        bail!("The file {} does not exist", args.war.display());
    }
    let war = std::path::absolute(&args.war)
        .with_context(|| format!("cannot resolve {}", args.war.display()))?;

    contexts.add(JenkinsContext {
        name: args.name.clone(),
        description: args.description,
        war,
        jenkins_home: args.jenkins_home.unwrap_or_default(),
        java_home: args.java_home.unwrap_or_default(),
        options: args.options,
        jvm_options: args.jvm_options,
    })?;
    contexts.set_current(&args.name)?;
    Ok(())
}

/// `java <jvm options> -jar <war> <options>`, in the foreground.
fn start_command(context: &JenkinsContext, extra_jvm_options: &[String]) -> Command {
    let java = if context.java_home.as_os_str().is_empty() {
        PathBuf::from("java")
    } else {
        context.java_home.join("bin").join("java")
    };

    let mut command = Command::new(java);
    command
        .args(&context.jvm_options)
        .args(extra_jvm_options)
        .arg("-jar")
        .arg(&context.war)
        .args(&context.options)
        .env("JENKINS_HA", "false");

    if !context.java_home.as_os_str().is_empty() {
        command.env("JAVA_HOME", &context.java_home);
    }
    if !context.jenkins_home.as_os_str().is_empty() {
        command.env("JENKINS_HOME", &context.jenkins_home);
    }
    command
}

/// Jenkins falls back to `~/.jenkins` when no home is configured.
fn jenkins_home(context: &JenkinsContext) -> Result<PathBuf> {
    if !context.jenkins_home.as_os_str().is_empty() {
        return Ok(context.jenkins_home.clone());
    }
    let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
    Ok(home.join(".jenkins"))
}

fn admin_password(context: &JenkinsContext) -> Result<String> {
    let file = jenkins_home(context)?
        .join("secrets")
        .join("initialAdminPassword");
    debug!(file = %file.display(), "reading initial admin password");
    let password = std::fs::read_to_string(&file)
        .with_context(|| format!("cannot read {}", file.display()))?;
    Ok(password.trim().to_string())
}

fn list(contexts: &ContextSet<JenkinsContext>, verbose: bool) -> String {
    let mut text = String::new();
    for context in contexts.iter() {
        let current = marker(contexts.is_current(&context.name));
        if verbose {
            text.push_str(&format!("{current}Name: {}\n", context.name));
            text.push_str(&format!("  Description: {}\n", context.description));
            text.push_str(&format!("  War: {}\n", context.war.display()));
            text.push_str(&format!("  Jenkins home: {}\n", context.jenkins_home.display()));
            text.push_str(&format!("  Java home: {}\n", context.java_home.display()));
            text.push_str(&format!("  Options: {}\n", context.options.join(" ")));
            text.push_str(&format!("  JVM options: {}\n\n", context.jvm_options.join(" ")));
        } else {
            text.push_str(&format!("{current}{}\n", context.name));
        }
    }
    text
}
