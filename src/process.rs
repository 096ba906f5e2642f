//! Thin wrappers over external programs (docker, git, java, helm, kubectl...).

use anyhow::{Context, Result, bail};
use std::ffi::OsStr;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

pub fn command<I, S>(program: &str, args: I) -> Command
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut command = Command::new(program);
    command.args(args);
    command
}

fn describe(command: &Command) -> String {
    format!("{:?}", command.as_std())
}

/// Run with inherited stdio and wait; a non-zero exit is an error.
pub async fn run(command: &mut Command) -> Result<()> {
    let description = describe(command);
    debug!(command = %description, "running");

    let status = command
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .await
        .with_context(|| format!("cannot start {description}"))?;

    if !status.success() {
        bail!("{} exited with {}", description, status);
    }
    Ok(())
}

/// Run and capture stdout, stderr goes to the terminal.
pub async fn output(command: &mut Command) -> Result<String> {
    let description = describe(command);
    debug!(command = %description, "capturing output");

    let output = command
        .stdin(Stdio::null())
        .stderr(Stdio::inherit())
        .output()
        .await
        .with_context(|| format!("cannot start {description}"))?;

    if !output.status.success() {
        bail!("{} exited with {}", description, output.status);
    }
    String::from_utf8(output.stdout).with_context(|| format!("{description} printed invalid UTF-8"))
}

pub async fn copy_to_clipboard(text: &str) -> Result<()> {
    let mut cmd = match std::env::consts::OS {
        "macos" => command("pbcopy", [] as [&str; 0]),
        "linux" => command("xclip", ["-selection", "c"]),
        other => bail!("clipboard is not supported on {other}"),
    };

    let mut child = cmd
        .stdin(Stdio::piped())
        .spawn()
        .context("cannot start clipboard program")?;
    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(text.as_bytes()).await?;
        stdin.shutdown().await?;
    }

    let status = child.wait().await?;
    if !status.success() {
        bail!("clipboard program exited with {}", status);
    }
    Ok(())
}

/// Open a URL or folder with the desktop's default handler.
pub async fn open(target: &str) -> Result<()> {
    let mut cmd = match std::env::consts::OS {
        "macos" => command("open", [target]),
        "linux" => command("xdg-open", [target]),
        "windows" => command("rundll32", ["url.dll,FileProtocolHandler", target]),
        other => bail!("cannot open '{}' on {}", target, other),
    };
    run(&mut cmd).await
}
