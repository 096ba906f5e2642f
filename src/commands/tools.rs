use anyhow::Result;

use super::Session;
use crate::cli::{InstallArgs, ServersCommand, ToolsCommand};
use crate::install::{Installer, Layout};
use crate::io::HttpDownloader;
use crate::registry::{self, Descriptor};

pub async fn tools(command: ToolsCommand, session: &mut Session<'_>) -> Result<()> {
    match command {
        ToolsCommand::Install(args) => {
            let tool = registry::find_tool(&args.name)?;
            let version = args
                .version
                .unwrap_or_else(|| session.config.tool_version(tool).to_string());
            install(tool, &version, session).await
        }
        ToolsCommand::List { verbose } => {
            print!("{}", list("Supported tools:", registry::TOOLS, verbose));
            Ok(())
        }
    }
}

pub async fn servers(command: ServersCommand, session: &mut Session<'_>) -> Result<()> {
    match command {
        ServersCommand::Install(InstallArgs { name, version }) => {
            let server = registry::find_server(&name)?;
            let version = version.unwrap_or_else(|| server.default_version.to_string());
            install(server, &version, session).await
        }
        ServersCommand::List => {
            print!("{}", list("Supported servers:", registry::SERVERS, true));
            Ok(())
        }
    }
}

async fn install(descriptor: &Descriptor, version: &str, session: &Session<'_>) -> Result<()> {
    println!("Installing {} {}", descriptor.name, version);
    let layout = Layout::new(session.bin_dir.clone(), session.config);
    let installer = Installer::new(HttpDownloader::new()?, layout);
    let path = installer.install(descriptor, version).await?;
    println!("{} installed successfully in {}", descriptor.name, path.display());
    Ok(())
}

fn list(title: &str, descriptors: &[Descriptor], verbose: bool) -> String {
    let mut text = format!("{title}\n");
    for descriptor in descriptors {
        text.push_str(&format!("  - {}\n", descriptor.name));
        if verbose {
            text.push_str(&format!("    Default version: {}\n", descriptor.default_version));
            text.push_str(&format!("    Description: {}\n", descriptor.description));
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_list_has_one_line_per_tool() {
        let text = list("Supported tools:", registry::TOOLS, false);
        assert_eq!(text.lines().count(), registry::TOOLS.len() + 1);
        assert!(text.contains("  - terraform\n"));
    }

    #[test]
    fn verbose_list_shows_versions() {
        let text = list("Supported servers:", registry::SERVERS, true);
        assert_eq!(
            text,
            "Supported servers:\n  - tomcat\n    Default version: 10.0.10\n    Description: Apache Tomcat servlet container\n"
        );
    }

    #[tokio::test]
    async fn unknown_tool_fails_before_downloading() {
        let mut config = crate::config::Config::default();
        let mut session = Session {
            config: &mut config,
            bin_dir: std::path::PathBuf::from("/nonexistent/bin"),
        };
        let err = tools(
            ToolsCommand::Install(InstallArgs {
                name: "emacs".to_string(),
                version: None,
            }),
            &mut session,
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "Tool not found: 'emacs'");
    }
}
