use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "devcore")]
#[command(version)]
#[command(about = "devcore provides developers/development utilities", long_about = None)]
#[command(after_help = "Examples:\n  \
  devcore tools install kubectl -v 1.23.6     install kubectl into the bin directory\n  \
  devcore dc context create -n web -f ./docker-compose.yml\n  \
  devcore jenkins cli exec -a admin:token who-am-i")]
pub struct Cli {
    /// Configuration file [default: ~/.devcore/config.json]
    #[arg(long, global = true, env = "DEVCORE_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory receiving installed executables
    #[arg(
        long,
        global = true,
        env = "DEVCORE_BIN_DIR",
        value_name = "DIR",
        default_value = "/usr/local/bin"
    )]
    pub bin_dir: PathBuf,

    /// Print debug logs (RUST_LOG takes precedence)
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Provide facilitators for developers' tools
    Tools {
        #[command(subcommand)]
        command: ToolsCommand,
    },

    /// Provide facilitators for developers' servers
    Servers {
        #[command(subcommand)]
        command: ServersCommand,
    },

    /// devcore config management
    #[command(visible_alias = "c")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// docker compose related utilities
    #[command(name = "docker-compose", visible_alias = "dc")]
    DockerCompose {
        #[command(subcommand)]
        command: DockerComposeCommand,
    },

    /// Interact with Jenkins
    Jenkins {
        #[command(subcommand)]
        command: JenkinsCommand,
    },

    /// Utilities to manage GitHub projects
    Project {
        #[command(subcommand)]
        command: ProjectCommand,
    },

    /// Provide Helm utilities
    Helm {
        #[command(subcommand)]
        command: HelmCommand,
    },

    /// Provide kind utilities
    Kind {
        #[command(subcommand)]
        command: KindCommand,
    },

    /// Opens a set of resources
    Open {
        #[arg(value_enum)]
        resource: Resource,
    },

    /// Display devcore version
    Version {
        /// Displays more info concerning the devcore version
        #[arg(short, long)]
        verbose: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum ToolsCommand {
    /// Install a tool
    Install(InstallArgs),

    /// List supported tools
    #[command(visible_alias = "ls")]
    List {
        /// Show default versions and descriptions
        #[arg(short, long)]
        verbose: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum ServersCommand {
    /// Install a server
    Install(InstallArgs),

    /// List supported servers
    #[command(visible_alias = "ls")]
    List,
}

#[derive(Args, Debug)]
pub struct InstallArgs {
    /// Name as shown by `list`
    pub name: String,

    /// The version to install
    #[arg(short = 'v', long = "version", value_name = "VERSION")]
    pub version: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Restore default tools versions stored in configuration by the ones shipped with devcore
    #[command(visible_alias = "r")]
    RestoreDefaultToolsVersions,
}

#[derive(Subcommand, Debug)]
pub enum DockerComposeCommand {
    /// Manage docker compose context
    Context {
        #[command(subcommand)]
        command: ComposeContextCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum ComposeContextCommand {
    /// Creates a docker compose context in the CLI
    Create {
        /// The name of the context
        #[arg(short, long)]
        name: String,

        /// The docker compose file of the context
        #[arg(short, long)]
        file: PathBuf,

        /// The description of the context
        #[arg(short, long, default_value = "")]
        description: String,
    },

    /// Lists existing docker compose contexts
    #[command(visible_alias = "ls")]
    List {
        /// Display verbose contexts
        #[arg(short, long)]
        verbose: bool,
    },

    /// Delete a docker compose context from devcore without deleting the actual files
    Delete { name: Option<String> },

    /// Set the current docker compose context
    SetCurrent { name: String },

    /// Starts a docker compose context
    Start { name: Option<String> },

    /// Stops a docker compose context
    Stop { name: Option<String> },

    /// Open the file explorer at the docker compose context
    OpenFolder { name: Option<String> },
}

#[derive(Subcommand, Debug)]
pub enum JenkinsCommand {
    /// Relates to Jenkins CLI
    Cli {
        /// URL of the Jenkins instance
        #[arg(short, long, global = true, default_value = "http://127.0.0.1:8080")]
        url: String,

        #[command(subcommand)]
        command: JenkinsCliCommand,
    },

    /// Relates to Jenkins context
    #[command(visible_alias = "ctx")]
    Context {
        #[command(subcommand)]
        command: JenkinsContextCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum JenkinsCliCommand {
    /// Download the Jenkins CLI into the current directory
    Get,

    /// Execute Jenkins CLI commands, adding the connection information to the call
    Exec {
        /// Credentials used to connect to Jenkins
        #[arg(short, long)]
        auth: Option<String>,

        /// Interact with Jenkins using websockets
        #[arg(short, long)]
        websockets: bool,

        /// Arguments passed to jenkins-cli.jar
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum JenkinsContextCommand {
    /// Creates a Jenkins context in the CLI
    Create(JenkinsContextArgs),

    /// Lists existing Jenkins contexts
    #[command(visible_alias = "ls")]
    List {
        /// Display verbose contexts
        #[arg(short, long)]
        verbose: bool,
    },

    /// Delete Jenkins contexts from devcore without deleting the actual files
    Delete {
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Set the current Jenkins context
    SetCurrent { name: String },

    /// Starts a Jenkins context in the foreground
    Start {
        name: Option<String>,

        /// Extra JVM option for this start. Repeat for many options
        #[arg(long = "jvm-option", value_name = "OPTION", allow_hyphen_values = true)]
        jvm_options: Vec<String>,
    },

    /// Gets the initial admin password of Jenkins
    AdminPassword { name: Option<String> },
}

#[derive(Args, Debug)]
pub struct JenkinsContextArgs {
    /// The name of the Jenkins context
    #[arg(short, long)]
    pub name: String,

    /// The Jenkins war to use
    #[arg(short, long)]
    pub war: PathBuf,

    /// Description of this context
    #[arg(short, long, default_value = "")]
    pub description: String,

    /// The folder to use as Jenkins home
    #[arg(long)]
    pub jenkins_home: Option<PathBuf>,

    /// The Java home to use with this context, the system one when unset
    #[arg(long)]
    pub java_home: Option<PathBuf>,

    /// Option passed to Jenkins at startup. Repeat for many options
    #[arg(long = "option", value_name = "OPTION", allow_hyphen_values = true)]
    pub options: Vec<String>,

    /// JVM option passed at startup. Repeat for many options
    #[arg(long = "jvm-option", value_name = "OPTION", allow_hyphen_values = true)]
    pub jvm_options: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum ProjectCommand {
    /// Check if a project exist locally
    Exist { name: String },

    /// Clone a project from GitHub (`owner/repository`)
    Clone { name: String },

    /// Update a git project and its git sub-projects
    Update {
        name: String,

        /// Keep updating sub-projects when an update fails
        #[arg(short, long)]
        force: bool,

        /// Verbose output of update
        #[arg(short, long)]
        verbose: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum HelmCommand {
    /// Install a Helm chart
    Install {
        release: String,
        chart: String,

        /// Namespace to create and install into
        #[arg(short, long)]
        namespace: Option<String>,
    },

    /// Uninstall a Helm release
    Uninstall {
        release: String,

        #[arg(short, long)]
        namespace: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum KindCommand {
    /// Cluster operations
    Cluster {
        #[command(subcommand)]
        command: ClusterCommand,
    },

    /// Get an authentication token to be used in the K8s dashboard
    Token,
}

#[derive(Subcommand, Debug)]
pub enum ClusterCommand {
    /// Create a kind cluster with the Kubernetes dashboard
    Create {
        /// The name of cluster
        #[arg(short, long)]
        name: String,

        /// The version of the Kubernetes dashboard to install
        #[arg(short = 'v', long, default_value = "v2.3.1")]
        dashboard_version: String,
    },

    /// Delete a kind cluster
    Delete {
        #[arg(short, long)]
        name: String,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resource {
    Projects,
    ProjectsDir,
    Servers,
    ServersDir,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_tree_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn install_takes_a_short_version_flag() {
        let cli = Cli::try_parse_from(["devcore", "tools", "install", "helm", "-v", "3.9.0"]).unwrap();
        match cli.command {
            Command::Tools {
                command: ToolsCommand::Install(args),
            } => {
                assert_eq!(args.name, "helm");
                assert_eq!(args.version.as_deref(), Some("3.9.0"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn aliases_resolve() {
        let cli = Cli::try_parse_from(["devcore", "dc", "context", "ls", "-v"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::DockerCompose {
                command: DockerComposeCommand::Context {
                    command: ComposeContextCommand::List { verbose: true }
                }
            }
        ));
    }

    #[test]
    fn jenkins_exec_forwards_hyphenated_arguments() {
        let cli = Cli::try_parse_from([
            "devcore", "jenkins", "cli", "exec", "-w", "build", "job", "-s", "-v",
        ])
        .unwrap();
        match cli.command {
            Command::Jenkins {
                command:
                    JenkinsCommand::Cli {
                        url,
                        command: JenkinsCliCommand::Exec { websockets, args, auth },
                    },
            } => {
                assert_eq!(url, "http://127.0.0.1:8080");
                assert!(websockets);
                assert_eq!(auth, None);
                assert_eq!(args, ["build", "job", "-s", "-v"]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn global_flags_work_after_subcommands() {
        let cli = Cli::try_parse_from([
            "devcore", "version", "--bin-dir", "/tmp/bin", "--debug", "--config", "/tmp/c.json",
        ])
        .unwrap();
        assert_eq!(cli.bin_dir, PathBuf::from("/tmp/bin"));
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.json")));
        assert!(cli.debug);
    }

    #[test]
    fn open_accepts_known_resources_only() {
        let cli = Cli::try_parse_from(["devcore", "open", "projects-dir"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Open {
                resource: Resource::ProjectsDir
            }
        ));
        assert!(Cli::try_parse_from(["devcore", "open", "downloads"]).is_err());
    }

    #[test]
    fn jenkins_delete_needs_a_name() {
        assert!(Cli::try_parse_from(["devcore", "jenkins", "ctx", "delete"]).is_err());
    }
}
