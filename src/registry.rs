//! Installable tools and servers.
//!
//! Every entry is a plain [`Descriptor`]: where to download a given version
//! and what to do with the download. The installer interprets the
//! [`Payload`]; nothing in this table executes on its own.

use crate::archive::ArchiveFormat;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Tool not found: '{0}'")]
    ToolNotFound(String),
    #[error("Server not found: '{0}'")]
    ServerNotFound(String),
}

/// Per-platform token substituted for `{os}` in templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OsNames {
    pub macos: &'static str,
    pub linux: &'static str,
    pub windows: &'static str,
}

impl OsNames {
    /// The names most vendors use in release file names.
    pub const DEFAULT: OsNames = OsNames {
        macos: "darwin",
        linux: "linux",
        windows: "windows",
    };

    /// Token for an OS as named by [`std::env::consts::OS`].
    pub fn for_os(&self, os: &str) -> &'static str {
        match os {
            "macos" => self.macos,
            "windows" => self.windows,
            _ => self.linux,
        }
    }

    pub fn current(&self) -> &'static str {
        self.for_os(std::env::consts::OS)
    }
}

/// Base directory a versioned payload is unpacked under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Root {
    /// Shared tool installs, `/usr/local` by default
    Opt,
    /// The configured servers directory
    Servers,
}

/// What to do once an archive has been extracted.
///
/// Paths are templates, rendered with the same values as the URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostExtract {
    /// Extract into a staging directory and move `path` to the binary location.
    MoveBinary { path: &'static str },
    /// Extract straight into the binary directory.
    ExtractIntoBin,
    /// Extract under `<root>/<parent>`, rename `dir` to the version and
    /// optionally link `<version>/<link>` into the binary directory.
    Versioned {
        root: Root,
        parent: &'static str,
        dir: &'static str,
        link: Option<&'static str>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Payload {
    /// The download is the executable itself.
    Binary,
    Archive {
        format: ArchiveFormat,
        action: PostExtract,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Descriptor {
    pub name: &'static str,
    pub description: &'static str,
    /// File name of the installed executable
    pub command: &'static str,
    pub default_version: &'static str,
    /// Download URL template
    pub url: &'static str,
    pub os: OsNames,
    pub payload: Payload,
}

impl Descriptor {
    /// Render one of this descriptor's templates for `version` on the running platform.
    pub fn render(&self, template: &str, version: &str) -> String {
        render(template, version, self.os.current())
    }

    pub fn download_url(&self, version: &str) -> String {
        self.render(self.url, version)
    }
}

/// Substitute `{version}`, `{major}` and `{os}` in `template`.
///
/// `{major}` is the version up to its first dot.
pub fn render(template: &str, version: &str, os: &str) -> String {
    let major = version.split('.').next().unwrap_or(version);
    template
        .replace("{version}", version)
        .replace("{major}", major)
        .replace("{os}", os)
}

const fn tool(
    name: &'static str,
    description: &'static str,
    command: &'static str,
    default_version: &'static str,
    url: &'static str,
    payload: Payload,
) -> Descriptor {
    Descriptor {
        name,
        description,
        command,
        default_version,
        url,
        os: OsNames::DEFAULT,
        payload,
    }
}

const fn tar_gz(action: PostExtract) -> Payload {
    Payload::Archive {
        format: ArchiveFormat::TarGz,
        action,
    }
}

const fn zip(action: PostExtract) -> Payload {
    Payload::Archive {
        format: ArchiveFormat::Zip,
        action,
    }
}

const fn move_binary(path: &'static str) -> PostExtract {
    PostExtract::MoveBinary { path }
}

/// Tools installed by `tools install`, sorted by name.
pub static TOOLS: &[Descriptor] = &[
    Descriptor {
        os: OsNames {
            macos: "apple-darwin",
            linux: "unknown-linux-gnu",
            windows: "pc-windows-gnu",
        },
        ..tool(
            "bat",
            "A cat like tool, but more powerful",
            "bat",
            "0.20.0",
            "https://github.com/sharkdp/bat/releases/download/v{version}/bat-v{version}-x86_64-{os}.tar.gz",
            tar_gz(move_binary("bat-v{version}-x86_64-{os}/bat")),
        )
    },
    tool(
        "dive",
        "A tool for exploring container in depth",
        "dive",
        "0.10.0",
        "https://github.com/wagoodman/dive/releases/download/v{version}/dive_{version}_{os}_amd64.tar.gz",
        tar_gz(move_binary("dive")),
    ),
    Descriptor {
        os: OsNames {
            macos: "macos",
            linux: "linux64",
            windows: "win64",
        },
        ..tool(
            "geckodriver",
            "A driver to be used by Selenium",
            "geckodriver",
            "0.31.0",
            "https://github.com/mozilla/geckodriver/releases/download/v{version}/geckodriver-v{version}-{os}.tar.gz",
            tar_gz(move_binary("geckodriver")),
        )
    },
    Descriptor {
        os: OsNames {
            macos: "macOS",
            ..OsNames::DEFAULT
        },
        ..tool(
            "gh",
            "GitHub CLI tool for interacting with GitHub",
            "gh",
            "2.9.0",
            "https://github.com/cli/cli/releases/download/v{version}/gh_{version}_{os}_amd64.tar.gz",
            tar_gz(move_binary("gh_{version}_{os}_amd64/bin/gh")),
        )
    },
    tool(
        "helm",
        "The package manager for Kubernetes",
        "helm",
        "3.8.2",
        "https://get.helm.sh/helm-v{version}-{os}-amd64.tar.gz",
        tar_gz(move_binary("{os}-amd64/helm")),
    ),
    Descriptor {
        os: OsNames {
            macos: "osx-amd64",
            linux: "linux64",
            windows: "win64.exe",
        },
        ..tool(
            "jq",
            "jq is a lightweight and flexible command-line JSON processor",
            "jq",
            "1.6",
            "https://github.com/stedolan/jq/releases/download/jq-{version}/jq-{os}",
            Payload::Binary,
        )
    },
    tool(
        "kind",
        "kind is a tool for running local Kubernetes clusters using Docker container \"nodes\"",
        "kind",
        "0.12.0",
        "https://github.com/kubernetes-sigs/kind/releases/download/v{version}/kind-{os}-amd64",
        Payload::Binary,
    ),
    tool(
        "kubectl",
        "The Kubernetes command-line tool",
        "kubectl",
        "1.23.6",
        "https://dl.k8s.io/release/v{version}/bin/{os}/amd64/kubectl",
        Payload::Binary,
    ),
    tool(
        "kustomize",
        "Kubernetes native configuration management",
        "kustomize",
        "4.5.4",
        "https://github.com/kubernetes-sigs/kustomize/releases/download/kustomize/v{version}/kustomize_v{version}_{os}_amd64.tar.gz",
        tar_gz(PostExtract::ExtractIntoBin),
    ),
    tool(
        "maven",
        "Apache Maven is a software project management and comprehension tool",
        "mvn",
        "3.8.5",
        "https://dlcdn.apache.org/maven/maven-3/{version}/binaries/apache-maven-{version}-bin.zip",
        zip(PostExtract::Versioned {
            root: Root::Opt,
            parent: "maven",
            dir: "apache-maven-{version}",
            link: Some("bin/mvn"),
        }),
    ),
    tool(
        "minishift",
        "Minishift is a tool that helps you run OpenShift locally by running a single-node OpenShift cluster inside a VM",
        "minishift",
        "1.34.3",
        // Served as .tgz, which is a gzip-compressed tarball all the same.
        "https://github.com/minishift/minishift/releases/download/v{version}/minishift-{version}-{os}-amd64.tgz",
        tar_gz(move_binary("minishift-{version}-{os}-amd64/minishift")),
    ),
    Descriptor {
        os: OsNames {
            macos: "mac",
            ..OsNames::DEFAULT
        },
        ..tool(
            "openshift-client",
            "Interact with Openshift in the CLI",
            "oc",
            "4.10.10",
            "https://mirror.openshift.com/pub/openshift-v4/x86_64/clients/ocp/{version}/openshift-client-{os}-{version}.tar.gz",
            tar_gz(move_binary("oc")),
        )
    },
    Descriptor {
        os: OsNames {
            macos: "mac",
            ..OsNames::DEFAULT
        },
        ..tool(
            "openshift-install",
            "Openshift installer",
            "openshift-install",
            "4.9.12",
            "https://mirror.openshift.com/pub/openshift-v4/x86_64/clients/ocp/{version}/openshift-install-{os}-{version}.tar.gz",
            tar_gz(move_binary("openshift-install")),
        )
    },
    tool(
        "operator-sdk",
        "The Operator SDK provides the tools to build, test, and package Operators",
        "operator-sdk",
        "1.9.0",
        "https://github.com/operator-framework/operator-sdk/releases/download/v{version}/operator-sdk_{os}_amd64",
        Payload::Binary,
    ),
    tool(
        "terraform",
        "Terraform is an open-source infrastructure as code software tool that enables you to safely and predictably create, change, and improve infrastructure",
        "terraform",
        "1.1.9",
        "https://releases.hashicorp.com/terraform/{version}/terraform_{version}_{os}_amd64.zip",
        zip(move_binary("terraform")),
    ),
    tool(
        "yq",
        "yq is a lightweight and portable command-line YAML, JSON and XML processor",
        "yq",
        "4.24.5",
        "https://github.com/mikefarah/yq/releases/download/v{version}/yq_{os}_amd64",
        Payload::Binary,
    ),
];

/// Application servers installed by `servers install`.
pub static SERVERS: &[Descriptor] = &[tool(
    "tomcat",
    "Apache Tomcat servlet container",
    "tomcat",
    "10.0.10",
    "https://archive.apache.org/dist/tomcat/tomcat-{major}/v{version}/bin/apache-tomcat-{version}.zip",
    zip(PostExtract::Versioned {
        root: Root::Servers,
        parent: "tomcat",
        dir: "apache-tomcat-{version}",
        link: None,
    }),
)];

pub fn find_tool(name: &str) -> Result<&'static Descriptor, RegistryError> {
    TOOLS
        .iter()
        .find(|t| t.name == name)
        .ok_or_else(|| RegistryError::ToolNotFound(name.to_string()))
}

pub fn find_server(name: &str) -> Result<&'static Descriptor, RegistryError> {
    SERVERS
        .iter()
        .find(|s| s.name == name)
        .ok_or_else(|| RegistryError::ServerNotFound(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn render_substitutes_every_placeholder() {
        assert_eq!(
            render("tomcat-{major}/v{version}/{os}", "10.0.10", "linux"),
            "tomcat-10/v10.0.10/linux"
        );
        assert_eq!(render("{major}", "7", "linux"), "7");
        assert_eq!(render("no placeholders", "1.0", "linux"), "no placeholders");
    }

    #[test]
    fn os_names_follow_the_platform() {
        let bat = find_tool("bat").unwrap();
        assert_eq!(bat.os.for_os("macos"), "apple-darwin");
        assert_eq!(bat.os.for_os("linux"), "unknown-linux-gnu");
        assert_eq!(bat.os.for_os("windows"), "pc-windows-gnu");

        let gh = find_tool("gh").unwrap();
        assert_eq!(gh.os.for_os("macos"), "macOS");
        assert_eq!(gh.os.for_os("linux"), "linux");
    }

    #[test]
    fn tool_urls_render_like_the_vendors_publish_them() {
        let bat = find_tool("bat").unwrap();
        assert_eq!(
            render(bat.url, "0.20.0", bat.os.for_os("linux")),
            "https://github.com/sharkdp/bat/releases/download/v0.20.0/bat-v0.20.0-x86_64-unknown-linux-gnu.tar.gz"
        );

        let kubectl = find_tool("kubectl").unwrap();
        assert_eq!(
            render(kubectl.url, "1.23.6", kubectl.os.for_os("linux")),
            "https://dl.k8s.io/release/v1.23.6/bin/linux/amd64/kubectl"
        );

        let tomcat = find_server("tomcat").unwrap();
        assert_eq!(
            render(tomcat.url, "9.0.65", "linux"),
            "https://archive.apache.org/dist/tomcat/tomcat-9/v9.0.65/bin/apache-tomcat-9.0.65.zip"
        );
    }

    #[test]
    fn names_are_unique_and_sorted() {
        let names: Vec<_> = TOOLS.iter().map(|t| t.name).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
        assert_eq!(names.iter().collect::<HashSet<_>>().len(), names.len());
    }

    #[test]
    fn archive_payloads_match_their_url_suffix() {
        for descriptor in TOOLS.iter().chain(SERVERS) {
            if let Payload::Archive { format, .. } = descriptor.payload {
                let ok = descriptor.url.ends_with(format.extension())
                    || (format == ArchiveFormat::TarGz && descriptor.url.ends_with(".tgz"));
                assert!(ok, "{} downloads {}", descriptor.name, descriptor.url);
            }
        }
    }

    #[test]
    fn lookup_failures_name_the_missing_entry() {
        let err = find_tool("emacs").unwrap_err();
        assert_eq!(err.to_string(), "Tool not found: 'emacs'");
        assert!(matches!(
            find_server("jetty"),
            Err(RegistryError::ServerNotFound(name)) if name == "jetty"
        ));
    }

    #[test]
    fn maven_installs_a_versioned_tree() {
        let maven = find_tool("maven").unwrap();
        assert_eq!(maven.command, "mvn");
        assert!(matches!(
            maven.payload,
            Payload::Archive {
                format: ArchiveFormat::Zip,
                action: PostExtract::Versioned {
                    root: Root::Opt,
                    link: Some("bin/mvn"),
                    ..
                },
            }
        ));
    }
}
