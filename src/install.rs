//! Installs registry descriptors onto the local machine.
//!
//! Every download lands in a private staging directory under
//! [`Layout::temp_dir`], removed when the install returns, successful or not.

use anyhow::{Context, Result, bail};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

use crate::archive;
use crate::config::Config;
use crate::io::Download;
use crate::registry::{Descriptor, Payload, PostExtract, Root};

/// Where installed artifacts go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    /// Executables and links to them
    pub bin_dir: PathBuf,
    /// Parent of versioned tool trees (`maven/<version>`)
    pub opt_dir: PathBuf,
    /// Parent of versioned server trees (`tomcat/<version>`)
    pub servers_dir: PathBuf,
    /// Parent of the staging directories
    pub temp_dir: PathBuf,
}

impl Layout {
    pub fn new(bin_dir: PathBuf, config: &Config) -> Self {
        Self {
            bin_dir,
            opt_dir: default_opt_dir(),
            servers_dir: config.servers_dir.clone(),
            temp_dir: std::env::temp_dir(),
        }
    }

    fn root(&self, root: Root) -> &Path {
        match root {
            Root::Opt => &self.opt_dir,
            Root::Servers => &self.servers_dir,
        }
    }
}

fn default_opt_dir() -> PathBuf {
    match std::env::consts::OS {
        "macos" => PathBuf::from("/Library"),
        "windows" => PathBuf::from("C:\\"),
        _ => PathBuf::from("/usr/local"),
    }
}

pub struct Installer<D: Download> {
    downloader: D,
    layout: Layout,
}

impl<D: Download> Installer<D> {
    pub fn new(downloader: D, layout: Layout) -> Self {
        Self { downloader, layout }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Install `version` of `descriptor` and return the installed path: the
    /// executable, or the versioned directory for unlinked trees.
    pub async fn install(&self, descriptor: &Descriptor, version: &str) -> Result<PathBuf> {
        let url = descriptor.download_url(version);
        info!(name = descriptor.name, version, "installing");

        fs::create_dir_all(&self.layout.temp_dir)
            .await
            .with_context(|| format!("cannot create {}", self.layout.temp_dir.display()))?;
        let staging = tempfile::Builder::new()
            .prefix(&format!("devcore-{}-", descriptor.name))
            .tempdir_in(&self.layout.temp_dir)
            .context("cannot create staging directory")?;
        debug!(staging = %staging.path().display(), "staging directory created");

        let installed = match descriptor.payload {
            Payload::Binary => {
                let download = staging.path().join(descriptor.command);
                self.downloader.download(&url, &download).await?;
                self.install_binary(&download, descriptor.command).await?
            }
            Payload::Archive { format, action } => {
                let download = staging
                    .path()
                    .join(format!("{}{}", descriptor.name, format.extension()));
                self.downloader.download(&url, &download).await?;
                self.unpack(descriptor, version, &download, staging.path(), action)
                    .await?
            }
        };

        staging
            .close()
            .context("cannot remove staging directory")?;
        info!(name = descriptor.name, version, path = %installed.display(), "installed");
        Ok(installed)
    }

    async fn unpack(
        &self,
        descriptor: &Descriptor,
        version: &str,
        archive: &Path,
        staging: &Path,
        action: PostExtract,
    ) -> Result<PathBuf> {
        match action {
            PostExtract::MoveBinary { path } => {
                let content = staging.join("content");
                extract(archive, &content).await?;
                let binary = content.join(descriptor.render(path, version));
                if !fs::try_exists(&binary).await? {
                    bail!(
                        "{} not found in the {} archive",
                        descriptor.render(path, version),
                        descriptor.name
                    );
                }
                self.install_binary(&binary, descriptor.command).await
            }
            PostExtract::ExtractIntoBin => {
                fs::create_dir_all(&self.layout.bin_dir).await?;
                extract(archive, &self.layout.bin_dir).await?;
                let target = self.layout.bin_dir.join(descriptor.command);
                set_executable(&target).await?;
                Ok(target)
            }
            PostExtract::Versioned {
                root,
                parent,
                dir,
                link,
            } => {
                let parent_dir = self.layout.root(root).join(parent);
                let version_dir = parent_dir.join(version);
                if fs::try_exists(&version_dir).await? {
                    bail!(
                        "{} {} already present at {}",
                        descriptor.name,
                        version,
                        version_dir.display()
                    );
                }

                fs::create_dir_all(&parent_dir)
                    .await
                    .with_context(|| format!("cannot create {}", parent_dir.display()))?;
                extract(archive, &parent_dir).await?;

                let unpacked = parent_dir.join(descriptor.render(dir, version));
                fs::rename(&unpacked, &version_dir).await.with_context(|| {
                    format!(
                        "cannot rename {} to {}",
                        unpacked.display(),
                        version_dir.display()
                    )
                })?;

                match link {
                    Some(link) => {
                        fs::create_dir_all(&self.layout.bin_dir).await?;
                        let target = self.layout.bin_dir.join(descriptor.command);
                        replace_symlink(&version_dir.join(link), &target).await?;
                        Ok(target)
                    }
                    None => Ok(version_dir),
                }
            }
        }
    }

    async fn install_binary(&self, source: &Path, command: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.layout.bin_dir)
            .await
            .with_context(|| format!("cannot create {}", self.layout.bin_dir.display()))?;
        let target = self.layout.bin_dir.join(command);
        move_file(source, &target).await?;
        set_executable(&target).await?;
        Ok(target)
    }
}

async fn extract(source: &Path, destination: &Path) -> Result<()> {
    let (source, destination) = (source.to_path_buf(), destination.to_path_buf());
    debug!(archive = %source.display(), destination = %destination.display(), "extracting");
    tokio::task::spawn_blocking(move || archive::extract(&source, &destination)).await??;
    Ok(())
}

/// Rename, or copy and delete when the rename would cross filesystems.
async fn move_file(source: &Path, target: &Path) -> Result<()> {
    match fs::rename(source, target).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::CrossesDevices => {
            debug!(source = %source.display(), target = %target.display(), "copying across filesystems");
            fs::copy(source, target)
                .await
                .with_context(|| format!("cannot copy to {}", target.display()))?;
            fs::remove_file(source).await?;
            Ok(())
        }
        Err(e) => Err(e).with_context(|| {
            format!("cannot move {} to {}", source.display(), target.display())
        }),
    }
}

async fn set_executable(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
            .await
            .with_context(|| format!("cannot make {} executable", path.display()))?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}

#[cfg(unix)]
async fn replace_symlink(source: &Path, link: &Path) -> Result<()> {
    if fs::symlink_metadata(link).await.is_ok() {
        fs::remove_file(link)
            .await
            .with_context(|| format!("cannot replace {}", link.display()))?;
    }
    fs::symlink(source, link)
        .await
        .with_context(|| format!("cannot link {} to {}", link.display(), source.display()))
}

#[cfg(not(unix))]
async fn replace_symlink(source: &Path, link: &Path) -> Result<()> {
    bail!(
        "cannot link {} to {}: symbolic links need a unix system",
        link.display(),
        source.display()
    )
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;
    use std::sync::Mutex;

    use crate::archive::ArchiveFormat;
    use crate::registry::OsNames;

    /// Serves one local file for every URL and remembers what was asked.
    struct FixtureDownloader {
        fixture: Option<PathBuf>,
        urls: Mutex<Vec<String>>,
    }

    impl FixtureDownloader {
        fn serving(fixture: &Path) -> Self {
            Self {
                fixture: Some(fixture.to_path_buf()),
                urls: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                fixture: None,
                urls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Download for FixtureDownloader {
        async fn download(&self, url: &str, destination: &Path) -> Result<()> {
            self.urls.lock().unwrap().push(url.to_string());
            match &self.fixture {
                Some(fixture) => {
                    fs::copy(fixture, destination).await?;
                    Ok(())
                }
                None => bail!("GET {} failed with status: 404 Not Found", url),
            }
        }
    }

    struct Sandbox {
        _dir: tempfile::TempDir,
        root: PathBuf,
    }

    impl Sandbox {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let root = dir.path().to_path_buf();
            Self { _dir: dir, root }
        }

        fn layout(&self) -> Layout {
            Layout {
                bin_dir: self.root.join("bin"),
                opt_dir: self.root.join("opt"),
                servers_dir: self.root.join("servers"),
                temp_dir: self.root.join("tmp"),
            }
        }

        fn tar_gz(&self, name: &str, files: &[(&str, &str)]) -> PathBuf {
            let path = self.root.join(name);
            let file = std::fs::File::create(&path).unwrap();
            let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
            for (name, data) in files {
                let mut header = tar::Header::new_gnu();
                header.set_size(data.len() as u64);
                header.set_mode(0o644);
                builder.append_data(&mut header, name, data.as_bytes()).unwrap();
            }
            builder.into_inner().unwrap().finish().unwrap();
            path
        }

        fn zip(&self, name: &str, files: &[(&str, &str)]) -> PathBuf {
            let path = self.root.join(name);
            let mut writer = zip::ZipWriter::new(std::fs::File::create(&path).unwrap());
            for (name, data) in files {
                writer
                    .start_file(*name, zip::write::SimpleFileOptions::default())
                    .unwrap();
                writer.write_all(data.as_bytes()).unwrap();
            }
            writer.finish().unwrap();
            path
        }

        fn staging_is_empty(&self) -> bool {
            std::fs::read_dir(self.root.join("tmp")).unwrap().next().is_none()
        }
    }

    fn descriptor(url: &'static str, payload: Payload) -> Descriptor {
        Descriptor {
            name: "tool",
            description: "test tool",
            command: "tool",
            default_version: "1.0.0",
            url,
            os: OsNames::DEFAULT,
            payload,
        }
    }

    fn mode(path: &Path) -> u32 {
        use std::os::unix::fs::PermissionsExt;
        std::fs::metadata(path).unwrap().permissions().mode() & 0o777
    }

    #[tokio::test]
    async fn binary_download_is_moved_into_bin() {
        let sandbox = Sandbox::new();
        let fixture = sandbox.root.join("fixture");
        std::fs::write(&fixture, b"#!/bin/sh\necho tool\n").unwrap();

        let installer = Installer::new(FixtureDownloader::serving(&fixture), sandbox.layout());
        let tool = descriptor("https://example.test/v{version}/tool-{os}", Payload::Binary);
        let installed = installer.install(&tool, "2.1.0").await.unwrap();

        assert_eq!(installed, sandbox.root.join("bin/tool"));
        assert_eq!(std::fs::read(&installed).unwrap(), b"#!/bin/sh\necho tool\n");
        assert_eq!(mode(&installed), 0o755);
        assert_eq!(
            installer.downloader.urls.lock().unwrap().as_slice(),
            [format!("https://example.test/v2.1.0/tool-{}", OsNames::DEFAULT.current())]
        );
        assert!(sandbox.staging_is_empty());
    }

    #[tokio::test]
    async fn move_binary_picks_the_rendered_path() {
        let sandbox = Sandbox::new();
        let fixture = sandbox.tar_gz(
            "tool.tar.gz",
            &[
                ("tool-3.0.0/bin/tool", "binary"),
                ("tool-3.0.0/README.md", "docs"),
            ],
        );

        let installer = Installer::new(FixtureDownloader::serving(&fixture), sandbox.layout());
        let tool = descriptor(
            "https://example.test/tool-{version}.tar.gz",
            Payload::Archive {
                format: ArchiveFormat::TarGz,
                action: PostExtract::MoveBinary {
                    path: "tool-{version}/bin/tool",
                },
            },
        );
        let installed = installer.install(&tool, "3.0.0").await.unwrap();

        assert_eq!(std::fs::read(&installed).unwrap(), b"binary");
        assert_eq!(mode(&installed), 0o755);
        assert!(!sandbox.root.join("bin/README.md").exists());
        assert!(sandbox.staging_is_empty());
    }

    #[tokio::test]
    async fn missing_binary_in_archive_fails_cleanly() {
        let sandbox = Sandbox::new();
        let fixture = sandbox.tar_gz("tool.tar.gz", &[("other/tool", "binary")]);

        let installer = Installer::new(FixtureDownloader::serving(&fixture), sandbox.layout());
        let tool = descriptor(
            "https://example.test/tool.tar.gz",
            Payload::Archive {
                format: ArchiveFormat::TarGz,
                action: PostExtract::MoveBinary { path: "tool" },
            },
        );
        let err = installer.install(&tool, "1.0.0").await.unwrap_err();

        assert!(err.to_string().contains("not found"), "{err}");
        assert!(!sandbox.root.join("bin/tool").exists());
        assert!(sandbox.staging_is_empty());
    }

    #[tokio::test]
    async fn extract_into_bin_marks_the_command_executable() {
        let sandbox = Sandbox::new();
        let fixture = sandbox.tar_gz("tool.tar.gz", &[("tool", "binary")]);

        let installer = Installer::new(FixtureDownloader::serving(&fixture), sandbox.layout());
        let tool = descriptor(
            "https://example.test/tool.tar.gz",
            Payload::Archive {
                format: ArchiveFormat::TarGz,
                action: PostExtract::ExtractIntoBin,
            },
        );
        let installed = installer.install(&tool, "1.0.0").await.unwrap();

        assert_eq!(installed, sandbox.root.join("bin/tool"));
        assert_eq!(mode(&installed), 0o755);
    }

    fn versioned(link: Option<&'static str>) -> Descriptor {
        descriptor(
            "https://example.test/tool-{major}/tool-{version}.zip",
            Payload::Archive {
                format: ArchiveFormat::Zip,
                action: PostExtract::Versioned {
                    root: Root::Opt,
                    parent: "tool",
                    dir: "tool-{version}",
                    link,
                },
            },
        )
    }

    #[tokio::test]
    async fn versioned_tree_is_renamed_and_linked() {
        let sandbox = Sandbox::new();
        let fixture = sandbox.zip(
            "tool.zip",
            &[("tool-3.8.5/bin/tool", "v3"), ("tool-3.8.5/lib/core.jar", "jar")],
        );

        let installer = Installer::new(FixtureDownloader::serving(&fixture), sandbox.layout());
        let installed = installer
            .install(&versioned(Some("bin/tool")), "3.8.5")
            .await
            .unwrap();

        let version_dir = sandbox.root.join("opt/tool/3.8.5");
        assert_eq!(installed, sandbox.root.join("bin/tool"));
        assert_eq!(
            std::fs::read_link(&installed).unwrap(),
            version_dir.join("bin/tool")
        );
        assert_eq!(std::fs::read(&installed).unwrap(), b"v3");
        assert!(version_dir.join("lib/core.jar").is_file());
        assert!(!sandbox.root.join("opt/tool/tool-3.8.5").exists());
        assert_eq!(
            installer.downloader.urls.lock().unwrap().as_slice(),
            ["https://example.test/tool-3/tool-3.8.5.zip"]
        );
    }

    #[tokio::test]
    async fn versioned_install_refuses_an_existing_version() {
        let sandbox = Sandbox::new();
        let fixture = sandbox.zip("tool.zip", &[("tool-1.0.0/bin/tool", "v1")]);
        std::fs::create_dir_all(sandbox.root.join("opt/tool/1.0.0")).unwrap();

        let installer = Installer::new(FixtureDownloader::serving(&fixture), sandbox.layout());
        let err = installer
            .install(&versioned(None), "1.0.0")
            .await
            .unwrap_err();

        assert!(err.to_string().contains("already present"), "{err}");
        assert!(sandbox.staging_is_empty());
    }

    #[tokio::test]
    async fn existing_link_is_replaced() {
        let sandbox = Sandbox::new();
        let layout = sandbox.layout();

        let first = sandbox.zip("first.zip", &[("tool-1.0.0/bin/tool", "v1")]);
        Installer::new(FixtureDownloader::serving(&first), layout.clone())
            .install(&versioned(Some("bin/tool")), "1.0.0")
            .await
            .unwrap();

        let second = sandbox.zip("second.zip", &[("tool-2.0.0/bin/tool", "v2")]);
        let link = Installer::new(FixtureDownloader::serving(&second), layout)
            .install(&versioned(Some("bin/tool")), "2.0.0")
            .await
            .unwrap();

        assert_eq!(std::fs::read(&link).unwrap(), b"v2");
        assert!(sandbox.root.join("opt/tool/1.0.0/bin/tool").exists());
    }

    #[tokio::test]
    async fn servers_go_under_the_servers_dir() {
        let sandbox = Sandbox::new();
        let fixture = sandbox.zip("server.zip", &[("srv-9.0.1/bin/startup.sh", "start")]);
        let server = descriptor(
            "https://example.test/srv-{version}.zip",
            Payload::Archive {
                format: ArchiveFormat::Zip,
                action: PostExtract::Versioned {
                    root: Root::Servers,
                    parent: "srv",
                    dir: "srv-{version}",
                    link: None,
                },
            },
        );

        let installer = Installer::new(FixtureDownloader::serving(&fixture), sandbox.layout());
        let installed = installer.install(&server, "9.0.1").await.unwrap();

        assert_eq!(installed, sandbox.root.join("servers/srv/9.0.1"));
        assert!(installed.join("bin/startup.sh").is_file());
    }

    #[tokio::test]
    async fn failed_download_leaves_nothing_behind() {
        let sandbox = Sandbox::new();
        let installer = Installer::new(FixtureDownloader::failing(), sandbox.layout());

        let err = installer
            .install(&descriptor("https://example.test/tool", Payload::Binary), "1.0.0")
            .await
            .unwrap_err();

        assert!(err.to_string().contains("404"), "{err}");
        assert!(!sandbox.root.join("bin/tool").exists());
        assert!(sandbox.staging_is_empty());
    }

    #[test]
    fn layout_takes_servers_from_the_config() {
        let config = Config {
            servers_dir: PathBuf::from("/srv/servers"),
            ..Config::default()
        };
        let layout = Layout::new(PathBuf::from("/opt/bin"), &config);
        assert_eq!(layout.bin_dir, PathBuf::from("/opt/bin"));
        assert_eq!(layout.servers_dir, PathBuf::from("/srv/servers"));
        assert_eq!(layout.root(Root::Servers), Path::new("/srv/servers"));
    }
}
