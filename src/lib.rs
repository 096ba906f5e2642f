//! # devcore
//!
//! Developer workstation utilities: installs command line tools and
//! application servers from their vendors' release archives, and keeps
//! named docker compose and Jenkins contexts in a small JSON configuration.
//!
//! ## Features
//!
//! - Safe `.zip` / `.tar.gz` extraction with a path-traversal guard
//! - Support for ZIP64 archives and STORED/DEFLATE members
//! - A static registry of installable tools and servers
//! - Docker compose, Jenkins, git, Helm and kind helpers
//!
//! ## Example
//!
//! ```no_run
//! use devcore::archive;
//!
//! fn main() -> Result<(), archive::ExtractError> {
//!     archive::extract("/tmp/helm.tar.gz", "/tmp/helm")?;
//!     Ok(())
//! }
//! ```

pub mod archive;
pub mod cli;
pub mod commands;
pub mod config;
pub mod install;
pub mod io;
pub mod process;
pub mod registry;

pub use archive::{ExtractError, extract};
pub use cli::Cli;
pub use config::{Config, ConfigStore};
pub use install::{Installer, Layout};
pub use io::{Download, HttpDownloader, LocalFileReader, ReadAt};
