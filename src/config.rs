//! Persistent CLI configuration.
//!
//! The configuration is a plain [`Config`] value. [`ConfigStore`] knows where
//! it lives on disk; commands receive the loaded value by reference and the
//! binary writes it back once they are done.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::registry::{self, Descriptor};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{kind} context not found: '{name}'")]
    ContextNotFound { kind: &'static str, name: String },

    #[error("{kind} context already exists: '{name}'")]
    ContextExists { kind: &'static str, name: String },

    #[error("no {kind} context given and no current context set")]
    NoCurrentContext { kind: &'static str },

    #[error("cannot determine the user home directory")]
    NoHomeDir,

    #[error("cannot access configuration file '{}': {source}", path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("invalid configuration file '{}': {source}", path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// A named entry of a [`ContextSet`].
pub trait NamedContext {
    /// Human readable kind, used in error messages
    const KIND: &'static str;

    fn name(&self) -> &str;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct DockerComposeContext {
    pub name: String,
    pub description: String,
    /// Absolute path of the compose file
    pub file: PathBuf,
}

impl DockerComposeContext {
    /// Folder holding the compose file.
    pub fn dir(&self) -> &Path {
        self.file.parent().unwrap_or(Path::new("."))
    }
}

impl NamedContext for DockerComposeContext {
    const KIND: &'static str = "Docker compose";

    fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct JenkinsContext {
    pub name: String,
    pub description: String,
    pub war: PathBuf,
    pub jenkins_home: PathBuf,
    pub java_home: PathBuf,
    /// Arguments passed to Jenkins itself
    pub options: Vec<String>,
    /// Arguments passed to the JVM
    pub jvm_options: Vec<String>,
}

impl NamedContext for JenkinsContext {
    const KIND: &'static str = "Jenkins";

    fn name(&self) -> &str {
        &self.name
    }
}

/// A list of named contexts with an optional current one.
///
/// An empty `current-context` means none is selected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ContextSet<C> {
    #[serde(default)]
    pub current_context: String,
    #[serde(default)]
    pub contexts: Vec<C>,
}

impl<C> Default for ContextSet<C> {
    fn default() -> Self {
        Self {
            current_context: String::new(),
            contexts: Vec::new(),
        }
    }
}

impl<C: NamedContext> ContextSet<C> {
    fn not_found(name: &str) -> ConfigError {
        ConfigError::ContextNotFound {
            kind: C::KIND,
            name: name.to_string(),
        }
    }

    pub fn current(&self) -> Option<&str> {
        (!self.current_context.is_empty()).then_some(self.current_context.as_str())
    }

    pub fn is_current(&self, name: &str) -> bool {
        self.current() == Some(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &C> {
        self.contexts.iter()
    }

    pub fn find(&self, name: &str) -> Result<&C> {
        self.contexts
            .iter()
            .find(|c| c.name() == name)
            .ok_or_else(|| Self::not_found(name))
    }

    pub fn add(&mut self, context: C) -> Result<()> {
        if self.contexts.iter().any(|c| c.name() == context.name()) {
            return Err(ConfigError::ContextExists {
                kind: C::KIND,
                name: context.name().to_string(),
            });
        }
        self.contexts.push(context);
        Ok(())
    }

    /// Remove a context, clearing the current selection if it pointed at it.
    pub fn remove(&mut self, name: &str) -> Result<C> {
        let index = self
            .contexts
            .iter()
            .position(|c| c.name() == name)
            .ok_or_else(|| Self::not_found(name))?;

        if self.is_current(name) {
            self.current_context.clear();
        }
        Ok(self.contexts.remove(index))
    }

    /// Replace the context carrying the same name.
    pub fn update(&mut self, context: C) -> Result<()> {
        let slot = self
            .contexts
            .iter_mut()
            .find(|c| c.name() == context.name())
            .ok_or_else(|| Self::not_found(context.name()))?;
        *slot = context;
        Ok(())
    }

    pub fn set_current(&mut self, name: &str) -> Result<()> {
        self.find(name)?;
        self.current_context = name.to_string();
        Ok(())
    }

    /// The context named `name`, or the current one when no name is given.
    pub fn resolve(&self, name: Option<&str>) -> Result<&C> {
        match name.or(self.current()) {
            Some(name) => self.find(name),
            None => Err(ConfigError::NoCurrentContext { kind: C::KIND }),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Jenkins {
    /// Absolute path of the downloaded `jenkins-cli.jar`
    #[serde(default)]
    pub cli: String,
    #[serde(flatten)]
    pub contexts: ContextSet<JenkinsContext>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    pub docker_compose: ContextSet<DockerComposeContext>,
    pub jenkins: Jenkins,
    pub default_tools_version: BTreeMap<String, String>,
    pub projects_dir: PathBuf,
    pub servers_dir: PathBuf,
}

impl Config {
    /// Fill every unset value: tool versions from the registry, folders
    /// under `home`.
    pub fn fill_defaults(&mut self, home: &Path) {
        for tool in registry::TOOLS {
            self.default_tools_version
                .entry(tool.name.to_string())
                .or_insert_with(|| tool.default_version.to_string());
        }
        if self.projects_dir.as_os_str().is_empty() {
            self.projects_dir = home.join("Projects");
        }
        if self.servers_dir.as_os_str().is_empty() {
            self.servers_dir = home.join("Servers");
        }
    }

    /// Reset every tool version to the registry default.
    pub fn restore_default_tools_versions(&mut self) {
        for tool in registry::TOOLS {
            self.default_tools_version
                .insert(tool.name.to_string(), tool.default_version.to_string());
        }
    }

    /// Version to install when none is requested explicitly.
    pub fn tool_version<'a>(&'a self, tool: &'a Descriptor) -> &'a str {
        self.default_tools_version
            .get(tool.name)
            .map(String::as_str)
            .unwrap_or(tool.default_version)
    }
}

/// Location of the configuration file.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
    home: PathBuf,
}

impl ConfigStore {
    pub fn new(path: PathBuf, home: PathBuf) -> Self {
        Self { path, home }
    }

    /// Store at `path`, or at `~/.devcore/config.json` when none is given.
    pub fn locate(path: Option<PathBuf>) -> Result<Self> {
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
        let path = path.unwrap_or_else(|| home.join(".devcore").join("config.json"));
        Ok(Self::new(path, home))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    fn io_error(&self, source: io::Error) -> ConfigError {
        ConfigError::Io {
            path: self.path.clone(),
            source,
        }
    }

    /// Create the directory and an empty `{}` file when missing.
    fn ensure_exists(&self) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(|e| self.io_error(e))?;
        }
        if !self.path.exists() {
            debug!(path = %self.path.display(), "creating configuration file");
            fs::write(&self.path, "{}").map_err(|e| self.io_error(e))?;
        }
        Ok(())
    }

    pub fn load(&self) -> Result<Config> {
        self.ensure_exists()?;
        let text = fs::read_to_string(&self.path).map_err(|e| self.io_error(e))?;
        let mut config: Config =
            serde_json::from_str(&text).map_err(|source| ConfigError::Json {
                path: self.path.clone(),
                source,
            })?;
        config.fill_defaults(&self.home);
        debug!(path = %self.path.display(), "configuration loaded");
        Ok(config)
    }

    pub fn save(&self, config: &Config) -> Result<()> {
        self.ensure_exists()?;
        let text = serde_json::to_string_pretty(config).map_err(|source| ConfigError::Json {
            path: self.path.clone(),
            source,
        })?;
        fs::write(&self.path, text).map_err(|e| self.io_error(e))?;
        debug!(path = %self.path.display(), "configuration saved");
        Ok(())
    }
}
