// SPDX-License-Identifier: MIT

use core::fmt;
use std::fs;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use vfatfs::prelude::BuildOptions;

pub const DEFAULT_PORT: u16 = 12345;

#[derive(Debug)]
pub enum ConfigError {
    NoSource,
    MissingSource(PathBuf),
    NotADirectory(PathBuf),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NoSource => write!(f, "no source directory given (--source or `source =`)"),
            ConfigError::MissingSource(p) => write!(f, "source {} does not exist", p.display()),
            ConfigError::NotADirectory(p) => write!(f, "source {} is not a directory", p.display()),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Daemon settings, from `vfatd.toml` and/or the command line.
///
/// ```toml
/// source = "/srv/share"
/// bind = "127.0.0.1"
/// port = 12345
/// volume_label = "SHARE"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub source: Option<PathBuf>,
    pub bind: IpAddr,
    pub port: u16,
    pub volume_label: Option<String>,
    pub volume_id: Option<u32>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            source: None,
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            volume_label: None,
            volume_id: None,
        }
    }
}

/// Command-line values that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub source: Option<PathBuf>,
    pub bind: Option<IpAddr>,
    pub port: Option<u16>,
    pub volume_label: Option<String>,
}

impl ServerConfig {
    /// Loads a TOML file. A relative `source` is resolved against the
    /// file's directory.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let mut config: ServerConfig = toml::from_str(&content)?;
        if let Some(source) = config.source.take() {
            let base = path.parent().unwrap_or_else(|| Path::new("."));
            config.source = Some(base.join(source));
        }
        Ok(config)
    }

    /// File settings if a path is given, defaults otherwise; then `overrides`.
    pub fn load(path: Option<&Path>, overrides: Overrides) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(p) => {
                log::debug!("Loading configuration from {}", p.display());
                Self::from_file(p)?
            }
            None => Self::default(),
        };
        config.apply(overrides);
        Ok(config)
    }

    pub fn apply(&mut self, overrides: Overrides) {
        if overrides.source.is_some() {
            self.source = overrides.source;
        }
        if let Some(bind) = overrides.bind {
            self.bind = bind;
        }
        if let Some(port) = overrides.port {
            self.port = port;
        }
        if overrides.volume_label.is_some() {
            self.volume_label = overrides.volume_label;
        }
    }

    /// Checks the source directory and returns it.
    pub fn validate(&self) -> Result<&Path, ConfigError> {
        let source = self.source.as_deref().ok_or(ConfigError::NoSource)?;
        if !source.exists() {
            return Err(ConfigError::MissingSource(source.to_path_buf()));
        }
        if !source.is_dir() {
            return Err(ConfigError::NotADirectory(source.to_path_buf()));
        }
        Ok(source)
    }

    pub fn build_options(&self) -> BuildOptions {
        let mut options = BuildOptions::default();
        options.volume_label = self.volume_label.clone();
        if let Some(id) = self.volume_id {
            options.volume_id = id;
        }
        options
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.listen_addr().to_string(), "0.0.0.0:12345");
        assert!(matches!(config.validate(), Err(ConfigError::NoSource)));
    }

    #[test]
    fn test_file_and_overrides() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("share")).unwrap();
        let path = dir.path().join("vfatd.toml");
        fs::write(
            &path,
            "source = \"share\"\nport = 9000\nvolume_label = \"FILE\"\nvolume_id = 42\n",
        )
        .unwrap();

        let config = ServerConfig::load(
            Some(&path),
            Overrides {
                volume_label: Some("CLI".into()),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(config.source, Some(dir.path().join("share")));
        assert_eq!(config.port, 9000);
        assert_eq!(config.volume_label.as_deref(), Some("CLI"));
        assert!(config.validate().is_ok());

        let options = config.build_options();
        assert_eq!(options.volume_id, 42);
        assert_eq!(options.volume_label.as_deref(), Some("CLI"));
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "prot = 1\n").unwrap();
        assert!(ServerConfig::from_file(&path).is_err());
    }

    #[test]
    fn test_source_must_be_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("plain");
        fs::write(&file, b"x").unwrap();

        let mut config = ServerConfig::default();
        config.source = Some(file);
        assert!(matches!(config.validate(), Err(ConfigError::NotADirectory(_))));

        config.source = Some(dir.path().join("nope"));
        assert!(matches!(config.validate(), Err(ConfigError::MissingSource(_))));
    }
}
