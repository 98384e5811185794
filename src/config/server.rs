use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::SweeperConfig;
use crate::error::{Error, Result};

pub const DB_FILE_NAME: &str = "revlo.db";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const ADMIN_TOKEN_FILE_NAME: &str = ".admin_token";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub sweeper: SweeperConfig,
}

impl ServerConfig {
    /// Builds a config for `data_dir`, reading `config.toml` from it when present.
    pub fn load(host: String, port: u16, data_dir: PathBuf) -> Result<Self> {
        let file = FileConfig::read(&data_dir.join(CONFIG_FILE_NAME))?;
        Ok(Self {
            host,
            port,
            data_dir,
            sweeper: file.sweeper,
        })
    }

    pub fn socket_addr(&self) -> std::result::Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(DB_FILE_NAME)
    }

    #[must_use]
    pub fn admin_token_path(&self) -> PathBuf {
        self.data_dir.join(ADMIN_TOKEN_FILE_NAME)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            data_dir: PathBuf::from("./data"),
            sweeper: SweeperConfig::default(),
        }
    }
}

/// On-disk layout of `config.toml`.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub sweeper: SweeperConfig,
}

impl FileConfig {
    /// Reads and validates the file. A missing file yields the defaults.
    pub fn read(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let file: FileConfig =
            toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        file.sweeper.validate()?;
        Ok(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let config =
            ServerConfig::load("127.0.0.1".to_string(), 9000, temp.path().to_path_buf()).unwrap();

        assert_eq!(config.port, 9000);
        assert!(config.sweeper.enabled);
        assert_eq!(config.sweeper.interval_hours, 24);
        assert_eq!(config.db_path(), temp.path().join("revlo.db"));
    }

    #[test]
    fn test_reads_sweeper_section() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join(CONFIG_FILE_NAME),
            "[sweeper]\nenabled = false\ninterval_hours = 6\n",
        )
        .unwrap();

        let config =
            ServerConfig::load("127.0.0.1".to_string(), 9000, temp.path().to_path_buf()).unwrap();

        assert!(!config.sweeper.enabled);
        assert_eq!(config.sweeper.interval_hours, 6);
        assert_eq!(config.sweeper.start_delay_minutes, 5);
    }

    #[test]
    fn test_rejects_unknown_keys() {
        let result = FileConfig::parse("[sweeper]\ninterval = 3\n");
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
