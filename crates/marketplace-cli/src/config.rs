/*
[INPUT]:  YAML configuration file
[OUTPUT]: Parsed CLI configuration and derived library settings
[POS]:    Configuration layer - client setup
[UPDATE]: When adding new configuration options
*/

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use marketplace_auth::auth::WalletTimeouts;
use marketplace_auth::http::DEFAULT_API_BASE_URL;
use marketplace_auth::ClientConfig;

const APP_DIR: &str = "marketplace";
const CONFIG_FILE: &str = "config.yaml";

/// Top-level configuration for the marketplace CLI
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CliConfig {
    /// Backend API root, including the `/api` prefix
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Name of the local key used as the wallet
    #[serde(default = "default_wallet_label")]
    pub wallet_label: String,
    /// Where keys and the session file live; platform data dir when unset
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    #[serde(default)]
    pub wallet: WalletConfig,
}

/// Wallet interaction limits
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct WalletConfig {
    #[serde(default = "default_connect_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_sign_secs")]
    pub sign_timeout_secs: u64,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_secs(),
            sign_timeout_secs: default_sign_secs(),
        }
    }
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            wallet_label: default_wallet_label(),
            data_dir: None,
            wallet: WalletConfig::default(),
        }
    }
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_wallet_label() -> String {
    "default".to_string()
}

fn default_connect_secs() -> u64 {
    60
}

fn default_sign_secs() -> u64 {
    120
}

impl CliConfig {
    /// Load configuration from YAML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("parse config {}", path.display()))?;
        Ok(config)
    }

    /// Explicit file, else `<data dir>/marketplace/config.yaml` when present, else defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }
        match dirs::data_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE)) {
            Some(default_path) if default_path.exists() => Self::from_file(&default_path),
            _ => Ok(Self::default()),
        }
    }

    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }
        dirs::data_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or_else(|| anyhow!("Could not determine data directory"))
    }

    pub fn session_path(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join("session.json"))
    }

    pub fn key_dir(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join("keys"))
    }

    /// Session cookies live next to the session file
    pub fn cookie_path(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join("cookies.json"))
    }

    pub fn client_config(&self) -> Result<ClientConfig> {
        Ok(ClientConfig {
            base_url: self.api_base_url.clone(),
            timeout: Duration::from_secs(self.request_timeout_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            cookie_file: Some(self.cookie_path()?),
        })
    }

    pub fn wallet_timeouts(&self) -> WalletTimeouts {
        WalletTimeouts {
            connect: Duration::from_secs(self.wallet.connect_timeout_secs),
            sign: Duration::from_secs(self.wallet.sign_timeout_secs),
            ..WalletTimeouts::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: CliConfig = serde_yaml::from_str(
            "api_base_url: https://market.example.com/api\nwallet:\n  sign_timeout_secs: 5\n",
        )
        .unwrap();

        assert_eq!(config.api_base_url, "https://market.example.com/api");
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.wallet_label, "default");
        assert_eq!(config.wallet.connect_timeout_secs, 60);
        assert_eq!(config.wallet_timeouts().sign, Duration::from_secs(5));
    }

    #[test]
    fn test_paths_follow_data_dir() {
        let dir = std::env::temp_dir().join(format!("marketplace-test-{}", Uuid::new_v4()));
        let config = CliConfig {
            data_dir: Some(dir.clone()),
            ..CliConfig::default()
        };
        assert_eq!(config.session_path().unwrap(), dir.join("session.json"));
        assert_eq!(config.key_dir().unwrap(), dir.join("keys"));
        assert_eq!(
            config.client_config().unwrap().cookie_file,
            Some(dir.join("cookies.json"))
        );
    }

    #[test]
    fn test_from_file() {
        let dir = std::env::temp_dir().join(format!("marketplace-test-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.yaml");
        std::fs::write(&path, "wallet_label: seller\nrequest_timeout_secs: 3\n").unwrap();

        let config = CliConfig::load(Some(&path)).unwrap();
        assert_eq!(config.wallet_label, "seller");
        assert_eq!(config.client_config().unwrap().timeout, Duration::from_secs(3));

        assert!(CliConfig::from_file(&dir.join("missing.yaml")).is_err());
        std::fs::remove_dir_all(dir).unwrap();
    }
}
