use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::ethereum::BlockTarget;
use crate::report::OutputFormat;

/// Everything the fetcher needs to know, normally read from a TOML file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub rpc_url: String,
    pub contract_address: String,
    pub abi_path: PathBuf,
    pub event_name: String,
    pub from_block: u64,
    pub to_block: BlockTarget,
    pub receiver_field: String,
    pub output_format: OutputFormat,
    /// Per-request HTTP timeout. Unset means wait forever.
    pub request_timeout_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc_url: "https://eth-mainnet.g.alchemy.com/v2/demo".to_string(),
            // afCVX
            contract_address: "0x8668a15b7b023Dc77B372a740FCb8939E15257Cf".to_string(),
            abi_path: PathBuf::from("contract_abi.json"),
            event_name: "UnlockRequested".to_string(),
            from_block: 0,
            to_block: BlockTarget::LATEST,
            receiver_field: "receiver".to_string(),
            output_format: OutputFormat::Text,
            request_timeout_secs: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {:?}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {:?}: {}", path, e))?;

        Ok(config)
    }

    /// Load configuration from `path`, or from the default location.
    ///
    /// An explicit path must load. Without one, the file at
    /// [`Config::default_config_path`] is used when it loads and the built-in
    /// defaults otherwise.
    pub async fn load<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let config = Self::load_from_file(&path).await?;
                tracing::info!("Loaded configuration from {:?}", path.as_ref());
                config
            }
            None => Self::load_default_location().await,
        };

        config.apply_env_vars();
        Ok(config)
    }

    async fn load_default_location() -> Self {
        let Some(path) = Self::default_config_path().ok().filter(|p| p.exists()) else {
            return Self::default();
        };

        match Self::load_from_file(&path).await {
            Ok(config) => {
                tracing::info!("Loaded configuration from {:?}", path);
                config
            }
            Err(e) => {
                tracing::warn!("Failed to load default config file, using defaults: {}", e);
                Self::default()
            }
        }
    }

    /// Apply environment variable substitutions to configuration
    fn apply_env_vars(&mut self) {
        self.apply_api_key(std::env::var("ALCHEMY_API_KEY").ok().as_deref());
    }

    fn apply_api_key(&mut self, api_key: Option<&str>) {
        match api_key {
            Some(api_key) if self.rpc_url.contains("alchemy.com/v2/demo") => {
                tracing::info!("Using ALCHEMY_API_KEY environment variable for RPC URL");
                self.rpc_url = self.rpc_url.replace("/demo", &format!("/{}", api_key));
            }
            Some(api_key) if self.rpc_url.contains("YOUR_API_KEY_HERE") => {
                tracing::info!("Using ALCHEMY_API_KEY environment variable for RPC URL");
                self.rpc_url = self.rpc_url.replace("YOUR_API_KEY_HERE", api_key);
            }
            None if self.rpc_url.contains("/demo") => {
                tracing::warn!("Using demo RPC endpoint, set ALCHEMY_API_KEY environment variable for better reliability");
            }
            _ => {}
        }
    }

    pub fn request_timeout(&self) -> Option<std::time::Duration> {
        self.request_timeout_secs
            .map(std::time::Duration::from_secs)
    }

    /// Get default config file path
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir =
            dirs::config_dir().ok_or_else(|| anyhow!("Could not determine config directory"))?;
        Ok(config_dir.join("unlock-events").join("config.toml"))
    }

    /// Generate a sample configuration file
    pub fn generate_sample() -> String {
        let sample_config = r#"# unlock-events configuration file

# JSON-RPC endpoint of an Ethereum node
rpc_url = "https://eth-mainnet.g.alchemy.com/v2/YOUR_API_KEY_HERE"

# Contract to query (afCVX) and its ABI as a JSON file
contract_address = "0x8668a15b7b023Dc77B372a740FCb8939E15257Cf"
abi_path = "contract_abi.json"

# Event to fetch and the address argument to collect
event_name = "UnlockRequested"
receiver_field = "receiver"

# Inclusive block range; to_block is a number or "latest", "safe", "finalized"
from_block = 0
to_block = "latest"

# "text" or "json"
output_format = "text"

# Seconds before an RPC request is abandoned (unset waits forever)
# request_timeout_secs = 30

# Environment variables that can be used:
# ALCHEMY_API_KEY - Your Alchemy API key (replaces YOUR_API_KEY_HERE above)
"#;
        sample_config.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_match_original_constants() {
        let config = Config::default();
        assert_eq!(config.event_name, "UnlockRequested");
        assert_eq!(config.receiver_field, "receiver");
        assert_eq!(config.from_block, 0);
        assert_eq!(config.to_block, BlockTarget::LATEST);
        assert_eq!(config.abi_path, PathBuf::from("contract_abi.json"));
        assert_eq!(config.request_timeout(), None);
    }

    #[test]
    fn test_sample_config_parses() {
        let config: Config = toml::from_str(&Config::generate_sample()).unwrap();
        assert_eq!(config.to_block, BlockTarget::LATEST);
        assert_eq!(config.output_format, OutputFormat::Text);
        assert!(config.rpc_url.contains("YOUR_API_KEY_HERE"));
    }

    #[tokio::test]
    async fn test_partial_file_keeps_defaults() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(
            &path,
            "rpc_url = \"http://localhost:8545\"\nfrom_block = 19000000\nto_block = 19100000\nrequest_timeout_secs = 30\n",
        )
        .unwrap();

        let config = Config::load_from_file(&path).await.unwrap();
        assert_eq!(config.rpc_url, "http://localhost:8545");
        assert_eq!(config.from_block, 19_000_000);
        assert_eq!(config.to_block, BlockTarget::Number(19_100_000));
        assert_eq!(config.request_timeout(), Some(std::time::Duration::from_secs(30)));
        assert_eq!(config.event_name, "UnlockRequested");
    }

    #[tokio::test]
    async fn test_explicit_invalid_file_is_an_error() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(
            &path,
            "contract_address = \"0x1111111111111111111111111111111111111111\"\nto_block = \"pending\"\n",
        )
        .unwrap();

        assert!(Config::load(Some(&path)).await.is_err());
    }

    #[tokio::test]
    async fn test_explicit_missing_file_is_an_error() {
        let temp_dir = tempdir().unwrap();
        let result = Config::load(Some(temp_dir.path().join("absent.toml"))).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_explicit_file_keeps_user_contract() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(
            &path,
            "contract_address = \"0x1111111111111111111111111111111111111111\"\nto_block = \"Latest\"\n",
        )
        .unwrap();

        let config = Config::load(Some(&path)).await.unwrap();
        assert_eq!(
            config.contract_address,
            "0x1111111111111111111111111111111111111111"
        );
        assert_eq!(config.to_block, BlockTarget::LATEST);
    }

    #[test]
    fn test_api_key_substitution() {
        let mut config = Config::default();
        config.apply_api_key(Some("abc123"));
        assert_eq!(config.rpc_url, "https://eth-mainnet.g.alchemy.com/v2/abc123");

        let mut config = Config {
            rpc_url: "https://eth-mainnet.g.alchemy.com/v2/YOUR_API_KEY_HERE".to_string(),
            ..Config::default()
        };
        config.apply_api_key(Some("abc123"));
        assert_eq!(config.rpc_url, "https://eth-mainnet.g.alchemy.com/v2/abc123");

        let mut config = Config {
            rpc_url: "http://localhost:8545".to_string(),
            ..Config::default()
        };
        config.apply_api_key(Some("abc123"));
        assert_eq!(config.rpc_url, "http://localhost:8545");
    }
}
