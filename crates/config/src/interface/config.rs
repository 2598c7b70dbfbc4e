#![allow(deprecated)]
use std::{
    env::home_dir,
    path::{Path, PathBuf},
};

use alloy::primitives::U256;
use eyre::{eyre, OptionExt, Result, WrapErr};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Prefix of the environment variables overriding configuration values.
pub const ENV_PREFIX: &str = "STATEDIFF_";

/// The [`Configuration`] struct represents the configuration of the CLI.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Configuration {
    /// Only keep the top-level frame in the call tree.
    pub only_top_call: Option<bool>,

    /// The gas price, in wei, used when a transaction does not carry one. Decimal or
    /// `0x`-prefixed hex when set from the command line.
    pub gas_price: Option<U256>,

    /// Whether to pretty-print results.
    pub pretty: Option<bool>,
}

impl Configuration {
    /// The path of the configuration file, `~/.statediff/config.json`.
    pub fn path() -> Result<PathBuf> {
        let mut config_path = home_dir().ok_or_eyre("failed to get home directory")?;
        config_path.push(".statediff");
        config_path.push("config.json");
        Ok(config_path)
    }

    /// Returns the current configuration: the configuration file overridden by the
    /// environment.
    pub fn load() -> Result<Self> {
        let config = Self::load_file()?;
        let env_config = Self::load_from_env()?;
        Ok(env_config.or(config))
    }

    /// Returns the configuration file alone. A missing file yields the defaults.
    pub fn load_file() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    /// Reads the configuration at `path`. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "no configuration file, using defaults");
            return Ok(Self::default());
        }

        let config = std::fs::read_to_string(path)?;
        serde_json::from_str(&config)
            .wrap_err_with(|| format!("invalid configuration at {}", path.display()))
    }

    /// Loads configuration from env with envy
    fn load_from_env() -> Result<Self> {
        envy::prefixed(ENV_PREFIX).from_env::<Configuration>().map_err(Into::into)
    }

    /// Keeps every value set in `self`, falling back to `other` for the rest.
    pub fn or(self, other: Self) -> Self {
        Self {
            only_top_call: self.only_top_call.or(other.only_top_call),
            gas_price: self.gas_price.or(other.gas_price),
            pretty: self.pretty.or(other.pretty),
        }
    }

    /// Saves the configuration to disk.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path()?)
    }

    /// Writes the configuration to `path`, creating its directory if needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            if !dir.exists() {
                std::fs::create_dir_all(dir)?;
            }
        }

        let config = serde_json::to_string_pretty(self)?;
        std::fs::write(path, config)?;

        Ok(())
    }

    /// Set a value
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "only_top_call" => self.only_top_call = Some(parse_bool(key, value)?),
            "gas_price" => {
                self.gas_price = Some(
                    value
                        .parse::<U256>()
                        .map_err(|e| eyre!("invalid value '{}' for '{}': {}", value, key, e))?,
                )
            }
            "pretty" => self.pretty = Some(parse_bool(key, value)?),
            _ => return Err(eyre!("invalid key '{}'", key)),
        };

        Ok(())
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    value.parse().map_err(|_| eyre!("invalid value '{}' for '{}': expected true or false", value, key))
}

#[cfg(test)]
mod tests {
    use tempdir::TempDir;

    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let tmp = TempDir::new("statediff-config").unwrap();
        let config = Configuration::load_from(&tmp.path().join("config.json")).unwrap();
        assert_eq!(config, Configuration::default());
    }

    #[test]
    fn set_and_save_round_trip() {
        let tmp = TempDir::new("statediff-config").unwrap();
        let path = tmp.path().join(".statediff").join("config.json");

        let mut config = Configuration::default();
        config.set("only_top_call", "true").unwrap();
        config.set("gas_price", "1000000000").unwrap();
        config.save_to(&path).unwrap();

        let loaded = Configuration::load_from(&path).unwrap();
        assert_eq!(loaded.only_top_call, Some(true));
        assert_eq!(loaded.gas_price, Some(U256::from(1_000_000_000u64)));
        assert_eq!(loaded.pretty, None);
    }

    #[test]
    fn gas_price_beyond_u64() {
        let mut config = Configuration::default();
        config.set("gas_price", "0x10000000000000000").unwrap();
        assert_eq!(config.gas_price, Some(U256::from(u64::MAX) + U256::from(1)));

        config.set("gas_price", "36893488147419103232").unwrap();
        assert_eq!(config.gas_price, Some(U256::from(1u128 << 65)));
    }

    #[test]
    fn rejects_unknown_keys_and_bad_values() {
        let mut config = Configuration::default();
        assert!(config.set("rpc_url", "http://localhost:8545").is_err());
        assert!(config.set("pretty", "yes").is_err());
        assert!(config.set("gas_price", "-1").is_err());
        assert_eq!(config, Configuration::default());
    }

    #[test]
    fn env_values_take_precedence() {
        let file =
            Configuration { only_top_call: Some(false), gas_price: Some(U256::from(7)), pretty: None };
        let env = Configuration { only_top_call: Some(true), gas_price: None, pretty: Some(true) };

        assert_eq!(
            env.or(file),
            Configuration {
                only_top_call: Some(true),
                gas_price: Some(U256::from(7)),
                pretty: Some(true)
            }
        );
    }
}
