use std::path::PathBuf;

use clap::Parser;
use eyre::{eyre, Result, WrapErr};
use revm::primitives::U256;
use serde_json::{Map, Value};
use statediff_config::Configuration;
use statediff_tracer::TracerConfig;

/// Arguments for the `replay` subcommand
#[derive(Debug, Clone, Parser)]
#[clap(about = "Trace recorded transactions and print their state diffs")]
pub struct ReplayArgs {
    /// A transcript file, or a directory searched recursively for `*.json` transcripts.
    pub path: PathBuf,

    /// Raw JSON tracer configuration, e.g. `{"onlyTopCall": true}`.
    #[clap(long = "tracer-config", default_value = "", hide_default_value = true)]
    pub tracer_config: String,

    /// Only keep the top-level frame in the call tree.
    #[clap(long)]
    pub only_top_call: bool,

    /// The gas price, in wei, for transactions that do not carry one.
    #[clap(long)]
    pub gas_price: Option<U256>,

    /// Pretty-print the result.
    #[clap(long)]
    pub pretty: bool,

    /// Persisted CLI configuration, used for every key the command line leaves unset.
    #[clap(skip)]
    pub defaults: Configuration,
}

impl ReplayArgs {
    /// Validates the replay arguments.
    pub fn validate(&self) -> Result<()> {
        if !self.path.exists() {
            return Err(eyre!("{} does not exist", self.path.display()));
        }
        Ok(())
    }

    /// Builds the tracer configuration. Flags take precedence over `--tracer-config`, which
    /// takes precedence over the persisted configuration.
    pub fn tracer_config(&self) -> Result<TracerConfig> {
        let mut config = TracerConfig::from_json(&self.tracer_config)?;
        let raw = self.raw_tracer_config()?;

        if !raw.contains_key("onlyTopCall") {
            if let Some(only_top_call) = self.defaults.only_top_call {
                config.only_top_call = only_top_call;
            }
        }
        if config.gas_price.is_none() {
            config.gas_price = self.defaults.gas_price;
        }

        config.only_top_call |= self.only_top_call;
        if let Some(gas_price) = self.gas_price {
            config.gas_price = Some(gas_price);
        }
        Ok(config)
    }

    /// Whether results are pretty-printed.
    pub fn pretty(&self) -> bool {
        self.pretty || self.defaults.pretty.unwrap_or(false)
    }

    /// The keys present in `--tracer-config`.
    fn raw_tracer_config(&self) -> Result<Map<String, Value>> {
        if self.tracer_config.trim().is_empty() {
            return Ok(Map::new());
        }
        serde_json::from_str(&self.tracer_config).wrap_err("invalid tracer configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_raw_config() {
        let args = ReplayArgs::parse_from([
            "replay",
            "transcript.json",
            "--tracer-config",
            r#"{"onlyTopCall": false, "gasPrice": "0x2", "withLog": true}"#,
            "--only-top-call",
        ]);

        let config = args.tracer_config().unwrap();
        assert!(config.only_top_call);
        assert_eq!(config.gas_price, Some(U256::from(2)));

        let args = ReplayArgs::parse_from(["replay", "transcript.json", "--gas-price", "9"]);
        assert_eq!(args.tracer_config().unwrap().gas_price, Some(U256::from(9)));
        assert!(args.validate().is_err());
    }

    #[test]
    fn raw_config_overrides_persisted_defaults() {
        let mut args = ReplayArgs::parse_from([
            "replay",
            "transcript.json",
            "--tracer-config",
            r#"{"onlyTopCall": false, "gasPrice": "0x2"}"#,
        ]);
        args.defaults = Configuration {
            only_top_call: Some(true),
            gas_price: Some(U256::from(7)),
            pretty: None,
        };

        let config = args.tracer_config().unwrap();
        assert!(!config.only_top_call);
        assert_eq!(config.gas_price, Some(U256::from(2)));
    }

    #[test]
    fn persisted_defaults_fill_unset_keys() {
        let mut args = ReplayArgs::parse_from(["replay", "transcript.json"]);
        args.defaults = Configuration {
            only_top_call: Some(true),
            gas_price: Some(U256::from(7)),
            pretty: Some(true),
        };

        let config = args.tracer_config().unwrap();
        assert!(config.only_top_call);
        assert_eq!(config.gas_price, Some(U256::from(7)));
        assert!(args.pretty());

        let args = ReplayArgs { gas_price: Some(U256::from(3)), ..args };
        assert_eq!(args.tracer_config().unwrap().gas_price, Some(U256::from(3)));
    }
}
