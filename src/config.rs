//! Configuration management for the resolver
//!
//! Loads configuration from TOML files with environment variable substitution.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub resolver: ResolverConfig,
    pub api: ApiConfig,
    pub metrics: MetricsConfig,
    pub chains: HashMap<String, ChainConfig>,
    pub wallet: WalletConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResolverConfig {
    /// Key into `chains` for the A side of the pair.
    pub chain_a: String,
    /// Key into `chains` for the B side of the pair.
    pub chain_b: String,
    /// Cap on swaps in a non-terminal phase. Admissions beyond the cap are
    /// rejected, not queued.
    pub max_concurrent_swaps: usize,
    pub retry_max_attempts: u32,
    pub retry_base_delay_ms: u64,
    pub min_timelock_secs: u64,
    pub max_timelock_secs: u64,
    /// Required excess of the source timelock over the destination timelock.
    pub timelock_safety_margin_secs: u64,
    pub escrow_poll_interval_ms: u64,
    pub metrics_interval_secs: u64,
    pub health_check_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    pub chain_id: u64,
    pub name: String,
    pub rpc_urls: Vec<String>,
    /// Escrow factory contract address on this chain.
    pub escrow_factory: String,
    /// Init-code hash used for deterministic escrow address derivation.
    pub escrow_init_code_hash: String,
    pub confirmation_blocks: u64,
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WalletConfig {
    pub keystore_path: Option<String>,
    pub private_key_env: Option<String>,
}

impl Settings {
    /// Load settings from configuration files
    pub fn load() -> Result<Self> {
        let config_path = env::var("RESOLVER_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config/default.toml"));

        let config_str = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        // Substitute environment variables
        let config_str = substitute_env_vars(&config_str);

        let settings: Settings =
            toml::from_str(&config_str).with_context(|| "Failed to parse configuration")?;

        settings.validate()?;

        Ok(settings)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        for key in [&self.resolver.chain_a, &self.resolver.chain_b] {
            let chain = self
                .chains
                .get(key)
                .with_context(|| format!("Chain '{}' referenced but not configured", key))?;
            if !chain.enabled {
                anyhow::bail!("Chain '{}' referenced but not enabled", key);
            }
            if chain.rpc_urls.is_empty() {
                anyhow::bail!("Chain '{}' has no RPC URLs configured", key);
            }
            if chain.escrow_factory.is_empty() {
                anyhow::bail!("Chain '{}' has no escrow factory configured", key);
            }
        }

        if self.resolver.chain_a == self.resolver.chain_b {
            anyhow::bail!("chain_a and chain_b must name different chains");
        }
        let a = &self.chains[&self.resolver.chain_a];
        let b = &self.chains[&self.resolver.chain_b];
        if a.chain_id == b.chain_id {
            anyhow::bail!("chain_a and chain_b must have different chain ids");
        }

        if self.resolver.max_concurrent_swaps == 0 {
            anyhow::bail!("max_concurrent_swaps must be greater than zero");
        }
        if self.resolver.min_timelock_secs >= self.resolver.max_timelock_secs {
            anyhow::bail!("min_timelock_secs must be below max_timelock_secs");
        }
        if self.resolver.timelock_safety_margin_secs >= self.resolver.max_timelock_secs {
            anyhow::bail!("timelock_safety_margin_secs must be below max_timelock_secs");
        }

        Ok(())
    }

    pub fn chain_a(&self) -> &ChainConfig {
        &self.chains[&self.resolver.chain_a]
    }

    pub fn chain_b(&self) -> &ChainConfig {
        &self.chains[&self.resolver.chain_b]
    }
}

/// Substitute environment variables in the format ${VAR_NAME}
fn substitute_env_vars(input: &str) -> String {
    let mut result = input.to_string();
    let re = regex::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").unwrap();

    for cap in re.captures_iter(input) {
        let var_name = &cap[1];
        let var_value = env::var(var_name).unwrap_or_default();
        result = result.replace(&cap[0], &var_value);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_var_substitution() {
        env::set_var("TEST_VAR", "test_value");
        let input = "url = \"https://api.example.com/${TEST_VAR}/endpoint\"";
        let result = substitute_env_vars(input);
        assert_eq!(
            result,
            "url = \"https://api.example.com/test_value/endpoint\""
        );
    }

    fn sample_settings() -> Settings {
        let toml_str = r#"
            [resolver]
            chain_a = "evm"
            chain_b = "counter"
            max_concurrent_swaps = 32
            retry_max_attempts = 5
            retry_base_delay_ms = 500
            min_timelock_secs = 600
            max_timelock_secs = 86400
            timelock_safety_margin_secs = 1800
            escrow_poll_interval_ms = 2000
            metrics_interval_secs = 60
            health_check_interval_secs = 30

            [api]
            host = "127.0.0.1"
            port = 8080

            [metrics]
            enabled = true
            port = 9090

            [wallet]
            private_key_env = "RESOLVER_PRIVATE_KEY"

            [chains.evm]
            chain_id = 1
            name = "ethereum"
            rpc_urls = ["http://localhost:8545"]
            escrow_factory = "0x1111111111111111111111111111111111111111"
            escrow_init_code_hash = "0x0000000000000000000000000000000000000000000000000000000000000000"
            confirmation_blocks = 12
            enabled = true

            [chains.counter]
            chain_id = 728126428
            name = "tron-evm"
            rpc_urls = ["http://localhost:8645"]
            escrow_factory = "0x2222222222222222222222222222222222222222"
            escrow_init_code_hash = "0x0000000000000000000000000000000000000000000000000000000000000000"
            confirmation_blocks = 19
            enabled = true
        "#;
        toml::from_str(toml_str).unwrap()
    }

    #[test]
    fn valid_settings_pass_validation() {
        assert!(sample_settings().validate().is_ok());
    }

    #[test]
    fn same_chain_pair_rejected() {
        let mut settings = sample_settings();
        settings.resolver.chain_b = "evm".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn zero_capacity_rejected() {
        let mut settings = sample_settings();
        settings.resolver.max_concurrent_swaps = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn disabled_chain_rejected() {
        let mut settings = sample_settings();
        settings.chains.get_mut("counter").unwrap().enabled = false;
        assert!(settings.validate().is_err());
    }
}
