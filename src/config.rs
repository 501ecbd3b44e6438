//! Engine configuration and the demo binary's command line.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::pricing::PricingPolicy;
use crate::stock::DEFAULT_STOCK_SEED;

pub const DEFAULT_CHANNEL_BUFFER: usize = 32;

/// Runtime settings shared by every actor and session of one shop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Starting count for a SKU the ledger has never seen.
    pub default_stock_seed: u32,
    pub pricing: PricingPolicy,
    /// Mailbox size of each actor.
    pub channel_buffer: usize,
    /// Overrides every provider's processing delay when set.
    pub settlement_delay_ms: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_stock_seed: DEFAULT_STOCK_SEED,
            pricing: PricingPolicy::default(),
            channel_buffer: DEFAULT_CHANNEL_BUFFER,
            settlement_delay_ms: None,
        }
    }
}

impl EngineConfig {
    pub fn settlement_delay(&self) -> Option<Duration> {
        self.settlement_delay_ms.map(Duration::from_millis)
    }
}

/// Checkout engine demo configuration
#[derive(Debug, Parser)]
#[command(name = "checkout_demo", about = "Runs a sample checkout against the engine", long_about = None)]
pub struct CliConfig {
    /// Starting stock for SKUs with no recorded count
    #[arg(long, env = "CHECKOUT_STOCK_SEED", default_value_t = DEFAULT_STOCK_SEED)]
    pub stock_seed: u32,

    /// Processing delay in milliseconds, replacing each provider's own
    #[arg(long, env = "CHECKOUT_SETTLEMENT_DELAY_MS")]
    pub settlement_delay_ms: Option<u64>,

    /// JSON file the shop state is loaded from and saved to
    #[arg(long, env = "CHECKOUT_SNAPSHOT_PATH")]
    pub snapshot_path: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "CHECKOUT_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl CliConfig {
    /// Load configuration from environment and CLI arguments
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be parsed
    pub fn load() -> Result<Self, clap::Error> {
        // Load .env file if present (ignore if missing)
        _ = dotenvy::dotenv();

        Self::try_parse()
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            default_stock_seed: self.stock_seed,
            settlement_delay_ms: self.settlement_delay_ms,
            ..EngineConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use testresult::TestResult;

    use super::*;

    #[test]
    fn partial_json_falls_back_to_defaults() -> TestResult {
        let config: EngineConfig = serde_json::from_str(r#"{ "default_stock_seed": 3 }"#)?;

        assert_eq!(config.default_stock_seed, 3);
        assert_eq!(config.pricing.tax_rate, Decimal::new(5, 2));
        assert_eq!(config.channel_buffer, DEFAULT_CHANNEL_BUFFER);
        assert_eq!(config.settlement_delay(), None);
        Ok(())
    }

    #[test]
    fn cli_flags_flow_into_engine_config() -> TestResult {
        let cli = CliConfig::try_parse_from([
            "checkout_demo",
            "--stock-seed",
            "4",
            "--settlement-delay-ms",
            "25",
            "--snapshot-path",
            "/tmp/shop.json",
        ])?;

        let config = cli.engine_config();

        assert_eq!(config.default_stock_seed, 4);
        assert_eq!(config.settlement_delay(), Some(Duration::from_millis(25)));
        assert_eq!(cli.snapshot_path, Some(PathBuf::from("/tmp/shop.json")));
        Ok(())
    }
}
