//! Startup configuration.
//!
//! Layered with the `config` crate, later layers winning:
//! built-in defaults, then an optional `sniper.toml` in the working
//! directory, then `SNIPER_*` environment variables (`.env` is loaded by
//! the binary first). Read once; never reloaded.

use config::{builder::DefaultState, Config, ConfigBuilder, Environment, File};
use serde::Deserialize;
use tokio::time::Duration;

use crate::api::solana_rpc::MAINNET_RPC_URL;
use crate::error::ConfigError;
use crate::execution::ConfirmationPoller;
use crate::monitor::{ExitThresholds, MonitorConfig};

const CONFIG_FILE: &str = "sniper";
const ENV_PREFIX: &str = "SNIPER";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Trade against the in-memory paper broker instead of PumpPortal
    pub dry_run: bool,
    pub paper_balance_sol: f64,

    // Entry
    pub min_volume: f64,
    pub buy_amount_sol: f64,
    pub search_query: String,
    pub dex_ids: Vec<String>,
    /// 0 disables the periodic snipe loop
    pub auto_snipe_interval_secs: u64,

    // Exit
    pub take_profit_pct: f64,
    pub stop_loss_pct: f64,
    pub monitor_interval_secs: u64,
    pub max_concurrency: usize,
    /// Per-token budget for a price read within one monitor cycle
    pub price_timeout_secs: u64,
    /// Per-token budget for a triggered sell, confirmation included
    pub sell_timeout_secs: u64,

    /// Applied to every outbound HTTP request
    pub request_timeout_secs: u64,

    // Live trading
    pub rpc_url: String,
    #[serde(default)]
    pub wallet_pubkey: Option<String>,
    #[serde(default)]
    pub pumpportal_api_key: Option<String>,
    pub slippage_pct: u32,
    pub priority_fee_sol: f64,
    pub confirm_poll_ms: u64,
    pub confirm_max_attempts: u32,
}

impl Settings {
    /// Load from file + environment on top of the defaults, then validate
    pub fn load() -> Result<Self, ConfigError> {
        let config = Self::defaults()?
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("dex_ids"),
            )
            .build()?;

        Self::from_config(config)
    }

    pub fn from_config(config: Config) -> Result<Self, ConfigError> {
        let settings: Settings = config.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        let builder = Config::builder()
            .set_default("dry_run", true)?
            .set_default("paper_balance_sol", 10.0)?
            .set_default("min_volume", 10_000.0)?
            .set_default("buy_amount_sol", 0.1)?
            .set_default("search_query", "pump")?
            .set_default("dex_ids", vec!["pumpfun", "pumpswap"])?
            .set_default("auto_snipe_interval_secs", 0_i64)?
            .set_default("take_profit_pct", 100.0)?
            .set_default("stop_loss_pct", 50.0)?
            .set_default("monitor_interval_secs", 30_i64)?
            .set_default("max_concurrency", 8_i64)?
            .set_default("price_timeout_secs", 15_i64)?
            .set_default("sell_timeout_secs", 120_i64)?
            .set_default("request_timeout_secs", 10_i64)?
            .set_default("rpc_url", MAINNET_RPC_URL)?
            .set_default("slippage_pct", 10_i64)?
            .set_default("priority_fee_sol", 0.0005)?
            .set_default("confirm_poll_ms", 2_000_i64)?
            .set_default("confirm_max_attempts", 30_i64)?;
        Ok(builder)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("take_profit_pct", self.take_profit_pct)?;
        positive("stop_loss_pct", self.stop_loss_pct)?;
        if self.stop_loss_pct > 100.0 {
            return Err(invalid("stop_loss_pct", "cannot exceed 100%"));
        }
        positive("buy_amount_sol", self.buy_amount_sol)?;
        if !self.min_volume.is_finite() || self.min_volume < 0.0 {
            return Err(invalid("min_volume", "must be a non-negative number"));
        }
        if self.monitor_interval_secs == 0 {
            return Err(invalid("monitor_interval_secs", "must be at least 1"));
        }
        if self.max_concurrency == 0 {
            return Err(invalid("max_concurrency", "must be at least 1"));
        }
        for (field, secs) in [
            ("price_timeout_secs", self.price_timeout_secs),
            ("sell_timeout_secs", self.sell_timeout_secs),
            ("request_timeout_secs", self.request_timeout_secs),
        ] {
            if secs == 0 {
                return Err(invalid(field, "must be at least 1"));
            }
        }

        if self.dry_run {
            if !self.paper_balance_sol.is_finite() || self.paper_balance_sol < 0.0 {
                return Err(invalid("paper_balance_sol", "must be a non-negative number"));
            }
            return Ok(());
        }

        // Live mode needs a wallet to check and a key to trade with
        if self.wallet_pubkey.as_deref().map_or(true, str::is_empty) {
            return Err(ConfigError::Missing("wallet_pubkey"));
        }
        if self.pumpportal_api_key.as_deref().map_or(true, str::is_empty) {
            return Err(ConfigError::Missing("pumpportal_api_key"));
        }
        if self.confirm_poll_ms == 0 || self.confirm_max_attempts == 0 {
            return Err(invalid("confirm_max_attempts", "confirmation polling must be enabled"));
        }
        // A sell cut off mid-confirmation is reported failed but may still land
        let confirm_budget_ms = self.confirm_poll_ms.saturating_mul(u64::from(self.confirm_max_attempts));
        if self.sell_timeout_secs.saturating_mul(1_000) <= confirm_budget_ms {
            return Err(invalid("sell_timeout_secs", "must exceed the confirmation polling budget"));
        }
        Ok(())
    }

    pub fn thresholds(&self) -> ExitThresholds {
        ExitThresholds {
            take_profit_pct: self.take_profit_pct,
            stop_loss_pct: self.stop_loss_pct,
        }
    }

    pub fn monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            interval: Duration::from_secs(self.monitor_interval_secs),
            thresholds: self.thresholds(),
            max_concurrency: self.max_concurrency,
            price_timeout: Duration::from_secs(self.price_timeout_secs),
            sell_timeout: Duration::from_secs(self.sell_timeout_secs),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn confirmation_poller(&self) -> ConfirmationPoller {
        ConfirmationPoller::new(Duration::from_millis(self.confirm_poll_ms), self.confirm_max_attempts)
    }

    pub fn auto_snipe_interval(&self) -> Option<Duration> {
        (self.auto_snipe_interval_secs > 0).then(|| Duration::from_secs(self.auto_snipe_interval_secs))
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, "must be a positive number"))
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    fn from_toml(toml: &str) -> Result<Settings, ConfigError> {
        let config = Settings::defaults()?
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?;
        Settings::from_config(config)
    }

    #[test]
    fn test_defaults() {
        let settings = from_toml("").unwrap();

        assert!(settings.dry_run);
        assert_eq!(settings.min_volume, 10_000.0);
        assert_eq!(settings.thresholds(), ExitThresholds::default());
        assert_eq!(settings.monitor_config().interval, Duration::from_secs(30));
        assert_eq!(settings.monitor_config().price_timeout, Duration::from_secs(15));
        assert_eq!(settings.monitor_config().sell_timeout, Duration::from_secs(120));
        assert_eq!(settings.request_timeout(), Duration::from_secs(10));
        assert_eq!(settings.dex_ids, vec!["pumpfun", "pumpswap"]);
        assert_eq!(settings.auto_snipe_interval(), None);
        assert_eq!(settings.wallet_pubkey, None);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let settings = from_toml(
            r#"
            take_profit_pct = 250.0
            stop_loss_pct = 30.0
            auto_snipe_interval_secs = 60
            dex_ids = ["pumpswap"]
            "#,
        )
        .unwrap();

        assert_eq!(settings.thresholds().take_profit_pct, 250.0);
        assert_eq!(settings.thresholds().stop_loss_pct, 30.0);
        assert_eq!(settings.auto_snipe_interval(), Some(Duration::from_secs(60)));
        assert_eq!(settings.dex_ids, vec!["pumpswap"]);
    }

    #[test]
    fn test_invalid_thresholds_rejected() {
        let err = from_toml("take_profit_pct = 0.0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "take_profit_pct", .. }));

        let err = from_toml("stop_loss_pct = 150.0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "stop_loss_pct", .. }));

        let err = from_toml("buy_amount_sol = -1.0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "buy_amount_sol", .. }));
    }

    #[test]
    fn test_zero_timeouts_rejected() {
        for field in ["price_timeout_secs", "sell_timeout_secs", "request_timeout_secs"] {
            let err = from_toml(&format!("{} = 0", field)).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid { field: f, .. } if f == field));
        }
    }

    #[test]
    fn test_live_sell_timeout_covers_confirmation() {
        let err = from_toml(
            r#"
            dry_run = false
            wallet_pubkey = "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU"
            pumpportal_api_key = "key"
            sell_timeout_secs = 60
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "sell_timeout_secs", .. }));
    }

    #[test]
    fn test_live_mode_requires_credentials() {
        let err = from_toml("dry_run = false").unwrap_err();
        assert!(matches!(err, ConfigError::Missing("wallet_pubkey")));

        let err = from_toml(
            r#"
            dry_run = false
            wallet_pubkey = "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Missing("pumpportal_api_key")));

        let settings = from_toml(
            r#"
            dry_run = false
            wallet_pubkey = "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU"
            pumpportal_api_key = "key"
            "#,
        )
        .unwrap();
        assert!(!settings.dry_run);
    }
}
