// ============================================================================
// Configuration - Pari-mutuel Prediction Market
// ============================================================================
//
// Loaded from TOML; every field has a default so an empty file (or no file
// at all) yields a working local setup. Environment variables override the
// file after `.env` is read:
//
//   PARIMUTUEL_CONFIG   path to the TOML file
//   PARIMUTUEL_FEE_BPS  engine.platform_fee_bps
//   PARIMUTUEL_BIND     server.bind
//   RUST_LOG            log filter (see LoggingConfig)
//
// Currency amounts are decimal strings in whole units ("0.01").
//
// ============================================================================

use crate::math::parse_decimal;
use crate::models::{Address, Amount, Bps, BPS_DENOMINATOR};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use tracing_subscriber::{fmt, EnvFilter};

pub const CONFIG_PATH_ENV: &str = "PARIMUTUEL_CONFIG";
pub const FEE_BPS_ENV: &str = "PARIMUTUEL_FEE_BPS";
pub const BIND_ENV: &str = "PARIMUTUEL_BIND";

// ============================================================================
// ENGINE
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Fee withheld from winnings, in bps
    #[serde(default = "default_platform_fee_bps")]
    pub platform_fee_bps: Bps,

    /// Minimum value attached to createMarket
    #[serde(default = "default_market_creation_fee")]
    pub market_creation_fee: String,

    /// Phantom shares per side on the bonding curve
    #[serde(default = "default_virtual_liquidity")]
    pub virtual_liquidity: String,

    /// Only caller allowed to resolve markets
    #[serde(default = "default_resolution_authority")]
    pub resolution_authority: String,

    /// Receives withdrawn platform fees
    #[serde(default = "default_fee_recipient")]
    pub fee_recipient: String,

    /// Batch size above which payouts log a warning
    #[serde(default = "default_recommended_batch_size")]
    pub recommended_batch_size: usize,

    /// Reject resolution while the market is still before its end time
    #[serde(default)]
    pub require_end_time_before_resolve: bool,
}

fn default_platform_fee_bps() -> Bps {
    200
}

fn default_market_creation_fee() -> String {
    "0.01".into()
}

fn default_virtual_liquidity() -> String {
    "100".into()
}

fn default_resolution_authority() -> String {
    "oracle".into()
}

fn default_fee_recipient() -> String {
    "treasury".into()
}

fn default_recommended_batch_size() -> usize {
    200
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            platform_fee_bps: default_platform_fee_bps(),
            market_creation_fee: default_market_creation_fee(),
            virtual_liquidity: default_virtual_liquidity(),
            resolution_authority: default_resolution_authority(),
            fee_recipient: default_fee_recipient(),
            recommended_batch_size: default_recommended_batch_size(),
            require_end_time_before_resolve: false,
        }
    }
}

impl EngineConfig {
    /// Creation fee in fixed point
    pub fn market_creation_fee_amount(&self) -> Result<Amount> {
        parse_decimal(&self.market_creation_fee)
            .with_context(|| format!("invalid market_creation_fee: {:?}", self.market_creation_fee))
    }

    /// Virtual liquidity in fixed point
    pub fn virtual_liquidity_amount(&self) -> Result<Amount> {
        parse_decimal(&self.virtual_liquidity)
            .with_context(|| format!("invalid virtual_liquidity: {:?}", self.virtual_liquidity))
    }

    pub fn resolution_authority(&self) -> Address {
        Address::new(self.resolution_authority.trim())
    }

    pub fn fee_recipient(&self) -> Address {
        Address::new(self.fee_recipient.trim())
    }

    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.platform_fee_bps <= BPS_DENOMINATOR,
            "platform_fee_bps must be at most {}, got {}",
            BPS_DENOMINATOR,
            self.platform_fee_bps
        );
        self.market_creation_fee_amount()?;
        anyhow::ensure!(
            self.virtual_liquidity_amount()? > 0,
            "virtual_liquidity must be positive"
        );
        anyhow::ensure!(
            !self.resolution_authority.trim().is_empty(),
            "resolution_authority must not be empty"
        );
        anyhow::ensure!(!self.fee_recipient.trim().is_empty(), "fee_recipient must not be empty");
        anyhow::ensure!(
            self.recommended_batch_size > 0,
            "recommended_batch_size must be positive"
        );
        Ok(())
    }
}

// ============================================================================
// SERVER
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String {
    "0.0.0.0:1234".into()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: default_bind() }
    }
}

// ============================================================================
// LOGGING
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
    /// `pretty` or `json`
    #[serde(default = "default_format")]
    pub format: String,
}

fn default_level() -> String {
    "info".into()
}

fn default_format() -> String {
    "pretty".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: default_format(),
        }
    }
}

impl LoggingConfig {
    /// Install the global tracing subscriber. `RUST_LOG` wins over `level`.
    pub fn init(&self) {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level));

        match self.format.as_str() {
            "json" => {
                let _ = fmt().json().with_env_filter(filter).try_init();
            }
            _ => {
                let _ = fmt().with_env_filter(filter).try_init();
            }
        }
    }
}

// ============================================================================
// APP CONFIG
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(text).context("failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.engine.validate()?;
        anyhow::ensure!(!self.server.bind.trim().is_empty(), "server.bind must not be empty");
        Ok(())
    }

    /// Apply `PARIMUTUEL_*` overrides from the process environment
    pub fn apply_env(&mut self) -> Result<()> {
        if let Ok(fee) = std::env::var(FEE_BPS_ENV) {
            self.engine.platform_fee_bps = fee
                .trim()
                .parse()
                .with_context(|| format!("{} must be an integer, got {:?}", FEE_BPS_ENV, fee))?;
        }
        if let Ok(bind) = std::env::var(BIND_ENV) {
            self.server.bind = bind;
        }
        self.validate()
    }
}

/// Load configuration: `.env`, then the TOML file (if any), then env overrides
pub fn load() -> Result<AppConfig> {
    dotenv::dotenv().ok();

    let mut config = match std::env::var(CONFIG_PATH_ENV) {
        Ok(path) => load_file(&path)?,
        Err(_) if Path::new("parimutuel.toml").exists() => load_file("parimutuel.toml")?,
        Err(_) => AppConfig::default(),
    };
    config.apply_env()?;
    Ok(config)
}

/// Read and validate a TOML configuration file
pub fn load_file(path: &str) -> Result<AppConfig> {
    let path = Path::new(path);
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;
    AppConfig::from_toml(&content).with_context(|| format!("invalid config file: {}", path.display()))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::units;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config.engine.platform_fee_bps, 200);
        assert_eq!(config.engine.market_creation_fee_amount().unwrap(), units(1) / 100);
        assert_eq!(config.engine.virtual_liquidity_amount().unwrap(), units(100));
        assert_eq!(config.engine.recommended_batch_size, 200);
        assert!(!config.engine.require_end_time_before_resolve);
        assert_eq!(config.server.bind, "0.0.0.0:1234");
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_partial_file() {
        let config = AppConfig::from_toml(
            r#"
            [engine]
            platform_fee_bps = 150
            resolution_authority = "L1_ORACLE"

            [logging]
            format = "json"
            "#,
        )
        .unwrap();
        assert_eq!(config.engine.platform_fee_bps, 150);
        assert_eq!(config.engine.resolution_authority(), Address::from("L1_ORACLE"));
        assert_eq!(config.engine.fee_recipient, "treasury");
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        assert!(AppConfig::from_toml("[engine]\nplatform_fee_bps = 10001").is_err());
        assert!(AppConfig::from_toml("[engine]\nvirtual_liquidity = \"0\"").is_err());
        assert!(AppConfig::from_toml("[engine]\nmarket_creation_fee = \"abc\"").is_err());
        assert!(AppConfig::from_toml("[engine]\nresolution_authority = \" \"").is_err());
    }

    #[test]
    fn test_load_nonexistent_file() {
        assert!(load_file("definitely-not-here.toml").is_err());
    }
}
