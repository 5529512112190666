use anyhow::Result;
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::money::{Money, MoneyError, Percentage};
use crate::validation::policy::{AutoApprovalConfig, PolicyConfig};

/// Main configuration structure for the jaspel engine
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Fee allocation settings
    pub fees: FeeConfig,
    /// Auto-approval ceilings
    pub auto_approval: AutoApprovalSettings,
    /// Notification delivery
    pub notifications: NotificationConfig,
    /// Logging settings
    pub observability: ObservabilityConfig,
    /// Database settings (optional)
    pub database: Option<DatabaseConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FeeConfig {
    /// Share of the tariff paid to a doctor or paramedic, 0-100
    pub percentage: u32,
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            percentage: Percentage::DEFAULT_JASPEL.value() as u32,
        }
    }
}

/// Ceilings in whole currency units. No ceiling means no auto-approval.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AutoApprovalSettings {
    pub fee_ceiling: Option<i64>,
    pub doctor_ceiling: Option<i64>,
    pub paramedic_ceiling: Option<i64>,
    pub non_paramedic_ceiling: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub enabled: bool,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level or `EnvFilter` directive
    pub log_level: String,
    /// Emit JSON log lines
    pub json: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// SQLite URL, e.g. `sqlite://jaspel.db`
    pub url: String,
    /// Maximum connections in pool
    pub max_connections: u32,
    /// Enable automatic migrations
    pub auto_migrate: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://jaspel.db".to_string(),
            max_connections: 5,
            auto_migrate: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid fee percentage: {0}")]
    Percentage(#[from] MoneyError),
    #[error("{field} must not be negative, got {value}")]
    NegativeCeiling { field: &'static str, value: i64 },
    #[error("{field} is too large: {value}")]
    CeilingOutOfRange { field: &'static str, value: i64 },
}

fn ceiling(field: &'static str, value: Option<i64>) -> Result<Option<Money>, ConfigError> {
    match value {
        None => Ok(None),
        Some(v) if v < 0 => Err(ConfigError::NegativeCeiling { field, value: v }),
        Some(v) => v
            .checked_mul(crate::money::MINOR_PER_UNIT)
            .map(|minor| Some(Money::from_minor(minor)))
            .ok_or(ConfigError::CeilingOutOfRange { field, value: v }),
    }
}

impl EngineConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration files (jaspel.toml, .jaspelrc)
    /// 3. Environment variables (JASPEL__SECTION__KEY)
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("."))
    }

    /// Same as [`EngineConfig::load`] with config files looked up in `dir`.
    pub fn load_from(dir: &Path) -> Result<Self> {
        let mut builder = Config::builder();

        let toml_path = dir.join("jaspel.toml");
        if toml_path.exists() {
            builder = builder.add_source(File::from(toml_path).format(FileFormat::Toml));
        }

        let rc_path = dir.join(".jaspelrc");
        if rc_path.exists() {
            builder = builder.add_source(File::from(rc_path).format(FileFormat::Toml));
        }

        builder = builder.add_source(
            Environment::with_prefix("JASPEL")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        let engine_config: EngineConfig = config.try_deserialize()?;
        engine_config.policy()?;
        Ok(engine_config)
    }

    /// Validated policy inputs for fee allocation and auto-approval.
    pub fn policy(&self) -> Result<PolicyConfig, ConfigError> {
        let fee_percentage = Percentage::new(self.fees.percentage)?;
        let settings = &self.auto_approval;

        Ok(PolicyConfig {
            fee_percentage,
            auto_approval: AutoApprovalConfig {
                fee_ceiling: ceiling("auto_approval.fee_ceiling", settings.fee_ceiling)?,
                doctor_ceiling: ceiling("auto_approval.doctor_ceiling", settings.doctor_ceiling)?,
                paramedic_ceiling: ceiling("auto_approval.paramedic_ceiling", settings.paramedic_ceiling)?,
                non_paramedic_ceiling: ceiling(
                    "auto_approval.non_paramedic_ceiling",
                    settings.non_paramedic_ceiling,
                )?,
            },
        })
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }
}
