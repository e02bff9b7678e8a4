use serde::Deserialize;
use std::{fs, path::PathBuf};

use anyhow::{bail, Context};

use crate::charts::RateBand;

pub const CONFIG_ENV: &str = "CHARGE_ANALYZER_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "charge-analyzer.toml";

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Flat price applied to every session; there is no time-varying tariff.
    pub tariff_eur_per_kwh: f64,
    pub monthly_window_months: usize,
    pub rate_band_min_kwh_per_hour: f64,
    pub rate_band_max_kwh_per_hour: f64,
    pub histogram_bins: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            tariff_eur_per_kwh: 0.49,
            monthly_window_months: 12,
            rate_band_min_kwh_per_hour: 0.0,
            rate_band_max_kwh_per_hour: 50.0,
            histogram_bins: 30,
        }
    }
}

impl AnalysisConfig {
    pub fn rate_band(&self) -> RateBand {
        RateBand {
            min_kwh_per_hour: self.rate_band_min_kwh_per_hour,
            max_kwh_per_hour: self.rate_band_max_kwh_per_hour,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct SourceConfig {
    /// ChargeME export to load when none is given on the command line.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8050".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct MetricsConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub server: ServerConfig,
    pub metrics: Option<MetricsConfig>,
}

impl AppConfig {
    /// Read the TOML file named by `CHARGE_ANALYZER_CONFIG`, falling back to
    /// `charge-analyzer.toml`. Built-in defaults apply when neither is set up.
    pub fn load() -> anyhow::Result<Self> {
        use std::env;

        let cfg = match env::var(CONFIG_ENV) {
            Ok(path) => Self::from_file(&path)?,
            Err(_) if fs::metadata(DEFAULT_CONFIG_PATH).is_ok() => Self::from_file(DEFAULT_CONFIG_PATH)?,
            Err(_) => {
                tracing::info!("no configuration file found, using defaults");
                Self::default()
            }
        };
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(path: &str) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path).with_context(|| format!("failed to read config file '{path}'"))?;
        Self::from_toml_str(&contents).with_context(|| format!("invalid config file '{path}'"))
    }

    pub fn from_toml_str(contents: &str) -> anyhow::Result<Self> {
        let cfg: AppConfig = toml::from_str(contents)?;
        Ok(cfg)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let a = &self.analysis;
        if !a.tariff_eur_per_kwh.is_finite() || a.tariff_eur_per_kwh <= 0.0 {
            bail!("analysis.tariff_eur_per_kwh must be a positive number");
        }
        if a.monthly_window_months == 0 {
            bail!("analysis.monthly_window_months must be at least 1");
        }
        if !(a.rate_band_min_kwh_per_hour < a.rate_band_max_kwh_per_hour) {
            bail!("analysis.rate_band_min_kwh_per_hour must be below rate_band_max_kwh_per_hour");
        }
        if a.histogram_bins == 0 {
            bail!("analysis.histogram_bins must be at least 1");
        }
        Ok(())
    }
}
