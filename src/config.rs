//! Engine configuration
//!
//! Every threshold the engine uses lives here with a `Default`. Collaborators can
//! override any subset from JSON; missing fields fall back to defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::error::{validate_max_bet_percent, validate_min_edge};

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Fractional Kelly setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum KellyFraction {
    Full,
    Half,
    #[default]
    Quarter,
    Eighth,
}

impl KellyFraction {
    pub fn multiplier(self) -> f64 {
        match self {
            KellyFraction::Full => 1.0,
            KellyFraction::Half => 0.5,
            KellyFraction::Quarter => 0.25,
            KellyFraction::Eighth => 0.125,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            KellyFraction::Full => "full",
            KellyFraction::Half => "half",
            KellyFraction::Quarter => "quarter",
            KellyFraction::Eighth => "eighth",
        }
    }

    pub fn all() -> [KellyFraction; 4] {
        [
            KellyFraction::Full,
            KellyFraction::Half,
            KellyFraction::Quarter,
            KellyFraction::Eighth,
        ]
    }
}

/// Kelly sizing settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KellySettings {
    pub enabled: bool,
    pub fraction: KellyFraction,
    /// Maximum single bet as a fraction of bankroll
    pub max_bet_percent: f64,
    /// Minimum edge (as a fraction, 0.05 = 5%) before any bet is sized
    pub min_edge_required: f64,
    /// Smallest ticket the window accepts
    pub min_bet: f64,
    /// Full-Kelly fraction above which an aggressiveness warning is attached
    pub aggressive_threshold: f64,
    /// Positive edges below this fraction get a marginal-edge warning
    pub marginal_edge_threshold: f64,
    /// Batch exposure (fraction of bankroll) above which a warning is attached
    pub max_total_exposure: f64,
}

impl Default for KellySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            fraction: KellyFraction::Quarter,
            max_bet_percent: 0.10,
            min_edge_required: 0.05,
            min_bet: 2.0,
            aggressive_threshold: 0.25,
            marginal_edge_threshold: 0.10,
            max_total_exposure: 0.30,
        }
    }
}

/// Tier classification and single-race menu settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierSettings {
    /// Score at or above which a horse is tier 1
    pub high_threshold: f64,
    /// Score at or above which a horse is tier 2
    pub mid_threshold: f64,
    /// Base stakes per tier (1, 2, 3)
    pub base_stakes: [f64; 3],
    /// Overlay percent at or above which a bet is flagged as high overlay
    pub high_overlay_percent: f64,
    /// Decimal odds at or above which a positive-edge horse is a "nuclear" longshot
    pub nuclear_odds: f64,
}

impl Default for TierSettings {
    fn default() -> Self {
        Self {
            high_threshold: 80.0,
            mid_threshold: 60.0,
            base_stakes: [10.0, 5.0, 2.0],
            high_overlay_percent: 50.0,
            nuclear_odds: 21.0,
        }
    }
}

/// Risk style for multi-race ticket construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RiskStyle {
    Safe,
    #[default]
    Balanced,
    Aggressive,
}

impl RiskStyle {
    pub fn label(self) -> &'static str {
        match self {
            RiskStyle::Safe => "safe",
            RiskStyle::Balanced => "balanced",
            RiskStyle::Aggressive => "aggressive",
        }
    }
}

/// Multi-race scanning and ticket settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MultiRaceSettings {
    /// Minimum primary edge percent for a race to count as a value play
    pub min_value_edge: f64,
    /// Stricter edge percent at which one horse can carry a leg alone
    pub singleable_edge: f64,
    /// Top win probability below which a race is considered wide open
    pub wide_open_probability: f64,
    /// Win probability at which a horse counts as a contender in a spread
    pub contender_probability: f64,
    /// Decimal odds at which a selected horse counts as a longshot
    pub longshot_odds: f64,
    /// Average selected decimal odds that trigger the extra payout scaling
    pub high_average_odds: f64,
    /// Show MARGINAL windows
    pub expert_mode: bool,
}

impl Default for MultiRaceSettings {
    fn default() -> Self {
        Self {
            min_value_edge: 10.0,
            singleable_edge: 25.0,
            wide_open_probability: 0.20,
            contender_probability: 0.08,
            longshot_odds: 9.0,
            high_average_odds: 11.0,
            expert_mode: false,
        }
    }
}

/// Top-level engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    pub kelly: KellySettings,
    pub tiers: TierSettings,
    pub multi_race: MultiRaceSettings,
}

impl EngineConfig {
    /// Parse a (possibly partial) JSON configuration
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    /// Reject settings that would make the engine's arithmetic meaningless
    pub fn validate(&self) -> Result<(), ConfigError> {
        let k = &self.kelly;
        validate_max_bet_percent(k.max_bet_percent)
            .map_err(|e| ConfigError::Invalid(format!("kelly.max_bet_percent: {}", e)))?;
        validate_min_edge(k.min_edge_required)
            .map_err(|e| ConfigError::Invalid(format!("kelly.min_edge_required: {}", e)))?;
        if !(k.min_bet > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "kelly.min_bet must be positive, got {}",
                k.min_bet
            )));
        }

        let t = &self.tiers;
        if t.mid_threshold > t.high_threshold {
            return Err(ConfigError::Invalid(format!(
                "tiers.mid_threshold ({}) exceeds tiers.high_threshold ({})",
                t.mid_threshold, t.high_threshold
            )));
        }
        if t.base_stakes.iter().any(|s| !(*s > 0.0)) {
            return Err(ConfigError::Invalid(
                "tiers.base_stakes must all be positive".to_string(),
            ));
        }

        let m = &self.multi_race;
        if m.singleable_edge < m.min_value_edge {
            return Err(ConfigError::Invalid(format!(
                "multi_race.singleable_edge ({}) is below multi_race.min_value_edge ({})",
                m.singleable_edge, m.min_value_edge
            )));
        }

        Ok(())
    }
}
