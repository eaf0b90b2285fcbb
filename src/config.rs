//! TOML-based scenario configuration and preset definitions.

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::SettleError;
use crate::market::pricing::DEFAULT_CLEARING_PRICES;
use crate::market::{EntityId, PricingMode, Registry};
use crate::settle::{EngineConfig, NegativeResponsePolicy};
use crate::settle::day_ahead::AssessmentNetting;

/// Top-level scenario configuration parsed from TOML.
///
/// A scenario names the participants of a settlement run and where their hour
/// records come from. Without `[input] records` the records are synthesized
/// from the `[synthetic]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Run-wide settlement policies.
    #[serde(default)]
    pub engine: EngineConfig,
    /// Record and regional-bid input files.
    #[serde(default)]
    pub input: InputConfig,
    /// Seeded synthetic telemetry used when no records file is given.
    #[serde(default)]
    pub synthetic: SyntheticConfig,
    /// Users settling directly with the market.
    #[serde(default)]
    pub direct: Vec<DirectUserConfig>,
    /// Agents with their represented users.
    #[serde(default)]
    pub agents: Vec<AgentConfig>,
}

/// Input file locations. Relative paths resolve against the scenario file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InputConfig {
    /// Hour records CSV.
    pub records: Option<PathBuf>,
    /// Regional mean day-ahead bids CSV.
    pub region_bids: Option<PathBuf>,
}

/// Synthetic telemetry parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyntheticConfig {
    /// Master random seed.
    pub seed: u64,
    /// First settlement date (`"YYYY-MM-DD"`).
    pub start_date: NaiveDate,
    /// Number of days to generate (must be > 0).
    pub days: u32,
    /// Clearing price profile, tiled across every hour of the period.
    pub clearing_prices: Vec<f64>,
    /// Capacity price per kW and hour.
    pub capacity_price: f64,
    /// Mean baseline consumption (kW).
    pub base_kw: f64,
    /// Sinusoidal daily amplitude of the baseline (kW).
    pub amp_kw: f64,
    /// Gaussian noise on the baseline (kW).
    pub noise_std: f64,
    /// Day-ahead bid per user (kW).
    pub bid_kw: f64,
    /// Contracted standby capacity per user (kW).
    pub capacity_kw: f64,
    /// Mean delivered response as a share of the bid.
    pub delivery_ratio: f64,
    /// Standard deviation of the delivered share.
    pub delivery_std: f64,
    /// Hours of the day that may carry day-ahead response.
    pub day_ahead_hours: Vec<u8>,
    /// Hours of the day that may carry an emergency call.
    pub emergency_hours: Vec<u8>,
    /// Probability a day has day-ahead response.
    pub day_ahead_probability: f64,
    /// Probability a day has an emergency call.
    pub emergency_probability: f64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            start_date: NaiveDate::from_ymd_opt(2024, 7, 1).unwrap_or_default(),
            days: 30,
            clearing_prices: DEFAULT_CLEARING_PRICES.to_vec(),
            capacity_price: 0.5,
            base_kw: 400.0,
            amp_kw: 120.0,
            noise_std: 10.0,
            bid_kw: 100.0,
            capacity_kw: 120.0,
            delivery_ratio: 0.95,
            delivery_std: 0.15,
            day_ahead_hours: vec![10, 11, 12, 13, 14, 15],
            emergency_hours: vec![18, 19],
            day_ahead_probability: 0.4,
            emergency_probability: 0.1,
        }
    }
}

/// A user settling directly with the market.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DirectUserConfig {
    pub id: String,
}

/// An agent and its relationship terms.
///
/// Missing or out-of-range terms do not fail validation; the engine rejects
/// the agent alone when it settles.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    pub id: String,
    /// Share of user capacity revenue paid to the agent.
    #[serde(default)]
    pub gamma: Option<f64>,
    /// Share of agent pre-assessment prorated onto users.
    #[serde(default)]
    pub theta: Option<f64>,
    #[serde(default)]
    pub users: Vec<RepresentedUserConfig>,
}

/// A user represented by an agent.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RepresentedUserConfig {
    pub id: String,
    #[serde(default)]
    pub pricing: Option<PricingMode>,
}

/// Configuration error with field path and constraint description.
#[derive(Debug)]
pub struct ConfigError {
    /// Dotted field path (e.g., `"synthetic.days"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "config error: {} — {}", self.field, self.message)
    }
}

impl ScenarioConfig {
    /// Returns the demo scenario: two direct users and two agents over a
    /// synthetic month.
    pub fn demo() -> Self {
        Self {
            engine: EngineConfig::default(),
            input: InputConfig::default(),
            synthetic: SyntheticConfig::default(),
            direct: vec![
                DirectUserConfig { id: "D1".into() },
                DirectUserConfig { id: "D2".into() },
            ],
            agents: vec![
                AgentConfig {
                    id: "A1".into(),
                    gamma: Some(0.2),
                    theta: Some(0.5),
                    users: vec![
                        RepresentedUserConfig {
                            id: "U1".into(),
                            pricing: Some(PricingMode::FloorPlusShare {
                                floor: 60.0,
                                alpha: 0.3,
                            }),
                        },
                        RepresentedUserConfig {
                            id: "U2".into(),
                            pricing: Some(PricingMode::FixedPrice { price: 75.0 }),
                        },
                    ],
                },
                AgentConfig {
                    id: "A2".into(),
                    gamma: Some(0.1),
                    theta: Some(0.8),
                    users: vec![RepresentedUserConfig {
                        id: "U3".into(),
                        pricing: Some(PricingMode::FixedPrice { price: 80.0 }),
                    }],
                },
            ],
        }
    }

    /// Returns the demo scenario with per-hour assessment netting.
    pub fn hourly_netting() -> Self {
        Self {
            engine: EngineConfig {
                assessment_netting: AssessmentNetting::Hourly,
                ..EngineConfig::default()
            },
            ..Self::demo()
        }
    }

    /// Returns the stress preset: frequent events with erratic delivery.
    /// Negative responses are kept as reported.
    pub fn stress() -> Self {
        Self {
            engine: EngineConfig {
                negative_response: NegativeResponsePolicy::Keep,
                ..EngineConfig::default()
            },
            synthetic: SyntheticConfig {
                delivery_ratio: 0.8,
                delivery_std: 0.5,
                day_ahead_probability: 0.8,
                emergency_probability: 0.4,
                ..SyntheticConfig::default()
            },
            ..Self::demo()
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["demo", "hourly_netting", "stress"];

    /// Loads a scenario from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "demo" => Ok(Self::demo()),
            "hourly_netting" => Ok(Self::hourly_netting()),
            "stress" => Ok(Self::stress()),
            _ => Err(ConfigError {
                field: "preset".to_string(),
                message: format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            }),
        }
    }

    /// Parses a scenario from a TOML file, resolving input paths against the
    /// file's directory.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError {
            field: "scenario".to_string(),
            message: format!("cannot read \"{}\": {e}", path.display()),
        })?;
        let mut cfg = Self::from_toml_str(&content)?;
        if let Some(dir) = path.parent() {
            cfg.input.resolve_relative_to(dir);
        }
        Ok(cfg)
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError {
            field: "toml".to_string(),
            message: e.to_string(),
        })
    }

    /// Builds the entity registry from the participant sections.
    ///
    /// # Errors
    ///
    /// Returns [`SettleError::DuplicateEntity`] if an id appears twice.
    pub fn registry(&self) -> Result<Registry, SettleError> {
        let mut registry = Registry::new();
        for d in &self.direct {
            registry.add_direct(EntityId::from(d.id.as_str()))?;
        }
        for a in &self.agents {
            let agent = registry.add_agent(EntityId::from(a.id.as_str()), a.gamma, a.theta)?;
            for u in &a.users {
                registry.add_represented(agent, EntityId::from(u.id.as_str()), u.pricing)?;
            }
        }
        Ok(registry)
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        let e = &self.engine;
        if e.conservation_tolerance_kw.is_nan() || e.conservation_tolerance_kw < 0.0 {
            errors.push(ConfigError {
                field: "engine.conservation_tolerance_kw".into(),
                message: "must be >= 0".into(),
            });
        }
        if e.reconciliation_tolerance.is_nan() || e.reconciliation_tolerance < 0.0 {
            errors.push(ConfigError {
                field: "engine.reconciliation_tolerance".into(),
                message: "must be >= 0".into(),
            });
        }

        if self.direct.is_empty() && self.agents.is_empty() {
            errors.push(ConfigError {
                field: "direct".into(),
                message: "at least one direct user or agent is required".into(),
            });
        }
        let mut seen = HashSet::new();
        let ids = self
            .direct
            .iter()
            .map(|d| ("direct.id", &d.id))
            .chain(self.agents.iter().flat_map(|a| {
                std::iter::once(("agents.id", &a.id))
                    .chain(a.users.iter().map(|u| ("agents.users.id", &u.id)))
            }));
        for (field, id) in ids {
            if id.trim().is_empty() {
                errors.push(ConfigError {
                    field: field.into(),
                    message: "must not be empty".into(),
                });
            } else if !seen.insert(id.as_str()) {
                errors.push(ConfigError {
                    field: field.into(),
                    message: format!("duplicate entity id \"{id}\""),
                });
            }
        }

        if self.input.records.is_none() {
            errors.extend(self.synthetic.validate());
        }

        errors
    }
}

impl InputConfig {
    fn resolve_relative_to(&mut self, dir: &Path) {
        for path in [&mut self.records, &mut self.region_bids].into_iter().flatten() {
            if path.is_relative() {
                *path = dir.join(&*path);
            }
        }
    }
}

impl SyntheticConfig {
    fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let mut push = |field: &str, message: String| {
            errors.push(ConfigError {
                field: format!("synthetic.{field}"),
                message,
            });
        };

        if self.days == 0 {
            push("days", "must be > 0".into());
        }
        if self.clearing_prices.iter().any(|p| *p < 0.0) {
            push("clearing_prices", "must be >= 0".into());
        }
        for (field, value) in [
            ("capacity_price", self.capacity_price),
            ("base_kw", self.base_kw),
            ("noise_std", self.noise_std),
            ("bid_kw", self.bid_kw),
            ("capacity_kw", self.capacity_kw),
            ("delivery_std", self.delivery_std),
        ] {
            if value.is_nan() || value < 0.0 {
                push(field, "must be >= 0".into());
            }
        }
        for (field, value) in [
            ("day_ahead_probability", self.day_ahead_probability),
            ("emergency_probability", self.emergency_probability),
        ] {
            if !(0.0..=1.0).contains(&value) {
                push(field, "must be in [0.0, 1.0]".into());
            }
        }
        for (field, hours) in [
            ("day_ahead_hours", &self.day_ahead_hours),
            ("emergency_hours", &self.emergency_hours),
        ] {
            if let Some(h) = hours.iter().find(|h| **h >= 24) {
                push(field, format!("hour {h} outside 0..24"));
            }
        }

        errors
    }
}
