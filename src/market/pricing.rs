use serde::{Deserialize, Serialize};

use super::entity::EntityId;
use crate::error::SettleError;

/// Clearing price profile used when no prices are supplied.
pub const DEFAULT_CLEARING_PRICES: [f64; 6] = [90.0, 90.0, 90.0, 80.0, 80.0, 90.0];

/// How an agent pays a represented user for its day-ahead response.
///
/// Chosen once per agent–user relationship and constant across hours.
///
/// # Examples
///
/// ```
/// use dr_settlement::market::PricingMode;
///
/// let mode = PricingMode::FloorPlusShare { floor: 400.0, alpha: 0.3 };
/// assert_eq!(mode.unit_price(600.0), 460.0);
/// assert_eq!(mode.unit_price(350.0), 400.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PricingMode {
    /// Guaranteed floor plus a share `alpha` of the clearing price above it.
    FloorPlusShare { floor: f64, alpha: f64 },
    /// Flat price regardless of the clearing price.
    FixedPrice { price: f64 },
}

impl PricingMode {
    /// Unit price paid to the user for an hour cleared at `clearing_price`.
    pub fn unit_price(&self, clearing_price: f64) -> f64 {
        match *self {
            Self::FloorPlusShare { floor, alpha } => {
                if clearing_price <= floor {
                    floor
                } else {
                    floor + (clearing_price - floor) * alpha
                }
            }
            Self::FixedPrice { price } => price,
        }
    }

    /// Checks `alpha` is in `[0, 1]` and prices are non-negative.
    ///
    /// # Errors
    ///
    /// Returns [`SettleError::InvalidRange`] naming the offending field.
    pub fn validate(&self, agent: &EntityId) -> Result<(), SettleError> {
        let out_of_range = |field: &str, value: f64, expected: &'static str| {
            Err(SettleError::InvalidRange {
                agent: agent.clone(),
                field: field.to_string(),
                value,
                expected,
            })
        };
        match *self {
            Self::FloorPlusShare { floor, alpha } => {
                if !(0.0..=1.0).contains(&alpha) {
                    return out_of_range("alpha", alpha, "0..=1");
                }
                if floor.is_nan() || floor < 0.0 {
                    return out_of_range("floor", floor, ">= 0");
                }
                Ok(())
            }
            Self::FixedPrice { price } => {
                if price.is_nan() || price < 0.0 {
                    return out_of_range("price", price, ">= 0");
                }
                Ok(())
            }
        }
    }
}

/// Per-agent revenue and penalty sharing ratios.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AllocationRatios {
    /// Share of each user's capacity revenue paid to the agent.
    pub gamma: f64,
    /// Fraction of the agent pre-assessment charged to its users in aggregate.
    pub theta: f64,
}

impl AllocationRatios {
    /// Builds ratios after checking both lie in `[0, 1]`.
    ///
    /// # Errors
    ///
    /// Returns [`SettleError::InvalidRange`] for the first ratio out of range.
    pub fn new(agent: &EntityId, gamma: f64, theta: f64) -> Result<Self, SettleError> {
        for (field, value) in [("gamma", gamma), ("theta", theta)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(SettleError::InvalidRange {
                    agent: agent.clone(),
                    field: field.to_string(),
                    value,
                    expected: "0..=1",
                });
            }
        }
        Ok(Self { gamma, theta })
    }
}

/// Repeats or truncates `prices` to exactly `horizon` values.
///
/// An empty `prices` falls back to [`DEFAULT_CLEARING_PRICES`].
pub fn tile_prices(prices: &[f64], horizon: usize) -> Vec<f64> {
    let template = if prices.is_empty() {
        &DEFAULT_CLEARING_PRICES[..]
    } else {
        prices
    };
    template.iter().copied().cycle().take(horizon).collect()
}
