//! Seeded synthetic hour records for demonstration scenarios.
//!
//! Event days and clearing prices are market-wide and drawn once from the
//! master seed. Every user then gets its own stream offset from that seed, so
//! adding a user never perturbs the others.

use chrono::{Days, NaiveDate};
use rand::{Rng, SeedableRng, rngs::StdRng};
use rayon::prelude::*;

use crate::config::SyntheticConfig;
use crate::market::pricing::tile_prices;
use crate::market::record::HOURS_PER_DAY;
use crate::market::{EntityId, HourRecord, Registry, Role};

/// Market-wide conditions of one synthetic day.
#[derive(Debug, Clone, PartialEq)]
struct DayEvents {
    date: NaiveDate,
    day_ahead: bool,
    emergency: bool,
}

/// Standard normal sample via Box-Muller.
fn gaussian(rng: &mut StdRng) -> f64 {
    let u1: f64 = rng.random::<f64>().clamp(1e-12, 1.0);
    let u2: f64 = rng.random::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

fn calendar(cfg: &SyntheticConfig) -> Vec<DayEvents> {
    let mut rng = StdRng::seed_from_u64(cfg.seed);
    (0..u64::from(cfg.days))
        .map_while(|d| cfg.start_date.checked_add_days(Days::new(d)))
        .map(|date| DayEvents {
            date,
            day_ahead: rng.random::<f64>() < cfg.day_ahead_probability,
            emergency: rng.random::<f64>() < cfg.emergency_probability,
        })
        .collect()
}

/// Generates hour records for every user in `registry`.
///
/// Agents get no metered records; their figures are derived from their users.
/// The output is identical for identical inputs.
pub fn synthesize(cfg: &SyntheticConfig, registry: &Registry) -> Vec<HourRecord> {
    let days = calendar(cfg);
    let prices = tile_prices(&cfg.clearing_prices, days.len() * usize::from(HOURS_PER_DAY));

    let users: Vec<(usize, EntityId)> = registry
        .entities()
        .filter(|(_, e)| !matches!(e.role, Role::Agent { .. }))
        .enumerate()
        .map(|(n, (_, e))| (n, e.id.clone()))
        .collect();

    users
        .into_par_iter()
        .flat_map_iter(|(n, id)| {
            let seed = cfg.seed.wrapping_add(1_000 * (n as u64 + 1));
            user_records(cfg, &days, &prices, id, seed)
        })
        .collect()
}

fn user_records(
    cfg: &SyntheticConfig,
    days: &[DayEvents],
    prices: &[f64],
    id: EntityId,
    seed: u64,
) -> Vec<HourRecord> {
    let mut rng = StdRng::seed_from_u64(seed);
    let scale = 0.6 + 0.8 * rng.random::<f64>();
    let mut records = Vec::with_capacity(days.len() * usize::from(HOURS_PER_DAY));

    for (d, day) in days.iter().enumerate() {
        for hour in 0..HOURS_PER_DAY {
            let angle = 2.0 * std::f64::consts::PI * f64::from(hour) / f64::from(HOURS_PER_DAY);
            let noise = if cfg.noise_std > 0.0 {
                gaussian(&mut rng) * cfg.noise_std
            } else {
                0.0
            };
            let baseline_kw = (scale * (cfg.base_kw - cfg.amp_kw * angle.cos()) + noise).max(0.0);

            let day_ahead_active = day.day_ahead && cfg.day_ahead_hours.contains(&hour);
            let emergency = day.emergency && cfg.emergency_hours.contains(&hour);
            let called = day_ahead_active || emergency;
            let bid_kw = if called { scale * cfg.bid_kw } else { 0.0 };

            let response_kw = if called {
                let share = cfg.delivery_ratio + cfg.delivery_std * gaussian(&mut rng);
                bid_kw * share
            } else {
                0.0
            };

            records.push(HourRecord {
                entity_id: id.clone(),
                date: day.date,
                hour,
                baseline_kw,
                output_kw: baseline_kw - response_kw,
                bid_kw,
                capacity_kw: scale * cfg.capacity_kw,
                clearing_price: prices[d * usize::from(HOURS_PER_DAY) + usize::from(hour)],
                capacity_price: cfg.capacity_price,
                day_ahead_active,
                emergency,
            });
        }
    }
    records
}
