//! Day-ahead response settlement.
//!
//! Direct users are paid the clearing price on their effective response and
//! penalised hour by hour for delivering less than 90% of their bid.
//!
//! Represented users are paid by their agent under their [`PricingMode`]; the
//! agent is paid the clearing price on the summed effective response of its
//! users. Assessment for the agent side runs in two stages: a pre-assessment
//! per participant and day, then a proration of the agent's pre-assessment
//! onto its users (scaled by θ) with the agent keeping the residual.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::effective::{self, NegativeResponsePolicy};
use crate::market::{PricingMode, SettlementDay};

/// Assessment unit price as a multiple of the clearing price.
pub const ASSESSMENT_PRICE_FACTOR: f64 = 1.1;

/// Share of the bid that must be delivered to avoid assessment.
pub const ASSESSMENT_BID_RATIO: f64 = 0.9;

/// How represented-user and agent pre-assessments net shortfall within a day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentNetting {
    /// Shortfall is netted over the day's totals and priced at the
    /// bid-weighted mean assessment price.
    #[default]
    Daily,
    /// Shortfall is assessed per hour and summed.
    Hourly,
}

/// Quantities of one day-ahead response hour.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResponseHour {
    pub hour: u8,
    pub bid_kw: f64,
    pub effective_kw: f64,
    pub clearing_price: f64,
}

impl ResponseHour {
    pub fn assessment_price(&self) -> f64 {
        self.clearing_price * ASSESSMENT_PRICE_FACTOR
    }

    /// Fee at the market clearing price.
    pub fn market_fee(&self) -> f64 {
        self.effective_kw * self.clearing_price
    }

    /// Hourly shortfall against 90% of bid, priced at the assessment price.
    pub fn shortfall_fee(&self) -> f64 {
        (self.bid_kw * ASSESSMENT_BID_RATIO - self.effective_kw).max(0.0) * self.assessment_price()
    }
}

/// Extracts the day's response hours with their effective capacity.
pub fn response_hours(day: &SettlementDay, policy: NegativeResponsePolicy) -> Vec<ResponseHour> {
    day.response_hours()
        .map(|r| ResponseHour {
            hour: r.hour,
            bid_kw: r.bid_kw,
            effective_kw: effective::for_record(r, policy).effective_kw,
            clearing_price: r.clearing_price,
        })
        .collect()
}

/// Day-ahead figures of a direct user.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DirectResponse {
    pub response_fee: f64,
    pub assessment_fee: f64,
}

impl DirectResponse {
    pub fn net(&self) -> f64 {
        self.response_fee - self.assessment_fee
    }
}

/// Settles a direct user's response hours.
///
/// # Examples
///
/// ```
/// use dr_settlement::settle::day_ahead::{settle_direct, ResponseHour};
///
/// let hour = ResponseHour { hour: 10, bid_kw: 100.0, effective_kw: 80.0, clearing_price: 500.0 };
/// let r = settle_direct(&[hour]);
/// assert!((r.response_fee - 40_000.0).abs() < 1e-6);
/// assert!((r.assessment_fee - 5_500.0).abs() < 1e-6);
/// assert!((r.net() - 34_500.0).abs() < 1e-6);
/// ```
pub fn settle_direct(hours: &[ResponseHour]) -> DirectResponse {
    DirectResponse {
        response_fee: hours.iter().map(ResponseHour::market_fee).sum(),
        assessment_fee: hours.iter().map(ResponseHour::shortfall_fee).sum(),
    }
}

/// Pre-assessment fee of one participant over one day.
pub fn pre_assessment(hours: &[ResponseHour], netting: AssessmentNetting) -> f64 {
    if hours.is_empty() {
        return 0.0;
    }
    match netting {
        AssessmentNetting::Hourly => hours.iter().map(ResponseHour::shortfall_fee).sum(),
        AssessmentNetting::Daily => {
            let bid: f64 = hours.iter().map(|h| h.bid_kw).sum();
            let effective: f64 = hours.iter().map(|h| h.effective_kw).sum();
            let shortfall = (bid * ASSESSMENT_BID_RATIO - effective).max(0.0);
            if shortfall == 0.0 {
                return 0.0;
            }
            let price = if bid > 0.0 {
                hours
                    .iter()
                    .map(|h| h.bid_kw * h.assessment_price())
                    .sum::<f64>()
                    / bid
            } else {
                hours.iter().map(ResponseHour::assessment_price).sum::<f64>() / hours.len() as f64
            };
            shortfall * price
        }
    }
}

/// Day-ahead figures of a represented user for one day.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UserResponse {
    /// Paid by the agent under the user's pricing mode.
    pub response_fee: f64,
    pub pre_assessment: f64,
    /// Prorated share of the agent pre-assessment; zero until prorated.
    pub final_assessment: f64,
}

impl UserResponse {
    pub fn net(&self) -> f64 {
        self.response_fee - self.final_assessment
    }
}

/// Computes a represented user's fee and pre-assessment for one day.
pub fn settle_user_day(
    hours: &[ResponseHour],
    mode: PricingMode,
    netting: AssessmentNetting,
) -> UserResponse {
    UserResponse {
        response_fee: hours
            .iter()
            .map(|h| h.effective_kw * mode.unit_price(h.clearing_price))
            .sum(),
        pre_assessment: pre_assessment(hours, netting),
        final_assessment: 0.0,
    }
}

/// Builds the agent's response hours from its users' hours.
///
/// Effective capacity is always the sum over users. Bid and clearing price
/// come from the agent's own metered hour when present, otherwise the bid is
/// the users' sum and the price is taken from the first user reporting it.
/// A metered hour no user reports still carries its bid, with zero effective
/// capacity.
pub fn aggregate_agent_hours(
    users: &[&[ResponseHour]],
    metered: &[ResponseHour],
) -> Vec<ResponseHour> {
    let mut hours: BTreeMap<u8, ResponseHour> = BTreeMap::new();
    for user in users {
        for h in *user {
            hours
                .entry(h.hour)
                .and_modify(|agg| {
                    agg.bid_kw += h.bid_kw;
                    agg.effective_kw += h.effective_kw;
                })
                .or_insert(*h);
        }
    }
    for m in metered {
        hours
            .entry(m.hour)
            .and_modify(|agg| {
                agg.bid_kw = m.bid_kw;
                agg.clearing_price = m.clearing_price;
            })
            .or_insert(ResponseHour {
                effective_kw: 0.0,
                ..*m
            });
    }
    hours.into_values().collect()
}

/// Result of prorating an agent's pre-assessment onto its users.
#[derive(Debug, Clone, PartialEq)]
pub struct Proration {
    pub agent_final: f64,
    pub user_final: Vec<f64>,
}

impl Proration {
    /// Total charged across the agent and its users.
    pub fn charged(&self) -> f64 {
        self.agent_final + self.user_final.iter().sum::<f64>()
    }
}

/// Splits the agent pre-assessment between users (scaled by `theta`) and the
/// agent.
///
/// Each user is charged `agent_pre * user_pre * theta / Σ user_pre`, or zero
/// when no user has a pre-assessment. The agent keeps
/// `agent_pre - Σ user_pre`, which need not balance with the users' charges.
///
/// # Examples
///
/// ```
/// use dr_settlement::settle::day_ahead::prorate;
///
/// let p = prorate(10_000.0, &[2_000.0, 6_000.0], 0.5);
/// assert!((p.user_final[0] - 1_250.0).abs() < 1e-9);
/// assert!((p.agent_final - 2_000.0).abs() < 1e-9);
/// ```
pub fn prorate(agent_pre: f64, user_pre: &[f64], theta: f64) -> Proration {
    let related: f64 = user_pre.iter().sum();
    let user_final = user_pre
        .iter()
        .map(|&pre| {
            if related == 0.0 {
                0.0
            } else {
                agent_pre * pre * theta / related
            }
        })
        .collect();
    Proration {
        agent_final: agent_pre - related,
        user_final,
    }
}

/// Day-ahead figures of an agent for one day, including its users' final
/// figures.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentResponse {
    /// Collected from the market at the clearing price.
    pub market_fee: f64,
    /// Paid out to users under their pricing modes.
    pub user_payout: f64,
    pub pre_assessment: f64,
    pub final_assessment: f64,
    /// Users in input order with `final_assessment` filled in.
    pub users: Vec<UserResponse>,
}

impl AgentResponse {
    pub fn net(&self) -> f64 {
        self.market_fee - self.user_payout - self.final_assessment
    }

    /// `charged - pre_assessment`; zero when the proration balances.
    pub fn imbalance(&self) -> f64 {
        self.final_assessment + self.users.iter().map(|u| u.final_assessment).sum::<f64>()
            - self.pre_assessment
    }
}

/// Settles the agent side of one day once every user's figures are known.
pub fn settle_agent_day(
    agent_hours: &[ResponseHour],
    mut users: Vec<UserResponse>,
    theta: f64,
    netting: AssessmentNetting,
) -> AgentResponse {
    let market_fee = agent_hours.iter().map(ResponseHour::market_fee).sum();
    let user_payout = users.iter().map(|u| u.response_fee).sum();
    let pre = pre_assessment(agent_hours, netting);

    let user_pre: Vec<f64> = users.iter().map(|u| u.pre_assessment).collect();
    let proration = prorate(pre, &user_pre, theta);
    for (user, fee) in users.iter_mut().zip(&proration.user_final) {
        user.final_assessment = *fee;
    }

    AgentResponse {
        market_fee,
        user_payout,
        pre_assessment: pre,
        final_assessment: proration.agent_final,
        users,
    }
}
