//! Settlement engine over a registry and its hour records.
//!
//! Direct users and agents settle independently and in parallel. Inside an
//! agent, every represented user is drafted in parallel first; proration then
//! runs per day once all user drafts for that agent exist.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use log::{debug, info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::aggregate::{DayFigures, EntitySettlement};
use super::day_ahead::{self, AssessmentNetting, ResponseHour, UserResponse};
use super::effective::{self, NegativeResponsePolicy};
use super::{emergency, reserve};
use crate::error::{SettleError, Warning};
use crate::market::{
    AgentBook, EntityId, EntityIdx, PricingMode, RecordSet, RegionProfile, Registry, RoleKind,
    SettlementDay,
};

/// Policies applied uniformly across a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub negative_response: NegativeResponsePolicy,
    pub assessment_netting: AssessmentNetting,
    /// Allowed gap between agent-metered and summed user effective capacity (kW).
    pub conservation_tolerance_kw: f64,
    /// Allowed gap between charged and pre-assessed agent fees.
    pub reconciliation_tolerance: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            negative_response: NegativeResponsePolicy::Clip,
            assessment_netting: AssessmentNetting::Daily,
            conservation_tolerance_kw: 1e-6,
            reconciliation_tolerance: 0.01,
        }
    }
}

/// Output of one settlement run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettlementRun {
    /// Settled entities keyed by id.
    pub entities: BTreeMap<EntityId, EntitySettlement>,
    pub warnings: Vec<Warning>,
    /// Agents rejected for configuration errors; their users are not settled.
    pub rejected: BTreeMap<EntityId, SettleError>,
}

impl SettlementRun {
    pub fn get(&self, id: &EntityId) -> Option<&EntitySettlement> {
        self.entities.get(id)
    }

    /// Every `(entity, day)` pair in entity then date order.
    pub fn daily_rows(&self) -> impl Iterator<Item = (&EntitySettlement, &DayFigures)> {
        self.entities
            .values()
            .flat_map(|e| e.days.iter().map(move |d| (e, d)))
    }
}

/// One represented user's figures for one day, before proration.
struct UserDayDraft {
    hours: Vec<ResponseHour>,
    effective_by_hour: BTreeMap<u8, f64>,
    response: UserResponse,
    figures: DayFigures,
}

struct UserDraft {
    idx: EntityIdx,
    days: BTreeMap<NaiveDate, UserDayDraft>,
}

struct AgentDay {
    agent: DayFigures,
    users: Vec<(usize, DayFigures)>,
    warnings: Vec<Warning>,
}

struct AgentOutcome {
    agent: EntitySettlement,
    users: Vec<EntitySettlement>,
    warnings: Vec<Warning>,
}

/// Stateless settlement engine borrowing its inputs.
pub struct Engine<'a> {
    config: EngineConfig,
    registry: &'a Registry,
    records: &'a RecordSet,
    region: RegionProfile,
}

impl<'a> Engine<'a> {
    /// Creates an engine. Hours missing from `region` are filled with the mean
    /// bid of the run's own day-ahead participants.
    pub fn new(
        config: EngineConfig,
        registry: &'a Registry,
        records: &'a RecordSet,
        region: RegionProfile,
    ) -> Self {
        let mut region = region;
        region.fill_missing_from(&participant_profile(registry, records));
        Self {
            config,
            registry,
            records,
            region,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Regional profile in effect, after filling.
    pub fn region(&self) -> &RegionProfile {
        &self.region
    }

    /// Settles every registered entity.
    pub fn run(&self) -> SettlementRun {
        let direct: Vec<EntityIdx> = self.registry.direct_users().map(|(idx, _)| idx).collect();
        let books = self.registry.books();
        info!(
            "settling {} direct users and {} agents over {} hour records",
            direct.len(),
            books.len(),
            self.records.record_count()
        );

        let direct_settlements: Vec<EntitySettlement> = direct
            .par_iter()
            .map(|&idx| self.settle_direct(idx))
            .collect();

        let agent_outcomes: Vec<(EntityId, Result<AgentOutcome, SettleError>)> = books
            .par_iter()
            .map(|book| {
                let id = self.registry.entity(book.agent).id.clone();
                (id, self.settle_agent(book))
            })
            .collect();

        let mut run = SettlementRun::default();
        for settlement in direct_settlements {
            run.entities.insert(settlement.id.clone(), settlement);
        }
        for (id, outcome) in agent_outcomes {
            match outcome {
                Ok(outcome) => {
                    run.entities.insert(id, outcome.agent);
                    for user in outcome.users {
                        run.entities.insert(user.id.clone(), user);
                    }
                    run.warnings.extend(outcome.warnings);
                }
                Err(err) => {
                    warn!("rejecting agent {id}: {err}");
                    run.rejected.insert(id, err);
                }
            }
        }

        for w in &run.warnings {
            warn!("{w}");
        }
        info!(
            "settlement complete: {} entities, {} warnings, {} rejected agents",
            run.entities.len(),
            run.warnings.len(),
            run.rejected.len()
        );
        run
    }

    fn days_of(&self, id: &EntityId) -> &'a [SettlementDay] {
        self.records
            .period(id)
            .map_or(&[][..], |p| p.days.as_slice())
    }

    fn settle_direct(&self, idx: EntityIdx) -> EntitySettlement {
        let entity = self.registry.entity(idx);
        let days = self
            .days_of(&entity.id)
            .par_iter()
            .map(|day| self.direct_day(day))
            .collect();
        EntitySettlement::from_days(entity.id.clone(), RoleKind::Direct, None, days)
    }

    fn direct_day(&self, day: &SettlementDay) -> DayFigures {
        let policy = self.config.negative_response;
        let hours = day_ahead::response_hours(day, policy);
        let response = day_ahead::settle_direct(&hours);
        let capacity = reserve::day_revenue(day, &self.region);
        DayFigures {
            capacity_gross: capacity,
            capacity_revenue: capacity,
            response_fee: response.response_fee,
            assess_pre: response.assessment_fee,
            assess_final: response.assessment_fee,
            emergency_revenue: emergency::day_revenue(day, policy),
            excess_kw: day_excess_kw(day, policy),
            ..DayFigures::empty(day.date)
        }
    }

    fn draft_user(&self, idx: EntityIdx, mode: PricingMode) -> UserDraft {
        let policy = self.config.negative_response;
        let days = self
            .days_of(&self.registry.entity(idx).id)
            .iter()
            .map(|day| {
                let hours = day_ahead::response_hours(day, policy);
                let response =
                    day_ahead::settle_user_day(&hours, mode, self.config.assessment_netting);
                let effective_by_hour = day
                    .hours
                    .iter()
                    .map(|r| (r.hour, effective::for_record(r, policy).effective_kw))
                    .collect();
                let figures = DayFigures {
                    capacity_gross: reserve::day_revenue(day, &self.region),
                    response_fee: response.response_fee,
                    assess_pre: response.pre_assessment,
                    emergency_revenue: emergency::day_revenue(day, policy),
                    excess_kw: day_excess_kw(day, policy),
                    ..DayFigures::empty(day.date)
                };
                let draft = UserDayDraft {
                    hours,
                    effective_by_hour,
                    response,
                    figures,
                };
                (day.date, draft)
            })
            .collect();
        UserDraft { idx, days }
    }

    fn settle_agent(&self, book: &AgentBook) -> Result<AgentOutcome, SettleError> {
        let terms = book.terms(self.registry)?;
        let agent = self.registry.entity(book.agent);
        debug!(
            "agent {}: {} users, gamma={}, theta={}",
            agent.id,
            book.users.len(),
            terms.ratios.gamma,
            terms.ratios.theta
        );

        let drafts: Vec<UserDraft> = book
            .users
            .par_iter()
            .zip(&terms.pricing)
            .map(|(&(idx, _), &mode)| self.draft_user(idx, mode))
            .collect();

        // Every user draft exists from here on; proration may run.
        let metered_days = self.days_of(&agent.id);
        let dates: BTreeSet<NaiveDate> = drafts
            .iter()
            .flat_map(|d| d.days.keys().copied())
            .chain(metered_days.iter().map(|d| d.date))
            .collect();

        let agent_days: Vec<AgentDay> = dates
            .into_par_iter()
            .map(|date| {
                let metered = metered_days
                    .binary_search_by_key(&date, |d| d.date)
                    .ok()
                    .map(|i| &metered_days[i]);
                self.agent_day(
                    &agent.id,
                    date,
                    &drafts,
                    metered,
                    terms.ratios.gamma,
                    terms.ratios.theta,
                )
            })
            .collect();

        let mut agent_figures = Vec::with_capacity(agent_days.len());
        let mut user_figures: Vec<Vec<DayFigures>> = vec![Vec::new(); drafts.len()];
        let mut warnings = Vec::new();
        for day in agent_days {
            agent_figures.push(day.agent);
            for (pos, figures) in day.users {
                user_figures[pos].push(figures);
            }
            warnings.extend(day.warnings);
        }

        let users = drafts
            .iter()
            .zip(user_figures)
            .map(|(draft, days)| {
                EntitySettlement::from_days(
                    self.registry.entity(draft.idx).id.clone(),
                    RoleKind::Represented,
                    Some(agent.id.clone()),
                    days,
                )
            })
            .collect();

        Ok(AgentOutcome {
            agent: EntitySettlement::from_days(
                agent.id.clone(),
                RoleKind::Agent,
                None,
                agent_figures,
            ),
            users,
            warnings,
        })
    }

    fn agent_day(
        &self,
        agent: &EntityId,
        date: NaiveDate,
        drafts: &[UserDraft],
        metered: Option<&SettlementDay>,
        gamma: f64,
        theta: f64,
    ) -> AgentDay {
        let policy = self.config.negative_response;
        let day_drafts: Vec<Option<&UserDayDraft>> =
            drafts.iter().map(|d| d.days.get(&date)).collect();
        let mut warnings = Vec::new();

        if let Some(metered) = metered {
            for record in &metered.hours {
                let agent_kw = effective::for_record(record, policy).effective_kw;
                let users_kw: f64 = day_drafts
                    .iter()
                    .flatten()
                    .filter_map(|d| d.effective_by_hour.get(&record.hour))
                    .sum();
                if (agent_kw - users_kw).abs() > self.config.conservation_tolerance_kw {
                    warnings.push(Warning::InconsistentAggregate {
                        agent: agent.clone(),
                        date,
                        hour: record.hour,
                        users_kw,
                        agent_kw,
                    });
                }
            }
        }

        let user_hours: Vec<&[ResponseHour]> = day_drafts
            .iter()
            .map(|d| d.map_or(&[][..], |d| d.hours.as_slice()))
            .collect();
        let metered_hours = metered
            .map(|m| day_ahead::response_hours(m, policy))
            .unwrap_or_default();
        let agent_hours = day_ahead::aggregate_agent_hours(&user_hours, &metered_hours);

        let user_responses = day_drafts
            .iter()
            .map(|d| d.map(|d| d.response).unwrap_or_default())
            .collect();
        let response = day_ahead::settle_agent_day(
            &agent_hours,
            user_responses,
            theta,
            self.config.assessment_netting,
        );
        debug!(
            "agent {agent} {date}: pre={:.2} final={:.2} users={:?}",
            response.pre_assessment,
            response.final_assessment,
            response
                .users
                .iter()
                .map(|u| u.final_assessment)
                .collect::<Vec<_>>()
        );

        let imbalance = response.imbalance();
        if imbalance.abs() > self.config.reconciliation_tolerance {
            warnings.push(Warning::AssessmentImbalance {
                agent: agent.clone(),
                date,
                pre_assessment: response.pre_assessment,
                charged: response.pre_assessment + imbalance,
            });
        }

        let mut capacity_gross = 0.0;
        let mut capacity_to_agent = 0.0;
        let mut users = Vec::new();
        for (pos, (draft, final_response)) in day_drafts.iter().zip(&response.users).enumerate() {
            let Some(draft) = draft else { continue };
            let split = reserve::split(draft.figures.capacity_gross, gamma);
            capacity_gross += split.gross;
            capacity_to_agent += split.agent;
            users.push((
                pos,
                DayFigures {
                    capacity_revenue: split.user,
                    assess_final: final_response.final_assessment,
                    ..draft.figures.clone()
                },
            ));
        }

        AgentDay {
            agent: DayFigures {
                capacity_gross,
                capacity_revenue: capacity_to_agent,
                response_fee: response.market_fee,
                user_payout: response.user_payout,
                assess_pre: response.pre_assessment,
                assess_final: response.final_assessment,
                ..DayFigures::empty(date)
            },
            users,
            warnings,
        }
    }
}

/// Over-110% response summed over the day's response and emergency hours.
fn day_excess_kw(day: &SettlementDay, policy: NegativeResponsePolicy) -> f64 {
    day.hours
        .iter()
        .filter(|r| r.day_ahead_active || r.emergency)
        .map(|r| effective::for_record(r, policy).excess_kw)
        .sum()
}

/// Mean positive bid per hour over direct users and agents.
///
/// An agent bids its metered bid where it has one, otherwise the sum of its
/// users' bids.
fn participant_profile(registry: &Registry, records: &RecordSet) -> RegionProfile {
    let mut bids: Vec<(NaiveDate, u8, f64)> = Vec::new();

    for (_, entity) in registry.direct_users() {
        if let Some(period) = records.period(&entity.id) {
            for day in &period.days {
                bids.extend(day.response_hours().map(|r| (r.date, r.hour, r.bid_kw)));
            }
        }
    }

    for book in registry.books() {
        let mut agent_bids: BTreeMap<(NaiveDate, u8), f64> = BTreeMap::new();
        for (user, _) in &book.users {
            if let Some(period) = records.period(&registry.entity(*user).id) {
                for r in period.days.iter().flat_map(SettlementDay::response_hours) {
                    *agent_bids.entry((r.date, r.hour)).or_default() += r.bid_kw;
                }
            }
        }
        if let Some(period) = records.period(&registry.entity(book.agent).id) {
            for r in period.days.iter().flat_map(SettlementDay::response_hours) {
                agent_bids.insert((r.date, r.hour), r.bid_kw);
            }
        }
        bids.extend(agent_bids.into_iter().map(|((d, h), b)| (d, h, b)));
    }

    RegionProfile::from_participant_bids(bids)
}
