//! Error and warning types shared across the settlement pipeline.

use std::fmt;
use std::path::PathBuf;

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

use crate::market::entity::EntityId;

/// Fatal settlement errors. An agent-scoped error rejects that agent and its
/// represented users; the rest of the run still settles.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SettleError {
    #[error("missing configuration for agent {agent}: {what}")]
    MissingConfiguration { agent: EntityId, what: String },

    #[error("{field} = {value} for agent {agent} is out of range (expected {expected})")]
    InvalidRange {
        agent: EntityId,
        field: String,
        value: f64,
        expected: &'static str,
    },

    #[error("entity {0} is registered more than once")]
    DuplicateEntity(EntityId),

    #[error("entity {0} is not an agent and cannot represent users")]
    NotAnAgent(EntityId),
}

/// Errors raised while reading hour records or regional figures.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read \"{path}\": {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed record: {0}")]
    Csv(#[from] csv::Error),

    #[error("duplicate record for {entity} on {date} hour {hour}")]
    DuplicateHour {
        entity: EntityId,
        date: NaiveDate,
        hour: u8,
    },

    #[error("hour {hour} out of range for {entity} on {date} (expected 0..24)")]
    HourOutOfRange {
        entity: EntityId,
        date: NaiveDate,
        hour: u8,
    },

    #[error("records reference unregistered entity {0}")]
    UnknownEntity(EntityId),
}

/// Top-level error for a scenario run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Settle(#[from] SettleError),

    #[error(transparent)]
    Load(#[from] LoadError),
}

/// Non-fatal data-quality findings collected during a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// Agent-metered effective capacity disagrees with the sum over its users.
    InconsistentAggregate {
        agent: EntityId,
        date: NaiveDate,
        hour: u8,
        users_kw: f64,
        agent_kw: f64,
    },
    /// Agent residual plus prorated user fees does not reproduce the agent's
    /// pre-assessment fee.
    AssessmentImbalance {
        agent: EntityId,
        date: NaiveDate,
        pre_assessment: f64,
        charged: f64,
    },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InconsistentAggregate {
                agent,
                date,
                hour,
                users_kw,
                agent_kw,
            } => write!(
                f,
                "inconsistent aggregate for agent {agent} on {date} hour {hour}: \
                 users sum to {users_kw:.4} kW, agent metered {agent_kw:.4} kW"
            ),
            Self::AssessmentImbalance {
                agent,
                date,
                pre_assessment,
                charged,
            } => write!(
                f,
                "assessment imbalance for agent {agent} on {date}: \
                 pre-assessment {pre_assessment:.2}, charged {charged:.2}"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settle_error_messages_name_the_agent() {
        let err = SettleError::InvalidRange {
            agent: EntityId::from("A1"),
            field: "gamma".to_string(),
            value: 1.5,
            expected: "0..=1",
        };
        let msg = err.to_string();
        assert!(msg.contains("A1"));
        assert!(msg.contains("gamma"));
    }

    #[test]
    fn warning_display_does_not_panic() {
        let date = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap_or_default();
        let w = Warning::AssessmentImbalance {
            agent: EntityId::from("A1"),
            date,
            pre_assessment: 100.0,
            charged: 80.0,
        };
        assert!(w.to_string().contains("2024-07-01"));
    }
}
