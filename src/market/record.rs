//! Hourly telemetry records grouped into settlement days and periods.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::entity::{EntityId, Registry};
use crate::error::LoadError;

/// Number of hourly records in a complete settlement day.
pub const HOURS_PER_DAY: u8 = 24;

/// Emergency hours are paid at this fraction of the clearing price.
pub const EMERGENCY_PRICE_FACTOR: f64 = 0.1;

/// Observed data for one entity in one calendar hour.
///
/// Field names match the records CSV header, so rows deserialize directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourRecord {
    /// Entity the record belongs to.
    pub entity_id: EntityId,
    /// Calendar date.
    pub date: NaiveDate,
    /// Hour of day, `0..24`.
    pub hour: u8,
    /// Reference consumption absent any response (kW).
    pub baseline_kw: f64,
    /// Metered consumption during the hour (kW).
    pub output_kw: f64,
    /// Cleared day-ahead bid capacity (kW).
    pub bid_kw: f64,
    /// Contracted standby capacity (kW).
    pub capacity_kw: f64,
    /// Day-ahead clearing price for the hour.
    pub clearing_price: f64,
    /// Standby capacity price applied to the settled capacity.
    pub capacity_price: f64,
    /// Regional day-ahead response is active in this hour.
    pub day_ahead_active: bool,
    /// Hour is flagged for emergency response.
    pub emergency: bool,
}

impl HourRecord {
    /// Raw observed response: `baseline - output`, possibly negative.
    pub fn raw_response_kw(&self) -> f64 {
        self.baseline_kw - self.output_kw
    }

    /// Emergency unit price, a fixed 10% of the clearing price.
    pub fn emergency_price(&self) -> f64 {
        self.clearing_price * EMERGENCY_PRICE_FACTOR
    }
}

/// All hour records of one entity for one date, ordered by hour.
#[derive(Debug, Clone, PartialEq)]
pub struct SettlementDay {
    pub date: NaiveDate,
    pub hours: Vec<HourRecord>,
}

impl SettlementDay {
    /// Returns the record for `hour`, if present.
    pub fn hour(&self, hour: u8) -> Option<&HourRecord> {
        self.hours
            .binary_search_by_key(&hour, |r| r.hour)
            .ok()
            .map(|i| &self.hours[i])
    }

    /// Records flagged as day-ahead response hours.
    pub fn response_hours(&self) -> impl Iterator<Item = &HourRecord> {
        self.hours.iter().filter(|r| r.day_ahead_active)
    }

    /// Records flagged as emergency hours.
    pub fn emergency_hours(&self) -> impl Iterator<Item = &HourRecord> {
        self.hours.iter().filter(|r| r.emergency)
    }
}

/// Ordered settlement days of one entity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettlementPeriod {
    pub days: Vec<SettlementDay>,
}

impl SettlementPeriod {
    /// Returns the day for `date`, if present.
    pub fn day(&self, date: NaiveDate) -> Option<&SettlementDay> {
        self.days
            .binary_search_by_key(&date, |d| d.date)
            .ok()
            .map(|i| &self.days[i])
    }
}

/// Hour records of every entity in a run, grouped per entity into periods.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordSet {
    periods: BTreeMap<EntityId, SettlementPeriod>,
}

impl RecordSet {
    /// Groups flat records into per-entity periods of ordered days and hours.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::HourOutOfRange`] for an hour outside `0..24` and
    /// [`LoadError::DuplicateHour`] when an entity reports the same hour twice.
    pub fn from_records(records: Vec<HourRecord>) -> Result<Self, LoadError> {
        let mut grouped: BTreeMap<EntityId, BTreeMap<NaiveDate, BTreeMap<u8, HourRecord>>> =
            BTreeMap::new();

        for record in records {
            if record.hour >= HOURS_PER_DAY {
                return Err(LoadError::HourOutOfRange {
                    entity: record.entity_id,
                    date: record.date,
                    hour: record.hour,
                });
            }
            let hours = grouped
                .entry(record.entity_id.clone())
                .or_default()
                .entry(record.date)
                .or_default();
            if hours.contains_key(&record.hour) {
                return Err(LoadError::DuplicateHour {
                    entity: record.entity_id,
                    date: record.date,
                    hour: record.hour,
                });
            }
            hours.insert(record.hour, record);
        }

        let periods = grouped
            .into_iter()
            .map(|(id, days)| {
                let days = days
                    .into_iter()
                    .map(|(date, hours)| SettlementDay {
                        date,
                        hours: hours.into_values().collect(),
                    })
                    .collect();
                (id, SettlementPeriod { days })
            })
            .collect();

        Ok(Self { periods })
    }

    /// Returns the period of `id`, if it has any records.
    pub fn period(&self, id: &EntityId) -> Option<&SettlementPeriod> {
        self.periods.get(id)
    }

    /// Iterates entity periods in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = (&EntityId, &SettlementPeriod)> {
        self.periods.iter()
    }

    /// Total number of hour records.
    pub fn record_count(&self) -> usize {
        self.periods
            .values()
            .flat_map(|p| p.days.iter())
            .map(|d| d.hours.len())
            .sum()
    }

    /// Checks every entity with records is known to `registry`.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::UnknownEntity`] for the first unregistered id.
    pub fn ensure_registered(&self, registry: &Registry) -> Result<(), LoadError> {
        match self.periods.keys().find(|id| registry.lookup(id).is_none()) {
            Some(id) => Err(LoadError::UnknownEntity(id.clone())),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, d).unwrap_or_default()
    }

    fn record(id: &str, d: u32, hour: u8) -> HourRecord {
        HourRecord {
            entity_id: EntityId::from(id),
            date: date(d),
            hour,
            baseline_kw: 100.0,
            output_kw: 70.0,
            bid_kw: 20.0,
            capacity_kw: 50.0,
            clearing_price: 500.0,
            capacity_price: 5.0,
            day_ahead_active: true,
            emergency: false,
        }
    }

    #[test]
    fn emergency_price_is_ten_percent() {
        assert_eq!(record("D1", 1, 0).emergency_price(), 50.0);
    }

    #[test]
    fn groups_and_orders_days_and_hours() {
        let set = RecordSet::from_records(vec![
            record("D1", 2, 5),
            record("D1", 1, 7),
            record("D1", 1, 3),
            record("D2", 1, 0),
        ])
        .unwrap();

        let period = set.period(&EntityId::from("D1")).unwrap();
        assert_eq!(period.days.len(), 2);
        assert_eq!(period.days[0].date, date(1));
        let hours: Vec<u8> = period.days[0].hours.iter().map(|r| r.hour).collect();
        assert_eq!(hours, vec![3, 7]);
        assert_eq!(period.day(date(2)).and_then(|d| d.hour(5)).map(|r| r.hour), Some(5));
        assert_eq!(set.record_count(), 4);
    }

    #[test]
    fn rejects_duplicate_hour() {
        let err = RecordSet::from_records(vec![record("D1", 1, 4), record("D1", 1, 4)]);
        assert!(matches!(err, Err(LoadError::DuplicateHour { hour: 4, .. })));
    }

    #[test]
    fn rejects_hour_out_of_range() {
        let err = RecordSet::from_records(vec![record("D1", 1, 24)]);
        assert!(matches!(err, Err(LoadError::HourOutOfRange { hour: 24, .. })));
    }

    #[test]
    fn response_and_emergency_filters() {
        let mut quiet = record("D1", 1, 1);
        quiet.day_ahead_active = false;
        let mut emergency = record("D1", 1, 2);
        emergency.emergency = true;
        let set = RecordSet::from_records(vec![record("D1", 1, 0), quiet, emergency]).unwrap();
        let day = &set.period(&EntityId::from("D1")).unwrap().days[0];
        assert_eq!(day.response_hours().count(), 2);
        assert_eq!(day.emergency_hours().count(), 1);
    }
}
