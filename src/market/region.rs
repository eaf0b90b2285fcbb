use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One row of the regional bids CSV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionBid {
    pub date: NaiveDate,
    pub hour: u8,
    pub average_bid_kw: f64,
}

/// Mean bid capacity across the region's day-ahead participants, per hour.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegionProfile {
    mean_bid_kw: BTreeMap<(NaiveDate, u8), f64>,
}

impl RegionProfile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a profile from supplied regional figures.
    pub fn from_bids(bids: impl IntoIterator<Item = RegionBid>) -> Self {
        Self {
            mean_bid_kw: bids
                .into_iter()
                .map(|b| ((b.date, b.hour), b.average_bid_kw))
                .collect(),
        }
    }

    /// Derives the mean of all positive participant bids per hour.
    pub fn from_participant_bids(bids: impl IntoIterator<Item = (NaiveDate, u8, f64)>) -> Self {
        let mut sums: BTreeMap<(NaiveDate, u8), (f64, usize)> = BTreeMap::new();
        for (date, hour, bid_kw) in bids {
            if bid_kw > 0.0 {
                let entry = sums.entry((date, hour)).or_insert((0.0, 0));
                entry.0 += bid_kw;
                entry.1 += 1;
            }
        }
        Self {
            mean_bid_kw: sums
                .into_iter()
                .map(|(key, (sum, n))| (key, sum / n as f64))
                .collect(),
        }
    }

    /// Regional mean bid for the hour, if known.
    pub fn mean_bid_kw(&self, date: NaiveDate, hour: u8) -> Option<f64> {
        self.mean_bid_kw.get(&(date, hour)).copied()
    }

    /// Copies hours present in `other` but missing here. Supplied figures win.
    pub fn fill_missing_from(&mut self, other: &RegionProfile) {
        for (key, value) in &other.mean_bid_kw {
            self.mean_bid_kw.entry(*key).or_insert(*value);
        }
    }

    pub fn len(&self) -> usize {
        self.mean_bid_kw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mean_bid_kw.is_empty()
    }
}
