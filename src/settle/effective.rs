use serde::{Deserialize, Serialize};

use crate::market::HourRecord;

/// Response up to this multiple of the bid is credited at full weight.
pub const FULL_CREDIT_RATIO: f64 = 1.1;

/// Weight applied to response beyond the full-credit ceiling.
pub const EXCESS_WEIGHT: f64 = 0.5;

/// Treatment of a negative raw response (output above baseline).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NegativeResponsePolicy {
    /// Negative response counts as zero.
    #[default]
    Clip,
    /// Negative response is passed through unchanged.
    Keep,
}

/// Credited response for one hour.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EffectiveCapacity {
    /// Observed response after the negative-response policy (kW).
    pub actual_kw: f64,
    /// Response credited toward revenue (kW).
    pub effective_kw: f64,
    /// Response above 110% of bid, exposed for penalty accounting (kW, >= 0).
    pub excess_kw: f64,
}

/// Converts raw response into credited response.
///
/// Response up to 110% of `bid_kw` counts in full; anything above counts at
/// half weight.
///
/// # Examples
///
/// ```
/// use dr_settlement::settle::effective::effective_capacity;
/// use dr_settlement::settle::NegativeResponsePolicy;
///
/// let q = effective_capacity(100.0, 70.0, 20.0, NegativeResponsePolicy::Clip);
/// assert!((q.effective_kw - 26.0).abs() < 1e-9);
/// assert!((q.excess_kw - 8.0).abs() < 1e-9);
/// ```
pub fn effective_capacity(
    baseline_kw: f64,
    output_kw: f64,
    bid_kw: f64,
    policy: NegativeResponsePolicy,
) -> EffectiveCapacity {
    let raw = baseline_kw - output_kw;
    let actual_kw = match policy {
        NegativeResponsePolicy::Clip => raw.max(0.0),
        NegativeResponsePolicy::Keep => raw,
    };

    let threshold = bid_kw * FULL_CREDIT_RATIO;
    if actual_kw <= threshold {
        EffectiveCapacity {
            actual_kw,
            effective_kw: actual_kw,
            excess_kw: 0.0,
        }
    } else {
        let excess_kw = actual_kw - threshold;
        EffectiveCapacity {
            actual_kw,
            effective_kw: threshold + EXCESS_WEIGHT * excess_kw,
            excess_kw,
        }
    }
}

/// [`effective_capacity`] applied to a record.
pub fn for_record(record: &HourRecord, policy: NegativeResponsePolicy) -> EffectiveCapacity {
    effective_capacity(record.baseline_kw, record.output_kw, record.bid_kw, policy)
}
