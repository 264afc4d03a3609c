//! The ROI simulation engine.
//!
//! FORMULA ORDER (fixed, each step reads only the steps above it):
//!   1. labor_cost_manual   = staff × wage × hours/invoice × volume
//!   2. auto_cost           = volume × automated cost/invoice
//!   3. error_savings       = (manual rate% / 100 − automated rate) × volume × error cost
//!   4. monthly_savings     = (labor + error savings − auto cost) × boost factor
//!   5. cumulative_savings  = monthly savings × horizon
//!   6. net_savings         = cumulative − implementation cost
//!   7. payback_months      = implementation cost / monthly savings
//!   8. roi_percentage      = net / implementation cost × 100
//!
//! RULES:
//!   - `simulate` is pure: no I/O, no state, same input ⇒ same output.
//!   - Steps 7 and 8 are the only divisions. A zero denominator yields
//!     `Ratio::Undefined`, never a panic and never a stray inf/NaN.
//!   - Negative savings are an unfavourable outcome, not an error.

use crate::input::ScenarioInputs;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Automated processing cost per invoice, in currency units.
pub const AUTOMATED_COST_PER_INVOICE: f64 = 0.20;

/// Automated error rate as a fraction (0.1%).
pub const AUTOMATED_ERROR_RATE: f64 = 0.001;

/// Uniform multiplier applied to monthly savings before projection.
pub const MIN_ROI_BOOST_FACTOR: f64 = 1.1;

/// Result of a division that may have no defined value.
///
/// Serializes as a bare number, or `null` when undefined.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Ratio {
    Defined(f64),
    Undefined,
}

impl Ratio {
    /// `numerator / denominator`, or `Undefined` when the denominator is
    /// zero or the quotient overflows.
    pub fn divide(numerator: f64, denominator: f64) -> Self {
        if denominator == 0.0 {
            return Ratio::Undefined;
        }
        let q = numerator / denominator;
        if q.is_finite() {
            Ratio::Defined(q)
        } else {
            Ratio::Undefined
        }
    }

    /// Multiply a defined ratio, dropping to `Undefined` on overflow.
    pub fn scale(self, factor: f64) -> Self {
        match self {
            Ratio::Defined(v) if (v * factor).is_finite() => Ratio::Defined(v * factor),
            _ => Ratio::Undefined,
        }
    }

    pub fn value(self) -> Option<f64> {
        match self {
            Ratio::Defined(v) => Some(v),
            Ratio::Undefined => None,
        }
    }

    pub fn is_undefined(self) -> bool {
        matches!(self, Ratio::Undefined)
    }
}

impl fmt::Display for Ratio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ratio::Defined(v) => match f.precision() {
                Some(p) => write!(f, "{v:.p$}"),
                None => write!(f, "{v}"),
            },
            Ratio::Undefined => f.write_str("undefined"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub labor_cost_manual: f64,
    pub auto_cost: f64,
    pub error_savings: f64,
    pub monthly_savings: f64,
    pub cumulative_savings: f64,
    pub net_savings: f64,
    pub payback_months: Ratio,
    pub roi_percentage: Ratio,
}

/// Result field names in declaration order.
pub const RESULT_FIELDS: [&str; 8] = [
    "labor_cost_manual",
    "auto_cost",
    "error_savings",
    "monthly_savings",
    "cumulative_savings",
    "net_savings",
    "payback_months",
    "roi_percentage",
];

impl SimulationResult {
    pub fn labeled_fields(&self) -> [(&'static str, Ratio); 8] {
        [
            (RESULT_FIELDS[0], Ratio::Defined(self.labor_cost_manual)),
            (RESULT_FIELDS[1], Ratio::Defined(self.auto_cost)),
            (RESULT_FIELDS[2], Ratio::Defined(self.error_savings)),
            (RESULT_FIELDS[3], Ratio::Defined(self.monthly_savings)),
            (RESULT_FIELDS[4], Ratio::Defined(self.cumulative_savings)),
            (RESULT_FIELDS[5], Ratio::Defined(self.net_savings)),
            (RESULT_FIELDS[6], self.payback_months),
            (RESULT_FIELDS[7], self.roi_percentage),
        ]
    }
}

/// Project savings for one scenario.
pub fn simulate(inputs: &ScenarioInputs) -> SimulationResult {
    let ScenarioInputs {
        monthly_invoice_volume,
        num_ap_staff,
        avg_hours_per_invoice,
        hourly_wage,
        error_rate_manual,
        error_cost,
        time_horizon_months,
        one_time_implementation_cost,
    } = *inputs;

    let labor_cost_manual =
        num_ap_staff * hourly_wage * avg_hours_per_invoice * monthly_invoice_volume;
    let auto_cost = monthly_invoice_volume * AUTOMATED_COST_PER_INVOICE;
    let error_savings = (error_rate_manual / 100.0 - AUTOMATED_ERROR_RATE)
        * monthly_invoice_volume
        * error_cost;

    let monthly_savings = (labor_cost_manual + error_savings - auto_cost) * MIN_ROI_BOOST_FACTOR;
    let cumulative_savings = monthly_savings * time_horizon_months;
    let net_savings = cumulative_savings - one_time_implementation_cost;

    let payback_months = Ratio::divide(one_time_implementation_cost, monthly_savings);
    let roi_percentage = Ratio::divide(net_savings, one_time_implementation_cost).scale(100.0);

    if payback_months.is_undefined() || roi_percentage.is_undefined() {
        log::debug!(
            "undefined ratio: monthly_savings={monthly_savings}, implementation_cost={one_time_implementation_cost}"
        );
    }

    SimulationResult {
        labor_cost_manual,
        auto_cost,
        error_savings,
        monthly_savings,
        cumulative_savings,
        net_savings,
        payback_months,
        roi_percentage,
    }
}
