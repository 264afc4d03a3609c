//! Scenario inputs and the inbound validation boundary.
//!
//! Every field must carry a value and every numeric field must parse as a
//! finite number. Ranges are not checked.

use crate::error::{RoiError, RoiResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The eight numeric drivers of a projection (a scenario without its name).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScenarioInputs {
    pub monthly_invoice_volume: f64,
    pub num_ap_staff: f64,
    pub avg_hours_per_invoice: f64,
    pub hourly_wage: f64,
    /// Percent, 0–100 scale.
    pub error_rate_manual: f64,
    pub error_cost: f64,
    pub time_horizon_months: f64,
    pub one_time_implementation_cost: f64,
}

/// A named scenario as submitted by a caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationInput {
    pub scenario_name: String,
    #[serde(flatten)]
    pub inputs: ScenarioInputs,
}

pub const SCENARIO_NAME_FIELD: &str = "scenario_name";

/// Numeric field names in declaration order.
pub const INPUT_FIELDS: [&str; 8] = [
    "monthly_invoice_volume",
    "num_ap_staff",
    "avg_hours_per_invoice",
    "hourly_wage",
    "error_rate_manual",
    "error_cost",
    "time_horizon_months",
    "one_time_implementation_cost",
];

impl ScenarioInputs {
    pub fn labeled_fields(&self) -> [(&'static str, f64); 8] {
        [
            (INPUT_FIELDS[0], self.monthly_invoice_volume),
            (INPUT_FIELDS[1], self.num_ap_staff),
            (INPUT_FIELDS[2], self.avg_hours_per_invoice),
            (INPUT_FIELDS[3], self.hourly_wage),
            (INPUT_FIELDS[4], self.error_rate_manual),
            (INPUT_FIELDS[5], self.error_cost),
            (INPUT_FIELDS[6], self.time_horizon_months),
            (INPUT_FIELDS[7], self.one_time_implementation_cost),
        ]
    }

    /// Parse the eight numeric fields out of a JSON object.
    /// Extra keys (including `scenario_name`) are ignored.
    pub fn from_json(value: &Value) -> RoiResult<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| RoiError::invalid_input("inputs", "expected a JSON object"))?;
        let num = |field: &str| numeric_field(obj.get(field), field);

        Ok(Self {
            monthly_invoice_volume: num(INPUT_FIELDS[0])?,
            num_ap_staff: num(INPUT_FIELDS[1])?,
            avg_hours_per_invoice: num(INPUT_FIELDS[2])?,
            hourly_wage: num(INPUT_FIELDS[3])?,
            error_rate_manual: num(INPUT_FIELDS[4])?,
            error_cost: num(INPUT_FIELDS[5])?,
            time_horizon_months: num(INPUT_FIELDS[6])?,
            one_time_implementation_cost: num(INPUT_FIELDS[7])?,
        })
    }
}

impl SimulationInput {
    pub fn new(scenario_name: impl Into<String>, inputs: ScenarioInputs) -> Self {
        Self {
            scenario_name: scenario_name.into(),
            inputs,
        }
    }

    /// Validate a caller payload carrying all nine fields.
    pub fn from_json(value: &Value) -> RoiResult<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| RoiError::invalid_input("inputs", "expected a JSON object"))?;

        let scenario_name = match obj.get(SCENARIO_NAME_FIELD) {
            None | Some(Value::Null) => {
                return Err(RoiError::invalid_input(SCENARIO_NAME_FIELD, "missing value"))
            }
            Some(Value::String(s)) if s.trim().is_empty() => {
                return Err(RoiError::invalid_input(SCENARIO_NAME_FIELD, "missing value"))
            }
            Some(Value::String(s)) => s.clone(),
            Some(other) => {
                return Err(RoiError::invalid_input(
                    SCENARIO_NAME_FIELD,
                    format!("expected text, got {other}"),
                ))
            }
        };

        Ok(Self {
            scenario_name,
            inputs: ScenarioInputs::from_json(value)?,
        })
    }
}

fn numeric_field(value: Option<&Value>, field: &str) -> RoiResult<f64> {
    let parsed = match value {
        None | Some(Value::Null) => return Err(RoiError::invalid_input(field, "missing value")),
        Some(Value::Number(n)) => n.as_f64(),
        // Form submissions arrive as strings.
        Some(Value::String(s)) if s.trim().is_empty() => {
            return Err(RoiError::invalid_input(field, "missing value"))
        }
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };

    match parsed {
        Some(v) if v.is_finite() => Ok(v),
        _ => Err(RoiError::invalid_input(field, "not a number")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numeric_strings_are_accepted() {
        let v = numeric_field(Some(&json!(" 12.5 ")), "x").unwrap();
        assert_eq!(v, 12.5);
    }

    #[test]
    fn non_finite_strings_are_rejected() {
        assert!(numeric_field(Some(&json!("inf")), "x").is_err());
        assert!(numeric_field(Some(&json!("NaN")), "x").is_err());
    }

    #[test]
    fn booleans_are_not_numbers() {
        assert!(numeric_field(Some(&json!(true)), "x").is_err());
    }
}
