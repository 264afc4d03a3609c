//! Simulation engine tests.

use roi_core::{
    engine::{simulate, Ratio, AUTOMATED_COST_PER_INVOICE, MIN_ROI_BOOST_FACTOR},
    input::ScenarioInputs,
};

// ── Test helpers ────────────────────────────────────────────────────────────

fn reference_inputs() -> ScenarioInputs {
    ScenarioInputs {
        monthly_invoice_volume: 1000.0,
        num_ap_staff: 2.0,
        avg_hours_per_invoice: 0.1,
        hourly_wage: 20.0,
        error_rate_manual: 5.0,
        error_cost: 50.0,
        time_horizon_months: 12.0,
        one_time_implementation_cost: 10_000.0,
    }
}

fn assert_close(actual: f64, expected: f64, what: &str) {
    assert!(
        (actual - expected).abs() < 1e-6,
        "{what}: expected {expected}, got {actual}"
    );
}

fn defined(r: Ratio, what: &str) -> f64 {
    r.value()
        .unwrap_or_else(|| panic!("{what} should be defined, got {r:?}"))
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// The documented worked example, step by step.
#[test]
fn reference_scenario_matches_worked_example() {
    let r = simulate(&reference_inputs());

    assert_close(r.labor_cost_manual, 4000.0, "labor_cost_manual");
    assert_close(r.auto_cost, 200.0, "auto_cost");
    assert_close(r.error_savings, 2450.0, "error_savings");
    assert_close(r.monthly_savings, 6875.0, "monthly_savings");
    assert_close(r.cumulative_savings, 82_500.0, "cumulative_savings");
    assert_close(r.net_savings, 72_500.0, "net_savings");
    assert_close(defined(r.payback_months, "payback"), 10_000.0 / 6875.0, "payback_months");
    assert_close(defined(r.roi_percentage, "roi"), 725.0, "roi_percentage");
}

#[test]
fn repeated_calls_are_bit_identical() {
    let inputs = reference_inputs();
    let first = simulate(&inputs);
    for _ in 0..100 {
        let again = simulate(&inputs);
        assert_eq!(again, first);
        assert_eq!(again.monthly_savings.to_bits(), first.monthly_savings.to_bits());
    }
}

/// Concurrent callers share nothing and see the same answer.
#[test]
fn concurrent_calls_agree() {
    let inputs = reference_inputs();
    let expected = simulate(&inputs);
    let handles: Vec<_> = (0..8)
        .map(|_| std::thread::spawn(move || simulate(&inputs)))
        .collect();
    for h in handles {
        assert_eq!(h.join().unwrap(), expected);
    }
}

#[test]
fn costs_are_non_negative_for_non_negative_inputs() {
    let grid = [0.0, 0.5, 3.0, 1250.0];
    for &volume in &grid {
        for &staff in &grid {
            for &wage in &grid {
                let inputs = ScenarioInputs {
                    monthly_invoice_volume: volume,
                    num_ap_staff: staff,
                    hourly_wage: wage,
                    ..reference_inputs()
                };
                let r = simulate(&inputs);
                assert!(r.labor_cost_manual >= 0.0, "labor cost negative for {inputs:?}");
                assert!(r.auto_cost >= 0.0, "auto cost negative for {inputs:?}");
            }
        }
    }
}

/// Zero volume zeroes every per-invoice term, so payback has no value.
#[test]
fn zero_volume_yields_zero_savings_and_undefined_payback() {
    let inputs = ScenarioInputs {
        monthly_invoice_volume: 0.0,
        ..reference_inputs()
    };
    let r = simulate(&inputs);

    assert_eq!(r.labor_cost_manual, 0.0);
    assert_eq!(r.auto_cost, 0.0);
    assert_eq!(r.error_savings, 0.0);
    assert_eq!(r.monthly_savings, 0.0);
    assert_eq!(r.payback_months, Ratio::Undefined);
    // Implementation cost is non-zero, so ROI is still defined: -100%.
    assert_close(defined(r.roi_percentage, "roi"), -100.0, "roi_percentage");
}

#[test]
fn zero_implementation_cost_yields_undefined_roi() {
    let inputs = ScenarioInputs {
        one_time_implementation_cost: 0.0,
        ..reference_inputs()
    };
    let r = simulate(&inputs);

    assert_eq!(r.roi_percentage, Ratio::Undefined);
    assert_eq!(r.payback_months, Ratio::Defined(0.0));
    assert_close(r.net_savings, r.cumulative_savings, "net_savings");
}

#[test]
fn zero_volume_and_zero_cost_leave_both_ratios_undefined() {
    let inputs = ScenarioInputs {
        monthly_invoice_volume: 0.0,
        one_time_implementation_cost: 0.0,
        ..reference_inputs()
    };
    let r = simulate(&inputs);
    assert!(r.payback_months.is_undefined());
    assert!(r.roi_percentage.is_undefined());
}

/// Automation costing more than it saves is a valid, unfavourable result.
#[test]
fn negative_monthly_savings_is_reported_not_rejected() {
    let inputs = ScenarioInputs {
        num_ap_staff: 0.0,
        error_rate_manual: 0.0,
        ..reference_inputs()
    };
    let r = simulate(&inputs);

    // Only the automated side remains: -(auto cost + automated error cost).
    let expected = -(1000.0 * AUTOMATED_COST_PER_INVOICE + 0.001 * 1000.0 * 50.0)
        * MIN_ROI_BOOST_FACTOR;
    assert_close(r.monthly_savings, expected, "monthly_savings");
    assert!(defined(r.payback_months, "payback") < 0.0);
    assert!(defined(r.roi_percentage, "roi") < -100.0);
}

#[test]
fn negative_implementation_cost_is_accepted() {
    let inputs = ScenarioInputs {
        one_time_implementation_cost: -500.0,
        ..reference_inputs()
    };
    let r = simulate(&inputs);
    assert_close(r.net_savings, r.cumulative_savings + 500.0, "net_savings");
    assert!(defined(r.payback_months, "payback") < 0.0);
}

#[test]
fn result_serializes_undefined_ratios_as_null() {
    let inputs = ScenarioInputs {
        monthly_invoice_volume: 0.0,
        one_time_implementation_cost: 0.0,
        ..reference_inputs()
    };
    let json = serde_json::to_value(simulate(&inputs)).unwrap();
    assert!(json["payback_months"].is_null());
    assert!(json["roi_percentage"].is_null());
    assert_eq!(json["monthly_savings"], serde_json::json!(0.0));
}

/// ROI scaling to a percentage can overflow even when the quotient fits.
#[test]
fn roi_overflowing_on_percentage_scaling_is_undefined() {
    let inputs = ScenarioInputs {
        monthly_invoice_volume: 1.0,
        num_ap_staff: 1.0,
        avg_hours_per_invoice: 1.0,
        hourly_wage: 1e307,
        error_rate_manual: 0.0,
        error_cost: 0.0,
        time_horizon_months: 12.0,
        one_time_implementation_cost: 1.0,
    };
    let r = simulate(&inputs);

    assert!(r.net_savings.is_finite(), "net savings should still fit: {}", r.net_savings);
    assert_eq!(r.roi_percentage, Ratio::Undefined);
    assert!(defined(r.payback_months, "payback").is_finite());
}
