//! The four caller-facing operations, wired to explicit collaborators.
//!
//! A service owns a store handle and a renderer handle; nothing here is
//! process-global. Failures keep their type so a caller can tell
//! "computed but not saved" (`Store*`) from "computed but not rendered"
//! (`RenderFailed`).

use crate::{
    engine::{simulate, SimulationResult},
    error::RoiResult,
    input::SimulationInput,
    report::{report_filename, RenderJob, ReportRenderer},
    store::{ScenarioRecord, ScenarioStore},
    types::RecordId,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SavedScenario {
    pub id: RecordId,
    pub result: SimulationResult,
}

/// A finished document plus the attachment name to serve it under.
#[derive(Debug, Clone)]
pub struct Report {
    pub filename: String,
    pub bytes: Vec<u8>,
}

pub struct RoiService {
    store: Arc<dyn ScenarioStore>,
    renderer: Arc<dyn ReportRenderer>,
}

impl RoiService {
    pub fn new(store: Arc<dyn ScenarioStore>, renderer: Arc<dyn ReportRenderer>) -> Self {
        Self { store, renderer }
    }

    pub fn simulate(&self, input: &SimulationInput) -> SimulationResult {
        simulate(&input.inputs)
    }

    /// Simulate and persist. The result is recomputed here, never taken
    /// from the caller.
    pub fn save_scenario(&self, input: &SimulationInput) -> RoiResult<SavedScenario> {
        let result = simulate(&input.inputs);
        let id = self
            .store
            .create(&input.scenario_name, &input.inputs, &result)
            .inspect_err(|e| log::warn!("scenario '{}' not saved: {e}", input.scenario_name))?;
        Ok(SavedScenario { id, result })
    }

    pub fn list_scenarios(&self) -> RoiResult<Vec<ScenarioRecord>> {
        self.store.list_all()
    }

    pub fn scenario(&self, id: RecordId) -> RoiResult<Option<ScenarioRecord>> {
        self.store.get(id)
    }

    /// Recompute and render, waiting on the renderer's completion signal
    /// for at most `timeout`.
    pub fn generate_report(
        &self,
        input: &SimulationInput,
        recipient: &str,
        timeout: Duration,
    ) -> RoiResult<Report> {
        let result = simulate(&input.inputs);
        let job = RenderJob::spawn(
            Arc::clone(&self.renderer),
            input.clone(),
            result,
            recipient.to_string(),
        )?;
        let bytes = job
            .wait_timeout(timeout)
            .inspect_err(|e| log::warn!("report for '{}' failed: {e}", input.scenario_name))?;

        Ok(Report {
            filename: report_filename(&input.scenario_name),
            bytes,
        })
    }
}
