//! Scenario persistence.
//!
//! RULE: Only the store talks to the database.
//! The engine never sees a connection; callers hand a store handle to
//! whatever needs one.

mod sqlite;

pub use sqlite::SqliteScenarioStore;

use crate::{
    engine::SimulationResult,
    error::RoiResult,
    input::{ScenarioInputs, SimulationInput},
    types::{RecordId, Timestamp},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A persisted scenario. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioRecord {
    pub id: RecordId,
    pub scenario_name: String,
    pub inputs: ScenarioInputs,
    pub result: SimulationResult,
    pub created_at: Timestamp,
}

impl ScenarioRecord {
    /// The named input this record was computed from.
    pub fn input(&self) -> SimulationInput {
        SimulationInput::new(self.scenario_name.clone(), self.inputs)
    }
}

/// Append-only store of scenario records.
///
/// Implementations must be safe to share between threads. Concurrent
/// `create` calls may interleave; `list_all` reflects insertion order.
pub trait ScenarioStore: Send + Sync {
    /// Persist a new record and return its store-assigned id.
    fn create(
        &self,
        scenario_name: &str,
        inputs: &ScenarioInputs,
        result: &SimulationResult,
    ) -> RoiResult<RecordId>;

    /// Every record, newest first. Empty when nothing has been saved.
    fn list_all(&self) -> RoiResult<Vec<ScenarioRecord>>;

    fn get(&self, id: RecordId) -> RoiResult<Option<ScenarioRecord>>;

    fn count(&self) -> RoiResult<i64>;
}

impl<S: ScenarioStore + ?Sized> ScenarioStore for Arc<S> {
    fn create(
        &self,
        scenario_name: &str,
        inputs: &ScenarioInputs,
        result: &SimulationResult,
    ) -> RoiResult<RecordId> {
        (**self).create(scenario_name, inputs, result)
    }

    fn list_all(&self) -> RoiResult<Vec<ScenarioRecord>> {
        (**self).list_all()
    }

    fn get(&self, id: RecordId) -> RoiResult<Option<ScenarioRecord>> {
        (**self).get(id)
    }

    fn count(&self) -> RoiResult<i64> {
        (**self).count()
    }
}
