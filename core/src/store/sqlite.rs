use super::{ScenarioRecord, ScenarioStore};
use crate::{
    clock::SharedClock,
    engine::SimulationResult,
    error::{RoiError, RoiResult},
    input::ScenarioInputs,
    types::{RecordId, Timestamp},
};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// How long a writer waits on a locked database before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SELECT_COLUMNS: &str =
    "SELECT id, scenario_name, inputs_json, results_json, created_at FROM scenarios";

/// SQLite-backed scenario store.
///
/// One connection behind a mutex: SQLite serializes writers anyway, and a
/// single connection keeps `:memory:` databases visible to every caller.
pub struct SqliteScenarioStore {
    conn: Mutex<Connection>,
    clock: SharedClock,
}

type RawRow = (RecordId, String, String, String, String);

impl SqliteScenarioStore {
    /// Open (or create) the scenario database at `path`.
    pub fn open(path: &str, clock: SharedClock) -> RoiResult<Self> {
        let conn = Connection::open(path).map_err(unavailable)?;
        conn.busy_timeout(BUSY_TIMEOUT).map_err(unavailable)?;
        // WAL mode: readers don't block the writer.
        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .map_err(unavailable)?;
        log::debug!("opened scenario store at {path}");
        Ok(Self::from_connection(conn, clock))
    }

    /// Open an existing database without write access.
    pub fn open_read_only(path: &str, clock: SharedClock) -> RoiResult<Self> {
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .map_err(unavailable)?;
        conn.busy_timeout(BUSY_TIMEOUT).map_err(unavailable)?;
        Ok(Self::from_connection(conn, clock))
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory(clock: SharedClock) -> RoiResult<Self> {
        let conn = Connection::open_in_memory().map_err(unavailable)?;
        Ok(Self::from_connection(conn, clock))
    }

    fn from_connection(conn: Connection, clock: SharedClock) -> Self {
        Self {
            conn: Mutex::new(conn),
            clock,
        }
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> RoiResult<()> {
        self.lock()?
            .execute_batch(include_str!("../../../migrations/001_scenarios.sql"))
            .map_err(RoiError::from_sqlite_write)?;
        Ok(())
    }

    fn lock(&self) -> RoiResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| RoiError::StoreUnavailable("connection lock poisoned".into()))
    }
}

impl ScenarioStore for SqliteScenarioStore {
    fn create(
        &self,
        scenario_name: &str,
        inputs: &ScenarioInputs,
        result: &SimulationResult,
    ) -> RoiResult<RecordId> {
        check_finite(inputs, result)?;
        let inputs_json =
            serde_json::to_string(inputs).map_err(|e| RoiError::StoreWriteFailed(e.to_string()))?;
        let results_json =
            serde_json::to_string(result).map_err(|e| RoiError::StoreWriteFailed(e.to_string()))?;

        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(RoiError::from_sqlite_write)?;

        // Never stamp a row earlier than the newest existing one, even if
        // the wall clock stepped backwards.
        let now = format_timestamp(&self.clock.now());
        let newest: Option<String> = tx
            .query_row("SELECT MAX(created_at) FROM scenarios", [], |row| row.get(0))
            .map_err(RoiError::from_sqlite_write)?;
        let created_at = match newest {
            Some(prev) if prev > now => prev,
            _ => now,
        };

        tx.execute(
            "INSERT INTO scenarios (scenario_name, inputs_json, results_json, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![scenario_name, inputs_json, results_json, created_at],
        )
        .map_err(RoiError::from_sqlite_write)?;
        let id = tx.last_insert_rowid();
        tx.commit().map_err(RoiError::from_sqlite_write)?;

        log::info!("saved scenario {id} '{scenario_name}' at {created_at}");
        Ok(id)
    }

    fn list_all(&self) -> RoiResult<Vec<ScenarioRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!("{SELECT_COLUMNS} ORDER BY created_at DESC, id DESC"))
            .map_err(RoiError::from_sqlite_read)?;
        let rows = stmt
            .query_map([], raw_row)
            .map_err(RoiError::from_sqlite_read)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(RoiError::from_sqlite_read)?;
        rows.into_iter().map(decode_record).collect()
    }

    fn get(&self, id: RecordId) -> RoiResult<Option<ScenarioRecord>> {
        let conn = self.lock()?;
        let row = conn
            .query_row(&format!("{SELECT_COLUMNS} WHERE id = ?1"), params![id], raw_row)
            .optional()
            .map_err(RoiError::from_sqlite_read)?;
        row.map(decode_record).transpose()
    }

    fn count(&self) -> RoiResult<i64> {
        let conn = self.lock()?;
        conn.query_row("SELECT COUNT(*) FROM scenarios", [], |row| row.get(0))
            .map_err(RoiError::from_sqlite_read)
    }
}

/// JSON has no encoding for inf/NaN; a row holding one could never be
/// read back.
fn check_finite(inputs: &ScenarioInputs, result: &SimulationResult) -> RoiResult<()> {
    for (field, value) in inputs.labeled_fields() {
        if !value.is_finite() {
            return Err(RoiError::StoreWriteFailed(format!("input {field} is not finite")));
        }
    }
    for (field, value) in result.labeled_fields() {
        if value.value().is_some_and(|v| !v.is_finite()) {
            return Err(RoiError::StoreWriteFailed(format!("result {field} is not finite")));
        }
    }
    Ok(())
}

fn unavailable(err: rusqlite::Error) -> RoiError {
    RoiError::StoreUnavailable(err.to_string())
}

fn raw_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
    ))
}

fn decode_record(
    (id, scenario_name, inputs_json, results_json, created_at): RawRow,
) -> RoiResult<ScenarioRecord> {
    let inputs =
        serde_json::from_str(&inputs_json).map_err(|e| corrupt(id, "inputs_json", e))?;
    let result =
        serde_json::from_str(&results_json).map_err(|e| corrupt(id, "results_json", e))?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| corrupt(id, "created_at", e))?
        .with_timezone(&Utc);

    Ok(ScenarioRecord {
        id,
        scenario_name,
        inputs,
        result,
        created_at,
    })
}

fn corrupt(id: RecordId, column: &str, err: impl std::fmt::Display) -> RoiError {
    RoiError::StoreReadFailed(format!("scenario {id}: bad {column}: {err}"))
}

/// Fixed-width RFC 3339 so that text order matches time order.
fn format_timestamp(ts: &Timestamp) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}
