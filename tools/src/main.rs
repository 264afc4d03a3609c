//! roi-runner: headless front end for the ROI simulator.
//!
//! Usage:
//!   roi-runner simulate --input scenario.json
//!   roi-runner save     --input scenario.json --db roi.db
//!   roi-runner list     --db roi.db
//!   roi-runner report   --input scenario.json --email ap@example.com --out ./reports
//!   roi-runner --ipc-mode --db roi.db
//!
//! `--config runner.json` supplies defaults; explicit flags win.

use anyhow::{bail, Context, Result};
use roi_core::{
    clock::system_clock,
    config::RunnerConfig,
    error::RoiError,
    input::SimulationInput,
    report::PdfReportRenderer,
    service::RoiService,
    store::{ScenarioRecord, SqliteScenarioStore},
};
use std::env;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Arc;

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    Simulate { inputs: serde_json::Value },
    SaveScenario { inputs: serde_json::Value },
    ListScenarios,
    GenerateReport { email: String, inputs: serde_json::Value },
    Quit,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let config = build_config(&args)?;
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");

    let clock = system_clock();
    let store = SqliteScenarioStore::open(&config.database_path, clock.clone())?;
    store.migrate()?;
    let service = RoiService::new(Arc::new(store), Arc::new(PdfReportRenderer::new(clock)));

    if ipc_mode {
        return run_ipc_loop(&service, &config);
    }

    let command = args.get(1).map(String::as_str).unwrap_or("");
    match command {
        "simulate" => {
            let input = read_input(&args)?;
            let result = service.simulate(&input);
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        "save" => {
            let input = read_input(&args)?;
            let saved = service.save_scenario(&input)?;
            println!("Saved scenario '{}' as #{}", input.scenario_name, saved.id);
            println!("{}", serde_json::to_string_pretty(&saved.result)?);
        }
        "list" => print_scenarios(&service.list_scenarios()?),
        "report" => {
            let input = read_input(&args)?;
            let email = flag_value(&args, "--email").context("--email is required for report")?;
            let path = write_report(&service, &config, &input, email)?;
            println!("Report written to {path}");
        }
        other => bail!("unknown command '{other}' (expected simulate, save, list or report)"),
    }
    Ok(())
}

fn build_config(args: &[String]) -> Result<RunnerConfig> {
    let mut config = match flag_value(args, "--config") {
        Some(path) => RunnerConfig::load(path)?,
        None => RunnerConfig::default(),
    };
    if let Some(db) = flag_value(args, "--db") {
        config.database_path = db.to_string();
    }
    if let Some(out) = flag_value(args, "--out") {
        config.output_dir = out.to_string();
    }
    config.render_timeout_ms = parse_arg(args, "--timeout-ms", config.render_timeout_ms);
    Ok(config)
}

fn read_input(args: &[String]) -> Result<SimulationInput> {
    let path = flag_value(args, "--input").context("--input <file.json> is required")?;
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {path}"))?;
    let payload: serde_json::Value = serde_json::from_str(&content)?;
    Ok(SimulationInput::from_json(&payload)?)
}

fn write_report(
    service: &RoiService,
    config: &RunnerConfig,
    input: &SimulationInput,
    email: &str,
) -> Result<String> {
    let report = service.generate_report(input, email, config.render_timeout())?;
    let path = Path::new(&config.output_dir).join(&report.filename);
    std::fs::write(&path, &report.bytes)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path.display().to_string())
}

fn run_ipc_loop(service: &RoiService, config: &RunnerConfig) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }
        if buffer.trim().is_empty() {
            continue;
        }

        let Some(reply) = handle_line(service, config, &buffer) else {
            break;
        };
        writeln!(stdout, "{reply}")?;
        stdout.flush()?;
    }
    Ok(())
}

/// Reply to one IPC line, or `None` when the client asked to quit.
fn handle_line(
    service: &RoiService,
    config: &RunnerConfig,
    line: &str,
) -> Option<serde_json::Value> {
    let outcome = serde_json::from_str::<IpcCommand>(line)
        .map_err(anyhow::Error::from)
        .and_then(|cmd| handle_command(service, config, cmd));
    match outcome {
        Ok(reply) => reply,
        Err(e) => Some(error_reply(&e)),
    }
}

fn handle_command(
    service: &RoiService,
    config: &RunnerConfig,
    cmd: IpcCommand,
) -> Result<Option<serde_json::Value>> {
    let reply = match cmd {
        IpcCommand::Simulate { inputs } => {
            let input = SimulationInput::from_json(&inputs)?;
            serde_json::json!({ "ok": true, "result": service.simulate(&input) })
        }
        IpcCommand::SaveScenario { inputs } => {
            let input = SimulationInput::from_json(&inputs)?;
            let saved = service.save_scenario(&input)?;
            serde_json::json!({ "ok": true, "id": saved.id, "result": saved.result })
        }
        IpcCommand::ListScenarios => {
            serde_json::json!({ "ok": true, "scenarios": service.list_scenarios()? })
        }
        IpcCommand::GenerateReport { email, inputs } => {
            let input = SimulationInput::from_json(&inputs)?;
            let path = write_report(service, config, &input, &email)?;
            serde_json::json!({ "ok": true, "path": path })
        }
        IpcCommand::Quit => return Ok(None),
    };
    Ok(Some(reply))
}

/// Failure reply, tagged with the error kind so a client can tell a bad
/// payload from a store or renderer outage.
fn error_reply(err: &anyhow::Error) -> serde_json::Value {
    let kind = match err.downcast_ref::<RoiError>() {
        Some(RoiError::InvalidInput { .. }) => "invalid_input",
        Some(RoiError::StoreUnavailable(_)) => "store_unavailable",
        Some(RoiError::StoreWriteFailed(_)) => "store_write_failed",
        Some(RoiError::StoreReadFailed(_)) => "store_read_failed",
        Some(RoiError::RenderFailed(_)) => "render_failed",
        Some(_) => "internal",
        None if err.is::<serde_json::Error>() => "bad_request",
        None => "internal",
    };
    log::warn!("ipc command failed ({kind}): {err:#}");
    serde_json::json!({ "ok": false, "kind": kind, "error": err.to_string() })
}

fn print_scenarios(records: &[ScenarioRecord]) {
    if records.is_empty() {
        println!("  (No saved scenarios)");
        return;
    }
    println!("=== SAVED SCENARIOS (newest first) ===");
    for r in records {
        println!(
            "  #{:<4} {} | {} | Monthly: ${:.0} | Net: ${:.0} | ROI: {:.1}% | Payback: {:.1} mo",
            r.id,
            r.created_at.format("%Y-%m-%d %H:%M:%S"),
            r.scenario_name,
            r.result.monthly_savings,
            r.result.net_savings,
            r.result.roi_percentage,
            r.result.payback_months,
        );
    }
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use roi_core::clock::FixedClock;
    use chrono::{TimeZone, Utc};
    use serde_json::{json, Value};

    // ── Test helpers ────────────────────────────────────────────────────────

    fn service(migrated: bool) -> RoiService {
        let clock: roi_core::clock::SharedClock =
            Arc::new(FixedClock(Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()));
        let store = SqliteScenarioStore::in_memory(clock.clone()).unwrap();
        if migrated {
            store.migrate().unwrap();
        }
        RoiService::new(Arc::new(store), Arc::new(PdfReportRenderer::new(clock)))
    }

    fn config(out: &Path) -> RunnerConfig {
        RunnerConfig {
            database_path: ":memory:".into(),
            output_dir: out.display().to_string(),
            render_timeout_ms: 10_000,
        }
    }

    fn inputs(name: &str) -> Value {
        json!({
            "scenario_name": name,
            "monthly_invoice_volume": 1000,
            "num_ap_staff": 2,
            "avg_hours_per_invoice": 0.1,
            "hourly_wage": 20,
            "error_rate_manual": 5,
            "error_cost": 50,
            "time_horizon_months": 12,
            "one_time_implementation_cost": 10000
        })
    }

    fn send(svc: &RoiService, cfg: &RunnerConfig, msg: Value) -> Value {
        handle_line(svc, cfg, &msg.to_string()).expect("a reply")
    }

    // ── Tests ───────────────────────────────────────────────────────────────

    #[test]
    fn simulate_replies_with_result() {
        let dir = tempfile::tempdir().unwrap();
        let (svc, cfg) = (service(true), config(dir.path()));

        let reply = send(&svc, &cfg, json!({ "type": "simulate", "inputs": inputs("pilot") }));
        assert_eq!(reply["ok"], true);
        let monthly = reply["result"]["monthly_savings"].as_f64().unwrap();
        assert!((monthly - 6875.0).abs() < 1e-6, "monthly savings {monthly}");
    }

    #[test]
    fn save_then_list_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let (svc, cfg) = (service(true), config(dir.path()));

        let saved = send(&svc, &cfg, json!({ "type": "save_scenario", "inputs": inputs("a") }));
        assert_eq!(saved["ok"], true);
        let id = saved["id"].as_i64().unwrap();

        let listed = send(&svc, &cfg, json!({ "type": "list_scenarios" }));
        assert_eq!(listed["ok"], true);
        assert_eq!(listed["scenarios"][0]["id"].as_i64(), Some(id));
        assert_eq!(listed["scenarios"][0]["scenario_name"], "a");
    }

    #[test]
    fn generate_report_writes_named_file() {
        let dir = tempfile::tempdir().unwrap();
        let (svc, cfg) = (service(true), config(dir.path()));

        let reply = send(
            &svc,
            &cfg,
            json!({ "type": "generate_report", "email": "cfo@example.com", "inputs": inputs("Q4 pilot") }),
        );
        assert_eq!(reply["ok"], true, "reply: {reply}");
        let written = dir.path().join("ROI_Report_Q4_pilot.pdf");
        assert_eq!(reply["path"], written.display().to_string());
        assert!(std::fs::read(&written).unwrap().starts_with(b"%PDF"));
    }

    #[test]
    fn quit_ends_the_session() {
        let dir = tempfile::tempdir().unwrap();
        let (svc, cfg) = (service(true), config(dir.path()));
        assert!(handle_line(&svc, &cfg, r#"{"type":"quit"}"#).is_none());
    }

    #[test]
    fn failures_are_tagged_by_kind() {
        let dir = tempfile::tempdir().unwrap();
        let (svc, cfg) = (service(true), config(dir.path()));

        let mut missing = inputs("x");
        missing.as_object_mut().unwrap().remove("hourly_wage");
        let reply = send(&svc, &cfg, json!({ "type": "simulate", "inputs": missing }));
        assert_eq!(reply["ok"], false);
        assert_eq!(reply["kind"], "invalid_input");

        let reply = handle_line(&svc, &cfg, "{not json").unwrap();
        assert_eq!(reply["kind"], "bad_request");

        let reply = send(&svc, &cfg, json!({ "type": "teleport" }));
        assert_eq!(reply["kind"], "bad_request");

        let reply = send(
            &svc,
            &cfg,
            json!({ "type": "generate_report", "email": " ", "inputs": inputs("x") }),
        );
        assert_eq!(reply["kind"], "render_failed");
    }

    /// A store without its schema can't be read; the reply says so.
    #[test]
    fn store_failures_are_tagged_by_kind() {
        let dir = tempfile::tempdir().unwrap();
        let (svc, cfg) = (service(false), config(dir.path()));

        let reply = send(&svc, &cfg, json!({ "type": "list_scenarios" }));
        assert_eq!(reply["ok"], false);
        assert_eq!(reply["kind"], "store_read_failed");

        let reply = send(&svc, &cfg, json!({ "type": "save_scenario", "inputs": inputs("x") }));
        assert_eq!(reply["kind"], "store_write_failed");
    }

    #[test]
    fn error_reply_maps_every_store_kind() {
        let cases = [
            (RoiError::StoreUnavailable("down".into()), "store_unavailable"),
            (RoiError::StoreWriteFailed("full".into()), "store_write_failed"),
            (RoiError::StoreReadFailed("corrupt".into()), "store_read_failed"),
            (RoiError::RenderFailed("jam".into()), "render_failed"),
            (RoiError::Other(anyhow::anyhow!("boom")), "internal"),
        ];
        for (err, kind) in cases {
            let reply = error_reply(&anyhow::Error::from(err));
            assert_eq!(reply["kind"], kind);
            assert_eq!(reply["ok"], false);
        }
    }
}
