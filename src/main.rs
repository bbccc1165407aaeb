//! rvm-bench: run the controller against a scripted machine.
//!
//! ```text
//! rvm-bench <scenario.json> [config.json] [state_dir]
//! ```
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  SimConveyor        SimDrives        LedgerSink   LogEventSink │
//! │  (Actuator+Class.)  (Motor+Telem.)   (Reports)    (EventSink)  │
//! │  JsonConfigFile     DirStore/MemStore  MonotonicClock          │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │      AppService (pipeline · catalog)   JamGuard × 2    │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  Runtime (edge-executor · async-io-mini · embassy-sync inbox)  │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use core::time::Duration;
use std::path::Path;

use anyhow::{Context, Result, bail};
use log::{info, warn};
use tracing_subscriber::EnvFilter;

use rvmcore::adapters::config_file::JsonConfigFile;
use rvmcore::adapters::ledger::{LedgerSink, Outputs};
use rvmcore::adapters::log_sink::LogEventSink;
use rvmcore::adapters::sim::{Scenario, SimConveyor, SimDrives, scripted_events};
use rvmcore::adapters::store::{DirStore, MemStore};
use rvmcore::adapters::time::MonotonicClock;
use rvmcore::app::ports::{ConfigPort, StoragePort};
use rvmcore::app::service::AppService;
use rvmcore::config::SystemConfig;
use rvmcore::diagnostics;
use rvmcore::events::Inbox;
use rvmcore::motor::MotorId;
use rvmcore::runtime::{Adapters, GuardChannels, Runtime};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();
    diagnostics::install_panic_handler();

    let mut args = std::env::args().skip(1);
    let Some(scenario_path) = args.next() else {
        bail!("usage: rvm-bench <scenario.json> [config.json] [state_dir]");
    };

    let config = match args.next() {
        Some(path) => JsonConfigFile::new(&path)
            .load()
            .with_context(|| format!("loading config {path}"))?,
        None => SystemConfig::default(),
    };
    let scenario = Scenario::load(Path::new(&scenario_path))
        .with_context(|| format!("loading scenario {scenario_path}"))?;

    info!(
        "rvm-bench: {} events, {} inspections, {} jam windows, {} ms",
        scenario.events.len(),
        scenario.items.len(),
        scenario.jams.len(),
        scenario.duration_ms
    );

    match args.next() {
        Some(dir) => {
            let store = DirStore::open(&dir).map_err(|e| anyhow::anyhow!("state dir {dir}: {e}"))?;
            run_bench(config, &scenario, store)
        }
        None => run_bench(config, &scenario, MemStore::new()),
    }
}

fn run_bench<S: StoragePort>(config: SystemConfig, scenario: &Scenario, store: S) -> Result<()> {
    let catalog = scenario
        .catalog_snapshot()
        .context("building catalog snapshot")?;

    let inbox = Inbox::new();
    let guards = GuardChannels::new();
    let clock = MonotonicClock::new();

    let mut service = AppService::new(config, catalog);
    let mut outputs = Outputs {
        reports: LedgerSink::new(store),
        events: LogEventSink::new(),
    };
    let drives = SimDrives::new(scenario.jams.clone(), clock);
    let adapters = Adapters {
        hw: SimConveyor::new(&inbox, scenario.items.clone()),
        drives: drives.clone(),
        clock,
    };
    let sensors = scripted_events(scenario.events.clone(), clock);

    let runtime = Runtime::new(&inbox, &guards);
    runtime.run(
        &mut service,
        adapters,
        &mut outputs,
        sensors,
        async_io_mini::Timer::after(Duration::from_millis(scenario.duration_ms)),
    );

    // ── Summary ───────────────────────────────────────────────
    let ledger = &outputs.reports;
    let stats = service.stats();
    info!(
        "rvm-bench done: {} items seen, {} accepted, {} rejected, {} timeouts, final state {}",
        stats.items_seen,
        ledger.accepted(),
        ledger.rejected(),
        stats.timeouts,
        service.state()
    );
    for record in ledger.records() {
        info!(
            "  item {:>3} barcode {:<14} {} (code {})",
            record.item,
            record.barcode.as_deref().unwrap_or("-"),
            if record.accepted { "ACCEPTED" } else { "REJECTED" },
            record.code
        );
    }
    for motor in MotorId::ALL {
        info!(
            "  {}: {} drive commands, {}",
            motor,
            drives.command_count(motor),
            if service.is_motor_disabled(motor) {
                "DISABLED"
            } else {
                "in service"
            }
        );
    }
    for fault in ledger.stored_faults() {
        warn!(
            "  fault on record: {} after {} recoveries at {} ms",
            fault.motor, fault.attempts, fault.at_ms
        );
    }
    Ok(())
}
