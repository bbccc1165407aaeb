//! Application service, the hexagonal core.
//!
//! [`AppService`] owns the pipeline state machine and the live catalog
//! snapshot.  It exposes a clean, hardware-agnostic API.  All I/O flows
//! through port traits injected at call sites, making the entire service
//! testable with mock adapters.
//!
//! ```text
//!   Msg ──▶ ┌────────────────────────┐ ──▶ ActuatorPort / MotorGate
//!           │      AppService         │ ──▶ ClassifierPort
//!           │  Pipeline · Catalog     │ ──▶ ReportSink / EventSink
//!           └────────────────────────┘
//! ```

use log::{info, warn};

use crate::catalog::CatalogSnapshot;
use crate::config::SystemConfig;
use crate::events::Msg;
use crate::motor::MotorId;
use crate::pipeline::context::{Command, Effect, PipelineStats};
use crate::pipeline::{Input, Pipeline, StateId};

use super::commands::AppCommand;
use super::events::{AppEvent, TelemetryData};
use super::ports::{ActuatorPort, ClassifierPort, EventSink, MotorGate, ReportSink};

// ───────────────────────────────────────────────────────────────
// AppService
// ───────────────────────────────────────────────────────────────

/// The application service orchestrates all domain logic.
pub struct AppService {
    pipeline: Pipeline,
    catalog: CatalogSnapshot,
    messages: u64,
}

impl AppService {
    /// Construct the service.  Does **not** start it; call [`start`](Self::start) next.
    pub fn new(config: SystemConfig, catalog: CatalogSnapshot) -> Self {
        Self {
            pipeline: Pipeline::new(config),
            catalog,
            messages: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    pub fn start(&mut self, sink: &mut impl EventSink) {
        self.pipeline.start();
        for effect in self.pipeline.drain_effects() {
            if let Effect::Event(e) = effect {
                sink.emit(&e);
            }
        }
        info!(
            "AppService started in {:?} with {} catalog entries",
            self.pipeline.state_id(),
            self.catalog.len()
        );
    }

    // ── Message handling ──────────────────────────────────────

    /// Process one inbox message at `now_ms` and apply every resulting effect.
    ///
    /// `hw` carries all three outbound command ports.
    pub fn handle(
        &mut self,
        msg: Msg,
        now_ms: u64,
        hw: &mut (impl ActuatorPort + ClassifierPort + MotorGate),
        sinks: &mut (impl ReportSink + EventSink),
    ) {
        self.messages += 1;
        match msg {
            Msg::Sensor(ev) => self.pipeline.handle(Input::Sensor(ev), now_ms, &self.catalog),
            Msg::Classified { item, result } => {
                self.pipeline
                    .handle(Input::Classified { item, result }, now_ms, &self.catalog);
            }
            Msg::Tick => self.pipeline.tick(now_ms, &self.catalog),
            Msg::Jam { motor, event } => self.pipeline.on_jam(motor, event, now_ms),
            Msg::Telemetry => sinks.emit(&AppEvent::Telemetry(self.build_telemetry())),
            Msg::Command(cmd) => self.handle_command(cmd, hw, sinks),
        }
        self.apply_effects(hw, sinks);
    }

    /// Process an external command (operator panel, catalog sync, etc.).
    pub fn handle_command(
        &mut self,
        cmd: AppCommand,
        hw: &mut impl MotorGate,
        sink: &mut impl EventSink,
    ) {
        match cmd {
            AppCommand::ResetMotor(motor) => {
                info!("Operator reset requested for {}", motor);
                hw.reset_motor(motor);
            }
            AppCommand::ReplaceCatalog(catalog) => {
                let entries = catalog.len();
                self.catalog = catalog;
                info!("Catalog replaced ({} entries)", entries);
                sink.emit(&AppEvent::CatalogReplaced { entries });
            }
            AppCommand::UpdateConfig(config) => match config.validate() {
                Ok(()) => {
                    self.pipeline.context_mut().apply_config(config);
                    info!("Configuration updated at runtime");
                    sink.emit(&AppEvent::ConfigUpdated);
                }
                Err(e) => warn!("Configuration update rejected: {}", e),
            },
            AppCommand::ReportStatus => sink.emit(&AppEvent::Telemetry(self.build_telemetry())),
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn build_telemetry(&self) -> TelemetryData {
        let ctx = self.pipeline.context();
        TelemetryData {
            state: self.pipeline.state_id(),
            queue_len: ctx.queue.len(),
            queue_capacity: ctx.queue.capacity(),
            accepted: ctx.stats.accepted,
            rejected: ctx.stats.rejected,
            crusher_disabled: ctx.is_disabled(MotorId::Crusher),
            breaker_disabled: ctx.is_disabled(MotorId::Breaker),
        }
    }

    pub fn state(&self) -> StateId {
        self.pipeline.state_id()
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn is_motor_disabled(&self, motor: MotorId) -> bool {
        self.pipeline.context().is_disabled(motor)
    }

    pub fn stats(&self) -> PipelineStats {
        self.pipeline.context().stats
    }

    /// Inbox messages handled since startup.
    pub fn message_count(&self) -> u64 {
        self.messages
    }

    pub fn current_config(&self) -> SystemConfig {
        self.pipeline.context().config.clone()
    }

    // ── Internal ──────────────────────────────────────────────

    /// Translate buffered pipeline effects into port calls, in order.
    fn apply_effects(
        &mut self,
        hw: &mut (impl ActuatorPort + ClassifierPort + MotorGate),
        sinks: &mut (impl ReportSink + EventSink),
    ) {
        for effect in self.pipeline.drain_effects() {
            match effect {
                Effect::Actuate(cmd) => match cmd {
                    Command::BeltForward => hw.belt_forward(),
                    Command::BeltReverse => hw.belt_reverse(),
                    Command::BeltStop => hw.belt_stop(),
                    Command::DiverterToBin(m) => hw.diverter_to_bin(m),
                    Command::FlapToBin(m) => hw.flap_to_bin(m),
                    Command::MeasureWeight => hw.request_weight(),
                },
                Effect::Classify(item) => hw.request_classification(item),
                Effect::Crush { item, motor } => {
                    if !hw.request_run(motor) {
                        warn!("{} crush request refused, {} routed without crushing", motor, item);
                        sinks.emit(&AppEvent::CrushSkipped { item, motor });
                    }
                }
                Effect::Report(outcome) => sinks.report_outcome(&outcome),
                Effect::Fault(fault) => sinks.report_fault(&fault),
                Effect::Event(event) => sinks.emit(&event),
            }
        }
    }
}
