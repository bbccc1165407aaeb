//! Jam guard: stall supervision for one heavy-duty motor.
//!
//! Each guard is driven by its own sampling task at a fixed period.
//! Every sample feeds the latest drive telemetry to [`JamGuard::sample`],
//! which may command the motor and returns at most one [`JamEvent`] for
//! the pipeline.
//!
//! ## Guard lifecycle
//!
//! ```text
//!  MONITORING ──[stall ≥ stall_duration, attempts left]──▶ RECOVERING
//!    ▲  ▲                                                      │
//!    │  └───────────────────[sequence done]────────────────────┘
//!    │
//!    │        [stall ≥ stall_duration, attempts exhausted]
//!    │                 MONITORING ──▶ DISABLED
//!    │                                   │
//!    └─────────────[reset]───────────────┘
//! ```
//!
//! While recovering the guard owns the motor exclusively: ordinary run
//! requests are withheld and replayed when the sequence completes, and a
//! reset is latched until then.  An interrupted or withheld crush run
//! resumes with a full `run_duration_ms`.  Once disabled, no command
//! reaches the motor until [`JamGuard::reset`].

pub mod recovery;

use log::{error, info, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::MotorPort;
use crate::config::JamConfig;
use crate::error::TelemetryError;
use crate::motor::{Direction, MotorId, MotorReading};

use recovery::{RECOVERY_STEPS, RecoveryPhase, RecoveryStep};

// ---------------------------------------------------------------------------
// State and events
// ---------------------------------------------------------------------------

/// Observable per-motor supervision state.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct JamState {
    /// The guard currently has the motor energised.
    pub is_active: bool,
    pub stall_started_at: Option<u64>,
    pub last_current_reading: f32,
    pub recovery_attempt: u8,
    pub recovery_phase: RecoveryPhase,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardMode {
    Monitoring,
    Recovering { step: usize, step_started_ms: u64 },
    /// Terminal until an external reset.
    Disabled,
}

/// Supervision events reported to the pipeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JamEvent {
    StallSuspected { current_amps: f32 },
    StallCleared,
    JamDetected { attempt: u8 },
    RecoveryCompleted { attempt: u8 },
    MotorDisabled { attempts: u8 },
    MotorReset,
}

/// Answer to a crush-run request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunRequest {
    Started,
    /// Already running; the deadline was pushed out.
    Extended,
    /// Recovery in progress; the run starts when it completes.
    Withheld,
    /// Motor disabled.
    Refused,
}

/// "Manual intervention required" record for a disabled motor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MotorFault {
    pub motor: MotorId,
    pub attempts: u8,
    pub at_ms: u64,
}

// ---------------------------------------------------------------------------
// Guard
// ---------------------------------------------------------------------------

pub struct JamGuard {
    motor: MotorId,
    cfg: JamConfig,
    state: JamState,
    mode: GuardMode,
    /// Deadline of the current timed crush run.
    run_until: Option<u64>,
    /// A run was requested during recovery.
    run_pending: bool,
    /// A reset arrived during recovery.
    reset_pending: bool,
    /// Running time without a stall since the last recovery.
    clean_run_ms: u64,
    last_sample_ms: Option<u64>,
}

impl JamGuard {
    pub fn new(motor: MotorId, cfg: JamConfig) -> Self {
        Self {
            motor,
            cfg,
            state: JamState::default(),
            mode: GuardMode::Monitoring,
            run_until: None,
            run_pending: false,
            reset_pending: false,
            clean_run_ms: 0,
            last_sample_ms: None,
        }
    }

    pub fn motor(&self) -> MotorId {
        self.motor
    }

    pub fn config(&self) -> &JamConfig {
        &self.cfg
    }

    pub fn state(&self) -> &JamState {
        &self.state
    }

    pub fn mode(&self) -> GuardMode {
        self.mode
    }

    pub fn is_disabled(&self) -> bool {
        self.mode == GuardMode::Disabled
    }

    pub fn is_recovering(&self) -> bool {
        matches!(self.mode, GuardMode::Recovering { .. })
    }

    // ── Run requests ─────────────────────────────────────────

    /// Start (or extend) a timed forward crush run.
    pub fn request_run(&mut self, now_ms: u64, drive: &mut impl MotorPort) -> RunRequest {
        match self.mode {
            GuardMode::Disabled => {
                warn!("JAM[{}]: run refused, motor disabled", self.motor);
                RunRequest::Refused
            }
            GuardMode::Recovering { .. } => {
                info!("JAM[{}]: run withheld until recovery completes", self.motor);
                self.run_pending = true;
                RunRequest::Withheld
            }
            GuardMode::Monitoring => {
                self.run_until = Some(now_ms + self.cfg.run_duration_ms);
                if self.state.is_active {
                    RunRequest::Extended
                } else {
                    drive.run(self.motor, Direction::Forward);
                    self.state.is_active = true;
                    info!(
                        "JAM[{}]: crush run started for {} ms",
                        self.motor, self.cfg.run_duration_ms
                    );
                    RunRequest::Started
                }
            }
        }
    }

    /// External reset: leaves Disabled and forgets past recoveries.
    ///
    /// A recovery in progress is never cut short; the reset is applied
    /// when its last step completes.
    pub fn reset(&mut self, drive: &mut impl MotorPort) -> JamEvent {
        if self.is_recovering() {
            info!("JAM[{}]: reset latched until recovery completes", self.motor);
            self.reset_pending = true;
            return JamEvent::MotorReset;
        }
        self.clear(drive);
        info!("JAM[{}]: reset, recovery attempts cleared", self.motor);
        JamEvent::MotorReset
    }

    fn clear(&mut self, drive: &mut impl MotorPort) {
        if self.state.is_active {
            drive.stop(self.motor);
        }
        self.state = JamState {
            last_current_reading: self.state.last_current_reading,
            ..JamState::default()
        };
        self.mode = GuardMode::Monitoring;
        self.run_until = None;
        self.run_pending = false;
        self.reset_pending = false;
        self.clean_run_ms = 0;
    }

    // ── Sampling ─────────────────────────────────────────────

    /// Feed one telemetry sample.  A failed read counts as 0 A, not running.
    pub fn sample(
        &mut self,
        now_ms: u64,
        reading: Result<MotorReading, TelemetryError>,
        drive: &mut impl MotorPort,
    ) -> Option<JamEvent> {
        let reading = reading.unwrap_or_else(|e| {
            warn!("JAM[{}]: telemetry read failed ({}), treating as idle", self.motor, e);
            MotorReading::IDLE
        });
        self.state.last_current_reading = reading.current_amps;
        let dt = self
            .last_sample_ms
            .map_or(0, |last| now_ms.saturating_sub(last));
        self.last_sample_ms = Some(now_ms);

        match self.mode {
            GuardMode::Disabled => None,
            GuardMode::Recovering { .. } => self.advance_recovery(now_ms, drive),
            GuardMode::Monitoring => self.monitor(now_ms, dt, reading, drive),
        }
    }

    fn monitor(
        &mut self,
        now_ms: u64,
        dt: u64,
        reading: MotorReading,
        drive: &mut impl MotorPort,
    ) -> Option<JamEvent> {
        if self.state.is_active && self.run_until.is_some_and(|t| now_ms >= t) {
            drive.stop(self.motor);
            self.state.is_active = false;
            self.run_until = None;
            info!("JAM[{}]: crush run finished", self.motor);
        }

        if reading.running && reading.current_amps > self.cfg.stall_threshold_amps {
            return match self.state.stall_started_at {
                None => {
                    self.state.stall_started_at = Some(now_ms);
                    warn!(
                        "JAM[{}]: over-current {:.2} A (limit {:.2} A), watching",
                        self.motor, reading.current_amps, self.cfg.stall_threshold_amps
                    );
                    Some(JamEvent::StallSuspected {
                        current_amps: reading.current_amps,
                    })
                }
                Some(start) if now_ms.saturating_sub(start) >= self.cfg.stall_duration_ms => {
                    Some(self.confirm_jam(now_ms, drive))
                }
                Some(_) => None,
            };
        }

        if self.state.stall_started_at.take().is_some() {
            info!(
                "JAM[{}]: current back to {:.2} A, false alarm",
                self.motor, reading.current_amps
            );
            return Some(JamEvent::StallCleared);
        }

        if reading.running {
            self.clean_run_ms = self.clean_run_ms.saturating_add(dt);
            if self.state.recovery_attempt > 0 && self.clean_run_ms >= self.cfg.clean_run_reset_ms {
                info!(
                    "JAM[{}]: {} ms clean running, recovery attempts cleared",
                    self.motor, self.clean_run_ms
                );
                self.state.recovery_attempt = 0;
                self.clean_run_ms = 0;
            }
        }
        None
    }

    fn confirm_jam(&mut self, now_ms: u64, drive: &mut impl MotorPort) -> JamEvent {
        self.state.stall_started_at = None;
        self.clean_run_ms = 0;

        if self.state.recovery_attempt >= self.cfg.max_attempts {
            drive.stop(self.motor);
            self.state.is_active = false;
            self.state.recovery_phase = RecoveryPhase::None;
            self.run_until = None;
            self.run_pending = false;
            self.mode = GuardMode::Disabled;
            error!(
                "JAM[{}]: MOTOR DISABLED after {} recoveries, manual intervention required",
                self.motor, self.state.recovery_attempt
            );
            return JamEvent::MotorDisabled {
                attempts: self.state.recovery_attempt,
            };
        }

        self.state.recovery_attempt += 1;
        warn!(
            "JAM[{}]: jam confirmed at {:.2} A, recovery {}/{} ({} ms)",
            self.motor,
            self.state.last_current_reading,
            self.state.recovery_attempt,
            self.cfg.max_attempts,
            recovery::total_duration_ms(&self.cfg)
        );
        self.mode = GuardMode::Recovering {
            step: 0,
            step_started_ms: now_ms,
        };
        self.enter_step(RECOVERY_STEPS[0], drive);
        JamEvent::JamDetected {
            attempt: self.state.recovery_attempt,
        }
    }

    // ── Recovery sequencing ──────────────────────────────────

    fn advance_recovery(&mut self, now_ms: u64, drive: &mut impl MotorPort) -> Option<JamEvent> {
        let GuardMode::Recovering {
            mut step,
            mut step_started_ms,
        } = self.mode
        else {
            return None;
        };

        loop {
            let held = RECOVERY_STEPS[step].duration_ms(&self.cfg);
            if now_ms.saturating_sub(step_started_ms) < held {
                self.mode = GuardMode::Recovering {
                    step,
                    step_started_ms,
                };
                return None;
            }
            step_started_ms += held;
            step += 1;
            if step == RECOVERY_STEPS.len() {
                return Some(self.finish_recovery(now_ms, drive));
            }
            self.enter_step(RECOVERY_STEPS[step], drive);
        }
    }

    fn enter_step(&mut self, step: RecoveryStep, drive: &mut impl MotorPort) {
        match step.direction() {
            Some(dir) => {
                drive.run(self.motor, dir);
                self.state.is_active = true;
            }
            None => {
                drive.stop(self.motor);
                self.state.is_active = false;
            }
        }
        self.state.recovery_phase = step.phase();
    }

    fn finish_recovery(&mut self, now_ms: u64, drive: &mut impl MotorPort) -> JamEvent {
        let attempt = self.state.recovery_attempt;
        drive.stop(self.motor);
        self.state.is_active = false;
        self.state.recovery_phase = RecoveryPhase::None;
        self.mode = GuardMode::Monitoring;

        if self.reset_pending {
            self.clear(drive);
            info!(
                "JAM[{}]: recovery {} complete, latched reset applied",
                self.motor, attempt
            );
            return JamEvent::RecoveryCompleted { attempt };
        }

        // the jammed run never got its full window
        let resume = std::mem::take(&mut self.run_pending) || self.run_until.is_some();
        if resume {
            self.run_until = Some(now_ms + self.cfg.run_duration_ms);
            drive.run(self.motor, Direction::Forward);
            self.state.is_active = true;
        }
        info!(
            "JAM[{}]: recovery {} complete, {}",
            self.motor,
            attempt,
            if resume { "crush run resumed" } else { "motor idle" }
        );

        JamEvent::RecoveryCompleted { attempt }
    }
}
