//! System configuration parameters
//!
//! All tunable parameters for the acceptance pipeline and the motor jam
//! guards.  Values can be overridden from a JSON file (see
//! [`JsonConfigFile`](crate::adapters::config_file::JsonConfigFile)) or
//! hot-reloaded through [`AppCommand::UpdateConfig`](crate::app::commands::AppCommand).

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ConfigError;
use crate::motor::MotorId;
use crate::queue::MAX_QUEUE_CAPACITY;

/// Jam protection parameters for one heavy-duty motor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JamConfig {
    /// Current (A) above which a running motor is considered stalling
    pub stall_threshold_amps: f32,
    /// How long the over-current must persist before a jam is declared (ms)
    pub stall_duration_ms: u64,
    /// Reverse phase length during recovery (ms)
    pub reverse_ms: u64,
    /// Forward phase length during recovery (ms)
    pub forward_ms: u64,
    /// Stopped pause between recovery phases (ms)
    pub pause_ms: u64,
    /// Recoveries allowed before the motor is disabled
    pub max_attempts: u8,
    /// Accumulated clean running time that forgives past recoveries (ms)
    pub clean_run_reset_ms: u64,
    /// Length of one crush run started by the pipeline (ms)
    pub run_duration_ms: u64,
    /// Telemetry sampling period (ms)
    pub sample_period_ms: u64,
}

impl JamConfig {
    /// Crusher (aluminum) defaults.
    pub fn crusher() -> Self {
        Self {
            stall_threshold_amps: 5.0,
            ..Self::default()
        }
    }

    /// Breaker (glass) defaults.  The breaker draws more under normal load.
    pub fn breaker() -> Self {
        Self {
            stall_threshold_amps: 7.0,
            ..Self::default()
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.stall_threshold_amps > 0.0 && self.stall_threshold_amps.is_finite()) {
            return Err(ConfigError::ValidationFailed(
                "stall_threshold_amps must be a positive current",
            ));
        }
        if self.sample_period_ms == 0 || self.sample_period_ms > self.stall_duration_ms {
            return Err(ConfigError::ValidationFailed(
                "sample_period_ms must be non-zero and not exceed stall_duration_ms",
            ));
        }
        if self.reverse_ms == 0 || self.forward_ms == 0 {
            return Err(ConfigError::ValidationFailed(
                "recovery phases must have non-zero length",
            ));
        }
        if !(1..=10).contains(&self.max_attempts) {
            return Err(ConfigError::ValidationFailed(
                "max_attempts must be between 1 and 10",
            ));
        }
        if self.run_duration_ms == 0 {
            return Err(ConfigError::ValidationFailed(
                "run_duration_ms must be non-zero",
            ));
        }
        Ok(())
    }
}

impl Default for JamConfig {
    fn default() -> Self {
        Self {
            stall_threshold_amps: 5.0,
            stall_duration_ms: 2_000,
            reverse_ms: 5_000,
            forward_ms: 5_000,
            pause_ms: 1_000,
            max_attempts: 3,
            clean_run_reset_ms: 30_000,
            run_duration_ms: 10_000,
            sample_period_ms: 200,
        }
    }
}

/// Partial [`JamConfig`] as written in a config file.  Fields left out
/// keep the defaults of the motor being configured, not the generic ones.
#[derive(Deserialize)]
struct JamOverride {
    stall_threshold_amps: Option<f32>,
    stall_duration_ms: Option<u64>,
    reverse_ms: Option<u64>,
    forward_ms: Option<u64>,
    pause_ms: Option<u64>,
    max_attempts: Option<u8>,
    clean_run_reset_ms: Option<u64>,
    run_duration_ms: Option<u64>,
    sample_period_ms: Option<u64>,
}

impl JamOverride {
    fn over(self, base: JamConfig) -> JamConfig {
        JamConfig {
            stall_threshold_amps: self.stall_threshold_amps.unwrap_or(base.stall_threshold_amps),
            stall_duration_ms: self.stall_duration_ms.unwrap_or(base.stall_duration_ms),
            reverse_ms: self.reverse_ms.unwrap_or(base.reverse_ms),
            forward_ms: self.forward_ms.unwrap_or(base.forward_ms),
            pause_ms: self.pause_ms.unwrap_or(base.pause_ms),
            max_attempts: self.max_attempts.unwrap_or(base.max_attempts),
            clean_run_reset_ms: self.clean_run_reset_ms.unwrap_or(base.clean_run_reset_ms),
            run_duration_ms: self.run_duration_ms.unwrap_or(base.run_duration_ms),
            sample_period_ms: self.sample_period_ms.unwrap_or(base.sample_period_ms),
        }
    }
}

/// Binary encodings carry every field, so only human-readable input is merged.
fn motor_profile<'de, D>(deserializer: D, base: JamConfig) -> Result<JamConfig, D::Error>
where
    D: Deserializer<'de>,
{
    if deserializer.is_human_readable() {
        Ok(JamOverride::deserialize(deserializer)?.over(base))
    } else {
        JamConfig::deserialize(deserializer)
    }
}

fn crusher_profile<'de, D: Deserializer<'de>>(deserializer: D) -> Result<JamConfig, D::Error> {
    motor_profile(deserializer, JamConfig::crusher())
}

fn breaker_profile<'de, D: Deserializer<'de>>(deserializer: D) -> Result<JamConfig, D::Error> {
    motor_profile(deserializer, JamConfig::breaker())
}

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    // --- Pipeline timing ---
    /// Bounded wait for weight + classification in AwaitingData (ms)
    pub data_timeout_ms: u64,
    /// Bounded wait between entry and exit trigger (ms)
    pub transit_timeout_ms: u64,
    /// How long the belt reverses when returning an item (ms)
    pub return_reverse_ms: u64,
    /// Longest wait for a returned item to be taken back (ms)
    pub return_timeout_ms: u64,
    /// A barcode read this recently before an entry trigger is attached to the new item (ms)
    pub barcode_latch_ms: u64,

    // --- Queue ---
    /// Accepted items allowed in flight between inspection and diverter
    pub queue_capacity: usize,

    // --- Verification tolerances ---
    /// Slack applied on both sides of the catalog weight range (g)
    pub weight_tolerance_g: f32,
    /// Slack applied on both sides of the catalog width/height range (mm)
    pub dimension_tolerance_mm: f32,

    // --- Runtime ---
    /// Period of the timeout tick posted to the pipeline (ms)
    pub tick_interval_ms: u64,
    /// Telemetry report interval (seconds)
    pub telemetry_interval_secs: u32,

    // --- Motors ---
    #[serde(deserialize_with = "crusher_profile")]
    pub crusher: JamConfig,
    #[serde(deserialize_with = "breaker_profile")]
    pub breaker: JamConfig,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            data_timeout_ms: 2_000,
            transit_timeout_ms: 30_000,
            return_reverse_ms: 1_000,
            return_timeout_ms: 15_000,
            barcode_latch_ms: 1_000,

            queue_capacity: 10,

            weight_tolerance_g: 20.0,
            dimension_tolerance_mm: 10.0,

            tick_interval_ms: 100,     // 10 Hz
            telemetry_interval_secs: 60, // 1/min

            crusher: JamConfig::crusher(),
            breaker: JamConfig::breaker(),
        }
    }
}

impl SystemConfig {
    pub fn jam(&self, motor: MotorId) -> &JamConfig {
        match motor {
            MotorId::Crusher => &self.crusher,
            MotorId::Breaker => &self.breaker,
        }
    }

    /// Range-check every field.  Invalid values are rejected, never clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_capacity == 0 || self.queue_capacity > MAX_QUEUE_CAPACITY {
            return Err(ConfigError::ValidationFailed(
                "queue_capacity must be between 1 and 16",
            ));
        }
        if self.data_timeout_ms == 0 || self.transit_timeout_ms == 0 {
            return Err(ConfigError::ValidationFailed(
                "data and transit timeouts must be non-zero",
            ));
        }
        if self.return_reverse_ms == 0 || self.return_timeout_ms < self.return_reverse_ms {
            return Err(ConfigError::ValidationFailed(
                "return_reverse_ms must be non-zero and not exceed return_timeout_ms",
            ));
        }
        if self.tick_interval_ms == 0 || self.tick_interval_ms > self.data_timeout_ms {
            return Err(ConfigError::ValidationFailed(
                "tick_interval_ms must be non-zero and not exceed data_timeout_ms",
            ));
        }
        if !(self.weight_tolerance_g >= 0.0 && self.dimension_tolerance_mm >= 0.0) {
            return Err(ConfigError::ValidationFailed(
                "tolerances must be zero or positive",
            ));
        }
        if self.telemetry_interval_secs == 0 {
            return Err(ConfigError::ValidationFailed(
                "telemetry_interval_secs must be non-zero",
            ));
        }
        self.crusher.validate()?;
        self.breaker.validate()
    }
}
