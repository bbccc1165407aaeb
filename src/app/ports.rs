//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AppService / JamGuard (domain)
//! ```
//!
//! Driven adapters (belt and diverter I/O, motor drives, classifier,
//! catalog, ledger, storage) implement these traits.  The domain consumes
//! them via generics, so the core never touches hardware directly.
//!
//! ## Contract notes
//!
//! - Actuator and motor commands are fire-and-forget; adapters log their own failures.
//! - **ConfigPort** implementations MUST validate before persisting.
//! - All port errors are typed; callers handle every variant explicitly.

use crate::catalog::CatalogEntry;
use crate::config::SystemConfig;
use crate::error::{ConfigError, StorageError, TelemetryError};
use crate::item::{ItemId, Material};
use crate::jam::MotorFault;
use crate::motor::{Direction, MotorId, MotorReading};
use crate::verification::Outcome;

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: pipeline → conveyor hardware)
// ───────────────────────────────────────────────────────────────

/// Belt, diverter and flap commands.  Only the pipeline calls these.
pub trait ActuatorPort {
    fn belt_forward(&mut self);

    fn belt_reverse(&mut self);

    fn belt_stop(&mut self);

    /// Point the sorting diverter at the bin for `material`.
    fn diverter_to_bin(&mut self, material: Material);

    /// Set the bin flap for `material`.
    fn flap_to_bin(&mut self, material: Material);

    /// Ask the load cell for a reading; it arrives later as a sensor event.
    fn request_weight(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Motor ports (driven adapter: jam guard ↔ motor drives)
// ───────────────────────────────────────────────────────────────

/// Direct motor drive commands.  Only a jam guard calls these.
pub trait MotorPort {
    fn run(&mut self, motor: MotorId, direction: Direction);

    fn stop(&mut self, motor: MotorId);
}

/// Live drive telemetry sampled by the jam guards.
pub trait TelemetryPort {
    fn read_motor(&mut self, motor: MotorId) -> Result<MotorReading, TelemetryError>;
}

/// The pipeline's handle on the jam guards.  Requests are queued and
/// never block; the guard decides whether the run starts now, later, or
/// not at all.
pub trait MotorGate {
    /// Returns `false` if the request could not be queued.
    fn request_run(&mut self, motor: MotorId) -> bool;

    fn reset_motor(&mut self, motor: MotorId);
}

// ───────────────────────────────────────────────────────────────
// Classifier port (driven adapter: pipeline → image classifier)
// ───────────────────────────────────────────────────────────────

/// Capture-and-classify, invoked once per item.  The answer comes back
/// as an inbound message tagged with the same [`ItemId`].
pub trait ClassifierPort {
    fn request_classification(&mut self, item: ItemId);
}

// ───────────────────────────────────────────────────────────────
// Catalog port (driven adapter: read-only product table)
// ───────────────────────────────────────────────────────────────

pub trait CatalogPort {
    fn lookup(&self, barcode: &str) -> Option<&CatalogEntry>;
}

// ───────────────────────────────────────────────────────────────
// Report sink (driven adapter: pipeline → remote ledger)
// ───────────────────────────────────────────────────────────────

/// Terminal outcomes and motor faults, each delivered exactly once by
/// the core.  Delivery onwards may be at-least-once.
pub trait ReportSink {
    fn report_outcome(&mut self, outcome: &Outcome);

    fn report_fault(&mut self, fault: &MotorFault);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go (log, kiosk UI,
/// websocket, etc.).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists system configuration.
///
/// Implementations MUST validate config values before persisting.
/// Invalid ranges are rejected with [`ConfigError::ValidationFailed`],
/// not silently clamped.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`SystemConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<SystemConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ persistent key/value store)
// ───────────────────────────────────────────────────────────────

/// Persistent key-value storage for the fault log and similar records.
///
/// - Keys are namespaced to prevent collisions between subsystems.
/// - Write operations MUST be atomic: no partial writes on power loss.
pub trait StoragePort {
    /// Read a value.  Returns the number of bytes written to `buf`.
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Write a value atomically.
    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Delete a key.  Returns `Ok(())` even if the key didn't exist.
    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError>;

    /// Check whether a key exists without reading it.
    fn exists(&self, namespace: &str, key: &str) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Clock port (driven adapter: monotonic time source)
// ───────────────────────────────────────────────────────────────

/// Monotonic milliseconds.  Every timestamp the core sees comes from here.
pub trait ClockPort {
    fn now_ms(&self) -> u64;
}
