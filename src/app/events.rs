//! Outbound application events.
//!
//! The [`AppService`](super::service::AppService) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them: log them, drive the kiosk screen,
//! push them to a maintenance dashboard, etc.

use crate::item::{ItemId, Material};
use crate::jam::{JamEvent, MotorFault};
use crate::motor::MotorId;
use crate::pipeline::StateId;
use crate::verification::ReasonCode;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The application service has started (carries initial state).
    Started(StateId),

    /// The pipeline transitioned between states.
    StateChanged { from: StateId, to: StateId },

    /// An item passed verification and joined the routing queue.
    ItemQueued { item: ItemId, queue_len: usize },

    /// An item was rejected and is being returned to the customer.
    ItemRejected { item: ItemId, reason: ReasonCode },

    /// The queue head left through the diverter.
    ItemRouted { item: ItemId, material: Material },

    /// A jam guard reported a supervision event.
    Jam { motor: MotorId, event: JamEvent },

    /// A motor is disabled and needs manual intervention.
    MotorFault(MotorFault),

    /// A crush run was skipped because the motor is disabled.
    CrushSkipped { item: ItemId, motor: MotorId },

    /// Configuration was replaced at runtime.
    ConfigUpdated,

    /// A new catalog snapshot is in use.
    CatalogReplaced { entries: usize },

    /// Periodic telemetry snapshot.
    Telemetry(TelemetryData),
}

/// A point-in-time telemetry snapshot suitable for logging or transmission.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryData {
    pub state: StateId,
    pub queue_len: usize,
    pub queue_capacity: usize,
    pub accepted: u32,
    pub rejected: u32,
    pub crusher_disabled: bool,
    pub breaker_disabled: bool,
}
