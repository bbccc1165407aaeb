//! Message-driven event system.
//!
//! Every input to the pipeline (sensor edges, load-cell readings,
//! classifier answers, jam guard reports, timeout ticks, operator
//! commands) is a [`Msg`] posted into one bounded [`Inbox`].  A single
//! actor drains the inbox, so pipeline state is only ever mutated from
//! one place.
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌──────────────────┐
//! │ Sensors     │────▶│              │     │                  │
//! │ Classifier  │────▶│    Inbox     │────▶│  Pipeline actor  │
//! │ Jam guards  │────▶│  (bounded)   │     │  (sole consumer) │
//! │ Tick/Cmds   │────▶│              │     │                  │
//! └─────────────┘     └──────────────┘     └──────────────────┘
//! ```
//!
//! Per-channel order is preserved; no ordering holds across channels.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::app::commands::AppCommand;
use crate::error::ClassifierError;
use crate::item::{Classification, ItemId};
use crate::jam::JamEvent;
use crate::motor::MotorId;

/// Inbox depth.  Sized for a burst of sensor edges plus guard reports.
pub const INBOX_DEPTH: usize = 32;

/// Per-guard request queue depth.
pub const GUARD_QUEUE_DEPTH: usize = 4;

/// Discrete events from the conveyor's sensors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorEvent {
    EntryTrigger,
    ExitTrigger,
    DiverterEntry,
    DiverterExit,
    BarcodeRead(String),
    /// Grams.
    WeightReading(f32),
}

/// Everything the pipeline actor consumes.
#[derive(Debug)]
pub enum Msg {
    Sensor(SensorEvent),
    Classified {
        item: ItemId,
        result: Result<Classification, ClassifierError>,
    },
    Jam {
        motor: MotorId,
        event: JamEvent,
    },
    /// Periodic tick that drives timeouts.
    Tick,
    /// Periodic telemetry request.
    Telemetry,
    Command(AppCommand),
}

/// Work handed from the pipeline to one jam guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardRequest {
    Run,
    Reset,
}

pub type Inbox = Channel<CriticalSectionRawMutex, Msg, INBOX_DEPTH>;

pub type GuardQueue = Channel<CriticalSectionRawMutex, GuardRequest, GUARD_QUEUE_DEPTH>;

/// Non-blocking post for producers that must never stall (ticks,
/// callbacks on foreign threads).  Drops and logs when the inbox is full.
pub fn post(inbox: &Inbox, msg: Msg) -> bool {
    match inbox.try_send(msg) {
        Ok(()) => true,
        Err(embassy_sync::channel::TrySendError::Full(msg)) => {
            warn!("INBOX: full, dropping {:?}", msg);
            false
        }
    }
}
