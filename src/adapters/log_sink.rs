//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing one structured line per
//! application event to the `log` facade.  A kiosk screen or a
//! maintenance dashboard would implement the same trait.

use log::{debug, error, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;
use crate::jam::JamEvent;

/// Adapter that logs every [`AppEvent`].
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Telemetry(t) => {
                info!(
                    "TELEM | state={} | queue={}/{} | accepted={} rejected={} | \
                     crusher={} breaker={}",
                    t.state,
                    t.queue_len,
                    t.queue_capacity,
                    t.accepted,
                    t.rejected,
                    if t.crusher_disabled { "DISABLED" } else { "OK" },
                    if t.breaker_disabled { "DISABLED" } else { "OK" },
                );
            }
            AppEvent::StateChanged { from, to } => {
                debug!("STATE | {} -> {}", from, to);
            }
            AppEvent::Started(state) => {
                info!("START | initial_state={}", state);
            }
            AppEvent::ItemQueued { item, queue_len } => {
                info!("ITEM  | {} accepted, queue_len={}", item, queue_len);
            }
            AppEvent::ItemRejected { item, reason } => {
                info!(
                    "ITEM  | {} rejected, reason={} code={}",
                    item,
                    reason,
                    reason.remote_code()
                );
            }
            AppEvent::ItemRouted { item, material } => {
                info!("ITEM  | {} routed to {} bin", item, material);
            }
            AppEvent::Jam { motor, event } => match event {
                JamEvent::StallSuspected { current_amps } => {
                    debug!("JAM   | {} stall suspected at {:.2} A", motor, current_amps);
                }
                JamEvent::StallCleared => debug!("JAM   | {} stall cleared", motor),
                JamEvent::JamDetected { attempt } => {
                    warn!("JAM   | {} jam detected, recovery attempt {}", motor, attempt);
                }
                JamEvent::RecoveryCompleted { attempt } => {
                    info!("JAM   | {} recovery {} complete", motor, attempt);
                }
                JamEvent::MotorDisabled { attempts } => {
                    error!("JAM   | {} disabled after {} recoveries", motor, attempts);
                }
                JamEvent::MotorReset => info!("JAM   | {} reset", motor),
            },
            AppEvent::MotorFault(fault) => {
                error!(
                    "FAULT | {} requires manual intervention (attempts={}, at={} ms)",
                    fault.motor, fault.attempts, fault.at_ms
                );
            }
            AppEvent::CrushSkipped { item, motor } => {
                warn!("ITEM  | {} not crushed, {} disabled", item, motor);
            }
            AppEvent::ConfigUpdated => info!("CONFIG | updated"),
            AppEvent::CatalogReplaced { entries } => {
                info!("CATALOG | replaced, {} entries", entries);
            }
        }
    }
}
