//! Context threaded through every pipeline handler.
//!
//! `PipelineContext` owns everything the handlers share besides the
//! state value itself: configuration, the routing queue, the barcode
//! latch, disabled-motor flags, counters, and the ordered **effect
//! buffer**.  Handlers never call ports; they append [`Effect`]s, and
//! the [`AppService`](crate::app::service::AppService) applies them
//! after each message.  Replaying the same inputs therefore yields the
//! same effect sequence.

use log::{error, info, warn};

use crate::app::events::AppEvent;
use crate::config::SystemConfig;
use crate::item::{ItemId, Material};
use crate::jam::{JamEvent, MotorFault};
use crate::motor::MotorId;
use crate::queue::ItemQueue;
use crate::verification::{Outcome, Tolerances};

// ---------------------------------------------------------------------------
// Effects (written by handlers; applied by AppService)
// ---------------------------------------------------------------------------

/// Conveyor commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    BeltForward,
    BeltReverse,
    BeltStop,
    DiverterToBin(Material),
    FlapToBin(Material),
    MeasureWeight,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Actuate(Command),
    Classify(ItemId),
    Crush { item: ItemId, motor: MotorId },
    Report(Outcome),
    Fault(MotorFault),
    Event(AppEvent),
}

/// Running counters for telemetry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub items_seen: u32,
    pub accepted: u32,
    pub rejected: u32,
    pub timeouts: u32,
}

// ---------------------------------------------------------------------------
// PipelineContext
// ---------------------------------------------------------------------------

pub struct PipelineContext {
    // -- Configuration --
    pub config: SystemConfig,
    pub tolerances: Tolerances,

    // -- Routing --
    /// Accepted items waiting for the diverter, head first.
    pub queue: ItemQueue,
    /// Diverter/flap already set for the current head.
    pub head_selected: bool,

    // -- Per-item bookkeeping --
    /// Barcode read with no item active, and when.
    pub latched_barcode: Option<(String, u64)>,
    next_item_id: u32,

    // -- Motors --
    disabled: [bool; MotorId::COUNT],

    // -- Outputs --
    pub effects: Vec<Effect>,
    pub stats: PipelineStats,
}

impl PipelineContext {
    pub fn new(config: SystemConfig) -> Self {
        Self {
            tolerances: Tolerances::from_config(&config),
            queue: ItemQueue::new(config.queue_capacity),
            head_selected: false,
            latched_barcode: None,
            next_item_id: 0,
            disabled: [false; MotorId::COUNT],
            effects: Vec::new(),
            stats: PipelineStats::default(),
            config,
        }
    }

    pub fn command(&mut self, cmd: Command) {
        self.effects.push(Effect::Actuate(cmd));
    }

    pub fn emit(&mut self, event: AppEvent) {
        self.effects.push(Effect::Event(event));
    }

    pub fn report(&mut self, outcome: Outcome) {
        if outcome.accepted {
            self.stats.accepted += 1;
        } else {
            self.stats.rejected += 1;
        }
        self.effects.push(Effect::Report(outcome));
    }

    pub fn next_item_id(&mut self) -> ItemId {
        self.next_item_id = self.next_item_id.wrapping_add(1);
        self.stats.items_seen += 1;
        ItemId(self.next_item_id)
    }

    /// Take the latched barcode if it is still fresh at `now_ms`.
    pub fn take_latched_barcode(&mut self, now_ms: u64) -> Option<String> {
        let (barcode, at) = self.latched_barcode.take()?;
        if now_ms.saturating_sub(at) <= self.config.barcode_latch_ms {
            Some(barcode)
        } else {
            info!("PIPELINE: latched barcode {} expired", barcode);
            None
        }
    }

    pub fn is_disabled(&self, motor: MotorId) -> bool {
        self.disabled[motor.index()]
    }

    pub fn apply_config(&mut self, config: SystemConfig) {
        self.queue.set_capacity(config.queue_capacity);
        self.tolerances = Tolerances::from_config(&config);
        self.config = config;
    }

    /// Point the diverter and flap at the queue head and ask for its crush run.
    pub fn select_head(&mut self) {
        if self.head_selected {
            return;
        }
        let Some(head) = self.queue.front() else {
            return;
        };
        let (id, material) = (head.id, head.routing_material());
        self.head_selected = true;
        info!("PIPELINE: routing {} to {} bin", id, material);
        self.command(Command::DiverterToBin(material));
        self.command(Command::FlapToBin(material));

        if let Some(motor) = MotorId::for_material(material) {
            if self.is_disabled(motor) {
                warn!("PIPELINE: {} disabled, {} routed without crushing", motor, id);
                self.emit(AppEvent::CrushSkipped { item: id, motor });
            } else {
                self.effects.push(Effect::Crush { item: id, motor });
            }
        }
    }

    /// Record a jam guard report.  A disabled motor is surfaced exactly once.
    pub fn on_jam(&mut self, motor: MotorId, event: JamEvent, now_ms: u64) {
        self.emit(AppEvent::Jam { motor, event });
        match event {
            JamEvent::MotorDisabled { attempts } => {
                if !self.disabled[motor.index()] {
                    self.disabled[motor.index()] = true;
                    let fault = MotorFault {
                        motor,
                        attempts,
                        at_ms: now_ms,
                    };
                    error!("PIPELINE: {} needs manual intervention", motor);
                    self.effects.push(Effect::Fault(fault));
                    self.emit(AppEvent::MotorFault(fault));
                }
            }
            JamEvent::MotorReset => {
                if std::mem::replace(&mut self.disabled[motor.index()], false) {
                    info!("PIPELINE: {} back in service", motor);
                }
            }
            _ => {}
        }
    }
}
