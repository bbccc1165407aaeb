//! Item-acceptance state machine.
//!
//! The state is one tagged value; per-item data lives *inside* the
//! variant that needs it, so there is never an active item outside
//! EntryDetected / AwaitingData:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  PipelineState                                               │
//! │  ┌───────────────┬─────────────────────────────────────────┐ │
//! │  │ Idle          │ -                                       │ │
//! │  │ EntryDetected │ item, since_ms                          │ │
//! │  │ AwaitingData  │ item, deadline_ms                       │ │
//! │  │ Routing       │ - (queue lives in the context)          │ │
//! │  │ Returning     │ reason, reverse_until, retrieve_by      │ │
//! │  └───────────────┴─────────────────────────────────────────┘ │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each input takes the current state **by value**, hands it to the
//! handler for that state (see [`states`]), and stores whatever comes
//! back.  Handlers append effects to the [`PipelineContext`]; the engine
//! adds a `StateChanged` event whenever the variant changes.

pub mod context;
pub mod states;

use core::fmt;

use log::info;

use crate::app::events::AppEvent;
use crate::app::ports::CatalogPort;
use crate::config::SystemConfig;
use crate::error::ClassifierError;
use crate::events::SensorEvent;
use crate::item::{Classification, Item, ItemId};
use crate::jam::JamEvent;
use crate::motor::MotorId;
use crate::verification::ReasonCode;

use context::{Effect, PipelineContext};

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Data-free discriminant of [`PipelineState`], for events and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StateId {
    Idle = 0,
    EntryDetected = 1,
    AwaitingData = 2,
    Routing = 3,
    Returning = 4,
}

impl StateId {
    pub const COUNT: usize = 5;

    pub const fn name(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::EntryDetected => "EntryDetected",
            Self::AwaitingData => "AwaitingData",
            Self::Routing => "Routing",
            Self::Returning => "Returning",
        }
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The single global pipeline state.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineState {
    Idle,
    EntryDetected {
        item: Item,
        since_ms: u64,
    },
    AwaitingData {
        item: Item,
        deadline_ms: u64,
    },
    Routing,
    Returning {
        reason: ReasonCode,
        /// Belt is reversing until this time; `None` once stopped.
        reverse_until: Option<u64>,
        /// Give up waiting for the customer to take the item back.
        retrieve_by: u64,
    },
}

impl PipelineState {
    pub fn id(&self) -> StateId {
        match self {
            Self::Idle => StateId::Idle,
            Self::EntryDetected { .. } => StateId::EntryDetected,
            Self::AwaitingData { .. } => StateId::AwaitingData,
            Self::Routing => StateId::Routing,
            Self::Returning { .. } => StateId::Returning,
        }
    }

    /// The item between entry and its accept/reject decision, if any.
    pub fn active_item(&self) -> Option<&Item> {
        match self {
            Self::EntryDetected { item, .. } | Self::AwaitingData { item, .. } => Some(item),
            _ => None,
        }
    }
}

/// Inputs the state handlers react to.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Sensor(SensorEvent),
    Classified {
        item: ItemId,
        result: Result<Classification, ClassifierError>,
    },
    /// Timeout evaluation.
    Tick,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct Pipeline {
    state: PipelineState,
    ctx: PipelineContext,
}

impl Pipeline {
    pub fn new(config: SystemConfig) -> Self {
        Self {
            state: PipelineState::Idle,
            ctx: PipelineContext::new(config),
        }
    }

    pub fn start(&mut self) {
        info!("PIPELINE starting in state: {}", self.state.id());
        self.ctx.emit(AppEvent::Started(self.state.id()));
    }

    /// Feed one input at `now_ms`.
    pub fn handle(&mut self, input: Input, now_ms: u64, catalog: &impl CatalogPort) {
        let prev = std::mem::replace(&mut self.state, PipelineState::Idle);
        let from = prev.id();
        let next = states::on_input(prev, input, now_ms, &mut self.ctx, catalog);
        self.transition(from, next);
    }

    pub fn tick(&mut self, now_ms: u64, catalog: &impl CatalogPort) {
        self.handle(Input::Tick, now_ms, catalog);
    }

    pub fn on_jam(&mut self, motor: MotorId, event: JamEvent, now_ms: u64) {
        self.ctx.on_jam(motor, event, now_ms);
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    pub fn state_id(&self) -> StateId {
        self.state.id()
    }

    pub fn context(&self) -> &PipelineContext {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut PipelineContext {
        &mut self.ctx
    }

    /// Hand the buffered effects to the caller, oldest first.
    pub fn drain_effects(&mut self) -> std::vec::Drain<'_, Effect> {
        self.ctx.effects.drain(..)
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn transition(&mut self, from: StateId, next: PipelineState) {
        let to = next.id();
        self.state = next;
        if from != to {
            info!("PIPELINE transition: {} -> {}", from, to);
            self.ctx.emit(AppEvent::StateChanged { from, to });
        }
    }
}
