//! Per-state handlers.
//!
//! Every handler receives the state's own data by value and returns the
//! next state.  Side effects go into the context's effect buffer.
//!
//! ```text
//!  IDLE ──[entry]──▶ ENTRY_DETECTED ──[exit, barcode]──▶ AWAITING_DATA
//!   ▲                      │                               │      │
//!   │        [exit, no barcode / timeout]         [rejected /  [accepted]
//!   │                      ▼                        timeout]      │
//!   ├──[exit / return timeout]── RETURNING ◀──────────┘          │
//!   │       (queue empty)          │                              ▼
//!   │         [exit / return timeout, queue non-empty] ──────▶ ROUTING
//!   │                                                             │
//!   └───────────────[diverter exit, queue empty]──────────────────┘
//!
//!  ROUTING ──[entry]──▶ ENTRY_DETECTED   (queued items keep routing)
//! ```
//!
//! Diverter exits are handled the same way in every state: the queue
//! head is dequeued and reported accepted exactly once.

use log::{debug, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::CatalogPort;
use crate::events::SensorEvent;
use crate::item::Item;
use crate::verification::{Outcome, ReasonCode, Verdict, verify};

use super::context::{Command, Effect, PipelineContext};
use super::{Input, PipelineState};

// ═══════════════════════════════════════════════════════════════════════════
//  Dispatch
// ═══════════════════════════════════════════════════════════════════════════

pub fn on_input(
    state: PipelineState,
    input: Input,
    now_ms: u64,
    ctx: &mut PipelineContext,
    catalog: &impl CatalogPort,
) -> PipelineState {
    match input {
        Input::Sensor(SensorEvent::DiverterExit) => return diverter_exit(state, ctx),
        Input::Sensor(SensorEvent::DiverterEntry) => {
            debug!("PIPELINE: diverter entry, head {:?}", ctx.queue.front().map(|i| i.id));
            return state;
        }
        _ => {}
    }

    match state {
        PipelineState::Idle => idle_or_routing(PipelineState::Idle, input, now_ms, ctx),
        PipelineState::Routing => idle_or_routing(PipelineState::Routing, input, now_ms, ctx),
        PipelineState::EntryDetected { item, since_ms } => {
            entry_detected(item, since_ms, input, now_ms, ctx)
        }
        PipelineState::AwaitingData { item, deadline_ms } => {
            awaiting_data(item, deadline_ms, input, now_ms, ctx, catalog)
        }
        PipelineState::Returning {
            reason,
            reverse_until,
            retrieve_by,
        } => returning(reason, reverse_until, retrieve_by, input, now_ms, ctx),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  IDLE / ROUTING: no active item
// ═══════════════════════════════════════════════════════════════════════════

fn idle_or_routing(
    state: PipelineState,
    input: Input,
    now_ms: u64,
    ctx: &mut PipelineContext,
) -> PipelineState {
    match input {
        Input::Sensor(SensorEvent::EntryTrigger) => {
            let mut item = Item::new(ctx.next_item_id(), now_ms);
            item.barcode = ctx.take_latched_barcode(now_ms);
            ctx.command(Command::BeltForward);
            info!(
                "ENTRY: {} detected{}",
                item.id,
                if item.barcode.is_some() { " with latched barcode" } else { "" }
            );
            PipelineState::EntryDetected {
                item,
                since_ms: now_ms,
            }
        }
        Input::Sensor(SensorEvent::BarcodeRead(code)) => {
            debug!("PIPELINE: barcode {} latched ahead of entry", code);
            ctx.latched_barcode = Some((code, now_ms));
            state
        }
        Input::Tick => {
            if ctx
                .latched_barcode
                .as_ref()
                .is_some_and(|(_, at)| now_ms.saturating_sub(*at) > ctx.config.barcode_latch_ms)
            {
                ctx.take_latched_barcode(now_ms);
            }
            state
        }
        other => {
            debug!("PIPELINE: {:?} ignored in {}", other, state.id());
            state
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  ENTRY_DETECTED: item travelling to the inspection point
// ═══════════════════════════════════════════════════════════════════════════

fn entry_detected(
    mut item: Item,
    since_ms: u64,
    input: Input,
    now_ms: u64,
    ctx: &mut PipelineContext,
) -> PipelineState {
    match input {
        Input::Sensor(SensorEvent::BarcodeRead(code)) => {
            if let Some(old) = item.barcode.replace(code) {
                warn!("ENTRY: {} barcode {} replaced by {:?}", item.id, old, item.barcode);
            }
            PipelineState::EntryDetected { item, since_ms }
        }
        Input::Sensor(SensorEvent::ExitTrigger) => {
            if item.barcode.is_none() {
                warn!("ENTRY: {} reached inspection without a barcode", item.id);
                return reject(item, ReasonCode::MissingBarcode, now_ms, ctx);
            }
            ctx.command(Command::BeltStop);
            ctx.command(Command::MeasureWeight);
            ctx.effects.push(Effect::Classify(item.id));
            let deadline_ms = now_ms + ctx.config.data_timeout_ms;
            info!(
                "INSPECT: {} barcode {:?}, waiting up to {} ms for weight and classification",
                item.id, item.barcode, ctx.config.data_timeout_ms
            );
            PipelineState::AwaitingData { item, deadline_ms }
        }
        Input::Tick if now_ms.saturating_sub(since_ms) >= ctx.config.transit_timeout_ms => {
            warn!("ENTRY: {} never reached inspection", item.id);
            ctx.stats.timeouts += 1;
            reject(item, ReasonCode::SensorTimeout, now_ms, ctx)
        }
        Input::Sensor(SensorEvent::EntryTrigger) => {
            warn!("ENTRY: second entry while {} in transit, ignored", item.id);
            PipelineState::EntryDetected { item, since_ms }
        }
        other => {
            debug!("ENTRY: {:?} ignored", other);
            PipelineState::EntryDetected { item, since_ms }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  AWAITING_DATA: belt stopped, collecting weight + classification
// ═══════════════════════════════════════════════════════════════════════════

fn awaiting_data(
    mut item: Item,
    deadline_ms: u64,
    input: Input,
    now_ms: u64,
    ctx: &mut PipelineContext,
    catalog: &impl CatalogPort,
) -> PipelineState {
    if now_ms >= deadline_ms {
        warn!(
            "INSPECT: {} timed out (weight={:?} material={:?})",
            item.id, item.weight_g, item.material
        );
        ctx.stats.timeouts += 1;
        return reject(item, ReasonCode::SensorTimeout, now_ms, ctx);
    }

    match input {
        Input::Sensor(SensorEvent::WeightReading(grams)) => {
            if let Some(old) = item.weight_g.replace(grams) {
                debug!("INSPECT: {} weight {:.1} g superseded", item.id, old);
            }
        }
        Input::Classified { item: id, result } if id == item.id => match result {
            Ok(class) => item.apply_classification(class),
            Err(e) => {
                warn!("INSPECT: classifier failed for {}: {}", item.id, e);
                return reject(item, ReasonCode::ClassifierError, now_ms, ctx);
            }
        },
        Input::Classified { item: id, .. } => {
            debug!("INSPECT: stale classification for {} discarded", id);
        }
        Input::Sensor(SensorEvent::BarcodeRead(code)) => {
            debug!("INSPECT: barcode {} latched for the next item", code);
            ctx.latched_barcode = Some((code, now_ms));
        }
        other => {
            debug!("INSPECT: {:?} ignored", other);
        }
    }

    if item.is_complete() {
        decide(item, now_ms, ctx, catalog)
    } else {
        PipelineState::AwaitingData { item, deadline_ms }
    }
}

fn decide(
    item: Item,
    now_ms: u64,
    ctx: &mut PipelineContext,
    catalog: &impl CatalogPort,
) -> PipelineState {
    let (Some(barcode), Some(m)) = (item.barcode.as_deref(), item.measurements()) else {
        return reject(item, ReasonCode::SensorTimeout, now_ms, ctx);
    };

    let id = item.id;
    match verify(barcode, &m, catalog, ctx.tolerances) {
        Verdict::Accept => match ctx.queue.push(item) {
            Ok(()) => {
                let queue_len = ctx.queue.len();
                info!("VERIFY: {} accepted, queue {}/{}", id, queue_len, ctx.queue.capacity());
                ctx.emit(AppEvent::ItemQueued { item: id, queue_len });
                enter_routing(ctx)
            }
            Err(item) => reject(item, ReasonCode::Capacity, now_ms, ctx),
        },
        Verdict::Reject(reason) => reject(item, reason, now_ms, ctx),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  RETURNING: rejected item going back to the customer
// ═══════════════════════════════════════════════════════════════════════════

fn returning(
    reason: ReasonCode,
    reverse_until: Option<u64>,
    retrieve_by: u64,
    input: Input,
    now_ms: u64,
    ctx: &mut PipelineContext,
) -> PipelineState {
    match input {
        Input::Tick if now_ms >= retrieve_by => {
            warn!("RETURN: item not retrieved in time ({}), resuming", reason);
            leave_returning(reverse_until, ctx)
        }
        Input::Tick if reverse_until.is_some_and(|t| now_ms >= t) => {
            ctx.command(Command::BeltStop);
            PipelineState::Returning {
                reason,
                reverse_until: None,
                retrieve_by,
            }
        }
        Input::Sensor(SensorEvent::ExitTrigger) => {
            info!("RETURN: item retrieved ({})", reason);
            leave_returning(reverse_until, ctx)
        }
        other => {
            debug!("RETURN: {:?} ignored until the item is retrieved", other);
            PipelineState::Returning {
                reason,
                reverse_until,
                retrieve_by,
            }
        }
    }
}

fn leave_returning(reverse_until: Option<u64>, ctx: &mut PipelineContext) -> PipelineState {
    if reverse_until.is_some() {
        ctx.command(Command::BeltStop);
    }
    if ctx.queue.is_empty() {
        PipelineState::Idle
    } else {
        enter_routing(ctx)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  Shared transitions
// ═══════════════════════════════════════════════════════════════════════════

/// Report the rejection once and start the return sequence.
fn reject(item: Item, reason: ReasonCode, now_ms: u64, ctx: &mut PipelineContext) -> PipelineState {
    info!("REJECT: {} barcode {:?}: {}", item.id, item.barcode, reason.message());
    ctx.report(Outcome::rejected(&item, reason));
    ctx.emit(AppEvent::ItemRejected {
        item: item.id,
        reason,
    });
    ctx.command(Command::BeltReverse);
    PipelineState::Returning {
        reason,
        reverse_until: Some(now_ms + ctx.config.return_reverse_ms),
        retrieve_by: now_ms + ctx.config.return_timeout_ms,
    }
}

fn enter_routing(ctx: &mut PipelineContext) -> PipelineState {
    ctx.command(Command::BeltForward);
    ctx.select_head();
    PipelineState::Routing
}

/// Dequeue the head exactly once and report it accepted.
fn diverter_exit(state: PipelineState, ctx: &mut PipelineContext) -> PipelineState {
    let Some(item) = ctx.queue.pop_front() else {
        warn!("ROUTE: diverter exit with an empty queue, ignored");
        return state;
    };
    let material = item.routing_material();
    info!("ROUTE: {} ({}) left through the diverter", item.id, material);
    ctx.head_selected = false;
    ctx.report(Outcome::accepted(&item));
    ctx.emit(AppEvent::ItemRouted {
        item: item.id,
        material,
    });
    ctx.select_head();

    match state {
        PipelineState::Routing if ctx.queue.is_empty() => {
            ctx.command(Command::BeltStop);
            PipelineState::Idle
        }
        other => other,
    }
}
