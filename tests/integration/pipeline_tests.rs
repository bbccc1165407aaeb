//! Integration tests for the AppService → pipeline → ports chain.
//!
//! Each test drives the service with timestamped messages and asserts on
//! the recorded actuator calls, reports and events.

use super::mock_hw::{Bench, CountingCatalog, HwCall, class, test_catalog};

use rvmcore::app::commands::AppCommand;
use rvmcore::app::events::AppEvent;
use rvmcore::catalog::CatalogSnapshot;
use rvmcore::config::SystemConfig;
use rvmcore::error::ClassifierError;
use rvmcore::events::{Msg, SensorEvent};
use rvmcore::item::{ItemId, Material};
use rvmcore::jam::JamEvent;
use rvmcore::motor::MotorId;
use rvmcore::pipeline::context::{Command, Effect};
use rvmcore::pipeline::{Input, Pipeline, StateId};
use rvmcore::verification::ReasonCode;

fn pet() -> rvmcore::item::Classification {
    class(Material::Pet, 65.0, 180.0)
}

// ── Missing barcode ───────────────────────────────────────────

#[test]
fn exit_without_barcode_returns_item_without_verification() {
    let catalog = CountingCatalog::new(test_catalog());
    let mut p = Pipeline::new(SystemConfig::default());
    p.handle(Input::Sensor(SensorEvent::EntryTrigger), 0, &catalog);
    p.handle(Input::Sensor(SensorEvent::ExitTrigger), 300, &catalog);
    assert_eq!(p.state_id(), StateId::Returning);
    p.handle(Input::Tick, 1_300, &catalog);

    let effects: Vec<Effect> = p.drain_effects().collect();
    let commands: Vec<Command> = effects
        .iter()
        .filter_map(|e| match e {
            Effect::Actuate(c) => Some(*c),
            _ => None,
        })
        .collect();
    assert_eq!(
        commands,
        vec![Command::BeltForward, Command::BeltReverse, Command::BeltStop]
    );
    let reports: Vec<_> = effects
        .iter()
        .filter_map(|e| match e {
            Effect::Report(o) => Some(o.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].reason, ReasonCode::MissingBarcode);
    assert_eq!(reports[0].barcode, None);
    assert_eq!(catalog.lookups.get(), 0, "verification must not run");
}

#[test]
fn reverse_stops_after_return_window() {
    let mut b = Bench::new();
    b.at(0).sensor(SensorEvent::EntryTrigger);
    b.at(300).sensor(SensorEvent::ExitTrigger);
    b.hw.take();
    b.at(1_299).tick();
    assert!(b.hw.calls.is_empty());
    b.at(1_300).tick();
    assert_eq!(b.hw.calls, vec![HwCall::BeltStop]);
    b.at(1_400).tick();
    assert_eq!(b.hw.calls, vec![HwCall::BeltStop]);
}

// ── Accepted item ─────────────────────────────────────────────

#[test]
fn matching_item_is_queued_and_routed() {
    let mut b = Bench::new();
    b.insert(1, "123", 500.0, pet());

    assert_eq!(b.app.state(), StateId::Routing);
    assert_eq!(b.app.pipeline().context().queue.len(), 1);
    assert!(b.sinks.outcomes.is_empty(), "reported on diverter exit, not before");
    assert!(b.sinks.events.contains(&AppEvent::ItemQueued {
        item: ItemId(1),
        queue_len: 1
    }));
    assert_eq!(
        b.hw.calls,
        vec![
            HwCall::BeltForward,
            HwCall::BeltStop,
            HwCall::RequestWeight,
            HwCall::Classify(ItemId(1)),
            HwCall::BeltForward,
            HwCall::Diverter(Material::Pet),
            HwCall::Flap(Material::Pet),
        ]
    );

    b.at(2_000).sensor(SensorEvent::DiverterExit);
    assert_eq!(b.app.state(), StateId::Idle);
    assert_eq!(b.hw.last_call(), Some(&HwCall::BeltStop));
    let o = b.sinks.last_outcome().unwrap();
    assert!(o.accepted);
    assert_eq!(o.reason, ReasonCode::Ok);
    assert_eq!(o.barcode.as_deref(), Some("123"));
    assert_eq!(o.weight_g, Some(500.0));
    assert_eq!(o.material, Material::Pet);
    assert_eq!(b.sinks.outcomes.len(), 1);
}

#[test]
fn readings_may_arrive_in_any_order() {
    let mut b = Bench::new();
    b.at(0).sensor(SensorEvent::EntryTrigger);
    b.at(100).sensor(SensorEvent::ExitTrigger);
    b.at(110).sensor(SensorEvent::BarcodeRead("123".into()));
    // barcode after exit is too late for this item
    assert_eq!(b.app.state(), StateId::Returning);

    let mut b = Bench::new();
    b.at(0).sensor(SensorEvent::EntryTrigger);
    b.at(50).sensor(SensorEvent::BarcodeRead("123".into()));
    b.at(100).sensor(SensorEvent::ExitTrigger);
    b.at(200).classified(1, pet());
    assert_eq!(b.app.state(), StateId::AwaitingData);
    b.at(300).sensor(SensorEvent::WeightReading(495.0));
    assert_eq!(b.app.state(), StateId::Routing);
}

// ── Rejections ────────────────────────────────────────────────

#[test]
fn overweight_item_is_rejected_for_weight() {
    let mut b = Bench::new();
    b.insert(1, "123", 600.0, pet());

    assert_eq!(b.app.state(), StateId::Returning);
    assert_eq!(b.hw.last_call(), Some(&HwCall::BeltReverse));
    let o = b.sinks.last_outcome().unwrap();
    assert!(!o.accepted);
    assert_eq!(o.reason, ReasonCode::Weight);
    assert_eq!(o.reason.remote_code(), 9);
    assert_eq!(o.weight_g, Some(600.0));
    assert!(b.app.pipeline().context().queue.is_empty());
}

#[test]
fn weight_tolerance_edge_is_accepted() {
    let mut b = Bench::new();
    b.insert(1, "123", 540.0, pet());
    assert_eq!(b.app.state(), StateId::Routing);
}

#[test]
fn unknown_barcode_is_rejected_regardless_of_readings() {
    let mut b = Bench::new();
    b.insert(1, "999", 5.0, class(Material::Glass, 1.0, 1.0));
    let o = b.sinks.last_outcome().unwrap();
    assert_eq!(o.reason, ReasonCode::UnknownProduct);
    assert_eq!(o.reason.remote_code(), 5);
}

#[test]
fn checks_run_in_fixed_order() {
    // width and material both wrong: width is reported
    let mut b = Bench::new();
    b.insert(1, "123", 500.0, class(Material::Glass, 90.0, 180.0));
    assert_eq!(b.sinks.last_outcome().unwrap().reason, ReasonCode::Width);

    let mut b = Bench::new();
    b.insert(1, "123", 500.0, class(Material::Glass, 65.0, 180.0));
    assert_eq!(
        b.sinks.last_outcome().unwrap().reason,
        ReasonCode::MaterialMismatch
    );
}

#[test]
fn full_queue_downgrades_to_capacity() {
    let mut b = Bench::with_config(SystemConfig {
        queue_capacity: 2,
        ..SystemConfig::default()
    });
    b.insert(1, "123", 500.0, pet());
    b.insert(2, "123", 500.0, pet());
    assert_eq!(b.app.pipeline().context().queue.len(), 2);

    b.insert(3, "123", 500.0, pet());
    let o = b.sinks.last_outcome().unwrap();
    assert_eq!(o.item, ItemId(3));
    assert_eq!(o.reason, ReasonCode::Capacity);
    assert_eq!(b.app.pipeline().context().queue.len(), 2);
    assert_eq!(b.app.state(), StateId::Returning);

    // retrieval resumes routing of the queued items
    let t = b.now + 100;
    b.at(t).sensor(SensorEvent::ExitTrigger);
    assert_eq!(b.app.state(), StateId::Routing);
}

// ── Timeouts and classifier failures ─────────────────────────

#[test]
fn missing_classification_times_out() {
    let mut b = Bench::new();
    b.at(0).sensor(SensorEvent::EntryTrigger);
    b.at(50).sensor(SensorEvent::BarcodeRead("123".into()));
    b.at(300).sensor(SensorEvent::ExitTrigger);
    b.at(400).sensor(SensorEvent::WeightReading(500.0));
    b.at(2_299).tick();
    assert_eq!(b.app.state(), StateId::AwaitingData);

    b.at(2_300).tick();
    assert_eq!(b.app.state(), StateId::Returning);
    assert_eq!(
        b.sinks.last_outcome().map(|o| o.reason),
        Some(ReasonCode::SensorTimeout)
    );
    b.at(2_400).tick();
    b.at(5_000).tick();
    assert_eq!(b.sinks.outcomes.len(), 1, "reported exactly once");
    assert_eq!(b.app.stats().timeouts, 1);
}

#[test]
fn item_that_never_reaches_inspection_times_out() {
    let mut b = Bench::new();
    b.at(0).sensor(SensorEvent::EntryTrigger);
    b.at(29_999).tick();
    assert_eq!(b.app.state(), StateId::EntryDetected);
    b.at(30_000).tick();
    assert_eq!(
        b.sinks.last_outcome().map(|o| o.reason),
        Some(ReasonCode::SensorTimeout)
    );
}

#[test]
fn reading_at_the_deadline_is_too_late() {
    let mut b = Bench::new();
    b.at(0).sensor(SensorEvent::EntryTrigger);
    b.at(50).sensor(SensorEvent::BarcodeRead("123".into()));
    b.at(300).sensor(SensorEvent::ExitTrigger);
    b.at(400).sensor(SensorEvent::WeightReading(500.0));
    // no tick between the deadline and the answer
    b.at(2_300).classified(1, pet());
    assert_eq!(b.app.state(), StateId::Returning);
    let o = b.sinks.last_outcome().unwrap();
    assert_eq!(o.reason, ReasonCode::SensorTimeout);
    assert_eq!(o.weight_g, Some(500.0));
    assert_eq!(b.app.stats().timeouts, 1);

    let mut b = Bench::new();
    b.at(0).sensor(SensorEvent::EntryTrigger);
    b.at(50).sensor(SensorEvent::BarcodeRead("123".into()));
    b.at(300).sensor(SensorEvent::ExitTrigger);
    b.at(400).sensor(SensorEvent::WeightReading(500.0));
    b.at(2_299).classified(1, pet());
    assert_eq!(b.app.state(), StateId::Routing);
}

#[test]
fn classifier_failure_rejects_item() {
    let mut b = Bench::new();
    b.at(0).sensor(SensorEvent::EntryTrigger);
    b.at(50).sensor(SensorEvent::BarcodeRead("123".into()));
    b.at(300).sensor(SensorEvent::ExitTrigger);
    b.at(500).classifier_failed(1, ClassifierError::CaptureFailed);
    assert_eq!(b.app.state(), StateId::Returning);
    assert_eq!(
        b.sinks.last_outcome().map(|o| o.reason),
        Some(ReasonCode::ClassifierError)
    );
}

#[test]
fn stale_classification_is_discarded() {
    let mut b = Bench::new();
    b.at(0).sensor(SensorEvent::EntryTrigger);
    b.at(50).sensor(SensorEvent::BarcodeRead("123".into()));
    b.at(300).sensor(SensorEvent::ExitTrigger);
    b.at(400).sensor(SensorEvent::WeightReading(500.0));
    b.at(500).classified(42, pet());
    assert_eq!(b.app.state(), StateId::AwaitingData);
    b.at(600).classified(1, pet());
    assert_eq!(b.app.state(), StateId::Routing);
}

// ── Returning ─────────────────────────────────────────────────

#[test]
fn returning_ignores_new_entries_until_retrieved() {
    let mut b = Bench::new();
    b.insert(1, "999", 500.0, pet());
    assert_eq!(b.app.state(), StateId::Returning);

    b.at(1_000).sensor(SensorEvent::EntryTrigger);
    assert_eq!(b.app.state(), StateId::Returning);
    assert_eq!(b.app.stats().items_seen, 1);

    b.at(1_200).sensor(SensorEvent::ExitTrigger);
    assert_eq!(b.app.state(), StateId::Idle);
    b.at(1_300).sensor(SensorEvent::EntryTrigger);
    assert_eq!(b.app.state(), StateId::EntryDetected);
    assert_eq!(b.app.stats().items_seen, 2);
}

#[test]
fn unretrieved_item_does_not_block_the_machine() {
    let mut b = Bench::new();
    b.at(0).sensor(SensorEvent::EntryTrigger);
    b.at(30_000).tick();
    assert_eq!(b.app.state(), StateId::Returning);
    b.at(31_000).tick();
    assert_eq!(b.hw.last_call(), Some(&HwCall::BeltStop));

    b.at(44_900).tick();
    assert_eq!(b.app.state(), StateId::Returning);
    b.at(45_000).tick();
    assert_eq!(b.app.state(), StateId::Idle);
    assert_eq!(b.hw.count(HwCall::BeltStop), 1);
    assert_eq!(b.sinks.outcomes.len(), 1, "reported exactly once");

    b.at(46_000).insert(2, "123", 500.0, pet());
    assert_eq!(b.app.state(), StateId::Routing);
    assert_eq!(b.app.stats().items_seen, 2);
    assert_eq!(b.app.pipeline().context().queue.len(), 1);
}

#[test]
fn return_timeout_resumes_routing_of_queued_items() {
    let mut b = Bench::new();
    b.insert(1, "123", 500.0, pet());
    b.at(1_000).insert(2, "999", 500.0, pet());
    assert_eq!(b.app.state(), StateId::Returning);

    b.at(1_600 + 15_000).tick();
    assert_eq!(b.app.state(), StateId::Routing);
    b.at(17_000).sensor(SensorEvent::DiverterExit);
    assert_eq!(b.app.state(), StateId::Idle);
    assert!(b.sinks.last_outcome().unwrap().accepted);
}

// ── Barcode latch ─────────────────────────────────────────────

#[test]
fn barcode_read_just_before_entry_is_attached() {
    let mut b = Bench::new();
    b.at(0).sensor(SensorEvent::BarcodeRead("123".into()));
    b.at(800).sensor(SensorEvent::EntryTrigger);
    b.at(1_000).sensor(SensorEvent::ExitTrigger);
    assert_eq!(b.app.state(), StateId::AwaitingData);
}

#[test]
fn stale_latched_barcode_is_dropped() {
    let mut b = Bench::new();
    b.at(0).sensor(SensorEvent::BarcodeRead("123".into()));
    b.at(1_500).sensor(SensorEvent::EntryTrigger);
    b.at(1_700).sensor(SensorEvent::ExitTrigger);
    assert_eq!(
        b.sinks.last_outcome().map(|o| o.reason),
        Some(ReasonCode::MissingBarcode)
    );
}

// ── Routing and motors ────────────────────────────────────────

#[test]
fn glass_requests_breaker_and_aluminum_requests_crusher() {
    let mut b = Bench::new();
    b.insert(1, "456", 500.0, class(Material::Glass, 65.0, 180.0));
    assert!(b.hw.calls.ends_with(&[
        HwCall::Diverter(Material::Glass),
        HwCall::Flap(Material::Glass),
        HwCall::RunMotor(MotorId::Breaker),
    ]));
    b.at(2_000).sensor(SensorEvent::DiverterExit);

    b.at(3_000).insert(2, "789", 500.0, class(Material::Aluminum, 65.0, 180.0));
    assert_eq!(b.hw.last_call(), Some(&HwCall::RunMotor(MotorId::Crusher)));
    assert_eq!(b.hw.count(HwCall::RunMotor(MotorId::Breaker)), 1);
}

#[test]
fn refused_crush_request_is_reported_as_skipped() {
    let mut b = Bench::new();
    b.hw.refuse_runs = true;
    b.insert(1, "789", 500.0, class(Material::Aluminum, 65.0, 180.0));
    assert_eq!(b.hw.last_call(), Some(&HwCall::RunMotor(MotorId::Crusher)));
    assert!(b.sinks.events.contains(&AppEvent::CrushSkipped {
        item: ItemId(1),
        motor: MotorId::Crusher,
    }));
    // the motor itself is not marked faulty
    assert!(!b.app.is_motor_disabled(MotorId::Crusher));

    b.at(2_000).sensor(SensorEvent::DiverterExit);
    assert!(b.sinks.last_outcome().unwrap().accepted);
}

#[test]
fn queue_routes_in_arrival_order() {
    let mut b = Bench::new();
    b.insert(1, "123", 500.0, pet());
    b.at(1_000).insert(2, "456", 500.0, class(Material::Glass, 65.0, 180.0));
    assert_eq!(b.app.pipeline().context().queue.len(), 2);
    // the second item must not re-point the diverter
    assert_eq!(b.hw.count(HwCall::Diverter(Material::Glass)), 0);

    b.hw.take();
    b.at(2_000).sensor(SensorEvent::DiverterExit);
    assert_eq!(b.sinks.outcomes[0].item, ItemId(1));
    assert_eq!(b.app.state(), StateId::Routing);
    assert_eq!(
        b.hw.calls,
        vec![
            HwCall::Diverter(Material::Glass),
            HwCall::Flap(Material::Glass),
            HwCall::RunMotor(MotorId::Breaker),
        ]
    );

    b.at(2_500).sensor(SensorEvent::DiverterExit);
    assert_eq!(b.sinks.outcomes[1].item, ItemId(2));
    assert_eq!(b.app.state(), StateId::Idle);
}

#[test]
fn routing_continues_while_next_item_is_inspected() {
    let mut b = Bench::new();
    b.insert(1, "123", 500.0, pet());
    b.at(1_000).sensor(SensorEvent::EntryTrigger);
    b.at(1_100).sensor(SensorEvent::DiverterExit);
    assert_eq!(b.app.state(), StateId::EntryDetected);
    assert_eq!(b.sinks.outcomes.len(), 1);
    assert!(b.sinks.outcomes[0].accepted);
    assert!(b.app.pipeline().context().queue.is_empty());
}

#[test]
fn spurious_diverter_exit_is_ignored() {
    let mut b = Bench::new();
    b.at(0).sensor(SensorEvent::DiverterExit);
    assert_eq!(b.app.state(), StateId::Idle);
    assert!(b.sinks.outcomes.is_empty());
}

#[test]
fn disabled_motor_is_surfaced_once_and_skipped() {
    let mut b = Bench::new();
    for _ in 0..2 {
        b.at(100).send(Msg::Jam {
            motor: MotorId::Breaker,
            event: JamEvent::MotorDisabled { attempts: 3 },
        });
    }
    assert_eq!(b.sinks.faults.len(), 1);
    assert_eq!(b.sinks.faults[0].motor, MotorId::Breaker);
    assert!(b.app.is_motor_disabled(MotorId::Breaker));

    b.at(1_000).insert(1, "456", 500.0, class(Material::Glass, 65.0, 180.0));
    assert_eq!(b.hw.count(HwCall::RunMotor(MotorId::Breaker)), 0);
    assert_eq!(b.hw.count(HwCall::Diverter(Material::Glass)), 1);
    assert!(b.sinks.events.contains(&AppEvent::CrushSkipped {
        item: ItemId(1),
        motor: MotorId::Breaker
    }));
    let telemetry = b.app.build_telemetry();
    assert!(telemetry.breaker_disabled);
    assert!(!telemetry.crusher_disabled);
}

#[test]
fn operator_reset_reenables_motor() {
    let mut b = Bench::new();
    b.at(0).send(Msg::Jam {
        motor: MotorId::Crusher,
        event: JamEvent::MotorDisabled { attempts: 3 },
    });
    b.send(Msg::Command(AppCommand::ResetMotor(MotorId::Crusher)));
    assert_eq!(b.hw.last_call(), Some(&HwCall::ResetMotor(MotorId::Crusher)));
    assert!(b.app.is_motor_disabled(MotorId::Crusher), "until the guard confirms");

    b.send(Msg::Jam {
        motor: MotorId::Crusher,
        event: JamEvent::MotorReset,
    });
    assert!(!b.app.is_motor_disabled(MotorId::Crusher));
    b.at(1_000).insert(1, "789", 500.0, class(Material::Aluminum, 65.0, 180.0));
    assert_eq!(b.hw.last_call(), Some(&HwCall::RunMotor(MotorId::Crusher)));
}

// ── Commands ──────────────────────────────────────────────────

#[test]
fn invalid_config_update_is_rejected() {
    let mut b = Bench::new();
    let before = b.app.current_config();
    b.send(Msg::Command(AppCommand::UpdateConfig(SystemConfig {
        queue_capacity: 0,
        ..SystemConfig::default()
    })));
    assert_eq!(b.app.current_config(), before);
    assert!(!b.sinks.events.contains(&AppEvent::ConfigUpdated));

    b.send(Msg::Command(AppCommand::UpdateConfig(SystemConfig {
        weight_tolerance_g: 0.0,
        ..SystemConfig::default()
    })));
    assert!(b.sinks.events.contains(&AppEvent::ConfigUpdated));
    b.insert(1, "123", 530.0, pet());
    assert_eq!(
        b.sinks.last_outcome().map(|o| o.reason),
        Some(ReasonCode::Weight)
    );
}

#[test]
fn catalog_replacement_takes_effect_immediately() {
    let mut b = Bench::new();
    b.send(Msg::Command(AppCommand::ReplaceCatalog(CatalogSnapshot::new())));
    assert!(
        b.sinks
            .events
            .contains(&AppEvent::CatalogReplaced { entries: 0 })
    );
    b.insert(1, "123", 500.0, pet());
    assert_eq!(
        b.sinks.last_outcome().map(|o| o.reason),
        Some(ReasonCode::UnknownProduct)
    );
}

#[test]
fn status_report_counts_outcomes() {
    let mut b = Bench::new();
    b.insert(1, "999", 500.0, pet());
    b.at(1_000).sensor(SensorEvent::ExitTrigger);
    b.at(2_000).insert(2, "123", 500.0, pet());
    b.send(Msg::Command(AppCommand::ReportStatus));
    let Some(AppEvent::Telemetry(t)) = b.sinks.events.last() else {
        panic!("expected telemetry, got {:?}", b.sinks.events.last());
    };
    assert_eq!(t.state, StateId::Routing);
    assert_eq!(t.queue_len, 1);
    assert_eq!((t.accepted, t.rejected), (0, 1));
}
