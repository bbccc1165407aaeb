//! End-to-end runs of the full task set on the simulated machine.
//!
//! These use real timers, so timings are kept short and assertions only
//! depend on ordering, never on exact milliseconds.

use core::time::Duration;

use async_io_mini::Timer;

use super::mock_hw::{RecordingSinks, entry};

use rvmcore::adapters::sim::{
    ItemScript, JamWindow, Scenario, SimConveyor, SimDrives, TimedEvent, scripted_events,
};
use rvmcore::adapters::time::MonotonicClock;
use rvmcore::app::events::AppEvent;
use rvmcore::app::service::AppService;
use rvmcore::catalog::CatalogSnapshot;
use rvmcore::config::{JamConfig, SystemConfig};
use rvmcore::events::{Inbox, SensorEvent};
use rvmcore::item::{Classification, ItemId, Material};
use rvmcore::jam::JamEvent;
use rvmcore::motor::MotorId;
use rvmcore::runtime::{Adapters, GuardChannels, Runtime};
use rvmcore::verification::ReasonCode;

fn fast_config() -> SystemConfig {
    let jam = JamConfig {
        stall_duration_ms: 200,
        reverse_ms: 100,
        forward_ms: 100,
        pause_ms: 50,
        run_duration_ms: 1_000,
        sample_period_ms: 20,
        ..JamConfig::default()
    };
    SystemConfig {
        data_timeout_ms: 300,
        return_reverse_ms: 200,
        tick_interval_ms: 20,
        crusher: JamConfig {
            stall_threshold_amps: 5.0,
            ..jam.clone()
        },
        breaker: JamConfig {
            stall_threshold_amps: 7.0,
            max_attempts: 1,
            ..jam
        },
        ..SystemConfig::default()
    }
}

fn at(at_ms: u64, event: SensorEvent) -> TimedEvent {
    TimedEvent { at_ms, event }
}

/// Run `scenario` to completion and hand back the service and the records.
fn run(
    config: SystemConfig,
    scenario: &Scenario,
) -> (AppService, RecordingSinks, SimDrives<MonotonicClock>) {
    let inbox = Inbox::new();
    let guards = GuardChannels::new();
    let clock = MonotonicClock::new();

    let catalog = CatalogSnapshot::from_entries(scenario.catalog.iter().cloned()).unwrap();
    let mut service = AppService::new(config, catalog);
    let mut sinks = RecordingSinks::new();
    let drives = SimDrives::new(scenario.jams.clone(), clock);
    let adapters = Adapters {
        hw: SimConveyor::new(&inbox, scenario.items.clone()),
        drives: drives.clone(),
        clock,
    };

    let runtime = Runtime::new(&inbox, &guards);
    runtime.run(
        &mut service,
        adapters,
        &mut sinks,
        scripted_events(scenario.events.clone(), clock),
        Timer::after(Duration::from_millis(scenario.duration_ms)),
    );
    (service, sinks, drives)
}

#[test]
fn jammed_breaker_is_disabled_and_item_still_routed() {
    let scenario = Scenario {
        catalog: vec![entry("456", Material::Glass)],
        events: vec![
            at(50, SensorEvent::EntryTrigger),
            at(80, SensorEvent::BarcodeRead("456".into())),
            at(150, SensorEvent::ExitTrigger),
            at(600, SensorEvent::DiverterExit),
        ],
        items: vec![ItemScript {
            weight_g: Some(500.0),
            classification: Some(Classification {
                material: Material::Glass,
                width_mm: 65.0,
                height_mm: 180.0,
            }),
            classifier_fails: false,
        }],
        jams: vec![JamWindow {
            motor: MotorId::Breaker,
            from_ms: 0,
            to_ms: 60_000,
            amps: 12.0,
        }],
        duration_ms: 2_500,
    };

    let (service, sinks, drives) = run(fast_config(), &scenario);

    assert_eq!(sinks.outcomes.len(), 1);
    assert_eq!(sinks.outcomes[0].item, ItemId(1));
    assert!(sinks.outcomes[0].accepted);

    assert!(sinks.events.contains(&AppEvent::Jam {
        motor: MotorId::Breaker,
        event: JamEvent::JamDetected { attempt: 1 },
    }));
    assert_eq!(sinks.faults.len(), 1);
    assert_eq!(sinks.faults[0].motor, MotorId::Breaker);
    assert_eq!(sinks.faults[0].attempts, 1);

    assert!(service.is_motor_disabled(MotorId::Breaker));
    assert!(!service.is_motor_disabled(MotorId::Crusher));
    assert_eq!(drives.direction(MotorId::Breaker), None);
    assert_eq!(drives.command_count(MotorId::Crusher), 0);
}

#[test]
fn silent_classifier_times_out_under_the_runtime() {
    let scenario = Scenario {
        catalog: vec![entry("123", Material::Pet)],
        events: vec![
            at(50, SensorEvent::EntryTrigger),
            at(60, SensorEvent::BarcodeRead("123".into())),
            at(100, SensorEvent::ExitTrigger),
        ],
        items: vec![ItemScript {
            weight_g: Some(500.0),
            classification: None,
            classifier_fails: false,
        }],
        jams: Vec::new(),
        duration_ms: 900,
    };

    let (service, sinks, _) = run(fast_config(), &scenario);

    assert_eq!(sinks.outcomes.len(), 1);
    assert_eq!(sinks.outcomes[0].reason, ReasonCode::SensorTimeout);
    assert_eq!(sinks.outcomes[0].weight_g, Some(500.0));
    assert_eq!(service.stats().timeouts, 1);
    assert!(matches!(sinks.events.first(), Some(AppEvent::Started(_))));
}
