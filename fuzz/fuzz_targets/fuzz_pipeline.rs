//! Fuzz target: pipeline state machine
//!
//! Decodes the input into a timestamped stream of sensor edges,
//! classifier answers and ticks, and checks after every step that:
//! - the routing queue stays within its capacity
//! - no item is reported twice
//! - an active item exists only in EntryDetected / AwaitingData
//!
//! cargo fuzz run fuzz_pipeline

#![no_main]

use std::collections::HashSet;

use libfuzzer_sys::fuzz_target;
use rvmcore::catalog::{CatalogEntry, CatalogSnapshot};
use rvmcore::config::SystemConfig;
use rvmcore::error::ClassifierError;
use rvmcore::events::SensorEvent;
use rvmcore::item::{Classification, ItemId, Material};
use rvmcore::pipeline::context::Effect;
use rvmcore::pipeline::{Input, Pipeline, StateId};

const BARCODES: [&str; 3] = ["123", "456", "999"];
const MATERIALS: [Material; 4] = [
    Material::Pet,
    Material::Glass,
    Material::Aluminum,
    Material::Unknown,
];

fn catalog() -> CatalogSnapshot {
    let entry = |barcode: &str, material| CatalogEntry {
        barcode: barcode.into(),
        material,
        weight_min_g: 480.0,
        weight_max_g: 520.0,
        width_min_mm: 60.0,
        width_max_mm: 70.0,
        height_min_mm: 170.0,
        height_max_mm: 190.0,
    };
    CatalogSnapshot::from_entries([entry("123", Material::Pet), entry("456", Material::Glass)])
        .unwrap_or_default()
}

/// Two bytes per input: opcode and argument.
fn decode(op: u8, arg: u8) -> Input {
    match op % 9 {
        0 => Input::Sensor(SensorEvent::EntryTrigger),
        1 => Input::Sensor(SensorEvent::ExitTrigger),
        2 => Input::Sensor(SensorEvent::DiverterEntry),
        3 => Input::Sensor(SensorEvent::DiverterExit),
        4 => Input::Sensor(SensorEvent::BarcodeRead(
            BARCODES[usize::from(arg) % BARCODES.len()].into(),
        )),
        5 => Input::Sensor(SensorEvent::WeightReading(400.0 + f32::from(arg))),
        6 => Input::Classified {
            item: ItemId(u32::from(arg % 8)),
            result: Ok(Classification {
                material: MATERIALS[usize::from(arg >> 3) % MATERIALS.len()],
                width_mm: 50.0 + f32::from(arg % 32),
                height_mm: 160.0 + f32::from(arg % 40),
            }),
        },
        7 => Input::Classified {
            item: ItemId(u32::from(arg % 8)),
            result: Err(ClassifierError::NoDetection),
        },
        _ => Input::Tick,
    }
}

fuzz_target!(|data: &[u8]| {
    let Some((&cap, rest)) = data.split_first() else {
        return;
    };
    let capacity = usize::from(cap % 4) + 1;
    let mut pipeline = Pipeline::new(SystemConfig {
        queue_capacity: capacity,
        ..SystemConfig::default()
    });
    let catalog = catalog();
    let mut reported = HashSet::new();
    let mut now = 0u64;

    for chunk in rest.chunks_exact(2) {
        // tick inputs advance time in large steps so timeouts fire
        now += if chunk[0] % 9 == 8 { u64::from(chunk[1]) * 200 } else { 10 };
        pipeline.handle(decode(chunk[0], chunk[1]), now, &catalog);

        for effect in pipeline.drain_effects() {
            if let Effect::Report(outcome) = effect {
                assert!(reported.insert(outcome.item), "{} reported twice", outcome.item);
            }
        }
        assert!(pipeline.context().queue.len() <= capacity);
        let has_item = pipeline.state().active_item().is_some();
        let expects_item = matches!(
            pipeline.state_id(),
            StateId::EntryDetected | StateId::AwaitingData
        );
        assert_eq!(has_item, expects_item);
    }
});
