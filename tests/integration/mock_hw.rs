//! Mock hardware adapters for integration tests.
//!
//! Records every actuator, classifier and motor-gate call so tests can
//! assert on the full command history without a conveyor attached.

use std::cell::Cell;

use rvmcore::app::events::AppEvent;
use rvmcore::app::ports::{
    ActuatorPort, CatalogPort, ClassifierPort, EventSink, MotorGate, MotorPort, ReportSink,
};
use rvmcore::app::service::AppService;
use rvmcore::catalog::{CatalogEntry, CatalogSnapshot};
use rvmcore::config::SystemConfig;
use rvmcore::error::ClassifierError;
use rvmcore::events::{Msg, SensorEvent};
use rvmcore::item::{Classification, ItemId, Material};
use rvmcore::jam::MotorFault;
use rvmcore::motor::{Direction, MotorId};
use rvmcore::verification::Outcome;

// ── Call records ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HwCall {
    BeltForward,
    BeltReverse,
    BeltStop,
    Diverter(Material),
    Flap(Material),
    RequestWeight,
    Classify(ItemId),
    RunMotor(MotorId),
    ResetMotor(MotorId),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DriveCall {
    Run(MotorId, Direction),
    Stop(MotorId),
}

// ── MockHardware ──────────────────────────────────────────────

#[derive(Default)]
pub struct MockHardware {
    pub calls: Vec<HwCall>,
    /// Answer every run request as if the guard queue were full.
    pub refuse_runs: bool,
}

#[allow(dead_code)]
impl MockHardware {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_call(&self) -> Option<&HwCall> {
        self.calls.last()
    }

    pub fn count(&self, call: HwCall) -> usize {
        self.calls.iter().filter(|c| **c == call).count()
    }

    pub fn take(&mut self) -> Vec<HwCall> {
        std::mem::take(&mut self.calls)
    }
}

impl ActuatorPort for MockHardware {
    fn belt_forward(&mut self) {
        self.calls.push(HwCall::BeltForward);
    }

    fn belt_reverse(&mut self) {
        self.calls.push(HwCall::BeltReverse);
    }

    fn belt_stop(&mut self) {
        self.calls.push(HwCall::BeltStop);
    }

    fn diverter_to_bin(&mut self, material: Material) {
        self.calls.push(HwCall::Diverter(material));
    }

    fn flap_to_bin(&mut self, material: Material) {
        self.calls.push(HwCall::Flap(material));
    }

    fn request_weight(&mut self) {
        self.calls.push(HwCall::RequestWeight);
    }
}

impl ClassifierPort for MockHardware {
    fn request_classification(&mut self, item: ItemId) {
        self.calls.push(HwCall::Classify(item));
    }
}

impl MotorGate for MockHardware {
    fn request_run(&mut self, motor: MotorId) -> bool {
        self.calls.push(HwCall::RunMotor(motor));
        !self.refuse_runs
    }

    fn reset_motor(&mut self, motor: MotorId) {
        self.calls.push(HwCall::ResetMotor(motor));
    }
}

// ── MockDrive ─────────────────────────────────────────────────

#[derive(Default)]
pub struct MockDrive {
    pub calls: Vec<DriveCall>,
}

#[allow(dead_code)]
impl MockDrive {
    pub fn runs(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, DriveCall::Run(..)))
            .count()
    }
}

impl MotorPort for MockDrive {
    fn run(&mut self, motor: MotorId, direction: Direction) {
        self.calls.push(DriveCall::Run(motor, direction));
    }

    fn stop(&mut self, motor: MotorId) {
        self.calls.push(DriveCall::Stop(motor));
    }
}

// ── Recording sinks ───────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSinks {
    pub outcomes: Vec<Outcome>,
    pub faults: Vec<MotorFault>,
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSinks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_outcome(&self) -> Option<&Outcome> {
        self.outcomes.last()
    }
}

impl ReportSink for RecordingSinks {
    fn report_outcome(&mut self, outcome: &Outcome) {
        self.outcomes.push(outcome.clone());
    }

    fn report_fault(&mut self, fault: &MotorFault) {
        self.faults.push(*fault);
    }
}

impl EventSink for RecordingSinks {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── Catalog ───────────────────────────────────────────────────

/// Catalog that counts lookups, to prove verification was skipped.
pub struct CountingCatalog {
    inner: CatalogSnapshot,
    pub lookups: Cell<u32>,
}

#[allow(dead_code)]
impl CountingCatalog {
    pub fn new(inner: CatalogSnapshot) -> Self {
        Self {
            inner,
            lookups: Cell::new(0),
        }
    }
}

impl CatalogPort for CountingCatalog {
    fn lookup(&self, barcode: &str) -> Option<&CatalogEntry> {
        self.lookups.set(self.lookups.get() + 1);
        self.inner.lookup(barcode)
    }
}

#[allow(dead_code)]
pub fn entry(barcode: &str, material: Material) -> CatalogEntry {
    CatalogEntry {
        barcode: barcode.into(),
        material,
        weight_min_g: 480.0,
        weight_max_g: 520.0,
        width_min_mm: 60.0,
        width_max_mm: 70.0,
        height_min_mm: 170.0,
        height_max_mm: 190.0,
    }
}

/// "123" PET, "456" glass, "789" aluminum, all with the same bounds.
#[allow(dead_code)]
pub fn test_catalog() -> CatalogSnapshot {
    CatalogSnapshot::from_entries([
        entry("123", Material::Pet),
        entry("456", Material::Glass),
        entry("789", Material::Aluminum),
    ])
    .unwrap()
}

#[allow(dead_code)]
pub fn class(material: Material, width_mm: f32, height_mm: f32) -> Classification {
    Classification {
        material,
        width_mm,
        height_mm,
    }
}

// ── Bench: AppService + mocks + a manual clock ────────────────

pub struct Bench {
    pub app: AppService,
    pub hw: MockHardware,
    pub sinks: RecordingSinks,
    pub now: u64,
}

#[allow(dead_code)]
impl Bench {
    pub fn new() -> Self {
        Self::with_config(SystemConfig::default())
    }

    pub fn with_config(config: SystemConfig) -> Self {
        let mut app = AppService::new(config, test_catalog());
        let mut sinks = RecordingSinks::new();
        app.start(&mut sinks);
        Self {
            app,
            hw: MockHardware::new(),
            sinks,
            now: 0,
        }
    }

    pub fn at(&mut self, now: u64) -> &mut Self {
        self.now = now;
        self
    }

    pub fn send(&mut self, msg: Msg) -> &mut Self {
        self.app.handle(msg, self.now, &mut self.hw, &mut self.sinks);
        self
    }

    pub fn sensor(&mut self, ev: SensorEvent) -> &mut Self {
        self.send(Msg::Sensor(ev))
    }

    pub fn tick(&mut self) -> &mut Self {
        self.send(Msg::Tick)
    }

    pub fn classified(&mut self, item: u32, c: Classification) -> &mut Self {
        self.send(Msg::Classified {
            item: ItemId(item),
            result: Ok(c),
        })
    }

    pub fn classifier_failed(&mut self, item: u32, e: ClassifierError) -> &mut Self {
        self.send(Msg::Classified {
            item: ItemId(item),
            result: Err(e),
        })
    }

    /// Entry, barcode, exit, weight and classification for the next item.
    pub fn insert(&mut self, item: u32, barcode: &str, grams: f32, c: Classification) -> &mut Self {
        let t = self.now;
        self.at(t).sensor(SensorEvent::EntryTrigger);
        self.at(t + 50).sensor(SensorEvent::BarcodeRead(barcode.into()));
        self.at(t + 300).sensor(SensorEvent::ExitTrigger);
        self.at(t + 400).sensor(SensorEvent::WeightReading(grams));
        self.at(t + 600).classified(item, c)
    }
}
