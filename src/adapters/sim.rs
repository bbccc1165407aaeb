//! Simulated machine for the bench binary and runtime tests.
//!
//! A [`Scenario`] scripts everything the outside world would do: the
//! catalog, timed sensor edges, per-item load-cell and classifier
//! answers, and windows during which a motor draws jam current.
//!
//! - [`SimConveyor`] implements `ActuatorPort` + `ClassifierPort` and
//!   answers weight and classification requests from the item scripts.
//! - [`SimDrives`] implements `MotorPort` + `TelemetryPort`; clones share
//!   one drive bus.
//! - [`scripted_events`] turns the timed events into a sensor stream.

use core::cell::RefCell;
use core::time::Duration;
use std::collections::VecDeque;
use std::path::Path;
use std::rc::Rc;

use futures_lite::{Stream, stream};
use log::{debug, info, warn};
use serde::Deserialize;

use crate::app::ports::{
    ActuatorPort, ClassifierPort, ClockPort, MotorPort, TelemetryPort,
};
use crate::catalog::{CatalogEntry, CatalogSnapshot};
use crate::error::{CatalogError, ClassifierError, Error, TelemetryError};
use crate::events::{Inbox, Msg, SensorEvent, post};
use crate::item::{Classification, ItemId, Material};
use crate::motor::{Direction, MotorId, MotorReading};

/// Current drawn by a healthy motor under load.
pub const NORMAL_LOAD_AMPS: f32 = 1.5;

// ── Scenario ─────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub catalog: Vec<CatalogEntry>,
    #[serde(default)]
    pub events: Vec<TimedEvent>,
    /// Answers for successive inspections, in order.
    #[serde(default)]
    pub items: Vec<ItemScript>,
    #[serde(default)]
    pub jams: Vec<JamWindow>,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TimedEvent {
    pub at_ms: u64,
    pub event: SensorEvent,
}

/// Load-cell and classifier behaviour for one inspection.  A missing
/// answer is never sent, which exercises the data timeout.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ItemScript {
    pub weight_g: Option<f32>,
    pub classification: Option<Classification>,
    pub classifier_fails: bool,
}

/// `motor` draws `amps` whenever it runs between `from_ms` and `to_ms`.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct JamWindow {
    pub motor: MotorId,
    pub from_ms: u64,
    pub to_ms: u64,
    pub amps: f32,
}

impl Scenario {
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let mut scenario: Self =
            serde_json::from_str(json).map_err(|e| Error::Scenario(e.to_string()))?;
        scenario.events.sort_by_key(|e| e.at_ms);
        Ok(scenario)
    }

    pub fn load(path: &Path) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Scenario(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&text)
    }

    pub fn catalog_snapshot(&self) -> Result<CatalogSnapshot, CatalogError> {
        CatalogSnapshot::from_entries(self.catalog.iter().cloned())
    }
}

/// Replay `events` at their scripted times, measured on `clock`.
pub fn scripted_events<C>(events: Vec<TimedEvent>, clock: C) -> impl Stream<Item = SensorEvent>
where
    C: ClockPort,
{
    stream::unfold(
        (events.into_iter(), clock),
        |(mut events, clock)| async move {
            let next = events.next()?;
            let now = clock.now_ms();
            if next.at_ms > now {
                async_io_mini::Timer::after(Duration::from_millis(next.at_ms - now)).await;
            }
            Some((next.event, (events, clock)))
        },
    )
}

// ── Conveyor ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BeltMotion {
    #[default]
    Stopped,
    Forward,
    Reverse,
}

/// Simulated belt, diverter, flap, load cell and camera.
pub struct SimConveyor<'a> {
    inbox: &'a Inbox,
    scripts: VecDeque<ItemScript>,
    belt: BeltMotion,
    diverter: Option<Material>,
    flap: Option<Material>,
    classifications: u32,
}

impl<'a> SimConveyor<'a> {
    pub fn new(inbox: &'a Inbox, scripts: Vec<ItemScript>) -> Self {
        Self {
            inbox,
            scripts: scripts.into(),
            belt: BeltMotion::Stopped,
            diverter: None,
            flap: None,
            classifications: 0,
        }
    }

    pub fn belt(&self) -> BeltMotion {
        self.belt
    }

    pub fn diverter(&self) -> Option<Material> {
        self.diverter
    }

    pub fn flap(&self) -> Option<Material> {
        self.flap
    }

    fn set_belt(&mut self, motion: BeltMotion) {
        if self.belt != motion {
            debug!("SIM: belt {:?} -> {:?}", self.belt, motion);
            self.belt = motion;
        }
    }
}

impl ActuatorPort for SimConveyor<'_> {
    fn belt_forward(&mut self) {
        self.set_belt(BeltMotion::Forward);
    }

    fn belt_reverse(&mut self) {
        self.set_belt(BeltMotion::Reverse);
    }

    fn belt_stop(&mut self) {
        self.set_belt(BeltMotion::Stopped);
    }

    fn diverter_to_bin(&mut self, material: Material) {
        debug!("SIM: diverter -> {}", material);
        self.diverter = Some(material);
    }

    fn flap_to_bin(&mut self, material: Material) {
        debug!("SIM: flap -> {}", material);
        self.flap = Some(material);
    }

    fn request_weight(&mut self) {
        match self.scripts.front().and_then(|s| s.weight_g) {
            Some(grams) => {
                post(self.inbox, Msg::Sensor(SensorEvent::WeightReading(grams)));
            }
            None => warn!("SIM: load cell silent for this inspection"),
        }
    }
}

impl ClassifierPort for SimConveyor<'_> {
    fn request_classification(&mut self, item: ItemId) {
        self.classifications += 1;
        let script = self.scripts.pop_front().unwrap_or_default();
        let result = if script.classifier_fails {
            Err(ClassifierError::NoDetection)
        } else if let Some(class) = script.classification {
            Ok(class)
        } else {
            warn!("SIM: classifier silent for {}", item);
            return;
        };
        post(self.inbox, Msg::Classified { item, result });
    }
}

// ── Motor drives ─────────────────────────────────────────────

#[derive(Debug, Default)]
struct DriveBus {
    running: [Option<Direction>; MotorId::COUNT],
    commands: [u32; MotorId::COUNT],
}

/// Simulated drive bus shared by both guards.
#[derive(Clone)]
pub struct SimDrives<C> {
    bus: Rc<RefCell<DriveBus>>,
    jams: Rc<[JamWindow]>,
    clock: C,
}

impl<C: ClockPort> SimDrives<C> {
    pub fn new(jams: Vec<JamWindow>, clock: C) -> Self {
        info!("SIM: drive bus with {} scripted jam window(s)", jams.len());
        Self {
            bus: Rc::new(RefCell::new(DriveBus::default())),
            jams: jams.into(),
            clock,
        }
    }

    pub fn direction(&self, motor: MotorId) -> Option<Direction> {
        self.bus.borrow().running[motor.index()]
    }

    /// Run and stop commands received by `motor`.
    pub fn command_count(&self, motor: MotorId) -> u32 {
        self.bus.borrow().commands[motor.index()]
    }

    fn jam_amps(&self, motor: MotorId, now_ms: u64) -> Option<f32> {
        self.jams
            .iter()
            .find(|w| w.motor == motor && (w.from_ms..w.to_ms).contains(&now_ms))
            .map(|w| w.amps)
    }
}

impl<C: ClockPort> MotorPort for SimDrives<C> {
    fn run(&mut self, motor: MotorId, direction: Direction) {
        let mut bus = self.bus.borrow_mut();
        bus.running[motor.index()] = Some(direction);
        bus.commands[motor.index()] += 1;
        debug!("SIM: {} run {:?}", motor, direction);
    }

    fn stop(&mut self, motor: MotorId) {
        let mut bus = self.bus.borrow_mut();
        bus.running[motor.index()] = None;
        bus.commands[motor.index()] += 1;
        debug!("SIM: {} stop", motor);
    }
}

impl<C: ClockPort> TelemetryPort for SimDrives<C> {
    fn read_motor(&mut self, motor: MotorId) -> Result<MotorReading, TelemetryError> {
        if self.direction(motor).is_none() {
            return Ok(MotorReading::IDLE);
        }
        let current_amps = self
            .jam_amps(motor, self.clock.now_ms())
            .unwrap_or(NORMAL_LOAD_AMPS);
        Ok(MotorReading {
            current_amps,
            running: true,
        })
    }
}
