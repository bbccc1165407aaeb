//! Single-threaded async runtime.
//!
//! Uses `edge-executor` for cooperative multi-task scheduling and
//! `async-io-mini` for reactor-driven timers (no busy-spinning).  The
//! pipeline actor is the only task that touches [`AppService`]; every
//! other task talks to it through the inbox.
//!
//! ```text
//!  ┌──────────────────────────────────────────────────────────────┐
//!  │  futures_lite::block_on                                      │
//!  │  ┌────────────────────────────────────────────────────────┐  │
//!  │  │  edge_executor::LocalExecutor                          │  │
//!  │  │                                                        │  │
//!  │  │  ┌─────────┐ ┌──────┐ ┌───────┐      ┌──────────────┐ │  │
//!  │  │  │ Sensors │ │ Tick │ │ Telem │ ───▶ │   Pipeline   │ │  │
//!  │  │  └─────────┘ └──────┘ └───────┘ Inbox│    actor     │ │  │
//!  │  │  ┌───────────────┐ ┌───────────────┐ │              │ │  │
//!  │  │  │ Guard crusher │ │ Guard breaker │◀┤  MotorGate   │ │  │
//!  │  │  │ 200ms ⏱       │ │ 200ms ⏱       │─▶              │ │  │
//!  │  │  └───────────────┘ └───────────────┘ └──────────────┘ │  │
//!  │  └────────────────────────────────────────────────────────┘  │
//!  └──────────────────────────────────────────────────────────────┘
//! ```

use core::future::Future;
use core::pin::pin;
use core::time::Duration;

use async_io_mini::Timer;
use edge_executor::LocalExecutor;
use embassy_sync::channel::Channel;
use futures_lite::{Stream, StreamExt};
use log::{debug, info, warn};

use crate::app::ports::{
    ActuatorPort, ClassifierPort, ClockPort, EventSink, MotorGate, MotorPort, ReportSink,
    TelemetryPort,
};
use crate::app::service::AppService;
use crate::config::JamConfig;
use crate::events::{GuardQueue, GuardRequest, Inbox, Msg, SensorEvent, post};
use crate::item::{ItemId, Material};
use crate::jam::JamGuard;
use crate::motor::MotorId;

// ── Guard channels ───────────────────────────────────────────

/// One request queue per jam guard.
pub struct GuardChannels {
    crusher: GuardQueue,
    breaker: GuardQueue,
}

impl GuardChannels {
    pub const fn new() -> Self {
        Self {
            crusher: Channel::new(),
            breaker: Channel::new(),
        }
    }

    pub fn queue(&self, motor: MotorId) -> &GuardQueue {
        match motor {
            MotorId::Crusher => &self.crusher,
            MotorId::Breaker => &self.breaker,
        }
    }
}

impl Default for GuardChannels {
    fn default() -> Self {
        Self::new()
    }
}

/// [`MotorGate`] that hands requests to the guard tasks without blocking.
#[derive(Clone, Copy)]
pub struct GuardGate<'a> {
    channels: &'a GuardChannels,
}

impl<'a> GuardGate<'a> {
    pub fn new(channels: &'a GuardChannels) -> Self {
        Self { channels }
    }

    fn send(&self, motor: MotorId, req: GuardRequest) -> bool {
        let queued = self.channels.queue(motor).try_send(req).is_ok();
        if !queued {
            warn!("GATE[{}]: request queue full, {:?} dropped", motor, req);
        }
        queued
    }
}

impl MotorGate for GuardGate<'_> {
    fn request_run(&mut self, motor: MotorId) -> bool {
        self.send(motor, GuardRequest::Run)
    }

    fn reset_motor(&mut self, motor: MotorId) {
        self.send(motor, GuardRequest::Reset);
    }
}

/// The pipeline actor's outbound ports: conveyor hardware plus the gate.
struct ActorPorts<'a, H> {
    hw: H,
    gate: GuardGate<'a>,
}

impl<H: ActuatorPort> ActuatorPort for ActorPorts<'_, H> {
    fn belt_forward(&mut self) {
        self.hw.belt_forward();
    }

    fn belt_reverse(&mut self) {
        self.hw.belt_reverse();
    }

    fn belt_stop(&mut self) {
        self.hw.belt_stop();
    }

    fn diverter_to_bin(&mut self, material: Material) {
        self.hw.diverter_to_bin(material);
    }

    fn flap_to_bin(&mut self, material: Material) {
        self.hw.flap_to_bin(material);
    }

    fn request_weight(&mut self) {
        self.hw.request_weight();
    }
}

impl<H: ClassifierPort> ClassifierPort for ActorPorts<'_, H> {
    fn request_classification(&mut self, item: ItemId) {
        self.hw.request_classification(item);
    }
}

impl<H> MotorGate for ActorPorts<'_, H> {
    fn request_run(&mut self, motor: MotorId) -> bool {
        self.gate.request_run(motor)
    }

    fn reset_motor(&mut self, motor: MotorId) {
        self.gate.reset_motor(motor);
    }
}

// ── Tasks ────────────────────────────────────────────────────

/// Sole consumer of the inbox and sole mutator of pipeline state.
async fn pipeline_actor<H, S, C>(
    service: &mut AppService,
    inbox: &Inbox,
    mut ports: ActorPorts<'_, H>,
    sinks: &mut S,
    clock: C,
) where
    H: ActuatorPort + ClassifierPort,
    S: ReportSink + EventSink,
    C: ClockPort,
{
    service.start(sinks);
    loop {
        let msg = inbox.receive().await;
        service.handle(msg, clock.now_ms(), &mut ports, sinks);
    }
}

async fn sensor_task(sensors: impl Stream<Item = SensorEvent>, inbox: &Inbox) {
    let mut sensors = pin!(sensors);
    while let Some(event) = sensors.next().await {
        debug!("SENSOR: {:?}", event);
        inbox.send(Msg::Sensor(event)).await;
    }
    warn!("SENSOR: stream ended, no further sensor input");
}

async fn tick_task(inbox: &Inbox, period: Duration) {
    loop {
        Timer::after(period).await;
        post(inbox, Msg::Tick);
    }
}

async fn telemetry_task(inbox: &Inbox, period: Duration) {
    loop {
        Timer::after(period).await;
        post(inbox, Msg::Telemetry);
    }
}

/// Samples one motor every `sample_period_ms`.  Requests queued by the
/// pipeline are applied at the start of each cycle.
async fn guard_task<D, C>(
    motor: MotorId,
    cfg: JamConfig,
    requests: &GuardQueue,
    inbox: &Inbox,
    mut drive: D,
    clock: C,
) where
    D: MotorPort + TelemetryPort,
    C: ClockPort,
{
    let period = Duration::from_millis(cfg.sample_period_ms);
    let mut guard = JamGuard::new(motor, cfg);
    info!("JAM[{}]: guard started, sampling every {:?}", motor, period);

    loop {
        let now = clock.now_ms();
        while let Ok(req) = requests.try_receive() {
            match req {
                GuardRequest::Run => {
                    let answer = guard.request_run(now, &mut drive);
                    debug!("JAM[{}]: run request -> {:?}", motor, answer);
                }
                GuardRequest::Reset => {
                    let event = guard.reset(&mut drive);
                    inbox.send(Msg::Jam { motor, event }).await;
                }
            }
        }

        let reading = drive.read_motor(motor);
        if let Some(event) = guard.sample(now, reading, &mut drive) {
            inbox.send(Msg::Jam { motor, event }).await;
        }
        Timer::after(period).await;
    }
}

// ── Runtime ──────────────────────────────────────────────────

/// Driven adapters handed to [`Runtime::run`].
pub struct Adapters<H, D, C> {
    /// Conveyor actuators and the classifier.
    pub hw: H,
    /// Motor drives; cloned once per guard task.
    pub drives: D,
    pub clock: C,
}

pub struct Runtime<'a> {
    inbox: &'a Inbox,
    guards: &'a GuardChannels,
}

impl<'a> Runtime<'a> {
    pub fn new(inbox: &'a Inbox, guards: &'a GuardChannels) -> Self {
        Self { inbox, guards }
    }

    pub fn gate(&self) -> GuardGate<'a> {
        GuardGate::new(self.guards)
    }

    /// Spawn every task and drive them until `shutdown` completes.
    ///
    /// Guard parameters are read once here; a runtime config update
    /// only reaches the pipeline.
    pub fn run<H, D, C, S, E, F>(
        &self,
        service: &'a mut AppService,
        adapters: Adapters<H, D, C>,
        sinks: &'a mut S,
        sensors: E,
        shutdown: F,
    ) -> F::Output
    where
        H: ActuatorPort + ClassifierPort + 'a,
        D: MotorPort + TelemetryPort + Clone + 'a,
        C: ClockPort + Clone + 'a,
        S: ReportSink + EventSink + 'a,
        E: Stream<Item = SensorEvent> + 'a,
        F: Future + 'a,
    {
        let config = service.current_config();
        let Adapters { hw, drives, clock } = adapters;
        let executor: LocalExecutor<'a, 8> = LocalExecutor::new();

        for motor in MotorId::ALL {
            executor
                .spawn(guard_task(
                    motor,
                    config.jam(motor).clone(),
                    self.guards.queue(motor),
                    self.inbox,
                    drives.clone(),
                    clock.clone(),
                ))
                .detach();
        }
        executor
            .spawn(sensor_task(sensors, self.inbox))
            .detach();
        executor
            .spawn(tick_task(
                self.inbox,
                Duration::from_millis(config.tick_interval_ms),
            ))
            .detach();
        executor
            .spawn(telemetry_task(
                self.inbox,
                Duration::from_secs(u64::from(config.telemetry_interval_secs)),
            ))
            .detach();
        let ports = ActorPorts {
            hw,
            gate: self.gate(),
        };
        executor
            .spawn(pipeline_actor(service, self.inbox, ports, sinks, clock))
            .detach();

        info!(
            "Runtime started (tick {} ms, telemetry {} s, {} guards)",
            config.tick_interval_ms,
            config.telemetry_interval_secs,
            MotorId::COUNT
        );

        futures_lite::future::block_on(executor.run(shutdown))
    }
}
