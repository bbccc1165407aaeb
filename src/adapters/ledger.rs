//! Outcome ledger adapter.
//!
//! Implements [`ReportSink`]: every terminal outcome becomes one JSON
//! ledger line (the record the remote ledger would receive), and every
//! motor fault is appended to the persistent [`FaultLog`].

use log::{error, info, warn};
use serde::Serialize;

use crate::app::events::AppEvent;
use crate::app::ports::{EventSink, ReportSink, StoragePort};
use crate::diagnostics::FaultLog;
use crate::item::ItemId;
use crate::jam::MotorFault;
use crate::verification::Outcome;

/// Wire shape of one ledger record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerRecord {
    pub item: u32,
    pub barcode: Option<String>,
    pub accepted: bool,
    /// Numeric result code understood by the remote ledger.
    pub code: u8,
    pub reason: &'static str,
    pub material: u8,
    pub weight_g: Option<f32>,
    pub width_mm: Option<f32>,
    pub height_mm: Option<f32>,
}

impl From<&Outcome> for LedgerRecord {
    fn from(o: &Outcome) -> Self {
        Self {
            item: o.item.0,
            barcode: o.barcode.clone(),
            accepted: o.accepted,
            code: o.reason.remote_code(),
            reason: o.reason.as_str(),
            material: o.material.code(),
            weight_g: o.weight_g,
            width_mm: o.width_mm,
            height_mm: o.height_mm,
        }
    }
}

pub struct LedgerSink<S: StoragePort> {
    store: S,
    faults: FaultLog,
    records: Vec<LedgerRecord>,
}

impl<S: StoragePort> LedgerSink<S> {
    pub fn new(store: S) -> Self {
        let mut faults = FaultLog::new();
        faults.init(&store);
        let stored = faults.count(&store);
        if stored > 0 {
            warn!("LEDGER: {} motor fault(s) on record from earlier runs", stored);
        }
        Self {
            store,
            faults,
            records: Vec::new(),
        }
    }

    pub fn records(&self) -> &[LedgerRecord] {
        &self.records
    }

    pub fn accepted(&self) -> usize {
        self.records.iter().filter(|r| r.accepted).count()
    }

    pub fn rejected(&self) -> usize {
        self.records.len() - self.accepted()
    }

    /// Faults currently held in the persistent ring, oldest first.
    pub fn stored_faults(&self) -> Vec<MotorFault> {
        self.faults.read_all(&self.store).into_iter().collect()
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S: StoragePort> ReportSink for LedgerSink<S> {
    fn report_outcome(&mut self, outcome: &Outcome) {
        let record = LedgerRecord::from(outcome);
        match serde_json::to_string(&record) {
            Ok(line) => info!("LEDGER {}", line),
            Err(e) => warn!("LEDGER: cannot encode {}: {}", ItemId(record.item), e),
        }
        self.records.push(record);
    }

    fn report_fault(&mut self, fault: &MotorFault) {
        error!(
            "LEDGER: {} fault recorded after {} recoveries",
            fault.motor, fault.attempts
        );
        if let Err(e) = self.faults.write_entry(&mut self.store, fault) {
            error!("LEDGER: fault log write failed: {}", e);
        }
    }
}

/// Pairs a [`ReportSink`] with an [`EventSink`] so the pipeline actor
/// can own both through one value.
pub struct Outputs<R, E> {
    pub reports: R,
    pub events: E,
}

impl<R: ReportSink, E> ReportSink for Outputs<R, E> {
    fn report_outcome(&mut self, outcome: &Outcome) {
        self.reports.report_outcome(outcome);
    }

    fn report_fault(&mut self, fault: &MotorFault) {
        self.reports.report_fault(fault);
    }
}

impl<R, E: EventSink> EventSink for Outputs<R, E> {
    fn emit(&mut self, event: &AppEvent) {
        self.events.emit(event);
    }
}
