//! Verification engine.
//!
//! A pure decision function: given a barcode, the measured values of a
//! complete item and the catalog, decide accept or reject.  Checks run in
//! a fixed order and short-circuit on the first failure:
//!
//! ```text
//!  catalog hit? ─▶ weight ─▶ width ─▶ height ─▶ material ─▶ accept
//!       │            │         │         │          │
//!       ▼            ▼         ▼         ▼          ▼
//!  unknown-product weight    width    height  material-mismatch
//! ```

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::app::ports::CatalogPort;
use crate::config::SystemConfig;
use crate::item::{Item, ItemId, Material, Measurements};

/// Why an item was accepted or rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReasonCode {
    Ok,
    UnknownProduct,
    Weight,
    Width,
    Height,
    MaterialMismatch,
    MissingBarcode,
    SensorTimeout,
    ClassifierError,
    Capacity,
}

impl ReasonCode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::UnknownProduct => "unknown-product",
            Self::Weight => "weight",
            Self::Width => "width",
            Self::Height => "height",
            Self::MaterialMismatch => "material-mismatch",
            Self::MissingBarcode => "missing-barcode",
            Self::SensorTimeout => "sensor-timeout",
            Self::ClassifierError => "classifier-error",
            Self::Capacity => "capacity",
        }
    }

    /// Result code understood by the remote ledger.
    pub const fn remote_code(self) -> u8 {
        match self {
            Self::Ok => 0,
            Self::MaterialMismatch => 2,
            Self::Width => 3,
            Self::UnknownProduct | Self::ClassifierError => 5,
            Self::Weight => 9,
            Self::Height => 13,
            Self::MissingBarcode | Self::SensorTimeout | Self::Capacity => 99,
        }
    }

    /// Operator-facing message.
    pub const fn message(self) -> &'static str {
        match self {
            Self::Ok => "container accepted",
            Self::UnknownProduct => "product not in catalog",
            Self::Weight => "weight out of range",
            Self::Width => "width out of range",
            Self::Height => "height out of range",
            Self::MaterialMismatch => "material does not match product",
            Self::MissingBarcode => "barcode not read",
            Self::SensorTimeout => "measurement did not arrive in time",
            Self::ClassifierError => "container could not be recognised",
            Self::Capacity => "machine busy, please retry",
        }
    }

    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    Reject(ReasonCode),
}

impl Verdict {
    pub const fn reason(self) -> ReasonCode {
        match self {
            Self::Accept => ReasonCode::Ok,
            Self::Reject(r) => r,
        }
    }
}

/// Symmetric slack applied around every catalog range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerances {
    pub weight_g: f32,
    pub dimension_mm: f32,
}

impl Tolerances {
    pub fn from_config(config: &SystemConfig) -> Self {
        Self {
            weight_g: config.weight_tolerance_g,
            dimension_mm: config.dimension_tolerance_mm,
        }
    }
}

impl Default for Tolerances {
    fn default() -> Self {
        Self::from_config(&SystemConfig::default())
    }
}

fn within(value: f32, min: f32, max: f32, slack: f32) -> bool {
    value >= min - slack && value <= max + slack
}

/// Decide accept/reject for a complete item.
pub fn verify(
    barcode: &str,
    m: &Measurements,
    catalog: &impl CatalogPort,
    tol: Tolerances,
) -> Verdict {
    let Some(entry) = catalog.lookup(barcode) else {
        return Verdict::Reject(ReasonCode::UnknownProduct);
    };
    if !within(m.weight_g, entry.weight_min_g, entry.weight_max_g, tol.weight_g) {
        return Verdict::Reject(ReasonCode::Weight);
    }
    if !within(m.width_mm, entry.width_min_mm, entry.width_max_mm, tol.dimension_mm) {
        return Verdict::Reject(ReasonCode::Width);
    }
    if !within(m.height_mm, entry.height_min_mm, entry.height_max_mm, tol.dimension_mm) {
        return Verdict::Reject(ReasonCode::Height);
    }
    if m.material != entry.material {
        return Verdict::Reject(ReasonCode::MaterialMismatch);
    }
    Verdict::Accept
}

/// Terminal result for one item, reported exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub item: ItemId,
    pub barcode: Option<String>,
    pub weight_g: Option<f32>,
    pub material: Material,
    pub width_mm: Option<f32>,
    pub height_mm: Option<f32>,
    pub accepted: bool,
    pub reason: ReasonCode,
}

impl Outcome {
    pub fn accepted(item: &Item) -> Self {
        Self::from_item(item, ReasonCode::Ok)
    }

    pub fn rejected(item: &Item, reason: ReasonCode) -> Self {
        debug_assert!(!reason.is_ok(), "rejection needs a non-ok reason");
        Self::from_item(item, reason)
    }

    fn from_item(item: &Item, reason: ReasonCode) -> Self {
        Self {
            item: item.id,
            barcode: item.barcode.clone(),
            weight_g: item.weight_g,
            material: item.routing_material(),
            width_mm: item.width_mm,
            height_mm: item.height_mm,
            accepted: reason.is_ok(),
            reason,
        }
    }
}
