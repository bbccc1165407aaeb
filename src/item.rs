//! Per-item record threaded through the pipeline.
//!
//! An [`Item`] is created on the entry trigger, filled field by field as
//! the barcode, weight and classification arrive (in any order), and is
//! consumed either by the return sequence or by routing at the diverter.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Container material as reported by the classifier and the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Material {
    Unknown = 0,
    Pet = 1,
    Glass = 2,
    Aluminum = 3,
}

impl Material {
    /// Numeric code used by the remote ledger.
    pub const fn code(self) -> u8 {
        self as u8
    }

    pub const fn from_code(code: u8) -> Self {
        match code {
            1 => Self::Pet,
            2 => Self::Glass,
            3 => Self::Aluminum,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for Material {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::Pet => write!(f, "PET"),
            Self::Glass => write!(f, "glass"),
            Self::Aluminum => write!(f, "aluminum"),
        }
    }
}

/// Correlation id for one physical container.  Monotonic per process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(pub u32);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Classifier answer for one item.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub material: Material,
    pub width_mm: f32,
    pub height_mm: f32,
}

/// The measured values verification needs, available once an item is complete.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurements {
    pub weight_g: f32,
    pub material: Material,
    pub width_mm: f32,
    pub height_mm: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub id: ItemId,
    pub barcode: Option<String>,
    pub weight_g: Option<f32>,
    /// `None` until classified; a classifier may legitimately answer `Unknown`.
    pub material: Option<Material>,
    pub width_mm: Option<f32>,
    pub height_mm: Option<f32>,
    pub created_at_ms: u64,
}

impl Item {
    pub fn new(id: ItemId, created_at_ms: u64) -> Self {
        Self {
            id,
            barcode: None,
            weight_g: None,
            material: None,
            width_mm: None,
            height_mm: None,
            created_at_ms,
        }
    }

    pub fn apply_classification(&mut self, c: Classification) {
        self.material = Some(c.material);
        self.width_mm = Some(c.width_mm);
        self.height_mm = Some(c.height_mm);
    }

    /// Barcode, weight, material and both dimensions are all present.
    pub fn is_complete(&self) -> bool {
        self.barcode.is_some() && self.measurements().is_some()
    }

    pub fn measurements(&self) -> Option<Measurements> {
        Some(Measurements {
            weight_g: self.weight_g?,
            material: self.material?,
            width_mm: self.width_mm?,
            height_mm: self.height_mm?,
        })
    }

    /// Material to route by; unclassified items fall back to `Unknown`.
    pub fn routing_material(&self) -> Material {
        self.material.unwrap_or(Material::Unknown)
    }
}
