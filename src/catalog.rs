//! Read-only product catalog snapshot.
//!
//! The catalog is synced out-of-band; the core only ever sees an
//! immutable snapshot.  A refresh replaces the whole snapshot via
//! [`AppCommand::ReplaceCatalog`](crate::app::commands::AppCommand).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::app::ports::CatalogPort;
use crate::error::CatalogError;
use crate::item::Material;

/// Expected material and physical bounds for one barcode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub barcode: String,
    pub material: Material,
    pub weight_min_g: f32,
    pub weight_max_g: f32,
    pub width_min_mm: f32,
    pub width_max_mm: f32,
    pub height_min_mm: f32,
    pub height_max_mm: f32,
}

impl CatalogEntry {
    fn check_ranges(&self) -> Result<(), CatalogError> {
        let ok = self.weight_min_g <= self.weight_max_g
            && self.width_min_mm <= self.width_max_mm
            && self.height_min_mm <= self.height_max_mm;
        if ok {
            Ok(())
        } else {
            Err(CatalogError::InvertedRange(self.barcode.clone()))
        }
    }
}

/// Immutable barcode → entry map.
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    entries: HashMap<String, CatalogEntry>,
}

impl CatalogSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a snapshot, rejecting entries whose bounds are inverted.
    /// A later duplicate barcode replaces an earlier one.
    pub fn from_entries(
        entries: impl IntoIterator<Item = CatalogEntry>,
    ) -> Result<Self, CatalogError> {
        let mut map = HashMap::new();
        for entry in entries {
            entry.check_ranges()?;
            map.insert(entry.barcode.clone(), entry);
        }
        Ok(Self { entries: map })
    }

    /// Parse a JSON array of entries.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let entries: Vec<CatalogEntry> =
            serde_json::from_str(json).map_err(|e| CatalogError::Malformed(e.to_string()))?;
        Self::from_entries(entries)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CatalogPort for CatalogSnapshot {
    fn lookup(&self, barcode: &str) -> Option<&CatalogEntry> {
        self.entries.get(barcode)
    }
}
