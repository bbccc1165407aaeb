//! Heavy-duty motor identities and drive telemetry.
//!
//! The crusher compacts aluminum, the breaker smashes glass.  Both sit
//! on the drive bus and report current and a running flag; the bus
//! driver itself lives behind [`MotorPort`](crate::app::ports::MotorPort)
//! and [`TelemetryPort`](crate::app::ports::TelemetryPort).

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::item::Material;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MotorId {
    Crusher = 0,
    Breaker = 1,
}

impl MotorId {
    pub const COUNT: usize = 2;
    pub const ALL: [Self; Self::COUNT] = [Self::Crusher, Self::Breaker];

    pub const fn index(self) -> usize {
        self as usize
    }

    /// Motor that must run for a container of this material, if any.
    pub const fn for_material(material: Material) -> Option<Self> {
        match material {
            Material::Glass => Some(Self::Breaker),
            Material::Aluminum => Some(Self::Crusher),
            Material::Pet | Material::Unknown => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Crusher => "crusher",
            Self::Breaker => "breaker",
        }
    }
}

impl fmt::Display for MotorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Forward,
    Reverse,
}

/// One telemetry sample from a motor drive.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MotorReading {
    pub current_amps: f32,
    /// Drive status bit 0.
    pub running: bool,
}

impl MotorReading {
    /// Value substituted when a telemetry read fails.
    pub const IDLE: Self = Self {
        current_amps: 0.0,
        running: false,
    };
}
