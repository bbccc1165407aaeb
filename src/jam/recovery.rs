//! Timer-driven recovery sequence.
//!
//! One recovery is a fixed table of steps, each held for a configured
//! duration.  The guard advances through the table on its sampling
//! ticks; nothing here sleeps.
//!
//! ```text
//!  stop·pause ─▶ reverse R ─▶ stop·pause ─▶ forward F ─┐
//!  ┌───────────────────────────────────────────────────┘
//!  └▶ stop·pause ─▶ reverse R ─▶ stop·pause ─▶ forward F ─▶ stop
//! ```

use crate::config::JamConfig;
use crate::motor::Direction;

/// What the motor is doing within a recovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecoveryPhase {
    #[default]
    None,
    Reversing,
    Forwarding,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryStep {
    Pause,
    Reverse,
    Forward,
}

/// Reverse/forward pair, repeated once.
pub const RECOVERY_STEPS: [RecoveryStep; 8] = [
    RecoveryStep::Pause,
    RecoveryStep::Reverse,
    RecoveryStep::Pause,
    RecoveryStep::Forward,
    RecoveryStep::Pause,
    RecoveryStep::Reverse,
    RecoveryStep::Pause,
    RecoveryStep::Forward,
];

impl RecoveryStep {
    pub fn duration_ms(self, cfg: &JamConfig) -> u64 {
        match self {
            Self::Pause => cfg.pause_ms,
            Self::Reverse => cfg.reverse_ms,
            Self::Forward => cfg.forward_ms,
        }
    }

    /// Drive direction for this step; `None` means stopped.
    pub fn direction(self) -> Option<Direction> {
        match self {
            Self::Pause => None,
            Self::Reverse => Some(Direction::Reverse),
            Self::Forward => Some(Direction::Forward),
        }
    }

    pub fn phase(self) -> RecoveryPhase {
        match self {
            Self::Pause => RecoveryPhase::None,
            Self::Reverse => RecoveryPhase::Reversing,
            Self::Forward => RecoveryPhase::Forwarding,
        }
    }
}

/// Total wall time of one full recovery.
pub fn total_duration_ms(cfg: &JamConfig) -> u64 {
    RECOVERY_STEPS.iter().map(|s| s.duration_ms(cfg)).sum()
}
