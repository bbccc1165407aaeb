//! Inbound commands to the application service.
//!
//! These represent actions requested by the outside world (operator
//! panel, maintenance API, catalog sync) that the
//! [`AppService`](super::service::AppService) interprets and acts upon.

use crate::catalog::CatalogSnapshot;
use crate::config::SystemConfig;
use crate::motor::MotorId;

/// Commands that external adapters can send into the application core.
#[derive(Debug, Clone)]
pub enum AppCommand {
    /// Clear a disabled motor after manual service.
    ResetMotor(MotorId),

    /// Swap in a freshly synced catalog snapshot.
    ReplaceCatalog(CatalogSnapshot),

    /// Hot-reload pipeline configuration.  Rejected if it fails validation.
    UpdateConfig(SystemConfig),

    /// Emit a telemetry snapshot immediately.
    ReportStatus,
}
