//! Application core: pure domain logic, zero I/O.
//!
//! This module contains the orchestration layer for the acceptance
//! pipeline: message handling, effect application, commands and events.
//! All interaction with hardware happens through **port traits** defined
//! in [`ports`], keeping this layer fully testable without real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
