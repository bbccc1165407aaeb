//! Reverse-vending-machine controller core.
//!
//! Exposes the item-acceptance pipeline, the motor jam guards and the
//! runtime that wires them together.  All hardware sits behind the port
//! traits in [`app::ports`]; the [`adapters`] module holds host-side
//! implementations, including a scripted machine for bench runs.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod catalog;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod events;
pub mod item;
pub mod jam;
pub mod motor;
pub mod pipeline;
pub mod queue;
pub mod runtime;
pub mod verification;
