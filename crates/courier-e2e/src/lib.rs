//! Courier end-to-end scenarios
//!
//! Page objects for the messenger and wallet screens, the scenario actions
//! built on them, and the multi-device scenarios themselves.

pub mod actions;
pub mod scenarios;
pub mod suite;
pub mod views;

pub use scenarios::{list, plan, PlannedRun};
pub use suite::{appium_runner, run_all, tally};
pub use views::{ConsoleRecovery, Device, Screen, View};
