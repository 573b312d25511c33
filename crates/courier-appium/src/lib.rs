//! Appium backend for the courier scenario harness
//!
//! Implements the harness session interface over the W3C WebDriver HTTP
//! protocol as served by Appium with the UiAutomator2 driver.

pub mod capabilities;
pub mod error;
pub mod session;
pub mod strategy;

pub use capabilities::AppiumCapabilities;
pub use error::{AppiumError, AppiumResult};
pub use session::{AppiumSession, AppiumSessionFactory};
pub use strategy::{scroll_strategy, to_strategy, Strategy};
