//! Courier multi-device scenario harness
//!
//! Drives several isolated automation sessions, one per simulated user device,
//! through a single scripted scenario. An action on one device is confirmed by
//! polling for its effect on another; side effects outside the UI are checked
//! against a balance API.

// ----------------------------------------------------------------------------
// Module Declarations
// ----------------------------------------------------------------------------

pub mod actions;
pub mod actor;
pub mod config;
pub mod error;
pub mod etherscan;
pub mod identity;
pub mod locator;
pub mod observable;
pub mod pool;
pub mod runner;
pub mod scenario;
pub mod session;
pub mod vars;
pub mod verification;
pub mod wait;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use actions::{
    Action, Back, CaptureBalance, CaptureText, Click, PressKeys, ScrollTo, SetValue, StepContext, TypeText,
    VerifyBalanceUpdated,
};
pub use actor::{AccessRecovery, Actor, ActorId, Role};
pub use config::{AppiumConfig, BalanceConfig, HarnessConfig, TimingConfig};
pub use error::{HarnessError, HarnessResult};
pub use etherscan::EtherscanClient;
pub use identity::{Identity, Parametrization, RoleBindings};
pub use locator::{ElementKind, Locator, Target};
pub use observable::{Expectation, Observable};
pub use pool::DevicePool;
pub use runner::{RunOutcome, ScenarioReport, ScenarioRunner, StepResult, StepStatus};
pub use scenario::{Scenario, ScenarioBuilder, Step, TAG_ALL};
pub use session::{AutomationSession, ElementHandle, SessionFactory};
pub use vars::{Text, Vars};
pub use verification::{Balance, BalanceSource, BalanceVerifier};
pub use wait::{hold_absent, poll_until, retry_bounded, wait_absent, wait_for, PollConfig};
