//! Error types for the scenario harness
//!
//! Every failure a scenario can hit is a `HarnessError`. All of them are fatal at
//! the scenario level: the runner aborts on the first one and reports it wrapped
//! in [`HarnessError::StepFailed`] when it happened inside a step.

use std::time::Duration;

use thiserror::Error;

use crate::actor::ActorId;

/// Errors raised by the harness, the automation backends and the verification client
#[derive(Debug, Error)]
pub enum HarnessError {
    /// An automation session could not be created
    #[error("Session {index} failed to start: {reason}")]
    SessionStartup { index: usize, reason: String },

    /// Transport-level failure talking to an automation session
    #[error("Session error: {0}")]
    Session(String),

    /// A single element lookup found nothing
    #[error("Element not found: {locator}")]
    ElementNotFound { locator: String },

    /// An observable never appeared on the target actor within its window
    #[error("Observable never appeared on {actor}{} after {timeout:?}: {predicate}", during(.step))]
    ObservableTimeout {
        actor: ActorId,
        /// Name of the step that waited, once the runner knows it
        step: Option<String>,
        predicate: String,
        timeout: Duration,
    },

    /// A negative assertion was violated
    #[error("Observable appeared on {actor} but must stay absent: {predicate}")]
    UnexpectedObservable { actor: ActorId, predicate: String },

    /// Identity recovery failed for an actor
    #[error("Identity recovery failed for {actor}: {reason}")]
    IdentityRecovery { actor: ActorId, reason: String },

    /// Identity recovery was requested twice on the same session
    #[error("Identity already recovered for {actor}")]
    IdentityAlreadyRecovered { actor: ActorId },

    /// Backend state did not reach the expected value
    #[error("Verification failed for {address}: expected {expected}, actual {actual}")]
    VerificationMismatch {
        address: String,
        expected: String,
        actual: String,
    },

    /// The verification source itself failed
    #[error("Verification source error: {0}")]
    Verification(String),

    /// An application-level action failed
    #[error("Action '{action}' failed: {reason}")]
    Action { action: String, reason: String },

    /// A step or observable referenced an actor the pool does not have
    #[error("Unknown actor: {0}")]
    UnknownActor(String),

    /// A step read a scenario variable that was never set
    #[error("Scenario variable '{0}' is not set")]
    UnboundVar(String),

    /// Invalid configuration or scenario definition
    #[error("Configuration error: {0}")]
    Config(String),

    /// A scenario step failed; no later step was executed
    #[error("Step {index} '{step}' on {actor} failed: {source}")]
    StepFailed {
        index: usize,
        step: String,
        actor: ActorId,
        #[source]
        source: Box<HarnessError>,
    },
}

impl HarnessError {
    /// Whether a bounded retry may try the operation again.
    ///
    /// Only lookup misses qualify; transport failures and assertion failures
    /// always propagate.
    pub fn is_retryable(&self) -> bool {
        matches!(self, HarnessError::ElementNotFound { .. })
    }

    pub fn action(action: impl Into<String>, reason: impl ToString) -> Self {
        HarnessError::Action {
            action: action.into(),
            reason: reason.to_string(),
        }
    }

    /// Attribute a timeout to the step it happened in; other errors pass through
    pub fn in_step(self, name: &str) -> Self {
        match self {
            HarnessError::ObservableTimeout {
                actor,
                step: None,
                predicate,
                timeout,
            } => HarnessError::ObservableTimeout {
                actor,
                step: Some(name.to_string()),
                predicate,
                timeout,
            },
            other => other,
        }
    }

    /// The innermost error, looking through step wrappers
    pub fn root_cause(&self) -> &HarnessError {
        match self {
            HarnessError::StepFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

fn during(step: &Option<String>) -> String {
    match step {
        Some(step) => format!(" during '{}'", step),
        None => String::new(),
    }
}

/// Result type for harness operations
pub type HarnessResult<T> = Result<T, HarnessError>;
