//! Observables: conditions polled on a peer's view to confirm an effect arrived

use std::fmt;
use std::time::Duration;

use crate::actor::ActorId;
use crate::error::HarnessResult;
use crate::locator::{ElementKind, Target};
use crate::pool::DevicePool;
use crate::vars::{Text, Vars};
use crate::wait::{wait_absent, wait_for, PollConfig};

/// Whether the condition must show up or must never show up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expectation {
    Appears,
    /// Must stay false for the full window
    StaysAbsent,
}

/// A condition on one actor's view, checked after a step's action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observable {
    pub target: ActorId,
    pub element: Target,
    pub expectation: Expectation,
    /// Overrides the configured wait window
    pub timeout: Option<Duration>,
}

impl Observable {
    pub fn appears(target: ActorId, element: impl Into<Target>) -> Self {
        Self {
            target,
            element: element.into(),
            expectation: Expectation::Appears,
            timeout: None,
        }
    }

    pub fn stays_absent(target: ActorId, element: impl Into<Target>) -> Self {
        Self {
            target,
            element: element.into(),
            expectation: Expectation::StaysAbsent,
            timeout: None,
        }
    }

    /// `actor` sees exactly this text anywhere on screen
    pub fn text_on(target: ActorId, text: impl Into<Text>) -> Self {
        Self::appears(target, Target::text(ElementKind::Any, text))
    }

    /// `actor` sees a text containing this fragment
    pub fn text_part_on(target: ActorId, text: impl Into<Text>) -> Self {
        Self::appears(target, Target::text_part(ElementKind::Any, text))
    }

    pub fn within(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Poll the target actor until the expectation is settled.
    pub async fn evaluate(&self, pool: &DevicePool, vars: &Vars, defaults: PollConfig) -> HarnessResult<()> {
        let actor = pool.actor(self.target)?;
        let locator = self.element.resolve(vars)?;
        let config = match self.timeout {
            Some(timeout) => defaults.with_timeout(timeout),
            None => defaults,
        };

        match self.expectation {
            Expectation::Appears => wait_for(actor.session(), self.target, &locator, config).await.map(|_| ()),
            Expectation::StaysAbsent => wait_absent(actor.session(), self.target, &locator, config).await,
        }
    }
}

impl fmt::Display for Observable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.expectation {
            Expectation::Appears => write!(f, "{} sees {}", self.target, self.element),
            Expectation::StaysAbsent => write!(f, "{} never sees {}", self.target, self.element),
        }
    }
}
