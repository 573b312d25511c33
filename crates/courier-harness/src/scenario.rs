//! Scenario scripts
//!
//! A scenario is an ordered list of steps, each attributed to one actor, built
//! once and then run any number of times with different role bindings.

use std::fmt;
use std::sync::Arc;

use crate::actions::Action;
use crate::actor::{ActorId, Role};
use crate::error::{HarnessError, HarnessResult};
use crate::observable::Observable;

/// Tag every scenario carries implicitly
pub const TAG_ALL: &str = "all";

/// One action by one actor, with an optional effect to observe afterwards
#[derive(Clone)]
pub struct Step {
    pub name: String,
    pub actor: ActorId,
    pub action: Arc<dyn Action>,
    pub expect: Option<Observable>,
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("name", &self.name)
            .field("actor", &self.actor)
            .field("action", &self.action.describe())
            .field("expect", &self.expect)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Scenario {
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    /// `roles[i]` is played by actor `i`
    pub roles: Vec<Role>,
    pub steps: Vec<Step>,
}

impl Scenario {
    pub fn builder(name: impl Into<String>) -> ScenarioBuilder {
        ScenarioBuilder::new(name)
    }

    pub fn actor_count(&self) -> usize {
        self.roles.len()
    }

    pub fn matches_tag(&self, tag: &str) -> bool {
        tag == TAG_ALL || self.tags.iter().any(|t| t == tag)
    }
}

pub struct ScenarioBuilder {
    name: String,
    description: String,
    tags: Vec<String>,
    roles: Vec<Role>,
    steps: Vec<Step>,
    dangling_expect: bool,
}

impl ScenarioBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            tags: vec![TAG_ALL.to_string()],
            roles: Vec::new(),
            steps: Vec::new(),
            dangling_expect: false,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        let tag = tag.into();
        if !self.tags.contains(&tag) {
            self.tags.push(tag);
        }
        self
    }

    /// Declare the next actor; actors are numbered in declaration order
    pub fn actor(mut self, role: impl Into<Role>) -> Self {
        self.roles.push(role.into());
        self
    }

    pub fn step(mut self, actor: ActorId, name: impl Into<String>, action: impl Action + 'static) -> Self {
        self.steps.push(Step {
            name: name.into(),
            actor,
            action: Arc::new(action),
            expect: None,
        });
        self
    }

    /// Attach an observable to the last step
    pub fn expect(mut self, observable: Observable) -> Self {
        match self.steps.last_mut() {
            Some(step) => step.expect = Some(observable),
            None => self.dangling_expect = true,
        }
        self
    }

    pub fn build(self) -> HarnessResult<Scenario> {
        if self.roles.is_empty() {
            return Err(HarnessError::Config(format!("scenario '{}' declares no actors", self.name)));
        }
        if self.dangling_expect {
            return Err(HarnessError::Config(format!(
                "scenario '{}' has an observable before its first step",
                self.name
            )));
        }

        let actors = self.roles.len();
        for (index, step) in self.steps.iter().enumerate() {
            if step.actor.0 >= actors {
                return Err(HarnessError::Config(format!(
                    "step {} '{}' of '{}' runs on undeclared {}",
                    index + 1,
                    step.name,
                    self.name,
                    step.actor
                )));
            }
            if let Some(observable) = &step.expect {
                if observable.target.0 >= actors {
                    return Err(HarnessError::Config(format!(
                        "step {} '{}' of '{}' observes undeclared {}",
                        index + 1,
                        step.name,
                        self.name,
                        observable.target
                    )));
                }
            }
        }

        Ok(Scenario {
            name: self.name,
            description: self.description,
            tags: self.tags,
            roles: self.roles,
            steps: self.steps,
        })
    }
}
