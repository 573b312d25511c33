//! Step actions
//!
//! An action runs against the view of the actor its step is attributed to.
//! Built-in actions cover raw UI gestures and balance bookkeeping; page-object
//! crates add their own by implementing [`Action`].

use async_trait::async_trait;
use tracing::{debug, info};

use crate::actor::Actor;
use crate::error::{HarnessError, HarnessResult};
use crate::locator::Target;
use crate::session::{AutomationSession, ElementHandle};
use crate::vars::{Text, Vars};
use crate::verification::{Balance, BalanceSource, BalanceVerifier};
use crate::wait::{wait_for, PollConfig};

/// What an action can reach while it runs
pub struct StepContext<'a> {
    pub actor: &'a Actor,
    pub vars: &'a mut Vars,
    /// Window for UI lookups
    pub wait: PollConfig,
    /// Window for balance verification
    pub balance_wait: PollConfig,
    pub balances: Option<&'a dyn BalanceSource>,
}

impl<'a> StepContext<'a> {
    pub fn session(&self) -> &'a dyn AutomationSession {
        self.actor.session()
    }

    /// Resolve `target` and wait for it on this actor's screen
    pub async fn find(&self, target: &Target) -> HarnessResult<ElementHandle> {
        let locator = target.resolve(&*self.vars)?;
        wait_for(self.session(), self.actor.id(), &locator, self.wait).await
    }

    pub fn resolve(&self, text: &Text) -> HarnessResult<String> {
        text.resolve(&*self.vars)
    }

    pub fn balances(&self) -> HarnessResult<&'a dyn BalanceSource> {
        self.balances
            .ok_or_else(|| HarnessError::Config("no balance source configured".to_string()))
    }
}

#[async_trait]
pub trait Action: Send + Sync {
    /// Short human-readable form used in logs and reports
    fn describe(&self) -> String;

    async fn perform(&self, ctx: &mut StepContext<'_>) -> HarnessResult<()>;
}

/// Wait for an element, then click it
#[derive(Debug, Clone)]
pub struct Click {
    pub target: Target,
}

impl Click {
    pub fn new(target: impl Into<Target>) -> Self {
        Self { target: target.into() }
    }
}

#[async_trait]
impl Action for Click {
    fn describe(&self) -> String {
        format!("click {}", self.target)
    }

    async fn perform(&self, ctx: &mut StepContext<'_>) -> HarnessResult<()> {
        let element = ctx.find(&self.target).await?;
        ctx.session().click(&element).await
    }
}

/// Append text to an input
#[derive(Debug, Clone)]
pub struct TypeText {
    pub target: Target,
    pub text: Text,
}

impl TypeText {
    pub fn new(target: impl Into<Target>, text: impl Into<Text>) -> Self {
        Self {
            target: target.into(),
            text: text.into(),
        }
    }
}

#[async_trait]
impl Action for TypeText {
    fn describe(&self) -> String {
        format!("type {} into {}", self.text, self.target)
    }

    async fn perform(&self, ctx: &mut StepContext<'_>) -> HarnessResult<()> {
        let text = ctx.resolve(&self.text)?;
        let element = ctx.find(&self.target).await?;
        ctx.session().send_keys(&element, &text).await
    }
}

/// Replace the content of an input
#[derive(Debug, Clone)]
pub struct SetValue {
    pub target: Target,
    pub text: Text,
}

impl SetValue {
    pub fn new(target: impl Into<Target>, text: impl Into<Text>) -> Self {
        Self {
            target: target.into(),
            text: text.into(),
        }
    }
}

#[async_trait]
impl Action for SetValue {
    fn describe(&self) -> String {
        format!("set {} to {}", self.target, self.text)
    }

    async fn perform(&self, ctx: &mut StepContext<'_>) -> HarnessResult<()> {
        let text = ctx.resolve(&self.text)?;
        let element = ctx.find(&self.target).await?;
        ctx.session().set_value(&element, &text).await
    }
}

/// Enter text key by key through the device keyboard.
///
/// Used where the app reads amounts from its own keypad and ignores
/// injected text.
#[derive(Debug, Clone)]
pub struct PressKeys {
    pub text: Text,
}

impl PressKeys {
    pub fn new(text: impl Into<Text>) -> Self {
        Self { text: text.into() }
    }
}

#[async_trait]
impl Action for PressKeys {
    fn describe(&self) -> String {
        format!("press keys {}", self.text)
    }

    async fn perform(&self, ctx: &mut StepContext<'_>) -> HarnessResult<()> {
        let text = ctx.resolve(&self.text)?;
        ctx.session().press_keys(&text).await
    }
}

/// Press the system back button
#[derive(Debug, Clone, Copy)]
pub struct Back {
    pub times: usize,
}

impl Back {
    pub fn once() -> Self {
        Self { times: 1 }
    }

    pub fn times(times: usize) -> Self {
        Self { times }
    }
}

#[async_trait]
impl Action for Back {
    fn describe(&self) -> String {
        match self.times {
            1 => "back".to_string(),
            n => format!("back x{}", n),
        }
    }

    async fn perform(&self, ctx: &mut StepContext<'_>) -> HarnessResult<()> {
        for _ in 0..self.times {
            ctx.session().back().await?;
        }
        Ok(())
    }
}

/// Scroll the current list until the element is on screen
#[derive(Debug, Clone)]
pub struct ScrollTo {
    pub target: Target,
}

impl ScrollTo {
    pub fn new(target: impl Into<Target>) -> Self {
        Self { target: target.into() }
    }
}

#[async_trait]
impl Action for ScrollTo {
    fn describe(&self) -> String {
        format!("scroll to {}", self.target)
    }

    async fn perform(&self, ctx: &mut StepContext<'_>) -> HarnessResult<()> {
        let locator = self.target.resolve(&*ctx.vars)?;
        ctx.session().scroll_to(&locator).await.map(|_| ())
    }
}

/// Store the text of an element in a variable
#[derive(Debug, Clone)]
pub struct CaptureText {
    pub target: Target,
    pub var: String,
}

impl CaptureText {
    pub fn new(target: impl Into<Target>, var: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            var: var.into(),
        }
    }
}

#[async_trait]
impl Action for CaptureText {
    fn describe(&self) -> String {
        format!("capture {} as ${}", self.target, self.var)
    }

    async fn perform(&self, ctx: &mut StepContext<'_>) -> HarnessResult<()> {
        let element = ctx.find(&self.target).await?;
        let text = ctx.session().element_text(&element).await?;
        debug!("{} captured ${} = '{}'", ctx.actor.id(), self.var, text);
        ctx.vars.set(self.var.clone(), text);
        Ok(())
    }
}

/// Store the current balance of an address, in wei, in a variable
#[derive(Debug, Clone)]
pub struct CaptureBalance {
    pub address: Text,
    pub var: String,
}

impl CaptureBalance {
    pub fn new(address: impl Into<Text>, var: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            var: var.into(),
        }
    }
}

#[async_trait]
impl Action for CaptureBalance {
    fn describe(&self) -> String {
        format!("capture balance of {} as ${}", self.address, self.var)
    }

    async fn perform(&self, ctx: &mut StepContext<'_>) -> HarnessResult<()> {
        let address = ctx.resolve(&self.address)?;
        let balance = ctx.balances()?.get_balance(&address).await?;
        info!("Balance of {} before transfer: {}", address, balance);
        ctx.vars.set(self.var.clone(), balance.wei().to_string());
        Ok(())
    }
}

/// Poll until the balance of an address moves away from a captured value
#[derive(Debug, Clone)]
pub struct VerifyBalanceUpdated {
    pub address: Text,
    pub initial_var: String,
}

impl VerifyBalanceUpdated {
    pub fn new(address: impl Into<Text>, initial_var: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            initial_var: initial_var.into(),
        }
    }
}

#[async_trait]
impl Action for VerifyBalanceUpdated {
    fn describe(&self) -> String {
        format!("verify balance of {} moved from ${}", self.address, self.initial_var)
    }

    async fn perform(&self, ctx: &mut StepContext<'_>) -> HarnessResult<()> {
        let address = ctx.resolve(&self.address)?;
        let initial: Balance = ctx.vars.get(&self.initial_var)?.parse()?;
        let verifier = BalanceVerifier::new(ctx.balances()?, ctx.balance_wait);
        verifier.verify_balance_is_updated(initial, &address).await.map(|_| ())
    }
}
