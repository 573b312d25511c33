//! Page objects
//!
//! Each view wraps one device and exposes what a user can do on that screen.
//! Navigation consumes the current view and returns the next one, so a flow
//! only type-checks when it follows the app's actual screen order.

use std::fmt;

use tracing::debug;

use courier_harness::{
    wait_for, ActorId, AutomationSession, ElementHandle, HarnessResult, Locator, PollConfig, StepContext,
};

mod chat;
mod console;
mod home;
mod transaction;
mod wallet;

pub use chat::{message_input, payment_request_text, send_button, ChatView, MESSAGE_INPUT, SEND_BUTTON};
pub use console::{ConsoleRecovery, ConsoleView, NEW_ACCOUNT_PASSWORD};
pub use home::HomeView;
pub use transaction::SendTransactionView;
pub use wallet::{transaction_amount_text, TransactionDetailsView, TransactionsView, WalletView};

/// Screens the scenarios move through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Screen {
    Console,
    Home,
    Chat,
    SendTransaction,
    Wallet,
    Transactions,
    TransactionDetails,
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Screen::Console => "console",
            Screen::Home => "home",
            Screen::Chat => "chat",
            Screen::SendTransaction => "send transaction",
            Screen::Wallet => "wallet",
            Screen::Transactions => "transactions",
            Screen::TransactionDetails => "transaction details",
        };
        f.write_str(name)
    }
}

/// A typed screen of one device
pub trait View<'a>: Sized {
    const SCREEN: Screen;

    fn on(device: Device<'a>) -> Self;

    fn device(&self) -> Device<'a>;

    /// Move to the screen `V` on the same device
    fn goto<V: View<'a>>(&self) -> V {
        let device = self.device();
        debug!("{}: {} -> {}", device.actor, Self::SCREEN, V::SCREEN);
        V::on(device)
    }
}

/// The device a view drives, with the lookup window every view uses
#[derive(Clone, Copy)]
pub struct Device<'a> {
    session: &'a dyn AutomationSession,
    actor: ActorId,
    wait: PollConfig,
}

impl<'a> Device<'a> {
    pub fn new(session: &'a dyn AutomationSession, actor: ActorId, wait: PollConfig) -> Self {
        Self { session, actor, wait }
    }

    /// The device a step runs on
    pub fn of_step(ctx: &StepContext<'a>) -> Self {
        Self::new(ctx.actor.session(), ctx.actor.id(), ctx.wait)
    }

    pub fn actor(&self) -> ActorId {
        self.actor
    }

    pub fn wait(&self) -> PollConfig {
        self.wait
    }

    pub fn session(&self) -> &'a dyn AutomationSession {
        self.session
    }

    pub async fn find(&self, locator: &Locator) -> HarnessResult<ElementHandle> {
        wait_for(self.session, self.actor, locator, self.wait).await
    }

    pub async fn click(&self, locator: &Locator) -> HarnessResult<()> {
        let element = self.find(locator).await?;
        self.session.click(&element).await
    }

    /// Click without waiting; a miss is `ElementNotFound`
    pub async fn click_now(&self, locator: &Locator) -> HarnessResult<()> {
        self.session.tap(locator).await
    }

    pub async fn type_into(&self, locator: &Locator, text: &str) -> HarnessResult<()> {
        let element = self.find(locator).await?;
        self.session.send_keys(&element, text).await
    }

    pub async fn set_into(&self, locator: &Locator, text: &str) -> HarnessResult<()> {
        let element = self.find(locator).await?;
        self.session.set_value(&element, text).await
    }

    pub async fn text_of(&self, locator: &Locator) -> HarnessResult<String> {
        let element = self.find(locator).await?;
        self.session.element_text(&element).await
    }

    /// Single presence check
    pub async fn is_showing(&self, locator: &Locator) -> HarnessResult<bool> {
        self.session.is_present(locator).await
    }

    pub async fn back(&self, times: usize) -> HarnessResult<()> {
        for _ in 0..times {
            self.session.back().await?;
        }
        Ok(())
    }
}
