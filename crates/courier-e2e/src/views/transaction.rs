use tracing::info;

use courier_harness::{ElementKind, HarnessResult, Locator};

use super::{ChatView, Device, Screen, View};

fn sign_transaction_button() -> Locator {
    Locator::text_of(ElementKind::Button, "Sign transaction")
}

fn enter_password_input() -> Locator {
    Locator::accessibility_id("enter-password-input")
}

fn got_it_button() -> Locator {
    Locator::text_of(ElementKind::Button, "Got it")
}

/// Confirmation sheet of an outgoing transaction
pub struct SendTransactionView<'a> {
    device: Device<'a>,
}

impl<'a> View<'a> for SendTransactionView<'a> {
    const SCREEN: Screen = Screen::SendTransaction;

    fn on(device: Device<'a>) -> Self {
        Self { device }
    }

    fn device(&self) -> Device<'a> {
        self.device
    }
}

impl<'a> SendTransactionView<'a> {
    /// Sign with the account password and dismiss the confirmation
    pub async fn sign(self, password: &str) -> HarnessResult<ChatView<'a>> {
        info!("{}: signing transaction", self.device.actor());
        self.device.click(&sign_transaction_button()).await?;
        self.device.type_into(&enter_password_input(), password).await?;
        self.device.click(&sign_transaction_button()).await?;
        self.device.click(&got_it_button()).await?;
        Ok(self.goto())
    }
}
