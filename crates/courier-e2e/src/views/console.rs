//! First-run console: account creation and access recovery

use async_trait::async_trait;
use tracing::info;

use courier_harness::{
    AccessRecovery, ActorId, AutomationSession, ElementKind, HarnessResult, Identity, Locator, PollConfig,
};

use super::chat::{message_input, send_button};
use super::{Device, HomeView, Screen, View};

/// Password typed when a fresh account is created
pub const NEW_ACCOUNT_PASSWORD: &str = "qwerty1234";

fn create_account_button() -> Locator {
    Locator::text_of(ElementKind::Button, "Create new account")
}

fn have_account_button() -> Locator {
    Locator::text_of(ElementKind::Button, "I already have an account")
}

fn passphrase_input() -> Locator {
    Locator::accessibility_id("passphrase-input")
}

fn password_input() -> Locator {
    Locator::accessibility_id("password-input")
}

fn sign_in_button() -> Locator {
    Locator::text_of(ElementKind::Button, "Sign in")
}

fn signing_phrase_text() -> Locator {
    Locator::text_part_of(ElementKind::Text, "signing phrase")
}

pub struct ConsoleView<'a> {
    device: Device<'a>,
}

impl<'a> View<'a> for ConsoleView<'a> {
    const SCREEN: Screen = Screen::Console;

    fn on(device: Device<'a>) -> Self {
        Self { device }
    }

    fn device(&self) -> Device<'a> {
        self.device
    }
}

impl<'a> ConsoleView<'a> {
    /// Create a fresh account through the console bot and leave the console
    pub async fn create_user(self) -> HarnessResult<HomeView<'a>> {
        info!("{}: creating a new account", self.device.actor());
        self.device.click(&create_account_button()).await?;

        // password, then its confirmation
        for _ in 0..2 {
            self.device
                .type_into(&message_input(), NEW_ACCOUNT_PASSWORD)
                .await?;
            self.device.click(&send_button()).await?;
        }
        self.device.find(&signing_phrase_text()).await?;
        self.device.back(1).await?;
        Ok(self.goto())
    }

    /// Sign into an existing account; done once the username is shown
    pub async fn recover_access(self, identity: &Identity) -> HarnessResult<HomeView<'a>> {
        info!("{}: recovering '{}'", self.device.actor(), identity.username);
        self.device.click(&have_account_button()).await?;
        self.device
            .set_into(&passphrase_input(), &identity.passphrase)
            .await?;
        self.device
            .set_into(&password_input(), &identity.password)
            .await?;
        self.device.click(&sign_in_button()).await?;
        self.device
            .find(&Locator::text(identity.username.clone()))
            .await?;
        Ok(self.goto())
    }

    pub fn home(&self) -> HomeView<'a> {
        self.goto()
    }
}

/// Access recovery through the console screens
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleRecovery {
    wait: PollConfig,
}

impl ConsoleRecovery {
    pub fn new(wait: PollConfig) -> Self {
        Self { wait }
    }
}

#[async_trait]
impl AccessRecovery for ConsoleRecovery {
    async fn recover_access(
        &self,
        actor: ActorId,
        session: &dyn AutomationSession,
        identity: &Identity,
    ) -> HarnessResult<()> {
        let device = Device::new(session, actor, self.wait);
        ConsoleView::on(device).recover_access(identity).await.map(|_| ())
    }
}
