use tracing::info;

use courier_harness::{ElementKind, HarnessError, HarnessResult, Locator};

use super::{ChatView, Device, Screen, View, WalletView};

fn home_tab() -> Locator {
    Locator::accessibility_id("home-tab-button")
}

fn profile_tab() -> Locator {
    Locator::accessibility_id("profile-tab-button")
}

fn wallet_tab() -> Locator {
    Locator::accessibility_id("wallet-tab-button")
}

fn public_key_text() -> Locator {
    Locator::accessibility_id("profile-public-key")
}

fn plus_button() -> Locator {
    Locator::accessibility_id("new-chat-button")
}

fn start_new_chat() -> Locator {
    Locator::text_of(ElementKind::Button, "Start new chat")
}

fn start_group_chat() -> Locator {
    Locator::text_of(ElementKind::Button, "Start group chat")
}

fn public_key_input() -> Locator {
    Locator::accessibility_id("enter-contact-code-input")
}

fn confirm_button() -> Locator {
    Locator::accessibility_id("confirm-button")
}

fn next_button() -> Locator {
    Locator::accessibility_id("toolbar-next-button")
}

fn chat_name_input() -> Locator {
    Locator::accessibility_id("chat-name-input")
}

fn save_button() -> Locator {
    Locator::text_of(ElementKind::Button, "Save")
}

/// Chat list with the bottom tab bar
pub struct HomeView<'a> {
    device: Device<'a>,
}

impl<'a> View<'a> for HomeView<'a> {
    const SCREEN: Screen = Screen::Home;

    fn on(device: Device<'a>) -> Self {
        Self { device }
    }

    fn device(&self) -> Device<'a> {
        self.device
    }
}

impl<'a> HomeView<'a> {
    /// Back to the chat list from any tab
    pub async fn home(self) -> HarnessResult<HomeView<'a>> {
        self.device.click(&home_tab()).await?;
        Ok(self)
    }

    /// Read this account's public key off the profile tab
    pub async fn public_key(&self) -> HarnessResult<String> {
        self.device.click(&profile_tab()).await?;
        let key = self.device.text_of(&public_key_text()).await?;
        self.device.click(&home_tab()).await?;

        if key.is_empty() {
            return Err(HarnessError::action("public_key", "profile shows no public key"));
        }
        info!("{}: public key {}", self.device.actor(), key);
        Ok(key)
    }

    /// Open a one-to-one chat with the account behind `public_key`
    pub async fn add_contact(self, public_key: &str) -> HarnessResult<ChatView<'a>> {
        self.device.click(&plus_button()).await?;
        self.device.click(&start_new_chat()).await?;
        self.device.set_into(&public_key_input(), public_key).await?;
        self.device.click(&confirm_button()).await?;
        Ok(self.goto())
    }

    /// Create a group with the given contacts and open it
    pub async fn create_group_chat(self, members: &[String], name: &str) -> HarnessResult<ChatView<'a>> {
        if members.is_empty() {
            return Err(HarnessError::action("create_group_chat", "a group needs at least one member"));
        }
        info!("{}: creating group '{}' with {}", self.device.actor(), name, members.join(", "));

        self.device.click(&plus_button()).await?;
        self.device.click(&start_group_chat()).await?;
        for member in members {
            self.device
                .click(&Locator::text_of(ElementKind::Button, member.clone()))
                .await?;
        }
        self.device.click(&next_button()).await?;
        self.device.set_into(&chat_name_input(), name).await?;
        self.device.click(&save_button()).await?;
        Ok(self.goto())
    }

    /// Open the chat whose list entry reads exactly `label`
    pub async fn open_chat(self, label: &str) -> HarnessResult<ChatView<'a>> {
        self.device
            .click(&Locator::text_of(ElementKind::Button, label))
            .await?;
        Ok(self.goto())
    }

    /// Open the first chat whose list entry contains `part`
    pub async fn open_chat_containing(self, part: &str) -> HarnessResult<ChatView<'a>> {
        self.device
            .click(&Locator::text_part_of(ElementKind::Button, part))
            .await?;
        Ok(self.goto())
    }

    /// Like [`open_chat_containing`](Self::open_chat_containing) for entries
    /// below the fold
    pub async fn scroll_to_chat(self, part: &str) -> HarnessResult<ChatView<'a>> {
        let locator = Locator::text_part_of(ElementKind::Button, part);
        let entry = self.device.session().scroll_to(&locator).await?;
        self.device.session().click(&entry).await?;
        Ok(self.goto())
    }

    pub async fn wallet(self) -> HarnessResult<WalletView<'a>> {
        self.device.click(&wallet_tab()).await?;
        Ok(self.goto())
    }
}
