use std::time::Duration;

use tracing::{debug, info};

use courier_harness::{retry_bounded, ElementKind, HarnessError, HarnessResult, Locator};

use super::{Device, HomeView, Screen, SendTransactionView, View};

/// Accessibility id of the chat input
pub const MESSAGE_INPUT: &str = "chat-message-input";

/// Accessibility id of the send button
pub const SEND_BUTTON: &str = "send-message-button";

/// Taps on the member options button before giving up
const MEMBER_MENU_TAPS: usize = 2;

const MEMBER_MENU_RETRY_INTERVAL: Duration = Duration::from_secs(1);

pub fn message_input() -> Locator {
    Locator::accessibility_id(MESSAGE_INPUT)
}

pub fn send_button() -> Locator {
    Locator::accessibility_id(SEND_BUTTON)
}

fn chat_name_text() -> Locator {
    Locator::accessibility_id("chat-name-text")
}

fn chat_menu_button() -> Locator {
    Locator::accessibility_id("chat-menu-button")
}

fn chat_settings() -> Locator {
    Locator::text_of(ElementKind::Button, "Settings")
}

fn member_options_button() -> Locator {
    Locator::accessibility_id("member-options-button")
}

fn remove_member_option() -> Locator {
    Locator::text_of(ElementKind::Button, "Remove from chat")
}

fn confirm_button() -> Locator {
    Locator::text_of(ElementKind::Button, "Confirm")
}

fn request_command() -> Locator {
    Locator::text_of(ElementKind::Button, "/request")
}

fn first_recipient_button() -> Locator {
    Locator::accessibility_id("chat-recipient-0")
}

/// Done once the remove option is on screen; otherwise tap the member options
/// when allowed and report a miss
async fn show_remove_option(device: Device<'_>, tap: bool) -> HarnessResult<()> {
    let remove = remove_member_option();
    if device.is_showing(&remove).await? {
        return Ok(());
    }
    if tap {
        device.click_now(&member_options_button()).await?;
    }
    Err(HarnessError::ElementNotFound {
        locator: remove.to_string(),
    })
}

/// Text of the bubble a payment request is shown as
pub fn payment_request_text(amount: &str) -> String {
    format!("Requesting  {} ETH", amount)
}

/// An open one-to-one or group chat
pub struct ChatView<'a> {
    device: Device<'a>,
}

impl<'a> View<'a> for ChatView<'a> {
    const SCREEN: Screen = Screen::Chat;

    fn on(device: Device<'a>) -> Self {
        Self { device }
    }

    fn device(&self) -> Device<'a> {
        self.device
    }
}

impl<'a> ChatView<'a> {
    pub async fn send_message(&self, text: &str) -> HarnessResult<()> {
        debug!("{}: sending '{}'", self.device.actor(), text);
        self.device.type_into(&message_input(), text).await?;
        self.send().await
    }

    pub async fn send(&self) -> HarnessResult<()> {
        self.device.click(&send_button()).await
    }

    /// Name of the contact or group in the toolbar
    pub async fn user_name(&self) -> HarnessResult<String> {
        self.device.text_of(&chat_name_text()).await
    }

    /// Remove the only other member from this group.
    ///
    /// The member options menu can take a moment to open and may need a second
    /// tap. Every attempt first checks whether the remove option is on screen,
    /// so a menu that finished opening since the last tap is never tapped shut.
    pub async fn remove_member(&self) -> HarnessResult<()> {
        info!("{}: removing member from group", self.device.actor());
        self.device.click(&chat_menu_button()).await?;
        self.device.click(&chat_settings()).await?;

        // one more look after the last tap
        let device = self.device;
        let mut attempt = 0;
        retry_bounded(
            MEMBER_MENU_TAPS + 1,
            MEMBER_MENU_RETRY_INTERVAL,
            "member options menu",
            || {
                attempt += 1;
                show_remove_option(device, attempt <= MEMBER_MENU_TAPS)
            },
        )
        .await?;

        self.device.click(&remove_member_option()).await?;
        self.device.click(&confirm_button()).await?;
        self.device.back(1).await
    }

    pub async fn request_command(&self) -> HarnessResult<()> {
        self.device.click(&request_command()).await
    }

    /// Address the request to the first group member
    pub async fn first_recipient(&self) -> HarnessResult<()> {
        self.device.click(&first_recipient_button()).await
    }

    /// Type an amount through key events into the focused field
    pub async fn enter_amount_keys(&self, amount: &str) -> HarnessResult<()> {
        self.device.session().press_keys(amount).await
    }

    /// Replace the input's content with an amount
    pub async fn set_amount(&self, amount: &str) -> HarnessResult<()> {
        self.device.set_into(&message_input(), amount).await
    }

    /// Tap the incoming request for `amount` and accept it
    pub async fn open_payment_request(self, amount: &str) -> HarnessResult<SendTransactionView<'a>> {
        let request = Locator::text_part_of(ElementKind::Button, payment_request_text(amount));
        self.device.click(&request).await?;
        self.send().await?;
        Ok(self.goto())
    }

    pub async fn back(self) -> HarnessResult<HomeView<'a>> {
        self.device.back(1).await?;
        Ok(self.goto())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_text_has_two_spaces() {
        assert_eq!(payment_request_text("0.0123"), "Requesting  0.0123 ETH");
    }
}
