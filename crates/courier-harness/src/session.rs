//! Automation session interface
//!
//! The harness depends only on this capability set. Appium is one backend
//! (`courier-appium`); the in-memory fake in [`crate::testing`] is another.

use async_trait::async_trait;

use crate::error::{HarnessError, HarnessResult};
use crate::locator::Locator;

/// Opaque reference to an element inside one session
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementHandle {
    pub id: String,
}

impl ElementHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// One automation session driving one device
#[async_trait]
pub trait AutomationSession: Send + Sync {
    /// Backend identifier of the session
    fn session_id(&self) -> &str;

    /// All elements currently matching the locator; empty when none match
    async fn find_elements(&self, locator: &Locator) -> HarnessResult<Vec<ElementHandle>>;

    async fn click(&self, element: &ElementHandle) -> HarnessResult<()>;

    /// Type text into an element, appending to its current content
    async fn send_keys(&self, element: &ElementHandle, text: &str) -> HarnessResult<()>;

    /// Replace the element's content
    async fn set_value(&self, element: &ElementHandle, text: &str) -> HarnessResult<()>;

    async fn element_text(&self, element: &ElementHandle) -> HarnessResult<String>;

    /// Scroll the current screen until the located element is on screen
    async fn scroll_to(&self, locator: &Locator) -> HarnessResult<ElementHandle>;

    /// Press a hardware key by platform keycode
    async fn press_keycode(&self, keycode: u32) -> HarnessResult<()>;

    /// Platform back navigation
    async fn back(&self) -> HarnessResult<()>;

    /// PNG screenshot of the current screen
    async fn screenshot(&self) -> HarnessResult<Vec<u8>>;

    /// Release the session
    async fn quit(&self) -> HarnessResult<()>;

    /// First element matching the locator
    async fn find_element(&self, locator: &Locator) -> HarnessResult<ElementHandle> {
        self.find_elements(locator)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| HarnessError::ElementNotFound {
                locator: locator.to_string(),
            })
    }

    /// Single presence check, no waiting
    async fn is_present(&self, locator: &Locator) -> HarnessResult<bool> {
        Ok(!self.find_elements(locator).await?.is_empty())
    }

    async fn tap(&self, locator: &Locator) -> HarnessResult<()> {
        let element = self.find_element(locator).await?;
        self.click(&element).await
    }

    /// Type `text` as key events into the focused field.
    ///
    /// Nothing is pressed unless every character has a keycode.
    async fn press_keys(&self, text: &str) -> HarnessResult<()> {
        let keycodes = text
            .chars()
            .map(|c| {
                android_keycode(c).ok_or_else(|| HarnessError::action("press_keys", format!("no keycode for '{}'", c)))
            })
            .collect::<HarnessResult<Vec<_>>>()?;

        for keycode in keycodes {
            self.press_keycode(keycode).await?;
        }
        Ok(())
    }
}

/// Creates isolated sessions for the device pool
#[async_trait]
pub trait SessionFactory: Send + Sync {
    /// Start the session for pool slot `index`
    async fn start_session(&self, index: usize) -> HarnessResult<Box<dyn AutomationSession>>;
}

/// Android keycode for a character typed through key events.
///
/// Covers the characters amounts are made of.
pub fn android_keycode(c: char) -> Option<u32> {
    match c {
        '0'..='9' => Some(7 + (c as u32 - '0' as u32)),
        '.' => Some(56),
        ',' => Some(55),
        _ => None,
    }
}
