//! Element locators
//!
//! Locators are semantic: they say what to look for (a visible text, part of a
//! text, an accessibility id) and leave the translation into a concrete lookup
//! strategy to the automation backend.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::HarnessResult;
use crate::vars::{Text, Vars};

/// Broad class of UI element a text locator is restricted to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    /// Any element carrying the text
    #[default]
    Any,
    /// Tappable element (list rows, buttons)
    Button,
    /// Static text
    Text,
    /// Editable text field
    Input,
}

impl ElementKind {
    pub fn name(&self) -> &'static str {
        match self {
            ElementKind::Any => "element",
            ElementKind::Button => "button",
            ElementKind::Text => "text",
            ElementKind::Input => "input",
        }
    }
}

/// How to find an element in a session's UI tree
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "by", rename_all = "snake_case")]
pub enum Locator {
    /// Element whose text equals `text`
    Text { text: String, kind: ElementKind },
    /// Element whose text contains `text`
    TextPart { text: String, kind: ElementKind },
    /// Element with the given accessibility id (content description)
    AccessibilityId { id: String },
    /// Raw XPath, passed through to the backend untouched
    XPath { path: String },
}

impl Locator {
    pub fn text(text: impl Into<String>) -> Self {
        Locator::Text {
            text: text.into(),
            kind: ElementKind::Any,
        }
    }

    pub fn text_of(kind: ElementKind, text: impl Into<String>) -> Self {
        Locator::Text {
            text: text.into(),
            kind,
        }
    }

    pub fn text_part(text: impl Into<String>) -> Self {
        Locator::TextPart {
            text: text.into(),
            kind: ElementKind::Any,
        }
    }

    pub fn text_part_of(kind: ElementKind, text: impl Into<String>) -> Self {
        Locator::TextPart {
            text: text.into(),
            kind,
        }
    }

    pub fn accessibility_id(id: impl Into<String>) -> Self {
        Locator::AccessibilityId { id: id.into() }
    }

    pub fn xpath(path: impl Into<String>) -> Self {
        Locator::XPath { path: path.into() }
    }

    /// Whether a visible element with this text and kind satisfies the locator.
    ///
    /// Backends that resolve locators themselves (WebDriver) never call this;
    /// in-memory backends do. Raw XPath never matches here.
    pub fn matches(&self, element_text: &str, element_kind: ElementKind, accessibility_id: Option<&str>) -> bool {
        let kind_ok = |wanted: &ElementKind| *wanted == ElementKind::Any || *wanted == element_kind;
        match self {
            Locator::Text { text, kind } => kind_ok(kind) && element_text == text,
            Locator::TextPart { text, kind } => kind_ok(kind) && element_text.contains(text.as_str()),
            Locator::AccessibilityId { id } => accessibility_id == Some(id.as_str()),
            Locator::XPath { .. } => false,
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Text { text, kind } => write!(f, "{} with text '{}'", kind.name(), text),
            Locator::TextPart { text, kind } => write!(f, "{} containing '{}'", kind.name(), text),
            Locator::AccessibilityId { id } => write!(f, "accessibility id '{}'", id),
            Locator::XPath { path } => write!(f, "xpath {}", path),
        }
    }
}

/// A locator whose text may depend on scenario variables
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    Locator(Locator),
    Text { text: Text, kind: ElementKind },
    TextPart { text: Text, kind: ElementKind },
}

impl Target {
    pub fn text(kind: ElementKind, text: impl Into<Text>) -> Self {
        Target::Text {
            text: text.into(),
            kind,
        }
    }

    pub fn text_part(kind: ElementKind, text: impl Into<Text>) -> Self {
        Target::TextPart {
            text: text.into(),
            kind,
        }
    }

    pub fn resolve(&self, vars: &Vars) -> HarnessResult<Locator> {
        match self {
            Target::Locator(locator) => Ok(locator.clone()),
            Target::Text { text, kind } => Ok(Locator::text_of(*kind, text.resolve(vars)?)),
            Target::TextPart { text, kind } => Ok(Locator::text_part_of(*kind, text.resolve(vars)?)),
        }
    }
}

impl From<Locator> for Target {
    fn from(locator: Locator) -> Self {
        Target::Locator(locator)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Locator(locator) => locator.fmt(f),
            Target::Text { text, kind } => write!(f, "{} with text {}", kind.name(), text),
            Target::TextPart { text, kind } => write!(f, "{} containing {}", kind.name(), text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_locators_respect_kind() {
        let button = Locator::text_of(ElementKind::Button, "new_chat");
        assert!(button.matches("new_chat", ElementKind::Button, None));
        assert!(!button.matches("new_chat", ElementKind::Text, None));
        assert!(Locator::text("new_chat").matches("new_chat", ElementKind::Text, None));
    }

    #[test]
    fn test_text_part_matches_substring() {
        let locator = Locator::text_part("Requesting  0.0001");
        assert!(locator.matches("Requesting  0.0001 ETH", ElementKind::Button, None));
        assert!(!locator.matches("Requesting  0.0002 ETH", ElementKind::Button, None));
    }

    #[test]
    fn test_target_resolves_variables() {
        let mut vars = Vars::default();
        vars.set("amount", "0.5");
        let target = Target::text_part(ElementKind::Button, Text::template("Requesting  {amount} ETH"));
        assert_eq!(
            target.resolve(&vars).unwrap(),
            Locator::text_part_of(ElementKind::Button, "Requesting  0.5 ETH")
        );
    }

    #[test]
    fn test_display_names_the_expectation() {
        assert_eq!(
            Locator::text_of(ElementKind::Text, "third SOMETHING").to_string(),
            "text with text 'third SOMETHING'"
        );
        assert_eq!(
            Locator::accessibility_id("send-message-button").to_string(),
            "accessibility id 'send-message-button'"
        );
    }
}
