//! Translation of harness locators into WebDriver lookup strategies

use courier_harness::{ElementKind, Locator};

use crate::error::{AppiumError, AppiumResult};

/// A `(using, value)` pair as sent to `/element(s)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Strategy {
    pub using: &'static str,
    pub value: String,
}

impl Strategy {
    fn new(using: &'static str, value: impl Into<String>) -> Self {
        Self {
            using,
            value: value.into(),
        }
    }
}

/// Android widget class an element kind is restricted to.
///
/// React Native renders touchables as plain view groups, so buttons are
/// matched on any class.
fn widget_class(kind: ElementKind) -> &'static str {
    match kind {
        ElementKind::Any | ElementKind::Button => "*",
        ElementKind::Text => "android.widget.TextView",
        ElementKind::Input => "android.widget.EditText",
    }
}

/// Quote a string as an XPath 1.0 literal, falling back to `concat()` when it
/// holds both quote kinds
pub fn xpath_literal(text: &str) -> String {
    if !text.contains('\'') {
        return format!("'{}'", text);
    }
    if !text.contains('"') {
        return format!("\"{}\"", text);
    }

    let parts: Vec<String> = text
        .split('\'')
        .map(|part| format!("'{}'", part))
        .collect();
    format!("concat({})", parts.join(", \"'\", "))
}

/// Quote a string for a UiSelector Java string argument
fn java_literal(text: &str) -> String {
    format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
}

pub fn to_strategy(locator: &Locator) -> Strategy {
    match locator {
        Locator::Text { text, kind } => Strategy::new(
            "xpath",
            format!("//{}[@text={}]", widget_class(*kind), xpath_literal(text)),
        ),
        Locator::TextPart { text, kind } => Strategy::new(
            "xpath",
            format!("//{}[contains(@text, {})]", widget_class(*kind), xpath_literal(text)),
        ),
        Locator::AccessibilityId { id } => Strategy::new("accessibility id", id.clone()),
        Locator::XPath { path } => Strategy::new("xpath", path.clone()),
    }
}

/// UiAutomator lookup scrolling the first scrollable container until the
/// element is on screen
pub fn scroll_strategy(locator: &Locator) -> AppiumResult<Strategy> {
    let selector = match locator {
        Locator::Text { text, .. } => format!("new UiSelector().text({})", java_literal(text)),
        Locator::TextPart { text, .. } => format!("new UiSelector().textContains({})", java_literal(text)),
        Locator::AccessibilityId { id } => format!("new UiSelector().description({})", java_literal(id)),
        Locator::XPath { path } => {
            return Err(AppiumError::Unsupported(format!("cannot scroll to xpath {}", path)));
        }
    };
    Ok(Strategy::new(
        "-android uiautomator",
        format!(
            "new UiScrollable(new UiSelector().scrollable(true)).scrollIntoView({})",
            selector
        ),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_locators_become_xpath() {
        assert_eq!(
            to_strategy(&Locator::text("SOMETHING")),
            Strategy::new("xpath", "//*[@text='SOMETHING']")
        );
        assert_eq!(
            to_strategy(&Locator::text_part_of(ElementKind::Text, "removed you")).value,
            "//android.widget.TextView[contains(@text, 'removed you')]"
        );
        assert_eq!(
            to_strategy(&Locator::accessibility_id("chat-message-input")),
            Strategy::new("accessibility id", "chat-message-input")
        );
    }

    #[test]
    fn test_xpath_literal_escapes_quotes() {
        assert_eq!(xpath_literal("it's"), "\"it's\"");
        assert_eq!(xpath_literal("say \"hi\""), "'say \"hi\"'");
        assert_eq!(xpath_literal("it's \"x\""), "concat('it', \"'\", 's \"x\"')");
    }

    #[test]
    fn test_scroll_uses_ui_scrollable() {
        let strategy = scroll_strategy(&Locator::text_part("Extremely \"Long\" Name")).unwrap();
        assert_eq!(strategy.using, "-android uiautomator");
        assert!(strategy
            .value
            .ends_with("scrollIntoView(new UiSelector().textContains(\"Extremely \\\"Long\\\" Name\"))"));
        assert!(scroll_strategy(&Locator::xpath("//x")).is_err());
    }
}
