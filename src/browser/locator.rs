//! Element locators
//!
//! A locator pairs a selector kind with its value, the same way WebDriver
//! clients pass `By.css(...)` or `By.xpath(...)` around.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How to find an element on the page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "value")]
pub enum Locator {
    /// CSS selector, resolved with `querySelector`
    Css(String),
    /// XPath expression, resolved with `document.evaluate`
    XPath(String),
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    pub fn xpath(expression: impl Into<String>) -> Self {
        Locator::XPath(expression.into())
    }

    /// A `<button>` whose own text contains `text`
    pub fn button_with_text(text: &str) -> Self {
        Locator::XPath(format!("//button[contains(text(),'{}')]", text))
    }

    /// The raw selector string without its kind
    pub fn value(&self) -> &str {
        match self {
            Locator::Css(v) | Locator::XPath(v) => v,
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(v) => write!(f, "css={}", v),
            Locator::XPath(v) => write!(f, "xpath={}", v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_button_with_text() {
        let locator = Locator::button_with_text("Hard");
        assert_eq!(
            locator,
            Locator::XPath("//button[contains(text(),'Hard')]".to_string())
        );
        assert_eq!(locator.value(), "//button[contains(text(),'Hard')]");
    }

    #[test]
    fn test_display_names_kind() {
        assert_eq!(Locator::css(".poke-card").to_string(), "css=.poke-card");
        assert_eq!(Locator::xpath("//p").to_string(), "xpath=//p");
    }

    #[test]
    fn test_toml_shape() {
        #[derive(Deserialize)]
        struct Wrapper {
            cards: Locator,
        }

        let parsed: Wrapper =
            toml::from_str("cards = { kind = \"css\", value = \".poke-list > li\" }").unwrap();
        assert_eq!(parsed.cards, Locator::css(".poke-list > li"));
    }
}
