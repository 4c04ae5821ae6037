use crate::core::{By, Driver, ElementHandle, Scope};
use crate::errors::Result;
use std::fmt;
use std::sync::Arc;

/// Strategy that turns a scope into the elements it designates.
///
/// Locators hold no state between calls and never mutate the scope they are
/// given. Every element returned must be a descendant of `scope`; the engine
/// relies on this but does not check it.
pub trait Locator: Send + Sync + fmt::Debug {
    /// Name of the strategy this locator was built from
    fn strategy(&self) -> &str;

    /// Short human-readable form, used in debug logs only
    fn describe(&self) -> String;

    /// Find matching elements inside `scope`, in document order
    fn find_within(&self, driver: &dyn Driver, scope: &Scope) -> Result<Vec<ElementHandle>>;

    /// Reject declarations that can never match anything
    fn validate(&self) -> std::result::Result<(), String> {
        Ok(())
    }
}

/// Locator backed directly by a driver-native selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeLocator {
    by: By,
}

impl NativeLocator {
    pub fn new(by: By) -> Self {
        Self { by }
    }

    pub fn by(&self) -> &By {
        &self.by
    }
}

impl Locator for NativeLocator {
    fn strategy(&self) -> &str {
        self.by.strategy()
    }

    fn describe(&self) -> String {
        self.by.to_string()
    }

    fn find_within(&self, driver: &dyn Driver, scope: &Scope) -> Result<Vec<ElementHandle>> {
        driver.find_elements(scope, &self.by)
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if self.by.value().trim().is_empty() {
            return Err(format!("empty {} locator", self.by.strategy()));
        }
        Ok(())
    }
}

/// CSS matches whose rendered text contains a fragment.
///
/// Built purely from driver primitives, the way third-party strategies are
/// expected to compose.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextLocator {
    css: String,
    text: String,
}

impl TextLocator {
    pub fn new(css: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            css: css.into(),
            text: text.into(),
        }
    }
}

impl Locator for TextLocator {
    fn strategy(&self) -> &str {
        "text"
    }

    fn describe(&self) -> String {
        format!("text {:?} within css {:?}", self.text, self.css)
    }

    fn find_within(&self, driver: &dyn Driver, scope: &Scope) -> Result<Vec<ElementHandle>> {
        let candidates = driver.find_elements(scope, &By::css(self.css.as_str()))?;
        let mut matches = Vec::new();
        for candidate in candidates {
            if driver.text(&candidate)?.contains(&self.text) {
                matches.push(candidate);
            }
        }
        Ok(matches)
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if self.css.trim().is_empty() || self.text.is_empty() {
            return Err("text locator needs both a css selector and a text fragment".to_string());
        }
        Ok(())
    }
}

/// Locator for a CSS selector.
pub fn by_css(css_selector: impl Into<String>) -> Arc<dyn Locator> {
    Arc::new(NativeLocator::new(By::Css(css_selector.into())))
}

/// Locator for an XPath expression.
pub fn by_xpath(xpath: impl Into<String>) -> Arc<dyn Locator> {
    Arc::new(NativeLocator::new(By::XPath(xpath.into())))
}

/// Locator for elements matching `css_selector` whose text contains `text`.
pub fn by_text(css_selector: impl Into<String>, text: impl Into<String>) -> Arc<dyn Locator> {
    Arc::new(TextLocator::new(css_selector, text))
}
