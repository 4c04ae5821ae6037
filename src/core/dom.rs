use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identity of one native element inside a driver.
///
/// Two handles are the same element exactly when their ids are equal. The
/// handle says nothing about which browsing context it lives in; using it
/// from the wrong context is a driver-level stale reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementHandle {
    pub id: String,
    pub tag_name: String,
}

impl ElementHandle {
    pub fn new(id: impl Into<String>, tag_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tag_name: tag_name.into(),
        }
    }

    pub fn is_frame(&self) -> bool {
        matches!(self.tag_name.as_str(), "iframe" | "frame")
    }
}

impl fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}#{}>", self.tag_name, self.id)
    }
}

/// Where a search starts: the active browsing context, or inside an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    Root,
    Element(ElementHandle),
}

impl Scope {
    pub fn element(&self) -> Option<&ElementHandle> {
        match self {
            Scope::Root => None,
            Scope::Element(element) => Some(element),
        }
    }
}

/// Native selector understood directly by every driver.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "using", content = "value", rename_all = "snake_case")]
pub enum By {
    Css(String),
    XPath(String),
}

impl By {
    pub fn css(selector: impl Into<String>) -> Self {
        By::Css(selector.into())
    }

    pub fn xpath(expression: impl Into<String>) -> Self {
        By::XPath(expression.into())
    }

    /// Strategy name in the WebDriver vocabulary.
    pub fn strategy(&self) -> &'static str {
        match self {
            By::Css(_) => "css selector",
            By::XPath(_) => "xpath",
        }
    }

    pub fn value(&self) -> &str {
        match self {
            By::Css(value) | By::XPath(value) => value,
        }
    }
}

impl fmt::Display for By {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:?}", self.strategy(), self.value())
    }
}
