use crate::errors::{PomError, Result};
use crate::locators::base::{Locator, NativeLocator, TextLocator};
use crate::core::By;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

/// A named locator strategy that can be looked up and instantiated by name.
pub trait LocatorFactory: Send + Sync {
    /// Name the strategy is registered under
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Build a locator from the strategy-specific descriptor
    fn build(&self, value: &str) -> Result<Arc<dyn Locator>>;
}

/// Registry of locator strategies
pub struct LocatorRegistry {
    factories: HashMap<String, Arc<dyn LocatorFactory>>,
}

impl LocatorRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registry preloaded with `css selector`, `xpath` and `text`
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(CssFactory);
        registry.register(XPathFactory);
        registry.register(TextFactory);
        registry
    }

    /// Register a strategy, replacing any previous one with the same name
    pub fn register<F: LocatorFactory + 'static>(&mut self, factory: F) {
        let name = factory.name().to_string();
        tracing::debug!(strategy = %name, "Registering locator strategy");
        self.factories.insert(name, Arc::new(factory));
    }

    pub fn get_factory(&self, name: &str) -> Option<Arc<dyn LocatorFactory>> {
        self.factories.get(name).cloned()
    }

    /// List all registered strategy names, sorted
    pub fn list_strategies(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }

    /// Build a locator for `value` using the strategy registered as `strategy`
    pub fn build(&self, strategy: &str, value: &str) -> Result<Arc<dyn Locator>> {
        let factory = self
            .get_factory(strategy)
            .ok_or_else(|| PomError::UnknownStrategy(strategy.to_string()))?;
        factory.build(value)
    }

    pub fn get_all_metadata(&self) -> Vec<StrategyMetadata> {
        let mut metadata: Vec<StrategyMetadata> = self
            .factories
            .values()
            .map(|factory| StrategyMetadata {
                name: factory.name().to_string(),
                description: factory.description().to_string(),
            })
            .collect();
        metadata.sort_by(|a, b| a.name.cmp(&b.name));
        metadata
    }
}

impl Default for LocatorRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

/// Metadata about a registered strategy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyMetadata {
    pub name: String,
    pub description: String,
}

struct CssFactory;

impl LocatorFactory for CssFactory {
    fn name(&self) -> &str {
        "css selector"
    }

    fn description(&self) -> &str {
        "Elements matching a CSS selector"
    }

    fn build(&self, value: &str) -> Result<Arc<dyn Locator>> {
        Ok(Arc::new(NativeLocator::new(By::css(value))))
    }
}

struct XPathFactory;

impl LocatorFactory for XPathFactory {
    fn name(&self) -> &str {
        "xpath"
    }

    fn description(&self) -> &str {
        "Elements matching an XPath expression"
    }

    fn build(&self, value: &str) -> Result<Arc<dyn Locator>> {
        Ok(Arc::new(NativeLocator::new(By::xpath(value))))
    }
}

struct TextFactory;

impl LocatorFactory for TextFactory {
    fn name(&self) -> &str {
        "text"
    }

    fn description(&self) -> &str {
        "CSS matches containing a text fragment, written as `selector::text`"
    }

    fn build(&self, value: &str) -> Result<Arc<dyn Locator>> {
        let (css, text) = value.split_once("::").unwrap_or(("*", value));
        Ok(Arc::new(TextLocator::new(css, text)))
    }
}

static GLOBAL: OnceLock<RwLock<LocatorRegistry>> = OnceLock::new();

/// Process-wide registry that plugins register into.
pub fn global() -> &'static RwLock<LocatorRegistry> {
    GLOBAL.get_or_init(|| RwLock::new(LocatorRegistry::with_builtins()))
}

/// Register a strategy in the process-wide registry
pub fn register<F: LocatorFactory + 'static>(factory: F) {
    global()
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .register(factory);
}

/// Build a locator through the process-wide registry
pub fn by(strategy: &str, value: &str) -> Result<Arc<dyn Locator>> {
    global()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .build(strategy, value)
}
