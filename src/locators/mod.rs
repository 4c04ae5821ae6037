pub mod base;
pub mod registry;

pub use base::{by_css, by_text, by_xpath, Locator, NativeLocator, TextLocator};
pub use registry::{by, global, register, LocatorFactory, LocatorRegistry, StrategyMetadata};
