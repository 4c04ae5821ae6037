pub mod browser;
pub mod core;
pub mod errors;
pub mod locators;
pub mod model;
pub mod resolution;
pub mod testing;
pub mod types;
pub mod utils;

#[cfg(feature = "chrome")]
pub use browser::ChromeDriver;
pub use browser::{HtmlDriver, Session};
pub use self::core::{By, Config, Driver, ElementHandle, Scope};
pub use errors::{ConstructionError, PomError, Result};
pub use locators::{by_css, by_text, by_xpath, Locator};
pub use model::{
    AsNode, Collection, Container, Declarer, Element, GraphBuilder, IFrame, Item, Model, Page,
    Region,
};
pub use resolution::Reference;
pub use types::*;
pub use utils::FailureReport;
