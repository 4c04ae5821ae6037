pub mod config;
pub mod dom;
pub mod driver;

pub use config::Config;
pub use dom::{By, ElementHandle, Scope};
pub use driver::Driver;
