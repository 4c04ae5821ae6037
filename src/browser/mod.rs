#[cfg(feature = "chrome")]
pub mod chrome;
pub mod html;
pub mod session;

#[cfg(feature = "chrome")]
pub use chrome::ChromeDriver;
pub use html::{DriverEvent, HtmlDriver};
pub use session::Session;
