pub mod fixtures;

use crate::browser::{DriverEvent, HtmlDriver, Session};
use crate::types::{StepOutcome, Visibility};
use tracing_subscriber::EnvFilter;

pub struct TestHelper;

impl TestHelper {
    /// A session over a static HTML document, plus a handle on its driver
    /// for inspecting recorded calls.
    pub fn session(html: &str) -> (HtmlDriver, Session) {
        let driver = HtmlDriver::from_html(html);
        let session = Session::new(driver.clone());
        (driver, session)
    }

    /// Install a test-friendly subscriber filtered by `RUST_LOG`. Safe to
    /// call more than once.
    pub fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    /// Every search the driver ran, as `(scope, locator)` pairs.
    pub fn searches(driver: &HtmlDriver) -> Vec<(String, String)> {
        driver
            .events()
            .into_iter()
            .filter_map(|event| match event {
                DriverEvent::FindElements { scope, by, .. } => Some((scope, by)),
                _ => None,
            })
            .collect()
    }

    pub fn count_steps(visibility: &Visibility, outcome: StepOutcome) -> usize {
        visibility
            .steps
            .iter()
            .filter(|step| step.outcome == outcome)
            .count()
    }
}
