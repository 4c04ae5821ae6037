use crate::core::Driver;
use crate::errors::{PomError, Result};
use crate::resolution::FrameGuard;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Browser state captured for a failed test. Nothing is written to disk;
/// persisting the report is left to whatever hook asked for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureReport {
    /// DOM of the browsing context that was active at capture time
    pub active_dom: Option<String>,
    /// DOM of the top-level document, when a frame was active
    pub root_dom: Option<String>,
    /// PNG of the top-level document, base64 encoded
    pub screenshot_base64: Option<String>,
    pub frame_depth: usize,
    pub captured_at: DateTime<Utc>,
}

impl FailureReport {
    /// Capture what the driver can provide. Individual failures are logged
    /// and leave their field empty.
    pub fn capture(driver: &dyn Driver) -> Self {
        let frame_depth = driver.frame_path().len();
        let active_dom = logged(driver.page_source(), "active DOM");

        let root_dom = if frame_depth > 0 {
            let _guard = FrameGuard::new(driver);
            logged(
                driver
                    .switch_to_default_content()
                    .and_then(|_| driver.page_source()),
                "root DOM",
            )
        } else {
            None
        };

        let screenshot_base64 =
            logged(driver.screenshot(), "screenshot").map(|png| STANDARD.encode(png));

        Self {
            active_dom,
            root_dom,
            screenshot_base64,
            frame_depth,
            captured_at: Utc::now(),
        }
    }

    pub fn screenshot_png(&self) -> Result<Option<Vec<u8>>> {
        match &self.screenshot_base64 {
            Some(encoded) => STANDARD
                .decode(encoded)
                .map(Some)
                .map_err(PomError::from_any_error),
            None => Ok(None),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn logged<T>(result: Result<T>, what: &str) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(error = %err, "Could not capture {}", what);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::{HtmlDriver, Session};
    use crate::core::{By, Scope};

    #[test]
    fn test_report_from_inside_a_frame() {
        let driver = HtmlDriver::from_html(
            r#"<h1>Shop</h1><iframe class="pay" srcdoc="<form class='card'></form>"></iframe>"#,
        );
        let frame = driver
            .find_elements(&Scope::Root, &By::css(".pay"))
            .unwrap()
            .remove(0);
        driver.switch_to_frame(&frame).unwrap();

        let session = Session::new(driver.clone());
        let report = session.failure_report();
        assert_eq!(report.frame_depth, 1);
        assert!(report.active_dom.unwrap().contains("class=\"card\""));
        assert!(report.root_dom.unwrap().contains("<h1>Shop</h1>"));
        assert!(report.screenshot_base64.is_none());
        assert_eq!(driver.frame_path(), vec![frame]);
    }

    #[test]
    fn test_report_serializes() {
        let session = Session::new(HtmlDriver::from_html("<p>ok</p>"));
        let report = session.failure_report();
        assert!(report.root_dom.is_none());
        let json = report.to_json().unwrap();
        let parsed: FailureReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.frame_depth, 0);
        assert!(parsed.screenshot_png().unwrap().is_none());
    }

    #[test]
    fn test_screenshot_round_trips_through_base64() {
        let report = FailureReport {
            active_dom: None,
            root_dom: None,
            screenshot_base64: Some(STANDARD.encode([0x89, b'P', b'N', b'G'])),
            frame_depth: 0,
            captured_at: Utc::now(),
        };
        assert_eq!(
            report.screenshot_png().unwrap(),
            Some(vec![0x89, b'P', b'N', b'G'])
        );
    }
}
