use crate::core::{Driver, ElementHandle};
use crate::errors::Result;
use serde::{Deserialize, Serialize};

/// A frame entered on the way to an element, with the label it was found by.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameEntry {
    pub label: String,
    pub element: ElementHandle,
}

/// Restores the browsing context that was active when it was created.
///
/// Every chain walk holds one of these for its whole duration, so frames
/// entered on the way to an element are left again on every exit path,
/// errors and panics included.
pub(crate) struct FrameGuard<'a> {
    driver: &'a dyn Driver,
    saved: Vec<ElementHandle>,
}

impl<'a> FrameGuard<'a> {
    pub(crate) fn new(driver: &'a dyn Driver) -> Self {
        Self {
            driver,
            saved: driver.frame_path(),
        }
    }

    fn restore(&self) -> Result<()> {
        let current = self.driver.frame_path();
        if current == self.saved {
            return Ok(());
        }

        if current.starts_with(&self.saved) {
            for _ in self.saved.len()..current.len() {
                self.driver.switch_to_parent_frame()?;
            }
        } else {
            self.driver.switch_to_default_content()?;
            for frame in &self.saved {
                self.driver.switch_to_frame(frame)?;
            }
        }
        tracing::trace!(depth = self.saved.len(), "Restored browsing context");
        Ok(())
    }
}

impl Drop for FrameGuard<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.restore() {
            tracing::warn!(error = %err, "Failed to restore browsing context");
        }
    }
}

/// Make `frames` the active context, starting from the top-level document.
pub(crate) fn enter(driver: &dyn Driver, frames: &[FrameEntry]) -> Result<()> {
    let current = driver.frame_path();
    if current.len() == frames.len()
        && current.iter().zip(frames).all(|(a, b)| *a == b.element)
    {
        return Ok(());
    }
    if !current.is_empty() {
        driver.switch_to_default_content()?;
    }
    for frame in frames {
        tracing::debug!(frame = %frame.label, "Switching into frame");
        driver.switch_to_frame(&frame.element)?;
    }
    Ok(())
}
