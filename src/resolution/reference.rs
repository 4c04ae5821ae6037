use crate::browser::Session;
use crate::core::{Driver, ElementHandle, Scope};
use crate::errors::Result;
use crate::locators::Locator;
use crate::model::ModelNode;
use crate::resolution::frames::FrameEntry;
use crate::types::LabelChain;
use std::fmt;
use std::sync::Arc;

/// A concrete element found by a resolution.
///
/// References are never cached by the engine: each resolution produces new
/// ones, and a reference kept past a DOM change simply goes stale. A
/// reference remembers the frames it was found in, so it can be used again
/// from any browsing context, and can anchor the resolution of model nodes
/// declared beneath the node it came from (see [`Session::within`]).
#[derive(Clone)]
pub struct Reference {
    element: ElementHandle,
    origin: Option<Arc<ModelNode>>,
    label: String,
    frames: Vec<FrameEntry>,
}

impl Reference {
    pub(crate) fn new(
        element: ElementHandle,
        origin: Option<Arc<ModelNode>>,
        label: impl Into<String>,
        frames: Vec<FrameEntry>,
    ) -> Self {
        Self {
            element,
            origin,
            label: label.into(),
            frames,
        }
    }

    pub fn element(&self) -> &ElementHandle {
        &self.element
    }

    /// The model node whose resolution produced this reference
    pub fn origin(&self) -> Option<&Arc<ModelNode>> {
        self.origin.as_ref()
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn frames(&self) -> &[FrameEntry] {
        &self.frames
    }

    /// Label chain for diagnostics: the origin's parents, then this label.
    pub fn chain(&self) -> LabelChain {
        match self.origin.as_ref().and_then(|origin| origin.parent()) {
            Some(parent) => parent.label_chain().child(self.label.as_str()),
            None => LabelChain::new(vec![self.label.clone()]),
        }
    }

    /// Search only inside this element. For a frame element the search runs
    /// inside the frame's document.
    pub fn find_within(&self, session: &Session, locator: &dyn Locator) -> Result<Vec<Reference>> {
        let chain = self.chain();
        let mut frames = self.frames.clone();
        let scope = if self.element.is_frame() {
            frames.push(FrameEntry {
                label: self.label.clone(),
                element: self.element.clone(),
            });
            Scope::Root
        } else {
            Scope::Element(self.element.clone())
        };

        let found = session
            .in_frames(&frames, |driver| locator.find_within(driver, &scope))
            .map_err(|err| err.at(&chain))?;
        tracing::debug!(reference = %chain, matched = found.len(), "Searched within reference");

        let label = format!("{} > {}", self.label, locator.describe());
        Ok(found
            .into_iter()
            .map(|element| Reference::new(element, None, label.clone(), frames.clone()))
            .collect())
    }

    pub fn get_text(&self, session: &Session) -> Result<String> {
        self.run(session, |driver, element| driver.text(element))
    }

    pub fn get_attribute(&self, session: &Session, name: &str) -> Result<Option<String>> {
        self.run(session, |driver, element| driver.attribute(element, name))
    }

    /// Whether the element and every frame it lives in are displayed. A
    /// stale reference is not visible.
    pub fn is_visible(&self, session: &Session) -> Result<bool> {
        let visible = session.in_frames(&[], |driver| {
            for (depth, frame) in self.frames.iter().enumerate() {
                if !driver.is_displayed(&frame.element)? {
                    tracing::debug!(reference = %self.label, frame = %frame.label, depth, "Frame not displayed");
                    return Ok(false);
                }
                driver.switch_to_frame(&frame.element)?;
            }
            driver.is_displayed(&self.element)
        });
        match visible {
            Err(err) if err.is_stale() => Ok(false),
            other => other.map_err(|err| err.at(&self.chain())),
        }
    }

    pub fn is_enabled(&self, session: &Session) -> Result<bool> {
        self.run(session, |driver, element| driver.is_enabled(element))
    }

    pub fn is_selected(&self, session: &Session) -> Result<bool> {
        self.run(session, |driver, element| driver.is_selected(element))
    }

    pub fn click(&self, session: &Session) -> Result<()> {
        tracing::info!(session = %session.id(), "Clicking on {}", self.chain());
        self.run(session, |driver, element| driver.click(element))
    }

    pub fn clear(&self, session: &Session) -> Result<()> {
        tracing::info!(session = %session.id(), "Clearing {}", self.chain());
        self.run(session, |driver, element| driver.clear(element))
    }

    pub fn send_keys(&self, session: &Session, keys: &str) -> Result<()> {
        tracing::info!(session = %session.id(), "Sending keys to {}", self.chain());
        self.run(session, |driver, element| driver.send_keys(element, keys))
    }

    fn run<T>(
        &self,
        session: &Session,
        action: impl FnOnce(&dyn Driver, &ElementHandle) -> Result<T>,
    ) -> Result<T> {
        session
            .in_frames(&self.frames, |driver| action(driver, &self.element))
            .map_err(|err| err.at(&self.chain()))
    }
}

impl AsRef<Reference> for Reference {
    fn as_ref(&self) -> &Reference {
        self
    }
}

impl PartialEq for Reference {
    fn eq(&self, other: &Self) -> bool {
        self.element == other.element
    }
}

impl Eq for Reference {}

impl fmt::Debug for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reference")
            .field("label", &self.label)
            .field("element", &self.element)
            .field("frames", &self.frames.len())
            .finish()
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.chain().fmt(f)
    }
}
