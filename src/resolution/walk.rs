use crate::core::{Driver, ElementHandle, Scope};
use crate::errors::{PomError, Result};
use crate::locators::Locator;
use crate::model::{ModelNode, NodeKind};
use crate::resolution::frames::{FrameEntry, FrameGuard};
use crate::resolution::reference::Reference;
use crate::types::{StepOutcome, StepReport, Visibility};
use std::sync::Arc;

/// Where a walk ended up.
#[derive(Debug)]
pub(crate) enum Outcome {
    /// A singular target: its element, or the root scope for a page.
    Single(Scope),
    /// Every match of a collection target.
    Many(Vec<ElementHandle>),
    /// Some step was absent, or hidden while display was being checked.
    Blocked,
}

/// One resolution of one node against the live session.
///
/// Walks the node's ancestors outside-in, applying each locator inside the
/// scope its parent resolved to and entering frames on the way. The walk
/// owns a [`FrameGuard`], so whatever the caller does with the result must
/// happen before the walk is dropped.
pub(crate) struct Walk<'a> {
    driver: &'a dyn Driver,
    _guard: FrameGuard<'a>,
    frames: Vec<FrameEntry>,
    steps: Vec<StepReport>,
    check_display: bool,
}

impl<'a> Walk<'a> {
    pub(crate) fn new(driver: &'a dyn Driver, check_display: bool) -> Self {
        Self {
            driver,
            _guard: FrameGuard::new(driver),
            frames: Vec::new(),
            steps: Vec::new(),
            check_display,
        }
    }

    pub(crate) fn driver(&self) -> &'a dyn Driver {
        self.driver
    }

    /// Frames entered so far, outermost first
    pub(crate) fn frames(&self) -> &[FrameEntry] {
        &self.frames
    }

    pub(crate) fn visibility(&self, outcome: &Outcome) -> Visibility {
        Visibility {
            visible: !matches!(outcome, Outcome::Blocked)
                && !self.steps.iter().any(|step| step.outcome.is_blocking()),
            steps: self.steps.clone(),
        }
    }

    pub(crate) fn into_visibility(self, outcome: &Outcome) -> Visibility {
        self.visibility(outcome)
    }

    /// Resolve `node`, starting from the innermost anchor it lives under, or
    /// from the top-level document when there is none.
    pub(crate) fn resolve(&mut self, node: &Arc<ModelNode>, anchors: &[Reference]) -> Result<Outcome> {
        let anchor = anchors.iter().rev().find(|anchor| {
            anchor
                .origin()
                .map(|origin| node.ancestors().any(|ancestor| ancestor.is_same(origin)))
                .unwrap_or(false)
        });

        let mut chain: Vec<&Arc<ModelNode>> = match anchor.and_then(Reference::origin) {
            Some(origin) => node
                .ancestors()
                .take_while(|ancestor| !ancestor.is_same(origin))
                .collect(),
            None => node.ancestors().collect(),
        };
        chain.reverse();

        let mut scope = match anchor {
            Some(anchor) => match self.enter_anchor(anchor)? {
                Some(scope) => scope,
                None => return Ok(Outcome::Blocked),
            },
            None => {
                self.enter_root()?;
                Scope::Root
            }
        };

        for ancestor in chain {
            match self.step(ancestor, scope)? {
                Some(next) => scope = next,
                None => return Ok(Outcome::Blocked),
            }
        }
        self.target(node, scope)
    }

    fn enter_root(&mut self) -> Result<()> {
        if !self.driver.frame_path().is_empty() {
            self.driver.switch_to_default_content()?;
        }
        self.frames.clear();
        Ok(())
    }

    /// Re-enter the frames an anchor was found in and check the anchor
    /// itself, then search from inside it.
    fn enter_anchor(&mut self, anchor: &Reference) -> Result<Option<Scope>> {
        self.enter_root()?;
        tracing::debug!(anchor = %anchor.label(), "Resolving from anchored reference");

        for frame in anchor.frames() {
            if !self.check(&frame.label, &frame.element, false)? {
                return Ok(None);
            }
            if let Err(err) = self.driver.switch_to_frame(&frame.element) {
                if err.is_stale() {
                    self.mark_absent(&frame.label);
                    return Ok(None);
                }
                return Err(err.at(&anchor.chain()));
            }
            self.frames.push(frame.clone());
        }

        if !self.check(anchor.label(), anchor.element(), false)? {
            return Ok(None);
        }
        Ok(Some(Scope::Element(anchor.element().clone())))
    }

    fn step(&mut self, node: &Arc<ModelNode>, scope: Scope) -> Result<Option<Scope>> {
        let Some(locator) = node.locator() else {
            self.record(node.label(), StepOutcome::Context, false);
            return Ok(Some(scope));
        };

        let Some(element) = self.locate(node, locator.as_ref(), &scope, false)? else {
            return Ok(None);
        };

        if node.kind() == NodeKind::IFrame {
            tracing::debug!(frame = %node, "Switching into frame");
            self.driver
                .switch_to_frame(&element)
                .map_err(|err| err.at(&node.label_chain()))?;
            self.frames.push(FrameEntry {
                label: node.label().to_string(),
                element,
            });
            return Ok(Some(Scope::Root));
        }
        Ok(Some(Scope::Element(element)))
    }

    fn target(&mut self, node: &Arc<ModelNode>, scope: Scope) -> Result<Outcome> {
        let Some(locator) = node.locator() else {
            self.record(node.label(), StepOutcome::Context, true);
            return Ok(Outcome::Single(scope));
        };

        if node.kind() == NodeKind::Collection {
            let found = match locator.find_within(self.driver, &scope) {
                Ok(found) => found,
                Err(err) if err.is_stale() => Vec::new(),
                Err(err) => return Err(err.at(&node.label_chain())),
            };
            tracing::trace!(collection = %node, count = found.len(), "Resolved collection");
            if found.is_empty() {
                self.record(node.label(), StepOutcome::Absent, true);
                return Ok(Outcome::Blocked);
            }
            self.record(node.label(), StepOutcome::Found, true);
            return Ok(Outcome::Many(found));
        }

        Ok(match self.locate(node, locator.as_ref(), &scope, true)? {
            Some(element) => Outcome::Single(Scope::Element(element)),
            None => Outcome::Blocked,
        })
    }

    /// Apply a singular node's locator. Zero matches is an absence, more
    /// than one is always an error.
    fn locate(
        &mut self,
        node: &ModelNode,
        locator: &dyn Locator,
        scope: &Scope,
        target: bool,
    ) -> Result<Option<ElementHandle>> {
        let mut found = match locator.find_within(self.driver, scope) {
            Ok(found) => found,
            Err(err) if err.is_stale() => {
                self.record(node.label(), StepOutcome::Absent, target);
                return Ok(None);
            }
            Err(err) => return Err(err.at(&node.label_chain())),
        };
        tracing::trace!(
            node = %node,
            locator = %locator.describe(),
            matched = found.len(),
            "Applied locator"
        );

        match found.len() {
            0 => {
                self.record(node.label(), StepOutcome::Absent, target);
                Ok(None)
            }
            1 => {
                let element = found.remove(0);
                if self.check(node.label(), &element, target)? {
                    Ok(Some(element))
                } else {
                    Ok(None)
                }
            }
            count => Err(PomError::Ambiguous {
                chain: node.label_chain(),
                count,
            }),
        }
    }

    /// Record a located element, checking its display state when the walk
    /// requires it. Returns false when the element blocks the walk.
    fn check(&mut self, label: &str, element: &ElementHandle, target: bool) -> Result<bool> {
        if !self.check_display {
            self.record(label, StepOutcome::Found, target);
            return Ok(true);
        }
        match self.driver.is_displayed(element) {
            Ok(true) => {
                self.record(label, StepOutcome::Displayed, target);
                Ok(true)
            }
            Ok(false) => {
                self.record(label, StepOutcome::Hidden, target);
                Ok(false)
            }
            Err(err) if err.is_stale() => {
                self.record(label, StepOutcome::Absent, target);
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    fn mark_absent(&mut self, label: &str) {
        self.record(label, StepOutcome::Absent, false);
    }

    fn record(&mut self, label: &str, outcome: StepOutcome, target: bool) {
        tracing::trace!(step = %label, ?outcome, target, "Chain step");
        self.steps.push(StepReport {
            label: label.to_string(),
            outcome,
            target,
        });
    }
}
