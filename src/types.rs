use serde::{Deserialize, Serialize};
use std::fmt;

/// Human-readable path of model labels, outermost first.
///
/// Diagnostics always carry one of these instead of raw selectors, so a
/// failure reads as `Login page > Login form > Username field`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelChain(Vec<String>);

impl LabelChain {
    pub fn new(labels: Vec<String>) -> Self {
        Self(labels)
    }

    pub fn labels(&self) -> &[String] {
        &self.0
    }

    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn child(&self, label: impl Into<String>) -> Self {
        let mut labels = self.0.clone();
        labels.push(label.into());
        Self(labels)
    }
}

impl fmt::Display for LabelChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(" > "))
    }
}

/// What happened at one step of a chain walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
    /// A page or anchored reference that contributes a scope without a search.
    Context,
    /// Located, display state not inspected.
    Found,
    Displayed,
    Hidden,
    Absent,
}

impl StepOutcome {
    pub fn is_blocking(self) -> bool {
        matches!(self, StepOutcome::Hidden | StepOutcome::Absent)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepReport {
    pub label: String,
    pub outcome: StepOutcome,
    /// True when this step is the node the walk was resolving.
    pub target: bool,
}

/// Result of a visibility check: the verdict plus every step that led to it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Visibility {
    pub visible: bool,
    pub steps: Vec<StepReport>,
}

impl Visibility {
    /// First step that was absent or hidden, if any.
    pub fn failing_step(&self) -> Option<&StepReport> {
        self.steps.iter().find(|step| step.outcome.is_blocking())
    }

    /// True when the walk stopped because something was missing from the DOM
    /// rather than hidden.
    pub fn is_absent(&self) -> bool {
        self.failing_step()
            .map(|step| step.outcome == StepOutcome::Absent)
            .unwrap_or(false)
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.failing_step() {
            None if self.visible => f.write_str("visible"),
            None => f.write_str("not visible"),
            Some(step) => {
                let what = match step.outcome {
                    StepOutcome::Absent => "does not exist",
                    _ => "not displayed",
                };
                if step.target {
                    f.write_str(what)
                } else {
                    write!(f, "parent '{}' {}", step.label, what)
                }
            }
        }
    }
}
