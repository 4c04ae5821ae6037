use crate::locators::Locator;
use crate::types::LabelChain;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Page,
    Region,
    Element,
    Collection,
    IFrame,
}

impl NodeKind {
    /// Singular kinds must resolve to exactly one element at every step.
    pub fn is_singular(self) -> bool {
        !matches!(self, NodeKind::Collection)
    }
}

/// One declared, located piece of UI.
///
/// Created once by the graph builder and never mutated afterwards. The
/// parent link is fixed at construction, whether it came from the enclosing
/// model or from an explicit override.
pub struct ModelNode {
    pub(crate) graph_id: u64,
    pub(crate) index: usize,
    pub(crate) label: String,
    pub(crate) kind: NodeKind,
    pub(crate) locator: Option<Arc<dyn Locator>>,
    pub(crate) parent: Option<Arc<ModelNode>>,
    pub(crate) explicit_parent: bool,
    pub(crate) declared_in: String,
    pub(crate) result_type: &'static str,
}

impl ModelNode {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// `None` only for pages, which resolve to the session root.
    pub fn locator(&self) -> Option<&Arc<dyn Locator>> {
        self.locator.as_ref()
    }

    /// The effective parent.
    pub fn parent(&self) -> Option<&Arc<ModelNode>> {
        self.parent.as_ref()
    }

    pub fn has_explicit_parent(&self) -> bool {
        self.explicit_parent
    }

    /// Name of the model type whose declaration created this node
    pub fn declared_in(&self) -> &str {
        &self.declared_in
    }

    /// Type produced when this node is resolved
    pub fn result_type(&self) -> &'static str {
        self.result_type
    }

    pub fn graph_id(&self) -> u64 {
        self.graph_id
    }

    /// Position in declaration order within its graph
    pub fn index(&self) -> usize {
        self.index
    }

    /// Ancestors, innermost first.
    pub fn ancestors(&self) -> impl Iterator<Item = &Arc<ModelNode>> {
        std::iter::successors(self.parent.as_ref(), |node| node.parent.as_ref())
    }

    pub fn label_chain(&self) -> LabelChain {
        let mut labels: Vec<String> = self
            .ancestors()
            .map(|node| node.label.clone())
            .collect();
        labels.reverse();
        labels.push(self.label.clone());
        LabelChain::new(labels)
    }

    /// Identity within the graph, independent of `Arc` pointers.
    pub fn is_same(&self, other: &ModelNode) -> bool {
        self.graph_id == other.graph_id && self.index == other.index
    }
}

impl fmt::Debug for ModelNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelNode")
            .field("label", &self.label)
            .field("kind", &self.kind)
            .field("locator", &self.locator.as_ref().map(|l| l.describe()))
            .field("parent", &self.parent.as_ref().map(|p| p.label.as_str()))
            .field("explicit_parent", &self.explicit_parent)
            .field("graph_id", &self.graph_id)
            .finish()
    }
}

impl fmt::Display for ModelNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.label_chain().fmt(f)
    }
}
