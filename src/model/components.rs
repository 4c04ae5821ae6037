use crate::browser::Session;
use crate::errors::Result;
use crate::locators::Locator;
use crate::model::node::ModelNode;
use crate::resolution::Reference;
use crate::types::{LabelChain, Visibility};
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;

/// Anything backed by a node of a model graph.
pub trait AsNode {
    fn node(&self) -> &Arc<ModelNode>;

    fn label_chain(&self) -> LabelChain {
        ModelNode::label_chain(self.node())
    }
}

impl AsNode for Arc<ModelNode> {
    fn node(&self) -> &Arc<ModelNode> {
        self
    }
}

/// Operations shared by every singular, located node.
///
/// Each call re-resolves the node's whole chain against the live session;
/// nothing found by one call is reused by the next.
pub trait Container: AsNode {
    /// The unique element this node designates, without a display check.
    fn find(&self, session: &Session) -> Result<Reference> {
        session.find(self.node())
    }

    /// Ad-hoc search inside this node's element, or inside the frame's
    /// document for an iframe.
    fn find_within(&self, session: &Session, locator: &dyn Locator) -> Result<Vec<Reference>> {
        self.find(session)?.find_within(session, locator)
    }

    fn is_in_dom(&self, session: &Session) -> Result<bool> {
        session.is_in_dom(self.node())
    }

    fn is_visible(&self, session: &Session) -> Result<bool> {
        session.is_visible(self.node())
    }

    fn visibility(&self, session: &Session) -> Result<Visibility> {
        session.visibility(self.node())
    }

    /// Wait using the session's configured timeout.
    fn wait_for_visible(&self, session: &Session) -> Result<Visibility> {
        session.wait_for_visible(self.node(), session.config().wait_timeout())
    }

    fn wait_for_visible_within(&self, session: &Session, timeout: Duration) -> Result<Visibility> {
        session.wait_for_visible(self.node(), timeout)
    }

    fn wait_for_not_visible(&self, session: &Session) -> Result<Visibility> {
        session.wait_for_not_visible(self.node(), session.config().wait_timeout())
    }

    fn wait_for_not_visible_within(
        &self,
        session: &Session,
        timeout: Duration,
    ) -> Result<Visibility> {
        session.wait_for_not_visible(self.node(), timeout)
    }

    fn get_text(&self, session: &Session) -> Result<String> {
        session.get_text(self.node())
    }

    fn get_attribute(&self, session: &Session, name: &str) -> Result<Option<String>> {
        session.get_attribute(self.node(), name)
    }
}

/// A single interactive element.
#[derive(Debug, Clone)]
pub struct Element {
    node: Arc<ModelNode>,
}

impl Element {
    pub(crate) fn new(node: Arc<ModelNode>) -> Self {
        Self { node }
    }

    pub fn click(&self, session: &Session) -> Result<()> {
        session.click(&self.node)
    }

    pub fn clear_text(&self, session: &Session) -> Result<()> {
        session.clear_text(&self.node)
    }

    pub fn send_keys(&self, session: &Session, keys: &str) -> Result<()> {
        session.send_keys(&self.node, keys)
    }

    /// Replace the element's text.
    pub fn set_text(&self, session: &Session, text: &str) -> Result<()> {
        session.set_text(&self.node, text)
    }

    /// Like [`Element::set_text`], but the value never reaches the logs.
    pub fn set_secret_text(&self, session: &Session, text: &str) -> Result<()> {
        session.set_secret_text(&self.node, text)
    }

    pub fn is_enabled(&self, session: &Session) -> Result<bool> {
        session.is_enabled(&self.node)
    }

    pub fn is_selected(&self, session: &Session) -> Result<bool> {
        session.is_selected(&self.node)
    }
}

impl AsNode for Element {
    fn node(&self) -> &Arc<ModelNode> {
        &self.node
    }
}

impl Container for Element {}

macro_rules! model_handle {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone)]
        pub struct $name<M = ()> {
            node: Arc<ModelNode>,
            model: M,
        }

        impl<M> $name<M> {
            pub(crate) fn new(node: Arc<ModelNode>, model: M) -> Self {
                Self { node, model }
            }

            pub fn model(&self) -> &M {
                &self.model
            }
        }

        impl<M> AsNode for $name<M> {
            fn node(&self) -> &Arc<ModelNode> {
                &self.node
            }
        }

        impl<M> Container for $name<M> {}

        impl<M> Deref for $name<M> {
            type Target = M;

            fn deref(&self) -> &M {
                &self.model
            }
        }

        impl<M> fmt::Debug for $name<M> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($name))
                    .field("node", &self.node.label_chain().to_string())
                    .finish_non_exhaustive()
            }
        }
    };
}

model_handle!(
    /// A located group of declared children.
    Region
);

model_handle!(
    /// A located `<iframe>`. Its children resolve inside the frame's
    /// browsing context.
    IFrame
);

/// A node that may match any number of elements.
///
/// Every match becomes an [`Item`] sharing the same child model `M`.
pub struct Collection<M = ()> {
    node: Arc<ModelNode>,
    model: Arc<M>,
}

impl<M> Collection<M> {
    pub(crate) fn new(node: Arc<ModelNode>, model: Arc<M>) -> Self {
        Self { node, model }
    }

    /// The child model shared by every item
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Every current match, in document order.
    pub fn get(&self, session: &Session) -> Result<Vec<Item<M>>> {
        Ok(self
            .references(session)?
            .into_iter()
            .map(|reference| Item::new(reference, self.model.clone()))
            .collect())
    }

    pub fn references(&self, session: &Session) -> Result<Vec<Reference>> {
        session.find_all(&self.node)
    }

    pub fn count(&self, session: &Session) -> Result<usize> {
        Ok(self.references(session)?.len())
    }
}

impl<M> Clone for Collection<M> {
    fn clone(&self) -> Self {
        Self {
            node: self.node.clone(),
            model: self.model.clone(),
        }
    }
}

impl<M> AsNode for Collection<M> {
    fn node(&self) -> &Arc<ModelNode> {
        &self.node
    }
}

impl<M> fmt::Debug for Collection<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("node", &self.node.label_chain().to_string())
            .finish_non_exhaustive()
    }
}

/// One match of a [`Collection`]: a concrete element plus the child model.
///
/// The item's children are declared against the collection node; resolve
/// them against this particular match with [`Item::scope`] or
/// [`Session::within`].
pub struct Item<M> {
    reference: Reference,
    model: Arc<M>,
}

impl<M> Item<M> {
    pub(crate) fn new(reference: Reference, model: Arc<M>) -> Self {
        Self { reference, model }
    }

    pub fn reference(&self) -> &Reference {
        &self.reference
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// A session whose resolutions of this item's children search only
    /// inside this item.
    pub fn scope(&self, session: &Session) -> Session {
        session.within(&self.reference)
    }
}

impl<M> Clone for Item<M> {
    fn clone(&self) -> Self {
        Self {
            reference: self.reference.clone(),
            model: self.model.clone(),
        }
    }
}

impl<M> Deref for Item<M> {
    type Target = M;

    fn deref(&self) -> &M {
        &self.model
    }
}

impl<M> AsRef<Reference> for Item<M> {
    fn as_ref(&self) -> &Reference {
        &self.reference
    }
}

impl<M> fmt::Debug for Item<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Item")
            .field("reference", &self.reference)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::GraphBuilder;
    use crate::testing::fixtures::{LoginPage, TablePage};

    #[test]
    fn test_label_chain_through_handles() {
        let page = GraphBuilder::build::<LoginPage>().unwrap();
        let field = &page.model().login_form.username_field;
        assert_eq!(
            AsNode::label_chain(field).to_string(),
            "Login page > LoginService iframe > Login form > Username field"
        );
        assert_eq!(
            AsNode::label_chain(field.node()),
            field.node().as_ref().label_chain()
        );
    }

    #[test]
    fn test_debug_names_the_chain() {
        let page = GraphBuilder::build::<TablePage>().unwrap();
        let rows = format!("{:?}", page.model().rows);
        assert!(rows.contains("Table page > Rows"), "{rows}");
    }
}
