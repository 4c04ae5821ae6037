use crate::browser::Session;
use crate::core::Scope;
use crate::errors::Result;
use crate::locators::Locator;
use crate::model::builder::{Blueprint, GraphBuilder, Model, ModelGraph};
use crate::model::components::AsNode;
use crate::model::node::ModelNode;
use crate::resolution::Reference;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// The root of a model graph. Resolves against the session root.
pub struct Page<M> {
    blueprint: Arc<Blueprint<M>>,
    url: Option<String>,
}

impl<M: Model> Page<M> {
    /// Page backed by the blueprint shared by every `Page<M>`.
    pub fn new() -> Result<Self> {
        Ok(Self {
            blueprint: Blueprint::<M>::shared()?,
            url: None,
        })
    }

    /// Page backed by a freshly built, unshared graph.
    pub fn fresh() -> Result<Self> {
        Ok(Self {
            blueprint: Arc::new(GraphBuilder::build::<M>()?),
            url: None,
        })
    }

    pub fn at(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Navigate `session` to this page's URL, joined onto the session's
    /// base URL when relative. Without a URL this loads the base URL itself.
    pub fn go_to(&self, session: &Session) -> Result<()> {
        tracing::info!(session = %session.id(), page = %self.blueprint.root().label(), "Opening page");
        session.navigate(self.url.as_deref().unwrap_or(""))
    }

    /// Ad-hoc search of the top-level document.
    pub fn find_within(&self, session: &Session, locator: &dyn Locator) -> Result<Vec<Reference>> {
        let found = session.in_frames(&[], |driver| locator.find_within(driver, &Scope::Root))?;
        let label = format!("{} > {}", self.blueprint.root().label(), locator.describe());
        Ok(found
            .into_iter()
            .map(|element| Reference::new(element, None, label.clone(), Vec::new()))
            .collect())
    }

    pub fn graph(&self) -> &Arc<ModelGraph> {
        self.blueprint.graph()
    }

    pub fn model(&self) -> &M {
        self.blueprint.model()
    }
}

impl<M> AsNode for Page<M> {
    fn node(&self) -> &Arc<ModelNode> {
        self.blueprint.root()
    }
}

impl<M> Deref for Page<M> {
    type Target = M;

    fn deref(&self) -> &M {
        self.blueprint.model()
    }
}

impl<M> Clone for Page<M> {
    fn clone(&self) -> Self {
        Self {
            blueprint: self.blueprint.clone(),
            url: self.url.clone(),
        }
    }
}

impl<M> fmt::Debug for Page<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("label", &self.blueprint.root().label())
            .field("url", &self.url)
            .finish()
    }
}
