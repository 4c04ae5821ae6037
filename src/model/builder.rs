use crate::errors::{ConstructionError, Result};
use crate::locators::Locator;
use crate::model::components::{AsNode, Collection, Element, IFrame, Item, Region};
use crate::model::node::{ModelNode, NodeKind};
use crate::resolution::Reference;
use std::any::{type_name, Any, TypeId};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

/// A page, region, frame or collection item whose parts are declared once.
///
/// `declare` runs when the graph is built, never per interaction. It
/// receives a [`Declarer`] scoped to the node being declared; every part
/// declared through it gets that node as its parent unless the declaration
/// names another one.
///
/// ```ignore
/// struct LoginForm {
///     username: Element,
///     password: Element,
/// }
///
/// impl Model for LoginForm {
///     fn declare(d: &mut Declarer<'_>) -> Result<Self> {
///         Ok(Self {
///             username: d.element("Username field", by_css(".username"))?,
///             password: d.element("Password field", by_css(".password"))?,
///         })
///     }
/// }
/// ```
pub trait Model: Sized + Send + Sync + 'static {
    fn declare(d: &mut Declarer<'_>) -> Result<Self>;

    /// Label used when this model is the root page
    fn label() -> String {
        short_type_name::<Self>()
    }
}

/// The empty model, for nodes without declared children.
impl Model for () {
    fn declare(_: &mut Declarer<'_>) -> Result<Self> {
        Ok(())
    }
}

static NEXT_GRAPH_ID: AtomicU64 = AtomicU64::new(1);

type BlueprintCache = Mutex<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>;

static BLUEPRINTS: OnceLock<BlueprintCache> = OnceLock::new();

/// Every node of one built page, in declaration order.
#[derive(Debug)]
pub struct ModelGraph {
    id: u64,
    nodes: Vec<Arc<ModelNode>>,
}

/// One node of a graph described by label paths, for structural comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopologyEntry {
    pub path: String,
    pub kind: NodeKind,
    pub parent: Option<String>,
    pub explicit_parent: bool,
    pub declared_in: String,
}

impl ModelGraph {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn nodes(&self) -> &[Arc<ModelNode>] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node whose label chain renders as `path`
    pub fn find(&self, path: &str) -> Option<&Arc<ModelNode>> {
        self.nodes
            .iter()
            .find(|node| node.label_chain().to_string() == path)
    }

    pub fn topology(&self) -> Vec<TopologyEntry> {
        self.nodes
            .iter()
            .map(|node| TopologyEntry {
                path: node.label_chain().to_string(),
                kind: node.kind(),
                parent: node.parent().map(|p| p.label_chain().to_string()),
                explicit_parent: node.has_explicit_parent(),
                declared_in: node.declared_in().to_string(),
            })
            .collect()
    }
}

/// A built graph together with the typed model that fronts it.
pub struct Blueprint<M> {
    graph: Arc<ModelGraph>,
    root: Arc<ModelNode>,
    model: M,
}

impl<M: Model> Blueprint<M> {
    /// The blueprint for `M`, built on first use and shared afterwards.
    pub fn shared() -> Result<Arc<Self>> {
        let key = TypeId::of::<M>();
        let cache = BLUEPRINTS.get_or_init(Default::default);

        let cached = cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned();
        if let Some(entry) = cached {
            if let Ok(blueprint) = entry.downcast::<Self>() {
                return Ok(blueprint);
            }
        }

        // Built outside the lock: declarations may ask for other blueprints.
        let built = Arc::new(GraphBuilder::build::<M>()?);
        let mut cache = cache.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = cache
            .entry(key)
            .or_insert_with(|| built.clone() as Arc<dyn Any + Send + Sync>)
            .clone();
        Ok(entry.downcast::<Self>().unwrap_or(built))
    }
}

impl<M> Blueprint<M> {
    pub fn graph(&self) -> &Arc<ModelGraph> {
        &self.graph
    }

    pub fn root(&self) -> &Arc<ModelNode> {
        &self.root
    }

    pub fn model(&self) -> &M {
        &self.model
    }
}

impl<M> fmt::Debug for Blueprint<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Blueprint")
            .field("root", &self.root.label())
            .field("graph", &self.graph.id())
            .field("nodes", &self.graph.len())
            .finish_non_exhaustive()
    }
}

/// Turns a [`Model`] type into an immutable, fully parented graph.
pub struct GraphBuilder {
    id: u64,
    nodes: Vec<Arc<ModelNode>>,
    // (parent index, label) of every declared node
    children: HashSet<(usize, String)>,
}

impl GraphBuilder {
    /// Build a fresh graph for `M`, labelled with `M::label()`.
    ///
    /// Each call yields an independent graph with its own id; nothing is
    /// cached or shared with previous builds.
    pub fn build<M: Model>() -> Result<Blueprint<M>> {
        Self::build_labelled::<M>(M::label())
    }

    pub fn build_labelled<M: Model>(label: impl Into<String>) -> Result<Blueprint<M>> {
        let label = label.into();
        if label.trim().is_empty() {
            return Err(ConstructionError::Malformed {
                node: type_name::<M>().to_string(),
                reason: "page label is empty".to_string(),
            }
            .into());
        }

        let mut builder = GraphBuilder {
            id: NEXT_GRAPH_ID.fetch_add(1, Ordering::Relaxed),
            nodes: Vec::new(),
            children: HashSet::new(),
        };
        let root = builder.push(NodeParts {
            label,
            kind: NodeKind::Page,
            locator: None,
            parent: None,
            explicit_parent: false,
            declared_in: type_name::<M>(),
            result_type: type_name::<M>(),
        });

        let model = {
            let mut declarer = Declarer::new(&mut builder, root.clone(), type_name::<M>());
            M::declare(&mut declarer)?
        };

        tracing::debug!(
            page = %root.label(),
            graph = builder.id,
            nodes = builder.nodes.len(),
            "Built model graph"
        );

        Ok(Blueprint {
            graph: Arc::new(ModelGraph {
                id: builder.id,
                nodes: builder.nodes,
            }),
            root,
            model,
        })
    }

    fn push(&mut self, parts: NodeParts) -> Arc<ModelNode> {
        let node = Arc::new(ModelNode {
            graph_id: self.id,
            index: self.nodes.len(),
            label: parts.label,
            kind: parts.kind,
            locator: parts.locator,
            parent: parts.parent,
            explicit_parent: parts.explicit_parent,
            declared_in: short_name(parts.declared_in),
            result_type: parts.result_type,
        });
        self.nodes.push(node.clone());
        node
    }
}

struct NodeParts {
    label: String,
    kind: NodeKind,
    locator: Option<Arc<dyn Locator>>,
    parent: Option<Arc<ModelNode>>,
    explicit_parent: bool,
    declared_in: &'static str,
    result_type: &'static str,
}

/// Declaration scope handed to [`Model::declare`].
pub struct Declarer<'b> {
    builder: &'b mut GraphBuilder,
    enclosing: Arc<ModelNode>,
    model: &'static str,
    labels: HashSet<String>,
}

impl<'b> Declarer<'b> {
    fn new(builder: &'b mut GraphBuilder, enclosing: Arc<ModelNode>, model: &'static str) -> Self {
        Self {
            builder,
            enclosing,
            model,
            labels: HashSet::new(),
        }
    }

    /// The node that parts declared here are parented to by default
    pub fn enclosing(&self) -> &Arc<ModelNode> {
        &self.enclosing
    }

    /// Start a declaration that can take an explicit parent before it is
    /// finished as an element, region, frame or collection.
    pub fn node(&mut self, label: impl Into<String>, locator: Arc<dyn Locator>) -> Declaration<'_, 'b> {
        Declaration {
            declarer: self,
            label: label.into(),
            locator,
            parent: None,
        }
    }

    pub fn element(&mut self, label: impl Into<String>, locator: Arc<dyn Locator>) -> Result<Element> {
        self.node(label, locator).element()
    }

    pub fn region<M: Model>(
        &mut self,
        label: impl Into<String>,
        locator: Arc<dyn Locator>,
    ) -> Result<Region<M>> {
        self.node(label, locator).region()
    }

    pub fn iframe<M: Model>(
        &mut self,
        label: impl Into<String>,
        locator: Arc<dyn Locator>,
    ) -> Result<IFrame<M>> {
        self.node(label, locator).iframe()
    }

    pub fn collection<M: Model>(
        &mut self,
        label: impl Into<String>,
        locator: Arc<dyn Locator>,
    ) -> Result<Collection<M>> {
        self.node(label, locator).collection()
    }

    fn nested<M: Model>(&mut self, node: &Arc<ModelNode>) -> Result<M> {
        let mut child = Declarer::new(&mut *self.builder, node.clone(), type_name::<M>());
        M::declare(&mut child)
    }
}

/// A node declaration in progress.
pub struct Declaration<'d, 'b> {
    declarer: &'d mut Declarer<'b>,
    label: String,
    locator: Arc<dyn Locator>,
    parent: Option<Arc<ModelNode>>,
}

impl<'d, 'b> Declaration<'d, 'b> {
    /// Parent this node under `parent` instead of the enclosing model.
    ///
    /// The parent must already be part of the graph being built.
    pub fn parent(mut self, parent: &impl AsNode) -> Self {
        self.parent = Some(parent.node().clone());
        self
    }

    pub fn element(self) -> Result<Element> {
        let (node, _) = self.create(NodeKind::Element, type_name::<Reference>())?;
        Ok(Element::new(node))
    }

    pub fn region<M: Model>(self) -> Result<Region<M>> {
        let (node, declarer) = self.create(NodeKind::Region, type_name::<M>())?;
        let model = declarer.nested::<M>(&node)?;
        Ok(Region::new(node, model))
    }

    pub fn iframe<M: Model>(self) -> Result<IFrame<M>> {
        let (node, declarer) = self.create(NodeKind::IFrame, type_name::<M>())?;
        let model = declarer.nested::<M>(&node)?;
        Ok(IFrame::new(node, model))
    }

    pub fn collection<M: Model>(self) -> Result<Collection<M>> {
        let (node, declarer) = self.create(NodeKind::Collection, type_name::<Item<M>>())?;
        let model = declarer.nested::<M>(&node)?;
        Ok(Collection::new(node, Arc::new(model)))
    }

    fn create(
        self,
        kind: NodeKind,
        result_type: &'static str,
    ) -> Result<(Arc<ModelNode>, &'d mut Declarer<'b>)> {
        let Declaration {
            declarer,
            label,
            locator,
            parent,
        } = self;
        let scope = declarer.enclosing.label_chain();

        if label.trim().is_empty() {
            return Err(ConstructionError::Malformed {
                node: scope.child("<unnamed>").to_string(),
                reason: "label is empty".to_string(),
            }
            .into());
        }
        if let Err(reason) = locator.validate() {
            return Err(ConstructionError::Malformed {
                node: scope.child(label).to_string(),
                reason,
            }
            .into());
        }
        if !declarer.labels.insert(label.clone()) {
            return Err(ConstructionError::DuplicateLabel {
                model: short_name(declarer.model),
                label,
            }
            .into());
        }

        let (parent, explicit_parent) = match parent {
            Some(parent) if parent.graph_id() != declarer.builder.id => {
                return Err(ConstructionError::ForeignParent {
                    node: scope.child(label).to_string(),
                    parent: parent.label_chain().to_string(),
                }
                .into());
            }
            Some(parent) => (parent, true),
            None => (declarer.enclosing.clone(), false),
        };
        // Labels declared by different models may still collide under an
        // explicit parent, which would give two nodes the same chain.
        if !declarer
            .builder
            .children
            .insert((parent.index(), label.clone()))
        {
            return Err(ConstructionError::DuplicateChild {
                parent: parent.label_chain().to_string(),
                label,
            }
            .into());
        }

        let node = declarer.builder.push(NodeParts {
            label,
            kind,
            locator: Some(locator),
            parent: Some(parent),
            explicit_parent,
            declared_in: declarer.model,
            result_type,
        });
        tracing::trace!(node = %node, ?kind, explicit_parent, "Declared model node");
        Ok((node, declarer))
    }
}

fn short_type_name<T>() -> String {
    short_name(type_name::<T>())
}

/// `crate::pages::LoginPage<Foo>` becomes `LoginPage`.
fn short_name(full: &str) -> String {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::PomError;
    use crate::locators::by_css;
    use crate::testing::fixtures::{LoginForm, LoginPage, TablePage};

    #[test]
    fn test_short_name() {
        assert_eq!(short_name("a::b::LoginPage"), "LoginPage");
        assert_eq!(short_name("a::Collection<a::b::Row>"), "Collection");
        assert_eq!(short_name("()"), "()");
    }

    #[test]
    fn test_implicit_parent_is_declaring_model() {
        let page = GraphBuilder::build::<LoginPage>().unwrap();
        let form = &page.model().login_form;
        assert!(Arc::ptr_eq(
            form.username_field.node().parent().unwrap(),
            form.node()
        ));
        assert!(!form.username_field.node().has_explicit_parent());
        assert_eq!(form.username_field.node().declared_in(), "LoginForm");
    }

    #[test]
    fn test_explicit_parent_overrides_declaring_model() {
        let page = GraphBuilder::build::<LoginPage>().unwrap();
        let model = page.model();
        let parent = model.login_form.node().parent().unwrap();
        assert!(Arc::ptr_eq(parent, model.login_service_iframe.node()));
        assert!(model.login_form.node().has_explicit_parent());
        // Still declared by the page, even though parented to the frame.
        assert_eq!(model.login_form.node().declared_in(), "LoginPage");
    }

    #[test]
    fn test_two_builds_share_topology_but_not_identity() {
        let first = GraphBuilder::build::<LoginPage>().unwrap();
        let second = GraphBuilder::build::<LoginPage>().unwrap();
        assert_eq!(first.graph().topology(), second.graph().topology());
        assert_ne!(first.graph().id(), second.graph().id());
        assert!(!Arc::ptr_eq(first.root(), second.root()));
        assert!(!first
            .model()
            .login_form
            .node()
            .is_same(second.model().login_form.node()));
    }

    #[test]
    fn test_shared_blueprint_is_built_once() {
        let first = Blueprint::<TablePage>::shared().unwrap();
        let second = Blueprint::<TablePage>::shared().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_topology_lists_every_node_in_declaration_order() {
        let page = GraphBuilder::build::<LoginPage>().unwrap();
        let paths: Vec<String> = page
            .graph()
            .topology()
            .into_iter()
            .map(|entry| entry.path)
            .collect();
        assert_eq!(
            paths,
            vec![
                "Login page",
                "Login page > LoginService iframe",
                "Login page > LoginService iframe > Login form",
                "Login page > LoginService iframe > Login form > Username field",
                "Login page > LoginService iframe > Login form > Password field",
                "Login page > LoginService iframe > Login form > Submit button",
                "Login page > Banner",
            ]
        );
        assert!(page.graph().find("Login page > Banner").is_some());
    }

    #[test]
    fn test_collection_children_are_parented_to_the_collection() {
        let page = GraphBuilder::build::<TablePage>().unwrap();
        let rows = &page.model().rows;
        assert_eq!(rows.node().kind(), NodeKind::Collection);
        assert!(Arc::ptr_eq(rows.model().name.node().parent().unwrap(), rows.node()));
        assert!(rows.node().result_type().contains("Item"));
    }

    struct Duplicated;

    impl Model for Duplicated {
        fn declare(d: &mut Declarer<'_>) -> Result<Self> {
            d.element("Save", by_css(".save"))?;
            d.element("Save", by_css(".save-2"))?;
            Ok(Self)
        }
    }

    #[test]
    fn test_duplicate_labels_fail_construction() {
        let err = GraphBuilder::build::<Duplicated>().unwrap_err();
        assert!(matches!(
            err,
            PomError::Construction(ConstructionError::DuplicateLabel { ref label, .. }) if label == "Save"
        ));
    }

    struct SameLabelInDifferentModels {
        _form: Region<LoginForm>,
        _other: Region<LoginForm>,
    }

    impl Model for SameLabelInDifferentModels {
        fn declare(d: &mut Declarer<'_>) -> Result<Self> {
            Ok(Self {
                _form: d.region("Form A", by_css(".a"))?,
                _other: d.region("Form B", by_css(".b"))?,
            })
        }
    }

    #[test]
    fn test_labels_only_need_to_be_unique_per_model() {
        assert!(GraphBuilder::build::<SameLabelInDifferentModels>().is_ok());
    }

    struct FrameTitle {
        _title: Element,
    }

    impl Model for FrameTitle {
        fn declare(d: &mut Declarer<'_>) -> Result<Self> {
            Ok(Self {
                _title: d.element("Title", by_css("h1"))?,
            })
        }
    }

    struct CollidingChildren;

    impl Model for CollidingChildren {
        fn declare(d: &mut Declarer<'_>) -> Result<Self> {
            let frame = d.iframe::<FrameTitle>("Frame", by_css("iframe"))?;
            d.node("Title", by_css(".title"))
                .parent(&frame)
                .element()?;
            Ok(Self)
        }
    }

    #[test]
    fn test_explicit_parent_cannot_take_a_label_twice() {
        let err = GraphBuilder::build::<CollidingChildren>().unwrap_err();
        assert!(matches!(
            err,
            PomError::Construction(ConstructionError::DuplicateChild { ref parent, ref label })
                if parent == "CollidingChildren > Frame" && label == "Title"
        ));
    }

    struct Malformed;

    impl Model for Malformed {
        fn declare(d: &mut Declarer<'_>) -> Result<Self> {
            d.element("Nothing", by_css(""))?;
            Ok(Self)
        }
    }

    #[test]
    fn test_empty_locator_is_malformed() {
        let err = GraphBuilder::build::<Malformed>().unwrap_err();
        match err {
            PomError::Construction(ConstructionError::Malformed { node, .. }) => {
                assert_eq!(node, "Malformed > Nothing");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    struct Foreign;

    impl Model for Foreign {
        fn declare(d: &mut Declarer<'_>) -> Result<Self> {
            let other = GraphBuilder::build::<LoginPage>()?;
            d.node("Stray field", by_css(".stray"))
                .parent(&other.model().banner)
                .element()?;
            Ok(Self)
        }
    }

    #[test]
    fn test_parent_from_another_graph_fails_fast() {
        let err = GraphBuilder::build::<Foreign>().unwrap_err();
        match err {
            PomError::Construction(ConstructionError::ForeignParent { node, parent }) => {
                assert_eq!(node, "Foreign > Stray field");
                assert_eq!(parent, "Login page > Banner");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
