use crate::browser::Session;
use crate::core::Scope;
use crate::errors::{PomError, Result};
use crate::model::AsNode;
use crate::resolution::reference::Reference;
use crate::resolution::walk::{Outcome, Walk};
use crate::types::Visibility;

impl Session {
    /// The unique element `node` designates, found without display checks.
    ///
    /// Absence becomes [`PomError::NotFound`] naming the missing step; more
    /// than one match anywhere in the chain is [`PomError::Ambiguous`].
    pub fn find<N: AsNode + ?Sized>(&self, node: &N) -> Result<Reference> {
        let node = node.node();
        let mut walk = Walk::new(self.driver(), false);
        let outcome = walk.resolve(node, self.anchors())?;
        tracing::debug!(session = %self.id(), node = %node, "Finding element");

        match outcome {
            Outcome::Single(Scope::Element(element)) => Ok(Reference::new(
                element,
                Some(node.clone()),
                node.label(),
                walk.frames().to_vec(),
            )),
            Outcome::Single(Scope::Root) => Err(PomError::Unsupported(format!(
                "{} is a page and resolves to the session root, not an element",
                node
            ))),
            Outcome::Many(_) => Err(PomError::Unsupported(format!(
                "{} is a collection; use its references instead",
                node
            ))),
            Outcome::Blocked => Err(PomError::NotFound {
                chain: node.label_chain(),
                reason: walk.visibility(&outcome),
            }),
        }
    }

    /// Every element `node` currently designates.
    ///
    /// Collections yield one reference per match, labelled `Label[i]`.
    /// Singular nodes yield one reference, or none when a step is absent.
    pub fn find_all<N: AsNode + ?Sized>(&self, node: &N) -> Result<Vec<Reference>> {
        let node = node.node();
        let mut walk = Walk::new(self.driver(), false);
        let outcome = walk.resolve(node, self.anchors())?;

        let references = match outcome {
            Outcome::Many(elements) => elements
                .into_iter()
                .enumerate()
                .map(|(i, element)| {
                    Reference::new(
                        element,
                        Some(node.clone()),
                        format!("{}[{}]", node.label(), i),
                        walk.frames().to_vec(),
                    )
                })
                .collect(),
            Outcome::Single(Scope::Element(element)) => vec![Reference::new(
                element,
                Some(node.clone()),
                node.label(),
                walk.frames().to_vec(),
            )],
            Outcome::Single(Scope::Root) | Outcome::Blocked => Vec::new(),
        };
        tracing::debug!(session = %self.id(), node = %node, count = references.len(), "Resolved references");
        Ok(references)
    }

    /// Whether every step of the chain exists, displayed or not.
    pub fn is_in_dom<N: AsNode + ?Sized>(&self, node: &N) -> Result<bool> {
        let mut walk = Walk::new(self.driver(), false);
        let outcome = walk.resolve(node.node(), self.anchors())?;
        Ok(!matches!(outcome, Outcome::Blocked))
    }

    /// Full visibility verdict for `node`, with every step that led to it.
    ///
    /// Visible means the node and all of its ancestors, frames included,
    /// exist and are displayed. Absence is reported, not raised. A
    /// collection with no matches is absent.
    pub fn visibility<N: AsNode + ?Sized>(&self, node: &N) -> Result<Visibility> {
        let node = node.node();
        let mut walk = Walk::new(self.driver(), true);
        let outcome = walk.resolve(node, self.anchors())?;
        let visibility = walk.visibility(&outcome);
        tracing::debug!(node = %node, verdict = %visibility, "Checked visibility");
        Ok(visibility)
    }

    pub fn is_visible<N: AsNode + ?Sized>(&self, node: &N) -> Result<bool> {
        Ok(self.visibility(node)?.visible)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::DriverEvent;
    use crate::core::Driver;
    use crate::locators::by_css;
    use crate::model::{Container, GraphBuilder, Page};
    use crate::testing::fixtures::{
        LoginPage, TablePage, HIDDEN_IFRAME_LOGIN_HTML, LOGIN_HTML, TABLE_HTML,
    };
    use crate::testing::TestHelper;
    use crate::types::StepOutcome;

    #[test]
    fn test_login_form_inside_iframe_is_visible() {
        let (driver, session) = TestHelper::session(LOGIN_HTML);
        let page = Page::<LoginPage>::new().unwrap();

        let visibility = page.login_form.username_field.visibility(&session).unwrap();
        assert!(visibility.visible);
        let labels: Vec<&str> = visibility.steps.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "Login page",
                "LoginService iframe",
                "Login form",
                "Username field"
            ]
        );
        assert!(driver.frame_path().is_empty());
    }

    #[test]
    fn test_hidden_iframe_hides_everything_inside_it() {
        let (driver, session) = TestHelper::session(HIDDEN_IFRAME_LOGIN_HTML);
        let page = Page::<LoginPage>::new().unwrap();

        let visibility = page.login_form.username_field.visibility(&session).unwrap();
        assert!(!visibility.visible);
        let failing = visibility.failing_step().unwrap();
        assert_eq!(failing.label, "LoginService iframe");
        assert_eq!(failing.outcome, StepOutcome::Hidden);
        assert_eq!(
            visibility.to_string(),
            "parent 'LoginService iframe' not displayed"
        );

        // The field itself still exists and would report displayed on its own.
        let field = page.login_form.username_field.find(&session).unwrap();
        assert!(session
            .in_frames(field.frames(), |d| d.is_displayed(field.element()))
            .unwrap());
        assert!(driver.frame_path().is_empty());
    }

    #[test]
    fn test_missing_node_is_invisible_without_error() {
        let (_, session) = TestHelper::session("<p>nothing here</p>");
        let page = Page::<LoginPage>::new().unwrap();

        assert!(!page.banner.is_visible(&session).unwrap());
        assert!(!page.banner.is_in_dom(&session).unwrap());
        let visibility = page.login_form.username_field.visibility(&session).unwrap();
        assert!(visibility.is_absent());
        assert_eq!(
            visibility.failing_step().unwrap().label,
            "LoginService iframe"
        );
    }

    #[test]
    fn test_find_on_missing_node_names_the_absent_step() {
        let (_, session) = TestHelper::session(r#"<div class="banner"></div>"#);
        let page = Page::<LoginPage>::new().unwrap();

        match page.login_form.username_field.find(&session) {
            Err(PomError::NotFound { chain, reason }) => {
                assert_eq!(
                    chain.to_string(),
                    "Login page > LoginService iframe > Login form > Username field"
                );
                assert_eq!(reason.to_string(), "parent 'LoginService iframe' does not exist");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_ambiguous_match_is_an_error_not_a_truncation() {
        let (_, session) = TestHelper::session(
            r#"<div class="banner">one</div><div class="banner">two</div>"#,
        );
        let page = Page::<LoginPage>::new().unwrap();

        let err = page.banner.is_visible(&session).unwrap_err();
        match err {
            PomError::Ambiguous { chain, count } => {
                assert_eq!(chain.to_string(), "Login page > Banner");
                assert_eq!(count, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(matches!(
            page.banner.find(&session),
            Err(PomError::Ambiguous { count: 2, .. })
        ));
    }

    #[test]
    fn test_context_is_restored_after_an_error_inside_a_frame() {
        let html = r#"
            <iframe class="login-service" srcdoc="
                <form class='login'><input class='username'><input class='username'></form>
            "></iframe>
        "#;
        let (driver, session) = TestHelper::session(html);
        let page = Page::<LoginPage>::new().unwrap();

        assert!(matches!(
            page.login_form.username_field.is_visible(&session),
            Err(PomError::Ambiguous { .. })
        ));
        assert!(driver.frame_path().is_empty());
        assert!(matches!(
            driver.events().last(),
            Some(DriverEvent::SwitchToParentFrame)
        ));
    }

    #[test]
    fn test_context_active_before_the_call_is_kept() {
        let (driver, session) = TestHelper::session(LOGIN_HTML);
        let page = Page::<LoginPage>::new().unwrap();
        let frame = page.login_service_iframe.find(&session).unwrap();
        driver.switch_to_frame(frame.element()).unwrap();

        assert!(page.banner.is_visible(&session).unwrap());
        assert_eq!(driver.frame_path(), vec![frame.element().clone()]);
    }

    #[test]
    fn test_collection_resolves_every_row_in_order() {
        let (_, session) = TestHelper::session(TABLE_HTML);
        let page = Page::<TablePage>::new().unwrap();

        let references = page.rows.references(&session).unwrap();
        assert_eq!(references.len(), 3);
        assert_eq!(references[1].label(), "Rows[1]");
        assert_eq!(references[1].chain().to_string(), "Table page > Rows[1]");
        assert_ne!(references[0], references[1]);
        assert_eq!(page.rows.count(&session).unwrap(), 3);
    }

    #[test]
    fn test_find_within_an_iframe_searches_its_document() {
        let (driver, session) = TestHelper::session(LOGIN_HTML);
        let page = Page::<LoginPage>::new().unwrap();

        let fields = page
            .login_service_iframe
            .find_within(&session, by_css(".username").as_ref())
            .unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].frames().len(), 1);
        assert_eq!(fields[0].frames()[0].label, "LoginService iframe");
        assert_eq!(
            fields[0].get_attribute(&session, "name").unwrap().as_deref(),
            Some("user")
        );

        let buttons = page
            .login_form
            .find_within(&session, by_css("button").as_ref())
            .unwrap();
        assert_eq!(buttons.len(), 1);
        assert_eq!(buttons[0].get_text(&session).unwrap(), "Sign in");
        assert!(driver.frame_path().is_empty());
    }

    #[test]
    fn test_empty_collection_is_absent() {
        let (_, session) = TestHelper::session("<table><caption>Team</caption></table>");
        let page = Page::<TablePage>::new().unwrap();

        assert_eq!(page.rows.count(&session).unwrap(), 0);
        assert!(!session.is_in_dom(&page.rows).unwrap());
        let visibility = session.visibility(&page.rows).unwrap();
        assert!(!visibility.visible);
        assert!(visibility.is_absent());
        assert_eq!(visibility.failing_step().unwrap().label, "Rows");
    }

    #[test]
    fn test_item_children_search_only_inside_that_item() {
        let (driver, session) = TestHelper::session(TABLE_HTML);
        let page = Page::<TablePage>::new().unwrap();
        let rows = page.rows.get(&session).unwrap();
        assert_eq!(rows.len(), 3);

        driver.clear_events();
        let scoped = rows[1].scope(&session);
        assert_eq!(rows[1].name.get_text(&scoped).unwrap(), "Bob");

        assert_eq!(
            TestHelper::searches(&driver),
            vec![(
                rows[1].reference().element().id.clone(),
                "css selector \"td.name\"".to_string()
            )]
        );
    }

    #[test]
    fn test_anchored_resolution_nests_through_two_collections() {
        let (_, session) = TestHelper::session(TABLE_HTML);
        let page = Page::<TablePage>::new().unwrap();
        let rows = page.rows.get(&session).unwrap();

        let row_scope = rows[2].scope(&session);
        let tags = rows[2].tags.get(&row_scope).unwrap();
        assert_eq!(tags.len(), 2);

        let tag_scope = tags[1].scope(&row_scope);
        assert_eq!(tags[1].text.get_text(&tag_scope).unwrap(), "ops");
        assert_eq!(session.anchors().len(), 0);
        assert_eq!(tag_scope.anchors().len(), 2);
    }

    #[test]
    fn test_anchor_from_another_collection_is_ignored() {
        let (_, session) = TestHelper::session(TABLE_HTML);
        let page = Page::<TablePage>::new().unwrap();
        let rows = page.rows.get(&session).unwrap();
        let scoped = rows[0].scope(&session);

        // The caption is not under the rows collection, so it resolves from the root.
        assert_eq!(page.caption.get_text(&scoped).unwrap(), "Team");
    }

    #[test]
    fn test_stale_anchor_reports_absent() {
        let (driver, session) = TestHelper::session(TABLE_HTML);
        let page = Page::<TablePage>::new().unwrap();
        let rows = page.rows.get(&session).unwrap();
        driver.load_html(TABLE_HTML);

        let scoped = rows[0].scope(&session);
        assert!(!rows[0].name.is_visible(&scoped).unwrap());
        assert!(!rows[0].reference().is_visible(&session).unwrap());
    }

    #[test]
    fn test_graphs_built_twice_resolve_independently() {
        let (_, session) = TestHelper::session(LOGIN_HTML);
        let first = GraphBuilder::build::<LoginPage>().unwrap();
        let second = GraphBuilder::build::<LoginPage>().unwrap();

        let a = first.model().login_form.find(&session).unwrap();
        let b = second.model().login_form.find(&session).unwrap();
        assert_eq!(a, b);
        assert!(!a.origin().unwrap().is_same(b.origin().unwrap()));
    }

    #[test]
    fn test_reference_find_within_uses_only_that_element() {
        let (_, session) = TestHelper::session(TABLE_HTML);
        let page = Page::<TablePage>::new().unwrap();
        let rows = page.rows.references(&session).unwrap();

        let cells = rows[0].find_within(&session, by_css("td").as_ref()).unwrap();
        assert_eq!(cells.len(), 2);
        assert_eq!(cells[0].get_text(&session).unwrap(), "Alice");
        assert!(cells[0].origin().is_none());
    }
}
