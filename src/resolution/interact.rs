use crate::browser::Session;
use crate::core::{Driver, ElementHandle, Scope};
use crate::errors::{PomError, Result};
use crate::model::{AsNode, ModelNode};
use crate::resolution::walk::{Outcome, Walk};
use std::sync::Arc;

impl Session {
    /// Resolve `node` to its element and run `action` on it before the
    /// walk's frames are left.
    ///
    /// With `require_display` the node and every ancestor must be
    /// displayed; otherwise existence is enough.
    fn act<T>(
        &self,
        node: &Arc<ModelNode>,
        require_display: bool,
        action: impl FnOnce(&dyn Driver, &ElementHandle) -> Result<T>,
    ) -> Result<T> {
        let mut walk = Walk::new(self.driver(), require_display);
        let outcome = walk.resolve(node, self.anchors())?;

        let element = match outcome {
            Outcome::Single(Scope::Element(element)) => element,
            Outcome::Blocked => {
                let reason = walk.into_visibility(&outcome);
                tracing::debug!(node = %node, %reason, "Interaction blocked");
                return Err(if reason.is_absent() {
                    PomError::NotFound {
                        chain: node.label_chain(),
                        reason,
                    }
                } else {
                    PomError::NotVisible {
                        chain: node.label_chain(),
                        reason,
                    }
                });
            }
            Outcome::Single(Scope::Root) | Outcome::Many(_) => {
                return Err(PomError::Unsupported(format!(
                    "{} does not resolve to a single element",
                    node
                )));
            }
        };

        action(walk.driver(), &element).map_err(|err| err.at(&node.label_chain()))
    }

    pub fn click<N: AsNode + ?Sized>(&self, node: &N) -> Result<()> {
        let node = node.node();
        tracing::info!(session = %self.id(), "Clicking on {}", node);
        self.act(node, true, |driver, element| driver.click(element))
    }

    pub fn clear_text<N: AsNode + ?Sized>(&self, node: &N) -> Result<()> {
        let node = node.node();
        tracing::info!(session = %self.id(), "Clearing text of {}", node);
        self.act(node, true, |driver, element| driver.clear(element))
    }

    pub fn send_keys<N: AsNode + ?Sized>(&self, node: &N, keys: &str) -> Result<()> {
        let node = node.node();
        tracing::info!(session = %self.id(), "Sending keys {:?} to {}", keys, node);
        self.act(node, true, |driver, element| driver.send_keys(element, keys))
    }

    /// Clear the element, then type `text` into it.
    pub fn set_text<N: AsNode + ?Sized>(&self, node: &N, text: &str) -> Result<()> {
        let node = node.node();
        tracing::info!(session = %self.id(), "Setting text of {} to {:?}", node, text);
        self.act(node, true, |driver, element| {
            driver.clear(element)?;
            driver.send_keys(element, text)
        })
    }

    pub fn set_secret_text<N: AsNode + ?Sized>(&self, node: &N, text: &str) -> Result<()> {
        let node = node.node();
        tracing::info!(session = %self.id(), "Setting secret text of {}", node);
        self.act(node, true, |driver, element| {
            driver.clear(element)?;
            driver.send_keys(element, text)
        })
    }

    pub fn get_text<N: AsNode + ?Sized>(&self, node: &N) -> Result<String> {
        let node = node.node();
        let text = self.act(node, true, |driver, element| driver.text(element))?;
        tracing::debug!(session = %self.id(), node = %node, %text, "Read text");
        Ok(text)
    }

    pub fn get_attribute<N: AsNode + ?Sized>(&self, node: &N, name: &str) -> Result<Option<String>> {
        let node = node.node();
        tracing::debug!(session = %self.id(), node = %node, attribute = name, "Reading attribute");
        self.act(node, true, |driver, element| driver.attribute(element, name))
    }

    /// Existence is enough; hidden checkboxes behind styled labels are common.
    pub fn is_enabled<N: AsNode + ?Sized>(&self, node: &N) -> Result<bool> {
        self.act(node.node(), false, |driver, element| driver.is_enabled(element))
    }

    pub fn is_selected<N: AsNode + ?Sized>(&self, node: &N) -> Result<bool> {
        self.act(node.node(), false, |driver, element| driver.is_selected(element))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::{DriverEvent, HtmlDriver};
    use crate::core::By;
    use crate::model::{Container, Page};
    use crate::testing::fixtures::{
        LoginPage, SettingsPage, HIDDEN_IFRAME_LOGIN_HTML, LOGIN_HTML, SETTINGS_HTML,
    };
    use crate::testing::TestHelper;

    fn typed_username(driver: &HtmlDriver) -> Option<String> {
        let frame = driver
            .find_elements(&Scope::Root, &By::css(".login-service"))
            .unwrap()
            .remove(0);
        driver.switch_to_frame(&frame).unwrap();
        let field = driver
            .find_elements(&Scope::Root, &By::css(".login .username"))
            .unwrap()
            .remove(0);
        let value = driver.attribute(&field, "value").unwrap();
        driver.switch_to_default_content().unwrap();
        value
    }

    #[test]
    fn test_set_text_types_into_the_nested_field() {
        let (driver, session) = TestHelper::session(LOGIN_HTML);
        let page = Page::<LoginPage>::new().unwrap();

        page.login_form.username_field.set_text(&session, "Admin1").unwrap();
        assert!(driver.frame_path().is_empty());
        assert_eq!(typed_username(&driver).as_deref(), Some("Admin1"));

        page.login_form.username_field.send_keys(&session, "23").unwrap();
        assert_eq!(typed_username(&driver).as_deref(), Some("Admin123"));
    }

    #[test]
    fn test_interaction_behind_hidden_iframe_is_not_visible() {
        let (driver, session) = TestHelper::session(HIDDEN_IFRAME_LOGIN_HTML);
        let page = Page::<LoginPage>::new().unwrap();

        let err = page.login_form.submit_button.click(&session).unwrap_err();
        assert!(matches!(err, PomError::NotVisible { .. }));
        assert_eq!(
            err.to_string(),
            "Login page > LoginService iframe > Login form > Submit button: not visible \
             (parent 'LoginService iframe' not displayed)"
        );
        assert!(!driver
            .events()
            .iter()
            .any(|event| matches!(event, DriverEvent::Click { .. })));
    }

    #[test]
    fn test_interaction_with_missing_node_is_not_found() {
        let (_, session) = TestHelper::session("<main></main>");
        let page = Page::<LoginPage>::new().unwrap();

        let err = page.banner.get_text(&session).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Login page > Banner: not found (does not exist)"
        );
    }

    #[test]
    fn test_get_text_and_attribute() {
        let (_, session) = TestHelper::session(LOGIN_HTML);
        let page = Page::<LoginPage>::new().unwrap();

        assert_eq!(page.banner.get_text(&session).unwrap(), "Welcome back");
        assert_eq!(
            page.login_form
                .password_field
                .get_attribute(&session, "type")
                .unwrap()
                .as_deref(),
            Some("password")
        );
        assert_eq!(
            page.banner.get_attribute(&session, "data-missing").unwrap(),
            None
        );
    }

    #[test]
    fn test_checkbox_state_ignores_display() {
        let (_, session) = TestHelper::session(SETTINGS_HTML);
        let page = Page::<SettingsPage>::new().unwrap();

        assert!(!page.newsletter.is_selected(&session).unwrap());
        assert!(!page.newsletter.is_visible(&session).unwrap());
        page.newsletter_label.click(&session).unwrap();
        assert!(page.newsletter.is_selected(&session).unwrap());
        assert!(!page.save_button.is_enabled(&session).unwrap());
        assert!(matches!(
            page.newsletter.click(&session),
            Err(PomError::NotVisible { .. })
        ));
    }

    #[test]
    fn test_secret_text_is_typed() {
        let (driver, session) = TestHelper::session(LOGIN_HTML);
        let page = Page::<LoginPage>::new().unwrap();

        page.login_form
            .password_field
            .set_secret_text(&session, "hunter2")
            .unwrap();
        let typed: Vec<String> = driver
            .events()
            .into_iter()
            .filter_map(|event| match event {
                DriverEvent::SendKeys { keys, .. } => Some(keys),
                _ => None,
            })
            .collect();
        assert_eq!(typed, vec!["hunter2".to_string()]);
    }
}
