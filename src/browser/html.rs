use crate::core::{By, Driver, ElementHandle, Scope};
use crate::errors::{PomError, Result};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::LazyLock;
use url::Url;

static HIDDEN_STYLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(display\s*:\s*none|visibility\s*:\s*hidden)").expect("hidden style pattern")
});

/// Elements that never render, whatever their styling.
const NON_RENDERED: &[&str] = &[
    "head", "script", "style", "template", "noscript", "title", "meta", "link",
];

/// A driver call recorded by [`HtmlDriver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverEvent {
    FindElements {
        /// `root`, or the id of the element searched within
        scope: String,
        by: String,
        matched: usize,
    },
    SwitchToFrame {
        frame: String,
    },
    SwitchToParentFrame,
    SwitchToDefaultContent,
    Click {
        element: String,
    },
    Clear {
        element: String,
    },
    SendKeys {
        element: String,
        keys: String,
    },
    Navigate {
        url: String,
    },
}

impl DriverEvent {
    /// The event as it may appear in logs: typed keys are masked.
    pub fn redacted(&self) -> DriverEvent {
        match self {
            DriverEvent::SendKeys { element, keys } => DriverEvent::SendKeys {
                element: element.clone(),
                keys: "*".repeat(keys.chars().count().min(8)),
            },
            other => other.clone(),
        }
    }
}

/// Driver over static HTML, parsed with `scraper`.
///
/// Each `<iframe>` is its own browsing context: its document comes from
/// `srcdoc`, or from `src` when that names a registered page, and its
/// elements can only be used while that frame is active. Clicks, typed
/// values and checkbox state are tracked in memory, and every call is
/// recorded so tests can assert on exactly what was searched and where.
///
/// Clones share state, so a test can keep one while a [`Session`] owns
/// another.
///
/// [`Session`]: crate::browser::Session
#[derive(Clone, Default)]
pub struct HtmlDriver {
    state: Rc<State>,
}

#[derive(Default)]
struct State {
    generation: Cell<u64>,
    /// Index 0 is the top-level document; frames are loaded on first entry.
    documents: RefCell<Vec<Html>>,
    frame_documents: RefCell<HashMap<String, usize>>,
    frames: RefCell<Vec<ElementHandle>>,
    pages: RefCell<HashMap<String, String>>,
    values: RefCell<HashMap<String, String>>,
    selected: RefCell<HashMap<String, bool>>,
    events: RefCell<Vec<DriverEvent>>,
    current_url: RefCell<Option<String>>,
}

impl HtmlDriver {
    /// An empty top-level document.
    pub fn new() -> Self {
        let driver = Self::default();
        driver.load_html("");
        driver
    }

    pub fn from_html(html: &str) -> Self {
        let driver = Self::default();
        driver.load_html(html);
        driver
    }

    /// Register `html` as the page served at `url`.
    pub fn with_page(self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.state.pages.borrow_mut().insert(url.into(), html.into());
        self
    }

    /// Replace the top-level document. Every handle issued before goes stale.
    pub fn load_html(&self, html: &str) {
        let state = &self.state;
        state.generation.set(state.generation.get() + 1);
        *state.documents.borrow_mut() = vec![Html::parse_document(html)];
        state.frame_documents.borrow_mut().clear();
        state.frames.borrow_mut().clear();
        state.values.borrow_mut().clear();
        state.selected.borrow_mut().clear();
    }

    pub fn events(&self) -> Vec<DriverEvent> {
        self.state.events.borrow().clone()
    }

    pub fn clear_events(&self) {
        self.state.events.borrow_mut().clear();
    }

    pub fn current_url(&self) -> Option<String> {
        self.state.current_url.borrow().clone()
    }

    fn record(&self, event: DriverEvent) {
        tracing::trace!(event = ?event.redacted(), "Html driver call");
        self.state.events.borrow_mut().push(event);
    }

    fn active_document(&self) -> usize {
        match self.state.frames.borrow().last() {
            Some(frame) => self
                .state
                .frame_documents
                .borrow()
                .get(&frame.id)
                .copied()
                .unwrap_or(0),
            None => 0,
        }
    }

    fn handle(&self, document: usize, element: ElementRef<'_>) -> ElementHandle {
        ElementHandle::new(
            format!(
                "{}/{}/{}",
                self.state.generation.get(),
                document,
                path_of(element)
            ),
            element.value().name(),
        )
    }

    /// Tree path of a handle issued for the active document.
    fn locate(&self, handle: &ElementHandle) -> Result<String> {
        let stale = || PomError::StaleElement(handle.id.clone());
        let mut parts = handle.id.splitn(3, '/');
        let generation: u64 = parts.next().and_then(|p| p.parse().ok()).ok_or_else(stale)?;
        let document: usize = parts.next().and_then(|p| p.parse().ok()).ok_or_else(stale)?;
        let path = parts.next().ok_or_else(stale)?;

        if generation != self.state.generation.get() || document != self.active_document() {
            return Err(stale());
        }
        Ok(path.to_string())
    }

    fn with_element<T>(
        &self,
        handle: &ElementHandle,
        action: impl FnOnce(ElementRef<'_>) -> Result<T>,
    ) -> Result<T> {
        let path = self.locate(handle)?;
        let documents = self.state.documents.borrow();
        let element = documents
            .get(self.active_document())
            .and_then(|html| element_at(html, &path))
            .ok_or_else(|| PomError::StaleElement(handle.id.clone()))?;
        action(element)
    }

    fn frame_source(&self, element: ElementRef<'_>) -> Option<String> {
        if let Some(srcdoc) = element.value().attr("srcdoc") {
            return Some(srcdoc.to_string());
        }
        let src = element.value().attr("src")?;
        let pages = self.state.pages.borrow();
        if let Some(html) = pages.get(src) {
            return Some(html.clone());
        }
        let base = self.state.current_url.borrow();
        let joined = Url::parse(base.as_deref()?).ok()?.join(src).ok()?;
        pages.get(joined.as_str()).cloned()
    }

    fn set_selected(&self, handle: &ElementHandle, element: ElementRef<'_>, toggle: bool) {
        let mut selected = self.state.selected.borrow_mut();
        let current = selected
            .get(&handle.id)
            .copied()
            .unwrap_or_else(|| initially_selected(element));
        selected.insert(handle.id.clone(), if toggle { !current } else { true });
    }
}

impl Driver for HtmlDriver {
    fn find_elements(&self, scope: &Scope, by: &By) -> Result<Vec<ElementHandle>> {
        let css = match by {
            By::Css(css) => css,
            By::XPath(_) => {
                return Err(PomError::Unsupported(format!(
                    "{} locators in the static HTML driver",
                    by.strategy()
                )))
            }
        };
        let selector = Selector::parse(css)
            .map_err(|err| PomError::Browser(format!("invalid selector {:?}: {:?}", css, err)))?;

        let active = self.active_document();
        let found: Vec<ElementHandle> = match scope {
            Scope::Root => {
                let documents = self.state.documents.borrow();
                match documents.get(active) {
                    Some(html) => html
                        .select(&selector)
                        .map(|element| self.handle(active, element))
                        .collect(),
                    None => Vec::new(),
                }
            }
            Scope::Element(handle) => self.with_element(handle, |within| {
                Ok(within
                    .select(&selector)
                    .filter(|element| *element != within)
                    .map(|element| self.handle(active, element))
                    .collect())
            })?,
        };

        self.record(DriverEvent::FindElements {
            scope: scope
                .element()
                .map(|element| element.id.clone())
                .unwrap_or_else(|| "root".to_string()),
            by: by.to_string(),
            matched: found.len(),
        });
        Ok(found)
    }

    fn switch_to_frame(&self, frame: &ElementHandle) -> Result<()> {
        let source = self.with_element(frame, |element| {
            if !matches!(element.value().name(), "iframe" | "frame") {
                return Err(PomError::Browser(format!("{} is not a frame", frame)));
            }
            Ok(self.frame_source(element).unwrap_or_default())
        })?;

        let known = self.state.frame_documents.borrow().get(&frame.id).copied();
        if known.is_none() {
            let mut documents = self.state.documents.borrow_mut();
            documents.push(Html::parse_document(&source));
            self.state
                .frame_documents
                .borrow_mut()
                .insert(frame.id.clone(), documents.len() - 1);
        }

        self.state.frames.borrow_mut().push(frame.clone());
        self.record(DriverEvent::SwitchToFrame {
            frame: frame.id.clone(),
        });
        Ok(())
    }

    fn switch_to_parent_frame(&self) -> Result<()> {
        self.state.frames.borrow_mut().pop();
        self.record(DriverEvent::SwitchToParentFrame);
        Ok(())
    }

    fn switch_to_default_content(&self) -> Result<()> {
        self.state.frames.borrow_mut().clear();
        self.record(DriverEvent::SwitchToDefaultContent);
        Ok(())
    }

    fn frame_path(&self) -> Vec<ElementHandle> {
        self.state.frames.borrow().clone()
    }

    fn is_displayed(&self, element: &ElementHandle) -> Result<bool> {
        self.with_element(element, |element| Ok(is_rendered(element)))
    }

    fn is_enabled(&self, element: &ElementHandle) -> Result<bool> {
        self.with_element(element, |element| {
            Ok(element.value().attr("disabled").is_none())
        })
    }

    fn is_selected(&self, handle: &ElementHandle) -> Result<bool> {
        self.with_element(handle, |element| {
            Ok(self
                .state
                .selected
                .borrow()
                .get(&handle.id)
                .copied()
                .unwrap_or_else(|| initially_selected(element)))
        })
    }

    fn text(&self, element: &ElementHandle) -> Result<String> {
        self.with_element(element, |element| {
            let text: String = element.text().collect();
            Ok(text.split_whitespace().collect::<Vec<_>>().join(" "))
        })
    }

    fn attribute(&self, handle: &ElementHandle, name: &str) -> Result<Option<String>> {
        self.with_element(handle, |element| {
            if name == "value" {
                if let Some(value) = self.state.values.borrow().get(&handle.id) {
                    return Ok(Some(value.clone()));
                }
            }
            Ok(element.value().attr(name).map(str::to_string))
        })
    }

    fn click(&self, handle: &ElementHandle) -> Result<()> {
        let label_target = self.with_element(handle, |element| {
            let value = element.value();
            match (value.name(), value.attr("type")) {
                ("input", Some("checkbox")) => self.set_selected(handle, element, true),
                ("input", Some("radio")) | ("option", _) => {
                    self.set_selected(handle, element, false)
                }
                _ => {}
            }
            Ok(if value.name() == "label" {
                value.attr("for").map(str::to_string)
            } else {
                None
            })
        })?;
        self.record(DriverEvent::Click {
            element: handle.id.clone(),
        });

        // A label forwards the click to the control it names.
        if let Some(target) = label_target {
            let by = By::css(format!("[id=\"{}\"]", target));
            if let Some(control) = self.find_elements(&Scope::Root, &by)?.into_iter().next() {
                self.click(&control)?;
            }
        }
        Ok(())
    }

    fn clear(&self, element: &ElementHandle) -> Result<()> {
        self.with_element(element, |_| Ok(()))?;
        self.state
            .values
            .borrow_mut()
            .insert(element.id.clone(), String::new());
        self.record(DriverEvent::Clear {
            element: element.id.clone(),
        });
        Ok(())
    }

    fn send_keys(&self, handle: &ElementHandle, keys: &str) -> Result<()> {
        let initial = self.with_element(handle, |element| {
            Ok(element.value().attr("value").unwrap_or_default().to_string())
        })?;
        self.state
            .values
            .borrow_mut()
            .entry(handle.id.clone())
            .or_insert(initial)
            .push_str(keys);
        self.record(DriverEvent::SendKeys {
            element: handle.id.clone(),
            keys: keys.to_string(),
        });
        Ok(())
    }

    fn navigate(&self, url: &str) -> Result<()> {
        let html = self
            .state
            .pages
            .borrow()
            .get(url)
            .cloned()
            .ok_or_else(|| PomError::Browser(format!("no page registered at {}", url)))?;
        self.load_html(&html);
        *self.state.current_url.borrow_mut() = Some(url.to_string());
        self.record(DriverEvent::Navigate {
            url: url.to_string(),
        });
        Ok(())
    }

    fn page_source(&self) -> Result<String> {
        let documents = self.state.documents.borrow();
        Ok(documents
            .get(self.active_document())
            .map(Html::html)
            .unwrap_or_default())
    }
}

/// Child indices from the document root down to `element`, dot-joined.
fn path_of(element: ElementRef<'_>) -> String {
    let mut indices = Vec::new();
    let mut node = *element;
    while let Some(parent) = node.parent() {
        indices.push(node.prev_siblings().count().to_string());
        node = parent;
    }
    indices.reverse();
    indices.join(".")
}

fn element_at<'a>(html: &'a Html, path: &str) -> Option<ElementRef<'a>> {
    let mut node = html.tree.root();
    for part in path.split('.').filter(|part| !part.is_empty()) {
        node = node.children().nth(part.parse().ok()?)?;
    }
    ElementRef::wrap(node)
}

fn is_rendered(element: ElementRef<'_>) -> bool {
    let value = element.value();
    if value.name() == "input" && value.attr("type") == Some("hidden") {
        return false;
    }
    std::iter::successors(Some(element), |current| {
        current.parent().and_then(ElementRef::wrap)
    })
    .all(|current| {
        let value = current.value();
        value.attr("hidden").is_none()
            && !NON_RENDERED.contains(&value.name())
            && !value
                .attr("style")
                .map(|style| HIDDEN_STYLE.is_match(style))
                .unwrap_or(false)
    })
}

fn initially_selected(element: ElementRef<'_>) -> bool {
    let value = element.value();
    match value.name() {
        "option" => value.attr("selected").is_some(),
        _ => value.attr("checked").is_some(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logged_events_mask_typed_keys() {
        let event = DriverEvent::SendKeys {
            element: "1/0/3".to_string(),
            keys: "hunter2-secret".to_string(),
        };
        let logged = format!("{:?}", event.redacted());
        assert!(!logged.contains("hunter2"), "{logged}");
        assert!(logged.contains("1/0/3"));

        let click = DriverEvent::Click {
            element: "1/0/3".to_string(),
        };
        assert_eq!(click.redacted(), click);
    }

    const PAGE: &str = r#"
        <div class="card" style="display: none"><span class="inner">hidden</span></div>
        <p class="note" hidden>also hidden</p>
        <input class="token" type="hidden" value="abc">
        <input class="name" value="Ada">
        <input class="agree" type="checkbox">
        <label class="agree-label" for="tos">Terms</label>
        <input id="tos" type="checkbox" checked>
        <button class="save" disabled>Save</button>
        <iframe class="frame" srcdoc="<p class='inside'>framed <b>text</b></p>"></iframe>
    "#;

    fn one(driver: &HtmlDriver, css: &str) -> ElementHandle {
        let mut found = driver.find_elements(&Scope::Root, &By::css(css)).unwrap();
        assert_eq!(found.len(), 1, "expected one match for {css}");
        found.remove(0)
    }

    #[test]
    fn test_handles_are_stable_across_searches() {
        let driver = HtmlDriver::from_html(PAGE);
        assert_eq!(one(&driver, ".name"), one(&driver, "input.name"));
        assert_eq!(one(&driver, ".name").tag_name, "input");
    }

    #[test]
    fn test_scoped_search_stays_inside_the_scope() {
        let driver = HtmlDriver::from_html("<div class='a'><div class='a'><i></i></div></div><i></i>");
        let outer = driver
            .find_elements(&Scope::Root, &By::css("div.a"))
            .unwrap()
            .remove(0);
        let nested = driver
            .find_elements(&Scope::Element(outer.clone()), &By::css("div.a"))
            .unwrap();
        assert_eq!(nested.len(), 1);
        assert_ne!(nested[0], outer);
        let icons = driver.find_elements(&Scope::Element(outer), &By::css("i")).unwrap();
        assert_eq!(icons.len(), 1);
    }

    #[test]
    fn test_displayed_predicate() {
        let driver = HtmlDriver::from_html(PAGE);
        assert!(!driver.is_displayed(&one(&driver, ".inner")).unwrap());
        assert!(!driver.is_displayed(&one(&driver, ".note")).unwrap());
        assert!(!driver.is_displayed(&one(&driver, ".token")).unwrap());
        assert!(driver.is_displayed(&one(&driver, ".name")).unwrap());
    }

    #[test]
    fn test_frames_are_separate_contexts() {
        let driver = HtmlDriver::from_html(PAGE);
        assert!(driver
            .find_elements(&Scope::Root, &By::css(".inside"))
            .unwrap()
            .is_empty());

        let frame = one(&driver, ".frame");
        driver.switch_to_frame(&frame).unwrap();
        let inside = one(&driver, ".inside");
        assert_eq!(driver.text(&inside).unwrap(), "framed text");

        // Top-level elements cannot be used from inside the frame.
        assert!(matches!(
            driver.is_displayed(&frame),
            Err(PomError::StaleElement(_))
        ));

        driver.switch_to_parent_frame().unwrap();
        assert!(matches!(
            driver.text(&inside),
            Err(PomError::StaleElement(_))
        ));
        assert!(driver.is_displayed(&frame).unwrap());
    }

    #[test]
    fn test_typed_values_and_clear() {
        let driver = HtmlDriver::from_html(PAGE);
        let name = one(&driver, ".name");
        driver.send_keys(&name, " Lovelace").unwrap();
        assert_eq!(
            driver.attribute(&name, "value").unwrap().as_deref(),
            Some("Ada Lovelace")
        );
        driver.clear(&name).unwrap();
        driver.send_keys(&name, "Grace").unwrap();
        assert_eq!(driver.attribute(&name, "value").unwrap().as_deref(), Some("Grace"));
    }

    #[test]
    fn test_checkboxes_labels_and_disabled() {
        let driver = HtmlDriver::from_html(PAGE);
        let agree = one(&driver, ".agree");
        assert!(!driver.is_selected(&agree).unwrap());
        driver.click(&agree).unwrap();
        assert!(driver.is_selected(&agree).unwrap());

        let tos = one(&driver, "#tos");
        assert!(driver.is_selected(&tos).unwrap());
        driver.click(&one(&driver, ".agree-label")).unwrap();
        assert!(!driver.is_selected(&tos).unwrap());

        assert!(!driver.is_enabled(&one(&driver, ".save")).unwrap());
        assert!(driver.is_enabled(&agree).unwrap());
    }

    #[test]
    fn test_reload_makes_handles_stale() {
        let driver = HtmlDriver::from_html(PAGE);
        let name = one(&driver, ".name");
        driver.load_html(PAGE);
        assert!(driver.text(&name).unwrap_err().is_stale());
    }

    #[test]
    fn test_xpath_is_unsupported() {
        let driver = HtmlDriver::from_html(PAGE);
        assert!(matches!(
            driver.find_elements(&Scope::Root, &By::xpath("//p")),
            Err(PomError::Unsupported(_))
        ));
    }

    #[test]
    fn test_navigate_to_registered_pages_only() {
        let driver = HtmlDriver::new().with_page("http://app.test/", "<h1>Home</h1>");
        driver.navigate("http://app.test/").unwrap();
        assert_eq!(driver.text(&one(&driver, "h1")).unwrap(), "Home");
        assert!(driver.navigate("http://app.test/missing").is_err());
        assert_eq!(driver.current_url().as_deref(), Some("http://app.test/"));
    }

    #[test]
    fn test_frame_src_loads_registered_page() {
        let driver = HtmlDriver::new()
            .with_page("http://app.test/", r#"<iframe src="widget"></iframe>"#)
            .with_page("http://app.test/widget", "<em>widget</em>");
        driver.navigate("http://app.test/").unwrap();
        driver.switch_to_frame(&one(&driver, "iframe")).unwrap();
        assert_eq!(driver.text(&one(&driver, "em")).unwrap(), "widget");
        assert!(driver.page_source().unwrap().contains("<em>widget</em>"));
    }
}
