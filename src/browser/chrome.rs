use crate::core::config::BrowserConfig;
use crate::core::{By, Driver, ElementHandle, Scope};
use crate::errors::{PomError, Result};
use headless_chrome::protocol::cdp::Page::CaptureScreenshotFormatOption;
use headless_chrome::{Browser, LaunchOptions, Tab};
use serde::Deserialize;
use serde_json::{json, Value};
use std::cell::RefCell;
use std::ffi::OsStr;
use std::sync::Arc;
use std::time::Duration;

/// Shared helpers prepended to every script. Elements are registered on the
/// top-level window under an id scoped to the current document load, so
/// handles from before a navigation can never alias new elements.
const PRELUDE: &str = r#"
const pom = window.__pom || (window.__pom = {
    epoch: Math.random().toString(36).slice(2),
    next: 1,
    elements: {},
});
function handle(el) {
    if (!el.__pomId) {
        el.__pomId = pom.epoch + ':' + (pom.next++);
        pom.elements[el.__pomId] = el;
    }
    return { id: el.__pomId, tag_name: el.tagName.toLowerCase() };
}
function lookup(id) {
    const el = pom.elements[id];
    if (!el || !el.isConnected) throw new Error('stale element reference: ' + id);
    return el;
}
function activeDocument() {
    let doc = document;
    for (const id of frames) {
        doc = lookup(id).contentDocument;
        if (!doc) throw new Error('frame ' + id + ' has no document');
    }
    return doc;
}
function own(id) {
    const el = lookup(id);
    if (el.ownerDocument !== activeDocument()) throw new Error('stale element reference: ' + id);
    return el;
}
"#;

const FIND_ELEMENTS: &str = r#"
const doc = activeDocument();
const root = args.scope ? own(args.scope) : doc;
const found = [];
if (args.using === 'css selector') {
    found.push(...root.querySelectorAll(args.value));
} else {
    const snapshot = doc.evaluate(args.value, root, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null);
    for (let i = 0; i < snapshot.snapshotLength; i++) {
        const node = snapshot.snapshotItem(i);
        if (node.nodeType === Node.ELEMENT_NODE && node !== root) found.push(node);
    }
}
return found.map(handle);
"#;

const IS_DISPLAYED: &str = r#"
const el = own(args.id);
const view = el.ownerDocument.defaultView;
if (el.tagName.toLowerCase() === 'input' && el.type === 'hidden') return false;
for (let current = el; current; current = current.parentElement) {
    if (view.getComputedStyle(current).display === 'none') return false;
}
const style = view.getComputedStyle(el);
if (style.visibility === 'hidden' || style.visibility === 'collapse') return false;
return el.getClientRects().length > 0;
"#;

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    ok: Value,
    error: Option<String>,
}

/// Driver for a Chrome tab over the DevTools protocol.
///
/// Every primitive runs as a small script in the tab; the active frame path
/// is kept on this side and replayed through `contentDocument` per call.
pub struct ChromeDriver {
    _browser: Browser,
    tab: Arc<Tab>,
    frames: RefCell<Vec<ElementHandle>>,
}

impl ChromeDriver {
    pub fn launch(config: &BrowserConfig) -> Result<Self> {
        let window_size_arg = format!(
            "--window-size={},{}",
            config.viewport.width, config.viewport.height
        );

        let user_agent_arg = config
            .user_agent
            .as_ref()
            .map(|ua| format!("--user-agent={}", ua));

        let mut args = vec![
            OsStr::new("--no-sandbox"),
            OsStr::new("--disable-dev-shm-usage"),
            OsStr::new(&window_size_arg),
        ];

        if let Some(ref ua_arg) = user_agent_arg {
            args.push(OsStr::new(ua_arg));
        }

        if config.disable_images {
            args.push(OsStr::new("--blink-settings=imagesEnabled=false"));
        }

        for arg in &config.args {
            args.push(OsStr::new(arg));
        }

        let launch_options = LaunchOptions::default_builder()
            .headless(config.headless)
            .args(args)
            .build()
            .map_err(PomError::from_any_error)?;

        let browser = Browser::new(launch_options).map_err(PomError::from_any_error)?;
        let tab = browser.new_tab().map_err(PomError::from_any_error)?;
        tab.set_default_timeout(Duration::from_millis(config.timeout_ms));

        tracing::info!(headless = config.headless, "Launched Chrome");
        Ok(Self {
            _browser: browser,
            tab,
            frames: RefCell::new(Vec::new()),
        })
    }

    pub fn tab(&self) -> &Arc<Tab> {
        &self.tab
    }

    /// Run `body` as a function with `args` and the current frame path in
    /// scope, returning what it returns.
    fn call(&self, body: &str, args: Value) -> Result<Value> {
        let frames: Vec<String> = self
            .frames
            .borrow()
            .iter()
            .map(|frame| frame.id.clone())
            .collect();
        let script = format!(
            "(function() {{\nconst args = {args};\nconst frames = {frames};\n{PRELUDE}\ntry {{\n\
             const ok = (function() {{\n{body}\n}})();\n\
             return JSON.stringify({{ ok: ok === undefined ? null : ok }});\n\
             }} catch (e) {{\n\
             return JSON.stringify({{ error: String((e && e.message) || e) }});\n\
             }}\n}})()",
            args = args,
            frames = json!(frames),
        );

        let result = self
            .tab
            .evaluate(&script, false)
            .map_err(PomError::from_any_error)?;
        let raw = match result.value {
            Some(Value::String(raw)) => raw,
            other => {
                return Err(PomError::Browser(format!(
                    "unexpected script result: {:?}",
                    other
                )))
            }
        };

        let envelope: Envelope = serde_json::from_str(&raw)?;
        match envelope.error {
            Some(message) if message.starts_with("stale element reference") => {
                Err(PomError::StaleElement(message))
            }
            Some(message) => Err(PomError::Browser(message)),
            None => Ok(envelope.ok),
        }
    }

    fn call_on(&self, body: &str, element: &ElementHandle) -> Result<Value> {
        self.call(body, json!({ "id": element.id }))
    }

    fn call_bool(&self, body: &str, element: &ElementHandle) -> Result<bool> {
        Ok(self.call_on(body, element)?.as_bool().unwrap_or(false))
    }
}

impl Driver for ChromeDriver {
    fn find_elements(&self, scope: &Scope, by: &By) -> Result<Vec<ElementHandle>> {
        let found = self.call(
            FIND_ELEMENTS,
            json!({
                "scope": scope.element().map(|element| element.id.as_str()),
                "using": by.strategy(),
                "value": by.value(),
            }),
        )?;
        Ok(serde_json::from_value(found)?)
    }

    fn switch_to_frame(&self, frame: &ElementHandle) -> Result<()> {
        self.call_on(
            "if (!own(args.id).contentDocument) throw new Error('element is not a frame'); return null;",
            frame,
        )?;
        self.frames.borrow_mut().push(frame.clone());
        Ok(())
    }

    fn switch_to_parent_frame(&self) -> Result<()> {
        self.frames.borrow_mut().pop();
        Ok(())
    }

    fn switch_to_default_content(&self) -> Result<()> {
        self.frames.borrow_mut().clear();
        Ok(())
    }

    fn frame_path(&self) -> Vec<ElementHandle> {
        self.frames.borrow().clone()
    }

    fn is_displayed(&self, element: &ElementHandle) -> Result<bool> {
        self.call_bool(IS_DISPLAYED, element)
    }

    fn is_enabled(&self, element: &ElementHandle) -> Result<bool> {
        self.call_bool("return !own(args.id).disabled;", element)
    }

    fn is_selected(&self, element: &ElementHandle) -> Result<bool> {
        self.call_bool(
            "const el = own(args.id); return !!(el.checked || el.selected);",
            element,
        )
    }

    fn text(&self, element: &ElementHandle) -> Result<String> {
        let text = self.call_on("return (own(args.id).innerText || '').trim();", element)?;
        Ok(text.as_str().unwrap_or_default().to_string())
    }

    fn attribute(&self, element: &ElementHandle, name: &str) -> Result<Option<String>> {
        let value = self.call(
            "const el = own(args.id);\n\
             if (args.name === 'value' && 'value' in el) return String(el.value);\n\
             return el.getAttribute(args.name);",
            json!({ "id": element.id, "name": name }),
        )?;
        Ok(value.as_str().map(str::to_string))
    }

    fn click(&self, element: &ElementHandle) -> Result<()> {
        self.call_on(
            "const el = own(args.id); el.scrollIntoView({ block: 'center' }); el.click(); return null;",
            element,
        )?;
        Ok(())
    }

    fn clear(&self, element: &ElementHandle) -> Result<()> {
        self.call_on(
            "const el = own(args.id);\n\
             el.value = '';\n\
             el.dispatchEvent(new Event('input', { bubbles: true }));\n\
             el.dispatchEvent(new Event('change', { bubbles: true }));\n\
             return null;",
            element,
        )?;
        Ok(())
    }

    fn send_keys(&self, element: &ElementHandle, keys: &str) -> Result<()> {
        self.call_on("own(args.id).focus(); return null;", element)?;
        self.tab.type_str(keys).map_err(PomError::from_any_error)?;
        Ok(())
    }

    fn navigate(&self, url: &str) -> Result<()> {
        self.tab.navigate_to(url).map_err(PomError::from_any_error)?;
        self.tab
            .wait_until_navigated()
            .map_err(PomError::from_any_error)?;
        self.frames.borrow_mut().clear();
        Ok(())
    }

    fn page_source(&self) -> Result<String> {
        let source = self.call(
            "return activeDocument().documentElement.outerHTML;",
            Value::Null,
        )?;
        Ok(source.as_str().unwrap_or_default().to_string())
    }

    fn screenshot(&self) -> Result<Vec<u8>> {
        self.tab
            .capture_screenshot(CaptureScreenshotFormatOption::Png, None, None, true)
            .map_err(PomError::from_any_error)
    }
}
