//! Small page models with matching HTML, shared by tests and demos.

use crate::errors::Result;
use crate::locators::by_css;
use crate::model::{Collection, Declarer, Element, IFrame, Model, Region};

/// Sign-in form served from a separate login service.
pub struct LoginForm {
    pub username_field: Element,
    pub password_field: Element,
    pub submit_button: Element,
}

impl Model for LoginForm {
    fn declare(d: &mut Declarer<'_>) -> Result<Self> {
        Ok(Self {
            username_field: d.element("Username field", by_css(".username"))?,
            password_field: d.element("Password field", by_css(".password"))?,
            submit_button: d.element("Submit button", by_css("button[type=submit]"))?,
        })
    }
}

/// A page whose login form lives inside an iframe. The form is declared on
/// the page but parented to the frame.
pub struct LoginPage {
    pub login_service_iframe: IFrame,
    pub login_form: Region<LoginForm>,
    pub banner: Element,
}

impl Model for LoginPage {
    fn label() -> String {
        "Login page".to_string()
    }

    fn declare(d: &mut Declarer<'_>) -> Result<Self> {
        let login_service_iframe = d.iframe::<()>("LoginService iframe", by_css(".login-service"))?;
        let login_form = d
            .node("Login form", by_css(".login"))
            .parent(&login_service_iframe)
            .region::<LoginForm>()?;
        let banner = d.element("Banner", by_css(".banner"))?;
        Ok(Self {
            login_service_iframe,
            login_form,
            banner,
        })
    }
}

pub struct Tag {
    pub text: Element,
}

impl Model for Tag {
    fn declare(d: &mut Declarer<'_>) -> Result<Self> {
        Ok(Self {
            text: d.element("Text", by_css("b"))?,
        })
    }
}

pub struct Row {
    pub name: Element,
    pub tags: Collection<Tag>,
}

impl Model for Row {
    fn declare(d: &mut Declarer<'_>) -> Result<Self> {
        Ok(Self {
            name: d.element("Name", by_css("td.name"))?,
            tags: d.collection("Tags", by_css("span.tag"))?,
        })
    }
}

pub struct TablePage {
    pub caption: Element,
    pub rows: Collection<Row>,
}

impl Model for TablePage {
    fn label() -> String {
        "Table page".to_string()
    }

    fn declare(d: &mut Declarer<'_>) -> Result<Self> {
        Ok(Self {
            caption: d.element("Caption", by_css("caption"))?,
            rows: d.collection("Rows", by_css("tr"))?,
        })
    }
}

pub struct SettingsPage {
    pub newsletter: Element,
    pub newsletter_label: Element,
    pub save_button: Element,
}

impl Model for SettingsPage {
    fn label() -> String {
        "Settings page".to_string()
    }

    fn declare(d: &mut Declarer<'_>) -> Result<Self> {
        Ok(Self {
            newsletter: d.element("Newsletter checkbox", by_css("#newsletter"))?,
            newsletter_label: d.element("Newsletter label", by_css(".newsletter-label"))?,
            save_button: d.element("Save button", by_css("button.save"))?,
        })
    }
}

pub const LOGIN_HTML: &str = r#"
<div class="banner">Welcome back</div>
<iframe class="login-service" srcdoc="
    <form class='login'>
        <input class='username' name='user'>
        <input class='password' type='password'>
        <button type='submit'>Sign in</button>
    </form>
"></iframe>
"#;

pub const HIDDEN_IFRAME_LOGIN_HTML: &str = r#"
<div class="banner">Welcome back</div>
<iframe class="login-service" style="display: none" srcdoc="
    <form class='login'>
        <input class='username' name='user'>
        <input class='password' type='password'>
        <button type='submit'>Sign in</button>
    </form>
"></iframe>
"#;

pub const TABLE_HTML: &str = r#"
<table>
    <caption>Team</caption>
    <tr><td class="name">Alice</td><td><span class="tag"><b>dev</b></span></td></tr>
    <tr><td class="name">Bob</td><td><span class="tag"><b>qa</b></span></td></tr>
    <tr>
        <td class="name">Carol</td>
        <td><span class="tag"><b>lead</b></span><span class="tag"><b>ops</b></span></td>
    </tr>
</table>
"#;

pub const SETTINGS_HTML: &str = r#"
<label class="newsletter-label" for="newsletter">Newsletter</label>
<input id="newsletter" type="checkbox" style="display:none">
<button class="save" disabled>Save</button>
"#;
