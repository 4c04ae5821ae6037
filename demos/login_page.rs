//! Drives the login fixture through a static HTML driver, or through Chrome
//! when `POM_CHROME_URL` names a page with the same structure.

use browser_pom::core::config::SessionConfig;
use browser_pom::testing::fixtures::{LoginPage, TablePage, LOGIN_HTML, TABLE_HTML};
use browser_pom::{Container, HtmlDriver, Page, Session};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let driver = HtmlDriver::new()
        .with_page("http://demo.test/login", LOGIN_HTML)
        .with_page("http://demo.test/team", TABLE_HTML);
    let session = Session::with_config(
        driver,
        SessionConfig {
            base_url: Some("http://demo.test/".to_string()),
            ..Default::default()
        },
    );
    #[cfg(feature = "chrome")]
    let session = match std::env::var("POM_CHROME_URL") {
        Ok(url) => chrome_session(&url)?,
        Err(_) => session,
    };

    let login = Page::<LoginPage>::new()?.at("login");
    login.go_to(&session)?;

    let form = &login.login_form;
    form.username_field
        .wait_for_visible_within(&session, Duration::from_secs(2))?;
    form.username_field.set_text(&session, "Admin1")?;
    form.password_field.set_secret_text(&session, "correct horse")?;
    form.submit_button.click(&session)?;
    println!("Banner: {}", login.banner.get_text(&session)?);

    let team = Page::<TablePage>::new()?.at("team");
    team.go_to(&session)?;
    for row in team.rows.get(&session)? {
        let scoped = row.scope(&session);
        let tags: Vec<String> = row
            .tags
            .get(&scoped)?
            .iter()
            .map(|tag| tag.text.get_text(&tag.scope(&scoped)))
            .collect::<Result<_, _>>()?;
        println!("{}: {}", row.name.get_text(&scoped)?, tags.join(", "));
    }

    Ok(())
}

#[cfg(feature = "chrome")]
fn chrome_session(url: &str) -> Result<Session, Box<dyn std::error::Error>> {
    let config = browser_pom::Config::default();
    let driver = browser_pom::ChromeDriver::launch(&config.browser)?;
    Ok(Session::with_config(
        driver,
        SessionConfig {
            base_url: Some(url.to_string()),
            ..config.session
        },
    ))
}
