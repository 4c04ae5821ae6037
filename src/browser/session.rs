use crate::core::config::SessionConfig;
use crate::core::Driver;
use crate::errors::Result;
use crate::resolution::{enter_frames, FrameEntry, FrameGuard, Reference};
use crate::utils::FailureReport;
use std::fmt;
use std::rc::Rc;
use url::Url;
use uuid::Uuid;

/// A driver bound to the model engine.
///
/// Cloning is cheap and shares the driver. Anchors narrow resolution: a
/// session obtained from [`Session::within`] resolves nodes declared beneath
/// an anchor's collection from inside that anchor instead of from the root.
#[derive(Clone)]
pub struct Session {
    id: Uuid,
    driver: Rc<dyn Driver>,
    config: SessionConfig,
    anchors: Vec<Reference>,
}

impl Session {
    pub fn new(driver: impl Driver + 'static) -> Self {
        Self::with_config(driver, SessionConfig::default())
    }

    pub fn with_config(driver: impl Driver + 'static, config: SessionConfig) -> Self {
        Self::from_shared(Rc::new(driver), config)
    }

    pub fn from_shared(driver: Rc<dyn Driver>, config: SessionConfig) -> Self {
        let id = Uuid::new_v4();
        tracing::debug!(session = %id, base_url = ?config.base_url, "Created session");
        Self {
            id,
            driver,
            config,
            anchors: Vec::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn driver(&self) -> &dyn Driver {
        self.driver.as_ref()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Anchors in the order they were added, innermost last
    pub fn anchors(&self) -> &[Reference] {
        &self.anchors
    }

    /// A session that resolves children of `anchor`'s collection inside
    /// `anchor`. Anchors stack, so items of nested collections can be
    /// anchored in turn.
    pub fn within(&self, anchor: impl AsRef<Reference>) -> Session {
        let anchor = anchor.as_ref();
        tracing::trace!(session = %self.id, anchor = %anchor, "Anchoring session");
        let mut scoped = self.clone();
        scoped.anchors.push(anchor.clone());
        scoped
    }

    /// `url` joined onto the configured base URL. Absolute URLs pass through.
    pub fn resolve_url(&self, url: &str) -> Result<String> {
        match &self.config.base_url {
            Some(base) => Ok(Url::parse(base)?.join(url)?.to_string()),
            None => Ok(Url::parse(url)?.to_string()),
        }
    }

    pub fn navigate(&self, url: &str) -> Result<()> {
        let target = self.resolve_url(url)?;
        tracing::info!(session = %self.id, url = %target, "Navigating");
        self.driver.navigate(&target)
    }

    /// Serialized DOM of the active browsing context
    pub fn page_source(&self) -> Result<String> {
        self.driver.page_source()
    }

    /// Run `action` with `frames` active, then restore whatever context was
    /// active before.
    pub(crate) fn in_frames<T>(
        &self,
        frames: &[FrameEntry],
        action: impl FnOnce(&dyn Driver) -> Result<T>,
    ) -> Result<T> {
        let driver = self.driver();
        let _guard = FrameGuard::new(driver);
        enter_frames(driver, frames)?;
        action(driver)
    }

    /// Everything an external failure hook needs to persist.
    pub fn failure_report(&self) -> FailureReport {
        FailureReport::capture(self.driver())
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("config", &self.config)
            .field("anchors", &self.anchors)
            .finish_non_exhaustive()
    }
}
