use crate::core::dom::{By, ElementHandle, Scope};
use crate::errors::{PomError, Result};

/// The browsing-session boundary the model engine drives.
///
/// Calls are synchronous and assume exclusive access: the engine never runs
/// two resolutions against one driver at the same time and performs no
/// locking of its own. Implementations keep their mutable session state
/// (active frame, typed values) behind interior mutability.
pub trait Driver {
    /// Find elements matching `by`, either in the active context or inside
    /// an element of it. Results are in document order.
    fn find_elements(&self, scope: &Scope, by: &By) -> Result<Vec<ElementHandle>>;

    /// Make the content of `frame` the active browsing context
    fn switch_to_frame(&self, frame: &ElementHandle) -> Result<()>;

    /// Step one frame outwards
    fn switch_to_parent_frame(&self) -> Result<()>;

    /// Return to the top-level document
    fn switch_to_default_content(&self) -> Result<()>;

    /// Frames entered from the top-level document to reach the active context
    fn frame_path(&self) -> Vec<ElementHandle>;

    fn is_displayed(&self, element: &ElementHandle) -> Result<bool>;

    fn is_enabled(&self, element: &ElementHandle) -> Result<bool>;

    fn is_selected(&self, element: &ElementHandle) -> Result<bool>;

    fn text(&self, element: &ElementHandle) -> Result<String>;

    fn attribute(&self, element: &ElementHandle, name: &str) -> Result<Option<String>>;

    fn click(&self, element: &ElementHandle) -> Result<()>;

    fn clear(&self, element: &ElementHandle) -> Result<()>;

    fn send_keys(&self, element: &ElementHandle, keys: &str) -> Result<()>;

    /// Load `url` in the top-level document
    fn navigate(&self, url: &str) -> Result<()>;

    /// Serialized DOM of the active browsing context
    fn page_source(&self) -> Result<String>;

    /// PNG screenshot of the top-level document
    fn screenshot(&self) -> Result<Vec<u8>> {
        Err(PomError::Unsupported("screenshots".to_string()))
    }
}
