//! Turns model nodes into live elements.
//!
//! Every operation walks the node's chain afresh against the driver. Frames
//! entered during a walk are always left before the operation returns.

mod engine;
mod frames;
mod interact;
mod reference;
mod wait;
mod walk;

pub use frames::FrameEntry;
pub use reference::Reference;

pub(crate) use frames::enter as enter_frames;
pub(crate) use frames::FrameGuard;
