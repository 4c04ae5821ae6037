pub mod builder;
pub mod components;
pub mod node;
pub mod page;

pub use builder::{Blueprint, Declaration, Declarer, GraphBuilder, Model, ModelGraph, TopologyEntry};
pub use components::{AsNode, Collection, Container, Element, IFrame, Item, Region};
pub use node::{ModelNode, NodeKind};
pub use page::Page;
