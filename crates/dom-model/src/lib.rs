//! In-process model of an observed document.
//!
//! The [`Document`] arena stands in for a live page: hosts mutate it, and
//! while observation is on every change to the connected tree queues a
//! [`MutationRecord`]. Around it sit the pieces that need the tree:
//! selectors, bounded serialization, the [`NodeRegistry`] and the
//! interactive element resolver.

pub mod builder;
pub mod errors;
pub mod model;
pub mod registry;
pub mod resolver;
pub mod selector;
pub mod serialize;

pub use builder::NodeSpec;
pub use errors::{DomError, DomResult};
pub use model::{Document, Element, MutationKind, MutationRecord, Node, NodeData, NodeKey};
pub use registry::{NodeId, NodeRegistry};
pub use resolver::{is_interactive, resolve_interactive, INTERACTIVE_TAGS};
pub use selector::{is_valid_selector, node_selector};
pub use serialize::{node_html, outer_html, trim_depth, visible_html, PLACEHOLDER};
