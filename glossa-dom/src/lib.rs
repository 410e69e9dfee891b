//! Live Document Tree for Glossa
//!
//! An arena-backed element tree with the operations a client-side localization
//! engine needs from its host page:
//!
//! - **Nodes**: elements with ordered attributes, text, and trusted markup
//! - **Queries**: document-order traversal, attribute and class lookups
//! - **Mutation observers**: synchronous child-list/attribute notifications
//! - **Events**: per-node listeners dispatched by name
//!
//! ```
//! use glossa_dom::{Document, MutationRecord, ObserveOptions};
//! use std::sync::Arc;
//!
//! let doc = Document::new();
//! let handle = doc.observe(
//!     doc.body(),
//!     ObserveOptions::subtree_child_list(),
//!     Arc::new(|records: &[MutationRecord], _doc: &Document| {
//!         assert!(records[0].has_added_nodes());
//!     }),
//! );
//! doc.append_child(doc.body(), doc.create_element("p")).unwrap();
//! handle.disconnect();
//! ```

mod document;
mod error;
mod node;
pub mod observer;

pub use document::{Document, Listener};
pub use error::DomError;
pub use node::{ElementData, Node, NodeData, NodeId};
pub use observer::{
    MutationKind, MutationObserver, MutationRecord, ObserveOptions, ObserverHandle, ObserverId,
};

/// Result type for document operations
pub type Result<T> = std::result::Result<T, DomError>;
