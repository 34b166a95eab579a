//! Dialcode headless element tree
//!
//! A small, thread-safe stand-in for a browser DOM, providing exactly the
//! host primitives an overlay needs to track a third-party widget:
//!
//! - **Element tree**: tags, classes, attributes and text, addressed by [`NodeId`]
//! - **Selectors**: compound `tag.class[attr]` queries over a subtree
//! - **Mutation observers**: batched child-list / attribute / text notifications
//! - **Event listeners**: bubbling dispatch with removable handlers
//!
//! # Example
//!
//! ```rust
//! use dialcode_dom::{Document, ElementSpec, ObserveOptions, Selector};
//!
//! let doc = Document::new();
//! let container = doc.create_element("div");
//! doc.append_child(doc.root(), container).unwrap();
//!
//! let observer = doc
//!     .observe(container, ObserveOptions::structural(), |records| {
//!         println!("{} insertion batch(es)", records.len());
//!     })
//!     .unwrap();
//!
//! let list = doc.create_tree(&ElementSpec::new("ul").class("dropdown"));
//! doc.append_child(container, list).unwrap();
//! assert_eq!(doc.query_selector(container, &Selector::class("dropdown")), Some(list));
//!
//! doc.disconnect(observer);
//! ```

mod document;
mod error;
pub mod events;
mod mutation;
mod node;
mod selector;

pub use document::Document;
pub use error::{DomError, Result};
pub use events::{event_types, Event, EventHandler, EventType, ListenerId};
pub use mutation::{MutationCallback, MutationKind, MutationRecord, ObserveOptions, ObserverId};
pub use node::{ElementSpec, NodeId};
pub use selector::Selector;
