//! The XPath/XQuery Data Model (XDM): a seven-kind node abstraction laid
//! over a host XML tree.
//!
//! This crate does not parse XML. It exposes a small capability trait
//! (`host::HostElement` / `host::HostDocument`) that any host tree can
//! implement, and builds an immutable, arena-backed node tree from it
//! (`build::build_node_tree` and friends). The rest of the crate is axis
//! traversal (`axis`) and document-order bookkeeping (`arena`).

pub mod arena;
pub mod axis;
pub mod build;
pub mod error;
pub mod host;
pub mod schema;
pub mod simple;

pub use arena::{NodeData, NodeId, NodeKind, QName, Tree, TypedValue};
pub use error::TreeError;
pub use host::{HostAttr, HostChild, HostDocument, HostElement, HostMisc, LazyHostElement};
pub use schema::SchemaProxy;
