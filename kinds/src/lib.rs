//! Facade kind lattice encoded as typed Rust data.
//!
//! The `kbf-kinds` crate provides the lattice of facade kinds that knowledge-base
//! objects are tagged with, the structural term shapes they wrap, and an
//! immutable [`KindRegistry`] answering lattice queries.
//!
//! # Entry Point
//!
//! ```
//! use kbf_kinds::{Kind, KindRegistry};
//!
//! let registry = KindRegistry::standard();
//! assert!(registry.is_subkind(Kind::Predicate, Kind::Relation));
//! assert_eq!(registry.kind_for_collection("Collection"), Some(Kind::Collection));
//! ```

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    clippy::missing_errors_doc
)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

pub mod catalog;
pub mod model;
pub mod registry;

pub use model::{CatalogModule, Kind, KindDef, TermShape, UnknownKind};
pub use registry::KindRegistry;
