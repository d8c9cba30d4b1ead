//! Identity-stable, typed facade over knowledge-base terms.
//!
//! `kbfacade` maps opaque server-side terms onto [`FacadeObject`]s. It
//! guarantees that repeated requests for the same term return the same
//! object, that every object carries the tightest kind the knowledge base
//! supports, and that composite expressions are immutable
//! [`FormulaTree`]s whose leaves are primitives or canonical objects.
//!
//! # Entry Point
//!
//! Everything starts from a [`Factory`] wrapping a [`KnowledgeBase`]
//! collaborator:
//!
//! ```ignore
//! use std::sync::Arc;
//! use kbfacade::{Factory, Kind};
//!
//! let factory = Factory::new(Arc::new(my_kb));
//! let dog = factory.get("Dog", Kind::Collection)?;
//! assert!(Arc::ptr_eq(&dog, &factory.get("#$Dog", Kind::Term)?));
//! ```
//!
//! # Modules
//!
//! - [`term`]: opaque term references and primitive values
//! - [`object`]: facade objects and their validity flag
//! - [`resolver`]: kind resolution against the classification oracle
//! - [`cache`]: the multi-keyed identity cache
//! - [`factory`]: lookup, find-or-create, invalidation
//! - [`formula`]: formula trees, positional addressing, substitution
//! - [`convert`]: host arguments and values, formula construction
//! - [`arity`]: relation arity and argument validation
//! - [`render`]: s-expression and JSON renderings

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    clippy::missing_errors_doc
)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

pub mod arity;
pub mod backend;
pub mod cache;
pub mod capability;
pub mod config;
pub mod convert;
pub mod error;
pub mod factory;
pub mod formula;
pub mod object;
pub mod render;
pub mod resolver;
pub mod term;

pub use arity::{ArityDescriptor, Nullable};
pub use backend::{ArityRange, KnowledgeBase};
pub use cache::{CacheKey, IdentityCache};
pub use capability::{HasArity, HasComments, HasQuotedIsa, RelationView, TermView};
pub use config::{FactoryConfig, KeyConfig, LogConfig, Vocabulary};
pub use convert::{Arg, HostValue};
pub use error::{ArityError, BackendError, BoxError, ConfigError, FacadeError, Result};
pub use factory::{Denotation, Factory, KbStatus, Lookup};
pub use formula::{ArgPath, CollectionShape, FormulaNode, FormulaTree, Leaf, Substitution};
pub use kbf_kinds::{Kind, KindRegistry, TermShape};
pub use object::FacadeObject;
pub use resolver::TypeResolver;
pub use term::{Primitive, RawArg, TermData, TermRef};
