//! Kind catalog modules.
//!
//! Each sub-module contributes one group of kinds as static data. Modules are
//! listed in dependency order; see [`crate::KindRegistry::standard`] for the
//! assembly sequence.

pub mod structural;
pub mod denotational;
pub mod relational;
