//! Text and JSON renderings of terms and formula trees.
//!
//! - [`sexpr`]: the canonical s-expression form, also used as a cache key.
//! - [`json`]: `serde_json` values for tooling and the demo binaries.

pub mod json;
pub mod sexpr;
