//! Catalog validators. Each returns a report and never fails outright.

pub mod collections;
pub mod lattice;
pub mod shapes;
