//! Conformance suite for facade kind catalogs.
//!
//! [`KindRegistry::from_modules`] accepts any catalog and keeps its queries
//! total, so a malformed catalog does not fail loudly on its own. This crate
//! checks the properties the resolver and the identity cache rely on and
//! reports every violation at once.
//!
//! # Conformance Scope
//!
//! | Area | Requirement |
//! |------|-------------|
//! | Lattice | parents registered, acyclic, rooted at `Object`, one definition per kind |
//! | Documentation | every kind has a label and comment (warning only) |
//! | Collections | unique names, every non-structural kind below the root is classifiable |
//! | Shapes | non-empty, inherited from parents, one tightest structural kind per shape |
//!
//! # Entry Point
//!
//! ```
//! use kbf_conformance::validate;
//! use kbf_kinds::KindRegistry;
//!
//! let report = validate(&KindRegistry::standard());
//! assert!(report.all_passed());
//! ```

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    clippy::missing_errors_doc
)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

pub mod report;
pub mod validators;

use kbf_kinds::KindRegistry;

pub use report::{ConformanceReport, Severity, TestResult};

/// Runs every validator against `registry` and returns the aggregated report.
///
/// Validators are run in this order:
/// 1. Lattice structure (parents, cycles, root, duplicates, documentation)
/// 2. Collection mapping
/// 3. Shape admission
#[must_use]
pub fn validate(registry: &KindRegistry) -> ConformanceReport {
    let mut report = ConformanceReport::new();
    report.extend(validators::lattice::validate(registry));
    report.extend(validators::collections::validate(registry));
    report.extend(validators::shapes::validate(registry));
    report
}

#[cfg(test)]
mod tests_unit {
    use super::*;

    #[test]
    fn standard_registry_conforms() {
        let report = validate(&KindRegistry::standard());
        let failures: Vec<_> = report.failures().collect();
        assert!(failures.is_empty(), "conformance failures: {failures:#?}");
        assert!(report.results.len() >= 6);
    }

    #[test]
    fn every_validator_reports() {
        let report = validate(&KindRegistry::standard());
        for validator in ["kinds/lattice", "kinds/collections", "kinds/shapes"] {
            assert!(
                report.results.iter().any(|r| r.validator == validator),
                "no results from {validator}"
            );
        }
    }
}
