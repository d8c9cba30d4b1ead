//! Collection mapping validator.
//!
//! Classification results arrive as collection names. Each name must map
//! back to a single kind, every classifiable kind needs a collection to
//! assert when a term is coerced, and structural kinds never carry one.

use std::collections::BTreeMap;

use kbf_kinds::{Kind, KindRegistry};

use crate::report::{ConformanceReport, TestResult};

const VALIDATOR: &str = "kinds/collections";

/// Validates the kind/collection mapping of `registry`.
#[must_use]
pub fn validate(registry: &KindRegistry) -> ConformanceReport {
    let mut report = ConformanceReport::new();
    report.push(check_unique(registry));
    report.push(check_classifiable(registry));
    report
}

fn check_unique(registry: &KindRegistry) -> TestResult {
    let mut owners: BTreeMap<&str, Vec<Kind>> = BTreeMap::new();
    for def in registry.kinds() {
        if let Some(collection) = def.collection {
            owners.entry(collection).or_default().push(def.kind);
        }
    }
    let details: Vec<String> = owners
        .iter()
        .filter(|(_, kinds)| kinds.len() > 1)
        .map(|(collection, kinds)| {
            let names: Vec<String> = kinds.iter().map(Kind::to_string).collect();
            format!("{collection} is claimed by {}", names.join(", "))
        })
        .collect();
    TestResult::from_details(
        VALIDATOR,
        format!("{} collection names are unique", owners.len()),
        "Collection names claimed by several kinds",
        details,
    )
}

fn check_classifiable(registry: &KindRegistry) -> TestResult {
    let mut details = Vec::new();
    for def in registry.kinds() {
        match (def.structural, def.collection) {
            (true, Some(collection)) => details.push(format!(
                "structural kind {} carries collection {collection}",
                def.kind
            )),
            (true, None) if def.requires_classification => details.push(format!(
                "structural kind {} requires classification",
                def.kind
            )),
            (false, None) if def.kind != Kind::Object => {
                details.push(format!("{} has no collection to assert", def.kind));
            }
            _ => {}
        }
    }
    TestResult::from_details(
        VALIDATOR,
        "Every classifiable kind has a collection",
        "Kinds with inconsistent collections",
        details,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validators::testing::standard_with;

    #[test]
    fn standard_collections_pass() {
        assert!(validate(&KindRegistry::standard()).all_passed());
    }

    #[test]
    fn detects_duplicate_collection() {
        let reg = standard_with(Kind::Context, |d| d.collection = Some("Collection"));
        let report = validate(&reg);
        let failure = report.failures().next().unwrap();
        assert_eq!(
            failure.details,
            vec!["Collection is claimed by Collection, Context".to_owned()]
        );
    }

    #[test]
    fn detects_unassertable_kind() {
        let reg = standard_with(Kind::Function, |d| d.collection = None);
        let report = validate(&reg);
        assert_eq!(report.failure_count(), 1);
        assert_eq!(
            report.failures().next().unwrap().details,
            vec!["Function has no collection to assert".to_owned()]
        );
    }

    #[test]
    fn detects_structural_collection() {
        let reg = standard_with(Kind::Variable, |d| d.collection = Some("Variable"));
        let report = validate(&reg);
        assert!(report
            .failures()
            .any(|r| r.details[0].starts_with("structural kind Variable")));
    }
}
