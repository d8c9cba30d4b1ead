//! Shape admission validator.
//!
//! A kind may only admit shapes its parents admit, so a subkind never wraps
//! a term its ancestors could not. Structural shapes must resolve to one
//! tightest structural kind, and denotational kinds stay off them.

use kbf_kinds::{Kind, KindRegistry, TermShape};

use crate::report::{ConformanceReport, TestResult};

const VALIDATOR: &str = "kinds/shapes";

/// Validates shape admission across `registry`.
#[must_use]
pub fn validate(registry: &KindRegistry) -> ConformanceReport {
    let mut report = ConformanceReport::new();
    report.push(check_non_empty(registry));
    report.push(check_inherited(registry));
    report.push(check_structural(registry));
    report
}

fn check_non_empty(registry: &KindRegistry) -> TestResult {
    let details: Vec<String> = registry
        .kinds()
        .filter(|d| d.shapes.is_empty())
        .map(|d| format!("{} admits no shape", d.kind))
        .collect();
    TestResult::from_details(
        VALIDATOR,
        "Every kind admits at least one shape",
        "Kinds that admit no shape",
        details,
    )
}

fn check_inherited(registry: &KindRegistry) -> TestResult {
    let mut details = Vec::new();
    for def in registry.kinds() {
        for parent in def.parents {
            for shape in def.shapes {
                if registry.def(*parent).is_some() && !registry.admits(*parent, *shape) {
                    details.push(format!(
                        "{} admits {shape} but its parent {parent} does not",
                        def.kind
                    ));
                }
            }
        }
    }
    TestResult::from_details(
        VALIDATOR,
        "Shapes are inherited from parents",
        "Kinds admitting shapes their parents reject",
        details,
    )
}

fn check_structural(registry: &KindRegistry) -> TestResult {
    let mut details = Vec::new();
    for shape in TermShape::ALL {
        let structural: Vec<Kind> = registry
            .kinds()
            .filter(|d| d.structural && d.shapes.contains(&shape))
            .map(|d| d.kind)
            .collect();
        if structural.is_empty() {
            continue;
        }
        let tightest: Vec<Kind> = structural
            .iter()
            .copied()
            .filter(|k| {
                structural
                    .iter()
                    .all(|other| registry.is_subkind(*k, *other))
            })
            .collect();
        if tightest.len() != 1 {
            let names: Vec<String> = structural.iter().map(Kind::to_string).collect();
            details.push(format!(
                "{shape} has no single tightest structural kind among {}",
                names.join(", ")
            ));
        }
        for def in registry.kinds() {
            if !def.structural && def.kind != Kind::Object && def.shapes.contains(&shape) {
                details.push(format!(
                    "non-structural kind {} admits structural shape {shape}",
                    def.kind
                ));
            }
        }
    }
    TestResult::from_details(
        VALIDATOR,
        "Each structural shape maps to one structural kind",
        "Ambiguous structural shapes",
        details,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validators::testing::standard_with;

    #[test]
    fn standard_shapes_pass() {
        assert!(validate(&KindRegistry::standard()).all_passed());
    }

    #[test]
    fn detects_empty_shapes() {
        let reg = standard_with(Kind::Symbol, |d| d.shapes = &[]);
        let report = validate(&reg);
        assert_eq!(report.failure_count(), 1);
        assert_eq!(report.failures().next().unwrap().message, "Kinds that admit no shape");
    }

    #[test]
    fn detects_shape_parent_rejects() {
        let reg = standard_with(Kind::Fact, |d| d.shapes = &[TermShape::Sentence]);
        let report = validate(&reg);
        assert!(report.failures().any(|r| r.details
            == vec!["Fact admits sentence but its parent Assertion does not".to_owned()]));
    }

    #[test]
    fn detects_ambiguous_structural_shape() {
        // Symbol also claims variables, unrelated to Variable.
        let reg = standard_with(Kind::Symbol, |d| {
            d.shapes = &[TermShape::Symbol, TermShape::Variable];
        });
        let report = validate(&reg);
        let failure = report.failures().next().unwrap();
        assert!(failure.details[0].starts_with("variable has no single tightest"));
    }

    #[test]
    fn detects_denotational_kind_on_structural_shape() {
        let reg = standard_with(Kind::Term, |d| {
            d.shapes = &[TermShape::Constant, TermShape::NonAtomic, TermShape::Symbol];
        });
        let report = validate(&reg);
        assert!(report
            .failures()
            .flat_map(|r| r.details.iter())
            .any(|d| d == "non-structural kind Term admits structural shape symbol"));
    }
}
