//! Lattice structure validator.
//!
//! Checks that every kind is defined exactly once, that every parent is
//! registered, that the parent graph has no cycles, and that `Object` is the
//! single root every kind descends from. Kinds without a label or comment
//! only draw a warning.

use std::collections::{BTreeMap, BTreeSet};

use kbf_kinds::{Kind, KindRegistry};

use crate::report::{ConformanceReport, TestResult};

const VALIDATOR: &str = "kinds/lattice";

/// Validates the lattice structure of `registry`.
#[must_use]
pub fn validate(registry: &KindRegistry) -> ConformanceReport {
    let mut report = ConformanceReport::new();
    report.push(check_defined_once(registry));
    report.push(check_parents_registered(registry));
    report.push(check_acyclic(registry));
    report.push(check_rooted(registry));
    report.push(check_documented(registry));
    report
}

fn check_defined_once(registry: &KindRegistry) -> TestResult {
    let mut counts: BTreeMap<Kind, usize> = Kind::ALL.iter().map(|k| (*k, 0)).collect();
    for def in registry.kinds() {
        *counts.entry(def.kind).or_insert(0) += 1;
    }
    let details: Vec<String> = counts
        .iter()
        .filter(|(_, n)| **n != 1)
        .map(|(kind, n)| format!("{kind} is defined {n} times"))
        .collect();
    TestResult::from_details(
        VALIDATOR,
        format!("All {} kinds are defined exactly once", Kind::ALL.len()),
        "Kinds missing or defined more than once",
        details,
    )
}

fn check_parents_registered(registry: &KindRegistry) -> TestResult {
    let details: Vec<String> = registry
        .kinds()
        .flat_map(|def| {
            def.parents
                .iter()
                .filter(|p| registry.def(**p).is_none())
                .map(move |p| format!("{} names unregistered parent {p}", def.kind))
        })
        .collect();
    TestResult::from_details(
        VALIDATOR,
        "Every parent is registered",
        "Kinds with unregistered parents",
        details,
    )
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

fn check_acyclic(registry: &KindRegistry) -> TestResult {
    let mut marks: BTreeMap<Kind, Mark> = BTreeMap::new();
    let mut cycles = BTreeSet::new();
    for def in registry.kinds() {
        visit(registry, def.kind, &mut marks, &mut Vec::new(), &mut cycles);
    }
    TestResult::from_details(
        VALIDATOR,
        "Parent graph is acyclic",
        "Parent graph contains cycles",
        cycles.into_iter().collect(),
    )
}

fn visit(
    registry: &KindRegistry,
    kind: Kind,
    marks: &mut BTreeMap<Kind, Mark>,
    path: &mut Vec<Kind>,
    cycles: &mut BTreeSet<String>,
) {
    match marks.get(&kind) {
        Some(Mark::Done) => return,
        Some(Mark::Visiting) => {
            let start = path.iter().position(|k| *k == kind).unwrap_or(0);
            let mut cycle: Vec<String> = path[start..].iter().map(Kind::to_string).collect();
            cycle.push(kind.to_string());
            cycles.insert(cycle.join(" -> "));
            return;
        }
        None => {}
    }
    let Some(def) = registry.def(kind) else {
        return;
    };
    marks.insert(kind, Mark::Visiting);
    path.push(kind);
    for parent in def.parents {
        visit(registry, *parent, marks, path, cycles);
    }
    path.pop();
    marks.insert(kind, Mark::Done);
}

fn check_rooted(registry: &KindRegistry) -> TestResult {
    let mut details = Vec::new();
    for def in registry.kinds() {
        if def.kind == Kind::Object {
            if !def.parents.is_empty() {
                details.push("Object must not have parents".to_owned());
            }
        } else if def.parents.is_empty() {
            details.push(format!("{} has no parents but is not the root", def.kind));
        } else if !registry.is_subkind(def.kind, Kind::Object) {
            details.push(format!("{} does not descend from Object", def.kind));
        }
    }
    TestResult::from_details(
        VALIDATOR,
        "Object is the single root",
        "Lattice is not rooted at Object",
        details,
    )
}

fn check_documented(registry: &KindRegistry) -> TestResult {
    let details: Vec<String> = registry
        .kinds()
        .filter(|d| d.label.trim().is_empty() || d.comment.trim().is_empty())
        .map(|d| format!("{} has no label or comment", d.kind))
        .collect();
    if details.is_empty() {
        TestResult::pass(VALIDATOR, "Every kind is documented")
    } else {
        TestResult::warn_with_details(VALIDATOR, "Undocumented kinds", details)
    }
}
