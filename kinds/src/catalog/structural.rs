//! Structural kinds — fixed by term shape.
//!
//! Variables, symbols, sentences and assertions are recognised directly from
//! the term itself. The classification oracle is never consulted for them,
//! and a request for one of these kinds can never be satisfied by adding
//! classifying facts.

use crate::model::{CatalogModule, Kind, KindDef, TermShape};

/// Returns the structural catalog module, including the lattice root.
#[must_use]
pub fn module() -> CatalogModule {
    CatalogModule {
        name: "structural",
        comment: "The lattice root and the kinds that are read directly off a \
                  term's structure.",
        kinds: kinds(),
    }
}

fn kinds() -> Vec<KindDef> {
    vec![
        KindDef {
            kind: Kind::Object,
            label: "Object",
            comment: "Any facade object. Every kind specialises Object.",
            parents: &[],
            collection: None,
            shapes: &TermShape::ALL,
            structural: false,
            requires_classification: false,
        },
        KindDef {
            kind: Kind::Variable,
            label: "Variable",
            comment: "A logical variable appearing in a rule or query.",
            parents: &[Kind::Object],
            collection: None,
            shapes: &[TermShape::Variable],
            structural: true,
            requires_classification: false,
        },
        KindDef {
            kind: Kind::Symbol,
            label: "Symbol",
            comment: "A keyword-like symbol such as :TRUE or :BACKWARD.",
            parents: &[Kind::Object],
            collection: None,
            shapes: &[TermShape::Symbol],
            structural: true,
            requires_classification: false,
        },
        KindDef {
            kind: Kind::Sentence,
            label: "Sentence",
            comment: "A formula that is not a term and is not stored as an \
                      assertion.",
            parents: &[Kind::Object],
            collection: None,
            shapes: &[TermShape::Sentence],
            structural: true,
            requires_classification: false,
        },
        KindDef {
            kind: Kind::Assertion,
            label: "Assertion",
            comment: "A sentence stored in a context of the knowledge base. \
                      Abstract: every concrete assertion is a Fact or a Rule.",
            parents: &[Kind::Object],
            collection: None,
            shapes: &[TermShape::GroundAssertion, TermShape::RuleAssertion],
            structural: true,
            requires_classification: false,
        },
        KindDef {
            kind: Kind::Fact,
            label: "Fact",
            comment: "A ground assertion: no free variables.",
            parents: &[Kind::Assertion],
            collection: None,
            shapes: &[TermShape::GroundAssertion],
            structural: true,
            requires_classification: false,
        },
        KindDef {
            kind: Kind::Rule,
            label: "Rule",
            comment: "A rule assertion: an implication with variables.",
            parents: &[Kind::Assertion],
            collection: None,
            shapes: &[TermShape::RuleAssertion],
            structural: true,
            requires_classification: false,
        },
    ]
}
