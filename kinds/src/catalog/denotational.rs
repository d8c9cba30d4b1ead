//! Denotational kinds — terms, individuals, collections, contexts.
//!
//! These kinds wrap constants and non-atomic terms. Which one a term gets is
//! decided by the classification oracle.

use crate::model::{CatalogModule, Kind, KindDef, DENOTATIONAL_SHAPES};

/// Returns the denotational catalog module.
#[must_use]
pub fn module() -> CatalogModule {
    CatalogModule {
        name: "denotational",
        comment: "Kinds of terms that denote things in the domain of discourse.",
        kinds: kinds(),
    }
}

fn kinds() -> Vec<KindDef> {
    vec![
        KindDef {
            kind: Kind::Term,
            label: "Term",
            comment: "A denotational term: a reified constant or a non-atomic \
                      functional term.",
            parents: &[Kind::Object],
            collection: Some("Thing"),
            shapes: DENOTATIONAL_SHAPES,
            structural: false,
            requires_classification: false,
        },
        KindDef {
            kind: Kind::Individual,
            label: "Individual",
            comment: "A term that denotes a single thing rather than a set or \
                      collection.",
            parents: &[Kind::Term],
            collection: Some("Individual"),
            shapes: DENOTATIONAL_SHAPES,
            structural: false,
            requires_classification: false,
        },
        KindDef {
            kind: Kind::Collection,
            label: "Collection",
            comment: "A term that denotes a collection; its instances are \
                      things of that kind.",
            parents: &[Kind::Term],
            collection: Some("Collection"),
            shapes: DENOTATIONAL_SHAPES,
            structural: false,
            requires_classification: true,
        },
        KindDef {
            kind: Kind::Context,
            label: "Context",
            comment: "A microtheory: a context in which a set of assertions \
                      holds.",
            parents: &[Kind::Individual],
            collection: Some("Microtheory"),
            shapes: DENOTATIONAL_SHAPES,
            structural: false,
            requires_classification: true,
        },
    ]
}
