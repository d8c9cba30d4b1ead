//! JSON fixture schema.

use std::path::PathBuf;

use kbfacade::Primitive;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A whole fixture file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fixture {
    /// Constants, in load order.
    #[serde(default)]
    pub constants: Vec<FixtureConstant>,
}

/// One constant and everything the knowledge base knows about it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixtureConstant {
    /// Constant name.
    pub name: String,
    /// External id; generated when absent.
    pub id: Option<String>,
    /// Collections the constant is an instance of, most specific first.
    pub isa: Vec<String>,
    /// For functions: collections every functional term they build belongs to.
    pub result_isa: Vec<String>,
    /// Fixed arity, for relations.
    pub arity: Option<usize>,
    /// Lower bound for variable-arity relations.
    pub arity_min: Option<usize>,
    /// Upper bound for variable-arity relations.
    pub arity_max: Option<usize>,
    /// Documentation comments.
    pub comments: Vec<String>,
    /// Quoted (syntactic) classifications.
    pub quoted_isa: Vec<String>,
    /// For indexicals: the primitive value they evaluate to.
    pub indexical_value: Option<FixtureValue>,
    /// For indexicals: the constant they evaluate to.
    pub indexical_term: Option<String>,
}

/// A primitive value in a fixture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FixtureValue {
    /// An integer.
    Int(i64),
    /// A floating-point number.
    Float(f64),
    /// A string.
    Text(String),
}

impl From<FixtureValue> for Primitive {
    fn from(v: FixtureValue) -> Self {
        match v {
            FixtureValue::Int(i) => Primitive::Int(i),
            FixtureValue::Float(f) => Primitive::Float(f),
            FixtureValue::Text(s) => Primitive::Str(s),
        }
    }
}

/// Errors raised while loading a fixture.
#[derive(Debug, Error)]
pub enum FixtureError {
    /// The fixture file could not be read.
    #[error("cannot read fixture {path}: {source}")]
    Io {
        /// Path that was read.
        path: PathBuf,
        /// I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The fixture is not valid JSON for the schema.
    #[error("invalid fixture: {0}")]
    Json(#[from] serde_json::Error),
    /// An indexical evaluates to a constant the fixture does not define.
    #[error("indexical refers to unknown constant {0}")]
    UnknownConstant(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_parse_untagged() {
        let c: FixtureConstant =
            serde_json::from_str(r#"{"name": "Now", "indexical_value": 3}"#).unwrap();
        assert_eq!(c.indexical_value, Some(FixtureValue::Int(3)));
        let c: FixtureConstant =
            serde_json::from_str(r#"{"name": "Pi", "indexical_value": 3.5}"#).unwrap();
        assert_eq!(c.indexical_value, Some(FixtureValue::Float(3.5)));
        assert!(c.isa.is_empty());
    }

    #[test]
    fn unknown_indexical_targets_are_rejected() {
        let err = crate::MemoryKb::from_json_str(
            r#"{"constants": [{"name": "Me", "indexical_term": "Nobody"}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, FixtureError::UnknownConstant(ref n) if n == "Nobody"));
    }
}
