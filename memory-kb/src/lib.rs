//! In-memory knowledge base for tests and demos.
//!
//! [`MemoryKb`] implements [`KnowledgeBase`] over plain maps. Constants get
//! sequential external ids (`c1`, `c2`, ...) unless a fixture names one.
//! Non-atomic terms are classified by their functor's `result_isa`
//! collections unless classified directly.
//!
//! For concurrency tests the knowledge base can sleep on every call, run a
//! hook after each classification, and counts lookups, classifications,
//! creations and asserted classifications.
//!
//! Fixtures are JSON:
//!
//! ```json
//! { "constants": [
//!     { "name": "likes", "isa": ["BinaryPredicate"], "arity": 2 },
//!     { "name": "TheList", "isa": ["Function-Denotational", "VariableArityRelation"], "arity_min": 1 }
//! ] }
//! ```

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    clippy::missing_errors_doc
)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

pub mod fixture;

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use kbfacade::{ArityRange, BackendError, KnowledgeBase, RawArg, TermRef};
use tracing::trace;

pub use fixture::{Fixture, FixtureConstant, FixtureError, FixtureValue};

/// The fixture shipped with the crate: a small animal ontology plus the
/// list, set and date vocabulary the facade uses by default.
pub const ANIMALS: &str = include_str!("../fixtures/animals.json");

#[derive(Default)]
struct State {
    by_name: HashMap<String, TermRef>,
    by_id: HashMap<String, TermRef>,
    isa: HashMap<TermRef, Vec<String>>,
    result_isa: HashMap<TermRef, Vec<String>>,
    arity: HashMap<TermRef, usize>,
    arity_range: HashMap<TermRef, ArityRange>,
    comments: HashMap<TermRef, Vec<String>>,
    quoted_isa: HashMap<TermRef, Vec<String>>,
    indexicals: HashMap<TermRef, RawArg>,
    next_id: usize,
}

impl State {
    fn constant(&mut self, name: &str, id: Option<&str>) -> TermRef {
        if let Some(existing) = self.by_name.get(name) {
            return existing.clone();
        }
        let id = match id {
            Some(id) => id.to_owned(),
            None => loop {
                self.next_id += 1;
                let candidate = format!("c{}", self.next_id);
                if !self.by_id.contains_key(&candidate) {
                    break candidate;
                }
            },
        };
        let term = TermRef::constant(id.clone(), name);
        self.by_name.insert(name.to_owned(), term.clone());
        self.by_id.insert(id, term.clone());
        term
    }

    fn classes(&self, term: &TermRef) -> Vec<String> {
        if let Some(direct) = self.isa.get(term) {
            return direct.clone();
        }
        // Functional terms inherit their functor's result collections.
        let functor = term.args().and_then(|args| match args.first() {
            Some(RawArg::Term(f)) if term.shape() == kbfacade::TermShape::NonAtomic => Some(f),
            _ => None,
        });
        functor
            .and_then(|f| self.result_isa.get(f))
            .cloned()
            .unwrap_or_default()
    }

    fn named(&self, name: &str) -> Result<TermRef, BackendError> {
        self.by_name
            .get(name)
            .cloned()
            .ok_or_else(|| BackendError::new(format!("unknown constant {name}")))
    }
}

type ClassifyHook = Box<dyn Fn(&TermRef) + Send + Sync>;

/// A [`KnowledgeBase`] held entirely in memory.
#[derive(Default)]
pub struct MemoryKb {
    state: RwLock<State>,
    latency: Option<Duration>,
    on_classify: Option<ClassifyHook>,
    lookups: AtomicUsize,
    classifications: AtomicUsize,
    creations: AtomicUsize,
    assertions: AtomicUsize,
}

impl MemoryKb {
    /// Creates an empty knowledge base.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a knowledge base populated from the bundled [`ANIMALS`]
    /// fixture.
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError`] only if the bundled fixture is malformed.
    pub fn animals() -> Result<Self, FixtureError> {
        Self::from_json_str(ANIMALS)
    }

    /// Parses a JSON fixture and loads it.
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError::Json`] for malformed fixtures and
    /// [`FixtureError::UnknownConstant`] if an indexical names a missing
    /// constant.
    pub fn from_json_str(json: &str) -> Result<Self, FixtureError> {
        let fixture: Fixture = serde_json::from_str(json)?;
        let kb = Self::new();
        kb.load_fixture(&fixture)?;
        Ok(kb)
    }

    /// Reads a JSON fixture file and loads it.
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError::Io`] if the file cannot be read, and otherwise
    /// as [`MemoryKb::from_json_str`].
    pub fn load(path: &Path) -> Result<Self, FixtureError> {
        let json = std::fs::read_to_string(path).map_err(|source| FixtureError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Makes every collaborator call sleep for `latency` first.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Runs `hook` after every `classify` call, once the answer is computed
    /// and before it is returned. No lock is held while the hook runs.
    #[must_use]
    pub fn on_classify(mut self, hook: impl Fn(&TermRef) + Send + Sync + 'static) -> Self {
        self.on_classify = Some(Box::new(hook));
        self
    }

    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn pause(&self) {
        if let Some(latency) = self.latency {
            std::thread::sleep(latency);
        }
    }

    /// Adds every constant of `fixture`.
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError::UnknownConstant`] if an indexical evaluates to
    /// a constant the fixture does not define.
    pub fn load_fixture(&self, fixture: &Fixture) -> Result<(), FixtureError> {
        let mut state = self.write();
        for c in &fixture.constants {
            let term = state.constant(&c.name, c.id.as_deref());
            if !c.isa.is_empty() {
                state.isa.insert(term.clone(), c.isa.clone());
            }
            if !c.result_isa.is_empty() {
                state.result_isa.insert(term.clone(), c.result_isa.clone());
            }
            if let Some(n) = c.arity {
                state.arity.insert(term.clone(), n);
            }
            if c.arity_min.is_some() || c.arity_max.is_some() {
                state.arity_range.insert(
                    term.clone(),
                    ArityRange {
                        min: c.arity_min,
                        max: c.arity_max,
                    },
                );
            }
            if !c.comments.is_empty() {
                state.comments.insert(term.clone(), c.comments.clone());
            }
            if !c.quoted_isa.is_empty() {
                state.quoted_isa.insert(term.clone(), c.quoted_isa.clone());
            }
        }
        // Indexical values may name constants defined later in the fixture.
        for c in &fixture.constants {
            let value = match (&c.indexical_value, &c.indexical_term) {
                (Some(v), _) => RawArg::Value(v.clone().into()),
                (None, Some(name)) => RawArg::Term(
                    state
                        .by_name
                        .get(name)
                        .cloned()
                        .ok_or_else(|| FixtureError::UnknownConstant(name.clone()))?,
                ),
                (None, None) => continue,
            };
            let term = state.constant(&c.name, c.id.as_deref());
            state.indexicals.insert(term, value);
        }
        Ok(())
    }

    /// Adds a constant, or returns the existing one with that name.
    pub fn add_constant(&self, name: &str) -> TermRef {
        self.write().constant(name, None)
    }

    /// Classifies a constant, most specific collection first.
    pub fn set_isa(&self, term: &TermRef, collections: &[&str]) {
        self.write()
            .isa
            .insert(term.clone(), collections.iter().map(|c| (*c).to_owned()).collect());
    }

    /// Sets the fixed arity of a relation.
    pub fn set_arity(&self, term: &TermRef, arity: usize) {
        self.write().arity.insert(term.clone(), arity);
    }

    /// Sets the argument-count bounds of a variable-arity relation.
    pub fn set_arity_range(&self, term: &TermRef, min: Option<usize>, max: Option<usize>) {
        self.write().arity_range.insert(term.clone(), ArityRange { min, max });
    }

    /// Sets the value an indexical evaluates to.
    pub fn set_indexical(&self, term: &TermRef, value: RawArg) {
        self.write().indexicals.insert(term.clone(), value);
    }

    /// Deletes a constant and everything recorded about it. Returns the
    /// deleted term.
    pub fn delete_term(&self, name: &str) -> Option<TermRef> {
        let mut state = self.write();
        let term = state.by_name.remove(name)?;
        if let Some(id) = term.external_id() {
            state.by_id.remove(id);
        }
        state.isa.remove(&term);
        state.result_isa.remove(&term);
        state.arity.remove(&term);
        state.arity_range.remove(&term);
        state.comments.remove(&term);
        state.quoted_isa.remove(&term);
        state.indexicals.remove(&term);
        Some(term)
    }

    /// Returns the named constant, if it exists.
    #[must_use]
    pub fn constant(&self, name: &str) -> Option<TermRef> {
        self.read().by_name.get(name).cloned()
    }

    /// Number of `lookup` calls so far.
    #[must_use]
    pub fn lookup_calls(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    /// Number of `classify` calls so far.
    #[must_use]
    pub fn classify_calls(&self) -> usize {
        self.classifications.load(Ordering::SeqCst)
    }

    /// Number of `create_term` calls so far.
    #[must_use]
    pub fn create_calls(&self) -> usize {
        self.creations.load(Ordering::SeqCst)
    }

    /// Number of `assert_classification` calls so far.
    #[must_use]
    pub fn assert_calls(&self) -> usize {
        self.assertions.load(Ordering::SeqCst)
    }
}

impl KnowledgeBase for MemoryKb {
    fn lookup(&self, key: &str) -> Result<Option<TermRef>, BackendError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.pause();
        let state = self.read();
        Ok(state.by_name.get(key).or_else(|| state.by_id.get(key)).cloned())
    }

    fn classify(&self, term: &TermRef) -> Result<Vec<String>, BackendError> {
        self.classifications.fetch_add(1, Ordering::SeqCst);
        self.pause();
        let classes = self.read().classes(term);
        if let Some(hook) = &self.on_classify {
            hook(term);
        }
        Ok(classes)
    }

    fn create_term(&self, name: &str) -> Result<TermRef, BackendError> {
        self.creations.fetch_add(1, Ordering::SeqCst);
        self.pause();
        if name.is_empty() || name.contains(char::is_whitespace) {
            return Err(BackendError::new(format!("invalid constant name {name:?}")));
        }
        let term = self.write().constant(name, None);
        trace!(term = %term, "created constant");
        Ok(term)
    }

    fn assert_classification(&self, term: &TermRef, collection: &str) -> Result<(), BackendError> {
        self.assertions.fetch_add(1, Ordering::SeqCst);
        self.pause();
        let mut state = self.write();
        if let Some(name) = term.name() {
            if term.external_id().is_some() && !state.by_name.contains_key(name) {
                return Err(BackendError::new(format!("{name} does not exist")));
            }
        }
        let classes = state.isa.entry(term.clone()).or_default();
        if !classes.iter().any(|c| c == collection) {
            classes.insert(0, collection.to_owned());
        }
        Ok(())
    }

    fn evaluate_indexical(&self, term: &TermRef) -> Result<RawArg, BackendError> {
        self.pause();
        self.read()
            .indexicals
            .get(term)
            .cloned()
            .ok_or_else(|| BackendError::new(format!("{term} has no value in this context")))
    }

    fn arity(&self, relation: &TermRef) -> Result<Option<usize>, BackendError> {
        Ok(self.read().arity.get(relation).copied())
    }

    fn arity_range(&self, relation: &TermRef) -> Result<ArityRange, BackendError> {
        Ok(self.read().arity_range.get(relation).copied().unwrap_or_default())
    }

    fn comments(&self, term: &TermRef) -> Result<Vec<String>, BackendError> {
        Ok(self.read().comments.get(term).cloned().unwrap_or_default())
    }

    fn quoted_isa(&self, term: &TermRef) -> Result<Vec<String>, BackendError> {
        Ok(self.read().quoted_isa.get(term).cloned().unwrap_or_default())
    }
}

impl std::fmt::Debug for MemoryKb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryKb")
            .field("constants", &self.read().by_name.len())
            .field("latency", &self.latency)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kbfacade::Primitive;
    use std::sync::{Arc, Mutex};

    #[test]
    fn bundled_fixture_loads() {
        let kb = MemoryKb::animals().unwrap();
        let dog = kb.lookup("Dog").unwrap().unwrap();
        assert_eq!(kb.classify(&dog).unwrap(), vec!["Collection".to_owned()]);
        assert_eq!(kb.lookup("c0").unwrap().and_then(|t| t.name().map(str::to_owned)), Some("Thing".into()));
        assert_eq!(kb.lookup_calls(), 2);
    }

    #[test]
    fn ids_skip_those_named_by_the_fixture() {
        let kb = MemoryKb::from_json_str(r#"{"constants": [{"name": "A", "id": "c1"}, {"name": "B"}]}"#).unwrap();
        assert_eq!(kb.constant("B").unwrap().external_id(), Some("c2"));
    }

    #[test]
    fn functional_terms_use_result_isa() {
        let kb = MemoryKb::animals().unwrap();
        let breed = kb.constant("BreedFn").unwrap();
        let nat = TermRef::non_atomic(vec![breed.into(), kb.constant("Spot").unwrap().into()]);
        assert_eq!(kb.classify(&nat).unwrap(), vec!["Collection".to_owned()]);
    }

    #[test]
    fn classification_is_prepended_once() {
        let kb = MemoryKb::new();
        let t = kb.add_constant("Widget");
        kb.assert_classification(&t, "Individual").unwrap();
        kb.assert_classification(&t, "Collection").unwrap();
        kb.assert_classification(&t, "Collection").unwrap();
        assert_eq!(kb.classify(&t).unwrap(), vec!["Collection".to_owned(), "Individual".to_owned()]);
    }

    #[test]
    fn classify_hook_sees_every_classified_term() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = seen.clone();
        let kb = MemoryKb::animals()
            .unwrap()
            .on_classify(move |term| {
                log.lock().unwrap().push(term.name().unwrap_or_default().to_owned());
            });
        let dog = kb.constant("Dog").unwrap();
        assert_eq!(kb.classify(&dog).unwrap(), vec!["Collection".to_owned()]);
        kb.assert_classification(&dog, "Collection").unwrap();
        assert_eq!(*seen.lock().unwrap(), vec!["Dog".to_owned()]);
        assert_eq!(kb.assert_calls(), 1);
    }

    #[test]
    fn deleted_terms_disappear() {
        let kb = MemoryKb::animals().unwrap();
        let fido = kb.delete_term("Fido").unwrap();
        assert!(kb.lookup("Fido").unwrap().is_none());
        assert!(kb.assert_classification(&fido, "Individual").is_err());
    }

    #[test]
    fn indexicals_evaluate_or_fail() {
        let kb = MemoryKb::animals().unwrap();
        let now = kb.constant("Now").unwrap();
        assert_eq!(kb.evaluate_indexical(&now).unwrap(), RawArg::Value(Primitive::Int(2026)));
        let user = kb.constant("TheUser").unwrap();
        assert_eq!(kb.evaluate_indexical(&user).unwrap(), RawArg::Term(kb.constant("Fido").unwrap()));
        assert!(kb.evaluate_indexical(&kb.constant("Tomorrow").unwrap()).is_err());
    }

    #[test]
    fn bad_names_are_refused() {
        let kb = MemoryKb::new();
        assert!(kb.create_term("two words").is_err());
        assert_eq!(kb.create_calls(), 1);
    }
}
