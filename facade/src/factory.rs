//! The factory: lookup, resolution, construction and installation of
//! facade objects.
//!
//! [`Factory::get`] is the entry point. It checks the [`IdentityCache`],
//! resolves the raw term and its kind outside any lock, constructs the
//! object through the constructor table, and installs it under all of its
//! keys in one step. If the term was evicted, or the cache cleared, while the
//! knowledge base was being consulted, the whole lookup starts over.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use kbf_kinds::{Kind, KindRegistry, TermShape};
use tracing::{debug, info, warn};

use crate::arity::ArityDescriptor;
use crate::backend::KnowledgeBase;
use crate::cache::{CacheKey, IdentityCache};
use crate::config::FactoryConfig;
use crate::error::{FacadeError, Result};
use crate::formula::{CollectionShape, FormulaTree, Leaf};
use crate::object::{Construction, ConstructorTable, FacadeObject};
use crate::render::sexpr;
use crate::resolver::TypeResolver;
use crate::term::{RawArg, TermRef};

/// How many times a lookup is retried when the cache changes underneath it.
const MAX_INSTALL_ATTEMPTS: usize = 8;

/// Number of striped locks serialising `find_or_create` per key.
const CREATION_STRIPES: usize = 64;

/// What a caller is looking for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Lookup {
    /// A name or compact external id, normalised per [`KeyConfig`](crate::KeyConfig).
    Name(String),
    /// A raw term already in hand.
    Term(TermRef),
}

impl From<&str> for Lookup {
    fn from(s: &str) -> Self {
        Lookup::Name(s.to_owned())
    }
}

impl From<String> for Lookup {
    fn from(s: String) -> Self {
        Lookup::Name(s)
    }
}

impl From<TermRef> for Lookup {
    fn from(t: TermRef) -> Self {
        Lookup::Term(t)
    }
}

impl From<&TermRef> for Lookup {
    fn from(t: &TermRef) -> Self {
        Lookup::Term(t.clone())
    }
}

impl fmt::Display for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lookup::Name(name) => f.write_str(name),
            Lookup::Term(term) => fmt::Display::fmt(term, f),
        }
    }
}

/// Whether a key exists in the knowledge base as a given kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KbStatus {
    /// The key resolves to a term of the requested kind.
    ExistsAsKind,
    /// The key resolves to a term, but not of the requested kind.
    ExistsNotAsKind,
    /// The key does not resolve.
    DoesNotExist,
}

/// What a raw term denotes on the host side.
#[derive(Debug, Clone)]
pub enum Denotation {
    /// A canonical facade object.
    Object(Arc<FacadeObject>),
    /// One of the empty-collection sentinels.
    Empty(CollectionShape),
}

/// Identity-stable, typed access to knowledge-base terms.
pub struct Factory {
    kb: Arc<dyn KnowledgeBase>,
    registry: Arc<KindRegistry>,
    config: FactoryConfig,
    resolver: TypeResolver,
    cache: IdentityCache,
    constructors: ConstructorTable,
    creation_locks: Vec<Mutex<()>>,
    sentinels: [OnceLock<TermRef>; 2],
}

impl Factory {
    /// Creates a factory over `kb` with the standard kind registry and the
    /// default configuration.
    #[must_use]
    pub fn new(kb: Arc<dyn KnowledgeBase>) -> Self {
        Self::with_config(
            kb,
            Arc::new(KindRegistry::standard()),
            FactoryConfig::default(),
        )
    }

    /// Creates a factory with an explicit registry and configuration.
    #[must_use]
    pub fn with_config(
        kb: Arc<dyn KnowledgeBase>,
        registry: Arc<KindRegistry>,
        config: FactoryConfig,
    ) -> Self {
        Self {
            kb,
            resolver: TypeResolver::new(Arc::clone(&registry)),
            cache: IdentityCache::new(Arc::clone(&registry)),
            constructors: ConstructorTable::standard(&registry),
            creation_locks: (0..CREATION_STRIPES).map(|_| Mutex::new(())).collect(),
            sentinels: [OnceLock::new(), OnceLock::new()],
            registry,
            config,
        }
    }

    /// Returns the knowledge-base collaborator.
    #[must_use]
    pub fn kb(&self) -> &dyn KnowledgeBase {
        &*self.kb
    }

    /// Returns the kind registry.
    #[must_use]
    pub fn registry(&self) -> &KindRegistry {
        &self.registry
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &FactoryConfig {
        &self.config
    }

    /// Returns the identity cache.
    #[must_use]
    pub fn cache(&self) -> &IdentityCache {
        &self.cache
    }

    /// Returns the resolver.
    #[must_use]
    pub fn resolver(&self) -> &TypeResolver {
        &self.resolver
    }

    /// Returns the canonical facade object for `key` at `kind` or tighter.
    ///
    /// # Errors
    ///
    /// - [`FacadeError::NotFound`] if a name does not resolve.
    /// - [`FacadeError::TypeMismatch`] if the term is only known as an
    ///   ancestor of `kind`.
    /// - [`FacadeError::TypeConflict`] if it is of an unrelated kind, or is an
    ///   empty-collection sentinel (see [`Factory::denote`]).
    /// - [`FacadeError::CreateFailure`] if the object cannot be constructed.
    /// - [`FacadeError::Backend`] if the knowledge base fails.
    pub fn get(&self, key: impl Into<Lookup>, kind: Kind) -> Result<Arc<FacadeObject>> {
        let lookup = self.normalize(key.into());
        for attempt in 0..MAX_INSTALL_ATTEMPTS {
            let generation = self.cache.generation();
            let request_keys = self.lookup_keys(&lookup);
            if let Some(hit) = self.cache.find(&request_keys) {
                if let Some(object) = self.accept_cached(hit, kind)? {
                    return Ok(object);
                }
            }

            let term = match &lookup {
                Lookup::Name(name) => {
                    self.kb
                        .lookup(name)?
                        .ok_or_else(|| FacadeError::NotFound { key: name.clone() })?
                }
                Lookup::Term(term) => term.clone(),
            };
            if let Some(shape) = self.sentinel_shape(&term) {
                return Err(FacadeError::TypeConflict {
                    term: term.to_string(),
                    found: sentinel_description(shape).to_owned(),
                    requested: kind,
                });
            }

            if let Some(hit) = self.cache.find(&[CacheKey::Identity(term.clone())]) {
                if let Some(object) = self.accept_cached(hit, kind)? {
                    if let Lookup::Name(name) = &lookup {
                        if !self.cache.alias(CacheKey::Request(name.clone()), &term) {
                            debug!(key = %name, %term, "term left the cache before aliasing");
                        }
                    }
                    return Ok(object);
                }
            }

            debug!(key = %lookup, %kind, "cache miss");
            let resolved = self.resolver.resolve(&*self.kb, &term, kind)?;
            let object = Arc::new(self.construct(term.clone(), resolved)?);
            let keys = self.cache_keys(&lookup, &term);
            match self.cache.install(object, keys, generation) {
                Ok(canonical) => return self.check_installed(canonical, kind),
                Err(_) => {
                    debug!(key = %lookup, attempt, "term evicted or cache cleared; retrying");
                }
            }
        }
        Err(FacadeError::CreateFailure {
            term: lookup.to_string(),
            kind,
            reason: format!("evicted during each of {MAX_INSTALL_ATTEMPTS} attempts"),
            unconfirmed: false,
            source: None,
        })
    }

    /// Like [`Factory::get`], but creates the term when the name is unknown
    /// and asserts the classifying collection when the term is known only at
    /// a less specific kind. Concurrent calls for the same key create at most
    /// one term.
    ///
    /// # Errors
    ///
    /// - [`FacadeError::TypeConflict`] if the term exists with an unrelated
    ///   kind; conflicts are never coerced.
    /// - Any [`FacadeError::CreateFailure`] of [`Factory::get`] other than an
    ///   unconfirmed classification, unchanged.
    /// - [`FacadeError::CreateFailure`] wrapping the cause if creation,
    ///   classification, or the final resolution fails.
    /// - Any other error of [`Factory::get`].
    pub fn find_or_create(
        &self,
        key: impl Into<Lookup>,
        kind: Kind,
    ) -> Result<Arc<FacadeObject>> {
        let lookup = self.normalize(key.into());
        let _guard = self.creation_lock(&lookup);
        let term = match self.get(lookup.clone(), kind) {
            Ok(object) => return Ok(object),
            Err(FacadeError::NotFound { key }) => {
                let Lookup::Name(name) = &lookup else {
                    return Err(FacadeError::NotFound { key });
                };
                let term = self.kb.create_term(name).map_err(|e| {
                    create_failure(&lookup, kind, "the knowledge base refused to create it", e)
                })?;
                info!(term = %term, %kind, "created term");
                term
            }
            Err(
                FacadeError::TypeMismatch { .. }
                | FacadeError::CreateFailure {
                    unconfirmed: true, ..
                },
            ) => {
                match &lookup {
                    Lookup::Name(name) => self
                        .kb
                        .lookup(name)?
                        .ok_or_else(|| FacadeError::NotFound { key: name.clone() })?,
                    Lookup::Term(term) => term.clone(),
                }
            }
            Err(other) => return Err(other),
        };
        self.classify_as(&term, kind)
            .map_err(|e| create_failure(&lookup, kind, "could not assert its classification", e))?;
        self.get(lookup.clone(), kind)
            .map_err(|e| create_failure(&lookup, kind, "still unresolved after classification", e))
    }

    /// Reports whether `key` exists as `kind` without raising the
    /// recoverable lookup errors. A term whose classification is merely
    /// unconfirmed exists, but not as `kind`.
    ///
    /// # Errors
    ///
    /// Returns `StaleReference`, `Backend` and construction failures other
    /// than an unconfirmed classification unchanged.
    pub fn get_status(&self, key: impl Into<Lookup>, kind: Kind) -> Result<KbStatus> {
        match self.get(key, kind) {
            Ok(_) => Ok(KbStatus::ExistsAsKind),
            Err(FacadeError::NotFound { .. }) => Ok(KbStatus::DoesNotExist),
            Err(
                FacadeError::TypeMismatch { .. }
                | FacadeError::TypeConflict { .. }
                | FacadeError::CreateFailure {
                    unconfirmed: true, ..
                },
            ) => Ok(KbStatus::ExistsNotAsKind),
            Err(other) => Err(other),
        }
    }

    /// Invalidates `object` and every other object installed for the same
    /// term, and drops the term's keys. Returns false if `object` was already
    /// invalid.
    pub fn invalidate(&self, object: &FacadeObject) -> bool {
        let first = object.invalidate();
        self.invalidate_term(object.core());
        first
    }

    /// Handles a deletion signalled for `term`: every facade object installed
    /// for it becomes stale and all of its keys are dropped. Returns the
    /// number of objects invalidated by this call.
    pub fn invalidate_term(&self, term: &TermRef) -> usize {
        let evicted = self.cache.evict(term);
        let count = evicted.iter().filter(|o| o.invalidate()).count();
        warn!(term = %term, invalidated = count, "invalidated term");
        count
    }

    /// Drops the whole cache. Objects already handed out stay valid but are no
    /// longer canonical; the next lookup builds fresh ones.
    pub fn clear_cache(&self) {
        let dropped = self.cache.clear();
        info!(dropped, "cleared identity cache");
    }

    /// Maps a raw term to what it denotes on the host side.
    ///
    /// # Errors
    ///
    /// Returns any error of [`Factory::get`] for non-sentinel terms.
    pub fn denote(&self, term: &TermRef) -> Result<Denotation> {
        match self.sentinel_shape(term) {
            Some(shape) => Ok(Denotation::Empty(shape)),
            None => self.get(term, Kind::Object).map(Denotation::Object),
        }
    }

    /// Returns the arity of a relation, querying the knowledge base once per
    /// object. Non-relations have [`ArityDescriptor::Unknown`] arity.
    ///
    /// # Errors
    ///
    /// Returns `StaleReference` for invalidated objects and `Backend` if the
    /// knowledge base cannot be queried.
    pub fn arity_of(&self, object: &FacadeObject) -> Result<ArityDescriptor> {
        let term = object.term()?;
        let Some(cell) = object.arity_cell() else {
            return Ok(ArityDescriptor::Unknown);
        };
        if let Some(arity) = cell.get() {
            return Ok(*arity);
        }
        let classes = self.kb.classify(term)?;
        let arity = if classes.iter().any(|c| *c == self.config.vocabulary.variable_arity_marker) {
            let range = self.kb.arity_range(term)?;
            ArityDescriptor::Variable {
                min: range.min,
                max: range.max,
            }
        } else {
            match self.kb.arity(term)? {
                Some(n) => ArityDescriptor::Fixed(n),
                None => ArityDescriptor::Unknown,
            }
        };
        debug!(relation = %term, %arity, "resolved arity");
        Ok(*cell.get_or_init(|| arity))
    }

    /// Returns the keys `term` would be installed under for `lookup`.
    ///
    /// Always the identity key; the canonical string unless the term is an
    /// assertion; the request key when looked up by name.
    #[must_use]
    pub fn cache_keys(&self, lookup: &Lookup, term: &TermRef) -> Vec<CacheKey> {
        let mut keys = Vec::with_capacity(3);
        if let Lookup::Name(name) = lookup {
            keys.push(CacheKey::Request(name.clone()));
        }
        if let Some(canonical) = sexpr::canonical(term) {
            keys.push(CacheKey::Canonical(canonical));
        }
        keys.push(CacheKey::Identity(term.clone()));
        keys
    }

    fn lookup_keys(&self, lookup: &Lookup) -> Vec<CacheKey> {
        match lookup {
            Lookup::Name(name) => vec![
                CacheKey::Request(name.clone()),
                CacheKey::Canonical(name.clone()),
            ],
            Lookup::Term(term) => vec![CacheKey::Identity(term.clone())],
        }
    }

    fn normalize(&self, lookup: Lookup) -> Lookup {
        match lookup {
            Lookup::Name(name) => Lookup::Name(self.config.keys.normalize(&name)),
            term => term,
        }
    }

    /// Decides whether a cached object answers a request. `None` means the
    /// request is tighter than what is cached and the knowledge base should
    /// be asked again.
    fn accept_cached(
        &self,
        hit: Arc<FacadeObject>,
        requested: Kind,
    ) -> Result<Option<Arc<FacadeObject>>> {
        if self.registry.is_subkind(hit.kind(), requested) {
            return Ok(Some(hit));
        }
        if self.registry.is_subkind(requested, hit.kind())
            && !self.registry.is_structural(hit.kind())
        {
            return Ok(None);
        }
        warn!(term = %hit.label(), cached = %hit.kind(), %requested, "type conflict");
        Err(FacadeError::TypeConflict {
            term: hit.label(),
            found: hit.kind().label().to_owned(),
            requested,
        })
    }

    fn check_installed(
        &self,
        canonical: Arc<FacadeObject>,
        requested: Kind,
    ) -> Result<Arc<FacadeObject>> {
        if self.registry.is_subkind(canonical.kind(), requested) {
            Ok(canonical)
        } else {
            warn!(
                term = %canonical.label(),
                cached = %canonical.kind(),
                %requested,
                "type conflict"
            );
            Err(FacadeError::TypeConflict {
                term: canonical.label(),
                found: canonical.kind().label().to_owned(),
                requested,
            })
        }
    }

    fn construct(&self, term: TermRef, kind: Kind) -> Result<FacadeObject> {
        let formula = match term.args() {
            Some(args) => Some(self.tree_from_raw(args)?),
            None => None,
        };
        self.constructors.construct(Construction { term, kind, formula })
    }

    /// Builds a formula tree from a raw operator-first argument list. Nested
    /// sentences stay nodes; every other term becomes a canonical object.
    pub(crate) fn tree_from_raw(&self, args: &[RawArg]) -> Result<FormulaTree> {
        let terms = args
            .iter()
            .map(|arg| self.raw_to_tree(arg))
            .collect::<Result<Vec<_>>>()?;
        Ok(FormulaTree::from_terms(terms))
    }

    pub(crate) fn raw_to_tree(&self, arg: &RawArg) -> Result<FormulaTree> {
        match arg {
            RawArg::Value(v) => Ok(FormulaTree::from(v.clone())),
            RawArg::Term(term) => self.term_to_tree(term),
        }
    }

    pub(crate) fn term_to_tree(&self, term: &TermRef) -> Result<FormulaTree> {
        if term.shape() == TermShape::Sentence {
            if let Some(args) = term.args() {
                return self.tree_from_raw(args);
            }
        }
        Ok(match self.denote(term)? {
            Denotation::Object(object) => FormulaTree::from(object),
            Denotation::Empty(shape) => FormulaTree::from(Leaf::Empty(shape)),
        })
    }

    fn classify_as(&self, term: &TermRef, kind: Kind) -> Result<()> {
        let collection =
            self.registry
                .collection_for(kind)
                .ok_or_else(|| FacadeError::CreateFailure {
                    term: term.to_string(),
                    kind,
                    reason: "no collection classifies this kind".to_owned(),
                    unconfirmed: false,
                    source: None,
                })?;
        self.kb.assert_classification(term, collection)?;
        debug!(term = %term, collection, "asserted classification");
        Ok(())
    }

    fn creation_lock(&self, lookup: &Lookup) -> MutexGuard<'_, ()> {
        let mut hasher = DefaultHasher::new();
        lookup.hash(&mut hasher);
        let stripe = (hasher.finish() % CREATION_STRIPES as u64) as usize;
        self.creation_locks[stripe]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn sentinel_shape(&self, term: &TermRef) -> Option<CollectionShape> {
        if term.shape() != TermShape::Constant {
            return None;
        }
        let vocabulary = &self.config.vocabulary;
        match term.name() {
            Some(name) if name == vocabulary.empty_list => Some(CollectionShape::List),
            Some(name) if name == vocabulary.empty_set => Some(CollectionShape::Set),
            _ => None,
        }
    }

    /// Returns the knowledge-base term for an empty-collection sentinel.
    pub(crate) fn sentinel_term(&self, shape: CollectionShape) -> Result<TermRef> {
        let (cell, name) = match shape {
            CollectionShape::List => (&self.sentinels[0], &self.config.vocabulary.empty_list),
            CollectionShape::Set => (&self.sentinels[1], &self.config.vocabulary.empty_set),
        };
        if let Some(term) = cell.get() {
            return Ok(term.clone());
        }
        let term = self
            .kb
            .lookup(name)?
            .ok_or_else(|| FacadeError::NotFound { key: name.clone() })?;
        Ok(cell.get_or_init(|| term).clone())
    }
}

impl fmt::Debug for Factory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Factory")
            .field("cache", &self.cache)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn sentinel_description(shape: CollectionShape) -> &'static str {
    match shape {
        CollectionShape::List => "the empty list sentinel",
        CollectionShape::Set => "the empty set sentinel",
    }
}

fn create_failure(
    lookup: &Lookup,
    kind: Kind,
    reason: &str,
    source: impl Into<crate::error::BoxError>,
) -> FacadeError {
    FacadeError::CreateFailure {
        term: lookup.to_string(),
        kind,
        reason: reason.to_owned(),
        unconfirmed: false,
        source: Some(source.into()),
    }
}
