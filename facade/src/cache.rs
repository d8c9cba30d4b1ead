//! The multi-keyed identity cache.
//!
//! One term has one canonical facade object. Request keys, canonical strings
//! and term identities all alias to the term, and the term maps to its
//! object, so every key that denotes the term observes the same object.
//! Installing an object and all of its keys happens under a single write
//! lock, merging with whatever is already canonical for the term.
//!
//! The cache never calls the knowledge base. Callers resolve first, then
//! install with the generation they started from; if the cache was cleared,
//! or that same term evicted, in between, [`IdentityCache::install`] refuses
//! and the caller starts over. Evicting one term never disturbs installs of
//! another.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use kbf_kinds::KindRegistry;
use tracing::{debug, warn};

use crate::object::FacadeObject;
use crate::term::TermRef;

/// One of the keys a facade object is reachable under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// A normalised name or external id as requested by a caller.
    Request(String),
    /// The term's canonical string form. Assertions have none.
    Canonical(String),
    /// The term's own identity.
    Identity(TermRef),
}

/// The term was evicted, or the cache cleared, between resolution and install.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Superseded;

#[derive(Default)]
struct Slots {
    keys: HashMap<CacheKey, TermRef>,
    objects: HashMap<TermRef, Arc<FacadeObject>>,
    aliases: HashMap<TermRef, HashSet<CacheKey>>,
    /// Objects that were canonical for a term before a tighter one replaced
    /// them. Tracked so that invalidating the term reaches them too.
    superseded: HashMap<TermRef, Vec<Weak<FacadeObject>>>,
    /// Generation at which each term was last evicted. Dropped on clear.
    evicted_at: HashMap<TermRef, u64>,
    /// Generation of the last clear.
    cleared_at: u64,
    generation: u64,
}

/// Term-identity cache of facade objects.
pub struct IdentityCache {
    registry: Arc<KindRegistry>,
    slots: RwLock<Slots>,
}

impl IdentityCache {
    /// Creates an empty cache ranking kinds with `registry`.
    #[must_use]
    pub fn new(registry: Arc<KindRegistry>) -> Self {
        Self {
            registry,
            slots: RwLock::new(Slots::default()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Slots> {
        self.slots.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Slots> {
        self.slots.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the canonical object reachable from the first key that hits.
    /// Invalidated objects are never returned.
    #[must_use]
    pub fn find(&self, keys: &[CacheKey]) -> Option<Arc<FacadeObject>> {
        let slots = self.read();
        keys.iter().find_map(|key| {
            let term = slots.keys.get(key)?;
            slots.objects.get(term).filter(|o| o.is_valid()).cloned()
        })
    }

    /// Installs `object` under `keys`, merging with the current canonical
    /// object for the same term.
    ///
    /// The more specific of the two wins. On a tie, or when the kinds are
    /// unrelated, the object already installed stays canonical. Returns the
    /// object that is canonical afterwards.
    ///
    /// Refused when the cache was cleared, or this term evicted, after
    /// `expected_generation` was read.
    pub(crate) fn install(
        &self,
        object: Arc<FacadeObject>,
        keys: Vec<CacheKey>,
        expected_generation: u64,
    ) -> Result<Arc<FacadeObject>, Superseded> {
        let mut slots = self.write();
        let term = object.core().clone();
        let evicted_at = slots.evicted_at.get(&term).copied().unwrap_or(0);
        if slots.cleared_at > expected_generation || evicted_at > expected_generation {
            return Err(Superseded);
        }
        let canonical = match slots.objects.get(&term) {
            Some(existing) if existing.is_valid() => self.merge(existing, &object),
            _ => Arc::clone(&object),
        };
        if let Some(previous) = slots.objects.insert(term.clone(), Arc::clone(&canonical)) {
            if !Arc::ptr_eq(&previous, &canonical) {
                slots
                    .superseded
                    .entry(term.clone())
                    .or_default()
                    .push(Arc::downgrade(&previous));
            }
        }
        for key in keys {
            Self::bind(&mut slots, key, &term);
        }
        debug!(term = %term, kind = %canonical.kind(), "installed");
        Ok(canonical)
    }

    fn merge(
        &self,
        existing: &Arc<FacadeObject>,
        incoming: &Arc<FacadeObject>,
    ) -> Arc<FacadeObject> {
        match self.registry.more_specific(existing.kind(), incoming.kind()) {
            Some(kind) if kind == incoming.kind() && kind != existing.kind() => {
                debug!(
                    term = %existing.label(),
                    from = %existing.kind(),
                    to = %incoming.kind(),
                    "tightened"
                );
                Arc::clone(incoming)
            }
            Some(_) => Arc::clone(existing),
            None => {
                warn!(
                    term = %existing.label(),
                    cached = %existing.kind(),
                    resolved = %incoming.kind(),
                    "unrelated kinds for one term; keeping the cached object"
                );
                Arc::clone(existing)
            }
        }
    }

    fn bind(slots: &mut Slots, key: CacheKey, term: &TermRef) {
        if let Some(old) = slots.keys.insert(key.clone(), term.clone()) {
            if old != *term {
                if let Some(set) = slots.aliases.get_mut(&old) {
                    set.remove(&key);
                }
            }
        }
        slots.aliases.entry(term.clone()).or_default().insert(key);
    }

    /// Adds another key for a term that is already cached. Returns false if
    /// the term is not cached.
    pub fn alias(&self, key: CacheKey, term: &TermRef) -> bool {
        let mut slots = self.write();
        if !slots.objects.contains_key(term) {
            return false;
        }
        Self::bind(&mut slots, key, term);
        true
    }

    /// Removes a term, all of its keys, and its superseded history. Returns
    /// every object that was installed for it and is still alive, canonical
    /// first.
    ///
    /// The term is tombstoned even when nothing was cached for it, so a
    /// resolution of that term already in flight cannot install afterwards.
    pub fn evict(&self, term: &TermRef) -> Vec<Arc<FacadeObject>> {
        let mut slots = self.write();
        slots.generation += 1;
        let generation = slots.generation;
        slots.evicted_at.insert(term.clone(), generation);
        let mut evicted: Vec<Arc<FacadeObject>> = slots.objects.remove(term).into_iter().collect();
        if let Some(keys) = slots.aliases.remove(term) {
            for key in keys {
                if slots.keys.get(&key) == Some(term) {
                    slots.keys.remove(&key);
                }
            }
        }
        if let Some(history) = slots.superseded.remove(term) {
            evicted.extend(history.iter().filter_map(Weak::upgrade));
        }
        evicted
    }

    /// Drops every entry. Objects already handed out stay valid. Returns the
    /// number of terms dropped.
    pub fn clear(&self) -> usize {
        let mut slots = self.write();
        let dropped = slots.objects.len();
        slots.keys.clear();
        slots.objects.clear();
        slots.aliases.clear();
        slots.superseded.clear();
        slots.evicted_at.clear();
        slots.generation += 1;
        let generation = slots.generation;
        slots.cleared_at = generation;
        dropped
    }

    /// Returns a counter bumped by every eviction and clear. Pass it back to
    /// `install` to detect a clear, or an eviction of the installed term.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.read().generation
    }

    /// Returns the keys currently aliasing `term`.
    #[must_use]
    pub fn keys_for(&self, term: &TermRef) -> Vec<CacheKey> {
        self.read()
            .aliases
            .get(term)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Returns the number of cached terms.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().objects.len()
    }

    /// Returns true if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for IdentityCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let slots = self.read();
        f.debug_struct("IdentityCache")
            .field("terms", &slots.objects.len())
            .field("keys", &slots.keys.len())
            .field("generation", &slots.generation)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::test_object;
    use kbf_kinds::Kind;

    fn cache() -> IdentityCache {
        IdentityCache::new(Arc::new(KindRegistry::standard()))
    }

    fn keys(name: &str, term: &TermRef) -> Vec<CacheKey> {
        vec![
            CacheKey::Request(name.to_owned()),
            CacheKey::Canonical(name.to_owned()),
            CacheKey::Identity(term.clone()),
        ]
    }

    #[test]
    fn every_key_reaches_the_same_object() {
        let c = cache();
        let term = TermRef::constant("c1", "Dog");
        let obj = test_object(term.clone(), Kind::Collection);
        let installed = c.install(Arc::clone(&obj), keys("Dog", &term), 0).unwrap();
        assert!(Arc::ptr_eq(&installed, &obj));
        for key in keys("Dog", &term) {
            let hit = c.find(std::slice::from_ref(&key)).unwrap();
            assert!(Arc::ptr_eq(&hit, &obj), "{key:?}");
        }
        assert_eq!(c.keys_for(&term).len(), 3);
    }

    #[test]
    fn merge_keeps_the_most_specific_object() {
        let c = cache();
        let term = TermRef::constant("c2", "likes");
        let pred = test_object(term.clone(), Kind::Predicate);
        let rel = test_object(term.clone(), Kind::Relation);
        c.install(Arc::clone(&pred), keys("likes", &term), 0).unwrap();
        let kept = c.install(rel, vec![CacheKey::Request("c2".into())], 0).unwrap();
        assert!(Arc::ptr_eq(&kept, &pred));

        let binary = test_object(term.clone(), Kind::BinaryPredicate);
        let tightened = c.install(Arc::clone(&binary), vec![], 0).unwrap();
        assert!(Arc::ptr_eq(&tightened, &binary));
        let hit = c.find(&[CacheKey::Request("c2".into())]).unwrap();
        assert!(Arc::ptr_eq(&hit, &binary));
    }

    #[test]
    fn unrelated_kinds_keep_the_first_object() {
        let c = cache();
        let term = TermRef::constant("c3", "Thing1");
        let coll = test_object(term.clone(), Kind::Collection);
        c.install(Arc::clone(&coll), vec![], 0).unwrap();
        let kept = c.install(test_object(term.clone(), Kind::Individual), vec![], 0).unwrap();
        assert!(Arc::ptr_eq(&kept, &coll));
    }

    #[test]
    fn stale_generation_is_refused() {
        let c = cache();
        let term = TermRef::constant("c1", "Dog");
        let generation = c.generation();
        c.clear();
        let result = c.install(test_object(term, Kind::Collection), vec![], generation);
        assert_eq!(result.unwrap_err(), Superseded);
        assert!(c.is_empty());
    }

    #[test]
    fn evicting_one_term_leaves_other_installs_alone() {
        let c = cache();
        let dog = TermRef::constant("c1", "Dog");
        let generation = c.generation();
        for _ in 0..20 {
            assert!(c.evict(&TermRef::constant("zz", "SomethingElse")).is_empty());
        }
        let obj = test_object(dog.clone(), Kind::Collection);
        let installed = c.install(Arc::clone(&obj), keys("Dog", &dog), generation).unwrap();
        assert!(Arc::ptr_eq(&installed, &obj));
    }

    #[test]
    fn evicting_the_same_term_refuses_an_older_install() {
        let c = cache();
        let dog = TermRef::constant("c1", "Dog");
        let generation = c.generation();
        assert!(c.evict(&dog).is_empty());
        let result = c.install(test_object(dog.clone(), Kind::Collection), vec![], generation);
        assert_eq!(result.unwrap_err(), Superseded);
        assert!(c.is_empty());

        let fresh = c.generation();
        assert!(c.install(test_object(dog, Kind::Collection), vec![], fresh).is_ok());
    }

    #[test]
    fn evict_returns_superseded_objects_too() {
        let c = cache();
        let term = TermRef::constant("c2", "likes");
        let rel = test_object(term.clone(), Kind::Relation);
        let pred = test_object(term.clone(), Kind::Predicate);
        c.install(Arc::clone(&rel), keys("likes", &term), 0).unwrap();
        c.install(Arc::clone(&pred), vec![], 0).unwrap();
        let evicted = c.evict(&term);
        assert_eq!(evicted.len(), 2);
        assert!(Arc::ptr_eq(&evicted[0], &pred));
        assert!(c.find(&keys("likes", &term)).is_none());
        assert!(c.keys_for(&term).is_empty());
    }

    #[test]
    fn rebinding_a_key_moves_it_between_terms() {
        let c = cache();
        let old = TermRef::constant("c1", "Dog");
        let new = TermRef::constant("c9", "Dog");
        c.install(test_object(old.clone(), Kind::Collection), keys("Dog", &old), 0).unwrap();
        c.install(test_object(new.clone(), Kind::Collection), vec![CacheKey::Request("Dog".into())], 0)
            .unwrap();
        let hit = c.find(&[CacheKey::Request("Dog".into())]).unwrap();
        assert_eq!(hit.term().unwrap(), &new);
        assert_eq!(c.keys_for(&old).len(), 2);
    }

    #[test]
    fn alias_requires_a_cached_term() {
        let c = cache();
        let term = TermRef::constant("c1", "Dog");
        assert!(!c.alias(CacheKey::Request("c1".into()), &term));
        c.install(test_object(term.clone(), Kind::Collection), vec![], 0).unwrap();
        assert!(c.alias(CacheKey::Request("c1".into()), &term));
        assert!(c.find(&[CacheKey::Request("c1".into())]).is_some());
    }
}
