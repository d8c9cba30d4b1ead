//! Concurrent access to one factory from many threads.
//!
//! The knowledge base sleeps on every call so that resolutions overlap.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use kbf_memory::MemoryKb;
use kbfacade::{CacheKey, Factory, Kind};

fn slow_setup() -> (Arc<MemoryKb>, Factory) {
    let kb = Arc::new(MemoryKb::animals().unwrap().with_latency(Duration::from_millis(10)));
    let factory = Factory::new(kb.clone());
    (kb, factory)
}

#[test]
fn concurrent_find_or_create_creates_one_term() {
    let (kb, f) = slow_setup();
    let barrier = Barrier::new(2);
    let objects: Vec<_> = thread::scope(|s| {
        let handles: Vec<_> = (0..2)
            .map(|_| {
                s.spawn(|| {
                    barrier.wait();
                    f.find_or_create("Zebra", Kind::Collection)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap().unwrap()).collect()
    });
    assert_eq!(kb.create_calls(), 1);
    assert!(Arc::ptr_eq(&objects[0], &objects[1]));
    assert!(Arc::ptr_eq(&objects[0], &f.get("Zebra", Kind::Collection).unwrap()));
}

#[test]
fn concurrent_gets_agree_on_one_object() {
    let (_, f) = slow_setup();
    let threads = 8;
    let barrier = Barrier::new(threads);
    let objects: Vec<_> = thread::scope(|s| {
        let handles: Vec<_> = (0..threads)
            .map(|_| {
                s.spawn(|| {
                    barrier.wait();
                    f.get("Dog", Kind::Collection)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap().unwrap()).collect()
    });
    for object in &objects[1..] {
        assert!(Arc::ptr_eq(&objects[0], object));
    }
}

#[test]
fn different_keys_for_one_term_converge() {
    let (kb, f) = slow_setup();
    let term = kb.constant("likes").unwrap();
    let id = term.external_id().unwrap().to_owned();
    let barrier = Barrier::new(3);
    let objects: Vec<_> = thread::scope(|s| {
        let by_name = s.spawn(|| {
            barrier.wait();
            f.get("likes", Kind::Relation)
        });
        let by_id = s.spawn(|| {
            barrier.wait();
            f.get(id.as_str(), Kind::Predicate)
        });
        let by_term = s.spawn(|| {
            barrier.wait();
            f.get(&term, Kind::Object)
        });
        [by_name, by_id, by_term]
            .into_iter()
            .map(|h| h.join().unwrap().unwrap())
            .collect()
    });
    assert!(Arc::ptr_eq(&objects[0], &objects[1]));
    assert!(Arc::ptr_eq(&objects[0], &objects[2]));
    assert_eq!(objects[0].kind(), Kind::BinaryPredicate);
}

#[test]
fn invalidation_does_not_disturb_other_terms() {
    let (kb, f) = slow_setup();
    let fido = f.get("Fido", Kind::Individual).unwrap();
    let barrier = Barrier::new(2);
    thread::scope(|s| {
        s.spawn(|| {
            barrier.wait();
            kb.delete_term("Fido");
            f.invalidate(&fido);
        });
        s.spawn(|| {
            barrier.wait();
            let dog = f.get("Dog", Kind::Collection).unwrap();
            assert!(dog.is_valid());
        });
    });
    assert!(!fido.is_valid());
    assert!(f.get("Dog", Kind::Collection).unwrap().is_valid());
}

#[test]
fn unrelated_invalidations_never_starve_a_slow_get() {
    let (kb, f) = slow_setup();
    let rex = kb.constant("Rex").unwrap();
    let never_cached = kb.constant("Spot").unwrap();
    f.get("Rex", Kind::Individual).unwrap();
    let done = AtomicBool::new(false);
    let barrier = Barrier::new(2);
    let dog = thread::scope(|s| {
        s.spawn(|| {
            barrier.wait();
            while !done.load(Ordering::SeqCst) {
                f.invalidate_term(&rex);
                f.invalidate_term(&never_cached);
                thread::sleep(Duration::from_millis(1));
            }
        });
        let getter = s.spawn(|| {
            barrier.wait();
            let dog = f.get("Dog", Kind::Collection);
            done.store(true, Ordering::SeqCst);
            dog
        });
        getter.join().unwrap()
    })
    .unwrap();
    assert!(dog.is_valid());
    assert!(Arc::ptr_eq(&dog, &f.get("Dog", Kind::Collection).unwrap()));
}

#[test]
fn deletion_between_resolution_and_install_is_never_returned() {
    // The first classification of Dog parks until the other thread has
    // deleted and invalidated the term.
    let gate = Arc::new(Barrier::new(2));
    let parked = Arc::new(AtomicBool::new(false));
    let hook_gate = gate.clone();
    let hook_parked = parked.clone();
    let kb = Arc::new(MemoryKb::animals().unwrap().on_classify(move |term| {
        if term.name() == Some("Dog") && !hook_parked.swap(true, Ordering::SeqCst) {
            hook_gate.wait();
            hook_gate.wait();
        }
    }));
    let f = Factory::new(kb.clone());
    let dog_term = kb.constant("Dog").unwrap();

    let result = thread::scope(|s| {
        s.spawn(|| {
            gate.wait();
            kb.delete_term("Dog");
            f.invalidate_term(&dog_term);
            gate.wait();
        });
        s.spawn(|| f.get("Dog", Kind::Collection)).join().unwrap()
    });

    assert!(parked.load(Ordering::SeqCst));
    let err = result.unwrap_err();
    assert!(err.is_not_found(), "resolved before the deletion, got {err:?}");
    assert!(f.cache().keys_for(&dog_term).is_empty());
    assert!(f.cache().find(&[CacheKey::Identity(dog_term)]).is_none());
}
