//! Suspension of dependency recording.

use std::cell::Cell;
use std::rc::Rc;

use signal_flow::{computed, signal, untracked};

#[test]
fn untracked_read_is_not_a_dependency() {
    let calls = Rc::new(Cell::new(0));
    let peeked = signal(1);
    let derived = computed({
        let calls = calls.clone();
        let peeked = peeked.clone();
        move || {
            calls.set(calls.get() + 1);
            untracked(|| peeked.get());
            1
        }
    });

    assert_eq!(derived.get().unwrap(), 1);
    assert_eq!(calls.get(), 1);

    // The untracked read left no edge: this write reaches nobody.
    peeked.set(2);
    assert_eq!(derived.get().unwrap(), 1);
    assert_eq!(calls.get(), 1);
}

#[test]
fn tracking_resumes_after_untracked_scope() {
    let tracked = signal(1);
    let peeked = signal(10);
    let sum = computed({
        let tracked = tracked.clone();
        let peeked = peeked.clone();
        move || untracked(|| peeked.get()) + tracked.get()
    });

    assert_eq!(sum.get().unwrap(), 11);

    peeked.set(20);
    assert_eq!(sum.get().unwrap(), 11);

    // The read after the untracked scope was tracked as usual; the
    // recomputation it triggers also picks up the fresh peeked value.
    tracked.set(2);
    assert_eq!(sum.get().unwrap(), 22);
}

#[test]
fn untracked_scopes_nest() {
    let inner = signal(1);
    let outer = signal(2);
    let derived = computed({
        let inner = inner.clone();
        let outer = outer.clone();
        move || untracked(|| untracked(|| inner.get()) + outer.get())
    });

    assert_eq!(derived.get().unwrap(), 3);

    // Both reads happened untracked, at either nesting depth.
    inner.set(100);
    outer.set(100);
    assert_eq!(derived.get().unwrap(), 3);
}

#[test]
fn untracked_getter_matches_untracked_scope() {
    let calls = Rc::new(Cell::new(0));
    let peeked = signal(5);
    let derived = computed({
        let calls = calls.clone();
        let peeked = peeked.clone();
        move || {
            calls.set(calls.get() + 1);
            peeked.get_untracked()
        }
    });

    assert_eq!(derived.get().unwrap(), 5);
    peeked.set(6);
    assert_eq!(derived.get().unwrap(), 5);
    assert_eq!(calls.get(), 1);
}

#[test]
fn untracked_outside_any_consumer_is_harmless() {
    let value = signal(3);
    assert_eq!(untracked(|| value.get()), 3);
}
