//! Behavior of derived values: laziness, memoization, early cutoff, and
//! dependency maintenance across recomputations.

use std::cell::Cell;
use std::rc::Rc;

use signal_flow::{computed, signal, Computed};

/// Shared call counter for instrumenting computations.
fn counter() -> (Rc<Cell<u32>>, impl Fn() + Clone + 'static) {
    let count = Rc::new(Cell::new(0));
    let bump = {
        let count = count.clone();
        move || count.set(count.get() + 1)
    };
    (count, bump)
}

#[test]
fn creation_runs_nothing() {
    let (calls, bump) = counter();
    let _derived = computed(move || {
        bump();
        1
    });

    assert_eq!(calls.get(), 0);
}

#[test]
fn reads_are_memoized() {
    let (calls, bump) = counter();
    let source = signal(1);
    let doubled = computed({
        let source = source.clone();
        move || {
            bump();
            source.get() * 2
        }
    });

    assert_eq!(doubled.get().unwrap(), 2);
    for _ in 0..10 {
        assert_eq!(doubled.get().unwrap(), 2);
    }
    assert_eq!(calls.get(), 1);
}

#[test]
fn equal_write_then_real_write() {
    let (calls, bump) = counter();
    let source = signal(1);
    let doubled = computed({
        let source = source.clone();
        move || {
            bump();
            source.get() * 2
        }
    });

    assert_eq!(doubled.get().unwrap(), 2);
    assert_eq!(calls.get(), 1);

    // Writing the same value is a no-op end to end.
    source.set(1);
    assert_eq!(doubled.get().unwrap(), 2);
    assert_eq!(calls.get(), 1);

    source.set(3);
    assert_eq!(doubled.get().unwrap(), 6);
    assert_eq!(calls.get(), 2);
}

#[test]
fn equal_recomputation_cuts_off_downstream() {
    let (parity_calls, bump_parity) = counter();
    let (label_calls, bump_label) = counter();

    let source = signal(4);
    let parity = computed({
        let source = source.clone();
        move || {
            bump_parity();
            source.get() % 2
        }
    });
    let label = computed({
        let parity = parity.clone();
        move || {
            bump_label();
            if parity.get().unwrap() == 0 {
                "even"
            } else {
                "odd"
            }
        }
    });

    assert_eq!(label.get().unwrap(), "even");
    assert_eq!((parity_calls.get(), label_calls.get()), (1, 1));

    // 4 -> 6 changes the source but not the parity: the intermediate
    // recomputes, the downstream label does not.
    source.set(6);
    assert_eq!(label.get().unwrap(), "even");
    assert_eq!((parity_calls.get(), label_calls.get()), (2, 1));

    source.set(7);
    assert_eq!(label.get().unwrap(), "odd");
    assert_eq!((parity_calls.get(), label_calls.get()), (3, 2));
}

#[test]
fn conditional_dependency_is_dropped() {
    let (calls, bump) = counter();
    let use_primary = signal(true);
    let primary = signal(1);
    let fallback = signal(2);

    let chosen = computed({
        let use_primary = use_primary.clone();
        let primary = primary.clone();
        let fallback = fallback.clone();
        move || {
            bump();
            if use_primary.get() {
                primary.get()
            } else {
                fallback.get()
            }
        }
    });

    assert_eq!(chosen.get().unwrap(), 1);
    assert_eq!(calls.get(), 1);

    use_primary.set(false);
    assert_eq!(chosen.get().unwrap(), 2);
    assert_eq!(calls.get(), 2);

    // `primary` was not read on the latest run: changing it must neither
    // mark the derived value stale nor trigger recomputation.
    primary.set(99);
    assert_eq!(chosen.get().unwrap(), 2);
    assert_eq!(calls.get(), 2);

    fallback.set(3);
    assert_eq!(chosen.get().unwrap(), 3);
    assert_eq!(calls.get(), 3);
}

#[test]
fn diamond_reads_are_consistent() {
    let (calls, bump) = counter();
    let source = signal(1);
    let left = computed({
        let source = source.clone();
        move || source.get() + 1
    });
    let right = computed({
        let source = source.clone();
        move || source.get() * 10
    });
    let sum = computed({
        let left = left.clone();
        let right = right.clone();
        move || {
            bump();
            left.get().unwrap() + right.get().unwrap()
        }
    });

    assert_eq!(sum.get().unwrap(), 12);
    assert_eq!(calls.get(), 1);

    source.set(2);
    // Both arms are refreshed before the sum runs: one recomputation, no
    // intermediate observed from a half-updated pair.
    assert_eq!(sum.get().unwrap(), 23);
    assert_eq!(calls.get(), 2);
}

#[test]
fn derived_values_chain() {
    let source = signal(2);
    let squared = computed({
        let source = source.clone();
        move || {
            let v = source.get();
            v * v
        }
    });
    let described = computed({
        let squared = squared.clone();
        move || format!("square = {}", squared.get().unwrap())
    });

    assert_eq!(described.get().unwrap(), "square = 4");

    source.set(3);
    assert_eq!(described.get().unwrap(), "square = 9");
}

#[test]
fn custom_equality_suppresses_change() {
    let (downstream_calls, bump) = counter();
    let source = signal(10);
    // Bucket values by tens; 10 and 19 are the same bucket.
    let bucket = Computed::with_equal(
        {
            let source = source.clone();
            move || source.get()
        },
        |a, b| a / 10 == b / 10,
    );
    let seen = computed({
        let bucket = bucket.clone();
        move || {
            bump();
            bucket.get().unwrap()
        }
    });

    assert_eq!(seen.get().unwrap(), 10);
    source.set(19);
    // Recomputed, judged equal: the previous value is retained downstream.
    assert_eq!(seen.get().unwrap(), 10);
    assert_eq!(downstream_calls.get(), 1);

    source.set(25);
    assert_eq!(seen.get().unwrap(), 25);
    assert_eq!(downstream_calls.get(), 2);
}
