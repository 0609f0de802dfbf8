//! Property-based invariant tests for the publisher registry and selectors.
//!
//! Verifies structural guarantees of `Publisher` and `Selector`:
//!
//! 1. Registry size always equals the number of live subscriptions
//! 2. A pointer change notifies every live listener exactly once
//! 3. A pointer-identical commit notifies nobody
//! 4. Notification order is registration order
//! 5. A selector requests a re-render iff its projection changed
//! 6. Unsubscribing mid-pass never notifies the removed listener

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use ftui_store::{Publisher, RenderQueue, Selector, SiteId, Subscription};
use proptest::prelude::*;

// ── Helpers ──────────────────────────────────────────────────────────

#[derive(Debug)]
struct Snapshot {
    value: u8,
}

fn publisher(value: u8) -> Publisher<Snapshot, ()> {
    Publisher::new(Rc::new(Snapshot { value }), ())
}

#[derive(Debug, Clone)]
enum Op {
    Subscribe,
    Unsubscribe(usize),
    CommitNew(u8),
    CommitSame,
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => Just(Op::Subscribe),
        2 => (0usize..64).prop_map(Op::Unsubscribe),
        2 => any::<u8>().prop_map(Op::CommitNew),
        1 => Just(Op::CommitSame),
    ]
}

struct Tracked {
    subscription: Subscription,
    hits: Rc<Cell<u32>>,
    expected: u32,
}

// ═════════════════════════════════════════════════════════════════════════
// 1–3. Registry size and exactly-once fan-out under arbitrary churn
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn registry_matches_model(ops in proptest::collection::vec(arb_op(), 0..=80)) {
        let publisher = publisher(0);
        let mut tracked: Vec<Tracked> = Vec::new();

        for op in ops {
            match op {
                Op::Subscribe => {
                    let hits = Rc::new(Cell::new(0));
                    let h = Rc::clone(&hits);
                    let subscription = publisher.subscribe(move || h.set(h.get() + 1));
                    tracked.push(Tracked { subscription, hits, expected: 0 });
                }
                Op::Unsubscribe(idx) => {
                    if !tracked.is_empty() {
                        let t = &tracked[idx % tracked.len()];
                        // Repeated unsubscribes are no-ops.
                        t.subscription.unsubscribe();
                        t.subscription.unsubscribe();
                    }
                }
                Op::CommitNew(value) => {
                    let notified = publisher.commit(Rc::new(Snapshot { value }));
                    prop_assert!(notified);
                    prop_assert_eq!(publisher.get_state().value, value);
                    for t in tracked.iter_mut().filter(|t| t.subscription.is_active()) {
                        t.expected += 1;
                    }
                }
                Op::CommitSame => {
                    prop_assert!(!publisher.commit(publisher.get_state()));
                }
            }

            let live = tracked.iter().filter(|t| t.subscription.is_active()).count();
            prop_assert_eq!(publisher.listener_count(), live);
            for t in &tracked {
                prop_assert_eq!(t.hits.get(), t.expected);
            }
        }

        drop(tracked);
        prop_assert_eq!(publisher.listener_count(), 0);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Notification order is registration order
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn notification_order_is_registration_order(
        count in 1usize..=24,
        removed in proptest::collection::vec(any::<bool>(), 24),
    ) {
        let publisher = publisher(0);
        let order = Rc::new(RefCell::new(Vec::new()));
        let subs: Vec<Subscription> = (0..count)
            .map(|i| {
                let order = Rc::clone(&order);
                publisher.subscribe(move || order.borrow_mut().push(i))
            })
            .collect();
        for (i, sub) in subs.iter().enumerate() {
            if removed[i] {
                sub.unsubscribe();
            }
        }

        publisher.commit(Rc::new(Snapshot { value: 1 }));
        let expected: Vec<usize> = (0..count).filter(|&i| !removed[i]).collect();
        prop_assert_eq!(&*order.borrow(), &expected);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5. Selector re-renders iff its projection changed
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn selector_rerenders_iff_projection_changes(
        initial in any::<u8>(),
        values in proptest::collection::vec(0u8..4, 0..=60),
    ) {
        let publisher = publisher(initial);
        let queue = RenderQueue::new();
        let site = SiteId::next();
        let selector = Selector::attach(
            publisher.clone(),
            site,
            queue.clone(),
            |s: &Snapshot| s.value,
        );

        let mut previous = initial;
        let mut expected = 0u64;
        for value in values {
            publisher.commit(Rc::new(Snapshot { value }));
            let changed = value != previous;
            prop_assert_eq!(queue.is_pending(site), changed);
            queue.drain();
            if changed {
                expected += 1;
            }
            previous = value;
            prop_assert_eq!(selector.value(), value);
        }
        prop_assert_eq!(selector.renders_requested(), expected);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 6. Unsubscribing mid-pass never notifies the removed listener
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn mid_pass_unsubscribe_is_respected(
        count in 2usize..=16,
        remover in 0usize..16,
        target in 0usize..16,
    ) {
        let remover = remover % count;
        let target = target % count;
        let publisher = publisher(0);
        let slots: Rc<RefCell<Vec<Subscription>>> = Rc::new(RefCell::new(Vec::new()));
        let hits: Vec<Rc<Cell<u32>>> = (0..count).map(|_| Rc::new(Cell::new(0))).collect();

        for (i, hit) in hits.iter().enumerate() {
            let hit = Rc::clone(hit);
            let slots_ref = Rc::clone(&slots);
            let sub = publisher.subscribe(move || {
                hit.set(hit.get() + 1);
                if i == remover {
                    if let Some(sub) = slots_ref.borrow().get(target) {
                        sub.unsubscribe();
                    }
                }
            });
            slots.borrow_mut().push(sub);
        }

        publisher.commit(Rc::new(Snapshot { value: 1 }));
        for (i, hit) in hits.iter().enumerate() {
            let expected = if i == target && target > remover { 0 } else { 1 };
            prop_assert_eq!(hit.get(), expected, "listener {}", i);
        }
        prop_assert_eq!(publisher.listener_count(), count - 1);

        // Break the listener -> slots cycle.
        slots.borrow_mut().clear();
        prop_assert_eq!(publisher.listener_count(), 0);
    }
}
