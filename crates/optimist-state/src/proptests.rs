//! Property tests for the reconciliation store against a plain-vector model

use proptest::prelude::*;

use optimist_core::{HandleId, HandleMinter, RecordingExecutor};

use crate::{check_store, Completion, ReconciliationStore};

const HANDLES: usize = 4;

#[derive(Clone, Debug)]
enum Op {
    Submit(usize, i32),
    Complete(usize),
    Snapshot(Vec<i32>),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0..HANDLES, any::<i32>()).prop_map(|(h, v)| Op::Submit(h, v)),
        3 => (0..HANDLES).prop_map(Op::Complete),
        1 => prop::collection::vec(any::<i32>(), 0..4).prop_map(Op::Snapshot),
    ]
}

/// Insertion-ordered reference of the two maps
#[derive(Default)]
struct Model {
    snapshot: Vec<i32>,
    in_flight: Vec<(usize, i32)>,
    pending: Vec<(usize, i32)>,
    dispatched: Vec<(usize, i32)>,
}

impl Model {
    fn submit(&mut self, h: usize, v: i32) {
        if self.in_flight.iter().any(|(x, _)| *x == h) {
            self.pending.retain(|(x, _)| *x != h);
            self.pending.push((h, v));
        } else {
            self.in_flight.push((h, v));
            self.dispatched.push((h, v));
        }
    }

    fn complete(&mut self, h: usize) {
        self.in_flight.retain(|(x, _)| *x != h);
        if let Some(pos) = self.pending.iter().position(|(x, _)| *x == h) {
            let next = self.pending.remove(pos);
            self.in_flight.push(next);
            self.dispatched.push(next);
        }
    }

    fn view(&self) -> Vec<i32> {
        let mut view = self.snapshot.clone();
        view.extend(self.in_flight.iter().map(|(_, v)| *v));
        view.extend(self.pending.iter().map(|(_, v)| *v));
        view
    }
}

type PushFn = fn(&mut Vec<i32>, &i32);

fn push(draft: &mut Vec<i32>, action: &i32) {
    draft.push(*action);
}

fn fresh_store() -> ReconciliationStore<Vec<i32>, i32, (), PushFn, RecordingExecutor<i32, ()>> {
    ReconciliationStore::with_snapshot(Vec::new(), push as PushFn, RecordingExecutor::new())
}

proptest! {
    #[test]
    fn prop_store_matches_model(ops in prop::collection::vec(op(), 0..64)) {
        let minter = HandleMinter::new();
        let handles: Vec<HandleId> = (0..HANDLES).map(|_| minter.mint()).collect();
        let mut store = fresh_store();
        let mut model = Model::default();

        for op in ops {
            match op {
                Op::Submit(h, v) => {
                    store.submit(handles[h], v, ());
                    model.submit(h, v);
                }
                Op::Complete(h) => {
                    store.notify_complete(handles[h]);
                    model.complete(h);
                }
                Op::Snapshot(s) => {
                    store.set_authoritative(s.clone());
                    model.snapshot = s;
                }
            }

            prop_assert_eq!(check_store(&store), Ok(()));
            prop_assert_eq!(store.view().unwrap(), &model.view());
            prop_assert_eq!(store.authoritative().unwrap(), &model.snapshot);
        }

        let dispatched: Vec<(HandleId, i32)> = store
            .executor()
            .dispatched()
            .iter()
            .map(|(h, u)| (*h, *u.action()))
            .collect();
        let expected: Vec<(HandleId, i32)> =
            model.dispatched.iter().map(|(h, v)| (handles[*h], *v)).collect();
        prop_assert_eq!(dispatched, expected);
    }

    #[test]
    fn prop_view_without_updates_equals_snapshot(snapshot in prop::collection::vec(any::<i32>(), 0..16)) {
        let mut store = fresh_store();
        store.set_authoritative(snapshot.clone());
        prop_assert_eq!(store.view().unwrap(), &snapshot);
    }

    #[test]
    fn prop_coalescing_keeps_latest(values in prop::collection::vec(any::<i32>(), 2..10)) {
        let mut store = fresh_store();
        let h = HandleId::mint();

        for v in &values {
            store.submit(h, *v, ());
        }

        prop_assert_eq!(store.ledger().in_flight(h).map(|u| *u.action()), Some(values[0]));
        prop_assert_eq!(store.ledger().pending(h).map(|u| *u.action()), values.last().copied());
        prop_assert_eq!(store.ledger().pending_len(), 1);
        prop_assert_eq!(store.executor().len(), 1);
        prop_assert_eq!(store.view().unwrap(), &vec![values[0], values[values.len() - 1]]);
    }

    #[test]
    fn prop_stale_completion_changes_nothing(
        ops in prop::collection::vec(op(), 0..32),
        probe in 0..HANDLES,
    ) {
        let minter = HandleMinter::new();
        let handles: Vec<HandleId> = (0..HANDLES).map(|_| minter.mint()).collect();
        let mut store = fresh_store();

        for op in ops {
            match op {
                Op::Submit(h, v) => { store.submit(handles[h], v, ()); }
                Op::Complete(h) => { store.notify_complete(handles[h]); }
                Op::Snapshot(s) => store.set_authoritative(s),
            }
        }

        let handle = handles[probe];
        if !store.ledger().is_busy(handle) {
            let view = store.view().unwrap().clone();
            let active = store.ledger().active_len();
            let dispatches = store.executor().len();

            prop_assert_eq!(store.notify_complete(handle), Completion::Stale);
            prop_assert_eq!(store.view().unwrap(), &view);
            prop_assert_eq!(store.ledger().active_len(), active);
            prop_assert_eq!(store.executor().len(), dispatches);
        }
    }
}
