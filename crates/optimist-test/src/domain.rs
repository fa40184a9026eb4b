//! Keyed-record domain used by the harnesses
//!
//! `Set` is idempotent, `Bump` is not, so a harness that applied an update
//! twice or in the wrong order would see a different view.

use std::collections::BTreeMap;

use optimist_state::ReconciliationStore;
use optimist_core::RecordingExecutor;

pub type Records = BTreeMap<u8, u32>;

/// Request tag carried as transport options
pub type RequestTag = u64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordAction {
    Set { key: u8, value: u32 },
    Bump { key: u8 },
}

pub type ApplyRecordFn = fn(&mut Records, &RecordAction);

pub type RecordStore =
    ReconciliationStore<Records, RecordAction, RequestTag, ApplyRecordFn, RecordingExecutor<RecordAction, RequestTag>>;

pub fn apply_record_action(draft: &mut Records, action: &RecordAction) {
    match *action {
        RecordAction::Set { key, value } => {
            draft.insert(key, value);
        }
        RecordAction::Bump { key } => {
            let entry = draft.entry(key).or_insert(0);
            *entry = entry.wrapping_add(1);
        }
    }
}

/// Store over `Records` with a recording executor
pub fn record_store(snapshot: Records) -> RecordStore {
    ReconciliationStore::with_snapshot(
        snapshot,
        apply_record_action as ApplyRecordFn,
        RecordingExecutor::new(),
    )
}
