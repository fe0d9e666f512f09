//! Identity-stable event snapshots.

use crate::core::{EventRecord, EventSnapshot};
use std::cell::RefCell;
use std::sync::Arc;

/// Holds the snapshot of the current event.
///
/// A snapshot is built on the first read after an event becomes current and
/// the same instance is returned for as long as the provider keeps handing
/// out the same event `Arc`. A different `Arc` is a different event, even if
/// its attributes are equal.
#[derive(Debug, Default)]
pub struct EventSnapshotCache {
    current: RefCell<Option<(Arc<EventRecord>, EventSnapshot)>>,
}

impl EventSnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot for `event`, reusing the cached one when the event is unchanged.
    ///
    /// Passing `None` drops the cached snapshot.
    pub fn resolve(&self, event: Option<Arc<EventRecord>>) -> Option<EventSnapshot> {
        let mut current = self.current.borrow_mut();

        let Some(event) = event else {
            *current = None;
            return None;
        };

        if let Some((cached_event, snapshot)) = current.as_ref() {
            if Arc::ptr_eq(cached_event, &event) {
                return Some(snapshot.clone());
            }
        }

        let snapshot = EventSnapshot::from_record(&event);
        tracing::debug!(
            event = snapshot.name().unwrap_or("<unnamed>"),
            "materialized event snapshot"
        );
        *current = Some((event, snapshot.clone()));
        Some(snapshot)
    }

    /// Whether a snapshot is currently cached.
    pub fn is_populated(&self) -> bool {
        self.current.borrow().is_some()
    }
}
