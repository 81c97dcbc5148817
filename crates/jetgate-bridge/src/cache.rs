//! Last-known device status.
//!
//! A single process-wide snapshot, replaced wholesale on every inbound
//! status message and read by any number of HTTP handlers.  There is no
//! merge: whatever the device last published is the truth.  Readers get a
//! clone; acceptable staleness is part of the contract.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use jetgate_types::StatusSnapshot;

/// Cloneable handle to the shared snapshot.  All clones observe the same
/// value; only the bridge session's inbound path writes it.
#[derive(Clone, Debug, Default)]
pub struct StatusCache {
    inner: Arc<RwLock<Slot>>,
}

#[derive(Debug, Default)]
struct Slot {
    snapshot: Option<StatusSnapshot>,
    received_at: Option<DateTime<Utc>>,
}

impl StatusCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the snapshot wholesale and stamp the receive time.
    pub fn set(&self, snapshot: StatusSnapshot) {
        let mut slot = self.inner.write().unwrap_or_else(|e| e.into_inner());
        slot.snapshot = Some(snapshot);
        slot.received_at = Some(Utc::now());
    }

    /// The latest snapshot, or `None` if no status has ever arrived.
    pub fn get(&self) -> Option<StatusSnapshot> {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .snapshot
            .clone()
    }

    /// When the current snapshot arrived.  Useful for staleness logging.
    pub fn last_received(&self) -> Option<DateTime<Utc>> {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .received_at
    }

    pub fn is_empty(&self) -> bool {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .snapshot
            .is_none()
    }
}
