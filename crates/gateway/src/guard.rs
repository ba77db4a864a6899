//! Resubmission guard: at most one in-flight submission per key.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use partsdesk_core::PartRequestId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SubmissionKey {
    Decision(PartRequestId),
    NewPartRequest,
    NewUser,
    NewWorkshop,
    NewRole,
}

#[derive(Clone, Debug, Default)]
pub struct SubmissionGuard {
    in_flight: Arc<Mutex<HashSet<SubmissionKey>>>,
}

/// Held for the duration of a submission; releases its key on drop.
#[derive(Debug)]
pub struct SubmissionTicket {
    key: SubmissionKey,
    in_flight: Arc<Mutex<HashSet<SubmissionKey>>>,
}

impl SubmissionGuard {
    /// `None` when the same key is already in flight.
    pub fn try_acquire(&self, key: SubmissionKey) -> Option<SubmissionTicket> {
        let inserted = match self.in_flight.lock() {
            Ok(mut keys) => keys.insert(key),
            Err(poisoned) => poisoned.into_inner().insert(key),
        };
        inserted.then(|| SubmissionTicket { key, in_flight: Arc::clone(&self.in_flight) })
    }

    pub fn is_in_flight(&self, key: SubmissionKey) -> bool {
        match self.in_flight.lock() {
            Ok(keys) => keys.contains(&key),
            Err(poisoned) => poisoned.into_inner().contains(&key),
        }
    }
}

impl SubmissionTicket {
    pub fn key(&self) -> SubmissionKey {
        self.key
    }
}

impl Drop for SubmissionTicket {
    fn drop(&mut self) {
        match self.in_flight.lock() {
            Ok(mut keys) => keys.remove(&self.key),
            Err(poisoned) => poisoned.into_inner().remove(&self.key),
        };
    }
}
