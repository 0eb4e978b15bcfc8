//! Process-local fallback for entries the store refused.

use std::{
    collections::VecDeque,
    sync::{Mutex, PoisonError},
};

use crate::domain::audit::models::AuditLogEntry;

pub const DEFAULT_EMERGENCY_CAPACITY: usize = 100;

/// Bounded ring buffer keeping the most recent unpersisted audit entries.
#[derive(Debug)]
pub struct EmergencyAuditLog {
    capacity: usize,
    entries: Mutex<VecDeque<AuditLogEntry>>,
}

impl Default for EmergencyAuditLog {
    fn default() -> Self {
        Self::new(DEFAULT_EMERGENCY_CAPACITY)
    }
}

impl EmergencyAuditLog {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);

        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Keep `entry`, evicting the oldest one when full.
    pub fn push(&self, entry: AuditLogEntry) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);

        if entries.len() == self.capacity {
            entries.pop_front();
        }

        entries.push_back(entry);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the buffered entries, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<AuditLogEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// Take every buffered entry, e.g. to replay them once the store recovers.
    pub fn drain(&self) -> Vec<AuditLogEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect()
    }
}
