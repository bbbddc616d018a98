//! Scroll position bookkeeping.
//!
//! Offsets are keyed by the derived frame-qualified selector of the
//! scrolled element. Restoration runs at most once per navigator: every
//! recorded entry becomes pending, entries leave the pending set when
//! restored or when the user scrolls the same element, and whatever is
//! still pending at the deadline is dropped from the map.

use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum RestorePhase {
    #[default]
    Idle,
    Active,
    Finished,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct ScrollState {
    positions: BTreeMap<String, f64>,
    pending: BTreeSet<String>,
    phase: RestorePhase,
}

impl ScrollState {
    pub(crate) const fn new(positions: BTreeMap<String, f64>) -> Self {
        Self {
            positions,
            pending: BTreeSet::new(),
            phase: RestorePhase::Idle,
        }
    }

    pub(crate) const fn positions(&self) -> &BTreeMap<String, f64> {
        &self.positions
    }

    /// Record a settled offset; a pending restore for the same key is
    /// cancelled
    pub(crate) fn record(&mut self, key: String, top: f64) {
        self.pending.remove(&key);
        self.positions.insert(key, top);
        self.settle();
    }

    /// Start restoring; false if restoration already ran or nothing is
    /// recorded
    pub(crate) fn begin_restore(&mut self) -> bool {
        if self.phase != RestorePhase::Idle {
            return false;
        }
        self.pending = self.positions.keys().cloned().collect();
        self.phase = if self.pending.is_empty() {
            RestorePhase::Finished
        } else {
            RestorePhase::Active
        };
        self.phase == RestorePhase::Active
    }

    pub(crate) fn is_restoring(&self) -> bool {
        self.phase == RestorePhase::Active
    }

    /// Pending keys with their recorded offsets
    pub(crate) fn pending_targets(&self) -> Vec<(String, f64)> {
        self.pending
            .iter()
            .filter_map(|key| self.positions.get(key).map(|top| (key.clone(), *top)))
            .collect()
    }

    /// Take a pending entry out for restoration; the scroll it triggers
    /// records it again
    pub(crate) fn claim(&mut self, key: &str) -> Option<f64> {
        if !self.pending.remove(key) {
            return None;
        }
        let top = self.positions.remove(key);
        self.settle();
        top
    }

    /// Forget an entry entirely
    pub(crate) fn discard(&mut self, key: &str) {
        self.pending.remove(key);
        self.positions.remove(key);
        self.settle();
    }

    /// Deadline reached: drop every still-pending entry
    pub(crate) fn expire(&mut self) -> Vec<String> {
        if self.phase != RestorePhase::Active {
            return Vec::new();
        }
        let dropped: Vec<String> = std::mem::take(&mut self.pending).into_iter().collect();
        for key in &dropped {
            self.positions.remove(key);
        }
        self.phase = RestorePhase::Finished;
        dropped
    }

    fn settle(&mut self) {
        if self.phase == RestorePhase::Active && self.pending.is_empty() {
            self.phase = RestorePhase::Finished;
        }
    }
}
