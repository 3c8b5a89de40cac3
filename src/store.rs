use std::collections::VecDeque;

use crate::models::PredictionResult;

pub const HISTORY_CAPACITY: usize = 5;

/// Most recent predictions, newest first. Only [`HistoryStore::push`] grows
/// it, and it drops the oldest entry past capacity.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    entries: VecDeque<PredictionResult>,
    capacity: usize,
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        HistoryStore {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, result: PredictionResult) {
        self.entries.push_front(result);
        self.entries.truncate(self.capacity);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn latest(&self) -> Option<&PredictionResult> {
        self.entries.front()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PredictionResult> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
