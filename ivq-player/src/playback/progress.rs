//! Progress snapshot aggregation
//!
//! The engine marks the reporter dirty on every snapshot-relevant mutation
//! and arms the debounce timer if it is not already running. When the timer
//! fires the reporter builds one snapshot for the whole burst and publishes
//! it only if it differs from the last one published.
//!
//! The timer is never re-armed while pending, so a steady stream of time
//! samples still produces one snapshot per debounce window instead of
//! starving the host.

use super::state::EngineState;
use ivq_common::model::{progress_percent, ProgressSnapshot};

#[derive(Debug, Default)]
pub struct ProgressReporter {
    dirty: bool,
    last_published: Option<ProgressSnapshot>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Snapshot of `state` for a schedule of `total_questions`
    pub fn snapshot(state: &EngineState, total_questions: usize) -> ProgressSnapshot {
        ProgressSnapshot {
            current_time: state.current_time,
            duration: state.duration,
            percent: progress_percent(state.current_time, state.duration),
            current_chapter_index: state.current_chapter_index,
            score: state.score,
            total_questions: total_questions as u32,
            answered_count: state.answered_count,
        }
    }

    /// Close the debounce window
    ///
    /// Returns the snapshot to publish, or `None` when nothing changed since
    /// the last publication.
    pub fn take_if_changed(
        &mut self,
        state: &EngineState,
        total_questions: usize,
    ) -> Option<ProgressSnapshot> {
        self.dirty = false;
        let snapshot = Self::snapshot(state, total_questions);
        if self.last_published.as_ref() == Some(&snapshot) {
            return None;
        }
        self.last_published = Some(snapshot.clone());
        Some(snapshot)
    }

    /// Forget the last publication (after a restart)
    pub fn reset(&mut self) {
        self.dirty = false;
        self.last_published = None;
    }
}
