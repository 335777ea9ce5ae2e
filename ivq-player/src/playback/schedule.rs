//! Schedule index: chapter lookup and due-question detection
//!
//! Built once from the host-supplied chapters and questions. Chapter indexes
//! returned here always refer to the host's chapter array (the index never
//! reorders it), so they can be reported back unchanged.
//!
//! **Design:**
//! - Chapters sorted by start (the common case) use a binary search; an
//!   unsorted table falls back to a linear scan and logs a warning once
//! - Times falling into a gap between chapters keep the previous chapter
//! - Due questions are returned in schedule order

use ivq_common::model::{Chapter, Question, QuestionId, QuestionKind};
use ivq_common::{Error, Result};
use std::collections::{HashMap, HashSet};
use tracing::warn;

/// Lookup structure over one schedule
#[derive(Debug, Clone)]
pub struct ScheduleIndex {
    chapters: Vec<Chapter>,
    questions: Vec<Question>,
    /// Question id → position in `questions`
    by_id: HashMap<QuestionId, usize>,
    /// Chapters sorted by start and non-overlapping
    chapters_sorted: bool,
    /// Trigger tolerance (seconds)
    epsilon: f64,
}

impl ScheduleIndex {
    /// Build an index over a schedule
    ///
    /// Structural problems (duplicate ids, inverted chapters) are treated as
    /// host precondition violations: development builds assert on them,
    /// release builds carry on with the first occurrence of a duplicate id.
    pub fn new(chapters: Vec<Chapter>, questions: Vec<Question>, epsilon: f64) -> Self {
        debug_assert!(
            validate_schedule(&chapters, &questions, None).is_ok(),
            "malformed schedule: {:?}",
            validate_schedule(&chapters, &questions, None).err()
        );

        let chapters_sorted = chapters
            .windows(2)
            .all(|w| w[0].start_time <= w[1].start_time && w[0].end_time <= w[1].start_time);
        if !chapters_sorted {
            warn!("Chapters are not sorted and non-overlapping; using linear chapter lookup");
        }

        let mut by_id = HashMap::with_capacity(questions.len());
        for (pos, question) in questions.iter().enumerate() {
            by_id.entry(question.id).or_insert(pos);
        }

        Self {
            chapters,
            questions,
            by_id,
            chapters_sorted,
            epsilon,
        }
    }

    pub fn chapters(&self) -> &[Chapter] {
        &self.chapters
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn question(&self, id: QuestionId) -> Option<&Question> {
        self.by_id.get(&id).map(|&pos| &self.questions[pos])
    }

    pub fn chapter(&self, index: usize) -> Option<&Chapter> {
        self.chapters.get(index)
    }

    /// Index of the chapter containing `t`
    ///
    /// Returns `previous` when `t` falls in a gap (or before the first
    /// chapter, or after the last), so a gap never signals a change.
    pub fn chapter_at(&self, t: f64, previous: Option<usize>) -> Option<usize> {
        let found = if self.chapters_sorted {
            // First chapter starting after t; the candidate is the one before
            let after = self.chapters.partition_point(|c| c.start_time <= t);
            after
                .checked_sub(1)
                .filter(|&i| self.chapters[i].contains(t))
        } else {
            self.chapters.iter().position(|c| c.contains(t))
        };
        found.or(previous)
    }

    /// Questions with `|t - trigger_time| < epsilon`, in schedule order
    pub fn questions_due_at(&self, t: f64) -> Vec<&Question> {
        self.questions
            .iter()
            .filter(|q| (t - q.trigger_time).abs() < self.epsilon)
            .collect()
    }

    /// Due questions not present in `answered`
    pub fn unanswered_at<V>(&self, t: f64, answered: &HashMap<QuestionId, V>) -> Vec<&Question> {
        self.questions_due_at(t)
            .into_iter()
            .filter(|q| !answered.contains_key(&q.id))
            .collect()
    }

    /// Question markers as `(id, trigger_time)` pairs, in schedule order
    pub fn markers(&self) -> impl Iterator<Item = (QuestionId, f64)> + '_ {
        self.questions.iter().map(|q| (q.id, q.trigger_time))
    }
}

/// Check a schedule against its invariants
///
/// `duration` enables the trigger-range check once the media length is
/// known. Unsorted or overlapping chapters are allowed (logged by the index).
pub fn validate_schedule(
    chapters: &[Chapter],
    questions: &[Question],
    duration: Option<f64>,
) -> Result<()> {
    let mut problems = Vec::new();

    let mut chapter_ids = HashSet::new();
    for chapter in chapters {
        if !chapter_ids.insert(chapter.id) {
            problems.push(format!("duplicate chapter id {}", chapter.id));
        }
        if !(chapter.end_time > chapter.start_time) {
            problems.push(format!(
                "chapter {} ends at {} before it starts at {}",
                chapter.id, chapter.end_time, chapter.start_time
            ));
        }
    }

    let mut question_ids = HashSet::new();
    for question in questions {
        if !question_ids.insert(question.id) {
            problems.push(format!("duplicate question id {}", question.id));
        }

        let t = question.trigger_time;
        if !t.is_finite() || t < 0.0 {
            problems.push(format!("question {} has invalid trigger time {}", question.id, t));
        } else if let Some(d) = duration.filter(|d| *d > 0.0) {
            if t > d {
                problems.push(format!(
                    "question {} triggers at {} past the end of the media ({})",
                    question.id, t, d
                ));
            }
        }

        match &question.kind {
            QuestionKind::Rating { scale: 0 } => {
                problems.push(format!("rating question {} has scale 0", question.id));
            }
            QuestionKind::MultipleChoice { options } if options.is_empty() => {
                problems.push(format!("multiple-choice question {} has no options", question.id));
            }
            _ => {}
        }

        if question.is_branching() && question.branches.as_ref().map_or(true, |b| b.is_empty()) {
            problems.push(format!("branch question {} defines no branches", question.id));
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(Error::MalformedSchedule(problems.join("; ")))
    }
}
