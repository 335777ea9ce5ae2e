//! Engine state
//!
//! [`EngineState`] is the single source of truth for one player. Only the
//! trigger engine mutates it; the progress reporter and presentation layer
//! read clones or borrows.

use super::evaluator::{word_count, AnswerInput, Evaluation};
use ivq_common::events::PlaybackPhase;
use ivq_common::model::{QuestionId, QuestionKind, UserAnswer};
use std::collections::{BTreeSet, HashMap};

/// Complete engine state
#[derive(Debug, Clone, PartialEq)]
pub struct EngineState {
    pub phase: PlaybackPhase,
    /// Transport is (or has been told to be) playing
    pub playing: bool,
    /// Last processed playback time (seconds)
    pub current_time: f64,
    /// Media duration (0 until metadata loads)
    pub duration: f64,
    /// Listener volume (0.0-1.0); the resume ramp targets this value
    pub volume: f32,
    pub muted: bool,
    pub current_chapter_index: Option<usize>,
    /// Question holding the player, if any
    pub active_question: Option<QuestionId>,
    pub answers_by_id: HashMap<QuestionId, UserAnswer>,
    pub score: u32,
    pub answered_count: u32,
    pub chapters_panel_open: bool,
    /// Answer being composed for the active question
    pub draft: AnswerDraft,
    /// Remaining countdown ticks while in `FeedbackCountdown`
    pub countdown_remaining: Option<u32>,
    /// Current ramp step while in `Resuming`
    pub fade_step: Option<u32>,
    /// Verdict of the last submission for the active question
    pub last_verdict: Option<Evaluation>,
    /// Transport failure message; the player renders as loading while set
    pub loading_error: Option<String>,
}

impl EngineState {
    pub fn new(volume: f32, muted: bool) -> Self {
        Self {
            phase: PlaybackPhase::PausedIdle,
            playing: false,
            current_time: 0.0,
            duration: 0.0,
            volume: volume.clamp(0.0, 1.0),
            muted,
            current_chapter_index: None,
            active_question: None,
            answers_by_id: HashMap::new(),
            score: 0,
            answered_count: 0,
            chapters_panel_open: false,
            draft: AnswerDraft::default(),
            countdown_remaining: None,
            fade_step: None,
            last_verdict: None,
            loading_error: None,
        }
    }

    /// Metadata has not arrived (or loading failed)
    pub fn is_loading(&self) -> bool {
        self.duration <= 0.0 || self.loading_error.is_some()
    }

    pub fn is_answered(&self, id: QuestionId) -> bool {
        self.answers_by_id.contains_key(&id)
    }
}

impl Default for EngineState {
    fn default() -> Self {
        Self::new(1.0, false)
    }
}

/// Answer being composed for the active question
///
/// The submit control is enabled only while [`AnswerDraft::can_submit`]
/// holds, so an empty or out-of-range submission never reaches the
/// evaluator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerDraft {
    pub selected_option: Option<String>,
    /// Options already tried and found wrong
    pub disabled_options: BTreeSet<String>,
    pub text: String,
    pub rating: Option<u32>,
    /// Rejected submissions so far
    pub attempts: u32,
}

impl AnswerDraft {
    /// Select an option; disabled or unknown options are refused
    pub fn select_option(&mut self, kind: &QuestionKind, option_id: &str) -> bool {
        let known = match kind {
            QuestionKind::MultipleChoice { options } => options.iter().any(|o| o.id == option_id),
            _ => false,
        };
        if !known || self.disabled_options.contains(option_id) {
            return false;
        }
        self.selected_option = Some(option_id.to_string());
        true
    }

    /// Select a rating value; values outside `[1, scale]` are refused
    pub fn select_rating(&mut self, kind: &QuestionKind, value: u32) -> bool {
        match kind {
            QuestionKind::Rating { scale } if (1..=*scale).contains(&value) => {
                self.rating = Some(value);
                true
            }
            _ => false,
        }
    }

    /// Whether the submit control is enabled
    pub fn can_submit(&self, kind: &QuestionKind) -> bool {
        match kind {
            QuestionKind::MultipleChoice { .. } => self
                .selected_option
                .as_ref()
                .is_some_and(|id| !self.disabled_options.contains(id)),
            QuestionKind::TextInput { .. } => !self.text.trim().is_empty(),
            QuestionKind::Essay { min_words, .. } => word_count(&self.text) >= *min_words as usize,
            QuestionKind::Rating { scale } => self.rating.is_some_and(|r| (1..=*scale).contains(&r)),
        }
    }

    /// The draft as evaluator input, if it can be submitted
    pub fn to_input(&self, kind: &QuestionKind) -> Option<AnswerInput> {
        if !self.can_submit(kind) {
            return None;
        }
        match kind {
            QuestionKind::MultipleChoice { .. } => {
                self.selected_option.clone().map(AnswerInput::Option)
            }
            QuestionKind::TextInput { .. } | QuestionKind::Essay { .. } => {
                Some(AnswerInput::Text(self.text.clone()))
            }
            QuestionKind::Rating { .. } => self.rating.map(AnswerInput::Rating),
        }
    }

    /// Apply a rejected attempt: disable the tried option, clear text
    ///
    /// Other options keep their state.
    pub fn reject(&mut self) {
        if let Some(id) = self.selected_option.take() {
            self.disabled_options.insert(id);
        }
        self.text.clear();
        self.attempts += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ivq_common::model::AnswerOption;

    fn choices() -> QuestionKind {
        QuestionKind::MultipleChoice {
            options: ["a", "b", "c"]
                .iter()
                .map(|id| AnswerOption {
                    id: id.to_string(),
                    text: id.to_uppercase(),
                    is_correct: *id == "b",
                })
                .collect(),
        }
    }

    #[test]
    fn test_new_state_is_paused_and_loading() {
        let state = EngineState::new(1.4, true);
        assert_eq!(state.phase, PlaybackPhase::PausedIdle);
        assert_eq!(state.volume, 1.0);
        assert!(state.muted);
        assert!(state.is_loading());
        assert_eq!(state.current_chapter_index, None);
    }

    #[test]
    fn test_draft_gates_submit() {
        let kind = choices();
        let mut draft = AnswerDraft::default();
        assert!(!draft.can_submit(&kind));
        assert!(draft.to_input(&kind).is_none());

        assert!(draft.select_option(&kind, "a"));
        assert_eq!(draft.to_input(&kind), Some(AnswerInput::Option("a".to_string())));
        assert!(!draft.select_option(&kind, "zzz"));
    }

    #[test]
    fn test_reject_disables_only_selected_option() {
        let kind = choices();
        let mut draft = AnswerDraft::default();
        draft.select_option(&kind, "a");
        draft.reject();

        assert_eq!(draft.selected_option, None);
        assert!(draft.disabled_options.contains("a"));
        assert!(!draft.disabled_options.contains("c"));
        assert_eq!(draft.attempts, 1);
        assert!(!draft.select_option(&kind, "a"));
        assert!(draft.select_option(&kind, "c"));
    }

    #[test]
    fn test_essay_and_rating_gating() {
        let essay = QuestionKind::Essay { min_words: 3, placeholder: String::new() };
        let mut draft = AnswerDraft { text: "two words".to_string(), ..Default::default() };
        assert!(!draft.can_submit(&essay));
        draft.text.push_str(" more");
        assert!(draft.can_submit(&essay));

        let rating = QuestionKind::Rating { scale: 5 };
        let mut draft = AnswerDraft::default();
        assert!(!draft.select_rating(&rating, 6));
        assert!(!draft.can_submit(&rating));
        assert!(draft.select_rating(&rating, 5));
        assert_eq!(draft.to_input(&rating), Some(AnswerInput::Rating(5)));
    }
}
