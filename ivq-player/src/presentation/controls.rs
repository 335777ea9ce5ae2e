//! Control enable/disable rules

use crate::playback::state::EngineState;
use ivq_common::events::PlaybackPhase;
use ivq_common::model::Question;
use serde::Serialize;

/// Which player controls accept input
///
/// While a question holds the player (or media is still loading) the
/// timeline controls are disabled; volume and mute always work. Question
/// markers stay clickable so any question can be force-opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlAvailability {
    pub play_pause: bool,
    pub seek_bar: bool,
    pub chapter_navigation: bool,
    pub volume: bool,
    pub mute: bool,
    pub question_markers: bool,
    pub answer_inputs: bool,
    pub submit: bool,
    pub continue_button: bool,
    pub restart: bool,
}

impl ControlAvailability {
    /// Derive availability from engine state and the active question
    pub fn from_state(state: &EngineState, active: Option<&Question>) -> Self {
        let loading = state.is_loading();
        let timeline = !loading && state.active_question.is_none();
        let answering = state.phase == PlaybackPhase::QuestionActive && active.is_some();

        Self {
            play_pause: timeline,
            seek_bar: timeline,
            chapter_navigation: timeline,
            volume: true,
            mute: true,
            question_markers: !loading,
            answer_inputs: answering,
            submit: answering && active.is_some_and(|q| state.draft.can_submit(&q.kind)),
            continue_button: state.phase == PlaybackPhase::FeedbackCountdown,
            restart: !loading,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ivq_common::model::{NextAction, QuestionKind};

    fn rating_question() -> Question {
        Question {
            id: 4,
            trigger_time: 12.0,
            prompt_text: "Rate it".to_string(),
            feedback: String::new(),
            next_action: NextAction::Continue,
            branches: None,
            kind: QuestionKind::Rating { scale: 5 },
        }
    }

    #[test]
    fn test_loading_disables_timeline() {
        let state = EngineState::default();
        let controls = ControlAvailability::from_state(&state, None);
        assert!(!controls.play_pause);
        assert!(!controls.seek_bar);
        assert!(!controls.question_markers);
        assert!(controls.volume && controls.mute);
    }

    #[test]
    fn test_question_locks_timeline_and_gates_submit() {
        let question = rating_question();
        let mut state = EngineState::default();
        state.duration = 60.0;
        state.phase = PlaybackPhase::QuestionActive;
        state.active_question = Some(question.id);

        let controls = ControlAvailability::from_state(&state, Some(&question));
        assert!(!controls.play_pause && !controls.seek_bar && !controls.chapter_navigation);
        assert!(controls.answer_inputs);
        assert!(!controls.submit);
        assert!(controls.question_markers);

        state.draft.rating = Some(3);
        assert!(ControlAvailability::from_state(&state, Some(&question)).submit);
    }

    #[test]
    fn test_countdown_enables_continue_only() {
        let question = rating_question();
        let mut state = EngineState::default();
        state.duration = 60.0;
        state.phase = PlaybackPhase::FeedbackCountdown;
        state.active_question = Some(question.id);

        let controls = ControlAvailability::from_state(&state, Some(&question));
        assert!(controls.continue_button);
        assert!(!controls.answer_inputs);
        assert!(!controls.seek_bar);
    }
}
