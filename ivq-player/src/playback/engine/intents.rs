//! User intents forwarded by the presentation layer

use super::core::TriggerEngine;
use crate::playback::evaluator::{evaluate, resolve_branch, AnswerInput};
use crate::playback::state::EngineState;
use crate::playback::timers::TimerKind;
use ivq_common::events::{PlaybackPhase, PlayerEvent, PresentTrigger};
use ivq_common::model::{QuestionId, QuestionKind, UserAnswer};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// An action requested by the viewer
#[derive(Debug, Clone, PartialEq)]
pub enum UserIntent {
    /// Play/pause button
    TogglePlay,
    /// Seek-bar click or drag (seconds)
    Seek(f64),
    /// Chapter list entry (index into the chapter array)
    JumpToChapter(usize),
    /// Volume slider (0.0-1.0)
    SetVolume(f32),
    ToggleMute,
    ToggleChaptersPanel,
    /// Question marker click
    OpenQuestion(QuestionId),
    SelectOption(String),
    SetText(String),
    SelectRating(u32),
    Submit,
    /// Skip the rest of the countdown-to-continue
    Continue,
    /// Reset the session and play from the start
    Restart,
}

/// What an intent did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentOutcome {
    Applied,
    /// Refused in the current phase (e.g. seeking while a question is open)
    Ignored,
    Submitted(SubmitOutcome),
}

/// Result of a submit intent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// No question open or the draft cannot be submitted
    Ignored,
    /// Incorrect answer; the question stays open
    Retry,
    /// Answer recorded
    Accepted { is_correct: bool },
}

fn applied(done: bool) -> IntentOutcome {
    if done {
        IntentOutcome::Applied
    } else {
        IntentOutcome::Ignored
    }
}

impl TriggerEngine {
    /// Apply one user intent
    pub fn apply_intent(&mut self, intent: UserIntent) -> IntentOutcome {
        debug!("Intent {:?} in phase {}", intent, self.state.phase);
        match intent {
            UserIntent::TogglePlay => applied(self.toggle_play()),
            UserIntent::Seek(time) => applied(self.seek(time)),
            UserIntent::JumpToChapter(index) => applied(self.jump_to_chapter(index)),
            UserIntent::SetVolume(volume) => {
                self.set_volume(volume);
                IntentOutcome::Applied
            }
            UserIntent::ToggleMute => {
                self.toggle_mute();
                IntentOutcome::Applied
            }
            UserIntent::ToggleChaptersPanel => {
                self.state.chapters_panel_open = !self.state.chapters_panel_open;
                IntentOutcome::Applied
            }
            UserIntent::OpenQuestion(id) => applied(self.open_question(id)),
            UserIntent::SelectOption(option_id) => applied(self.select_option(&option_id)),
            UserIntent::SetText(text) => applied(self.set_text(text)),
            UserIntent::SelectRating(value) => applied(self.select_rating(value)),
            UserIntent::Submit => IntentOutcome::Submitted(self.submit()),
            UserIntent::Continue => applied(self.continue_now()),
            UserIntent::Restart => {
                self.restart();
                IntentOutcome::Applied
            }
        }
    }

    /// True while seek, play/pause and chapter navigation are refused
    fn timeline_locked(&self) -> bool {
        self.state.active_question.is_some() || self.state.is_loading()
    }

    // ========================================
    // Transport controls
    // ========================================

    pub fn toggle_play(&mut self) -> bool {
        if self.timeline_locked() {
            return false;
        }
        if self.state.phase.is_playing() {
            self.cancel_fade();
            self.surface_playing(false);
            self.state.playing = false;
            self.set_phase(PlaybackPhase::PausedIdle);
        } else {
            self.surface_playing(true);
            self.state.playing = true;
            self.set_phase(PlaybackPhase::Playing);
        }
        true
    }

    pub fn seek(&mut self, time: f64) -> bool {
        if self.timeline_locked() {
            return false;
        }
        if self.state.phase == PlaybackPhase::Resuming {
            self.cancel_fade();
            self.set_phase(PlaybackPhase::Playing);
        }
        match self.surface_seek(time) {
            Some(target) => {
                debug!("Seek to {:.2}s", target);
                self.note_seek(target);
                true
            }
            None => false,
        }
    }

    pub fn jump_to_chapter(&mut self, index: usize) -> bool {
        let Some(start) = self.schedule.chapter(index).map(|c| c.start_time) else {
            warn!("Ignoring jump to unknown chapter index {}", index);
            return false;
        };
        self.seek(start)
    }

    /// Set the listener volume; cancels an in-flight fade-in
    pub fn set_volume(&mut self, volume: f32) {
        let volume = volume.clamp(0.0, 1.0);
        self.state.volume = volume;
        if self.state.phase == PlaybackPhase::Resuming {
            self.cancel_timer(TimerKind::FadeIn);
            self.state.fade_step = None;
            self.set_phase(PlaybackPhase::Playing);
        }
        self.surface_volume(volume);
    }

    pub fn toggle_mute(&mut self) {
        self.state.muted = !self.state.muted;
        let muted = self.state.muted;
        self.surface_muted(muted);
    }

    /// Force-open a question from its seek-bar marker
    ///
    /// Works from any phase: pending timers are cancelled, playback is
    /// paused at the question's trigger time. Re-opening an answered
    /// question allows a new answer that replaces the recorded one.
    pub fn open_question(&mut self, id: QuestionId) -> bool {
        let Some(trigger_time) = self.schedule.question(id).map(|q| q.trigger_time) else {
            warn!("Ignoring marker for unknown question {}", id);
            return false;
        };
        if self.state.phase == PlaybackPhase::QuestionActive && self.state.active_question == Some(id) {
            return false;
        }

        let at_time = match self.surface_seek(trigger_time) {
            Some(target) => {
                self.note_seek(target);
                target
            }
            None => self.state.current_time,
        };
        self.present(id, PresentTrigger::Marker, at_time);
        true
    }

    // ========================================
    // Answering
    // ========================================

    fn active_kind(&self) -> Option<QuestionKind> {
        if self.state.phase != PlaybackPhase::QuestionActive {
            return None;
        }
        self.active_question().map(|q| q.kind.clone())
    }

    pub fn select_option(&mut self, option_id: &str) -> bool {
        match self.active_kind() {
            Some(kind) => self.state.draft.select_option(&kind, option_id),
            None => false,
        }
    }

    pub fn set_text(&mut self, text: String) -> bool {
        match self.active_kind() {
            Some(QuestionKind::TextInput { .. }) | Some(QuestionKind::Essay { .. }) => {
                self.state.draft.text = text;
                true
            }
            _ => false,
        }
    }

    pub fn select_rating(&mut self, value: u32) -> bool {
        match self.active_kind() {
            Some(kind) => self.state.draft.select_rating(&kind, value),
            None => false,
        }
    }

    /// Evaluate the draft of the active question
    ///
    /// An accepted answer is recorded (replacing an earlier answer to the
    /// same question without scoring it twice), published, and starts the
    /// countdown-to-continue. An incorrect answer leaves the question open.
    pub fn submit(&mut self) -> SubmitOutcome {
        if self.state.phase != PlaybackPhase::QuestionActive {
            return SubmitOutcome::Ignored;
        }
        let Some(question) = self.active_question().cloned() else {
            return SubmitOutcome::Ignored;
        };
        let Some(input) = self.state.draft.to_input(&question.kind) else {
            debug!("Submit refused: answer for question {} incomplete", question.id);
            return SubmitOutcome::Ignored;
        };

        let verdict = evaluate(&question, &input);
        if !verdict.accepted {
            return SubmitOutcome::Ignored;
        }
        self.state.last_verdict = Some(verdict);

        if !verdict.is_correct {
            self.state.draft.reject();
            debug!(
                "Question {} answered incorrectly (attempt {})",
                question.id, self.state.draft.attempts
            );
            return SubmitOutcome::Retry;
        }

        let question_type = question.question_type();
        let answer = UserAnswer {
            answer: input.as_answer_string(),
            is_correct: verdict.is_correct,
            timestamp_seconds: self.state.current_time,
            question_type,
        };
        let previous = self.state.answers_by_id.insert(question.id, answer.clone());
        if previous.is_none() {
            self.state.answered_count += 1;
        }
        let previously_scored = previous.as_ref().is_some_and(answer_scores);
        if verdict.counts_toward_score && !previously_scored {
            self.state.score += 1;
        }

        if let AnswerInput::Rating(rating) = input {
            self.pending_branch = resolve_branch(&question, rating).map(|d| (question.id, d));
        }

        info!(
            "Question {} answered (correct: {}, score {}, answered {}/{})",
            question.id,
            verdict.is_correct,
            self.state.score,
            self.state.answered_count,
            self.schedule.questions().len()
        );
        self.emit(PlayerEvent::QuestionAnswered {
            session_id: self.session_id,
            question_id: question.id,
            answer,
            timestamp: chrono::Utc::now(),
        });
        self.mark_progress();
        self.start_countdown();

        SubmitOutcome::Accepted {
            is_correct: verdict.is_correct,
        }
    }

    // ========================================
    // Restart
    // ========================================

    /// Reset the session wholesale and play from the start
    ///
    /// Volume, mute and the known duration survive; answers, score and
    /// every pending timer do not.
    pub fn restart(&mut self) {
        self.slots.cancel_all(self.timers.as_mut());

        let old_session_id = self.session_id;
        self.session_id = Uuid::new_v4();

        let mut state = EngineState::new(self.state.volume, self.state.muted);
        state.duration = self.state.duration;
        state.loading_error = self.state.loading_error.take();
        self.state = state;
        self.progress.reset();
        self.last_sample = None;
        self.seek_guard = None;
        self.trigger_anchor = None;
        self.pending_branch = None;
        self.pending_loop = false;

        info!("Session restarted: {} -> {}", old_session_id, self.session_id);
        self.emit(PlayerEvent::SessionRestarted {
            old_session_id,
            new_session_id: self.session_id,
            timestamp: chrono::Utc::now(),
        });

        let volume = self.state.volume;
        self.surface_volume(volume);
        if let Some(target) = self.surface_seek(0.0) {
            self.note_seek(target);
        }
        self.surface_playing(true);
        self.state.playing = true;
        self.set_phase(PlaybackPhase::Playing);
        self.mark_progress();
    }
}

/// Whether a recorded answer contributed a point
fn answer_scores(answer: &UserAnswer) -> bool {
    answer.is_correct && answer.question_type.is_graded()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::surface::{RecordingSurface, SurfaceEvent};
    use crate::playback::timers::ManualTimers;
    use ivq_common::config::TimingConfig;
    use ivq_common::events::EventBus;
    use ivq_common::model::{AnswerOption, NextAction, PlayerProps, Question};

    fn playing_engine(questions: Vec<Question>) -> (TriggerEngine, RecordingSurface, ManualTimers) {
        let mut props = PlayerProps::new("lesson.mp4");
        props.questions = questions;
        props.auto_play = true;
        let surface = RecordingSurface::new();
        let timers = ManualTimers::new();
        let mut engine = TriggerEngine::new(
            props,
            TimingConfig::default(),
            Box::new(surface.clone()),
            Box::new(timers.clone()),
            EventBus::default(),
        );
        engine.handle_surface_event(SurfaceEvent::MetadataLoaded { duration: 120.0 });
        (engine, surface, timers)
    }

    fn text_question(id: QuestionId, trigger: f64) -> Question {
        Question {
            id,
            trigger_time: trigger,
            prompt_text: "Capital of France?".to_string(),
            feedback: "Paris".to_string(),
            next_action: NextAction::Continue,
            branches: None,
            kind: QuestionKind::TextInput {
                correct_answer: "Paris".to_string(),
            },
        }
    }

    fn choice_question(id: QuestionId, trigger: f64) -> Question {
        Question {
            id,
            trigger_time: trigger,
            prompt_text: "Pick".to_string(),
            feedback: String::new(),
            next_action: NextAction::Continue,
            branches: None,
            kind: QuestionKind::MultipleChoice {
                options: vec![
                    AnswerOption { id: "a".to_string(), text: "A".to_string(), is_correct: false },
                    AnswerOption { id: "b".to_string(), text: "B".to_string(), is_correct: true },
                ],
            },
        }
    }

    #[test]
    fn test_timeline_controls_ignored_during_question() {
        let (mut engine, surface, _timers) = playing_engine(vec![choice_question(1, 10.0)]);
        engine.handle_surface_event(SurfaceEvent::TimeAdvanced { current_time: 10.0 });
        assert_eq!(engine.phase(), PlaybackPhase::QuestionActive);
        surface.clear();

        assert_eq!(engine.apply_intent(UserIntent::TogglePlay), IntentOutcome::Ignored);
        assert_eq!(engine.apply_intent(UserIntent::Seek(50.0)), IntentOutcome::Ignored);
        assert_eq!(engine.apply_intent(UserIntent::JumpToChapter(0)), IntentOutcome::Ignored);
        assert!(surface.commands().is_empty());

        // Volume and mute stay available
        assert_eq!(engine.apply_intent(UserIntent::SetVolume(0.5)), IntentOutcome::Applied);
        assert_eq!(engine.apply_intent(UserIntent::ToggleMute), IntentOutcome::Applied);
        assert_eq!(surface.last_volume(), Some(0.5));
        assert!(engine.state().muted);
    }

    #[test]
    fn test_text_retry_clears_text() {
        let (mut engine, _surface, _timers) = playing_engine(vec![text_question(1, 10.0)]);
        engine.handle_surface_event(SurfaceEvent::TimeAdvanced { current_time: 10.0 });

        assert_eq!(engine.apply_intent(UserIntent::Submit), IntentOutcome::Submitted(SubmitOutcome::Ignored));
        engine.apply_intent(UserIntent::SetText("Lyon".to_string()));
        assert_eq!(engine.submit(), SubmitOutcome::Retry);
        assert_eq!(engine.state().draft.text, "");
        assert_eq!(engine.state().answered_count, 0);

        engine.apply_intent(UserIntent::SetText("  paris ".to_string()));
        assert_eq!(engine.submit(), SubmitOutcome::Accepted { is_correct: true });
        assert_eq!(engine.state().score, 1);
        assert_eq!(engine.phase(), PlaybackPhase::FeedbackCountdown);
        assert_eq!(engine.state().countdown_remaining, Some(5));
    }

    #[test]
    fn test_reopen_answered_question_does_not_double_count() {
        let (mut engine, _surface, _timers) = playing_engine(vec![choice_question(1, 10.0)]);
        engine.handle_surface_event(SurfaceEvent::TimeAdvanced { current_time: 10.0 });
        engine.select_option("b");
        engine.submit();
        engine.continue_now();
        assert_eq!(engine.state().score, 1);

        assert!(engine.open_question(1));
        assert_eq!(engine.phase(), PlaybackPhase::QuestionActive);
        assert!(engine.state().draft.disabled_options.is_empty());
        engine.select_option("b");
        assert_eq!(engine.submit(), SubmitOutcome::Accepted { is_correct: true });

        assert_eq!(engine.state().score, 1);
        assert_eq!(engine.state().answered_count, 1);
    }

    #[test]
    fn test_answer_controls_ignored_without_question() {
        let (mut engine, _surface, _timers) = playing_engine(vec![choice_question(1, 10.0)]);
        assert!(!engine.select_option("b"));
        assert!(!engine.set_text("x".to_string()));
        assert_eq!(engine.submit(), SubmitOutcome::Ignored);
        assert!(!engine.continue_now());
    }

    #[test]
    fn test_open_unknown_question_is_ignored() {
        let (mut engine, _surface, _timers) = playing_engine(vec![]);
        assert_eq!(engine.apply_intent(UserIntent::OpenQuestion(42)), IntentOutcome::Ignored);
        assert_eq!(engine.phase(), PlaybackPhase::Playing);
    }

    #[test]
    fn test_restart_resets_session() {
        let (mut engine, surface, timers) = playing_engine(vec![choice_question(1, 10.0)]);
        engine.handle_surface_event(SurfaceEvent::TimeAdvanced { current_time: 10.0 });
        engine.select_option("b");
        engine.submit();
        let old_session = engine.session_id();
        assert!(timers.armed(TimerKind::Countdown).is_some());

        engine.apply_intent(UserIntent::Restart);

        assert_ne!(engine.session_id(), old_session);
        assert_eq!(engine.state().score, 0);
        assert!(engine.state().answers_by_id.is_empty());
        assert_eq!(engine.state().duration, 120.0);
        assert_eq!(engine.phase(), PlaybackPhase::Playing);
        assert!(timers.armed(TimerKind::Countdown).is_none());
        assert_eq!(surface.seeks().last(), Some(&0.0));

        // The question triggers again in the new session
        for t in [0.25, 5.0, 10.1] {
            engine.handle_surface_event(SurfaceEvent::TimeAdvanced { current_time: t });
        }
        assert_eq!(engine.phase(), PlaybackPhase::QuestionActive);
    }

    #[test]
    fn test_seek_during_fade_cancels_it() {
        let (mut engine, surface, timers) = playing_engine(vec![choice_question(1, 10.0)]);
        engine.handle_surface_event(SurfaceEvent::TimeAdvanced { current_time: 10.0 });
        engine.select_option("b");
        engine.submit();
        engine.continue_now();
        assert_eq!(engine.phase(), PlaybackPhase::Resuming);
        assert!(timers.armed(TimerKind::FadeIn).is_some());

        assert!(engine.seek(60.0));
        assert_eq!(engine.phase(), PlaybackPhase::Playing);
        assert!(timers.armed(TimerKind::FadeIn).is_none());
        assert_eq!(surface.last_volume(), Some(1.0));
    }
}
