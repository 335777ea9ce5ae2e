//! Player view model
//!
//! [`PlayerView`] is everything a UI needs to draw one frame of player
//! chrome: the time label, progress, chapter, markers, the question overlay
//! and which controls accept input. It is built from a borrowed engine and
//! serializes to camelCase JSON for UIs living outside the process.

use super::controls::ControlAvailability;
use super::Viewport;
use crate::playback::evaluator::word_count;
use crate::playback::TriggerEngine;
use ivq_common::events::PlaybackPhase;
use ivq_common::human_time::{format_clock, format_clock_pair};
use ivq_common::model::{progress_percent, CaptionTrack, QuestionId, QuestionKind, QuestionType};
use serde::Serialize;
use std::fmt::Write as _;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    /// Metadata not loaded yet, or the media failed
    pub loading: bool,
    pub error: Option<String>,
    /// Poster image shown while loading
    pub poster: Option<String>,
    /// Requested player size in pixels; the host layout decides when unset
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Caption tracks to attach to the media element
    pub captions: Vec<CaptionTrack>,
    pub phase: PlaybackPhase,
    /// `current / duration`
    pub time_label: String,
    pub percent: f64,
    pub chapter_title: Option<String>,
    /// Chapter list (empty while the chapters panel is closed)
    pub chapters: Vec<ChapterEntry>,
    pub markers: Vec<QuestionMarker>,
    pub controls: ControlAvailability,
    pub overlay: Option<QuestionOverlay>,
    /// Narrow viewport; use the compact control layout
    pub compact: bool,
    pub volume: f32,
    pub muted: bool,
    /// `score/total`
    pub score_label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterEntry {
    pub index: usize,
    pub title: String,
    pub start_label: String,
    pub active: bool,
}

/// Seek-bar marker for one question
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionMarker {
    pub question_id: QuestionId,
    /// Position along the bar (0-100)
    pub percent: f64,
    pub answered: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionView {
    pub id: String,
    pub text: String,
    pub selected: bool,
    /// Tried and found wrong
    pub disabled: bool,
}

/// Question overlay drawn over the paused video
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionOverlay {
    pub question_id: QuestionId,
    pub question_type: QuestionType,
    pub prompt: String,
    pub options: Vec<OptionView>,
    pub text: String,
    pub word_count: usize,
    pub min_words: Option<u32>,
    pub placeholder: Option<String>,
    pub rating: Option<u32>,
    pub scale: Option<u32>,
    /// Author feedback, shown once the answer is accepted
    pub feedback: Option<String>,
    /// Seconds until playback resumes
    pub countdown: Option<u32>,
    pub attempts: u32,
    /// The last submission was wrong
    pub retry: bool,
}

impl PlayerView {
    pub fn build(engine: &TriggerEngine, viewport: &dyn Viewport, compact_breakpoint_px: u32) -> Self {
        let state = engine.state();
        let schedule = engine.schedule();
        let active = engine.active_question();

        let chapters = if state.chapters_panel_open {
            schedule
                .chapters()
                .iter()
                .enumerate()
                .map(|(index, chapter)| ChapterEntry {
                    index,
                    title: chapter.title.clone(),
                    start_label: format_clock(chapter.start_time),
                    active: state.current_chapter_index == Some(index),
                })
                .collect()
        } else {
            Vec::new()
        };

        let markers = schedule
            .markers()
            .map(|(question_id, trigger_time)| QuestionMarker {
                question_id,
                percent: progress_percent(trigger_time, state.duration),
                answered: state.is_answered(question_id),
            })
            .collect();

        let overlay = active.map(|question| {
            let draft = &state.draft;
            let mut overlay = QuestionOverlay {
                question_id: question.id,
                question_type: question.question_type(),
                prompt: question.prompt_text.clone(),
                options: Vec::new(),
                text: draft.text.clone(),
                word_count: word_count(&draft.text),
                min_words: None,
                placeholder: None,
                rating: draft.rating,
                scale: None,
                feedback: None,
                countdown: state.countdown_remaining,
                attempts: draft.attempts,
                retry: state.last_verdict.is_some_and(|v| !v.is_correct),
            };
            match &question.kind {
                QuestionKind::MultipleChoice { options } => {
                    overlay.options = options
                        .iter()
                        .map(|o| OptionView {
                            id: o.id.clone(),
                            text: o.text.clone(),
                            selected: draft.selected_option.as_deref() == Some(o.id.as_str()),
                            disabled: draft.disabled_options.contains(&o.id),
                        })
                        .collect();
                }
                QuestionKind::TextInput { .. } => {}
                QuestionKind::Essay { min_words, placeholder } => {
                    overlay.min_words = Some(*min_words);
                    overlay.placeholder = Some(placeholder.clone());
                }
                QuestionKind::Rating { scale } => overlay.scale = Some(*scale),
            }
            if state.phase == PlaybackPhase::FeedbackCountdown && !question.feedback.is_empty() {
                overlay.feedback = Some(question.feedback.clone());
            }
            overlay
        });

        let props = engine.props();
        let loading = state.is_loading();
        Self {
            loading,
            error: state.loading_error.clone(),
            poster: if loading { props.poster.clone() } else { None },
            width: props.width,
            height: props.height,
            captions: props.captions.clone(),
            phase: state.phase,
            time_label: format_clock_pair(state.current_time, state.duration),
            percent: progress_percent(state.current_time, state.duration),
            chapter_title: state
                .current_chapter_index
                .and_then(|i| schedule.chapter(i))
                .map(|c| c.title.clone()),
            chapters,
            markers,
            controls: ControlAvailability::from_state(state, active),
            overlay,
            compact: viewport.viewport_width() < compact_breakpoint_px,
            volume: state.volume,
            muted: state.muted,
            score_label: format!("{}/{}", state.score, schedule.questions().len()),
        }
    }
}

impl QuestionOverlay {
    /// Plain-text rendering for terminal front ends
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "[{}] {}", self.question_type, self.prompt);
        for option in &self.options {
            let mark = if option.disabled { "x" } else { " " };
            let _ = writeln!(out, "  [{}] {}) {}", mark, option.id, option.text);
        }
        if let Some(scale) = self.scale {
            let _ = writeln!(out, "  Rate 1-{}", scale);
        }
        if let Some(min_words) = self.min_words {
            let _ = writeln!(out, "  At least {} words ({} so far)", min_words, self.word_count);
        }
        if self.retry {
            let _ = writeln!(out, "  Not quite, try again (attempt {})", self.attempts + 1);
        }
        if let Some(feedback) = &self.feedback {
            let _ = writeln!(out, "  {}", feedback);
        }
        if let Some(countdown) = self.countdown {
            let _ = writeln!(out, "  Continuing in {}s", countdown);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::surface::{RecordingSurface, SurfaceEvent};
    use crate::playback::timers::ManualTimers;
    use crate::presentation::FixedViewport;
    use ivq_common::config::TimingConfig;
    use ivq_common::events::EventBus;
    use ivq_common::model::{AnswerOption, Chapter, NextAction, PlayerProps, Question};

    fn engine() -> TriggerEngine {
        engine_with(PlayerProps::new("lesson.mp4"))
    }

    fn engine_with(mut props: PlayerProps) -> TriggerEngine {
        props.auto_play = true;
        props.poster = Some("poster.jpg".to_string());
        props.chapters = vec![
            Chapter { id: 1, title: "Intro".to_string(), start_time: 0.0, end_time: 30.0, description: String::new() },
            Chapter { id: 2, title: "Body".to_string(), start_time: 30.0, end_time: 120.0, description: String::new() },
        ];
        props.questions = vec![Question {
            id: 1,
            trigger_time: 31.0,
            prompt_text: "Which?".to_string(),
            feedback: "b it is".to_string(),
            next_action: NextAction::Continue,
            branches: None,
            kind: QuestionKind::MultipleChoice {
                options: vec![
                    AnswerOption { id: "a".to_string(), text: "A".to_string(), is_correct: false },
                    AnswerOption { id: "b".to_string(), text: "B".to_string(), is_correct: true },
                ],
            },
        }];
        TriggerEngine::new(
            props,
            TimingConfig::default(),
            Box::new(RecordingSurface::new()),
            Box::new(ManualTimers::new()),
            EventBus::default(),
        )
    }

    #[test]
    fn test_loading_view() {
        let engine = engine();
        let view = PlayerView::build(&engine, &FixedViewport(1024), 768);
        assert!(view.loading);
        assert_eq!(view.poster.as_deref(), Some("poster.jpg"));
        assert_eq!(view.time_label, "0:00 / 0:00");
        assert_eq!(view.percent, 0.0);
        assert!(!view.compact);
        assert!(!view.controls.seek_bar);
    }

    #[test]
    fn test_question_overlay_reflects_draft() {
        let mut engine = engine();
        engine.handle_surface_event(SurfaceEvent::MetadataLoaded { duration: 120.0 });
        engine.handle_surface_event(SurfaceEvent::TimeAdvanced { current_time: 30.9 });
        engine.select_option("a");
        engine.submit();

        let view = PlayerView::build(&engine, &FixedViewport(400), 768);
        assert!(view.compact);
        assert_eq!(view.chapter_title.as_deref(), Some("Body"));
        assert_eq!(view.time_label, "0:30 / 2:00");

        let overlay = view.overlay.unwrap();
        assert!(overlay.retry);
        assert_eq!(overlay.attempts, 1);
        assert!(overlay.options[0].disabled);
        assert!(!overlay.options[1].disabled);
        assert!(overlay.feedback.is_none());
        assert!(overlay.render_text().contains("[x] a) A"));

        assert_eq!(view.markers.len(), 1);
        assert!((view.markers[0].percent - 25.833).abs() < 0.01);
        assert!(!view.markers[0].answered);
    }

    #[test]
    fn test_feedback_and_countdown_after_accept() {
        let mut engine = engine();
        engine.handle_surface_event(SurfaceEvent::MetadataLoaded { duration: 120.0 });
        engine.handle_surface_event(SurfaceEvent::TimeAdvanced { current_time: 30.9 });
        engine.select_option("b");
        engine.submit();

        let view = PlayerView::build(&engine, &FixedViewport(1024), 768);
        let overlay = view.overlay.unwrap();
        assert_eq!(overlay.feedback.as_deref(), Some("b it is"));
        assert_eq!(overlay.countdown, Some(5));
        assert!(view.controls.continue_button);
        assert_eq!(view.score_label, "1/1");
        assert!(view.markers[0].answered);
    }

    #[test]
    fn test_chapter_panel_lists_chapters() {
        let mut engine = engine();
        engine.handle_surface_event(SurfaceEvent::MetadataLoaded { duration: 120.0 });
        engine.handle_surface_event(SurfaceEvent::TimeAdvanced { current_time: 5.0 });
        assert!(PlayerView::build(&engine, &FixedViewport(1024), 768).chapters.is_empty());

        engine.apply_intent(crate::playback::UserIntent::ToggleChaptersPanel);
        let view = PlayerView::build(&engine, &FixedViewport(1024), 768);
        assert_eq!(view.chapters.len(), 2);
        assert!(view.chapters[0].active);
        assert_eq!(view.chapters[1].start_label, "0:30");
    }

    #[test]
    fn test_captions_and_size_reach_the_view() {
        let mut props = PlayerProps::new("lesson.mp4");
        props.width = Some(640);
        props.height = Some(360);
        props.captions = vec![CaptionTrack {
            src: "captions/en.vtt".to_string(),
            src_lang: "en".to_string(),
            label: "English".to_string(),
            kind: Some("subtitles".to_string()),
        }];
        let mut engine = engine_with(props);
        engine.handle_surface_event(SurfaceEvent::MetadataLoaded { duration: 120.0 });

        let view = PlayerView::build(&engine, &FixedViewport(1024), 768);
        assert_eq!((view.width, view.height), (Some(640), Some(360)));
        assert_eq!(view.captions.len(), 1);
        assert_eq!(view.captions[0].src_lang, "en");

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["captions"][0]["srcLang"], "en");
        assert_eq!(json["width"], 640);
    }
}
