//! Test helper modules for ivq-player integration tests
//!
//! - `Harness`: an engine wired to a recording surface and manual timers
//! - Schedule builders for the common question types

#![allow(dead_code)]

use ivq_common::config::TimingConfig;
use ivq_common::events::{EventBus, PlayerEvent};
use ivq_common::model::{
    AnswerOption, BranchTarget, Branches, Chapter, NextAction, PlayerProps, Question, QuestionId,
    QuestionKind,
};
use ivq_player::playback::{ManualTimers, RecordingSurface, SurfaceEvent, TimerKind};
use ivq_player::TriggerEngine;
use tokio::sync::broadcast;

pub struct Harness {
    pub engine: TriggerEngine,
    pub surface: RecordingSurface,
    pub timers: ManualTimers,
    pub events: broadcast::Receiver<PlayerEvent>,
}

impl Harness {
    /// Engine with autoPlay, metadata already loaded
    pub fn playing(mut props: PlayerProps, duration: f64) -> Self {
        props.auto_play = true;
        let mut harness = Self::new(props, TimingConfig::default());
        harness.engine.handle_surface_event(SurfaceEvent::MetadataLoaded { duration });
        harness
    }

    pub fn new(props: PlayerProps, timing: TimingConfig) -> Self {
        let surface = RecordingSurface::new();
        let timers = ManualTimers::new();
        let bus = EventBus::new(1024);
        let events = bus.subscribe();
        let engine = TriggerEngine::new(
            props,
            timing,
            Box::new(surface.clone()),
            Box::new(timers.clone()),
            bus,
        );
        Self {
            engine,
            surface,
            timers,
            events,
        }
    }

    pub fn sample(&mut self, t: f64) {
        self.engine
            .handle_surface_event(SurfaceEvent::TimeAdvanced { current_time: t });
    }

    /// Fire the armed timer of `kind`; false if none was armed
    pub fn fire(&mut self, kind: TimerKind) -> bool {
        match self.timers.fire(kind) {
            Some(token) => {
                self.engine.on_timer(token);
                true
            }
            None => false,
        }
    }

    /// Fire `kind` until nothing of that kind is armed; returns the count
    pub fn fire_all(&mut self, kind: TimerKind) -> usize {
        let mut fired = 0;
        while self.fire(kind) {
            fired += 1;
        }
        fired
    }

    pub fn drain_events(&mut self) -> Vec<PlayerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }

    pub fn active_id(&self) -> Option<QuestionId> {
        self.engine.state().active_question
    }
}

pub fn chapter(id: u32, title: &str, start: f64, end: f64) -> Chapter {
    Chapter {
        id,
        title: title.to_string(),
        start_time: start,
        end_time: end,
        description: String::new(),
    }
}

fn question(id: QuestionId, trigger: f64, kind: QuestionKind) -> Question {
    Question {
        id,
        trigger_time: trigger,
        prompt_text: format!("Question {}", id),
        feedback: format!("Feedback {}", id),
        next_action: NextAction::Continue,
        branches: None,
        kind,
    }
}

/// Multiple choice with options a, b, c; `correct` is the right one
pub fn multiple_choice(id: QuestionId, trigger: f64, correct: &str) -> Question {
    let options = ["a", "b", "c"]
        .iter()
        .map(|option| AnswerOption {
            id: option.to_string(),
            text: option.to_uppercase(),
            is_correct: *option == correct,
        })
        .collect();
    question(id, trigger, QuestionKind::MultipleChoice { options })
}

pub fn text_input(id: QuestionId, trigger: f64, correct: &str) -> Question {
    question(
        id,
        trigger,
        QuestionKind::TextInput {
            correct_answer: correct.to_string(),
        },
    )
}

pub fn essay(id: QuestionId, trigger: f64, min_words: u32) -> Question {
    question(
        id,
        trigger,
        QuestionKind::Essay {
            min_words,
            placeholder: "Your thoughts".to_string(),
        },
    )
}

pub fn rating(id: QuestionId, trigger: f64, scale: u32) -> Question {
    question(id, trigger, QuestionKind::Rating { scale })
}

/// Branching rating with low/medium/high targets
pub fn branching_rating(id: QuestionId, trigger: f64, low: f64, medium: f64, high: f64) -> Question {
    let mut q = rating(id, trigger, 5);
    q.next_action = NextAction::Branch;
    q.branches = Some(Branches {
        low: Some(BranchTarget { jump_to: low }),
        medium: Some(BranchTarget { jump_to: medium }),
        high: Some(BranchTarget { jump_to: high }),
    });
    q
}

/// Props for a two-chapter lesson: [0, 30) and [30, 120)
pub fn lesson(questions: Vec<Question>) -> PlayerProps {
    let mut props = PlayerProps::new("lesson.mp4");
    props.chapters = vec![
        chapter(1, "Introduction", 0.0, 30.0),
        chapter(2, "Main topic", 30.0, 120.0),
    ];
    props.questions = questions;
    props
}
