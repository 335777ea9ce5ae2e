//! Playback subsystem
//!
//! Time source adapter, schedule index, answer evaluation, engine state,
//! the trigger engine itself, timers and progress reporting.

pub mod engine;
pub mod evaluator;
pub mod progress;
pub mod schedule;
pub mod simulated;
pub mod state;
pub mod surface;
pub mod timers;

pub use engine::{IntentOutcome, SubmitOutcome, TriggerEngine, UserIntent};
pub use schedule::{validate_schedule, ScheduleIndex};
pub use state::{AnswerDraft, EngineState};
pub use surface::{PlaybackSurface, RecordingSurface, SurfaceCommand, SurfaceEvent};
pub use timers::{ManualTimers, TimerKind, TimerService, TimerToken, TokioTimers};
