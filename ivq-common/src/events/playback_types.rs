//! Playback-related type definitions
//!
//! Supporting types for engine phase reporting.

use serde::{Deserialize, Serialize};

/// Engine phase enumeration
///
/// The trigger engine is always in exactly one of these phases.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackPhase {
    /// Timeline advancing, no question open
    Playing,
    /// Paused by the user (or before playback started), no question open
    PausedIdle,
    /// A question is open and waiting for an answer
    QuestionActive,
    /// Accepted answer shown, counting down to resume
    FeedbackCountdown,
    /// Playback restarted, volume ramping up
    Resuming,
}

impl PlaybackPhase {
    /// True while the timeline is advancing
    pub fn is_playing(&self) -> bool {
        matches!(self, PlaybackPhase::Playing | PlaybackPhase::Resuming)
    }

    /// True while a question holds the player
    pub fn has_question(&self) -> bool {
        matches!(
            self,
            PlaybackPhase::QuestionActive | PlaybackPhase::FeedbackCountdown
        )
    }
}

impl std::fmt::Display for PlaybackPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackPhase::Playing => write!(f, "playing"),
            PlaybackPhase::PausedIdle => write!(f, "paused_idle"),
            PlaybackPhase::QuestionActive => write!(f, "question_active"),
            PlaybackPhase::FeedbackCountdown => write!(f, "feedback_countdown"),
            PlaybackPhase::Resuming => write!(f, "resuming"),
        }
    }
}

/// Why a question was opened
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PresentTrigger {
    /// Playback reached the question's trigger time
    Schedule,
    /// The user clicked the question's marker on the seek bar
    Marker,
}
