//! Event types for the IVQ event system
//!
//! Provides the host-facing event definitions and the EventBus that carries
//! them from the engine to the host application.

mod playback_types;

pub use playback_types::{PlaybackPhase, PresentTrigger};

use crate::model::{BranchBucket, ProgressSnapshot, QuestionId, QuestionType, UserAnswer};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Player event types
///
/// `ProgressUpdated` and `QuestionAnswered` are the two host callbacks
/// (progress reporting and per-answer notification); the remaining variants
/// let a presentation layer or a log sink follow the engine.
///
/// Events serialize with a `type` tag so they can be forwarded verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PlayerEvent {
    /// Debounced progress snapshot
    ///
    /// Emitted at most once per debounce window, coalescing bursts of
    /// time-advance, chapter-change and answer mutations.
    ProgressUpdated {
        /// Engine session (changes on restart)
        session_id: Uuid,
        /// Snapshot contents
        snapshot: ProgressSnapshot,
        /// When the snapshot was taken
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A submission was accepted and recorded
    ///
    /// Emitted once per accepted submission, after the state mutation.
    QuestionAnswered {
        session_id: Uuid,
        question_id: QuestionId,
        /// The final recorded answer
        answer: UserAnswer,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A question was opened and playback paused
    QuestionPresented {
        session_id: Uuid,
        question_id: QuestionId,
        question_type: QuestionType,
        /// Scheduled trigger or marker click
        trigger: PresentTrigger,
        /// Playback position when the question opened (seconds)
        at_time: f64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Playback crossed into another chapter
    ChapterChanged {
        session_id: Uuid,
        /// Chapter index before the change
        old_index: Option<usize>,
        /// Chapter index after the change
        new_index: Option<usize>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Engine phase changed
    PlaybackStateChanged {
        session_id: Uuid,
        old_phase: PlaybackPhase,
        new_phase: PlaybackPhase,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A rating answer moved the timeline
    BranchTaken {
        session_id: Uuid,
        question_id: QuestionId,
        bucket: BranchBucket,
        /// Seek target (seconds)
        jump_to: f64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The playback surface reported a failure
    ///
    /// The engine stays inert (loading state) rather than failing.
    TransportError {
        session_id: Uuid,
        message: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Playback reached the end of the media
    PlaybackEnded {
        session_id: Uuid,
        /// True when the engine restarted from zero because of `loop`
        looped: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// State was reset wholesale by a restart
    SessionRestarted {
        /// Session that ended
        old_session_id: Uuid,
        /// Session that starts now
        new_session_id: Uuid,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl PlayerEvent {
    /// Short event name for logs and SSE-style forwarding
    pub fn event_type(&self) -> &'static str {
        match self {
            PlayerEvent::ProgressUpdated { .. } => "ProgressUpdated",
            PlayerEvent::QuestionAnswered { .. } => "QuestionAnswered",
            PlayerEvent::QuestionPresented { .. } => "QuestionPresented",
            PlayerEvent::ChapterChanged { .. } => "ChapterChanged",
            PlayerEvent::PlaybackStateChanged { .. } => "PlaybackStateChanged",
            PlayerEvent::BranchTaken { .. } => "BranchTaken",
            PlayerEvent::TransportError { .. } => "TransportError",
            PlayerEvent::PlaybackEnded { .. } => "PlaybackEnded",
            PlayerEvent::SessionRestarted { .. } => "SessionRestarted",
        }
    }
}

// ========================================
// Event bus
// ========================================

/// Fan-out of [`PlayerEvent`]s from the engine to the host
///
/// Backed by a tokio broadcast channel. Publishing never awaits, so the
/// synchronous engine can emit from inside its transition functions. A host
/// that falls more than `capacity` events behind sees `RecvError::Lagged`
/// and loses the oldest events.
///
/// # Examples
///
/// ```
/// use ivq_common::events::{EventBus, PlayerEvent};
/// use uuid::Uuid;
///
/// let bus = EventBus::new(16);
/// let mut host = bus.subscribe();
///
/// bus.emit_lossy(PlayerEvent::TransportError {
///     session_id: Uuid::new_v4(),
///     message: "network".to_string(),
///     timestamp: chrono::Utc::now(),
/// });
///
/// assert!(matches!(host.try_recv(), Ok(PlayerEvent::TransportError { .. })));
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<PlayerEvent>,
    capacity: usize,
}

impl EventBus {
    /// Bus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Receiver for events emitted from now on
    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.tx.subscribe()
    }

    /// Publish to every subscriber
    ///
    /// Returns the number of receivers, or the event back when nobody is
    /// subscribed.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: PlayerEvent,
    ) -> Result<usize, broadcast::error::SendError<PlayerEvent>> {
        self.tx.send(event)
    }

    /// Publish, dropping the event when nobody is subscribed
    pub fn emit_lossy(&self, event: PlayerEvent) {
        let _ = self.tx.send(event);
    }

    /// Live receivers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_snapshot() -> ProgressSnapshot {
        ProgressSnapshot {
            current_time: 30.9,
            duration: 120.0,
            percent: 25.75,
            current_chapter_index: Some(1),
            score: 1,
            total_questions: 1,
            answered_count: 1,
        }
    }

    #[test]
    fn test_emit_without_subscribers_is_err() {
        let bus = EventBus::new(10);
        let result = bus.emit(PlayerEvent::ProgressUpdated {
            session_id: Uuid::new_v4(),
            snapshot: sample_snapshot(),
            timestamp: chrono::Utc::now(),
        });
        assert!(result.is_err());
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_subscriber_receives_in_order() {
        let bus = EventBus::new(10);
        let mut rx = bus.subscribe();
        let session_id = Uuid::new_v4();

        bus.emit_lossy(PlayerEvent::PlaybackStateChanged {
            session_id,
            old_phase: PlaybackPhase::Playing,
            new_phase: PlaybackPhase::QuestionActive,
            timestamp: chrono::Utc::now(),
        });
        bus.emit_lossy(PlayerEvent::ProgressUpdated {
            session_id,
            snapshot: sample_snapshot(),
            timestamp: chrono::Utc::now(),
        });

        assert_eq!(rx.try_recv().unwrap().event_type(), "PlaybackStateChanged");
        assert_eq!(rx.try_recv().unwrap().event_type(), "ProgressUpdated");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = PlayerEvent::ProgressUpdated {
            session_id: Uuid::new_v4(),
            snapshot: sample_snapshot(),
            timestamp: chrono::Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "ProgressUpdated");
        assert_eq!(json["snapshot"]["answeredCount"], 1);
        assert_eq!(json["snapshot"]["currentChapterIndex"], 1);
    }

    #[test]
    fn test_phase_helpers() {
        assert!(PlaybackPhase::Resuming.is_playing());
        assert!(!PlaybackPhase::FeedbackCountdown.is_playing());
        assert!(PlaybackPhase::FeedbackCountdown.has_question());
        assert!(!PlaybackPhase::PausedIdle.has_question());
        assert_eq!(PlaybackPhase::QuestionActive.to_string(), "question_active");
    }
}
