//! Engine lifecycle, time samples and question presentation

use crate::playback::evaluator::BranchDecision;
use crate::playback::progress::ProgressReporter;
use crate::playback::schedule::{validate_schedule, ScheduleIndex};
use crate::playback::state::{AnswerDraft, EngineState};
use crate::playback::surface::{PlaybackSurface, SurfaceEvent, SurfaceEventSink, TimeSourceAdapter};
use crate::playback::timers::{TimerKind, TimerService, TimerSlots, TimerToken};
use ivq_common::config::TimingConfig;
use ivq_common::events::{EventBus, PlaybackPhase, PlayerEvent, PresentTrigger};
use ivq_common::model::{PlayerProps, Question, QuestionId};
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

/// Samples further than this from a fresh seek target predate the seek
const SEEK_ECHO_WINDOW_SECS: f64 = 1.0;

/// Stale samples skipped after a seek before the guard gives up
const MAX_STALE_AFTER_SEEK: u32 = 8;

/// Seek issued by the engine whose echo has not arrived yet
#[derive(Debug, Clone, Copy)]
pub(super) struct SeekGuard {
    target: f64,
    skipped: u32,
}

/// Interactive quiz engine for one player instance
///
/// Owns the [`EngineState`] and is its only writer. Construct it with the
/// host's props, a playback surface, a timer service and the event bus the
/// host listens on.
pub struct TriggerEngine {
    pub(super) schedule: ScheduleIndex,
    pub(super) state: EngineState,
    pub(super) timing: TimingConfig,
    /// Media properties (chapters and questions moved into `schedule`)
    pub(super) props: PlayerProps,
    pub(super) adapter: TimeSourceAdapter,
    pub(super) timers: Box<dyn TimerService>,
    pub(super) slots: TimerSlots,
    pub(super) progress: ProgressReporter,
    pub(super) events: EventBus,
    /// Changes on every restart
    pub(super) session_id: Uuid,
    /// Last processed time sample; older samples never trigger
    pub(super) last_sample: Option<f64>,
    pub(super) seek_guard: Option<SeekGuard>,
    /// Instant at which the active question was presented
    ///
    /// Questions due at this instant are presented back to back.
    pub(super) trigger_anchor: Option<f64>,
    /// Branch chosen by the accepted rating answer, applied when the
    /// countdown ends
    pub(super) pending_branch: Option<(QuestionId, BranchDecision)>,
    /// Media ended with looping on while a question held the player
    pub(super) pending_loop: bool,
}

impl TriggerEngine {
    pub fn new(
        mut props: PlayerProps,
        timing: TimingConfig,
        surface: Box<dyn PlaybackSurface>,
        timers: Box<dyn TimerService>,
        events: EventBus,
    ) -> Self {
        let chapters = std::mem::take(&mut props.chapters);
        let questions = std::mem::take(&mut props.questions);
        info!(
            "Creating trigger engine for {}: {} chapters, {} questions",
            props.video_url,
            chapters.len(),
            questions.len()
        );

        let schedule = ScheduleIndex::new(chapters, questions, timing.trigger_epsilon_secs);
        let state = EngineState::new(1.0, props.muted);

        let mut engine = Self {
            schedule,
            state,
            timing,
            props,
            adapter: TimeSourceAdapter::new(surface),
            timers,
            slots: TimerSlots::default(),
            progress: ProgressReporter::new(),
            events,
            session_id: Uuid::new_v4(),
            last_sample: None,
            seek_guard: None,
            trigger_anchor: None,
            pending_branch: None,
            pending_loop: false,
        };

        if engine.props.muted {
            engine.surface_muted(true);
        }
        engine
    }

    // ========================================
    // Accessors
    // ========================================

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn phase(&self) -> PlaybackPhase {
        self.state.phase
    }

    pub fn schedule(&self) -> &ScheduleIndex {
        &self.schedule
    }

    pub fn props(&self) -> &PlayerProps {
        &self.props
    }

    pub fn timing(&self) -> &TimingConfig {
        &self.timing
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// The question currently holding the player
    pub fn active_question(&self) -> Option<&Question> {
        self.state
            .active_question
            .and_then(|id| self.schedule.question(id))
    }

    // ========================================
    // Inputs
    // ========================================

    /// Process one event reported by the playback surface
    pub fn handle_surface_event(&mut self, event: SurfaceEvent) {
        TimeSourceAdapter::dispatch(event, self);
    }

    /// Process a timer firing
    ///
    /// Firings for slots that were cancelled or re-armed are ignored.
    pub fn on_timer(&mut self, token: TimerToken) {
        if !self.slots.take_fired(token) {
            trace!("Ignoring stale {:?} timer {}", token.kind, token.id);
            return;
        }
        match token.kind {
            TimerKind::Countdown => self.countdown_tick(),
            TimerKind::FadeIn => self.fade_tick(),
            TimerKind::ProgressDebounce => self.flush_progress(),
        }
    }

    /// Cancel every pending timer
    ///
    /// Called when the owning runtime stops; the engine accepts no timer
    /// firings afterwards.
    pub fn shutdown(&mut self) {
        self.slots.cancel_all(self.timers.as_mut());
        info!("Trigger engine stopped (session {})", self.session_id);
    }

    // ========================================
    // Time samples
    // ========================================

    pub(super) fn handle_sample(&mut self, t: f64) {
        if let Some(guard) = self.seek_guard.as_mut() {
            let far = (t - guard.target).abs() > SEEK_ECHO_WINDOW_SECS;
            if far && guard.skipped < MAX_STALE_AFTER_SEEK {
                guard.skipped += 1;
                trace!("Skipping sample {:.3}s; seek to {:.3}s pending", t, guard.target);
                return;
            }
            self.seek_guard = None;
        }

        let in_order = !matches!(self.last_sample, Some(last) if t < last);
        if !in_order {
            trace!("Backward sample {:.3}s; position only", t);
        }
        self.last_sample = Some(t);
        self.state.current_time = t;
        self.update_chapter(t);

        if in_order && self.state.phase.is_playing() {
            let due = self
                .schedule
                .unanswered_at(t, &self.state.answers_by_id)
                .first()
                .map(|q| q.id);
            if let Some(id) = due {
                self.present(id, PresentTrigger::Schedule, t);
            }
        }

        self.mark_progress();
    }

    /// Record a seek the engine issued itself
    ///
    /// Supersedes a deferred loop.
    pub(super) fn note_seek(&mut self, target: f64) {
        self.last_sample = Some(target);
        self.seek_guard = Some(SeekGuard { target, skipped: 0 });
        self.pending_loop = false;
        self.state.current_time = target;
        self.update_chapter(target);
        self.mark_progress();
    }

    pub(super) fn update_chapter(&mut self, t: f64) {
        let old_index = self.state.current_chapter_index;
        let new_index = self.schedule.chapter_at(t, old_index);
        if new_index != old_index {
            self.state.current_chapter_index = new_index;
            debug!("Chapter changed: {:?} -> {:?} at {:.2}s", old_index, new_index, t);
            self.emit(PlayerEvent::ChapterChanged {
                session_id: self.session_id,
                old_index,
                new_index,
                timestamp: chrono::Utc::now(),
            });
        }
    }

    // ========================================
    // Presentation
    // ========================================

    /// Pause playback and open `id`
    pub(super) fn present(&mut self, id: QuestionId, trigger: PresentTrigger, at_time: f64) {
        let Some(question_type) = self.schedule.question(id).map(|q| q.question_type()) else {
            warn!("Cannot present unknown question {}", id);
            return;
        };

        self.cancel_timer(TimerKind::Countdown);
        self.cancel_fade();
        self.pending_branch = None;

        self.surface_playing(false);
        self.state.playing = false;
        self.state.active_question = Some(id);
        self.state.draft = AnswerDraft::default();
        self.state.last_verdict = None;
        self.state.countdown_remaining = None;
        self.trigger_anchor = Some(at_time);

        info!(
            "Presenting question {} ({}) at {:.2}s [{:?}]",
            id, question_type, at_time, trigger
        );
        self.set_phase(PlaybackPhase::QuestionActive);
        self.emit(PlayerEvent::QuestionPresented {
            session_id: self.session_id,
            question_id: id,
            question_type,
            trigger,
            at_time,
            timestamp: chrono::Utc::now(),
        });
        self.mark_progress();
    }

    // ========================================
    // Shared helpers
    // ========================================

    pub(super) fn set_phase(&mut self, new_phase: PlaybackPhase) {
        let old_phase = self.state.phase;
        if old_phase == new_phase {
            return;
        }
        self.state.phase = new_phase;
        debug!("Phase {} -> {}", old_phase, new_phase);
        self.emit(PlayerEvent::PlaybackStateChanged {
            session_id: self.session_id,
            old_phase,
            new_phase,
            timestamp: chrono::Utc::now(),
        });
    }

    pub(super) fn emit(&self, event: PlayerEvent) {
        self.events.emit_lossy(event);
    }

    pub(super) fn arm_timer(&mut self, kind: TimerKind, delay: Duration) {
        self.slots.arm(self.timers.as_mut(), kind, delay);
    }

    pub(super) fn cancel_timer(&mut self, kind: TimerKind) {
        self.slots.cancel(self.timers.as_mut(), kind);
    }

    /// Note a snapshot-relevant mutation and open a debounce window
    pub(super) fn mark_progress(&mut self) {
        self.progress.mark_dirty();
        if !self.slots.is_armed(TimerKind::ProgressDebounce) {
            let delay = self.timing.progress_debounce();
            self.arm_timer(TimerKind::ProgressDebounce, delay);
        }
    }

    fn flush_progress(&mut self) {
        let total = self.schedule.questions().len();
        if let Some(snapshot) = self.progress.take_if_changed(&self.state, total) {
            trace!(
                "Progress: {:.1}% score {}/{} answered {}",
                snapshot.percent,
                snapshot.score,
                snapshot.total_questions,
                snapshot.answered_count
            );
            self.emit(PlayerEvent::ProgressUpdated {
                session_id: self.session_id,
                snapshot,
                timestamp: chrono::Utc::now(),
            });
        }
    }

    fn report_transport_failure(&mut self, action: &str, err: crate::Error) {
        warn!("Transport command '{}' failed: {}", action, err);
        self.emit(PlayerEvent::TransportError {
            session_id: self.session_id,
            message: format!("{}: {}", action, err),
            timestamp: chrono::Utc::now(),
        });
    }

    pub(super) fn surface_playing(&mut self, playing: bool) {
        if let Err(e) = self.adapter.set_playing(playing) {
            let action = if playing { "play" } else { "pause" };
            self.report_transport_failure(action, e);
        }
    }

    pub(super) fn surface_volume(&mut self, volume: f32) {
        if let Err(e) = self.adapter.set_volume(volume) {
            self.report_transport_failure("set volume", e);
        }
    }

    pub(super) fn surface_muted(&mut self, muted: bool) {
        if let Err(e) = self.adapter.set_muted(muted) {
            self.report_transport_failure("set muted", e);
        }
    }

    pub(super) fn loop_to_start(&mut self) {
        if let Some(target) = self.surface_seek(0.0) {
            self.note_seek(target);
        }
    }

    /// Seek the surface; returns the clamped target on success
    pub(super) fn surface_seek(&mut self, time: f64) -> Option<f64> {
        match self.adapter.seek(time) {
            Ok(target) => Some(target),
            Err(e) => {
                self.report_transport_failure("seek", e);
                None
            }
        }
    }
}

impl SurfaceEventSink for TriggerEngine {
    fn on_duration_known(&mut self, duration: f64) {
        info!("Media duration known: {:.2}s", duration);
        self.state.duration = duration;
        self.state.loading_error = None;
        self.adapter.set_duration(duration);

        if let Err(e) = validate_schedule(
            self.schedule.chapters(),
            self.schedule.questions(),
            Some(duration),
        ) {
            warn!("Schedule does not fit the media: {}", e);
        }

        if self.props.auto_play && self.state.phase == PlaybackPhase::PausedIdle {
            debug!("Auto-play on metadata");
            self.surface_playing(true);
            self.state.playing = true;
            self.set_phase(PlaybackPhase::Playing);
        }
        self.mark_progress();
    }

    fn on_time_advance(&mut self, current_time: f64) {
        self.handle_sample(current_time);
    }

    fn on_play_state_change(&mut self, playing: bool) {
        if playing && self.state.phase.has_question() {
            debug!("Surface started playing during a question; pausing again");
            self.surface_playing(false);
            return;
        }
        self.state.playing = playing;
    }

    fn on_ended(&mut self) {
        self.cancel_fade();
        let looped = self.props.loop_playback;
        self.state.playing = false;
        if self.state.phase.has_question() {
            // The question keeps the player; a loop waits for it to close
            info!("Playback ended during a question");
            self.pending_loop = looped;
        } else if looped {
            info!("Playback ended; looping to start");
            self.loop_to_start();
            self.surface_playing(true);
            self.state.playing = true;
            self.set_phase(PlaybackPhase::Playing);
        } else {
            info!("Playback ended");
            self.set_phase(PlaybackPhase::PausedIdle);
        }
        self.emit(PlayerEvent::PlaybackEnded {
            session_id: self.session_id,
            looped,
            timestamp: chrono::Utc::now(),
        });
        self.mark_progress();
    }

    fn on_error(&mut self, message: String) {
        error!("Playback surface error: {}", message);
        self.cancel_fade();
        self.state.playing = false;
        self.pending_loop = false;
        self.state.loading_error = Some(message.clone());
        if self.state.phase.is_playing() {
            self.set_phase(PlaybackPhase::PausedIdle);
        }
        self.emit(PlayerEvent::TransportError {
            session_id: self.session_id,
            message,
            timestamp: chrono::Utc::now(),
        });
        self.mark_progress();
    }
}

impl Drop for TriggerEngine {
    fn drop(&mut self) {
        self.slots.cancel_all(self.timers.as_mut());
    }
}
