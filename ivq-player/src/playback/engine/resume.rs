//! Leaving a question: countdown, branch, next question or fade-in

use super::core::TriggerEngine;
use crate::playback::state::AnswerDraft;
use crate::playback::timers::TimerKind;
use ivq_common::events::{PlaybackPhase, PlayerEvent, PresentTrigger};
use tracing::{debug, info, warn};

impl TriggerEngine {
    /// Enter `FeedbackCountdown` after an accepted answer
    pub(super) fn start_countdown(&mut self) {
        let ticks = self.timing.countdown_secs;
        if ticks == 0 {
            self.finish_countdown();
            return;
        }
        self.state.countdown_remaining = Some(ticks);
        self.set_phase(PlaybackPhase::FeedbackCountdown);
        let tick = self.timing.countdown_tick();
        self.arm_timer(TimerKind::Countdown, tick);
    }

    pub(super) fn countdown_tick(&mut self) {
        if self.state.phase != PlaybackPhase::FeedbackCountdown {
            return;
        }
        let remaining = self.state.countdown_remaining.unwrap_or(0).saturating_sub(1);
        self.state.countdown_remaining = Some(remaining);
        if remaining == 0 {
            self.finish_countdown();
        } else {
            let tick = self.timing.countdown_tick();
            self.arm_timer(TimerKind::Countdown, tick);
        }
    }

    /// "Continue" control: skip the rest of the countdown
    pub fn continue_now(&mut self) -> bool {
        if self.state.phase != PlaybackPhase::FeedbackCountdown {
            return false;
        }
        self.finish_countdown();
        true
    }

    /// Close the answered question and move on
    ///
    /// Order: apply the pending branch, then present the next unanswered
    /// question due at the same instant, else resume playback. A loop
    /// deferred by the question restarts from zero before resuming.
    pub(super) fn finish_countdown(&mut self) {
        self.cancel_timer(TimerKind::Countdown);
        self.state.countdown_remaining = None;
        self.state.active_question = None;
        self.state.draft = AnswerDraft::default();
        self.state.last_verdict = None;

        let mut anchor = self.trigger_anchor.unwrap_or(self.state.current_time);

        if let Some((question_id, decision)) = self.pending_branch.take() {
            if let Some(target) = self.surface_seek(decision.jump_to) {
                info!(
                    "Question {} branches ({:?}) to {:.2}s",
                    question_id, decision.bucket, target
                );
                self.note_seek(target);
                anchor = target;
                self.emit(PlayerEvent::BranchTaken {
                    session_id: self.session_id,
                    question_id,
                    bucket: decision.bucket,
                    jump_to: target,
                    timestamp: chrono::Utc::now(),
                });
            }
        }

        let next = self
            .schedule
            .unanswered_at(anchor, &self.state.answers_by_id)
            .first()
            .map(|q| q.id);
        match next {
            Some(id) => {
                debug!("Question {} shares the trigger instant; presenting next", id);
                self.present(id, PresentTrigger::Schedule, anchor);
            }
            None => {
                self.trigger_anchor = None;
                if std::mem::take(&mut self.pending_loop) {
                    info!("Applying deferred loop to start");
                    self.loop_to_start();
                }
                self.begin_resume();
            }
        }
        self.mark_progress();
    }

    /// Restart the surface at zero volume and ramp back up
    ///
    /// Media that failed stays stopped; the engine idles instead.
    pub(super) fn begin_resume(&mut self) {
        self.cancel_timer(TimerKind::FadeIn);
        if self.state.is_loading() {
            warn!("Not resuming: media is not loaded");
            self.state.playing = false;
            self.set_phase(PlaybackPhase::PausedIdle);
            return;
        }
        let target = self.state.volume;

        if self.timing.fade_steps == 0 || self.timing.fade_duration_ms == 0 {
            self.surface_volume(target);
            self.surface_playing(true);
            self.state.playing = true;
            self.set_phase(PlaybackPhase::Playing);
            return;
        }

        self.surface_volume(0.0);
        self.surface_playing(true);
        self.state.playing = true;
        self.state.fade_step = Some(0);
        self.set_phase(PlaybackPhase::Resuming);
        let interval = self.timing.fade_step_interval();
        self.arm_timer(TimerKind::FadeIn, interval);
    }

    pub(super) fn fade_tick(&mut self) {
        if self.state.phase != PlaybackPhase::Resuming {
            return;
        }
        let steps = self.timing.fade_steps;
        let step = self.state.fade_step.unwrap_or(0) + 1;
        let level = self
            .timing
            .fade_curve
            .ramp_level(step, steps, self.state.volume);
        self.surface_volume(level);

        if step >= steps {
            self.state.fade_step = None;
            debug!("Fade-in complete at volume {:.2}", level);
            self.set_phase(PlaybackPhase::Playing);
        } else {
            self.state.fade_step = Some(step);
            let interval = self.timing.fade_step_interval();
            self.arm_timer(TimerKind::FadeIn, interval);
        }
    }

    /// Stop an in-flight fade and restore the listener volume
    ///
    /// Leaves the phase alone; callers decide where to go next.
    pub(super) fn cancel_fade(&mut self) {
        let fading = self.state.fade_step.is_some() || self.slots.is_armed(TimerKind::FadeIn);
        if !fading {
            return;
        }
        self.cancel_timer(TimerKind::FadeIn);
        self.state.fade_step = None;
        let volume = self.state.volume;
        self.surface_volume(volume);
    }
}
