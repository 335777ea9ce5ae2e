//! Time source adapter
//!
//! **Responsibilities:**
//! - Define the playback surface contract ([`PlaybackSurface`]) and the
//!   lifecycle events it reports ([`SurfaceEvent`])
//! - Normalize surface events into engine calls ([`SurfaceEventSink`])
//! - Forward transport commands, clamping seeks to `[0, duration]`
//!
//! The adapter keeps no buffered state besides the known duration; every
//! command goes straight to the surface. Transport failures are logged and
//! returned to the caller, which decides how to degrade.

use crate::error::{Error, Result};
use std::sync::{Arc, Mutex};
use tracing::{trace, warn};

/// Native media-playback surface
///
/// Implemented by whatever actually plays the video (a browser element, a
/// native player, or [`super::simulated::SimulatedSurface`] in headless
/// runs). Commands are fire-and-forget; the surface reports the resulting
/// state changes back as [`SurfaceEvent`]s.
pub trait PlaybackSurface: Send {
    fn play(&mut self) -> Result<()>;
    fn pause(&mut self) -> Result<()>;
    /// Move the time cursor (seconds, already clamped by the adapter)
    fn seek(&mut self, time: f64) -> Result<()>;
    /// Set output volume (0.0-1.0)
    fn set_volume(&mut self, volume: f32) -> Result<()>;
    fn set_muted(&mut self, muted: bool) -> Result<()>;
}

/// Lifecycle events reported by the playback surface
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEvent {
    /// Media metadata available; duration in seconds
    MetadataLoaded { duration: f64 },
    /// Surface started playing
    Play,
    /// Surface paused
    Pause,
    /// Time cursor moved (periodic advance or seek)
    TimeAdvanced { current_time: f64 },
    /// Media reached its end
    Ended,
    /// Media failed to load or play
    Error { message: String },
}

/// Receiver of normalized surface events
///
/// Implemented by the trigger engine.
pub trait SurfaceEventSink {
    fn on_duration_known(&mut self, duration: f64);
    fn on_time_advance(&mut self, current_time: f64);
    fn on_play_state_change(&mut self, playing: bool);
    fn on_ended(&mut self);
    fn on_error(&mut self, message: String);
}

/// Wraps a [`PlaybackSurface`] with duration-aware clamping
pub struct TimeSourceAdapter {
    surface: Box<dyn PlaybackSurface>,
    /// Known media duration (0 until metadata loads)
    duration: f64,
}

impl TimeSourceAdapter {
    pub fn new(surface: Box<dyn PlaybackSurface>) -> Self {
        Self {
            surface,
            duration: 0.0,
        }
    }

    /// Translate one surface event into sink calls
    ///
    /// Non-finite times and durations are dropped (durations are reported as
    /// errors) so the engine only ever sees usable numbers.
    pub fn dispatch(event: SurfaceEvent, sink: &mut impl SurfaceEventSink) {
        match event {
            SurfaceEvent::MetadataLoaded { duration } => {
                if duration.is_finite() && duration >= 0.0 {
                    sink.on_duration_known(duration);
                } else {
                    warn!("Surface reported unusable duration: {}", duration);
                    sink.on_error(format!("invalid media duration {}", duration));
                }
            }
            SurfaceEvent::Play => sink.on_play_state_change(true),
            SurfaceEvent::Pause => sink.on_play_state_change(false),
            SurfaceEvent::TimeAdvanced { current_time } => {
                if current_time.is_finite() {
                    sink.on_time_advance(current_time.max(0.0));
                } else {
                    trace!("Dropping non-finite time sample");
                }
            }
            SurfaceEvent::Ended => sink.on_ended(),
            SurfaceEvent::Error { message } => sink.on_error(message),
        }
    }

    pub fn set_duration(&mut self, duration: f64) {
        self.duration = duration;
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Clamp a time to `[0, duration]` (`[0, ∞)` while duration is unknown)
    pub fn clamp(&self, time: f64) -> f64 {
        let time = if time.is_finite() { time.max(0.0) } else { 0.0 };
        if self.duration > 0.0 {
            time.min(self.duration)
        } else {
            time
        }
    }

    /// Seek the surface; returns the clamped target actually requested
    pub fn seek(&mut self, time: f64) -> Result<f64> {
        let target = self.clamp(time);
        self.surface.seek(target)?;
        Ok(target)
    }

    pub fn set_playing(&mut self, playing: bool) -> Result<()> {
        if playing {
            self.surface.play()
        } else {
            self.surface.pause()
        }
    }

    pub fn set_volume(&mut self, volume: f32) -> Result<()> {
        self.surface.set_volume(volume.clamp(0.0, 1.0))
    }

    pub fn set_muted(&mut self, muted: bool) -> Result<()> {
        self.surface.set_muted(muted)
    }
}

/// A transport command as seen by a surface
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCommand {
    Play,
    Pause,
    Seek(f64),
    SetVolume(f32),
    SetMuted(bool),
}

/// Surface that records every command it receives
///
/// Clones share the same log, so a test keeps one clone and hands the other
/// to the engine.
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    commands: Arc<Mutex<Vec<SurfaceCommand>>>,
    failing: Arc<Mutex<bool>>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// All commands received so far
    pub fn commands(&self) -> Vec<SurfaceCommand> {
        self.commands.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Forget recorded commands
    pub fn clear(&self) {
        if let Ok(mut commands) = self.commands.lock() {
            commands.clear();
        }
    }

    /// Make every following command fail with a transport error
    pub fn set_failing(&self, failing: bool) {
        if let Ok(mut flag) = self.failing.lock() {
            *flag = failing;
        }
    }

    /// Last volume command, if any
    pub fn last_volume(&self) -> Option<f32> {
        self.commands().iter().rev().find_map(|c| match c {
            SurfaceCommand::SetVolume(v) => Some(*v),
            _ => None,
        })
    }

    /// All seek targets in order
    pub fn seeks(&self) -> Vec<f64> {
        self.commands()
            .iter()
            .filter_map(|c| match c {
                SurfaceCommand::Seek(t) => Some(*t),
                _ => None,
            })
            .collect()
    }

    fn record(&mut self, command: SurfaceCommand) -> Result<()> {
        if self.failing.lock().map(|f| *f).unwrap_or(false) {
            return Err(Error::Transport(format!("surface rejected {:?}", command)));
        }
        self.commands
            .lock()
            .map_err(|_| Error::Internal("recording surface lock poisoned".to_string()))?
            .push(command);
        Ok(())
    }
}

impl PlaybackSurface for RecordingSurface {
    fn play(&mut self) -> Result<()> {
        self.record(SurfaceCommand::Play)
    }

    fn pause(&mut self) -> Result<()> {
        self.record(SurfaceCommand::Pause)
    }

    fn seek(&mut self, time: f64) -> Result<()> {
        self.record(SurfaceCommand::Seek(time))
    }

    fn set_volume(&mut self, volume: f32) -> Result<()> {
        self.record(SurfaceCommand::SetVolume(volume))
    }

    fn set_muted(&mut self, muted: bool) -> Result<()> {
        self.record(SurfaceCommand::SetMuted(muted))
    }
}
