//! Simulated playback surface
//!
//! Stands in for a real media element in headless runs (the CLI) and
//! runtime tests. A ticker task advances a virtual time cursor while
//! "playing" and reports it through the engine's input channel exactly like
//! a real surface would: metadata first, then periodic time advances, then
//! an end-of-media event.

use super::surface::{PlaybackSurface, SurfaceEvent};
use crate::error::{Error, Result};
use crate::runtime::EngineInput;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

/// Media seconds between two time-advance events
pub const TICK_MEDIA_SECS: f64 = 0.25;

/// Description of the simulated media
#[derive(Debug, Clone)]
pub struct SimulatedMedia {
    /// Media length (seconds)
    pub duration: f64,
    /// Playback speed multiplier (2.0 plays a 60 s clip in 30 s)
    pub speed: f64,
    /// Delay before metadata is reported
    pub load_delay: Duration,
    /// Report this load error instead of metadata
    pub fail_with: Option<String>,
}

impl SimulatedMedia {
    pub fn new(duration: f64) -> Self {
        Self {
            duration,
            speed: 1.0,
            load_delay: Duration::from_millis(50),
            fail_with: None,
        }
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = speed;
        self
    }
}

/// Observable state of a simulated surface
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulatedState {
    pub position: f64,
    pub duration: f64,
    pub loaded: bool,
    pub playing: bool,
    pub ended: bool,
    pub volume: f32,
    pub muted: bool,
}

/// Read-only view of a surface after it has been handed to the engine
#[derive(Debug, Clone)]
pub struct SimulatedProbe {
    shared: Arc<Mutex<SimulatedState>>,
}

impl SimulatedProbe {
    pub fn snapshot(&self) -> SimulatedState {
        self.shared.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

pub struct SimulatedSurface {
    shared: Arc<Mutex<SimulatedState>>,
    tx: mpsc::UnboundedSender<EngineInput>,
    ticker: JoinHandle<()>,
}

impl SimulatedSurface {
    /// Start the simulated media; must be called inside a tokio runtime
    pub fn start(media: SimulatedMedia, tx: mpsc::UnboundedSender<EngineInput>) -> Self {
        let shared = Arc::new(Mutex::new(SimulatedState {
            duration: media.duration,
            volume: 1.0,
            ..Default::default()
        }));
        let ticker = tokio::spawn(run_ticker(media, shared.clone(), tx.clone()));
        Self { shared, tx, ticker }
    }

    pub fn probe(&self) -> SimulatedProbe {
        SimulatedProbe {
            shared: self.shared.clone(),
        }
    }

    fn update<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut SimulatedState),
    {
        let mut state = self
            .shared
            .lock()
            .map_err(|_| Error::Internal("simulated surface lock poisoned".to_string()))?;
        f(&mut state);
        Ok(())
    }

    fn report(&self, event: SurfaceEvent) -> Result<()> {
        self.tx
            .send(EngineInput::Surface(event))
            .map_err(|_| Error::Transport("engine input channel closed".to_string()))
    }
}

impl PlaybackSurface for SimulatedSurface {
    fn play(&mut self) -> Result<()> {
        self.update(|s| {
            s.playing = true;
            if s.position < s.duration {
                s.ended = false;
            }
        })?;
        self.report(SurfaceEvent::Play)
    }

    fn pause(&mut self) -> Result<()> {
        self.update(|s| s.playing = false)?;
        self.report(SurfaceEvent::Pause)
    }

    fn seek(&mut self, time: f64) -> Result<()> {
        self.update(|s| {
            s.position = time;
            s.ended = time >= s.duration && s.duration > 0.0;
        })?;
        self.report(SurfaceEvent::TimeAdvanced { current_time: time })
    }

    fn set_volume(&mut self, volume: f32) -> Result<()> {
        self.update(|s| s.volume = volume)
    }

    fn set_muted(&mut self, muted: bool) -> Result<()> {
        self.update(|s| s.muted = muted)
    }
}

impl Drop for SimulatedSurface {
    fn drop(&mut self) {
        self.ticker.abort();
    }
}

async fn run_ticker(
    media: SimulatedMedia,
    shared: Arc<Mutex<SimulatedState>>,
    tx: mpsc::UnboundedSender<EngineInput>,
) {
    tokio::time::sleep(media.load_delay).await;

    if let Some(message) = media.fail_with {
        warn!("Simulated media failed to load: {}", message);
        let _ = tx.send(EngineInput::Surface(SurfaceEvent::Error { message }));
        return;
    }

    if let Ok(mut state) = shared.lock() {
        state.loaded = true;
    }
    debug!("Simulated media loaded ({:.2}s)", media.duration);
    if tx
        .send(EngineInput::Surface(SurfaceEvent::MetadataLoaded {
            duration: media.duration,
        }))
        .is_err()
    {
        return;
    }

    let speed = if media.speed.is_finite() && media.speed > 0.0 {
        media.speed
    } else {
        1.0
    };
    let mut interval = tokio::time::interval(Duration::from_secs_f64(TICK_MEDIA_SECS / speed));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval.tick().await;

    loop {
        interval.tick().await;

        let events = match shared.lock() {
            Ok(mut state) => {
                if !state.playing || state.ended {
                    continue;
                }
                state.position = (state.position + TICK_MEDIA_SECS).min(state.duration);
                let mut events = vec![SurfaceEvent::TimeAdvanced {
                    current_time: state.position,
                }];
                if state.position >= state.duration {
                    state.ended = true;
                    state.playing = false;
                    events.push(SurfaceEvent::Ended);
                }
                events
            }
            Err(_) => return,
        };

        for event in events {
            if tx.send(EngineInput::Surface(event)).is_err() {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn next_surface_event(rx: &mut mpsc::UnboundedReceiver<EngineInput>) -> SurfaceEvent {
        loop {
            match rx.recv().await {
                Some(EngineInput::Surface(event)) => return event,
                Some(_) => continue,
                None => panic!("channel closed"),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_metadata_then_ticks_while_playing() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut surface = SimulatedSurface::start(SimulatedMedia::new(1.0), tx);

        assert_eq!(
            next_surface_event(&mut rx).await,
            SurfaceEvent::MetadataLoaded { duration: 1.0 }
        );

        surface.play().unwrap();
        assert_eq!(next_surface_event(&mut rx).await, SurfaceEvent::Play);
        assert_eq!(
            next_surface_event(&mut rx).await,
            SurfaceEvent::TimeAdvanced { current_time: 0.25 }
        );
        for expected in [0.5, 0.75, 1.0] {
            assert_eq!(
                next_surface_event(&mut rx).await,
                SurfaceEvent::TimeAdvanced { current_time: expected }
            );
        }
        assert_eq!(next_surface_event(&mut rx).await, SurfaceEvent::Ended);
        assert!(!surface.probe().snapshot().playing);
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_failure_reported() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut media = SimulatedMedia::new(10.0);
        media.fail_with = Some("unsupported codec".to_string());
        let _surface = SimulatedSurface::start(media, tx);

        assert_eq!(
            next_surface_event(&mut rx).await,
            SurfaceEvent::Error { message: "unsupported codec".to_string() }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_seek_reports_new_position() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut surface = SimulatedSurface::start(SimulatedMedia::new(10.0), tx);
        next_surface_event(&mut rx).await;

        surface.seek(7.5).unwrap();
        surface.set_volume(0.4).unwrap();
        assert_eq!(
            next_surface_event(&mut rx).await,
            SurfaceEvent::TimeAdvanced { current_time: 7.5 }
        );
        let state = surface.probe().snapshot();
        assert_eq!(state.position, 7.5);
        assert_eq!(state.volume, 0.4);
    }
}
