//! Engine runtime
//!
//! One tokio task owns the [`TriggerEngine`] and processes its inputs one at
//! a time from an unbounded channel: surface events, user intents, timer
//! firings and read requests. Because the engine is confined to that task no
//! locking is needed, and every transition observes the result of the one
//! before it.
//!
//! ```text
//! surface ──┐
//! timers  ──┼──> mpsc ──> [engine task] ──> EventBus ──> host
//! handle  ──┘
//! ```

use crate::error::{Error, Result};
use crate::playback::state::EngineState;
use crate::playback::surface::SurfaceEvent;
use crate::playback::timers::{TimerToken, TokioTimers};
use crate::playback::TriggerEngine;
use crate::presentation::{FixedViewport, PlayerView};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

pub use crate::playback::{IntentOutcome, SubmitOutcome, UserIntent};

/// Everything the engine task reacts to
#[derive(Debug)]
pub enum EngineInput {
    Surface(SurfaceEvent),
    Intent(UserIntent, Option<oneshot::Sender<IntentOutcome>>),
    Timer(TimerToken),
    /// Clone of the current state
    Inspect(oneshot::Sender<EngineState>),
    /// Render the view model for a viewport width
    Render {
        viewport_width: u32,
        reply: oneshot::Sender<PlayerView>,
    },
    Shutdown,
}

/// Channel pair for one engine task
///
/// Create the runtime first so the surface and timers can be wired to its
/// input channel, then build the engine and [`PlayerRuntime::spawn`] it.
pub struct PlayerRuntime {
    tx: mpsc::UnboundedSender<EngineInput>,
    rx: mpsc::UnboundedReceiver<EngineInput>,
    compact_breakpoint_px: u32,
}

impl PlayerRuntime {
    pub fn new(compact_breakpoint_px: u32) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx,
            compact_breakpoint_px,
        }
    }

    /// Sender for surfaces that report into this runtime
    pub fn input(&self) -> mpsc::UnboundedSender<EngineInput> {
        self.tx.clone()
    }

    /// Tokio-backed timer service firing into this runtime
    pub fn timers(&self) -> TokioTimers {
        TokioTimers::new(self.tx.clone())
    }

    pub fn handle(&self) -> PlayerHandle {
        PlayerHandle {
            tx: self.tx.clone(),
        }
    }

    /// Run the engine until [`PlayerHandle::shutdown`]
    ///
    /// The task returns the engine so callers can inspect its final state.
    pub fn spawn(self, engine: TriggerEngine) -> JoinHandle<TriggerEngine> {
        let PlayerRuntime {
            tx,
            mut rx,
            compact_breakpoint_px,
        } = self;
        // Only handles, surfaces and timers keep the channel open
        drop(tx);

        tokio::spawn(async move {
            let mut engine = engine;
            info!("Player runtime started (session {})", engine.session_id());

            while let Some(input) = rx.recv().await {
                match input {
                    EngineInput::Surface(event) => engine.handle_surface_event(event),
                    EngineInput::Intent(intent, reply) => {
                        let outcome = engine.apply_intent(intent);
                        if let Some(reply) = reply {
                            let _ = reply.send(outcome);
                        }
                    }
                    EngineInput::Timer(token) => engine.on_timer(token),
                    EngineInput::Inspect(reply) => {
                        let _ = reply.send(engine.state().clone());
                    }
                    EngineInput::Render {
                        viewport_width,
                        reply,
                    } => {
                        let viewport = FixedViewport(viewport_width);
                        let _ = reply.send(PlayerView::build(&engine, &viewport, compact_breakpoint_px));
                    }
                    EngineInput::Shutdown => {
                        debug!("Shutdown requested");
                        break;
                    }
                }
            }

            engine.shutdown();
            info!("Player runtime stopped");
            engine
        })
    }
}

/// Cloneable handle for sending intents and queries to a running engine
#[derive(Clone)]
pub struct PlayerHandle {
    tx: mpsc::UnboundedSender<EngineInput>,
}

impl PlayerHandle {
    fn send(&self, input: EngineInput) -> Result<()> {
        self.tx.send(input).map_err(|_| Error::RuntimeClosed)
    }

    /// Apply an intent and wait for its outcome
    pub async fn intent(&self, intent: UserIntent) -> Result<IntentOutcome> {
        let (reply, rx) = oneshot::channel();
        self.send(EngineInput::Intent(intent, Some(reply)))?;
        rx.await.map_err(|_| Error::RuntimeClosed)
    }

    /// Queue an intent without waiting
    pub fn intent_nowait(&self, intent: UserIntent) -> Result<()> {
        self.send(EngineInput::Intent(intent, None))
    }

    /// Inject a surface event (for surfaces that do not hold a sender)
    pub fn surface_event(&self, event: SurfaceEvent) -> Result<()> {
        self.send(EngineInput::Surface(event))
    }

    pub async fn state(&self) -> Result<EngineState> {
        let (reply, rx) = oneshot::channel();
        self.send(EngineInput::Inspect(reply))?;
        rx.await.map_err(|_| Error::RuntimeClosed)
    }

    pub async fn render(&self, viewport_width: u32) -> Result<PlayerView> {
        let (reply, rx) = oneshot::channel();
        self.send(EngineInput::Render {
            viewport_width,
            reply,
        })?;
        rx.await.map_err(|_| Error::RuntimeClosed)
    }

    pub fn shutdown(&self) -> Result<()> {
        self.send(EngineInput::Shutdown)
    }
}
