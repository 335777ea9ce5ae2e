//! # IVQ Player Library (ivq-player)
//!
//! Interactive video quiz engine.
//!
//! **Purpose:** Watch a playback surface's time cursor, pause at scheduled
//! instants to present questions, evaluate answers, branch the timeline on
//! rating answers, resume with a volume fade-in, and report debounced
//! progress to the host.
//!
//! **Architecture:** A synchronous state machine ([`playback::TriggerEngine`])
//! owned by a single tokio task ([`runtime::PlayerRuntime`]) that processes
//! surface events, user intents and timer firings one at a time.

pub mod error;
pub mod playback;
pub mod presentation;
pub mod runtime;

pub use error::{Error, Result};
pub use playback::TriggerEngine;
pub use runtime::{EngineInput, PlayerHandle, PlayerRuntime, UserIntent};
