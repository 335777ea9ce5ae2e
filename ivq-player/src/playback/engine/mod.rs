//! Trigger engine: the player's central state machine
//!
//! **Module Structure:**
//! - `core.rs`: Construction, surface event handling, question presentation,
//!   timer dispatch, accessors
//! - `intents.rs`: User intents (transport controls, answering, markers, restart)
//! - `resume.rs`: Countdown-to-continue, branch application, volume fade-in
//!
//! The engine is synchronous. It never blocks and never awaits; every
//! transition runs to completion inside one call. Timers are requested from
//! a [`super::timers::TimerService`] and come back as [`TriggerEngine::on_timer`]
//! calls.

mod core;
mod intents;
mod resume;

pub use core::TriggerEngine;
pub use intents::{IntentOutcome, SubmitOutcome, UserIntent};
