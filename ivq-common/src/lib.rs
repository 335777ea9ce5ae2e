//! # IVQ Common Library
//!
//! Shared code for the interactive video quiz engine including:
//! - Schedule model (chapters, questions, answers, progress snapshots)
//! - Event types (PlayerEvent enum) and the EventBus
//! - Configuration loading
//! - Clock-time formatting
//! - Fade curve definitions used for the resume volume ramp

pub mod config;
pub mod error;
pub mod events;
pub mod fade_curves;
pub mod human_time;
pub mod model;

pub use error::{Error, Result};
pub use fade_curves::FadeCurve;
