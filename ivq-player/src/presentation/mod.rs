//! Presentation binding
//!
//! Read-only helpers a UI uses to render the engine: control availability,
//! scrub previews and a complete [`PlayerView`] view model. Nothing here
//! mutates engine state; UIs forward user actions as
//! [`crate::playback::UserIntent`]s.

pub mod controls;
pub mod scrub;
pub mod view;

pub use controls::ControlAvailability;
pub use scrub::{pointer_to_time, scrub_preview, ScrubPreview};
pub use view::{ChapterEntry, OptionView, PlayerView, QuestionMarker, QuestionOverlay};

/// Capability query for the rendering surface's width
///
/// Injected by the UI so layout decisions never read global window state.
pub trait Viewport {
    fn viewport_width(&self) -> u32;
}

/// Viewport of a known, fixed width (pixels)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedViewport(pub u32);

impl Viewport for FixedViewport {
    fn viewport_width(&self) -> u32 {
        self.0
    }
}
