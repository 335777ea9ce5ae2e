//! Seek-bar hover and scrub computations

use crate::playback::schedule::ScheduleIndex;
use ivq_common::human_time::format_clock;
use serde::Serialize;

/// Tooltip shown while hovering or dragging over the seek bar
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrubPreview {
    /// Media time under the pointer (seconds)
    pub time: f64,
    /// Clock label for `time`
    pub label: String,
    /// Title of the chapter containing `time`
    pub chapter_title: Option<String>,
}

/// Media time under a pointer at `pointer_x` on a bar `bar_width` wide
///
/// Positions outside the bar clamp to its ends. `None` while the bar has no
/// width or the duration is unknown.
pub fn pointer_to_time(pointer_x: f64, bar_width: f64, duration: f64) -> Option<f64> {
    if !(bar_width > 0.0 && duration > 0.0 && pointer_x.is_finite()) {
        return None;
    }
    Some((pointer_x / bar_width).clamp(0.0, 1.0) * duration)
}

pub fn scrub_preview(
    pointer_x: f64,
    bar_width: f64,
    duration: f64,
    schedule: &ScheduleIndex,
) -> Option<ScrubPreview> {
    let time = pointer_to_time(pointer_x, bar_width, duration)?;
    let chapter_title = schedule
        .chapter_at(time, None)
        .and_then(|i| schedule.chapter(i))
        .map(|c| c.title.clone());

    Some(ScrubPreview {
        time,
        label: format_clock(time),
        chapter_title,
    })
}
