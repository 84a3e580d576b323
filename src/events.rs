//! Events emitted by the controller and the tick pipeline.

use crate::scheduler::ScheduleAction;
use crate::silence::Phase;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlaybackEvent {
    /// Play/pause state changed by a command or a schedule action.
    PhaseChanged { phase: Phase },
    /// The current track index changed.
    TrackChanged { index: usize },
    /// Play ceiling reached; mandatory silence started.
    SilenceStarted { silence_seconds: u32 },
    /// Silence countdown finished and playback resumed.
    SilenceEnded,
    /// A schedule entry matched the current minute.
    ScheduleFired { entry_id: u32, action: ScheduleAction },
    /// Accumulated play time was cleared by the user.
    PlayTimeReset,
}
