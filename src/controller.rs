//! PlaybackController — the play/pause/track facade.
//!
//! Owns the one `PlaybackState`. Every mutation goes through a method here,
//! called either by a user command or by the tick pipeline in `AppCore`.
//! Commands return the events they caused; an empty list means the command
//! was a no-op (for example because a silence period is running).

use crate::error::{Error, Result};
use crate::events::PlaybackEvent;
use crate::playlist::{next_index, previous_index};
use crate::scheduler::ScheduleAction;
use crate::settings::PlaybackConfig;
use crate::silence::{self, Phase, PlaybackState, SilenceTransition};

#[derive(Debug, Clone, Default)]
pub struct PlaybackController {
    state: PlaybackState,
    track_count: usize,
}

impl PlaybackController {
    pub fn new(track_count: usize) -> Self {
        PlaybackController {
            state: PlaybackState::default(),
            track_count,
        }
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    pub fn track_count(&self) -> usize {
        self.track_count
    }

    /// Record a new sequence length, pulling the current index back in range.
    pub fn set_track_count(&mut self, count: usize) -> Vec<PlaybackEvent> {
        self.track_count = count;
        let clamped = self.state.current_track_index.min(count.saturating_sub(1));
        self.set_index(clamped)
    }

    pub fn toggle_play_pause(&mut self) -> Vec<PlaybackEvent> {
        match self.phase() {
            Phase::Silence => self.rejected("toggle_play_pause"),
            Phase::Playing => {
                self.state.pause();
                vec![PlaybackEvent::PhaseChanged {
                    phase: Phase::Paused,
                }]
            }
            Phase::Paused => {
                self.state.is_playing = true;
                vec![PlaybackEvent::PhaseChanged {
                    phase: Phase::Playing,
                }]
            }
        }
    }

    pub fn next_track(&mut self) -> Vec<PlaybackEvent> {
        if self.state.in_silence {
            return self.rejected("next_track");
        }
        match next_index(self.state.current_track_index, self.track_count) {
            Some(index) => self.set_index(index),
            None => Vec::new(),
        }
    }

    pub fn previous_track(&mut self) -> Vec<PlaybackEvent> {
        if self.state.in_silence {
            return self.rejected("previous_track");
        }
        match previous_index(self.state.current_track_index, self.track_count) {
            Some(index) => self.set_index(index),
            None => Vec::new(),
        }
    }

    /// Natural end of the current file: continue with the next track.
    pub fn on_track_ended(&mut self) -> Vec<PlaybackEvent> {
        self.next_track()
    }

    /// Jump to a track and start playing it.
    pub fn select_track(&mut self, index: usize) -> Result<Vec<PlaybackEvent>> {
        if self.state.in_silence {
            return Ok(self.rejected("select_track"));
        }
        if index >= self.track_count {
            return Err(Error::InvariantViolation(format!(
                "track index {} out of range ({} tracks)",
                index, self.track_count
            )));
        }
        let mut events = self.set_index(index);
        if !self.state.is_playing {
            self.state.is_playing = true;
            events.push(PlaybackEvent::PhaseChanged {
                phase: Phase::Playing,
            });
        }
        Ok(events)
    }

    /// Clear the play-time accumulator. Leaves a running silence untouched.
    pub fn reset_play_time(&mut self) -> Vec<PlaybackEvent> {
        self.state.total_play_seconds = 0;
        vec![PlaybackEvent::PlayTimeReset]
    }

    /// One tick of the accumulator / silence countdown.
    pub fn advance(&mut self, config: &PlaybackConfig) -> Vec<PlaybackEvent> {
        match silence::advance(&mut self.state, config) {
            Some(SilenceTransition::Entered { silence_seconds }) => {
                tracing::info!(silence_seconds, "play limit reached, silence started");
                vec![PlaybackEvent::SilenceStarted { silence_seconds }]
            }
            Some(SilenceTransition::Resumed) => {
                tracing::info!("silence finished, playback resumed");
                vec![PlaybackEvent::SilenceEnded]
            }
            None => Vec::new(),
        }
    }

    /// Apply a fired schedule action. Overrides a silence period.
    pub fn apply_schedule(&mut self, action: ScheduleAction) -> Vec<PlaybackEvent> {
        let before = self.phase();
        match action {
            ScheduleAction::Play => self.state.play_from_zero(),
            ScheduleAction::Pause => self.state.pause(),
        }
        let after = self.phase();
        if before == after {
            Vec::new()
        } else {
            vec![PlaybackEvent::PhaseChanged { phase: after }]
        }
    }

    fn set_index(&mut self, index: usize) -> Vec<PlaybackEvent> {
        if self.state.current_track_index == index {
            return Vec::new();
        }
        self.state.current_track_index = index;
        vec![PlaybackEvent::TrackChanged { index }]
    }

    fn rejected(&self, command: &'static str) -> Vec<PlaybackEvent> {
        tracing::debug!(
            command,
            remaining = self.state.silence_remaining_seconds,
            "command ignored during silence"
        );
        Vec::new()
    }
}
