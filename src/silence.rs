//! Play-time accumulator and the mandatory silence countdown.
//!
//! Each tick advances the state by one second. Playback accumulates toward
//! `max_play_seconds`; reaching it starts a silence period of
//! `silence_seconds`, after which playback resumes on its own.

use crate::settings::PlaybackConfig;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlaybackState {
    pub is_playing: bool,
    pub current_track_index: usize,
    /// Seconds played since the last silence period began or ended.
    pub total_play_seconds: u32,
    pub in_silence: bool,
    pub silence_remaining_seconds: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Playing,
    Paused,
    Silence,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Playing => write!(f, "playing"),
            Phase::Paused => write!(f, "paused"),
            Phase::Silence => write!(f, "silence"),
        }
    }
}

/// Edge produced by a tick that crossed a phase boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SilenceTransition {
    /// Play ceiling reached; a silence period of this many seconds started.
    Entered { silence_seconds: u32 },
    /// Countdown finished; playback resumed.
    Resumed,
}

impl PlaybackState {
    pub fn phase(&self) -> Phase {
        if self.in_silence {
            Phase::Silence
        } else if self.is_playing {
            Phase::Playing
        } else {
            Phase::Paused
        }
    }

    /// Start playing with a fresh accumulator, leaving any silence period.
    pub fn play_from_zero(&mut self) {
        self.in_silence = false;
        self.silence_remaining_seconds = 0;
        self.is_playing = true;
        self.total_play_seconds = 0;
    }

    /// Stop playing, leaving any silence period. The accumulator is kept.
    pub fn pause(&mut self) {
        self.in_silence = false;
        self.silence_remaining_seconds = 0;
        self.is_playing = false;
    }

    fn enter_silence(&mut self, silence_seconds: u32) {
        self.is_playing = false;
        self.in_silence = true;
        self.silence_remaining_seconds = silence_seconds;
        self.total_play_seconds = 0;
    }

    fn resume_after_silence(&mut self) {
        self.in_silence = false;
        self.silence_remaining_seconds = 0;
        self.is_playing = true;
        self.total_play_seconds = 0;
    }

    /// Seconds of playback left before the next silence period.
    pub fn remaining_play_seconds(&self, config: &PlaybackConfig) -> u32 {
        config.max_play_seconds.saturating_sub(self.total_play_seconds)
    }
}

/// Advance the accumulator or the countdown by one second.
///
/// The silence length is sampled from `config` only when a period starts;
/// later changes to `silence_seconds` do not touch a running countdown.
pub fn advance(state: &mut PlaybackState, config: &PlaybackConfig) -> Option<SilenceTransition> {
    match state.phase() {
        Phase::Paused => None,
        Phase::Playing => {
            let next = state.total_play_seconds.saturating_add(1);
            if next >= config.max_play_seconds {
                state.enter_silence(config.silence_seconds);
                Some(SilenceTransition::Entered {
                    silence_seconds: config.silence_seconds,
                })
            } else {
                state.total_play_seconds = next;
                None
            }
        }
        Phase::Silence => {
            if state.silence_remaining_seconds > 1 {
                state.silence_remaining_seconds -= 1;
                None
            } else {
                state.resume_after_silence();
                Some(SilenceTransition::Resumed)
            }
        }
    }
}
