use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Longest accepted silence period, in seconds.
pub const MAX_SILENCE_SECS: u32 = 1800;
/// Longest accepted play duration before a silence period, in minutes.
pub const MAX_PLAY_MINUTES: u32 = 480;

/// Playback settings as persisted by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Seconds of mandatory silence after the play ceiling is reached.
    #[serde(default = "default_silence_duration")]
    pub silence_duration: u32,
    #[serde(default = "default_true")]
    pub fade_enabled: bool,
    /// Minutes of playback allowed between silence periods.
    #[serde(default = "default_max_play_duration")]
    pub max_play_duration: u32,
}

fn default_silence_duration() -> u32 {
    2
}

fn default_max_play_duration() -> u32 {
    60
}

fn default_true() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            silence_duration: default_silence_duration(),
            fade_enabled: true,
            max_play_duration: default_max_play_duration(),
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if self.max_play_duration == 0 || self.max_play_duration > MAX_PLAY_MINUTES {
            return Err(Error::validation(format!(
                "Max play duration must be 1-{} minutes, got {}",
                MAX_PLAY_MINUTES, self.max_play_duration
            )));
        }
        if self.silence_duration > MAX_SILENCE_SECS {
            return Err(Error::validation(format!(
                "Silence duration must be 0-{} seconds, got {}",
                MAX_SILENCE_SECS, self.silence_duration
            )));
        }
        Ok(())
    }

    pub fn playback_config(&self) -> PlaybackConfig {
        PlaybackConfig {
            max_play_seconds: self.max_play_duration.saturating_mul(60).max(1),
            silence_seconds: self.silence_duration,
            fade_enabled: self.fade_enabled,
        }
    }
}

/// The values the tick pipeline reads. Replaced wholesale on settings update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlaybackConfig {
    pub max_play_seconds: u32,
    pub silence_seconds: u32,
    pub fade_enabled: bool,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Settings::default().playback_config()
    }
}
