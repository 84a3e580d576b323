//! AppCore — central command dispatcher for hushplay.
//!
//! Owns the playback controller, the schedule evaluator and the active
//! playback config, and fronts the store. The runtime thread, the CLI and the
//! tests all drive the scheduler through AppCore methods, so the per-tick
//! transition order and command validation live in one place.
//!
//! Store failures never touch playback state: they are logged, pushed to the
//! notification buffer and returned to the caller.

use crate::controller::PlaybackController;
use crate::display::{format_clock, format_minutes, format_silence};
use crate::error::Result;
use crate::events::PlaybackEvent;
use crate::playlist::MoveDirection;
use crate::scheduler::{NewSchedule, ScheduleAction, ScheduleEntry, ScheduleEvaluator};
use crate::settings::{PlaybackConfig, Settings};
use crate::silence::{Phase, PlaybackState};
use crate::store::{JsonStore, Store};
use crate::track::Track;
use chrono::{Local, NaiveDateTime};
use serde::Serialize;
use std::collections::VecDeque;
use std::path::Path;

// ── Log buffer ──────────────────────────────────────────────────────────────

const LOG_BUFFER_MAX: usize = 500;

#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub timestamp: String,
    pub level: String,
    pub message: String,
}

/// Recent user-visible notifications, oldest first.
#[derive(Debug, Default)]
pub struct LogBuffer {
    entries: VecDeque<LogEntry>,
}

impl LogBuffer {
    pub fn new() -> Self {
        LogBuffer {
            entries: VecDeque::new(),
        }
    }

    pub fn push(&mut self, level: &str, message: String) {
        let timestamp = Local::now().format("%H:%M:%S").to_string();
        self.entries.push_back(LogEntry {
            timestamp,
            level: level.to_string(),
            message,
        });
        while self.entries.len() > LOG_BUFFER_MAX {
            self.entries.pop_front();
        }
    }

    pub fn get(&self, since_index: usize) -> Vec<LogEntry> {
        self.entries.iter().skip(since_index).cloned().collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ── Response data types ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct StatusData {
    pub state: PlaybackState,
    pub phase: Phase,
    pub track_count: usize,
    pub track_title: Option<String>,
    pub track_artist: Option<String>,
    /// Play time since the last silence period, "m:ss".
    pub play_time: String,
    pub remaining_play_seconds: u32,
    pub remaining_display: String,
    /// Fraction of the play ceiling used, 0.0..=1.0.
    pub progress: f32,
    pub max_play_display: String,
    /// Banner shown while a silence period runs.
    pub silence_banner: Option<String>,
    pub schedule_count: usize,
    pub fade_enabled: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScheduleData {
    pub id: u32,
    pub time: String,
    pub days: Vec<u8>,
    pub days_display: String,
    pub action: ScheduleAction,
    /// Fired this minute and waiting to re-arm.
    pub fired: bool,
}

// ── AppCore ─────────────────────────────────────────────────────────────────

pub struct AppCore {
    store: Box<dyn Store>,
    controller: PlaybackController,
    evaluator: ScheduleEvaluator,
    config: PlaybackConfig,
    tracks: Vec<Track>,
    pub logs: LogBuffer,
}

impl AppCore {
    /// Build a session over `store`, reading tracks, schedules and settings once.
    pub fn new(store: Box<dyn Store>) -> Result<Self> {
        let (tracks, schedules, settings) = load(store.as_ref())?;
        tracing::info!(
            tracks = tracks.len(),
            schedules = schedules.len(),
            "session loaded"
        );
        Ok(AppCore {
            controller: PlaybackController::new(tracks.len()),
            evaluator: ScheduleEvaluator::new(schedules),
            config: settings.playback_config(),
            tracks,
            store,
            logs: LogBuffer::new(),
        })
    }

    /// Open a JSON state file and build a session over it.
    pub fn open(state_path: &Path, media_dir: Option<&Path>) -> Result<Self> {
        let store = JsonStore::open(state_path, media_dir.map(Path::to_path_buf))?;
        AppCore::new(Box::new(store))
    }

    /// Create a new AppCore over an empty in-memory store. For testing.
    pub fn new_test() -> Self {
        AppCore {
            store: Box::new(JsonStore::in_memory()),
            controller: PlaybackController::new(0),
            evaluator: ScheduleEvaluator::default(),
            config: PlaybackConfig::default(),
            tracks: Vec::new(),
            logs: LogBuffer::new(),
        }
    }

    /// Re-read everything from the store, picking up changes made by other
    /// writers such as the CLI. Fired schedule state survives for
    /// entries that are still present.
    pub fn reload(&mut self) -> Result<Vec<PlaybackEvent>> {
        let refreshed = self.store.refresh();
        self.checked("Reload", refreshed)?;
        let loaded = load(self.store.as_ref());
        let (tracks, schedules, settings) = self.checked("Reload", loaded)?;
        self.evaluator.replace_entries(schedules);
        self.config = settings.playback_config();
        Ok(self.set_tracks(tracks))
    }

    // ── Tick pipeline ───────────────────────────────────────────────────

    /// One second of time: accumulator/silence, then schedule evaluation,
    /// then the fired actions in entry-id order.
    pub fn tick(&mut self, now: NaiveDateTime) -> Vec<PlaybackEvent> {
        let mut events = self.controller.advance(&self.config);
        for event in &events {
            match event {
                PlaybackEvent::SilenceStarted { silence_seconds } => self.logs.push(
                    "info",
                    format!("Play limit reached, silence for {}", format_silence(*silence_seconds)),
                ),
                PlaybackEvent::SilenceEnded => {
                    self.logs.push("info", "Silence over, playback resumed".to_string())
                }
                _ => {}
            }
        }

        for firing in self.evaluator.evaluate(now) {
            tracing::info!(entry = firing.entry_id, action = %firing.action, "schedule fired");
            self.logs.push(
                "info",
                format!("Schedule #{} fired: {}", firing.entry_id, firing.action),
            );
            events.push(PlaybackEvent::ScheduleFired {
                entry_id: firing.entry_id,
                action: firing.action,
            });
            events.extend(self.controller.apply_schedule(firing.action));
        }
        events
    }

    // ── Playback commands ───────────────────────────────────────────────

    pub fn toggle_play_pause(&mut self) -> Vec<PlaybackEvent> {
        self.controller.toggle_play_pause()
    }

    pub fn next_track(&mut self) -> Vec<PlaybackEvent> {
        self.controller.next_track()
    }

    pub fn previous_track(&mut self) -> Vec<PlaybackEvent> {
        self.controller.previous_track()
    }

    pub fn on_track_ended(&mut self) -> Vec<PlaybackEvent> {
        self.controller.on_track_ended()
    }

    pub fn select_track(&mut self, index: usize) -> Result<Vec<PlaybackEvent>> {
        self.controller.select_track(index)
    }

    pub fn reset_play_time(&mut self) -> Vec<PlaybackEvent> {
        self.logs.push("info", "Play time reset".to_string());
        self.controller.reset_play_time()
    }

    // ── Status (read-only) ──────────────────────────────────────────────

    pub fn state(&self) -> &PlaybackState {
        self.controller.state()
    }

    pub fn phase(&self) -> Phase {
        self.controller.phase()
    }

    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }

    pub fn get_status(&self) -> StatusData {
        let state = *self.controller.state();
        let current = self.tracks.get(state.current_track_index);
        let remaining = state.remaining_play_seconds(&self.config);
        let progress = (state.total_play_seconds as f32 / self.config.max_play_seconds as f32)
            .clamp(0.0, 1.0);
        let silence_banner = state.in_silence.then(|| {
            format!(
                "Silence: {} remaining",
                format_silence(state.silence_remaining_seconds)
            )
        });

        StatusData {
            phase: state.phase(),
            track_count: self.tracks.len(),
            track_title: current.map(|t| t.title.clone()),
            track_artist: current.map(|t| t.artist.clone()),
            play_time: format_clock(state.total_play_seconds),
            remaining_play_seconds: remaining,
            remaining_display: format_clock(remaining),
            progress,
            max_play_display: format_minutes(self.config.max_play_seconds / 60),
            silence_banner,
            schedule_count: self.evaluator.len(),
            fade_enabled: self.config.fade_enabled,
            state,
        }
    }

    // ── Schedule ────────────────────────────────────────────────────────

    pub fn get_schedule(&self) -> Vec<ScheduleData> {
        self.evaluator
            .entries_by_time()
            .into_iter()
            .map(|e| ScheduleData {
                id: e.id,
                time: e.time.clone(),
                days: e.days.clone(),
                days_display: e.days_display(),
                action: e.action,
                fired: self.evaluator.is_fired(e.id),
            })
            .collect()
    }

    pub fn add_schedule(&mut self, time: &str, days: Vec<u8>, action: &str) -> Result<u32> {
        let action = ScheduleAction::from_str_loose(action)?;
        let created = self.store.create_schedule(NewSchedule {
            time: time.to_string(),
            days,
            action,
        });
        let entry = self.checked("Add schedule", created)?;
        let id = entry.id;
        self.logs.push(
            "info",
            format!("Schedule added: {} at {} ({})", action, entry.time, entry.days_display()),
        );
        self.evaluator.insert(entry);
        Ok(id)
    }

    pub fn remove_schedule(&mut self, id: u32) -> Result<()> {
        let deleted = self.store.delete_schedule(id);
        self.checked("Remove schedule", deleted)?;
        self.evaluator.remove(id);
        self.logs.push("info", format!("Schedule #{} removed", id));
        Ok(())
    }

    // ── Settings ────────────────────────────────────────────────────────

    pub fn get_settings(&self) -> Result<Settings> {
        self.store.settings()
    }

    /// Persist new settings. The new play ceiling applies from the next tick;
    /// a running silence keeps the length it started with.
    pub fn update_settings(&mut self, settings: Settings) -> Result<()> {
        settings.validate()?;
        let updated = self.store.update_settings(settings);
        self.checked("Save settings", updated)?;
        self.config = settings.playback_config();
        tracing::info!(
            max_play_seconds = self.config.max_play_seconds,
            silence_seconds = self.config.silence_seconds,
            "settings updated"
        );
        self.logs.push("info", "Settings saved".to_string());
        Ok(())
    }

    // ── Tracks ──────────────────────────────────────────────────────────

    pub fn get_tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn import_track(&mut self, path: &Path) -> Result<Track> {
        let imported = self.store.import_track(path);
        let track = self.checked("Import track", imported)?;
        self.logs.push(
            "info",
            format!("Imported '{}' by {}", track.title, track.artist),
        );
        self.refresh_tracks()?;
        Ok(track)
    }

    pub fn edit_track(&mut self, id: u32, title: String, artist: String) -> Result<()> {
        let edited = self.store.edit_track(id, title, artist);
        self.checked("Edit track", edited)?;
        self.refresh_tracks()?;
        Ok(())
    }

    pub fn delete_track(&mut self, id: u32) -> Result<()> {
        let deleted = self.store.delete_track(id);
        self.checked("Delete track", deleted)?;
        self.logs.push("info", format!("Track #{} deleted", id));
        self.refresh_tracks()?;
        Ok(())
    }

    pub fn reorder_tracks(&mut self, ids: &[u32]) -> Result<()> {
        let reordered = self.store.reorder_tracks(ids);
        self.checked("Reorder tracks", reordered)?;
        self.refresh_tracks()?;
        Ok(())
    }

    pub fn move_track(&mut self, index: usize, direction: MoveDirection) -> Result<bool> {
        let moved = self.store.move_track(index, direction);
        let moved = self.checked("Move track", moved)?;
        if moved {
            self.refresh_tracks()?;
        }
        Ok(moved)
    }

    fn refresh_tracks(&mut self) -> Result<()> {
        let tracks = self.store.tracks();
        let tracks = self.checked("Load tracks", tracks)?;
        self.set_tracks(tracks);
        Ok(())
    }

    fn set_tracks(&mut self, tracks: Vec<Track>) -> Vec<PlaybackEvent> {
        let events = self.controller.set_track_count(tracks.len());
        self.tracks = tracks;
        events
    }

    // ── Logs ────────────────────────────────────────────────────────────

    pub fn get_logs(&self, since_index: Option<usize>) -> Vec<LogEntry> {
        self.logs.get(since_index.unwrap_or(0))
    }

    pub fn clear_logs(&mut self) {
        self.logs.clear();
    }

    pub fn log(&mut self, level: &str, message: String) {
        self.logs.push(level, message);
    }

    /// Surface a failed store call to the user. Playback state is untouched.
    fn checked<T>(&mut self, context: &str, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            if e.is_transient() {
                tracing::warn!(error = %e, "{} failed", context);
            } else {
                tracing::debug!(error = %e, "{} rejected", context);
            }
            self.logs.push("error", format!("{} failed: {}", context, e));
        }
        result
    }
}

fn load(store: &dyn Store) -> Result<(Vec<Track>, Vec<ScheduleEntry>, Settings)> {
    Ok((store.tracks()?, store.schedules()?, store.settings()?))
}

impl std::fmt::Debug for AppCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppCore")
            .field("state", self.controller.state())
            .field("config", &self.config)
            .field("tracks", &self.tracks.len())
            .field("schedules", &self.evaluator.len())
            .finish()
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
