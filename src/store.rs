//! Persistence collaborator: tracks, schedule entries and settings.
//!
//! The tick pipeline never writes here; only explicit user commands do.
//! `JsonStore` keeps everything in one JSON state file. Each write re-reads the
//! file, applies the change to a copy and only keeps it once it is on disk, so
//! edits from another process are preserved and a failed write leaves both the
//! file and the in-memory state as they were.

use crate::error::{Error, Result};
use crate::playlist::{MoveDirection, Playlist};
use crate::scheduler::{NewSchedule, ScheduleEntry};
use crate::settings::Settings;
use crate::track::{check_importable, Track, TrackTags};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub trait Store: Send {
    /// Tracks ordered by position.
    fn tracks(&self) -> Result<Vec<Track>>;
    fn schedules(&self) -> Result<Vec<ScheduleEntry>>;
    fn settings(&self) -> Result<Settings>;

    /// Pick up changes made by another writer. A no-op for stores without
    /// an external copy.
    fn refresh(&mut self) -> Result<()> {
        Ok(())
    }

    fn create_schedule(&mut self, new: NewSchedule) -> Result<ScheduleEntry>;
    fn delete_schedule(&mut self, id: u32) -> Result<()>;
    fn update_settings(&mut self, settings: Settings) -> Result<()>;

    fn import_track(&mut self, path: &Path) -> Result<Track>;
    fn edit_track(&mut self, id: u32, title: String, artist: String) -> Result<()>;
    fn delete_track(&mut self, id: u32) -> Result<()>;
    /// Rewrite the playlist order from a complete list of track ids.
    fn reorder_tracks(&mut self, ids: &[u32]) -> Result<()>;

    /// Swap a track with its neighbour. Ok(false) when already at the edge.
    fn move_track(&mut self, index: usize, direction: MoveDirection) -> Result<bool> {
        let mut playlist = Playlist::from_tracks(self.tracks()?);
        if index >= playlist.track_count() {
            return Err(Error::validation(format!(
                "Index out of range (playlist has {} tracks)",
                playlist.track_count()
            )));
        }
        if !playlist.move_track(index, direction) {
            return Ok(false);
        }
        let ids: Vec<u32> = playlist.tracks.iter().map(|t| t.id).collect();
        self.reorder_tracks(&ids)?;
        Ok(true)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationState {
    #[serde(default)]
    pub playlist: Playlist,
    #[serde(default)]
    pub schedules: Vec<ScheduleEntry>,
    #[serde(default)]
    pub settings: Settings,
    #[serde(default = "first_id")]
    next_track_id: u32,
    #[serde(default = "first_id")]
    next_schedule_id: u32,
}

fn first_id() -> u32 {
    1
}

impl Default for StationState {
    fn default() -> Self {
        StationState {
            playlist: Playlist::default(),
            schedules: Vec::new(),
            settings: Settings::default(),
            next_track_id: 1,
            next_schedule_id: 1,
        }
    }
}

fn read_state(path: &Path) -> Result<StationState> {
    let data = fs::read_to_string(path)?;
    let mut state: StationState = serde_json::from_str(&data)?;
    state.playlist = Playlist::from_tracks(std::mem::take(&mut state.playlist.tracks));
    Ok(state)
}

#[derive(Debug)]
pub struct JsonStore {
    /// None keeps everything in memory.
    path: Option<PathBuf>,
    /// Where imported files are copied. None stores the source path as-is.
    media_dir: Option<PathBuf>,
    state: StationState,
}

impl JsonStore {
    /// A store that never touches the disk. For tests.
    pub fn in_memory() -> Self {
        JsonStore {
            path: None,
            media_dir: None,
            state: StationState::default(),
        }
    }

    /// Load state from `path`, or start empty if the file does not exist yet.
    pub fn open(path: &Path, media_dir: Option<PathBuf>) -> Result<Self> {
        let state = if path.exists() {
            read_state(path)?
        } else {
            tracing::info!(path = %path.display(), "no state file, starting fresh");
            StationState::default()
        };
        Ok(JsonStore {
            path: Some(path.to_path_buf()),
            media_dir,
            state,
        })
    }

    fn write(&self, state: &StationState) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(state)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    fn commit(&mut self, next: StationState) -> Result<()> {
        self.write(&next)?;
        self.state = next;
        Ok(())
    }

    /// Copy an imported file into the media directory under a unique name.
    fn copy_into_media(&self, source: &Path) -> Result<String> {
        let name = source
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| Error::validation(format!("'{}' has no file name", source.display())))?;
        let Some(dir) = &self.media_dir else {
            return Ok(source.to_string_lossy().to_string());
        };
        fs::create_dir_all(dir)?;
        let filename = format!("{}-{}", Utc::now().timestamp_millis(), name);
        fs::copy(source, dir.join(&filename))?;
        Ok(filename)
    }

    fn remove_media_file(&self, filename: &str) {
        let Some(dir) = &self.media_dir else {
            return;
        };
        let path = dir.join(filename);
        if path.exists() {
            if let Err(e) = fs::remove_file(&path) {
                tracing::warn!(path = %path.display(), error = %e, "could not remove media file");
            }
        }
    }
}

impl Store for JsonStore {
    fn refresh(&mut self) -> Result<()> {
        if let Some(path) = &self.path {
            if path.exists() {
                self.state = read_state(path)?;
            }
        }
        Ok(())
    }

    fn tracks(&self) -> Result<Vec<Track>> {
        Ok(self.state.playlist.tracks.clone())
    }

    fn schedules(&self) -> Result<Vec<ScheduleEntry>> {
        Ok(self.state.schedules.clone())
    }

    fn settings(&self) -> Result<Settings> {
        Ok(self.state.settings)
    }

    fn create_schedule(&mut self, new: NewSchedule) -> Result<ScheduleEntry> {
        self.refresh()?;
        let mut next = self.state.clone();
        let entry = new.into_entry(next.next_schedule_id)?;
        next.next_schedule_id += 1;
        next.schedules.push(entry.clone());
        self.commit(next)?;
        Ok(entry)
    }

    fn delete_schedule(&mut self, id: u32) -> Result<()> {
        self.refresh()?;
        let mut next = self.state.clone();
        let pos = next
            .schedules
            .iter()
            .position(|e| e.id == id)
            .ok_or(Error::NotFound { kind: "schedule", id })?;
        next.schedules.remove(pos);
        self.commit(next)
    }

    fn update_settings(&mut self, settings: Settings) -> Result<()> {
        settings.validate()?;
        self.refresh()?;
        let mut next = self.state.clone();
        next.settings = settings;
        self.commit(next)
    }

    fn import_track(&mut self, path: &Path) -> Result<Track> {
        check_importable(path)?;
        let tags = TrackTags::read(path).unwrap_or_else(|e| {
            tracing::debug!(error = %e, "tags unreadable, using file name");
            TrackTags::fallback(path)
        });
        self.refresh()?;
        let filename = self.copy_into_media(path)?;

        let mut next = self.state.clone();
        let track = Track {
            id: next.next_track_id,
            title: tags.title,
            artist: tags.artist,
            duration: tags.duration,
            filename,
            position: 0,
        };
        next.next_track_id += 1;
        next.playlist.append(track);
        let stored = next.playlist.tracks.last().cloned();

        if let Err(e) = self.commit(next) {
            if let Some(track) = &stored {
                self.remove_media_file(&track.filename);
            }
            return Err(e);
        }
        stored.ok_or_else(|| Error::InvariantViolation("imported track missing".to_string()))
    }

    fn edit_track(&mut self, id: u32, title: String, artist: String) -> Result<()> {
        let title = title.trim().to_string();
        if title.is_empty() {
            return Err(Error::validation("Track title cannot be empty"));
        }
        self.refresh()?;
        let mut next = self.state.clone();
        let track = next
            .playlist
            .find_mut(id)
            .ok_or(Error::NotFound { kind: "track", id })?;
        track.title = title;
        track.artist = artist.trim().to_string();
        self.commit(next)
    }

    fn delete_track(&mut self, id: u32) -> Result<()> {
        self.refresh()?;
        let mut next = self.state.clone();
        let removed = next.playlist.remove_track(id)?;
        self.commit(next)?;
        self.remove_media_file(&removed.filename);
        Ok(())
    }

    fn reorder_tracks(&mut self, ids: &[u32]) -> Result<()> {
        self.refresh()?;
        let mut next = self.state.clone();
        next.playlist.reorder_by_ids(ids)?;
        self.commit(next)
    }
}
