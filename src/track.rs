use crate::display::format_clock;
use crate::error::{Error, Result};
use lofty::file::{AudioFile, TaggedFileExt};
use lofty::tag::Accessor;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// File extensions accepted for import.
pub const AUDIO_EXTENSIONS: [&str; 5] = ["mp3", "wav", "ogg", "m4a", "flac"];

/// Largest file accepted for import.
pub const MAX_IMPORT_BYTES: u64 = 50 * 1024 * 1024;

pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub id: u32,
    pub title: String,
    pub artist: String,
    /// Display duration, "m:ss".
    pub duration: String,
    /// File name inside the media directory.
    pub filename: String,
    /// Sort key within the playlist.
    pub position: u32,
}

/// Title, artist and duration read from an audio file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackTags {
    pub title: String,
    pub artist: String,
    pub duration: String,
}

impl TrackTags {
    /// Read tags from an audio file.
    pub fn read(path: &Path) -> Result<Self> {
        let tagged_file = lofty::read_from_path(path).map_err(|e| Error::Metadata {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        let duration = format_clock(tagged_file.properties().duration().as_secs() as u32);
        let tag = tagged_file.primary_tag().or_else(|| tagged_file.first_tag());

        let title = tag
            .and_then(|t| t.title().map(|s| s.to_string()))
            .unwrap_or_else(|| file_stem(path));
        let artist = tag
            .and_then(|t| t.artist().map(|s| s.to_string()))
            .unwrap_or_else(|| UNKNOWN_ARTIST.to_string());

        Ok(TrackTags {
            title,
            artist,
            duration,
        })
    }

    /// Tags used when the file cannot be parsed: name from the file, no duration.
    pub fn fallback(path: &Path) -> Self {
        TrackTags {
            title: file_stem(path),
            artist: UNKNOWN_ARTIST.to_string(),
            duration: format_clock(0),
        }
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "Unknown".to_string())
}

/// Check that a file looks like an importable audio file. Returns its size.
pub fn check_importable(path: &Path) -> Result<u64> {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    if !AUDIO_EXTENSIONS.contains(&ext.as_str()) {
        return Err(Error::validation(format!(
            "'{}' is not an audio file (expected one of: {})",
            path.display(),
            AUDIO_EXTENSIONS.join(", ")
        )));
    }
    let size = std::fs::metadata(path)?.len();
    if size > MAX_IMPORT_BYTES {
        return Err(Error::validation(format!(
            "'{}' is {} bytes; the limit is {} bytes",
            path.display(),
            size,
            MAX_IMPORT_BYTES
        )));
    }
    Ok(size)
}
