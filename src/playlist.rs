use crate::error::{Error, Result};
use crate::track::Track;
use serde::{Deserialize, Serialize};

/// Index after `current`, wrapping to 0. None for an empty sequence.
pub fn next_index(current: usize, len: usize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    Some(if current + 1 < len { current + 1 } else { 0 })
}

/// Index before `current`, wrapping to the last track. None for an empty sequence.
pub fn previous_index(current: usize, len: usize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    Some(if current > 0 && current < len { current - 1 } else { len - 1 })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    Up,
    Down,
}

/// The ordered track sequence.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Playlist {
    pub tracks: Vec<Track>,
}

impl Playlist {
    /// Build from stored tracks, ordering them by position.
    pub fn from_tracks(mut tracks: Vec<Track>) -> Self {
        tracks.sort_by_key(|t| (t.position, t.id));
        Playlist { tracks }
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn find(&self, id: u32) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == id)
    }

    pub fn find_mut(&mut self, id: u32) -> Option<&mut Track> {
        self.tracks.iter_mut().find(|t| t.id == id)
    }

    /// Position for a track appended after everything else.
    pub fn next_position(&self) -> u32 {
        self.tracks
            .iter()
            .map(|t| t.position + 1)
            .max()
            .unwrap_or(0)
    }

    pub fn append(&mut self, mut track: Track) {
        track.position = self.next_position();
        self.tracks.push(track);
    }

    /// Remove a track by id. Returns the removed track.
    pub fn remove_track(&mut self, id: u32) -> Result<Track> {
        let pos = self
            .tracks
            .iter()
            .position(|t| t.id == id)
            .ok_or(Error::NotFound { kind: "track", id })?;
        Ok(self.tracks.remove(pos))
    }

    /// Apply a full ordering given as track ids; positions become 0..n.
    pub fn reorder_by_ids(&mut self, ids: &[u32]) -> Result<()> {
        if ids.len() != self.tracks.len() {
            return Err(Error::validation(format!(
                "Reorder lists {} tracks but the playlist has {}",
                ids.len(),
                self.tracks.len()
            )));
        }
        let mut reordered = Vec::with_capacity(ids.len());
        for &id in ids {
            if reordered.iter().any(|t: &Track| t.id == id) {
                return Err(Error::validation(format!("Track {} listed twice", id)));
            }
            let track = self
                .find(id)
                .cloned()
                .ok_or(Error::NotFound { kind: "track", id })?;
            reordered.push(track);
        }
        self.tracks = reordered;
        self.renumber();
        Ok(())
    }

    /// Swap the track at `index` with its neighbour. Returns false at the edges.
    pub fn move_track(&mut self, index: usize, direction: MoveDirection) -> bool {
        let target = match direction {
            MoveDirection::Up if index > 0 => index - 1,
            MoveDirection::Down if index + 1 < self.tracks.len() => index + 1,
            _ => return false,
        };
        self.tracks.swap(index, target);
        self.renumber();
        true
    }

    fn renumber(&mut self) {
        for (i, track) in self.tracks.iter_mut().enumerate() {
            track.position = i as u32;
        }
    }
}
