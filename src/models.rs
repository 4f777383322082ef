//! Core data models shared by the importer, the Plex client and the editor.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::parse::ParsedEntry;

// ============================================================================
// Library Models
// ============================================================================

/// Track from the Plex music library. Read-only to this crate: the matcher
/// only compares and ranks copies returned by search.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: String, // Plex ratingKey
    pub title: String,
    pub artist: String,
    #[serde(default)]
    pub album: String,
    #[serde(default)]
    pub duration_ms: Option<u64>,
    #[serde(default)]
    pub track_number: Option<u32>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub thumb: Option<String>, // Server-relative artwork path
    #[serde(default)]
    pub rating: Option<f64>, // Plex 0-10 scale
    #[serde(default)]
    pub play_count: u32,
    #[serde(default)]
    pub last_played_at: Option<i64>, // Unix seconds
    #[serde(default)]
    pub added_at: Option<i64>,
    #[serde(default)]
    pub media_key: Option<String>, // First media part, for streaming
    #[serde(default)]
    pub genre: Option<String>,
}

impl Track {
    /// Minimal track, mostly for tests and catalog fixtures.
    pub fn new(id: &str, artist: &str, title: &str, album: &str) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            artist: artist.to_string(),
            album: album.to_string(),
            duration_ms: None,
            track_number: None,
            year: None,
            thumb: None,
            rating: None,
            play_count: 0,
            last_played_at: None,
            added_at: None,
            media_key: None,
            genre: None,
        }
    }

    /// Duration as "m:ss", or "--:--" when unknown.
    pub fn formatted_duration(&self) -> String {
        match self.duration_ms {
            Some(ms) => {
                let secs = ms / 1000;
                format!("{}:{:02}", secs / 60, secs % 60)
            }
            None => "--:--".to_string(),
        }
    }
}

/// Shown in place of a blank artist.
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let artist = if self.artist.is_empty() { UNKNOWN_ARTIST } else { &self.artist };
        if self.album.is_empty() {
            write!(f, "{} - {}", artist, self.title)
        } else {
            write!(f, "{} - {} [{}]", artist, self.title, self.album)
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Playlist {
    pub id: String,
    pub title: String,
    pub summary: Option<String>,
    pub thumb: Option<String>,
    pub duration_ms: Option<u64>,
    pub leaf_count: u32, // Number of tracks
    pub smart: bool,
    pub added_at: Option<i64>,
    pub updated_at: Option<i64>,
}

/// A track as it sits in a playlist. `item_id` identifies the slot, not
/// the track, so the same track can appear twice.
#[derive(Clone, Debug, PartialEq)]
pub struct PlaylistItem {
    pub item_id: String,
    pub track: Track,
}

/// Music section of a Plex server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MusicLibrary {
    pub key: String,
    pub title: String,
}

// ============================================================================
// Import Models
// ============================================================================

/// Stable handle for an import entry: its position in the parsed input.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(pub usize);

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0 + 1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    Pending,
    AutoMatched,
    NeedsSelection,
    Missing,
}

/// Outcome of resolving one entry against the library.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    AutoMatched(Track),
    NeedsSelection(Vec<Track>),
    Missing,
}

impl Resolution {
    /// Alternatives if any, otherwise Missing.
    pub fn from_alternatives(alternatives: Vec<Track>) -> Self {
        if alternatives.is_empty() {
            Resolution::Missing
        } else {
            Resolution::NeedsSelection(alternatives)
        }
    }

    pub fn status(&self) -> EntryStatus {
        match self {
            Resolution::AutoMatched(_) => EntryStatus::AutoMatched,
            Resolution::NeedsSelection(_) => EntryStatus::NeedsSelection,
            Resolution::Missing => EntryStatus::Missing,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("No import entry {0}")]
    UnknownEntry(EntryId),

    #[error("Import entry {0} has no alternatives to choose from")]
    NotPending(EntryId),

    #[error("Track {track_id} is not an alternative for import entry {entry}")]
    NotAnAlternative { entry: EntryId, track_id: String },
}

/// One line of import input and what it resolved to.
///
/// `matched` and a non-empty `alternatives` list never coexist: matching
/// sets one or the other once, and [`ImportEntry::select_alternative`]
/// moves a chosen alternative into `matched` and clears the rest.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportEntry {
    pub id: EntryId,
    pub original_text: String,
    pub artist: String,
    pub title: String,
    resolved: bool,
    matched: Option<Track>,
    alternatives: Vec<Track>,
}

impl ImportEntry {
    pub fn pending(id: EntryId, parsed: ParsedEntry) -> Self {
        Self {
            id,
            original_text: parsed.original_text,
            artist: parsed.artist,
            title: parsed.title,
            resolved: false,
            matched: None,
            alternatives: Vec::new(),
        }
    }

    /// Record the matcher's outcome. Consumes the pending entry so a
    /// resolution can only be applied once.
    pub fn resolved(mut self, resolution: Resolution) -> Self {
        debug_assert!(!self.resolved, "entry {} resolved twice", self.id);
        self.resolved = true;
        match resolution {
            Resolution::AutoMatched(track) => self.matched = Some(track),
            Resolution::NeedsSelection(alternatives) => self.alternatives = alternatives,
            Resolution::Missing => {}
        }
        self
    }

    pub fn status(&self) -> EntryStatus {
        if !self.resolved {
            EntryStatus::Pending
        } else if self.matched.is_some() {
            EntryStatus::AutoMatched
        } else if !self.alternatives.is_empty() {
            EntryStatus::NeedsSelection
        } else {
            EntryStatus::Missing
        }
    }

    pub fn matched_track(&self) -> Option<&Track> {
        self.matched.as_ref()
    }

    pub fn alternatives(&self) -> &[Track] {
        &self.alternatives
    }

    /// Pick one of the alternatives as the match. Only valid while the
    /// entry needs selection; afterwards it is matched for good.
    pub fn select_alternative(&mut self, track_id: &str) -> Result<&Track, SelectionError> {
        if self.status() != EntryStatus::NeedsSelection {
            return Err(SelectionError::NotPending(self.id));
        }
        let pos = self
            .alternatives
            .iter()
            .position(|t| t.id == track_id)
            .ok_or_else(|| SelectionError::NotAnAlternative {
                entry: self.id,
                track_id: track_id.to_string(),
            })?;
        let track = self.alternatives.swap_remove(pos);
        self.alternatives.clear();
        let track: &Track = self.matched.insert(track);
        Ok(track)
    }
}

/// View filter over import results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImportFilter {
    #[default]
    All,
    Matched,
    Unmatched,
}

impl ImportFilter {
    pub fn accepts(self, entry: &ImportEntry) -> bool {
        match self {
            ImportFilter::All => true,
            ImportFilter::Matched => entry.matched_track().is_some(),
            ImportFilter::Unmatched => entry.matched_track().is_none(),
        }
    }
}
