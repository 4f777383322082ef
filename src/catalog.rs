//! In-memory track catalog that answers searches offline.
//!
//! Used by `match-preview` to dry-run an import against an exported
//! library listing, and by tests as a deterministic search backend.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::matcher::TrackSearch;
use crate::models::Track;
use crate::normalize::normalize_for_match;

/// Maximum results per query, mirroring the Plex search endpoint.
pub const SEARCH_LIMIT: usize = 50;

/// Track plus its normalized search text.
struct IndexedTrack {
    track: Track,
    haystack: String,
}

pub struct CatalogSearch {
    tracks: Vec<IndexedTrack>,
}

impl CatalogSearch {
    pub fn new(tracks: Vec<Track>) -> Self {
        let tracks = tracks
            .into_iter()
            .map(|track| {
                let haystack = normalize_for_match(
                    &format!("{}\n{}\n{}", track.title, track.artist, track.album),
                    true,
                );
                IndexedTrack { track, haystack }
            })
            .collect();
        Self { tracks }
    }

    /// Load a JSON array of tracks.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog {}", path.display()))?;
        let tracks: Vec<Track> = serde_json::from_str(&data)
            .with_context(|| format!("Failed to parse catalog {}", path.display()))?;
        Ok(Self::new(tracks))
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

impl TrackSearch for CatalogSearch {
    /// Case- and accent-insensitive substring search over title, artist and album.
    fn search_tracks(&self, query: &str) -> Result<Vec<Track>> {
        let needle = normalize_for_match(query.trim(), true);
        if needle.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self
            .tracks
            .iter()
            .filter(|t| t.haystack.contains(&needle))
            .take(SEARCH_LIMIT)
            .map(|t| t.track.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> CatalogSearch {
        CatalogSearch::new(vec![
            Track::new("1", "M83", "Midnight City", "Hurry Up, We're Dreaming"),
            Track::new("2", "Beyoncé", "Halo", "I Am... Sasha Fierce"),
            Track::new("3", "Daft Punk", "One More Time", "Discovery"),
        ])
    }

    #[test]
    fn test_search_title_artist_album() {
        let c = catalog();
        assert_eq!(c.len(), 3);
        let ids = |q: &str| {
            c.search_tracks(q)
                .unwrap()
                .into_iter()
                .map(|t| t.id)
                .collect::<Vec<_>>()
        };
        assert_eq!(ids("midnight"), vec!["1"]);
        assert_eq!(ids("beyonce"), vec!["2"]);
        assert_eq!(ids("DISCOVERY"), vec!["3"]);
        assert!(ids("   ").is_empty());
        assert!(ids("nothing like this").is_empty());
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        fs::write(
            &path,
            r#"[{"id":"7","title":"Wait","artist":"M83","durationMs":343000}]"#,
        )
        .unwrap();
        let c = CatalogSearch::from_json_file(&path).unwrap();
        let hits = c.search_tracks("wait").unwrap();
        assert_eq!(hits[0].duration_ms, Some(343_000));
        assert_eq!(hits[0].album, "");

        fs::write(&path, "not json").unwrap();
        assert!(CatalogSearch::from_json_file(&path).is_err());
    }
}
