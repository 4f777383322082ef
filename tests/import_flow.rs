//! Import from raw text through disambiguation to playlist creation.

use anyhow::{bail, Result};
use std::cell::RefCell;

use plex_playlister::catalog::CatalogSearch;
use plex_playlister::config::MatchConfig;
use plex_playlister::editor::{PlaylistEditor, PlaylistStore, PlaylistUpdate};
use plex_playlister::filter::SmartPlaylist;
use plex_playlister::matcher::{
    CancelToken, ImportError, ImportMatcher, ImportSession, ResolveEvent, SearchFn,
};
use plex_playlister::models::{EntryId, EntryStatus, ImportFilter, Playlist, PlaylistItem, Track};

fn library() -> CatalogSearch {
    CatalogSearch::new(vec![
        Track::new("1", "M83", "Midnight City", "Hurry Up, We're Dreaming"),
        Track::new("2", "M83", "Wait", "Hurry Up, We're Dreaming"),
        Track::new("3", "Beyoncé", "Halo", "I Am... Sasha Fierce"),
        Track::new("4", "Beyoncé", "Halo", "Live at Wembley"),
        Track::new("5", "Daft Punk", "One More Time", "Discovery"),
        Track::new("6", "Daft Punk", "Digital Love", "Discovery"),
    ])
}

/// Records created playlists; every other operation is unexpected here.
#[derive(Default)]
struct RecordingStore {
    created: RefCell<Vec<(String, Vec<String>)>>,
}

impl PlaylistStore for RecordingStore {
    fn playlists(&self) -> Result<Vec<Playlist>> {
        Ok(Vec::new())
    }

    fn playlist_items(&self, _playlist_id: &str) -> Result<Vec<PlaylistItem>> {
        Ok(Vec::new())
    }

    fn create_playlist(&self, title: &str, tracks: &[Track]) -> Result<Playlist> {
        let ids = tracks.iter().map(|t| t.id.clone()).collect();
        self.created.borrow_mut().push((title.to_string(), ids));
        Ok(Playlist {
            id: "100".to_string(),
            title: title.to_string(),
            summary: None,
            thumb: None,
            duration_ms: None,
            leaf_count: tracks.len() as u32,
            smart: false,
            added_at: None,
            updated_at: None,
        })
    }

    fn create_smart_playlist(&self, _smart: &SmartPlaylist) -> Result<Playlist> {
        bail!("unexpected")
    }

    fn update_playlist(
        &self,
        _playlist_id: &str,
        _update: &PlaylistUpdate,
    ) -> Result<Playlist> {
        bail!("unexpected")
    }

    fn delete_playlist(&self, _playlist_id: &str) -> Result<()> {
        bail!("unexpected")
    }

    fn add_tracks(&self, _playlist_id: &str, _tracks: &[Track]) -> Result<()> {
        bail!("unexpected")
    }

    fn move_item(&self, _playlist_id: &str, _item_id: &str, _after: Option<&str>) -> Result<()> {
        bail!("unexpected")
    }

    fn remove_item(&self, _playlist_id: &str, _item_id: &str) -> Result<()> {
        bail!("unexpected")
    }
}

#[test]
fn test_one_match_one_missing() {
    let search = SearchFn(|q: &str| -> Result<Vec<Track>> {
        if q == "Midnight City" {
            Ok(vec![Track::new("1", "M83", "Midnight City", "Hurry Up, We're Dreaming")])
        } else {
            Ok(Vec::new())
        }
    });
    let matcher = ImportMatcher::new(search, MatchConfig::default());
    let mut session = ImportSession::new("Mix");

    session
        .run(&matcher, "M83 - Midnight City\nUnknown Artist XYZ - Nonexistent Song", None)
        .unwrap();

    let entries = session.entries();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].status(), EntryStatus::AutoMatched);
    assert_eq!(entries[1].status(), EntryStatus::Missing);
    assert!(entries[1].alternatives().is_empty());
    assert_eq!(session.tracks_to_add().len(), 1);
    assert!(session.can_create_playlist());
}

#[test]
fn test_csv_with_typo_header() {
    let matcher = ImportMatcher::new(library(), MatchConfig::default());
    let mut session = ImportSession::new("Csv");
    session
        .run(&matcher, "Arist,Track Name\nM83,Wait\nDaft Punk,Digital Love\n", None)
        .unwrap();

    let ids: Vec<&str> = session.tracks_to_add().iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["2", "6"]);
}

#[test]
fn test_disambiguate_then_create() {
    let matcher = ImportMatcher::new(library(), MatchConfig::default());
    let mut session = ImportSession::new("Favourites");
    session
        .run(&matcher, "beyonce - Halo\nDaft Punk - One More Time\nNobody - Nothing", None)
        .unwrap();

    assert_eq!(session.matched_count(), 1);
    assert_eq!(session.needs_selection_count(), 1);
    assert_eq!(session.missing_count(), 1);
    assert_eq!(session.filtered(ImportFilter::Unmatched).count(), 2);
    assert!(matches!(session.creation_tracks(false), Err(ImportError::SelectionsPending(1))));
    assert_eq!(session.creation_tracks(true).unwrap().len(), 1);

    let halo = &session.entries()[0];
    let alt_ids: Vec<&str> = halo.alternatives().iter().map(|t| t.id.as_str()).collect();
    assert_eq!(alt_ids, vec!["3", "4"]); // album order

    session.select_alternative(EntryId(0), "4").unwrap();
    assert!(session.entries()[0].alternatives().is_empty());
    assert!(session.select_alternative(EntryId(0), "3").is_err());

    let tracks = session.creation_tracks(false).unwrap();
    let store = RecordingStore::default();
    let mut editor = PlaylistEditor::new(&store);
    let playlist = editor.create_playlist(&session.playlist_name, &tracks).unwrap();

    assert_eq!(playlist.leaf_count, 2);
    assert_eq!(
        *store.created.borrow(),
        vec![("Favourites".to_string(), vec!["4".to_string(), "5".to_string()])]
    );
}

#[test]
fn test_cancelled_run_yields_nothing() {
    let matcher = ImportMatcher::new(library(), MatchConfig::default());
    let cancel = CancelToken::new();
    cancel.cancel();
    let result = matcher.parse_and_resolve("M83 - Wait", &cancel, None);
    assert!(matches!(result, Err(ImportError::Cancelled)));
}

#[test]
fn test_superseded_run_is_discarded() {
    let matcher = ImportMatcher::new(library(), MatchConfig::default());
    let mut session = ImportSession::new("Mix");

    let first = session.begin_run();
    let second = session.begin_run();
    assert!(first.cancel.is_cancelled());

    let stale = matcher.parse_and_resolve("M83 - Wait", &CancelToken::new(), None);
    assert!(matches!(session.finish_run(&first, stale), Err(ImportError::Superseded)));
    assert!(session.entries().is_empty());

    let fresh = matcher.parse_and_resolve("Daft Punk - Digital Love", &second.cancel, None);
    session.finish_run(&second, fresh).unwrap();
    assert_eq!(session.entries()[0].matched_track().map(|t| t.id.as_str()), Some("6"));
}

#[test]
fn test_events_cover_every_entry() {
    let matcher = ImportMatcher::new(library(), MatchConfig::default().with_workers(2).unwrap());
    let (tx, rx) = crossbeam_channel::unbounded::<ResolveEvent>();
    let raw = "M83 - Wait\nM83 - Midnight City\nNobody - Nothing";
    let entries = matcher
        .parse_and_resolve(raw, &CancelToken::new(), Some(&tx))
        .unwrap();
    drop(tx);

    let mut ids: Vec<usize> = rx.iter().map(|e| e.id.0).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![0, 1, 2]);
    // Output keeps input order regardless of completion order
    assert_eq!(entries.iter().map(|e| e.id.0).collect::<Vec<_>>(), vec![0, 1, 2]);
}
