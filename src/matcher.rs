//! Import resolution: parsed entries in, matched tracks out.
//!
//! [`ImportMatcher`] resolves every entry against a [`TrackSearch`] backend
//! on a bounded rayon pool. Output order always follows input order.
//! [`ImportSession`] holds the latest run and handles the user's
//! disambiguation picks and the playlist-creation guard.

use anyhow::Result;
use crossbeam_channel::Sender;
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

use crate::config::MatchConfig;
use crate::models::{
    EntryId, EntryStatus, ImportEntry, ImportFilter, Resolution, SelectionError, Track,
};
use crate::parse::{parse_input, ParseError, ParsedEntry};
use crate::scoring::{artist_alternatives, classify_candidates, resolve_candidates, MatchTarget};

// ============================================================================
// Search Backend
// ============================================================================

/// Track search against the music library. Implementations are shared
/// across resolver threads.
pub trait TrackSearch: Sync {
    fn search_tracks(&self, query: &str) -> Result<Vec<Track>>;
}

impl<T: TrackSearch + ?Sized> TrackSearch for &T {
    fn search_tracks(&self, query: &str) -> Result<Vec<Track>> {
        (**self).search_tracks(query)
    }
}

/// Adapts a closure into a [`TrackSearch`].
pub struct SearchFn<F>(pub F);

impl<F> TrackSearch for SearchFn<F>
where
    F: Fn(&str) -> Result<Vec<Track>> + Sync,
{
    fn search_tracks(&self, query: &str) -> Result<Vec<Track>> {
        (self.0)(query)
    }
}

// ============================================================================
// Errors, Cancellation, Events
// ============================================================================

#[derive(Debug, Error)]
pub enum ImportError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("Failed to start resolver pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),

    #[error("Import was cancelled")]
    Cancelled,

    #[error("Import run was superseded by a newer one")]
    Superseded,

    #[error("Playlist name is required")]
    MissingName,

    #[error("No tracks were matched")]
    NothingMatched,

    #[error("{0} entries still need a track selected")]
    SelectionsPending(usize),

    #[error(transparent)]
    Selection(#[from] SelectionError),
}

/// Cooperative cancellation flag shared with in-flight resolver threads.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Sent as each entry finishes, in completion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveEvent {
    pub id: EntryId,
    pub status: EntryStatus,
}

// ============================================================================
// Matcher
// ============================================================================

pub struct ImportMatcher<S> {
    search: S,
    config: MatchConfig,
}

impl<S: TrackSearch> ImportMatcher<S> {
    pub fn new(search: S, config: MatchConfig) -> Self {
        Self { search, config }
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Resolve one (artist, title) pair. Search failures resolve to Missing.
    pub fn resolve(&self, artist: &str, title: &str) -> Resolution {
        match self.try_resolve(artist, title) {
            Ok(resolution) => resolution,
            Err(e) => {
                log::warn!("Search failed for '{} - {}': {:#}", artist, title, e);
                Resolution::Missing
            }
        }
    }

    fn try_resolve(&self, artist: &str, title: &str) -> Result<Resolution> {
        let target = MatchTarget::new(artist, title, self.config.fold_diacritics);

        let results = self.search.search_tracks(title)?;
        let found = results.len();
        let candidates = classify_candidates(&target, results);
        log::debug!(
            "'{}' by '{}': {} results, {} exact, {} partial",
            title,
            artist,
            found,
            candidates.exact.len(),
            candidates.partial.len()
        );
        if let Some(resolution) =
            resolve_candidates(candidates, self.config.max_partial_alternatives)
        {
            return Ok(resolution);
        }

        if artist.trim().is_empty() {
            return Ok(Resolution::Missing);
        }
        let by_artist = self.search.search_tracks(artist)?;
        let alternatives =
            artist_alternatives(&target, by_artist, self.config.max_artist_alternatives);
        log::debug!("'{}': {} artist-only alternatives", artist, alternatives.len());
        Ok(Resolution::from_alternatives(alternatives))
    }

    pub fn resolve_entry(&self, entry: ImportEntry) -> ImportEntry {
        let resolution = self.resolve(&entry.artist, &entry.title);
        entry.resolved(resolution)
    }

    /// Resolve parsed entries concurrently, at most `workers` searches at a time.
    ///
    /// Entries not yet started when `cancel` fires are skipped, and a
    /// cancelled run returns [`ImportError::Cancelled`] rather than a
    /// partial result.
    pub fn resolve_all(
        &self,
        parsed: Vec<ParsedEntry>,
        cancel: &CancelToken,
        events: Option<&Sender<ResolveEvent>>,
    ) -> Result<Vec<ImportEntry>, ImportError> {
        let total = parsed.len();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.workers.max(1))
            .build()?;

        let entries: Vec<ImportEntry> = pool.install(|| {
            parsed
                .into_par_iter()
                .enumerate()
                .map(|(i, p)| {
                    let entry = ImportEntry::pending(EntryId(i), p);
                    if cancel.is_cancelled() {
                        return entry;
                    }
                    let entry = self.resolve_entry(entry);
                    if let Some(tx) = events {
                        // Receiver may be gone
                        let _ = tx.send(ResolveEvent {
                            id: entry.id,
                            status: entry.status(),
                        });
                    }
                    entry
                })
                .collect()
        });

        if cancel.is_cancelled() {
            log::info!("Import cancelled after resolving part of {} entries", total);
            return Err(ImportError::Cancelled);
        }

        let matched = entries.iter().filter(|e| e.status() == EntryStatus::AutoMatched).count();
        log::info!("Resolved {} entries: {} matched", total, matched);
        Ok(entries)
    }

    /// Parse raw import text and resolve every entry.
    pub fn parse_and_resolve(
        &self,
        raw: &str,
        cancel: &CancelToken,
        events: Option<&Sender<ResolveEvent>>,
    ) -> Result<Vec<ImportEntry>, ImportError> {
        let parsed = parse_input(raw)?;
        log::info!("Parsed {} entries", parsed.len());
        self.resolve_all(parsed, cancel, events)
    }
}

// ============================================================================
// Session
// ============================================================================

/// Handle for one resolution run. Results are only accepted from the
/// newest run's ticket.
#[derive(Debug, Clone)]
pub struct RunTicket {
    generation: u64,
    pub cancel: CancelToken,
}

/// Import state between parsing and playlist creation.
#[derive(Debug, Default)]
pub struct ImportSession {
    pub playlist_name: String,
    entries: Vec<ImportEntry>,
    generation: u64,
    cancel: CancelToken,
}

impl ImportSession {
    pub fn new(playlist_name: &str) -> Self {
        Self {
            playlist_name: playlist_name.to_string(),
            ..Self::default()
        }
    }

    /// Start a new run: cancels the previous one and drops its entries.
    pub fn begin_run(&mut self) -> RunTicket {
        self.cancel.cancel();
        self.cancel = CancelToken::new();
        self.generation += 1;
        self.entries.clear();
        RunTicket {
            generation: self.generation,
            cancel: self.cancel.clone(),
        }
    }

    /// Accept a run's result, unless a newer run has started since.
    pub fn finish_run(
        &mut self,
        ticket: &RunTicket,
        result: Result<Vec<ImportEntry>, ImportError>,
    ) -> Result<(), ImportError> {
        if ticket.generation != self.generation {
            return Err(ImportError::Superseded);
        }
        self.entries = result?;
        Ok(())
    }

    /// Begin a run, resolve `raw` on the calling thread, and store the result.
    pub fn run<S: TrackSearch>(
        &mut self,
        matcher: &ImportMatcher<S>,
        raw: &str,
        events: Option<&Sender<ResolveEvent>>,
    ) -> Result<(), ImportError> {
        let ticket = self.begin_run();
        let result = matcher.parse_and_resolve(raw, &ticket.cancel, events);
        self.finish_run(&ticket, result)
    }

    pub fn clear(&mut self) {
        self.begin_run();
    }

    pub fn entries(&self) -> &[ImportEntry] {
        &self.entries
    }

    pub fn filtered(&self, filter: ImportFilter) -> impl Iterator<Item = &ImportEntry> {
        self.entries.iter().filter(move |e| filter.accepts(e))
    }

    pub fn select_alternative(
        &mut self,
        id: EntryId,
        track_id: &str,
    ) -> Result<&Track, SelectionError> {
        self.entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(SelectionError::UnknownEntry(id))?
            .select_alternative(track_id)
    }

    fn count(&self, status: EntryStatus) -> usize {
        self.entries.iter().filter(|e| e.status() == status).count()
    }

    pub fn matched_count(&self) -> usize {
        self.count(EntryStatus::AutoMatched)
    }

    pub fn needs_selection_count(&self) -> usize {
        self.count(EntryStatus::NeedsSelection)
    }

    pub fn missing_count(&self) -> usize {
        self.count(EntryStatus::Missing)
    }

    /// Matched tracks in input order.
    pub fn tracks_to_add(&self) -> Vec<&Track> {
        self.entries.iter().filter_map(ImportEntry::matched_track).collect()
    }

    pub fn can_create_playlist(&self) -> bool {
        self.creation_tracks(false).is_ok()
    }

    /// Tracks for the new playlist, or why it cannot be created yet.
    /// Pending selections block creation unless `accept_partial` is set.
    pub fn creation_tracks(&self, accept_partial: bool) -> Result<Vec<Track>, ImportError> {
        if self.playlist_name.trim().is_empty() {
            return Err(ImportError::MissingName);
        }
        let tracks: Vec<Track> = self.tracks_to_add().into_iter().cloned().collect();
        if tracks.is_empty() {
            return Err(ImportError::NothingMatched);
        }
        let pending = self.needs_selection_count();
        if pending > 0 && !accept_partial {
            return Err(ImportError::SelectionsPending(pending));
        }
        Ok(tracks)
    }
}
