//! Matching and ranking of search candidates against an import entry.
//!
//! This module contains:
//! - Fuzzy artist comparison (`artists_match`)
//! - Exact/partial title classification of search results
//! - Ranking and capping of alternatives shown for disambiguation

use rustc_hash::FxHashSet;

use crate::models::{Resolution, Track};
use crate::normalize::{normalize_for_match, simplify_artist};

// ============================================================================
// Limits
// ============================================================================

/// Partial title matches offered for disambiguation
pub const MAX_PARTIAL_ALTERNATIVES: usize = 10;

/// Artist-only fallback matches offered when no title matched
pub const MAX_ARTIST_ALTERNATIVES: usize = 5;

/// Words this short ("the", "dj", "mc") never count as shared evidence
const MIN_SIGNIFICANT_WORD_CHARS: usize = 3;

// ============================================================================
// Artist Matching
// ============================================================================

fn significant_words(simplified: &str) -> FxHashSet<&str> {
    simplified
        .split(' ')
        .filter(|w| w.chars().count() >= MIN_SIGNIFICANT_WORD_CHARS)
        .collect()
}

/// Compare two artist names that have already been through
/// [`normalize_for_match`].
///
/// Tried in order: containment either way, containment of the simplified
/// forms, then shared significant words. Two shared words are enough; one
/// is enough when either name has at most two significant words.
/// A blank name never matches.
pub fn artists_match_normalized(a: &str, b: &str) -> bool {
    let (a, b) = (a.trim(), b.trim());
    if a.is_empty() || b.is_empty() {
        return false;
    }
    if a.contains(b) || b.contains(a) {
        return true;
    }

    let simple_a = simplify_artist(a);
    let simple_b = simplify_artist(b);
    if !simple_a.is_empty()
        && !simple_b.is_empty()
        && (simple_a.contains(&simple_b) || simple_b.contains(&simple_a))
    {
        return true;
    }

    let words_a = significant_words(&simple_a);
    let words_b = significant_words(&simple_b);
    let common = words_a.intersection(&words_b).count();

    common >= 2 || (common >= 1 && (words_a.len() <= 2 || words_b.len() <= 2))
}

/// Compare two raw artist names, normalizing both first.
pub fn artists_match_with(a: &str, b: &str, fold: bool) -> bool {
    artists_match_normalized(&normalize_for_match(a, fold), &normalize_for_match(b, fold))
}

/// Compare two raw artist names with diacritic folding.
pub fn artists_match(a: &str, b: &str) -> bool {
    artists_match_with(a, b, true)
}

// ============================================================================
// Candidate Classification
// ============================================================================

/// Search results split by how their title relates to the wanted title.
/// Only candidates whose artist matched are kept.
#[derive(Debug, Default)]
pub struct Candidates {
    pub exact: Vec<Track>,
    pub partial: Vec<Track>,
}

/// What the matcher is looking for, normalized once per entry.
#[derive(Debug, Clone)]
pub struct MatchTarget {
    pub artist: String,
    pub title: String,
    pub fold: bool,
}

impl MatchTarget {
    pub fn new(artist: &str, title: &str, fold: bool) -> Self {
        Self {
            artist: normalize_for_match(artist, fold),
            title: normalize_for_match(title, fold),
            fold,
        }
    }

    /// Empty artist means "any artist".
    pub fn accepts_artist(&self, candidate_artist: &str) -> bool {
        self.artist.is_empty()
            || artists_match_normalized(
                &self.artist,
                &normalize_for_match(candidate_artist, self.fold),
            )
    }
}

/// Partition search results into exact and partial title matches.
/// Candidates with a blank title are ignored: an empty string would
/// otherwise be a substring of every title.
pub fn classify_candidates(target: &MatchTarget, results: Vec<Track>) -> Candidates {
    let mut candidates = Candidates::default();

    for track in results {
        let title = normalize_for_match(&track.title, target.fold);
        if title.trim().is_empty() || !target.accepts_artist(&track.artist) {
            continue;
        }
        if title == target.title {
            candidates.exact.push(track);
        } else if title.contains(&target.title) || target.title.contains(&title) {
            candidates.partial.push(track);
        }
    }

    candidates
}

// ============================================================================
// Ranking
// ============================================================================

/// Group versions of the same song: sort by (album, title), case-insensitive.
pub fn rank_exact(tracks: &mut [Track]) {
    tracks.sort_by_cached_key(|t| (t.album.to_lowercase(), t.title.to_lowercase()));
}

/// Shortest title first, so the plain version leads remixes and edits.
/// Ties keep the server's relevance order.
pub fn rank_partial(mut tracks: Vec<Track>, cap: usize) -> Vec<Track> {
    tracks.sort_by_key(|t| t.title.chars().count());
    tracks.truncate(cap);
    tracks
}

/// Turn classified candidates into a resolution.
/// Returns `None` when nothing matched by title, so the caller can try
/// its artist-only fallback.
pub fn resolve_candidates(candidates: Candidates, max_partial: usize) -> Option<Resolution> {
    let Candidates { mut exact, partial } = candidates;

    match exact.len() {
        1 => exact.pop().map(Resolution::AutoMatched),
        0 if partial.is_empty() => None,
        0 => Some(Resolution::NeedsSelection(rank_partial(partial, max_partial))),
        _ => {
            rank_exact(&mut exact);
            Some(Resolution::NeedsSelection(exact))
        }
    }
}

/// Filter artist-search results down to tracks by the wanted artist.
pub fn artist_alternatives(target: &MatchTarget, results: Vec<Track>, cap: usize) -> Vec<Track> {
    results
        .into_iter()
        .filter(|t| target.accepts_artist(&t.artist))
        .take(cap)
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
