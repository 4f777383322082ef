//! Playlist editing on top of a [`PlaylistStore`], with undo.
//!
//! Reorders are two-phase: the local order changes first, then the server
//! is told. If the server refuses, the local order is replaced by a fresh
//! fetch and the caller gets [`EditError::Reverted`].

use anyhow::Result;
use rustc_hash::FxHashSet;
use thiserror::Error;

use crate::filter::{SmartPlaylist, SortOption};
use crate::models::{Playlist, PlaylistItem, Track};

// ============================================================================
// Store Interface
// ============================================================================

/// Replacement source of a smart playlist. Filter, limit and sort are
/// always sent together, so a partial source never wipes the others.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmartSource {
    pub filter: String,
    pub limit: Option<u32>,
    pub sort: Option<SortOption>,
}

/// Changes to an existing playlist. Unset fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaylistUpdate {
    pub title: Option<String>,
    pub summary: Option<String>,
    pub source: Option<SmartSource>, // Smart playlists only
}

impl PlaylistUpdate {
    /// Update carrying a smart playlist's title and full source.
    /// Rules that compile to no filter are refused rather than turning
    /// the playlist into "all tracks".
    pub fn from_smart(smart: &SmartPlaylist) -> Result<Self, EditError> {
        let filter = smart.filter();
        if filter.is_empty() {
            return Err(EditError::EmptySmartFilter(smart.title.clone()));
        }
        Ok(Self {
            title: Some(smart.title.clone()),
            summary: None,
            source: Some(SmartSource {
                filter,
                limit: smart.limit,
                sort: smart.sort,
            }),
        })
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Remote playlist storage.
pub trait PlaylistStore {
    fn playlists(&self) -> Result<Vec<Playlist>>;
    fn playlist_items(&self, playlist_id: &str) -> Result<Vec<PlaylistItem>>;
    fn create_playlist(&self, title: &str, tracks: &[Track]) -> Result<Playlist>;
    fn create_smart_playlist(&self, smart: &SmartPlaylist) -> Result<Playlist>;
    fn update_playlist(&self, playlist_id: &str, update: &PlaylistUpdate) -> Result<Playlist>;
    fn delete_playlist(&self, playlist_id: &str) -> Result<()>;
    fn add_tracks(&self, playlist_id: &str, tracks: &[Track]) -> Result<()>;
    /// Place `item_id` right after `after_item_id`, or first when `None`.
    fn move_item(
        &self,
        playlist_id: &str,
        item_id: &str,
        after_item_id: Option<&str>,
    ) -> Result<()>;
    fn remove_item(&self, playlist_id: &str, item_id: &str) -> Result<()>;
}

impl<T: PlaylistStore + ?Sized> PlaylistStore for &T {
    fn playlists(&self) -> Result<Vec<Playlist>> {
        (**self).playlists()
    }
    fn playlist_items(&self, playlist_id: &str) -> Result<Vec<PlaylistItem>> {
        (**self).playlist_items(playlist_id)
    }
    fn create_playlist(&self, title: &str, tracks: &[Track]) -> Result<Playlist> {
        (**self).create_playlist(title, tracks)
    }
    fn create_smart_playlist(&self, smart: &SmartPlaylist) -> Result<Playlist> {
        (**self).create_smart_playlist(smart)
    }
    fn update_playlist(&self, playlist_id: &str, update: &PlaylistUpdate) -> Result<Playlist> {
        (**self).update_playlist(playlist_id, update)
    }
    fn delete_playlist(&self, playlist_id: &str) -> Result<()> {
        (**self).delete_playlist(playlist_id)
    }
    fn add_tracks(&self, playlist_id: &str, tracks: &[Track]) -> Result<()> {
        (**self).add_tracks(playlist_id, tracks)
    }
    fn move_item(
        &self,
        playlist_id: &str,
        item_id: &str,
        after_item_id: Option<&str>,
    ) -> Result<()> {
        (**self).move_item(playlist_id, item_id, after_item_id)
    }
    fn remove_item(&self, playlist_id: &str, item_id: &str) -> Result<()> {
        (**self).remove_item(playlist_id, item_id)
    }
}

// ============================================================================
// Errors and Undo
// ============================================================================

#[derive(Debug, Error)]
pub enum EditError {
    #[error(transparent)]
    Store(#[from] anyhow::Error),

    #[error("Reorder failed and the previous order was restored: {0}")]
    Reverted(anyhow::Error),

    #[error("No playlist is open")]
    NoPlaylistOpen,

    #[error("Playlist {0} not found")]
    UnknownPlaylist(String),

    #[error("Playlist item {0} not found")]
    UnknownItem(String),

    #[error("Position {index} is out of range for {len} items")]
    OutOfRange { index: usize, len: usize },

    #[error("Playlist title is required")]
    MissingTitle,

    #[error("A playlist needs at least one track")]
    EmptyPlaylist,

    #[error("Smart playlist '{0}' cannot be restored")]
    SmartNotRestorable(String),

    #[error("Nothing to undo")]
    NothingToUndo,

    #[error("Smart playlist '{0}' has no rules with values")]
    EmptySmartFilter(String),
}

/// A reversible edit and what is needed to reverse it.
#[derive(Debug, Clone, PartialEq)]
pub enum UndoAction {
    AddTracks {
        playlist_id: String,
        item_ids: Vec<String>,
    },
    RemoveTrack {
        playlist_id: String,
        track: Track,
        index: usize,
    },
    MoveTrack {
        playlist_id: String,
        item_id: String,
        from: usize,
        to: usize,
    },
    Reorder {
        playlist_id: String,
        previous_order: Vec<String>,
    },
    DeletePlaylist {
        playlist: Playlist,
        tracks: Vec<Track>,
    },
}

impl UndoAction {
    pub fn description(&self) -> String {
        match self {
            UndoAction::AddTracks { item_ids, .. } if item_ids.len() == 1 => {
                "Add Track".to_string()
            }
            UndoAction::AddTracks { item_ids, .. } => format!("Add {} Tracks", item_ids.len()),
            UndoAction::RemoveTrack { track, .. } => format!("Remove \"{}\"", track.title),
            UndoAction::MoveTrack { .. } => "Move Track".to_string(),
            UndoAction::Reorder { .. } => "Move Tracks".to_string(),
            UndoAction::DeletePlaylist { playlist, .. } => format!("Delete \"{}\"", playlist.title),
        }
    }

    fn playlist_id(&self) -> &str {
        match self {
            UndoAction::AddTracks { playlist_id, .. }
            | UndoAction::RemoveTrack { playlist_id, .. }
            | UndoAction::MoveTrack { playlist_id, .. }
            | UndoAction::Reorder { playlist_id, .. } => playlist_id,
            UndoAction::DeletePlaylist { playlist, .. } => &playlist.id,
        }
    }
}

// ============================================================================
// Ordering Helpers
// ============================================================================

/// Item a slot should follow: the one before it, or none at the front.
fn predecessor(order: &[PlaylistItem], index: usize) -> Option<String> {
    index.checked_sub(1).map(|i| order[i].item_id.clone())
}

fn position(items: &[PlaylistItem], item_id: &str) -> Result<usize, EditError> {
    items
        .iter()
        .position(|i| i.item_id == item_id)
        .ok_or_else(|| EditError::UnknownItem(item_id.to_string()))
}

// ============================================================================
// Editor
// ============================================================================

pub struct PlaylistEditor<S> {
    store: S,
    playlist_id: Option<String>,
    items: Vec<PlaylistItem>,
    undo_stack: Vec<UndoAction>,
}

impl<S: PlaylistStore> PlaylistEditor<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            playlist_id: None,
            items: Vec::new(),
            undo_stack: Vec::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn items(&self) -> &[PlaylistItem] {
        &self.items
    }

    pub fn open_playlist_id(&self) -> Option<&str> {
        self.playlist_id.as_deref()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Description of the action `undo` would reverse.
    pub fn undo_description(&self) -> Option<String> {
        self.undo_stack.last().map(UndoAction::description)
    }

    /// Load a playlist's items and make it the current playlist.
    pub fn open(&mut self, playlist_id: &str) -> Result<&[PlaylistItem], EditError> {
        self.items = self.store.playlist_items(playlist_id)?;
        self.playlist_id = Some(playlist_id.to_string());
        log::debug!("Opened playlist {} with {} items", playlist_id, self.items.len());
        Ok(self.items.as_slice())
    }

    fn current(&self) -> Result<String, EditError> {
        self.playlist_id.clone().ok_or(EditError::NoPlaylistOpen)
    }

    /// Reload items if `playlist_id` is the open playlist.
    fn refresh_if_open(&mut self, playlist_id: &str) -> Result<(), EditError> {
        if self.playlist_id.as_deref() == Some(playlist_id) {
            self.items = self.store.playlist_items(playlist_id)?;
        }
        Ok(())
    }

    /// Drop speculative order and take the server's. Keeps the snapshot
    /// if even the refetch fails.
    fn rollback(
        &mut self,
        playlist_id: &str,
        snapshot: Vec<PlaylistItem>,
        cause: anyhow::Error,
    ) -> EditError {
        log::warn!(
            "Reorder of playlist {} failed, restoring server order: {:#}",
            playlist_id,
            cause
        );
        self.items = self.store.playlist_items(playlist_id).unwrap_or(snapshot);
        EditError::Reverted(cause)
    }

    pub fn create_playlist(
        &mut self,
        title: &str,
        tracks: &[Track],
    ) -> Result<Playlist, EditError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(EditError::MissingTitle);
        }
        if tracks.is_empty() {
            return Err(EditError::EmptyPlaylist);
        }
        let playlist = self.store.create_playlist(title, tracks)?;
        log::info!("Created playlist '{}' with {} tracks", playlist.title, tracks.len());
        Ok(playlist)
    }

    /// Append tracks to the open playlist.
    pub fn add_tracks(&mut self, tracks: &[Track]) -> Result<(), EditError> {
        let playlist_id = self.current()?;
        if tracks.is_empty() {
            return Ok(());
        }
        let before: FxHashSet<String> = self.items.iter().map(|i| i.item_id.clone()).collect();
        self.store.add_tracks(&playlist_id, tracks)?;
        self.items = self.store.playlist_items(&playlist_id)?;

        let item_ids: Vec<String> = self
            .items
            .iter()
            .filter(|i| !before.contains(&i.item_id))
            .map(|i| i.item_id.clone())
            .collect();
        self.undo_stack.push(UndoAction::AddTracks {
            playlist_id,
            item_ids,
        });
        Ok(())
    }

    pub fn remove_item(&mut self, item_id: &str) -> Result<(), EditError> {
        let playlist_id = self.current()?;
        let index = position(&self.items, item_id)?;
        self.store.remove_item(&playlist_id, item_id)?;
        let removed = self.items.remove(index);
        self.undo_stack.push(UndoAction::RemoveTrack {
            playlist_id,
            track: removed.track,
            index,
        });
        Ok(())
    }

    /// Move the item at `from` to drop position `destination`, where
    /// `destination` counts slots in the list before the move (0..=len).
    pub fn move_item(&mut self, from: usize, destination: usize) -> Result<(), EditError> {
        let len = self.items.len();
        if from >= len {
            return Err(EditError::OutOfRange { index: from, len });
        }
        if destination > len {
            return Err(EditError::OutOfRange {
                index: destination,
                len,
            });
        }
        let to = if destination > from { destination - 1 } else { destination };
        if to == from {
            return Ok(());
        }
        let item_id = self.items[from].item_id.clone();
        self.reposition(&item_id, from, to)?;
        let playlist_id = self.current()?;
        self.undo_stack.push(UndoAction::MoveTrack {
            playlist_id,
            item_id,
            from,
            to,
        });
        Ok(())
    }

    /// Two-phase single-item move from index `from` to final index `to`.
    fn reposition(&mut self, item_id: &str, from: usize, to: usize) -> Result<(), EditError> {
        let playlist_id = self.current()?;
        let snapshot = self.items.clone();

        let item = self.items.remove(from);
        self.items.insert(to, item);
        let after = predecessor(&self.items, to);

        match self.store.move_item(&playlist_id, item_id, after.as_deref()) {
            Ok(()) => Ok(()),
            Err(e) => Err(self.rollback(&playlist_id, snapshot, e)),
        }
    }

    /// Move several items, kept in their current relative order, to drop
    /// position `destination`.
    pub fn move_selected(
        &mut self,
        item_ids: &[String],
        destination: usize,
    ) -> Result<(), EditError> {
        let playlist_id = self.current()?;
        let len = self.items.len();
        if destination > len {
            return Err(EditError::OutOfRange {
                index: destination,
                len,
            });
        }
        for id in item_ids {
            position(&self.items, id)?;
        }
        let selected_set: FxHashSet<&str> = item_ids.iter().map(String::as_str).collect();

        let snapshot = self.items.clone();
        let previous_order: Vec<String> = snapshot.iter().map(|i| i.item_id.clone()).collect();

        let (selected, mut rest): (Vec<PlaylistItem>, Vec<PlaylistItem>) = snapshot
            .iter()
            .cloned()
            .partition(|i| selected_set.contains(i.item_id.as_str()));
        let insert_at = snapshot[..destination]
            .iter()
            .filter(|i| !selected_set.contains(i.item_id.as_str()))
            .count();
        let count = selected.len();
        let tail = rest.split_off(insert_at);
        rest.extend(selected);
        rest.extend(tail);
        if rest == snapshot {
            return Ok(());
        }
        self.items = rest;

        for index in insert_at..insert_at + count {
            let item_id = self.items[index].item_id.clone();
            let after = predecessor(&self.items, index);
            if let Err(e) = self.store.move_item(&playlist_id, &item_id, after.as_deref()) {
                return Err(self.rollback(&playlist_id, snapshot, e));
            }
        }
        self.undo_stack.push(UndoAction::Reorder {
            playlist_id,
            previous_order,
        });
        Ok(())
    }

    /// Delete a playlist, keeping its tracks so it can be recreated.
    pub fn delete_playlist(&mut self, playlist_id: &str) -> Result<(), EditError> {
        let playlist = self
            .store
            .playlists()?
            .into_iter()
            .find(|p| p.id == playlist_id)
            .ok_or_else(|| EditError::UnknownPlaylist(playlist_id.to_string()))?;
        let tracks: Vec<Track> = if playlist.smart {
            Vec::new()
        } else {
            self.store.playlist_items(playlist_id)?.into_iter().map(|i| i.track).collect()
        };

        self.store.delete_playlist(playlist_id)?;
        if self.playlist_id.as_deref() == Some(playlist_id) {
            self.playlist_id = None;
            self.items.clear();
        }
        log::info!("Deleted playlist '{}'", playlist.title);
        self.undo_stack.push(UndoAction::DeletePlaylist { playlist, tracks });
        Ok(())
    }

    /// Reverse the most recent edit. Undoing never adds to the undo stack.
    /// Returns the playlist recreated when a deletion was undone.
    pub fn undo(&mut self) -> Result<Option<Playlist>, EditError> {
        let action = self.undo_stack.pop().ok_or(EditError::NothingToUndo)?;
        log::info!("Undo {}", action.description());
        let playlist_id = action.playlist_id().to_string();

        match action {
            UndoAction::AddTracks { item_ids, .. } => {
                for item_id in &item_ids {
                    self.store.remove_item(&playlist_id, item_id)?;
                }
            }
            UndoAction::RemoveTrack { track, index, .. } => {
                let before: FxHashSet<String> = self
                    .store
                    .playlist_items(&playlist_id)?
                    .into_iter()
                    .map(|i| i.item_id)
                    .collect();
                self.store.add_tracks(&playlist_id, std::slice::from_ref(&track))?;

                let mut items = self.store.playlist_items(&playlist_id)?;
                if let Some(pos) = items.iter().position(|i| !before.contains(&i.item_id)) {
                    let restored = items.remove(pos);
                    let index = index.min(items.len());
                    let after = predecessor(&items, index);
                    self.store.move_item(&playlist_id, &restored.item_id, after.as_deref())?;
                }
            }
            UndoAction::MoveTrack { item_id, from, .. } => {
                let mut items = self.store.playlist_items(&playlist_id)?;
                let current = position(&items, &item_id)?;
                items.remove(current);
                let after = predecessor(&items, from.min(items.len()));
                self.store.move_item(&playlist_id, &item_id, after.as_deref())?;
            }
            UndoAction::Reorder { previous_order, .. } => {
                let mut after: Option<&str> = None;
                for item_id in &previous_order {
                    self.store.move_item(&playlist_id, item_id, after)?;
                    after = Some(item_id.as_str());
                }
            }
            UndoAction::DeletePlaylist { playlist, tracks } => {
                if playlist.smart {
                    return Err(EditError::SmartNotRestorable(playlist.title));
                }
                if tracks.is_empty() {
                    return Err(EditError::EmptyPlaylist);
                }
                let restored = self.store.create_playlist(&playlist.title, &tracks)?;
                return Ok(Some(restored));
            }
        }

        self.refresh_if_open(&playlist_id)?;
        Ok(None)
    }
}
