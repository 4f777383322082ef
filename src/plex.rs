//! Blocking client for the Plex Media Server REST API.
//!
//! Implements [`TrackSearch`] for import matching and [`PlaylistStore`] for
//! playlist editing. Responses are requested as JSON and decoded from the
//! `MediaContainer` envelope.

use anyhow::Result as AnyResult;
use once_cell::sync::OnceCell;
use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

use crate::config::{ConfigError, PlexConfig, PRODUCT_NAME};
use crate::editor::{PlaylistStore, PlaylistUpdate, SmartSource};
use crate::filter::SmartPlaylist;
use crate::matcher::TrackSearch;
use crate::models::{MusicLibrary, Playlist, PlaylistItem, Track};

/// Plex metadata type for tracks.
const TRACK_TYPE: &str = "10";

/// Results per search request.
const SEARCH_LIMIT: &str = "50";

#[derive(Debug, Error)]
pub enum PlexError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Authentication failed (HTTP {0})")]
    Unauthorized(u16),

    #[error("Server error {0}: {1}")]
    Api(u16, String),

    #[error("Invalid response from server: {0}")]
    InvalidResponse(String),

    #[error("No music library found on server")]
    NoMusicLibrary,

    #[error("Plex requires at least one track to create a playlist")]
    PlaylistRequiresTrack,

    #[error("Invalid value for header {0}")]
    InvalidHeader(&'static str),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

// ============================================================================
// Wire Format
// ============================================================================

#[derive(Deserialize)]
struct Envelope<T> {
    #[serde(rename = "MediaContainer")]
    container: T,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdentityContainer {
    machine_identifier: String,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct DirectoryContainer {
    #[serde(rename = "Directory")]
    directories: Vec<PlexDirectory>,
}

#[derive(Deserialize)]
struct PlexDirectory {
    key: String,
    title: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct MetadataContainer {
    #[serde(rename = "Metadata")]
    metadata: Vec<PlexMetadata>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct PlexMedia {
    #[serde(rename = "Part")]
    parts: Vec<PlexPart>,
}

#[derive(Deserialize)]
struct PlexPart {
    key: String,
}

#[derive(Deserialize)]
struct PlexTag {
    tag: String,
}

/// One `Metadata` element. Tracks, playlists and playlist items share it.
#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct PlexMetadata {
    rating_key: String,
    #[serde(rename = "playlistItemID")]
    playlist_item_id: Option<u64>,
    title: String,
    grandparent_title: Option<String>, // Track artist
    original_title: Option<String>,    // Track artist when it differs from the album artist
    parent_title: Option<String>,      // Album
    duration: Option<u64>,
    index: Option<u32>,
    year: Option<i32>,
    parent_year: Option<i32>,
    thumb: Option<String>,
    parent_thumb: Option<String>,
    grandparent_thumb: Option<String>,
    composite: Option<String>,
    user_rating: Option<f64>,
    rating: Option<f64>,
    view_count: Option<u32>,
    last_viewed_at: Option<i64>,
    added_at: Option<i64>,
    updated_at: Option<i64>,
    summary: Option<String>,
    leaf_count: Option<u32>,
    smart: Option<bool>,
    #[serde(rename = "Media")]
    media: Vec<PlexMedia>,
    #[serde(rename = "Genre")]
    genres: Vec<PlexTag>,
}

impl PlexMetadata {
    fn into_track(self) -> Track {
        // Left blank when unknown so it never matches an import artist
        let artist = self.grandparent_title.or(self.original_title).unwrap_or_default();
        let media_key = self
            .media
            .into_iter()
            .next()
            .and_then(|m| m.parts.into_iter().next())
            .map(|p| p.key);
        Track {
            id: self.rating_key,
            title: self.title,
            artist,
            album: self.parent_title.unwrap_or_default(),
            duration_ms: self.duration,
            track_number: self.index,
            year: self.year.or(self.parent_year),
            thumb: self.thumb.or(self.parent_thumb).or(self.grandparent_thumb),
            rating: self.user_rating.or(self.rating),
            play_count: self.view_count.unwrap_or(0),
            last_played_at: self.last_viewed_at,
            added_at: self.added_at,
            media_key,
            genre: self.genres.into_iter().next().map(|g| g.tag),
        }
    }

    fn into_playlist(self) -> Playlist {
        Playlist {
            id: self.rating_key,
            title: self.title,
            summary: self.summary.filter(|s| !s.is_empty()),
            thumb: self.thumb.or(self.composite),
            duration_ms: self.duration,
            leaf_count: self.leaf_count.unwrap_or(0),
            smart: self.smart.unwrap_or(false),
            added_at: self.added_at,
            updated_at: self.updated_at,
        }
    }

    /// Slot id: `playlistItemID`, else the track's rating key, else position.
    fn into_playlist_item(self, index: usize) -> PlaylistItem {
        let item_id = match (self.playlist_item_id, self.rating_key.is_empty()) {
            (Some(id), _) => id.to_string(),
            (None, false) => self.rating_key.clone(),
            (None, true) => index.to_string(),
        };
        PlaylistItem {
            item_id,
            track: self.into_track(),
        }
    }
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, PlexError> {
    serde_json::from_str::<Envelope<T>>(body)
        .map(|e| e.container)
        .map_err(|e| PlexError::InvalidResponse(e.to_string()))
}

fn decode_metadata(body: &str) -> Result<Vec<PlexMetadata>, PlexError> {
    Ok(decode::<MetadataContainer>(body)?.metadata)
}

pub fn parse_tracks(body: &str) -> Result<Vec<Track>, PlexError> {
    Ok(decode_metadata(body)?.into_iter().map(PlexMetadata::into_track).collect())
}

pub fn parse_playlists(body: &str) -> Result<Vec<Playlist>, PlexError> {
    Ok(decode_metadata(body)?.into_iter().map(PlexMetadata::into_playlist).collect())
}

pub fn parse_playlist_items(body: &str) -> Result<Vec<PlaylistItem>, PlexError> {
    Ok(decode_metadata(body)?
        .into_iter()
        .enumerate()
        .map(|(i, m)| m.into_playlist_item(i))
        .collect())
}

pub fn parse_music_libraries(body: &str) -> Result<Vec<MusicLibrary>, PlexError> {
    Ok(decode::<DirectoryContainer>(body)?
        .directories
        .into_iter()
        .filter(|d| d.kind == "artist")
        .map(|d| MusicLibrary {
            key: d.key,
            title: d.title,
        })
        .collect())
}

fn parse_machine_id(body: &str) -> Result<String, PlexError> {
    Ok(decode::<IdentityContainer>(body)?.machine_identifier)
}

fn first_playlist(body: &str) -> Result<Playlist, PlexError> {
    parse_playlists(body)?
        .into_iter()
        .next()
        .ok_or_else(|| PlexError::InvalidResponse("no playlist in response".to_string()))
}

// ============================================================================
// URIs
// ============================================================================

fn library_root(machine_id: &str) -> String {
    format!("server://{}/com.plexapp.plugins.library", machine_id)
}

/// URI naming one or more library tracks, e.g. when adding them to a playlist.
pub fn tracks_uri(machine_id: &str, track_ids: &[&str]) -> String {
    format!("{}/library/metadata/{}", library_root(machine_id), track_ids.join(","))
}

/// URI of a smart playlist's source: the section's tracks, filtered,
/// sorted and limited.
pub fn source_uri(machine_id: &str, section_key: &str, source: &SmartSource) -> String {
    let mut uri = format!(
        "{}/library/sections/{}/all?type={}",
        library_root(machine_id),
        section_key,
        TRACK_TYPE
    );
    if !source.filter.is_empty() {
        uri.push('&');
        uri.push_str(&source.filter);
    }
    if let Some(sort) = source.sort {
        uri.push_str("&sort=");
        uri.push_str(sort.plex_sort());
    }
    if let Some(limit) = source.limit {
        uri.push_str(&format!("&limit={}", limit));
    }
    uri
}

pub fn smart_uri(machine_id: &str, section_key: &str, smart: &SmartPlaylist) -> String {
    let source = SmartSource {
        filter: smart.filter(),
        limit: smart.limit,
        sort: smart.sort,
    };
    source_uri(machine_id, section_key, &source)
}

/// Query parameters for the in-place title/summary edit.
fn edit_params(update: &PlaylistUpdate) -> Vec<(&'static str, String)> {
    let mut params = Vec::new();
    if let Some(title) = &update.title {
        params.push(("title", title.clone()));
    }
    if let Some(summary) = &update.summary {
        params.push(("summary", summary.clone()));
    }
    params
}

// ============================================================================
// Client
// ============================================================================

pub struct PlexClient {
    http: Client,
    config: PlexConfig,
    machine_id: OnceCell<String>,
    section_key: OnceCell<String>,
}

fn header(name: &'static str, value: &str) -> Result<HeaderValue, PlexError> {
    HeaderValue::from_str(value).map_err(|_| PlexError::InvalidHeader(name))
}

impl PlexClient {
    pub fn new(config: PlexConfig) -> Result<Self, PlexError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert("x-plex-token", header("X-Plex-Token", &config.token)?);
        headers.insert(
            "x-plex-client-identifier",
            header("X-Plex-Client-Identifier", &config.client_identifier)?,
        );
        headers.insert("x-plex-product", HeaderValue::from_static(PRODUCT_NAME));
        headers.insert("x-plex-version", HeaderValue::from_static(env!("CARGO_PKG_VERSION")));
        headers.insert("x-plex-platform", HeaderValue::from_static(std::env::consts::OS));
        headers.insert("x-plex-device", HeaderValue::from_static("CLI"));

        let http = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .danger_accept_invalid_certs(config.allow_insecure)
            .build()?;

        Ok(Self {
            http,
            section_key: config
                .library_section
                .clone()
                .map(OnceCell::with_value)
                .unwrap_or_default(),
            config,
            machine_id: OnceCell::new(),
        })
    }

    pub fn config(&self) -> &PlexConfig {
        &self.config
    }

    fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Response, PlexError> {
        let url = self.config.endpoint(path)?;
        log::debug!("{} {} {:?}", method, path, query);
        let response = self.http.request(method, url).query(query).send()?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(PlexError::Unauthorized(status.as_u16()));
        }
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(PlexError::Api(status.as_u16(), body));
        }
        Ok(response)
    }

    fn fetch(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<String, PlexError> {
        Ok(self.request(method, path, query)?.text()?)
    }

    /// Server machine identifier, fetched once.
    pub fn machine_id(&self) -> Result<&str, PlexError> {
        self.machine_id
            .get_or_try_init(|| -> Result<String, PlexError> {
                parse_machine_id(&self.fetch(Method::GET, "/identity", &[])?)
            })
            .map(String::as_str)
    }

    pub fn music_libraries(&self) -> Result<Vec<MusicLibrary>, PlexError> {
        parse_music_libraries(&self.fetch(Method::GET, "/library/sections", &[])?)
    }

    /// Configured music section, or the server's first one.
    pub fn music_section_key(&self) -> Result<&str, PlexError> {
        self.section_key
            .get_or_try_init(|| -> Result<String, PlexError> {
                let library = self
                    .music_libraries()?
                    .into_iter()
                    .next()
                    .ok_or(PlexError::NoMusicLibrary)?;
                log::info!("Using music library '{}' (section {})", library.title, library.key);
                Ok(library.key)
            })
            .map(String::as_str)
    }

    /// Search tracks, optionally within one library section.
    pub fn search_tracks_in(
        &self,
        query: &str,
        section: Option<&str>,
    ) -> Result<Vec<Track>, PlexError> {
        let path = match section {
            Some(key) => format!("/library/sections/{}/search", key),
            None => "/search".to_string(),
        };
        let params = [
            ("query", query.to_string()),
            ("type", TRACK_TYPE.to_string()),
            ("limit", SEARCH_LIMIT.to_string()),
        ];
        parse_tracks(&self.fetch(Method::GET, &path, &params)?)
    }

    pub fn list_playlists(&self) -> Result<Vec<Playlist>, PlexError> {
        let params = [("playlistType", "audio".to_string())];
        parse_playlists(&self.fetch(Method::GET, "/playlists", &params)?)
    }

    pub fn get_playlist(&self, playlist_id: &str) -> Result<Playlist, PlexError> {
        first_playlist(&self.fetch(Method::GET, &format!("/playlists/{}", playlist_id), &[])?)
    }

    pub fn list_items(&self, playlist_id: &str) -> Result<Vec<PlaylistItem>, PlexError> {
        let path = format!("/playlists/{}/items", playlist_id);
        parse_playlist_items(&self.fetch(Method::GET, &path, &[])?)
    }

    fn uri_for(&self, tracks: &[Track]) -> Result<String, PlexError> {
        let ids: Vec<&str> = tracks.iter().map(|t| t.id.as_str()).collect();
        Ok(tracks_uri(self.machine_id()?, &ids))
    }

    pub fn create(&self, title: &str, tracks: &[Track]) -> Result<Playlist, PlexError> {
        if tracks.is_empty() {
            return Err(PlexError::PlaylistRequiresTrack);
        }
        let params = [
            ("type", "audio".to_string()),
            ("title", title.to_string()),
            ("smart", "0".to_string()),
            ("uri", self.uri_for(tracks)?),
        ];
        match self.fetch(Method::POST, "/playlists", &params) {
            Err(PlexError::Api(400, _)) => Err(PlexError::PlaylistRequiresTrack),
            result => first_playlist(&result?),
        }
    }

    pub fn create_smart(&self, smart: &SmartPlaylist) -> Result<Playlist, PlexError> {
        let uri = smart_uri(self.machine_id()?, self.music_section_key()?, smart);
        let params = [
            ("type", "audio".to_string()),
            ("title", smart.title.clone()),
            ("smart", "1".to_string()),
            ("uri", uri),
        ];
        first_playlist(&self.fetch(Method::POST, "/playlists", &params)?)
    }

    /// Apply an update. Title and summary are edited in place; a new
    /// source replaces the smart filter, limit and sort as one unit.
    pub fn update(
        &self,
        playlist_id: &str,
        update: &PlaylistUpdate,
    ) -> Result<Playlist, PlexError> {
        let params = edit_params(update);
        if !params.is_empty() {
            self.request(Method::PUT, &format!("/playlists/{}", playlist_id), &params)?;
        }

        if let Some(source) = &update.source {
            let uri = source_uri(self.machine_id()?, self.music_section_key()?, source);
            let path = format!("/playlists/{}/items", playlist_id);
            self.request(Method::PUT, &path, &[("uri", uri)])?;
        }

        self.get_playlist(playlist_id)
    }

    pub fn delete(&self, playlist_id: &str) -> Result<(), PlexError> {
        self.request(Method::DELETE, &format!("/playlists/{}", playlist_id), &[])?;
        Ok(())
    }

    pub fn add(&self, playlist_id: &str, tracks: &[Track]) -> Result<(), PlexError> {
        if tracks.is_empty() {
            return Ok(());
        }
        let params = [("uri", self.uri_for(tracks)?)];
        self.request(Method::PUT, &format!("/playlists/{}/items", playlist_id), &params)?;
        Ok(())
    }

    pub fn move_after(
        &self,
        playlist_id: &str,
        item_id: &str,
        after: Option<&str>,
    ) -> Result<(), PlexError> {
        let params: Vec<(&str, String)> =
            after.map(|a| ("after", a.to_string())).into_iter().collect();
        let path = format!("/playlists/{}/items/{}/move", playlist_id, item_id);
        self.request(Method::PUT, &path, &params)?;
        Ok(())
    }

    pub fn remove(&self, playlist_id: &str, item_id: &str) -> Result<(), PlexError> {
        let path = format!("/playlists/{}/items/{}", playlist_id, item_id);
        self.request(Method::DELETE, &path, &[])?;
        Ok(())
    }
}

impl TrackSearch for PlexClient {
    fn search_tracks(&self, query: &str) -> AnyResult<Vec<Track>> {
        Ok(self.search_tracks_in(query, self.config.library_section.as_deref())?)
    }
}

impl PlaylistStore for PlexClient {
    fn playlists(&self) -> AnyResult<Vec<Playlist>> {
        Ok(self.list_playlists()?)
    }

    fn playlist_items(&self, playlist_id: &str) -> AnyResult<Vec<PlaylistItem>> {
        Ok(self.list_items(playlist_id)?)
    }

    fn create_playlist(&self, title: &str, tracks: &[Track]) -> AnyResult<Playlist> {
        Ok(self.create(title, tracks)?)
    }

    fn create_smart_playlist(&self, smart: &SmartPlaylist) -> AnyResult<Playlist> {
        Ok(self.create_smart(smart)?)
    }

    fn update_playlist(&self, playlist_id: &str, update: &PlaylistUpdate) -> AnyResult<Playlist> {
        Ok(self.update(playlist_id, update)?)
    }

    fn delete_playlist(&self, playlist_id: &str) -> AnyResult<()> {
        Ok(self.delete(playlist_id)?)
    }

    fn add_tracks(&self, playlist_id: &str, tracks: &[Track]) -> AnyResult<()> {
        Ok(self.add(playlist_id, tracks)?)
    }

    fn move_item(
        &self,
        playlist_id: &str,
        item_id: &str,
        after_item_id: Option<&str>,
    ) -> AnyResult<()> {
        Ok(self.move_after(playlist_id, item_id, after_item_id)?)
    }

    fn remove_item(&self, playlist_id: &str, item_id: &str) -> AnyResult<()> {
        Ok(self.remove(playlist_id, item_id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{MatchMode, SortOption};

    const SEARCH_JSON: &str = r#"{
        "MediaContainer": {
            "size": 2,
            "Metadata": [
                {
                    "ratingKey": "1001",
                    "title": "Midnight City",
                    "grandparentTitle": "M83",
                    "parentTitle": "Hurry Up, We're Dreaming",
                    "duration": 243000,
                    "index": 2,
                    "parentYear": 2011,
                    "parentThumb": "/library/metadata/1000/thumb/1",
                    "userRating": 8.0,
                    "viewCount": 12,
                    "lastViewedAt": 1700000000,
                    "addedAt": 1600000000,
                    "Media": [{"Part": [{"key": "/library/parts/55/file.flac"}]}],
                    "Genre": [{"tag": "Electronic"}, {"tag": "Synthpop"}]
                },
                {
                    "ratingKey": "1002",
                    "title": "Untitled",
                    "originalTitle": "Guest Artist"
                }
            ]
        }
    }"#;

    #[test]
    fn test_parse_tracks() {
        let tracks = parse_tracks(SEARCH_JSON).unwrap();
        assert_eq!(tracks.len(), 2);

        let t = &tracks[0];
        assert_eq!(t.id, "1001");
        assert_eq!(t.artist, "M83");
        assert_eq!(t.album, "Hurry Up, We're Dreaming");
        assert_eq!(t.duration_ms, Some(243_000));
        assert_eq!(t.track_number, Some(2));
        assert_eq!(t.year, Some(2011));
        assert_eq!(t.thumb.as_deref(), Some("/library/metadata/1000/thumb/1"));
        assert_eq!(t.rating, Some(8.0));
        assert_eq!(t.play_count, 12);
        assert_eq!(t.media_key.as_deref(), Some("/library/parts/55/file.flac"));
        assert_eq!(t.genre.as_deref(), Some("Electronic"));

        let t = &tracks[1];
        assert_eq!(t.artist, "Guest Artist");
        assert_eq!(t.album, "");
        assert_eq!(t.play_count, 0);
    }

    #[test]
    fn test_parse_empty_and_invalid() {
        assert!(parse_tracks(r#"{"MediaContainer": {"size": 0}}"#).unwrap().is_empty());
        assert!(matches!(parse_tracks("<html>"), Err(PlexError::InvalidResponse(_))));
        let body = r#"{"MediaContainer": {"Metadata": [{"ratingKey": "5", "title": "X"}]}}"#;
        let unknown = parse_tracks(body).unwrap();
        assert_eq!(unknown[0].artist, "");
        assert_eq!(unknown[0].to_string(), "Unknown Artist - X");
    }

    #[test]
    fn test_parse_playlists() {
        let body = r#"{"MediaContainer": {"Metadata": [
            {"ratingKey": "77", "title": "Road Trip", "summary": "",
             "composite": "/playlists/77/composite/1", "playlistType": "audio",
             "duration": 3600000, "leafCount": 15, "smart": false, "addedAt": 1, "updatedAt": 2},
            {"ratingKey": "78", "title": "Recently Added", "smart": true, "leafCount": 40}
        ]}}"#;
        let playlists = parse_playlists(body).unwrap();
        assert_eq!(playlists[0].id, "77");
        assert_eq!(playlists[0].summary, None);
        assert_eq!(playlists[0].thumb.as_deref(), Some("/playlists/77/composite/1"));
        assert_eq!(playlists[0].leaf_count, 15);
        assert!(!playlists[0].smart);
        assert!(playlists[1].smart);
    }

    #[test]
    fn test_parse_playlist_items_ids() {
        let body = r#"{"MediaContainer": {"Metadata": [
            {"ratingKey": "1001", "playlistItemID": 9001, "title": "A", "grandparentTitle": "X"},
            {"ratingKey": "1002", "title": "B", "grandparentTitle": "X"},
            {"title": "C", "grandparentTitle": "X"}
        ]}}"#;
        let items = parse_playlist_items(body).unwrap();
        let ids: Vec<&str> = items.iter().map(|i| i.item_id.as_str()).collect();
        assert_eq!(ids, vec!["9001", "1002", "2"]);
        assert_eq!(items[0].track.id, "1001");
    }

    #[test]
    fn test_parse_music_libraries() {
        let body = r#"{"MediaContainer": {"Directory": [
            {"key": "1", "title": "Movies", "type": "movie"},
            {"key": "4", "title": "Music", "type": "artist"}
        ]}}"#;
        assert_eq!(
            parse_music_libraries(body).unwrap(),
            vec![MusicLibrary {
                key: "4".to_string(),
                title: "Music".to_string()
            }]
        );
        assert_eq!(
            parse_machine_id(r#"{"MediaContainer": {"machineIdentifier": "abc123"}}"#).unwrap(),
            "abc123"
        );
    }

    #[test]
    fn test_tracks_uri() {
        assert_eq!(
            tracks_uri("abc", &["1", "2"]),
            "server://abc/com.plexapp.plugins.library/library/metadata/1,2"
        );
    }

    #[test]
    fn test_smart_uri() {
        let smart = SmartPlaylist {
            title: "Loved".to_string(),
            rules: vec!["rating:gte:4".parse().unwrap(), "genre:contains:Rock".parse().unwrap()],
            mode: MatchMode::Any,
            limit: Some(100),
            sort: Some(SortOption::MostPlayed),
        };
        assert_eq!(
            smart_uri("abc", "4", &smart),
            "server://abc/com.plexapp.plugins.library/library/sections/4/all?type=10\
             &push=1&userRating>>=8&or=1&genre=Rock&pop=1&sort=viewCount:desc&limit=100"
        );

        let all = SmartPlaylist {
            rules: vec![],
            limit: None,
            sort: None,
            ..smart
        };
        assert_eq!(
            smart_uri("abc", "4", &all),
            "server://abc/com.plexapp.plugins.library/library/sections/4/all?type=10"
        );
    }

    #[test]
    fn test_source_keeps_filter_with_limit() {
        let source = SmartSource {
            filter: "genre=Rock".to_string(),
            limit: Some(25),
            sort: None,
        };
        let uri = source_uri("abc", "4", &source);
        assert!(uri.ends_with("/all?type=10&genre=Rock&limit=25"), "{}", uri);
    }

    #[test]
    fn test_title_only_update_has_no_source() {
        let update = PlaylistUpdate {
            title: Some("Renamed".to_string()),
            ..Default::default()
        };
        assert_eq!(edit_params(&update), vec![("title", "Renamed".to_string())]);
        assert!(update.source.is_none());
        assert!(edit_params(&PlaylistUpdate::default()).is_empty());
    }

    #[test]
    fn test_client_builds_with_headers() {
        let cfg = PlexConfig::new("http://127.0.0.1:32400", "token")
            .unwrap()
            .with_library_section(Some("4".into()));
        let client = PlexClient::new(cfg).unwrap();
        // Configured section needs no request
        assert_eq!(client.music_section_key().unwrap(), "4");

        let bad = PlexConfig::new("http://127.0.0.1:32400", "bad\ntoken").unwrap();
        assert!(matches!(PlexClient::new(bad), Err(PlexError::InvalidHeader("X-Plex-Token"))));
    }
}
