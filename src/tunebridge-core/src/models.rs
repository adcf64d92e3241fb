use serde::{Deserialize, Serialize};
use std::fmt;

/// Backend-generated track identifier (a catalog video id).
///
/// Treated as an opaque, case-sensitive token and passed to the backend verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct TrackId(pub String);

impl TrackId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl AsRef<str> for TrackId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TrackId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Backend-generated playlist identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct PlaylistId(pub String);

impl PlaylistId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl AsRef<str> for PlaylistId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PlaylistId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl fmt::Display for PlaylistId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One playable catalog item as shown to the host.
///
/// Only constructed with a non-empty id and title; see [`Track::from_json_object`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub duration_seconds: f32,
    pub thumbnail: String,
    pub is_video: bool,
}

impl Track {
    /// Reads one flat track object (`videoId`, `title`, `artist`, `album`,
    /// `duration`, `thumbnail`, `isVideo`). Returns `None` when the id or title
    /// is missing.
    pub fn from_json_object(object: &str) -> Option<Self> {
        use crate::json::{extract_bool, extract_int, extract_string};

        let id = extract_string(object, "videoId");
        let title = extract_string(object, "title");
        if id.is_empty() || title.is_empty() {
            return None;
        }
        Some(Self {
            id: TrackId::new(id),
            title: title.to_owned(),
            artist: extract_string(object, "artist").to_owned(),
            album: extract_string(object, "album").to_owned(),
            duration_seconds: extract_int(object, "duration").max(0) as f32,
            thumbnail: extract_string(object, "thumbnail").to_owned(),
            is_video: extract_bool(object, "isVideo"),
        })
    }
}

/// A user playlist as listed by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: PlaylistId,
    pub title: String,
    pub track_count: u32,
    pub thumbnail: String,
}

impl Playlist {
    /// Reads one flat playlist object (`playlistId`, `title`, `count`,
    /// `thumbnail`). Returns `None` when the id or title is missing.
    pub fn from_json_object(object: &str) -> Option<Self> {
        use crate::json::{extract_int, extract_string};

        let id = extract_string(object, "playlistId");
        let title = extract_string(object, "title");
        if id.is_empty() || title.is_empty() {
            return None;
        }
        Some(Self {
            id: PlaylistId::new(id),
            title: title.to_owned(),
            track_count: extract_int(object, "count").clamp(0, i64::from(u32::MAX)) as u32,
            thumbnail: extract_string(object, "thumbnail").to_owned(),
        })
    }
}

/// Playable URL resolved by the backend. Playback itself is the host's job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamUrl(pub String);

impl StreamUrl {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }
}

impl AsRef<str> for StreamUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StreamUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parses a JSON array of track objects, dropping entries without id or title.
pub fn parse_tracks(body: &str) -> Vec<Track> {
    crate::json::extract_array(body)
        .into_iter()
        .filter_map(|object| {
            let track = Track::from_json_object(object);
            if track.is_none() {
                tracing::debug!(object = %object, "dropping track without id or title");
            }
            track
        })
        .collect()
}

/// Parses a JSON array of playlist objects, dropping entries without id or title.
pub fn parse_playlists(body: &str) -> Vec<Playlist> {
    crate::json::extract_array(body)
        .into_iter()
        .filter_map(|object| {
            let playlist = Playlist::from_json_object(object);
            if playlist.is_none() {
                tracing::debug!(object = %object, "dropping playlist without id or title");
            }
            playlist
        })
        .collect()
}
