//! Playback data model shared by the engine, the wire decoder and the UI view.

use serde::{Deserialize, Serialize};

/// Where a track's audio comes from.
///
/// Determines the load retry policy: local-file endpoints may need a moment to
/// warm up server-side after a track change, streaming URLs do not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    /// A file from the server's own library, streamed by the authority.
    #[default]
    LocalFile,
    /// A preview clip from an external streaming catalog.
    StreamingPreview,
    /// A full-length track from an external streaming catalog.
    StreamingFull,
}

impl SourceKind {
    /// Returns true for tracks served by the authority's own file endpoint.
    #[must_use]
    pub fn is_local_file(self) -> bool {
        matches!(self, Self::LocalFile)
    }
}

/// Identity of a playable unit.
///
/// Immutable once constructed. `resolved_url` is filled in by the library or
/// streaming resolver before the track reaches the engine; an empty or absent
/// URL is treated as an immediate load failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackRef {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(default)]
    pub source_kind: SourceKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_url: Option<String>,
}

impl TrackRef {
    /// Creates a track with a resolved URL and no artist.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        source_kind: SourceKind,
        resolved_url: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            artist: None,
            source_kind,
            resolved_url: Some(resolved_url.into()),
        }
    }

    /// Returns the resolved URL if it is present and non-blank.
    #[must_use]
    pub fn playable_url(&self) -> Option<&str> {
        self.resolved_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    /// Two refs denote the same track if their ids match, regardless of URL.
    ///
    /// A re-resolved URL for the same id is not a track change.
    #[must_use]
    pub fn same_identity(&self, other: &TrackRef) -> bool {
        self.id == other.id
    }
}

/// Repeat behaviour of the remote queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    #[default]
    None,
    One,
    All,
}

/// The authoritative playback view as last received from the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlaybackSnapshot {
    pub track: Option<TrackRef>,
    pub is_playing: bool,
    pub queue: Vec<TrackRef>,
    /// Index of `track` in `queue`, or -1 when there is none.
    pub current_index: i32,
    /// Playback position in seconds.
    pub position: f64,
    pub shuffle: bool,
    pub repeat_mode: RepeatMode,
}

impl Default for PlaybackSnapshot {
    fn default() -> Self {
        Self {
            track: None,
            is_playing: false,
            queue: Vec::new(),
            current_index: -1,
            position: 0.0,
            shuffle: false,
            repeat_mode: RepeatMode::None,
        }
    }
}

impl PlaybackSnapshot {
    /// Returns the id of the current track, if any.
    #[must_use]
    pub fn track_id(&self) -> Option<&str> {
        self.track.as_ref().map(|t| t.id.as_str())
    }

    /// Replaces the current track and re-derives `current_index` from the queue.
    pub fn set_track(&mut self, track: Option<TrackRef>) {
        self.current_index = track
            .as_ref()
            .and_then(|t| self.queue.iter().position(|q| q.same_identity(t)))
            .map_or(-1, |i| i as i32);
        self.track = track;
    }

    /// Applies an incremental position tick.
    ///
    /// Only `position`, `is_playing` and `track` are touched; queue, shuffle and
    /// repeat mode are left alone.
    pub fn apply_tick(&mut self, track: Option<TrackRef>, position: f64, is_playing: bool) {
        if let Some(track) = track {
            let changed = self
                .track
                .as_ref()
                .map_or(true, |current| !current.same_identity(&track));
            if changed {
                self.set_track(Some(track));
            } else {
                self.track = Some(track);
            }
        }
        self.position = position.max(0.0);
        self.is_playing = is_playing;
    }
}
