//! Typed catalog operations on top of the supervisor and HTTP client.

use crate::http::{preview, HttpClient, RequestError};
use crate::launcher::{BrowserOpener, ProcessLauncher, SystemLauncher, UrlOpener};
use crate::supervisor::{BackendSupervisor, SupervisorError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tunebridge_core::json::extract_string;
use tunebridge_core::models::{
    parse_playlists, parse_tracks, Playlist, PlaylistId, StreamUrl, Track, TrackId,
};
use tunebridge_core::BackendConfig;

/// Folder id whose contents are the cached results of the last search.
pub const SEARCH_FOLDER: &str = "search";
/// Folder id listing the user's playlists.
pub const PLAYLISTS_FOLDER: &str = "playlists";

const STREAM_URL_UNAVAILABLE: &str = "Stream URL not available";
const STREAM_PREVIEW_CHARS: usize = 400;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog unavailable: {0}")]
    Unavailable(#[from] SupervisorError),
    #[error("{source}")]
    RequestFailed {
        #[from]
        source: RequestError,
    },
    /// The response carried no usable value; `message` is meant for the user.
    #[error("{message}")]
    MalformedResult { endpoint: String, message: String },
}

pub type CatalogResult<T> = Result<T, CatalogError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStatus {
    Authenticated,
    /// `prompted` is true when this call opened the configuration page.
    NotAuthenticated { prompted: bool },
}

#[derive(Debug, Clone, PartialEq)]
pub enum FolderContents {
    Tracks(Vec<Track>),
    Playlists(Vec<Playlist>),
}

#[derive(Default)]
struct ResultSets {
    last_search: Vec<Track>,
    playlists: Vec<Playlist>,
}

pub struct CatalogGateway {
    client: Arc<HttpClient>,
    supervisor: BackendSupervisor,
    opener: Box<dyn UrlOpener>,
    results: Mutex<ResultSets>,
    auth_prompt_shown: AtomicBool,
}

impl CatalogGateway {
    /// Gateway that spawns real processes and opens the system browser.
    pub fn new(config: BackendConfig) -> Result<Self, RequestError> {
        Self::with_collaborators(config, Box::new(SystemLauncher), Box::new(BrowserOpener))
    }

    pub fn with_collaborators(
        config: BackendConfig,
        launcher: Box<dyn ProcessLauncher>,
        opener: Box<dyn UrlOpener>,
    ) -> Result<Self, RequestError> {
        let client = Arc::new(HttpClient::new(&config)?);
        let supervisor = BackendSupervisor::new(config, client.clone(), launcher);
        Ok(Self {
            client,
            supervisor,
            opener,
            results: Mutex::new(ResultSets::default()),
            auth_prompt_shown: AtomicBool::new(false),
        })
    }

    pub fn supervisor(&self) -> &BackendSupervisor {
        &self.supervisor
    }

    /// Startup sequence: bring the backend up, then check authentication.
    pub fn warm_up(&self) -> CatalogResult<AuthStatus> {
        let status = self.check_auth_and_maybe_prompt()?;
        tracing::info!(?status, owned = self.supervisor.owns_process(), "backend ready");
        Ok(status)
    }

    pub fn search(&self, query: &str) -> CatalogResult<Vec<Track>> {
        self.ensure_backend()?;
        let endpoint = format!("/search?q={}", encode_query(query));
        tracing::info!(query = %query, endpoint = %endpoint, "searching catalog");
        let body = self.client.get(&endpoint)?;
        let tracks = parse_tracks(&body);
        tracing::info!(
            bytes = body.len(),
            parsed = tracks.len(),
            preview = %preview(&body, crate::http::PREVIEW_CHARS),
            "search completed"
        );

        self.results().last_search = tracks.clone();
        Ok(tracks)
    }

    /// Snapshot of the tracks returned by the last successful search.
    pub fn last_search(&self) -> Vec<Track> {
        self.results().last_search.clone()
    }

    pub fn list_playlists(&self) -> CatalogResult<Vec<Playlist>> {
        self.ensure_backend()?;
        self.fetch_playlists()
    }

    fn fetch_playlists(&self) -> CatalogResult<Vec<Playlist>> {
        let body = self.client.get("/playlists")?;
        let playlists = parse_playlists(&body);
        tracing::info!(bytes = body.len(), parsed = playlists.len(), "playlists loaded");

        self.results().playlists = playlists.clone();
        Ok(playlists)
    }

    /// Snapshot of the playlists returned by the last successful listing.
    pub fn playlists(&self) -> Vec<Playlist> {
        self.results().playlists.clone()
    }

    pub fn list_playlist_tracks(&self, playlist_id: &PlaylistId) -> CatalogResult<Vec<Track>> {
        self.ensure_backend()?;
        self.fetch_playlist_tracks(playlist_id)
    }

    fn fetch_playlist_tracks(&self, playlist_id: &PlaylistId) -> CatalogResult<Vec<Track>> {
        // Playlist ids are backend-generated tokens and go out unencoded.
        let endpoint = format!("/playlist_tracks?id={playlist_id}");
        let body = self.client.get(&endpoint)?;
        let tracks = parse_tracks(&body);
        tracing::info!(
            playlist_id = %playlist_id,
            bytes = body.len(),
            parsed = tracks.len(),
            "playlist tracks loaded"
        );
        Ok(tracks)
    }

    /// Asks the backend for a playable URL. Slow: the backend resolves it
    /// remotely, and only the request timeout bounds the call.
    pub fn resolve_stream_url(&self, track_id: &TrackId) -> CatalogResult<StreamUrl> {
        self.ensure_backend()?;
        let endpoint = format!("/get_url?id={track_id}");
        tracing::info!(track_id = %track_id, "resolving stream url");
        let body = self.client.get(&endpoint)?;

        let url = match extract_string(&body, "streamUrl") {
            "" => extract_string(&body, "url"),
            url => url,
        };
        if url.is_empty() {
            let detail = extract_string(&body, "detail");
            tracing::error!(
                endpoint = %endpoint,
                detail = %detail,
                bytes = body.len(),
                preview = %preview(&body, STREAM_PREVIEW_CHARS),
                "no stream url in response"
            );
            let message = if detail.is_empty() {
                STREAM_URL_UNAVAILABLE
            } else {
                detail
            };
            return Err(CatalogError::MalformedResult {
                endpoint,
                message: message.to_string(),
            });
        }

        tracing::info!(track_id = %track_id, url = %preview(url, 100), "stream url resolved");
        Ok(StreamUrl::new(url))
    }

    /// Checks `/auth_status`; when not authenticated, opens the backend's
    /// configuration page at most once per gateway.
    pub fn check_auth_and_maybe_prompt(&self) -> CatalogResult<AuthStatus> {
        self.ensure_backend()?;
        if self.client.is_authenticated() {
            return Ok(AuthStatus::Authenticated);
        }

        let first_prompt = self
            .auth_prompt_shown
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if first_prompt {
            let url = self.client.url_for("/config")?;
            tracing::info!(url = %url, "not authenticated, opening config page");
            if let Err(e) = self.opener.open(url.as_str()) {
                tracing::warn!(url = %url, error = %e, "failed to open config page");
            }
        } else {
            tracing::debug!("not authenticated, config page already shown");
        }
        Ok(AuthStatus::NotAuthenticated {
            prompted: first_prompt,
        })
    }

    /// Host folder semantics: cached search results, the playlist listing, or
    /// the tracks of the playlist named by `folder_id`.
    pub fn browse_folder(&self, folder_id: &str) -> CatalogResult<FolderContents> {
        self.ensure_backend()?;
        match folder_id {
            SEARCH_FOLDER => Ok(FolderContents::Tracks(self.last_search())),
            PLAYLISTS_FOLDER => self.fetch_playlists().map(FolderContents::Playlists),
            id => self
                .fetch_playlist_tracks(&PlaylistId::new(id))
                .map(FolderContents::Tracks),
        }
    }

    /// Stops the backend if this gateway's supervisor launched it.
    pub fn shutdown(&self) {
        self.supervisor.shutdown();
    }

    fn ensure_backend(&self) -> CatalogResult<()> {
        self.supervisor.ensure_running().map_err(|e| {
            tracing::error!(error = %e, "backend not available");
            CatalogError::Unavailable(e)
        })
    }

    fn results(&self) -> MutexGuard<'_, ResultSets> {
        self.results.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Encodes a search query for the `q` parameter: spaces become `+`,
/// unreserved characters pass through, every other byte is `%XX`.
pub fn encode_query(query: &str) -> String {
    urlencoding::encode(query).replace("%20", "+")
}
