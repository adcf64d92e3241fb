//! Backend side of Tunebridge.
//!
//! This crate provides:
//! - [`HttpClient`]: blocking `GET` requests against the backend's local origin
//! - [`BackendSupervisor`]: detects, launches and waits for the backend process
//! - [`CatalogGateway`]: typed search, playlist and stream-url operations that
//!   make sure the backend is up before touching the network
//!
//! Process spawning and browser launches go through the [`ProcessLauncher`]
//! and [`UrlOpener`] traits so they can be replaced in tests.
//!
//! # Usage
//!
//! ```rust,ignore
//! use tunebridge_backend::CatalogGateway;
//! use tunebridge_core::BackendConfig;
//!
//! let config = BackendConfig {
//!     directory: Some("/path/to/bridge".into()),
//!     ..BackendConfig::default()
//! };
//! let gateway = CatalogGateway::new(config)?;
//! for track in gateway.search("daft punk")? {
//!     println!("{} - {}", track.artist, track.title);
//! }
//! ```

mod gateway;
mod http;
mod launcher;
mod supervisor;

pub use gateway::{
    encode_query, AuthStatus, CatalogError, CatalogGateway, CatalogResult, FolderContents,
    PLAYLISTS_FOLDER, SEARCH_FOLDER,
};
pub use http::{HttpClient, RequestError};
pub use launcher::{
    BackendProcess, BrowserOpener, LaunchCommand, ProcessLauncher, SystemLauncher, UrlOpener,
};
pub use supervisor::{BackendState, BackendSupervisor, LivenessProbe, SupervisorError};
