mod common;

use common::{gateway, CountingLauncher, FakeBackend, RecordingOpener};
use tunebridge_backend::{
    AuthStatus, BackendState, CatalogError, FolderContents, RequestError, SupervisorError,
};
use tunebridge_core::models::{PlaylistId, Track, TrackId};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

#[test]
fn search_parses_single_track() {
    let backend = FakeBackend::online();
    backend.mount(
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "test"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"[{"videoId":"abc","title":"Song","artist":"Band","duration":180}]"#,
            )),
    );
    let launcher = CountingLauncher::default();
    let gateway = gateway(backend.config(), &launcher, &RecordingOpener::default());

    let tracks = gateway.search("test").expect("search");

    assert_eq!(
        tracks,
        vec![Track {
            id: TrackId::new("abc"),
            title: "Song".into(),
            artist: "Band".into(),
            album: String::new(),
            duration_seconds: 180.0,
            thumbnail: String::new(),
            is_video: false,
        }]
    );
    assert_eq!(launcher.count(), 0);
    assert_eq!(gateway.supervisor().state(), BackendState::Running);
    assert!(!gateway.supervisor().owns_process());
}

#[test]
fn search_encodes_query() {
    let backend = FakeBackend::online();
    backend.mount(
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "rock & roll é"))
            .respond_with(ResponseTemplate::new(200).set_body_string("[]")),
    );
    let gateway = gateway(
        backend.config(),
        &CountingLauncher::default(),
        &RecordingOpener::default(),
    );

    assert!(gateway.search("rock & roll é").expect("search").is_empty());

    let requests = backend
        .rt
        .block_on(backend.server.received_requests())
        .unwrap();
    let search = requests
        .iter()
        .find(|r| r.url.path() == "/search")
        .expect("search request");
    assert_eq!(search.url.query(), Some("q=rock+%26+roll+%C3%A9"));
}

#[test]
fn new_search_replaces_cached_results() {
    let backend = FakeBackend::online();
    backend.mount(
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "first"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"[{"videoId":"a","title":"A"},{"videoId":"b","title":"B"}]"#,
            )),
    );
    backend.mount(
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "second"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"[{"videoId":"c","title":"C"}]"#),
            ),
    );
    let gateway = gateway(
        backend.config(),
        &CountingLauncher::default(),
        &RecordingOpener::default(),
    );

    gateway.search("first").unwrap();
    assert_eq!(gateway.last_search().len(), 2);

    gateway.search("second").unwrap();
    let cached = gateway.last_search();
    assert_eq!(cached.len(), 1);
    assert_eq!(cached[0].id, TrackId::new("c"));

    match gateway.browse_folder("search").unwrap() {
        FolderContents::Tracks(tracks) => assert_eq!(tracks, cached),
        other => panic!("expected tracks, got {other:?}"),
    }
}

#[test]
fn failed_search_keeps_previous_results() {
    let backend = FakeBackend::online();
    backend.mount(
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "ok"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"[{"videoId":"a","title":"A"}]"#),
            ),
    );
    let gateway = gateway(
        backend.config(),
        &CountingLauncher::default(),
        &RecordingOpener::default(),
    );

    gateway.search("ok").unwrap();
    let err = gateway.search("unmatched").unwrap_err();
    assert!(matches!(
        err,
        CatalogError::RequestFailed {
            source: RequestError::EmptyBody { .. }
        }
    ));
    assert_eq!(gateway.last_search().len(), 1);
}

#[test]
fn playlists_and_playlist_tracks() {
    let backend = FakeBackend::online();
    backend.get_json(
        "/playlists",
        r#"[{"playlistId":"PL1","title":"Mix","count":2,"thumbnail":"t"},{"playlistId":"","title":"Broken"}]"#,
    );
    backend.mount(
        Mock::given(method("GET"))
            .and(path("/playlist_tracks"))
            .and(query_param("id", "PL1"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"[{"videoId":"x","title":"X","isVideo":true},{"videoId":"y","title":""}]"#,
            )),
    );
    let gateway = gateway(
        backend.config(),
        &CountingLauncher::default(),
        &RecordingOpener::default(),
    );

    let playlists = gateway.list_playlists().expect("playlists");
    assert_eq!(playlists.len(), 1);
    assert_eq!(playlists[0].id, PlaylistId::new("PL1"));
    assert_eq!(playlists[0].track_count, 2);
    assert_eq!(gateway.playlists(), playlists);

    let tracks = gateway
        .list_playlist_tracks(&PlaylistId::new("PL1"))
        .expect("tracks");
    assert_eq!(tracks.len(), 1);
    assert!(tracks[0].is_video);

    assert_eq!(
        gateway.browse_folder("playlists").unwrap(),
        FolderContents::Playlists(playlists)
    );
    assert_eq!(
        gateway.browse_folder("PL1").unwrap(),
        FolderContents::Tracks(tracks)
    );
}

#[test]
fn resolve_prefers_stream_url() {
    let backend = FakeBackend::online();
    backend.get_json(
        "/get_url",
        r#"{"videoId":"abc","streamUrl":"https://cdn/stream","url":"https://cdn/other"}"#,
    );
    let gateway = gateway(
        backend.config(),
        &CountingLauncher::default(),
        &RecordingOpener::default(),
    );

    let url = gateway.resolve_stream_url(&TrackId::new("abc")).unwrap();
    assert_eq!(url.as_ref(), "https://cdn/stream");
}

#[test]
fn resolve_falls_back_to_url() {
    let backend = FakeBackend::online();
    backend.get_json("/get_url", r#"{"videoId":"abc","url":"https://cdn/fallback"}"#);
    let gateway = gateway(
        backend.config(),
        &CountingLauncher::default(),
        &RecordingOpener::default(),
    );

    let url = gateway.resolve_stream_url(&TrackId::new("abc")).unwrap();
    assert_eq!(url.as_ref(), "https://cdn/fallback");
}

#[test]
fn resolve_surfaces_detail() {
    let backend = FakeBackend::online();
    backend.mount(
        Mock::given(method("GET"))
            .and(path("/get_url"))
            .and(query_param("id", "abc"))
            .respond_with(
                ResponseTemplate::new(404).set_body_string(r#"{"detail":"Video unavailable"}"#),
            ),
    );
    let gateway = gateway(
        backend.config(),
        &CountingLauncher::default(),
        &RecordingOpener::default(),
    );

    let err = gateway
        .resolve_stream_url(&TrackId::new("abc"))
        .unwrap_err();
    assert!(matches!(err, CatalogError::MalformedResult { .. }));
    assert_eq!(err.to_string(), "Video unavailable");
}

#[test]
fn resolve_defaults_error_message() {
    let backend = FakeBackend::online();
    backend.get_json("/get_url", r#"{"videoId":"abc"}"#);
    let gateway = gateway(
        backend.config(),
        &CountingLauncher::default(),
        &RecordingOpener::default(),
    );

    let err = gateway
        .resolve_stream_url(&TrackId::new("abc"))
        .unwrap_err();
    assert_eq!(err.to_string(), "Stream URL not available");
}

#[test]
fn auth_prompt_opens_config_once() {
    let backend = FakeBackend::online();
    backend.get_json("/auth_status", r#"{"authenticated": false}"#);
    let opener = RecordingOpener::default();
    let gateway = gateway(backend.config(), &CountingLauncher::default(), &opener);

    assert_eq!(
        gateway.warm_up().unwrap(),
        AuthStatus::NotAuthenticated { prompted: true }
    );
    assert_eq!(
        gateway.check_auth_and_maybe_prompt().unwrap(),
        AuthStatus::NotAuthenticated { prompted: false }
    );

    let opened = opener.opened.lock().unwrap().clone();
    assert_eq!(opened, vec![format!("{}/config", backend.server.uri())]);
    assert!(!backend.requested_paths().contains(&"/config".to_string()));
}

#[test]
fn authenticated_backend_never_prompts() {
    let backend = FakeBackend::online();
    backend.get_json("/auth_status", r#"{"authenticated":true}"#);
    let opener = RecordingOpener::default();
    let gateway = gateway(backend.config(), &CountingLauncher::default(), &opener);

    assert_eq!(
        gateway.check_auth_and_maybe_prompt().unwrap(),
        AuthStatus::Authenticated
    );
    assert!(opener.opened.lock().unwrap().is_empty());
}

#[test]
fn missing_backend_short_circuits_operations() {
    let backend = FakeBackend::start();
    let dir = tempfile::tempdir().unwrap();
    let mut config = backend.config();
    config.directory = Some(dir.path().to_path_buf());
    let launcher = CountingLauncher::default();
    let gateway = gateway(config, &launcher, &RecordingOpener::default());

    let err = gateway.search("anything").unwrap_err();
    assert!(matches!(
        err,
        CatalogError::Unavailable(SupervisorError::BackendNotInstalled { .. })
    ));
    assert!(matches!(
        gateway.resolve_stream_url(&TrackId::new("abc")),
        Err(CatalogError::Unavailable(_))
    ));
    assert_eq!(launcher.count(), 0);
    assert_eq!(gateway.supervisor().state(), BackendState::Failed);
    assert!(backend.requested_paths().iter().all(|p| p == "/"));
}

#[test]
fn starts_backend_when_down() {
    let backend = FakeBackend::start();
    backend.get_json("/playlists", r#"[{"playlistId":"PL1","title":"Mix"}]"#);
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("main.py"), "").unwrap();
    let mut config = backend.config();
    config.directory = Some(dir.path().to_path_buf());
    let launcher = CountingLauncher::bringing_up(&backend);
    let gateway = gateway(config, &launcher, &RecordingOpener::default());

    let playlists = gateway.list_playlists().expect("backend should be started");
    assert_eq!(playlists.len(), 1);
    gateway.list_playlists().expect("still running");

    assert_eq!(launcher.count(), 1);
    let commands = launcher.commands.lock().unwrap().clone();
    assert_eq!(commands[0].working_dir, dir.path());
    assert_eq!(commands[0].args, vec!["main.py".to_string()]);
    assert!(gateway.supervisor().owns_process());
}
