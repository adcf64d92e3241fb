use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use thiserror::Error;
use tunebridge_backend::{AuthStatus, CatalogGateway, FolderContents};
use tunebridge_core::models::{Playlist, Track, TrackId};
use tunebridge_core::{init_logging, AppDirs, Config};

#[derive(Debug, Parser)]
#[command(
    name = "tunebridge",
    version,
    about = "Query the local music catalog backend"
)]
struct Cli {
    /// Backend installation directory (takes precedence over config)
    #[arg(long, global = true)]
    backend_dir: Option<PathBuf>,
    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,
    /// Leave a backend started by this command running on exit
    #[arg(long, global = true)]
    keep_backend: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Start the backend if needed and report its state and authentication
    Status,
    /// Search the catalog
    Search {
        /// Search terms, joined with spaces
        #[arg(required = true)]
        query: Vec<String>,
    },
    /// List the user's playlists
    Playlists,
    /// Browse a folder: "search", "playlists", or a playlist id
    Folder { id: String },
    /// Resolve a playable stream URL for a track id
    Url { id: String },
    /// Check authentication, opening the backend config page if needed
    Auth,
}

#[derive(Debug, Error, PartialEq, Eq)]
enum CliError {
    #[error("search query is empty")]
    EmptyQuery,
}

#[derive(Debug, Serialize)]
struct StatusReport {
    running: bool,
    launched_here: bool,
    authenticated: bool,
    base_url: String,
}

fn search_query(words: &[String]) -> Result<String, CliError> {
    let query = words.join(" ");
    if query.trim().is_empty() {
        return Err(CliError::EmptyQuery);
    }
    Ok(query)
}

fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(dir) = &cli.backend_dir {
        config.backend.directory = Some(dir.clone());
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let dirs = AppDirs::discover()?;
    let mut config = Config::load_or_default(&dirs)?;
    apply_overrides(&mut config, &cli);
    let _logging = init_logging(&config.logging, &dirs)?;

    tracing::info!(
        backend_dir = ?config.backend.directory,
        base_url = %config.backend.base_url,
        launch = %config.backend.command_line(),
        "starting tunebridge"
    );
    let base_url = config.backend.base_url.clone();
    let gateway = CatalogGateway::new(config.backend)?;

    let outcome = run(&gateway, &cli, &base_url);
    if cli.keep_backend {
        if let Some(pid) = gateway.supervisor().release() {
            eprintln!("Backend left running (pid {pid})");
        }
    }
    gateway.shutdown();
    outcome
}

fn run(gateway: &CatalogGateway, cli: &Cli, base_url: &str) -> Result<()> {
    let mut out = std::io::stdout().lock();
    match &cli.command {
        Command::Status => {
            let auth = gateway.warm_up()?;
            let report = StatusReport {
                running: true,
                launched_here: gateway.supervisor().owns_process(),
                authenticated: auth == AuthStatus::Authenticated,
                base_url: base_url.to_string(),
            };
            if cli.json {
                print_json(&mut out, &report)?;
            } else {
                print_status(&mut out, &report, auth)?;
            }
        }
        Command::Search { query } => {
            let query = search_query(query)?;
            let tracks = gateway.search(&query)?;
            print_tracks(&mut out, &tracks, cli.json)?;
        }
        Command::Playlists => {
            let playlists = gateway.list_playlists()?;
            print_playlists(&mut out, &playlists, cli.json)?;
        }
        Command::Folder { id } => match gateway.browse_folder(id)? {
            FolderContents::Tracks(tracks) => print_tracks(&mut out, &tracks, cli.json)?,
            FolderContents::Playlists(playlists) => {
                print_playlists(&mut out, &playlists, cli.json)?
            }
        },
        Command::Url { id } => {
            eprintln!("Resolving stream URL...");
            let url = gateway.resolve_stream_url(&TrackId::new(id.as_str()))?;
            if cli.json {
                print_json(&mut out, &url)?;
            } else {
                writeln!(out, "{url}")?;
            }
        }
        Command::Auth => {
            let status = gateway.check_auth_and_maybe_prompt()?;
            writeln!(out, "{}", describe_auth(status))?;
        }
    }
    Ok(())
}

fn print_json<T: Serialize>(out: &mut impl Write, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

fn print_status(out: &mut impl Write, report: &StatusReport, auth: AuthStatus) -> Result<()> {
    let origin = if report.launched_here {
        "launched by tunebridge"
    } else {
        "already running"
    };
    writeln!(out, "Backend: running at {} ({origin})", report.base_url)?;
    writeln!(out, "{}", describe_auth(auth))?;
    Ok(())
}

fn print_tracks(out: &mut impl Write, tracks: &[Track], json: bool) -> Result<()> {
    if json {
        return print_json(out, &tracks);
    }
    if tracks.is_empty() {
        writeln!(out, "No tracks.")?;
    }
    for track in tracks {
        writeln!(out, "{}", track_line(track))?;
    }
    Ok(())
}

fn print_playlists(out: &mut impl Write, playlists: &[Playlist], json: bool) -> Result<()> {
    if json {
        return print_json(out, &playlists);
    }
    if playlists.is_empty() {
        writeln!(out, "No playlists.")?;
    }
    for playlist in playlists {
        writeln!(out, "{}", playlist_line(playlist))?;
    }
    Ok(())
}

fn describe_auth(status: AuthStatus) -> &'static str {
    match status {
        AuthStatus::Authenticated => "Authenticated.",
        AuthStatus::NotAuthenticated { prompted: true } => {
            "Not authenticated. Opened the backend config page in your browser."
        }
        AuthStatus::NotAuthenticated { prompted: false } => "Not authenticated.",
    }
}

fn track_line(track: &Track) -> String {
    let mut line = format!("{}\t", track.id);
    if !track.artist.is_empty() {
        line.push_str(&track.artist);
        line.push_str(" - ");
    }
    line.push_str(&track.title);
    if !track.album.is_empty() {
        line.push_str(&format!(" [{}]", track.album));
    }
    if track.duration_seconds > 0.0 {
        line.push_str(&format!(" ({})", format_duration(track.duration_seconds)));
    }
    if track.is_video {
        line.push_str(" (video)");
    }
    line
}

fn playlist_line(playlist: &Playlist) -> String {
    let noun = if playlist.track_count == 1 { "track" } else { "tracks" };
    format!(
        "{}\t{} ({} {noun})",
        playlist.id, playlist.title, playlist.track_count
    )
}

fn format_duration(seconds: f32) -> String {
    let total = seconds.max(0.0) as u64;
    let (hours, minutes, secs) = (total / 3600, (total / 60) % 60, total % 60);
    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes}:{secs:02}")
    }
}
