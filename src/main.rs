//! Application entry point: Past Port terminal front end.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (returns default on first run).
//! 3. Build the narration stack: Nominatim geocoder → place resolver →
//!    HTTP narrator factory.
//! 4. Build the playback controller around the TTS command engine.
//! 5. Spawn the tour orchestrator and the snapshot printer.
//! 6. Read commands from stdin until `quit` or end of input.
//!
//! # Input
//!
//! ```text
//! 40.7580 -73.9855   position fix (latitude longitude)
//! toggle             pause / resume speech
//! stop               stop speech
//! replay             speak the current narration again
//! refresh            narrate the last position again
//! key <api-key>      store a Claude API key
//! quit
//! ```

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};

use past_port::{
    config::{AppConfig, FileCredentialStore},
    geocode::{NominatimGeocoder, PlaceResolver},
    location::{AuthorizationStatus, LocationTracker, Position},
    narration::HttpNarratorFactory,
    poi::PoiCatalog,
    speech::{CommandSpeechEngine, PlaybackController},
    tour::{TourCommand, TourOrchestrator, TourSnapshot},
};

// ---------------------------------------------------------------------------
// StdinTracker
// ---------------------------------------------------------------------------

/// Position source backed by typed coordinates.  Permission is implicit;
/// fixes are only forwarded while tracking is on.
struct StdinTracker {
    tracking: Arc<AtomicBool>,
}

impl LocationTracker for StdinTracker {
    fn request_permission(&mut self) {
        log::debug!("stdin tracker: permission is implicit");
    }

    fn start_tracking(&mut self) {
        self.tracking.store(true, Ordering::SeqCst);
    }

    fn stop_tracking(&mut self) {
        self.tracking.store(false, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// Input parsing
// ---------------------------------------------------------------------------

#[derive(Debug, PartialEq)]
enum Input {
    Command(TourCommand),
    Quit,
    Blank,
}

fn parse_input(line: &str) -> Result<Input, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Input::Blank);
    }

    let (word, rest) = line
        .split_once(char::is_whitespace)
        .map_or((line, ""), |(w, r)| (w, r.trim()));

    let command = match word {
        "quit" | "exit" => return Ok(Input::Quit),
        "toggle" => TourCommand::ToggleSpeech,
        "stop" => TourCommand::StopSpeech,
        "replay" => TourCommand::Replay,
        "refresh" => TourCommand::RefreshCurrentLocation,
        "key" if !rest.is_empty() => TourCommand::SetApiKey(rest.to_string()),
        "key" => return Err("usage: key <api-key>".into()),
        _ => TourCommand::Position(parse_position(line)?),
    };
    Ok(Input::Command(command))
}

fn parse_position(line: &str) -> Result<Position, String> {
    let mut parts = line.split(|c: char| c.is_whitespace() || c == ',').filter(|p| !p.is_empty());
    let (Some(lat), Some(lon), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(format!("unrecognised input: {line}"));
    };

    let latitude: f64 = lat.parse().map_err(|_| format!("bad latitude: {lat}"))?;
    let longitude: f64 = lon.parse().map_err(|_| format!("bad longitude: {lon}"))?;
    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        return Err(format!("coordinates out of range: {latitude}, {longitude}"));
    }
    Ok(Position::now(latitude, longitude))
}

// ---------------------------------------------------------------------------
// Snapshot printer
// ---------------------------------------------------------------------------

async fn print_snapshots(mut snapshots: watch::Receiver<TourSnapshot>, catalog: PoiCatalog) {
    let mut previous = snapshots.borrow_and_update().clone();
    let mut nearby_ids: HashSet<String> = HashSet::new();

    while snapshots.changed().await.is_ok() {
        let current = snapshots.borrow_and_update().clone();

        if current.is_loading && !previous.is_loading {
            println!("… fetching narration");
        }
        if current.current_narration != previous.current_narration
            && !current.current_narration.is_empty()
        {
            println!("\n{}\n", current.current_narration);
        }
        if current.error_message != previous.error_message {
            if let Some(message) = &current.error_message {
                println!("error: {message}");
            }
        }
        if current.playback != previous.playback {
            println!("[{}]", current.playback.label());
        }

        if current.map_region != previous.map_region {
            let center = Position::now(
                current.map_region.center_latitude,
                current.map_region.center_longitude,
            );
            let here = catalog.nearby(&center);
            let ids: HashSet<String> = here.iter().map(|p| p.poi_id.clone()).collect();
            for poi in here.iter().filter(|p| !nearby_ids.contains(&p.poi_id)) {
                println!("* {}: {}", poi.name, poi.content.summary);
            }
            nearby_ids = ids;
        }

        previous = current;
    }
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Past Port starting up");

    // 2. Configuration
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });

    // 3. Narration stack
    let geocoder = Arc::new(NominatimGeocoder::from_config(&config.geocoder));
    let resolver = PlaceResolver::new(geocoder);
    let factory = Arc::new(HttpNarratorFactory::new(&config.narration, resolver));

    // 4. Speech
    let engine = CommandSpeechEngine::from_config(&config.speech);
    let playback = PlaybackController::new(Box::new(engine));

    // 5. Orchestrator + printer
    let tracking = Arc::new(AtomicBool::new(false));
    let tracker = StdinTracker {
        tracking: Arc::clone(&tracking),
    };
    let orchestrator = TourOrchestrator::new(
        &config,
        playback,
        factory,
        Box::new(FileCredentialStore::new()),
        Box::new(tracker),
    );

    let snapshots = orchestrator.subscribe();
    if !snapshots.borrow().has_api_key {
        println!("No API key configured. Enter `key <your-claude-api-key>`.");
    }

    let catalog = PoiCatalog::load(&config.seed_data.resolve());
    let (command_tx, command_rx) = mpsc::channel::<TourCommand>(32);
    let tour = tokio::spawn(orchestrator.run(command_rx));
    let printer = tokio::spawn(print_snapshots(snapshots, catalog));

    command_tx.send(TourCommand::Start).await?;
    command_tx
        .send(TourCommand::Authorization(AuthorizationStatus::AuthorizedWhenInUse))
        .await?;

    // 6. Stdin loop
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("reading stdin")? {
        let command = match parse_input(&line) {
            Ok(Input::Command(command)) => command,
            Ok(Input::Quit) => break,
            Ok(Input::Blank) => continue,
            Err(message) => {
                eprintln!("{message}");
                continue;
            }
        };

        if matches!(command, TourCommand::Position(_)) && !tracking.load(Ordering::SeqCst) {
            log::debug!("ignoring position fix while tracking is off");
            continue;
        }
        if command_tx.send(command).await.is_err() {
            break;
        }
    }

    drop(command_tx);
    tour.await.context("tour orchestrator task failed")?;
    printer.await.context("snapshot printer task failed")?;

    log::info!("Past Port shut down");
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
