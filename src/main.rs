// src/main.rs

/*
ARCHITECTURE OVERVIEW

This binary computes antipodes and the "equidistant zone" of a home point
on a spherical Earth, and writes the resulting map scene as CSV or JSON.

High-level flow:
1. Parse CLI arguments and initialize logging.
2. Resolve text input to a coordinate:
   - "<lat>,<lon>" decimal literal
   - DMS / DDM pair
   - place name looked up in the gazetteer (first match wins)
3. Feed the coordinate to the session as an input event.
4. The session derives the antipodal pair and runs the zone pipeline
   (fixed quarter-circumference circle, or circle through a probe).
5. Present the session's scene on a layer store, retiring stale layers.
6. Serialize the scene.

Key design choices:
- Geometry (`geodesy`, `circle`, `zone`) is pure and total.
- All state lives in one `SessionState`, changed only through events.
- Input and lookup errors stop at this boundary as status text.
*/

use std::collections::HashSet;
use std::fs::File;
use std::io::{self, Read};
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use csv::ReaderBuilder;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod circle;
mod geo;
mod geocode;
mod geodesy;
mod render;
mod session;
mod zone;

use crate::circle::CircleSteps;
use crate::geocode::{GeocodeError, Gazetteer, Geocoder, LocationError, resolve_location};
use crate::geodesy::{AntipodalPair, KM_TO_MILES, distance, initial_bearing, round};
use crate::render::{LayerStore, Scene, present, write_csv, write_json};
use crate::session::{InputEvent, Phase, SessionError, SessionState};
use crate::zone::ZonePolicy;

/* ---------------- CONSTANTES ---------------- */

// Required replay CSV headers (order-independent).
const REQUIRED_HEADERS: &[&str] = &["action", "input"];

// Log filter used when neither --log nor RUST_LOG is set.
const DEFAULT_LOG_FILTER: &str = "antipode=info";

/* ---------------- CLI ---------------- */

// Command-line interface definition.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Gazetteer CSV (name,lat,lon) used to resolve place names
    #[arg(long, env = "ANTIPODE_PLACES", global = true)]
    places: Option<PathBuf>,

    /// Log filter, e.g. `antipode=debug` (overrides RUST_LOG)
    #[arg(long, global = true)]
    log: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show a location and its antipode
    Point {
        /// "<lat>,<lon>", DMS/DDM pair or place name
        location: String,
    },
    /// Great-circle distance and initial bearing between two locations
    Distance { from: String, to: String },
    /// Compute the zone of a home location and write its scene
    Zone(ZoneArgs),
    /// Replay a CSV script of session events (action,input) and write the final scene
    Replay(ReplayArgs),
}

#[derive(Args, Debug)]
struct ZoneArgs {
    /// Home location
    location: String,

    /// Probe location (required by the probe policy)
    #[arg(long)]
    probe: Option<String>,

    #[command(flatten)]
    session: SessionArgs,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Args, Debug)]
struct ReplayArgs {
    /// Script CSV path
    script: PathBuf,

    /// Strict mode: stop on first error
    #[arg(long)]
    strict: bool,

    #[command(flatten)]
    session: SessionArgs,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Args, Debug)]
struct SessionArgs {
    /// Zone policy
    #[arg(long, value_enum, default_value_t = ZonePolicy::Fixed)]
    policy: ZonePolicy,

    /// Number of bearings sampled around the zone circle (>= 8)
    #[arg(long, default_value = "128", value_parser = parse_steps)]
    steps: CircleSteps,
}

#[derive(Args, Debug)]
struct OutputArgs {
    /// Output format
    #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Csv)]
    format: OutputFormat,

    /// Output file path (stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

// Supported scene formats.
#[derive(Copy, Clone, Debug, ValueEnum)]
enum OutputFormat {
    Csv,
    Json,
}

fn parse_steps(raw: &str) -> Result<CircleSteps, String> {
    let n: usize = raw.parse().map_err(|e| format!("{e}"))?;
    CircleSteps::new(n).map_err(|e| e.to_string())
}

/* ---------------- MAIN ERROR ---------------- */

// Application-level errors.
#[derive(Error, Debug)]
enum AppError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid log filter: {0}")]
    LogFilter(#[from] tracing_subscriber::filter::ParseError),

    #[error("Gazetteer error: {0}")]
    Gazetteer(#[from] GeocodeError),

    #[error("{0}")]
    Location(#[from] LocationError),

    #[error("{0}")]
    Session(#[from] SessionError),

    #[error("Invalid header (missing or unreadable)")]
    InvalidHeader,

    #[error("Missing header field '{0}'")]
    MissingHeaderField(String),

    #[error("Line {line}: unknown action '{action}'")]
    UnknownAction { line: usize, action: String },

    #[error("Line {line}: {source}")]
    Script { line: usize, source: Box<AppError> },
}

/* ---------------- MAIN ---------------- */

fn main() -> Result<(), AppError> {
    // Parse CLI arguments.
    let cli = Cli::parse();
    init_logging(cli.log.as_deref())?;

    let gazetteer = match &cli.places {
        Some(path) => Gazetteer::from_path(path)?,
        None => Gazetteer::default(),
    };

    match cli.command {
        Command::Point { location } => run_point(&location, &gazetteer),
        Command::Distance { from, to } => run_distance(&from, &to, &gazetteer),
        Command::Zone(args) => run_zone(args, &gazetteer),
        Command::Replay(args) => run_replay(args, &gazetteer),
    }
}

fn init_logging(filter: Option<&str>) -> Result<(), AppError> {
    let filter = match filter {
        Some(f) => EnvFilter::try_new(f)?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
    Ok(())
}

/* ---------------- COMMANDS ---------------- */

fn run_point(location: &str, geocoder: &dyn Geocoder) -> Result<(), AppError> {
    let located = resolve_location(location, geocoder)?;
    let pair = AntipodalPair::new(located.coordinate);
    let km = distance(pair.home(), pair.antipode()) / 1000.0;

    println!("{}", located.label);
    println!("home:     {}  {}", pair.home(), pair.home().to_dms());
    println!("antipode: {}  {}", pair.antipode(), pair.antipode().to_dms());
    println!("distance: {:.2} km ({:.2} mi)", round(km, 2), round(km * KM_TO_MILES, 2));
    Ok(())
}

fn run_distance(from: &str, to: &str, geocoder: &dyn Geocoder) -> Result<(), AppError> {
    let a = resolve_location(from, geocoder)?.coordinate;
    let b = resolve_location(to, geocoder)?.coordinate;
    let km = distance(a, b) / 1000.0;

    println!("distance: {:.2} km ({:.2} mi)", round(km, 2), round(km * KM_TO_MILES, 2));
    println!("bearing:  {:.2}°", initial_bearing(a, b));
    Ok(())
}

fn run_zone(args: ZoneArgs, geocoder: &dyn Geocoder) -> Result<(), AppError> {
    let mut session = SessionState::new(args.session.policy, args.session.steps);
    let mut store = LayerStore::default();

    let home = resolve_location(&args.location, geocoder)?;
    apply(&mut session, &mut store, InputEvent::SetHome { home: home.coordinate, label: home.label })?;

    if let Some(probe) = &args.probe {
        let probe = resolve_location(probe, geocoder)?.coordinate;
        apply(&mut session, &mut store, InputEvent::PlaceProbe(probe))?;
    }
    if session.phase() != Phase::ZoneComputed {
        warn!(phase = %session.phase(), policy = %session.policy(), "no zone computed; the probe policy needs --probe");
    }

    write_scene(&store.into_scene(), &args.output)
}

fn run_replay(args: ReplayArgs, geocoder: &dyn Geocoder) -> Result<(), AppError> {
    let session = SessionState::new(args.session.policy, args.session.steps);
    let file = File::open(&args.script)?;
    let (store, invalid) = replay(file, session, geocoder, args.strict)?;

    if invalid > 0 {
        warn!(invalid, "ignored line(s)");
    }
    info!(layers = store.layers().len(), "script replayed");
    write_scene(&store.into_scene(), &args.output)
}

/* ---------------- REPLAY ---------------- */

// One scripted user action.
#[derive(Debug, Deserialize)]
struct ScriptRow {
    action: String,
    #[serde(default)]
    input: String,
}

// Runs every script row through the session and the layer store.
// Returns the final layers and the number of rejected rows.
fn replay<R: Read>(
    source: R,
    mut session: SessionState,
    geocoder: &dyn Geocoder,
    strict: bool,
) -> Result<(LayerStore, u64), AppError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(source);

    // Validate required headers.
    let headers = reader.headers().map_err(|_| AppError::InvalidHeader)?;
    let headers: HashSet<_> = headers.iter().collect();
    for &h in REQUIRED_HEADERS {
        if !headers.contains(h) {
            return Err(AppError::MissingHeaderField(h.to_string()));
        }
    }

    let mut store = LayerStore::default();
    let mut invalid: u64 = 0;
    let mut line_no = 1;

    for row in reader.deserialize::<ScriptRow>() {
        line_no += 1;
        let outcome = row
            .map_err(AppError::from)
            .and_then(|r| replay_row(&mut session, &mut store, geocoder, &r, line_no));

        if let Err(e) = outcome {
            if strict {
                return Err(AppError::Script { line: line_no, source: Box::new(e) });
            }
            warn!(line = line_no, error = %e, "skipping script row");
            invalid += 1;
        }
    }

    Ok((store, invalid))
}

fn replay_row(
    session: &mut SessionState,
    store: &mut LayerStore,
    geocoder: &dyn Geocoder,
    row: &ScriptRow,
    line: usize,
) -> Result<(), AppError> {
    let event = match row.action.to_ascii_lowercase().as_str() {
        "home" => {
            // Lookups go through a ticket so a superseded answer is dropped.
            let ticket = session.begin_lookup();
            let result = resolve_location(&row.input, geocoder);
            if let Some(t) = session.complete_lookup(ticket, result)? {
                present(store, &Scene::from_session(session), t.retire_previous);
            }
            return Ok(());
        }
        "probe" => InputEvent::PlaceProbe(resolve_location(&row.input, geocoder)?.coordinate),
        "move" => InputEvent::MoveProbe(resolve_location(&row.input, geocoder)?.coordinate),
        "clear" => InputEvent::ClearProbe,
        "policy" => {
            let policy = ZonePolicy::from_str(&row.input, true).map_err(|_| AppError::UnknownAction {
                line,
                action: format!("policy {}", row.input),
            })?;
            InputEvent::SetPolicy(policy)
        }
        other => {
            return Err(AppError::UnknownAction { line, action: other.to_string() });
        }
    };
    apply(session, store, event)
}

/* ---------------- OUTPUT ---------------- */

// Applies one event, then redraws from the new session state.
fn apply(session: &mut SessionState, store: &mut LayerStore, event: InputEvent) -> Result<(), AppError> {
    let transition = session.on_input_event(event)?;
    present(store, &Scene::from_session(session), transition.retire_previous);
    Ok(())
}

fn write_scene(scene: &Scene, output: &OutputArgs) -> Result<(), AppError> {
    let writer: Box<dyn io::Write> = match &output.output {
        Some(path) => Box::new(File::create(path)?),
        None => Box::new(io::stdout().lock()),
    };

    match output.format {
        OutputFormat::Csv => write_csv(writer, scene)?,
        OutputFormat::Json => write_json(writer, scene)?,
    }

    if let Some(path) = &output.output {
        info!(path = %path.display(), layers = scene.layers.len(), "scene written");
    }
    Ok(())
}

/* ---------------- TEST ---------------- */
