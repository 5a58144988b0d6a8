// lx - main.rs
//
// Application entry point. Handles:
// 1. CLI argument parsing
// 2. config.toml loading and logging initialisation
// 3. Input origin selection (file, live pipe, clipboard)
// 4. Headless command driving: filter, key script, signal, export, copy

use clap::Parser;
use lx::app::command::Command;
use lx::app::ingest::IngestSettings;
use lx::app::state::StateLimits;
use lx::app::workspace::Session;
use lx::core::export::{self, ExportFormat};
use lx::core::model::{InputOrigin, Level};
use lx::core::signal::SignalKind;
use lx::driver::Driver;
use lx::platform::clipboard::SystemClipboard;
use lx::platform::config::{load_config, AppConfig, PlatformPaths};
use lx::platform::input;
use lx::util::error::{ExportError, LxError};
use lx::util::{constants, logging};
use std::io::{BufReader, Write};
use std::path::PathBuf;
use std::time::Duration;

/// How often a live stream reports progress while the driver waits for it.
const LIVE_WAIT_SLICE: Duration = Duration::from_secs(1);

/// lx - interactive log analysis for files, clipboard and live pipes.
///
/// With a path, the file is loaded. Without one, piped stdin is followed
/// until it ends; on a terminal, the clipboard is loaded.
#[derive(Parser, Debug)]
#[command(name = "lx", version, about)]
struct Cli {
    /// Log file to open.
    path: Option<PathBuf>,

    /// Filter query (space-separated terms, `!term` excludes).
    #[arg(short = 'f', long = "filter")]
    filter: Option<String>,

    /// Severity filter.
    #[arg(short = 'l', long = "level", value_parser = parse_level)]
    level: Option<Level>,

    /// Run a signal analysis over the visible lines and print it.
    #[arg(short = 's', long = "signal", value_parser = parse_signal)]
    signal: Option<SignalKind>,

    /// Whitespace-separated key names fed through the keymap, e.g. "j j x u".
    #[arg(short = 'k', long = "keys")]
    keys: Option<String>,

    /// Write the visible lines to a .csv or .json file.
    #[arg(short = 'e', long = "export")]
    export: Option<PathBuf>,

    /// Copy the visible lines and notes to the system clipboard.
    #[arg(long = "copy")]
    copy: bool,

    /// Enable debug logging (equivalent to RUST_LOG=debug).
    #[arg(short = 'd', long = "debug")]
    debug: bool,
}

fn parse_level(name: &str) -> Result<Level, String> {
    match Level::from_name(name) {
        Some(level @ (Level::Error | Level::Warn | Level::Info | Level::Debug)) => Ok(level),
        _ => Err(format!("'{name}' is not one of error, warn, info, debug")),
    }
}

fn parse_signal(name: &str) -> Result<SignalKind, String> {
    SignalKind::from_name(name)
        .ok_or_else(|| format!("'{name}' is not one of frequency, lifetime, burst, diversity"))
}

fn main() {
    let cli = Cli::parse();

    let platform_paths = PlatformPaths::resolve();
    let (config, config_warnings) = load_config(&platform_paths.config_dir);

    logging::init(
        cli.debug,
        config.log_level.as_deref(),
        config.log_file.as_deref(),
    );

    tracing::info!(
        version = constants::APP_VERSION,
        debug = cli.debug,
        config = %platform_paths.config_file().display(),
        "lx starting"
    );
    for warning in &config_warnings {
        tracing::warn!(warning = %warning, "Config warning");
        eprintln!("lx: {warning}");
    }

    if let Err(e) = run(cli, &config) {
        tracing::error!(error = %e, "lx failed");
        eprintln!("lx: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli, config: &AppConfig) -> Result<(), LxError> {
    let limits = StateLimits {
        max_selection_lines: config.max_selection_lines,
        frequency_top_n: config.frequency_top_n,
    };
    let settings = IngestSettings {
        chunk_threshold_lines: config.chunk_threshold_lines,
        chunk_size_lines: config.chunk_size_lines,
        live_batch_lines: config.live_batch_lines,
        live_flush: Duration::from_millis(config.live_flush_ms),
        live_queue_capacity: config.live_queue_capacity,
    };
    let mut driver = Driver::new(Session::new(limits, settings), SystemClipboard::new());

    let origin = input::detect_origin(cli.path.as_deref(), input::stdin_is_terminal());
    match (origin, cli.path.as_deref()) {
        (InputOrigin::File, Some(path)) => driver.open_file(path)?,
        (InputOrigin::Pipe, _) => driver.follow(BufReader::new(std::io::stdin())),
        _ => driver.paste(),
    }
    while !driver.session.wait_idle(LIVE_WAIT_SLICE) {
        tracing::debug!(
            entries = driver.session.active().state.entries.len(),
            "Waiting for input"
        );
    }

    {
        let state = &mut driver.session.active_mut().state;
        if let Some(level) = cli.level {
            state.level_filter = Some(level);
        }
        match &cli.filter {
            Some(query) => state.set_filter_query(query),
            None => state.refilter(),
        }
    }

    if let Some(script) = &cli.keys {
        if !driver.run_keys(script) {
            return Ok(());
        }
    }

    if let Some(kind) = cli.signal {
        driver.session.dispatch(Command::Signal(kind));
        let state = &driver.session.active().state;
        match &state.signal_result {
            Some(result) => print!("{}", result.format_for_clipboard()),
            None => eprintln!("lx: {}", state.status_message),
        }
    }

    if let Some(path) = &cli.export {
        let written = export_visible(&driver.session, path)?;
        eprintln!("lx: exported {written} lines to {}", path.display());
    }

    if cli.copy {
        if let Some(effect) = driver.session.dispatch(Command::CopyVisible) {
            driver.execute(effect);
        }
    }

    if cli.signal.is_none() && cli.export.is_none() && !cli.copy {
        print_visible(&driver.session)?;
    }

    let status = &driver.session.active().state.status_message;
    if !status.is_empty() {
        eprintln!("lx: {status}");
    }
    Ok(())
}

fn export_visible(session: &Session, path: &std::path::Path) -> Result<usize, LxError> {
    let format = ExportFormat::from_path(path)?;
    let visible = session.active().state.visible_entries();
    let file = std::fs::File::create(path).map_err(|e| ExportError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let writer = std::io::BufWriter::new(file);
    let written = match format {
        ExportFormat::Csv => export::export_csv(&visible, writer, path)?,
        ExportFormat::Json => export::export_json(&visible, writer, path)?,
    };
    Ok(written)
}

fn print_visible(session: &Session) -> Result<(), LxError> {
    let state = &session.active().state;
    let visible = state.visible_entries();
    let text = if state.notes.is_empty() {
        export::export_logs(&visible)
    } else {
        export::export_logs_with_notes(&visible, &state.notes)
    };
    let mut out = std::io::stdout().lock();
    writeln!(out, "{text}")
        .and_then(|()| out.flush())
        .map_err(|e| ExportError::Io {
            path: PathBuf::from("<stdout>"),
            source: e,
        })?;
    Ok(())
}
