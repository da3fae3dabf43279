//! `keyrx_daemon` — replays a synthetic key-event script against a compiled
//! keymap and logs the resulting modifier/layout/LED transitions.

use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::rc::Rc;

use clap::{Parser, Subcommand};

use keyrx_daemon::demo::{self, KeyEvent};
use keyrx_daemon::error::{DemoError, KeymapLoadError, SourceError};

#[derive(Parser)]
#[command(name = "keyrx_daemon")]
#[command(version, about = "Replay a synthetic key-event script against a compiled keymap")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile (or load) a keymap and replay an event script against it.
    Run {
        /// Canonical-text keymap (any extension) or `.krx` artifact.
        keymap: PathBuf,

        /// Event script: one `DOWN <name>` / `UP <name>` per line.
        events: PathBuf,
    },
}

/// Loads `path` as a keymap: a `.krx` artifact if its extension says so,
/// canonical text otherwise. Mirrors `keyrx_compiler::cli::compile`'s
/// read-then-compile shape, plus the artifact decode/verify step `verify`
/// and `view` use for `.krx` inputs.
fn load_keymap(path: &Path) -> Result<keyrx_core::Keymap, KeymapLoadError> {
    let bytes = fs::read(path).map_err(|source| SourceError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let text = if path.extension().and_then(|ext| ext.to_str()) == Some("krx") {
        let artifact = keyrx_compiler::artifact::decode(&bytes)?;
        keyrx_compiler::artifact::verify(&artifact)?;
        artifact.text
    } else {
        String::from_utf8_lossy(&bytes).into_owned()
    };

    let (keymap, mut diagnostics) = keyrx_compiler::compile_text(&text)?;
    let error_count = diagnostics.error_count();
    for diagnostic in diagnostics.drain() {
        match diagnostic.severity {
            keyrx_core::domain::events::Severity::Warning => log::warn!("{}", diagnostic.message),
            keyrx_core::domain::events::Severity::Error => log::error!("{}", diagnostic.message),
        }
    }
    if error_count > 0 {
        return Err(KeymapLoadError::DirtyCompile { error_count });
    }

    Ok(keymap)
}

fn load_events(path: &Path) -> Result<Vec<KeyEvent>, DemoError> {
    let text = fs::read_to_string(path).map_err(|source| SourceError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(demo::parse_event_script(&text)?)
}

fn run(keymap_path: &Path, events_path: &Path) -> Result<(), DemoError> {
    let keymap = load_keymap(keymap_path)?;
    let events = load_events(events_path)?;

    let trace = demo::run(Rc::new(keymap), &events);
    for transition in &trace {
        println!(
            "{} | mods={:#010x} group={} syms={:?} leds={:?}",
            transition.event,
            transition.effective_mods,
            transition.effective_group,
            transition.syms,
            transition.active_indicators,
        );
    }
    println!("{} event(s) replayed", trace.len());
    Ok(())
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Run { keymap, events } => run(&keymap, &events),
    };

    match result {
        Ok(()) => process::exit(0),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}
