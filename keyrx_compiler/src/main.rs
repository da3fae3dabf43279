//! keyrx_compiler — compiles canonical XKB-style keymap text into `.krx`
//! artifacts and inspects/renders them.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use keyrx_core::domain::value_objects::MergeMode as CoreMergeMode;

mod artifact;
mod cli;
mod error;

#[derive(Parser)]
#[command(name = "keyrx_compiler")]
#[command(version, about = "Compile canonical XKB-style keymap text to .krx artifacts")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Mirrors [`keyrx_core::domain::value_objects::MergeMode`] for `clap`'s
/// derive, which needs a type it can parse from a string itself.
#[derive(Clone, Copy, ValueEnum)]
enum MergeModeArg {
    Default,
    Augment,
    Override,
    Replace,
}

impl From<MergeModeArg> for CoreMergeMode {
    fn from(value: MergeModeArg) -> Self {
        match value {
            MergeModeArg::Default => CoreMergeMode::Default,
            MergeModeArg::Augment => CoreMergeMode::Augment,
            MergeModeArg::Override => CoreMergeMode::Override,
            MergeModeArg::Replace => CoreMergeMode::Replace,
        }
    }
}

/// RMLVO-style component selection. The rules-resolution layer that turns
/// these into component file names is explicitly out of scope (`compile`
/// always reads `input` directly) — these are accepted and logged so the
/// CLI's configuration surface matches the shape callers of a real XKB
/// toolchain expect, per the ambient config-surface requirement.
#[derive(clap::Args)]
struct Rmlvo {
    /// Rules component name (accepted for shape parity; not resolved).
    #[arg(long)]
    rules: Option<String>,
    /// Model component name (accepted for shape parity; not resolved).
    #[arg(long)]
    model: Option<String>,
    /// Layout component name (accepted for shape parity; not resolved).
    #[arg(long)]
    layout: Option<String>,
    /// Variant component name (accepted for shape parity; not resolved).
    #[arg(long)]
    variant: Option<String>,
    /// Comma-separated option names (accepted for shape parity; not resolved).
    #[arg(long)]
    options: Option<String>,
}

impl Rmlvo {
    fn log(&self) {
        if self.rules.is_some()
            || self.model.is_some()
            || self.layout.is_some()
            || self.variant.is_some()
            || self.options.is_some()
        {
            log::debug!(
                "RMLVO components given (rules={:?}, model={:?}, layout={:?}, variant={:?}, options={:?}); rules-resolution is not implemented, reading --input directly",
                self.rules, self.model, self.layout, self.variant, self.options
            );
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Compile canonical keymap text to a .krx artifact.
    Compile {
        /// Input canonical-text keymap file.
        input: PathBuf,

        /// Output .krx artifact (defaults to input with a .krx extension).
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Override the merge mode of every top-level section.
        #[arg(long, value_enum)]
        merge: Option<MergeModeArg>,

        #[command(flatten)]
        rmlvo: Rmlvo,
    },

    /// Compile and report diagnostics without writing an artifact.
    Check {
        /// Input canonical-text keymap file.
        input: PathBuf,
    },

    /// Verify a .krx artifact's content hash and that it still compiles.
    Verify {
        /// .krx artifact to verify.
        file: PathBuf,
    },

    /// Extract (and optionally verify) a .krx artifact's embedded hash.
    Hash {
        /// .krx artifact.
        file: PathBuf,

        /// Recompute the hash and compare it to the embedded one.
        #[arg(long)]
        verify: bool,
    },

    /// Render a .krx artifact as an HTML keymap visualization.
    View {
        /// .krx artifact to render.
        input: PathBuf,

        /// Output HTML file (defaults to input with a .html extension).
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Open the rendered page in the system browser.
        #[arg(long)]
        open: bool,
    },
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Compile {
            input,
            output,
            merge,
            rmlvo,
        } => {
            rmlvo.log();
            let output_path = output.unwrap_or_else(|| {
                let mut path = input.clone();
                path.set_extension("krx");
                path
            });
            cli::handle_compile(&input, &output_path, merge.map(CoreMergeMode::from))
                .map_err(|e| e.to_string())
        }
        Commands::Check { input } => cli::handle_check(&input).map_err(|e| e.to_string()),
        Commands::Verify { file } => cli::handle_verify(&file).map_err(|e| e.to_string()),
        Commands::Hash { file, verify } => {
            cli::handle_hash(&file, verify).map_err(|e| e.to_string())
        }
        Commands::View {
            input,
            output,
            open,
        } => {
            let output_path = output.unwrap_or_else(|| {
                let mut path = input.clone();
                path.set_extension("html");
                path
            });
            cli::handle_view(&input, &output_path, open).map_err(|e| e.to_string())
        }
    };

    match result {
        Ok(()) => process::exit(0),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}
