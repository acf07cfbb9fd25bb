//! kipart: generate KiCad schematic symbols from pin tables, and back again.
//!
//! `kipart gen` turns pin lists into `.kicad_sym` libraries; `kipart dump`
//! turns libraries back into pin tables.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args as ClapArgs, Parser, Subcommand};
use tracing::{error, info, warn, Level};
use tracing_subscriber::EnvFilter;

use kipart::adapters::{self, PinSource, ADAPTER_NAMES};
use kipart::config;
use kipart::symbol::arrange::build_part;
use kipart::symbol::error::{SymbolError, SymbolResult};
use kipart::symbol::mnemonic::resolve;
use kipart::symbol::options::{Annotation, FillStyle, LayoutOptions, SortMode};
use kipart::symbol::part::Library;
use kipart::symbol::reader::load_library;
use kipart::symbol::writer::{save_library, OutputPolicy};
use kipart::table;

/// Generate multi-unit KiCad schematic symbols from tabular pin lists.
#[derive(Parser, Debug)]
#[command(name = "kipart")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "CONFIG_FILE", global = true)]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Decrease logging verbosity (only show errors)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate symbol libraries from pin tables
    Gen(GenArgs),
    /// Convert symbol libraries into pin tables
    Dump(DumpArgs),
}

#[derive(ClapArgs, Debug)]
struct GenArgs {
    /// Input files; glob patterns are expanded
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Write every part into this library instead of one library per input
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Allow replacing an existing output file (with --merge: colliding symbols)
    #[arg(short = 'w', long)]
    overwrite: bool,

    /// Merge into an existing output file
    #[arg(short, long)]
    merge: bool,

    /// Input format
    #[arg(short, long, default_value = "generic", value_parser = ADAPTER_NAMES)]
    reader: String,

    /// Pin order within each side: row, num or name
    #[arg(short, long)]
    sort: Option<SortMode>,

    /// Reverse the pin order
    #[arg(long)]
    reverse: bool,

    /// Side for pins that do not name one
    #[arg(long, value_name = "SIDE")]
    side: Option<String>,

    /// Electrical type for pins that do not name one
    #[arg(long = "type", value_name = "TYPE")]
    pin_type: Option<String>,

    /// Graphic style for pins that do not name one
    #[arg(long, value_name = "STYLE")]
    style: Option<String>,

    /// Bundle identically-named power and no-connect pins
    #[arg(short, long)]
    bundle: bool,

    /// Bundle name suffix: none, count or range
    #[arg(short, long)]
    annotation: Option<Annotation>,

    /// Position of pin groups along each side, 0.0 to 1.0
    #[arg(short, long)]
    push: Option<f64>,

    /// Tuck left/right pin columns under the top/bottom rows
    #[arg(long)]
    scrunch: bool,

    /// Place pins counter-clockwise around the body
    #[arg(long)]
    ccw: bool,

    /// Put the centroid of the pins at the origin instead of pin 1
    #[arg(long)]
    center: bool,

    /// Body outline width in mm
    #[arg(long, value_name = "MM")]
    box_line_width: Option<f64>,

    /// Body fill: no_fill, foreground or background
    #[arg(short, long)]
    fill: Option<FillStyle>,

    /// Split pin names into alternates on this character
    #[arg(long, value_name = "CHAR")]
    alt_delimiter: Option<char>,

    /// Accept approximate type, style and side names
    #[arg(long)]
    fuzzy: bool,
}

#[derive(ClapArgs, Debug)]
struct DumpArgs {
    /// Symbol library files; glob patterns are expanded
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Write every part into this table instead of one table per input
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Allow replacing an existing output file
    #[arg(short = 'w', long)]
    overwrite: bool,

    /// Join alternate pin names with this character
    #[arg(long, value_name = "CHAR")]
    alt_delimiter: Option<char>,
}

/// Determines the log level from CLI arguments.
#[allow(clippy::match_same_arms)] // Explicit "warn" arm for clarity
fn get_log_level(verbose: u8, quiet: bool, config_level: &str) -> Level {
    if quiet {
        return Level::ERROR;
    }

    match verbose {
        0 => match config_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::WARN, // Default to warn for unknown levels
        },
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Initialises the tracing subscriber for logging.
fn init_tracing(level: Level) {
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Expands glob patterns; plain paths pass through unchanged.
fn expand_inputs(inputs: &[String]) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    for input in inputs {
        if !input.contains(['*', '?', '[']) {
            paths.push(PathBuf::from(input));
            continue;
        }
        match glob::glob(input) {
            Ok(entries) => {
                let before = paths.len();
                paths.extend(entries.filter_map(Result::ok));
                if paths.len() == before {
                    warn!(pattern = %input, "Pattern matched no files");
                }
            }
            Err(e) => warn!(pattern = %input, error = %e, "Invalid glob pattern"),
        }
    }
    paths
}

/// Applies command-line overrides on top of the configured layout options.
fn layout_options(base: &LayoutOptions, args: &GenArgs) -> SymbolResult<LayoutOptions> {
    let mut opts = base.clone();
    opts.fuzzy |= args.fuzzy;
    if let Some(sort) = args.sort {
        opts.sort = sort;
    }
    opts.reverse |= args.reverse;
    if let Some(side) = &args.side {
        opts.default_side = resolve(side, opts.fuzzy)?;
    }
    if let Some(pin_type) = &args.pin_type {
        opts.default_type = resolve(pin_type, opts.fuzzy)?;
    }
    if let Some(style) = &args.style {
        opts.default_style = resolve(style, opts.fuzzy)?;
    }
    opts.bundle |= args.bundle;
    if let Some(annotation) = args.annotation {
        opts.annotation = annotation;
    }
    if let Some(push) = args.push {
        opts.push = push;
    }
    opts.scrunch |= args.scrunch;
    opts.ccw |= args.ccw;
    opts.center |= args.center;
    if let Some(width) = args.box_line_width {
        opts.box_line_width = width;
    }
    if let Some(fill) = args.fill {
        opts.fill = fill;
    }
    if args.alt_delimiter.is_some() {
        opts.alt_delimiter = args.alt_delimiter;
    }
    Ok(opts)
}

/// Reads one input through `source` and builds its parts.
fn read_parts(
    path: &Path,
    source: &dyn PinSource,
    opts: &LayoutOptions,
) -> SymbolResult<Library> {
    let bytes = std::fs::read(path).map_err(|e| SymbolError::file_read(path, e))?;
    let text = table::decode_text(&bytes);
    let raw_parts = source.read(&text, &path.to_string_lossy())?;

    let mut library = Library::new();
    for raw in &raw_parts {
        match build_part(raw, opts) {
            Ok((part, _diagnostics)) => {
                if let Some(previous) = library.insert(part) {
                    warn!(part = %previous.name, "Part defined twice in one input; later one kept");
                }
            }
            Err(e) => warn!(input = %path.display(), error = %e, "Part skipped"),
        }
    }
    Ok(library)
}

fn save(path: &Path, library: &Library, opts: &LayoutOptions, policy: OutputPolicy) -> bool {
    match save_library(path, library, opts, policy) {
        Ok(outcome) => {
            for name in &outcome.skipped {
                warn!(part = %name, output = %path.display(), "Already in library; not replaced");
            }
            outcome.rejected.is_empty()
        }
        Err(e) => {
            error!(output = %path.display(), error = %e, "Could not write library");
            false
        }
    }
}

fn run_gen(args: &GenArgs, base: &LayoutOptions) -> bool {
    let opts = match layout_options(base, args) {
        Ok(opts) => opts,
        Err(e) => {
            error!(error = %e, "Invalid option");
            return false;
        }
    };
    if let Err(e) = config::validate_layout(&opts) {
        error!(error = %e, "Invalid option");
        return false;
    }
    let source = match adapters::adapter_for(&args.reader) {
        Ok(source) => source,
        Err(e) => {
            error!(error = %e, "Invalid option");
            return false;
        }
    };
    let policy = OutputPolicy {
        overwrite: args.overwrite,
        merge: args.merge,
    };

    let mut ok = true;
    let mut combined = Library::new();
    for input in expand_inputs(&args.inputs) {
        info!(input = %input.display(), reader = source.name(), "Reading pin data");
        let library = match read_parts(&input, source.as_ref(), &opts) {
            Ok(library) => library,
            Err(e) => {
                error!(input = %input.display(), error = %e, "Could not read input");
                ok = false;
                continue;
            }
        };
        if args.output.is_some() {
            combined.merge(library, args.overwrite);
        } else {
            ok &= save(&input.with_extension("kicad_sym"), &library, &opts, policy);
        }
    }

    if let Some(output) = &args.output {
        ok &= save(output, &combined, &opts, policy);
    }
    ok
}

fn run_dump(args: &DumpArgs) -> bool {
    let mut ok = true;
    let mut combined = Library::new();
    for input in expand_inputs(&args.inputs) {
        info!(input = %input.display(), "Reading symbol library");
        let library = match load_library(&input) {
            Ok(library) => library,
            Err(e) => {
                error!(input = %input.display(), error = %e, "Could not read library");
                ok = false;
                continue;
            }
        };
        if args.output.is_some() {
            combined.merge(library, args.overwrite);
            continue;
        }
        let output = input.with_extension("csv");
        if let Err(e) = table::save_table(&output, &library, args.alt_delimiter, args.overwrite) {
            error!(output = %output.display(), error = %e, "Could not write table");
            ok = false;
        }
    }

    if let Some(output) = &args.output {
        if let Err(e) = table::save_table(output, &combined, args.alt_delimiter, args.overwrite) {
            error!(output = %output.display(), error = %e, "Could not write table");
            ok = false;
        }
    }
    ok
}

/// Entry point for the kipart command.
fn main() -> ExitCode {
    let args = Args::parse();

    // Load configuration
    let config_path = args.config.as_deref();
    let cfg = match config::load_config(config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            if config_path.is_none() {
                if let Some(default_path) = config::default_config_path() {
                    eprintln!("\nConfig read from: {}", default_path.display());
                }
            }
            return ExitCode::FAILURE;
        }
    };

    // Initialise logging
    let log_level = get_log_level(args.verbose, args.quiet, &cfg.logging.level);
    init_tracing(log_level);

    info!(version = env!("CARGO_PKG_VERSION"), "Starting kipart");

    let ok = match &args.command {
        Command::Gen(gen_args) => run_gen(gen_args, &cfg.layout),
        Command::Dump(dump_args) => run_dump(dump_args),
    };

    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
