//! Command-line driver for the CPL compiler.
//!
//! Takes a source file and writes a listing file and a code file (§6).
//! Exit code is 0 for a clean compile, including one with recovered
//! syntax/semantic errors reported in the listing; non-zero if code
//! generation was killed or a fatal internal error aborted the compile.

use std::path::PathBuf;
use std::process;

use clap::Parser as ClapParser;
use cplc::{compile_file, CompilerConfig};
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(ClapParser)]
#[command(name = "cplc")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Compile a CPL source file to an annotated listing and a code file")]
struct Cli {
    /// CPL source file to compile
    input: PathBuf,

    /// Path to write the annotated source listing to
    listing: PathBuf,

    /// Path to write the generated code text to
    code: PathBuf,

    /// Tab width used when expanding source indentation (3-8)
    #[arg(long, default_value_t = CompilerConfig::default().tab_width)]
    tab_width: usize,

    /// Fixed instruction-count cap for the code buffer; only enforced when
    /// combined with a non-growable buffer (see --no-growable-code)
    #[arg(long, default_value_t = CompilerConfig::default().code_capacity)]
    max_code: usize,

    /// Fail once `--max-code` instructions have been emitted instead of
    /// growing the code buffer without bound
    #[arg(long)]
    no_growable_code: bool,

    /// Increase logging verbosity (repeatable); overrides RUST_LOG
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = CompilerConfig::new()
        .with_tab_width(cli.tab_width)
        .with_code_capacity(cli.max_code)
        .with_growable_code_buffer(!cli.no_growable_code);

    let outcome = match compile_file(&cli.input, &config) {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(fatal)) => {
            error!(%fatal, "compile aborted on a fatal internal error");
            eprintln!("cplc: {fatal}");
            process::exit(1);
        }
        Err(io_err) => {
            eprintln!("cplc: cannot read {}: {io_err}", cli.input.display());
            process::exit(1);
        }
    };

    let listing_text = cplc::listing::render_listing(&outcome.source_lines, config.listing_width);
    if let Err(err) = std::fs::write(&cli.listing, listing_text) {
        eprintln!("cplc: cannot write {}: {err}", cli.listing.display());
        process::exit(1);
    }
    if let Err(err) = std::fs::write(&cli.code, &outcome.code_text) {
        eprintln!("cplc: cannot write {}: {err}", cli.code.display());
        process::exit(1);
    }

    for diagnostic in &outcome.diagnostics {
        eprintln!("{diagnostic}");
    }

    if !outcome.succeeded() {
        process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "cplc=warn",
        1 => "cplc=info",
        2 => "cplc=debug",
        _ => "cplc=trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();
}
