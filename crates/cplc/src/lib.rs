//! A small recursive-descent compiler for the CPL teaching language.
//!
//! The pipeline is `CharSource` → `Lexer` → `Parser`, with the parser
//! driving semantic analysis and code generation as a side effect of
//! recognising productions (there is no separate AST pass). See
//! `Parser::compile` for the entry point this crate is built around;
//! [`compile`] below is the thin top-level wrapper `main.rs` calls.

pub mod codegen;
pub mod config;
pub mod diagnostics;
pub mod interner;
pub mod lexer;
pub mod listing;
pub mod parser;
pub mod source;
pub mod symtab;
pub mod token;
pub mod token_set;

pub use config::CompilerConfig;
pub use diagnostics::{Diagnostic, FatalError, Severity};
pub use parser::{CompileOutcome, Parser};

/// Compiles `source_text` under `config`, returning the diagnostics,
/// rendered code listing, and rendered source listing in one bundle.
///
/// Only [`FatalError`] aborts the compile outright (internal invariant
/// violations, not user-program errors); malformed programs are reported
/// as [`Diagnostic`]s in the returned [`CompileOutcome`] and still produce
/// a (possibly error-banner) code listing.
pub fn compile(source_text: &str, config: &CompilerConfig) -> Result<CompileOutcome, FatalError> {
    Parser::new(source_text, config)?.compile()
}

/// Same as [`compile`], named for callers that read a literal CPL program
/// from a string (as opposed to a file on disk).
pub fn compile_str(source_text: &str, config: &CompilerConfig) -> Result<CompileOutcome, FatalError> {
    compile(source_text, config)
}

/// Reads `path` and compiles its contents. I/O errors are reported the
/// same way the CLI driver reports them: there's no `Diagnostic` severity
/// for "file not found", so this surfaces as a plain `io::Error`.
pub fn compile_file(
    path: &std::path::Path,
    config: &CompilerConfig,
) -> std::io::Result<Result<CompileOutcome, FatalError>> {
    let source_text = std::fs::read_to_string(path)?;
    Ok(compile(&source_text, config))
}
