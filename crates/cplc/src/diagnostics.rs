//! Diagnostic records and the fatal-error taxonomy.
//!
//! The original compiler prints straight to the error stream as it goes;
//! here diagnostics are collected into a structured [`Diagnostic`] so the
//! listing renderer and the CLI's exit-code decision both work off one
//! type instead of re-deriving severity from message text.

use std::fmt;

/// Severity band a diagnostic falls into. Mirrors the error taxonomy of
/// §7: lexical and syntactic errors are recoverable and parsing continues;
/// semantic errors additionally kill code generation; fatal errors never
/// reach this type — they unwind as [`FatalError`] instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Lexical,
    SyntaxToken,
    SyntaxSet,
    Semantic,
}

/// A single recoverable diagnostic, tied to the line/column it was raised
/// at. `line` is 1-based to match the listing's line-number gutter;
/// `column` is 0-based to match [`crate::source::CharSource::current_column`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub line: u32,
    pub column: usize,
}

impl Diagnostic {
    pub fn new(severity: Severity, message: impl Into<String>, line: u32, column: usize) -> Self {
        Diagnostic {
            severity,
            message: message.into(),
            line,
            column,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, col {}: {}", self.line, self.column, self.message)
    }
}

/// Internal conditions that indicate an implementer or resource error
/// rather than a malformed user program (§7, "Fatal internal"). These
/// terminate the compile immediately; callers should propagate them to
/// `main` and exit non-zero with a stderr message, never try to recover.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FatalError {
    /// `unread_char` called twice without an intervening `read_char`.
    DoublePushback,
    /// `unread_char` called before any character has been read.
    PushbackBeforeStart,
    /// The code buffer's fixed capacity was exceeded by `emit`.
    CodeBufferOverflow { capacity: usize },
    /// `backpatch` targeted an address outside `[0, current_address())`.
    BackpatchOutOfRange { address: usize, limit: usize },
    /// A [`crate::token_set::TokenSet`] operation was given an out-of-range
    /// token index; this guards an implementer bug, not user input.
    TokenSetIndexOutOfRange { index: usize },
    /// `Synchronise` or the scanner state machine reached a state the
    /// grammar says is unreachable.
    UnreachableState { context: &'static str },
}

impl fmt::Display for FatalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FatalError::DoublePushback => {
                write!(f, "internal error: unread_char called twice in a row")
            }
            FatalError::PushbackBeforeStart => {
                write!(f, "internal error: unread_char called before start of input")
            }
            FatalError::CodeBufferOverflow { capacity } => {
                write!(f, "internal error: code buffer overflow (capacity {capacity})")
            }
            FatalError::BackpatchOutOfRange { address, limit } => write!(
                f,
                "internal error: backpatch address {address} out of range (limit {limit})"
            ),
            FatalError::TokenSetIndexOutOfRange { index } => {
                write!(f, "internal error: token set index {index} out of range")
            }
            FatalError::UnreachableState { context } => {
                write!(f, "internal error: unreachable state in {context}")
            }
        }
    }
}

impl std::error::Error for FatalError {}
