//! Compiler configuration (ambient — §6 "Environment", §4.A tab width,
//! §4.F code buffer capacity).
//!
//! The underlying algorithm treats these as compile-time constants; here
//! they're exposed as a small builder-style config instead, so callers can
//! override them per compile rather than recompiling with different
//! constants.

use crate::codegen::DEFAULT_CAPACITY;
use crate::source::DEFAULT_TAB_WIDTH;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerConfig {
    /// Tab width used to expand `\t` in the source. Clamped to the legal
    /// range `[3, 8]` by [`crate::source::CharSource`].
    pub tab_width: usize,
    /// Fixed code buffer capacity, used when `growable_code_buffer` is
    /// false. Reaching it is a fatal error (§4.F).
    pub code_capacity: usize,
    /// When true, the code buffer never overflows — a documented
    /// relaxation of the original's fixed-size program limit (§9).
    pub growable_code_buffer: bool,
    /// Column width a listing line wraps at before becoming an unnumbered
    /// continuation (§6).
    pub listing_width: usize,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        CompilerConfig {
            tab_width: DEFAULT_TAB_WIDTH,
            code_capacity: DEFAULT_CAPACITY,
            // The original treats the buffer's fixed capacity as a hard
            // compile-time limit. We grow by default (REDESIGN FLAG, see
            // DESIGN.md) and keep `code_capacity` around as a configurable
            // cap for callers and tests that want the old overflow
            // behaviour back via `with_growable_code_buffer(false)`.
            growable_code_buffer: true,
            listing_width: crate::listing::M_LINE_WIDTH,
        }
    }
}

impl CompilerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tab_width(mut self, width: usize) -> Self {
        self.tab_width = width;
        self
    }

    pub fn with_code_capacity(mut self, capacity: usize) -> Self {
        self.code_capacity = capacity;
        self
    }

    pub fn with_growable_code_buffer(mut self, growable: bool) -> Self {
        self.growable_code_buffer = growable;
        self
    }
}
