//! Character source with one-character pushback and line/column tracking
//! (§4.A).
//!
//! Tabs are expanded in the line buffer to the next multiple of the
//! configured tab width, but the reader interface always hands the caller
//! a single space per tab character consumed — the remaining expansion
//! columns accumulate silently in the line buffer. Pushback must work
//! across a newline: reading the first character of a new line and then
//! pushing it back must restore the read position to the trailing
//! newline of the previous line.

use crate::diagnostics::{Diagnostic, FatalError, Severity};

/// Sentinel returned by [`CharSource::read_char`] at end of input.
pub const END_OF_INPUT: i32 = -1;

/// Default/legal tab width range (§4.A).
pub const DEFAULT_TAB_WIDTH: usize = 8;
pub const MIN_TAB_WIDTH: usize = 3;
pub const MAX_TAB_WIDTH: usize = 8;

/// Default line buffer width (§3).
pub const DEFAULT_LINE_WIDTH: usize = 256;
/// Maximum pending error annotations per line buffer (§3).
pub const MAX_ANNOTATIONS: usize = 5;

/// Holds the expanded text of one source line plus any error annotations
/// raised while scanning it. Two of these coexist at any time (current and
/// previous) so pushback can cross a newline.
#[derive(Debug, Clone, Default)]
pub struct LineBuffer {
    pub line_number: u32,
    pub text: String,
    pub annotations: Vec<(usize, String)>,
}

impl LineBuffer {
    fn new(line_number: u32) -> Self {
        LineBuffer {
            line_number,
            text: String::new(),
            annotations: Vec::new(),
        }
    }

    fn push_char(&mut self, ch: u8) {
        self.text.push(ch as char);
    }

    fn add_annotation(&mut self, column: usize, message: String) {
        if self.annotations.len() < MAX_ANNOTATIONS {
            self.annotations.push((column, message));
        }
        // Beyond K=5, further annotations for this line are silently
        // dropped — the line buffer's pending-annotation slots are fixed
        // capacity, same as the original.
    }
}

/// One-shot snapshot used to undo exactly the most recent `read_char`.
#[derive(Clone)]
struct Checkpoint {
    pos: usize,
    column: usize,
    line: u32,
    current: LineBuffer,
    previous: LineBuffer,
    completed_len: usize,
}

pub struct CharSource {
    bytes: Vec<u8>,
    pos: usize,
    column: usize,
    line: u32,
    tab_width: usize,
    checkpoint: Option<Checkpoint>,
    current: LineBuffer,
    previous: LineBuffer,
    /// Every line buffer that has been recycled (i.e. fully read), in
    /// order. The original compiler only ever keeps the current/previous
    /// pair alive — it flushes each line to the listing as soon as it's
    /// read. We keep the completed ones around instead so the listing can
    /// be rendered once, after the whole compile, which is simpler for
    /// callers and behaviourally equivalent (§6).
    completed_lines: Vec<LineBuffer>,
    diagnostics: Vec<Diagnostic>,
}

impl CharSource {
    pub fn new(source: &str) -> Self {
        Self::with_tab_width(source, DEFAULT_TAB_WIDTH)
    }

    pub fn with_tab_width(source: &str, tab_width: usize) -> Self {
        let tab_width = tab_width.clamp(MIN_TAB_WIDTH, MAX_TAB_WIDTH);
        CharSource {
            bytes: source.as_bytes().to_vec(),
            pos: 0,
            column: 0,
            line: 1,
            tab_width,
            checkpoint: None,
            current: LineBuffer::new(1),
            previous: LineBuffer::new(0),
            completed_lines: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    fn snapshot(&self) -> Checkpoint {
        Checkpoint {
            pos: self.pos,
            column: self.column,
            line: self.line,
            current: self.current.clone(),
            previous: self.previous.clone(),
            completed_len: self.completed_lines.len(),
        }
    }

    fn restore(&mut self, cp: Checkpoint) {
        self.pos = cp.pos;
        self.column = cp.column;
        self.line = cp.line;
        self.current = cp.current;
        self.previous = cp.previous;
        self.completed_lines.truncate(cp.completed_len);
    }

    /// Reads the next character, expanding tabs and tracking line/column.
    /// Returns [`END_OF_INPUT`] once the source is exhausted.
    pub fn read_char(&mut self) -> i32 {
        self.checkpoint = Some(self.snapshot());

        if self.pos >= self.bytes.len() {
            return END_OF_INPUT;
        }
        let raw = self.bytes[self.pos];
        self.pos += 1;

        match raw {
            b'\t' => {
                let next_stop = (self.column / self.tab_width + 1) * self.tab_width;
                let spaces = next_stop - self.column;
                for _ in 0..spaces {
                    self.current.push_char(b' ');
                }
                self.column = next_stop;
                b' ' as i32
            }
            b'\n' => {
                self.line += 1;
                let finished = std::mem::replace(&mut self.current, LineBuffer::new(self.line));
                self.completed_lines.push(finished.clone());
                self.previous = finished;
                self.column = 0;
                b'\n' as i32
            }
            other => {
                self.current.push_char(other);
                self.column += 1;
                other as i32
            }
        }
    }

    /// Pushes back exactly one character. Calling this twice in a row
    /// without an intervening `read_char` is a fatal internal error.
    pub fn unread_char(&mut self) -> Result<(), FatalError> {
        match self.checkpoint.take() {
            Some(cp) => {
                self.restore(cp);
                Ok(())
            }
            None => Err(FatalError::DoublePushback),
        }
    }

    /// Current 0-based column on the current source line.
    pub fn current_column(&self) -> usize {
        self.column
    }

    /// Current 1-based line number.
    pub fn current_line(&self) -> u32 {
        self.line
    }

    /// Records a diagnostic at the given column of the current line, for
    /// later rendering by the listing formatter.
    pub fn report_error(&mut self, severity: Severity, message: impl Into<String>, column: usize) {
        let message = message.into();
        self.current.add_annotation(column, message.clone());
        self.diagnostics
            .push(Diagnostic::new(severity, message, self.line, column));
    }

    /// Drains the accumulated diagnostics (lexical-severity ones raised
    /// directly against the source; parser/semantic diagnostics are
    /// tracked separately and merged by the driver).
    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    pub fn tab_width(&self) -> usize {
        self.tab_width
    }

    /// Every line of source read so far, in order, including the
    /// in-progress current line. Used once, at the end of a compile, to
    /// render the full listing (§6).
    pub fn all_lines(&self) -> Vec<LineBuffer> {
        let mut lines = self.completed_lines.clone();
        lines.push(self.current.clone());
        lines
    }
}
