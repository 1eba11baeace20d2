//! Renders the annotated source listing (§6).
//!
//! External to the core per §1 ("tab-expanded listing formatting"), but
//! implemented here since the core's [`crate::source::LineBuffer`] is the
//! only thing that carries the information needed to render it.

use crate::source::LineBuffer;

/// Column width at which a line is wrapped into an unnumbered
/// continuation, matching [`crate::source::DEFAULT_LINE_WIDTH`].
pub const M_LINE_WIDTH: usize = crate::source::DEFAULT_LINE_WIDTH;

/// Renders every line with a three-digit line-number gutter, followed by
/// its pending error annotations (a caret line then the message line).
/// Lines wider than `line_width` wrap into continuation lines printed
/// without a line number.
pub fn render_listing(lines: &[LineBuffer], line_width: usize) -> String {
    let mut out = String::new();
    for buf in lines {
        let chunks = chunk(&buf.text, line_width);
        if chunks.is_empty() {
            out.push_str(&format!("{:03}  \n", buf.line_number));
        } else {
            for (i, chunk) in chunks.iter().enumerate() {
                if i == 0 {
                    out.push_str(&format!("{:03}  {}\n", buf.line_number, chunk));
                } else {
                    out.push_str(&format!("     {}\n", chunk));
                }
            }
        }
        for (column, message) in &buf.annotations {
            out.push_str(&format!("    {}^\n", " ".repeat(*column)));
            out.push_str(message);
            out.push('\n');
        }
    }
    out
}

fn chunk(text: &str, width: usize) -> Vec<&str> {
    if text.is_empty() {
        return Vec::new();
    }
    let bytes = text.as_bytes();
    let mut pieces = Vec::new();
    let mut start = 0;
    while start < bytes.len() {
        let end = (start + width).min(bytes.len());
        pieces.push(&text[start..end]);
        start = end;
    }
    pieces
}
