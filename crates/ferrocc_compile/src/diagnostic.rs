//! Diagnostic rendering.
//!
//! One fixed format, printed to stderr by the CLI before a non-zero exit:
//!
//! ```text
//! <filename>:<line>: <source line>
//!                    ^ <message>
//! ```
//!
//! The caret is indented past the `<filename>:<line>: ` prefix so that it
//! lands under the offending column of the echoed source line.

use ferrocc_base::SpannedError;

/// Renders `err` against the source it was produced from.
pub fn render(filename: &str, source: &str, err: &SpannedError) -> String {
    let offset = err.span.start.min(source.len());
    let (line_no, line_start, line) = find_context(source, offset);

    let prefix = format!("{}:{}: ", filename, line_no);
    let col = offset - line_start;
    let indent = " ".repeat(prefix.len() + col);
    format!("{}{}\n{}^ {}", prefix, line, indent, err.message)
}

/// Locates the 1-based line number, line start offset, and line content
/// containing `offset`.
fn find_context(source: &str, offset: usize) -> (usize, usize, &str) {
    let mut line_no = 1;
    let mut line_start = 0;
    for (i, b) in source.bytes().enumerate() {
        if i >= offset {
            break;
        }
        if b == b'\n' {
            line_no += 1;
            line_start = i + 1;
        }
    }
    let line_end = source[line_start..]
        .find('\n')
        .map(|n| line_start + n)
        .unwrap_or(source.len());
    (line_no, line_start, &source[line_start..line_end])
}
