//! Colored, human-facing rendering of [`CoreError`] for terminal output.
//!
//! Renders a location + code-snippet + caret for parse errors.
//! `ParseError` is the only variant carrying a line/column, so it is the
//! only one that gets a snippet. Respects `NO_COLOR` via the `colored`
//! crate's own detection.

use colored::*;
use keyrx_core::error::CoreError;
use std::path::Path;

/// Formats `error` against `source`, the file it was read from.
pub fn format_error(error: &CoreError, path: &Path, source: &str) -> String {
    match error {
        CoreError::ParseError {
            line,
            column,
            message,
        } => {
            let mut out = String::new();
            out.push_str(&format!(
                "{}\n",
                format!("{}:{}:{}", path.display(), line, column).blue()
            ));
            out.push_str(&format!("{} {}\n", "Error:".red().bold(), message));
            out.push_str(&format_code_snippet(source, *line, *column));
            out
        }
        other => format!("{} {}\n", "Error:".red().bold(), other),
    }
}

/// A 3-line window (one line before, the error line, one line after) with a
/// caret under the offending column.
fn format_code_snippet(source: &str, error_line: usize, error_column: usize) -> String {
    let lines: Vec<&str> = source.lines().collect();
    let mut out = String::new();

    let start_line = error_line.saturating_sub(1).max(1);
    let end_line = (error_line + 1).min(lines.len());

    out.push('\n');
    for line_num in start_line..=end_line {
        let Some(content) = lines.get(line_num - 1) else {
            break;
        };
        if line_num == error_line {
            out.push_str(&format!("{:4} | {}\n", line_num.to_string().blue().bold(), content));
            let spaces = " ".repeat(error_column.saturating_sub(1));
            out.push_str(&format!("     | {}{}\n", spaces, "^".red().bold()));
        } else {
            out.push_str(&format!("{:4} | {}\n", line_num.to_string().blue(), content));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_snippet_points_at_the_offending_column() {
        let source = "xkb_keycodes \"t\" {\n    <A> =\n};\n";
        let err = CoreError::ParseError {
            line: 2,
            column: 10,
            message: "expected an integer".to_string(),
        };
        let rendered = format_error(&err, Path::new("layout.xkb"), source);
        assert!(rendered.contains("expected an integer"));
        assert!(rendered.contains('^'));
    }

    #[test]
    fn non_parse_errors_render_without_a_snippet() {
        let err = CoreError::UndefinedName("Foo".to_string());
        let rendered = format_error(&err, Path::new("layout.xkb"), "");
        assert!(rendered.contains("undefined name"));
        assert!(!rendered.contains('|'));
    }
}
