//! Diagnostic presentation: `file:line:column`, the source line, and a
//! caret. Color belongs to this layer only; core messages stay plain.

use colored::Colorize;
use firec_common::{Diagnostic, position::source_line};

/// Render one diagnostic against its source text.
#[must_use]
pub fn render(diagnostic: &Diagnostic, source: &str, filename: &str) -> String {
    let mut out = format!(
        "{}: {}\n",
        "error".red().bold(),
        diagnostic.message
    );
    if diagnostic.line > 0 {
        let line_text = source_line(source, diagnostic.line);
        out.push_str(&format!("> {}\n", line_text.trim()));
        let caret_pad = " ".repeat(diagnostic.column as usize + 2);
        out.push_str(&format!("{caret_pad}^\n"));
        out.push_str(&format!(
            "({filename}:{}:{})",
            diagnostic.line, diagnostic.column
        ));
    } else {
        out.push_str(&format!("({filename})"));
    }
    out
}

pub fn report_all(diagnostics: &[Diagnostic], source: &str, filename: &str) {
    for diagnostic in diagnostics {
        eprintln!("{}", render(diagnostic, source, filename));
    }
}
