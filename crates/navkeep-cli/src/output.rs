//! Output formatting

use console::{style, Term};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

use navkeep::SessionRecord;

use crate::handlers::MatchRow;

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON output
    Json,
}

/// Status line writer on stderr
#[derive(Debug)]
pub struct Reporter {
    term: Term,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new(false, false)
    }
}

impl Reporter {
    /// Create a new reporter
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            term: Term::stderr(),
            use_color,
            quiet,
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        if self.quiet {
            return;
        }
        let prefix = if self.use_color {
            style("✓").green().bold().to_string()
        } else {
            "OK".to_string()
        };
        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.quiet {
            return;
        }
        let prefix = if self.use_color {
            style("⚠").yellow().bold().to_string()
        } else {
            "WARN".to_string()
        };
        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print an error message, even in quiet mode
    pub fn error(&self, message: &str) {
        let prefix = if self.use_color {
            style("✗").red().bold().to_string()
        } else {
            "ERROR".to_string()
        };
        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }
}

/// Render a session record
pub fn render_record(record: &SessionRecord, format: OutputFormat) -> serde_json::Result<String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(record),
        OutputFormat::Text => {
            let mut out = String::new();
            let stack = record.navigation_stack.entries();
            let _ = writeln!(out, "Navigation stack ({} levels)", stack.len());
            for (depth, entry) in stack.iter().enumerate() {
                let _ = writeln!(out, "  {depth} {} [{}]", entry.selector, entry.index);
            }
            let _ = writeln!(
                out,
                "Scroll positions ({} entries)",
                record.scroll_positions.len()
            );
            for (selector, top) in &record.scroll_positions {
                let _ = writeln!(out, "  {selector} = {top}");
            }
            Ok(out)
        }
    }
}

/// Render query matches
pub fn render_matches(rows: &[MatchRow], format: OutputFormat) -> serde_json::Result<String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(rows),
        OutputFormat::Text => {
            let mut out = String::new();
            for row in rows {
                let _ = writeln!(out, "{}\t{}\t{}", row.document, row.element, row.selector);
            }
            Ok(out)
        }
    }
}
