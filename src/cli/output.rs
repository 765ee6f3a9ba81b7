//! Colored output helpers for the CLI
//!
//! Provides consistent, colored terminal output for research runs.

use crate::types::{RunOutcome, RunStatus};
use owo_colors::OwoColorize;

/// Output style configuration
pub struct Output {
    /// Whether to use colored output
    pub colored: bool,
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

impl Output {
    /// Create a new output helper with colors enabled
    pub fn new() -> Self {
        Self { colored: true }
    }

    /// Create a new output helper with colors disabled
    pub fn no_color() -> Self {
        Self { colored: false }
    }

    /// Print the S.A.G.E. banner
    pub fn banner(&self) {
        if self.colored {
            println!(
                "\n  {} {}\n",
                "S.A.G.E.".bright_cyan().bold(),
                format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
            );
        } else {
            println!("\n  S.A.G.E. v{}\n", env!("CARGO_PKG_VERSION"));
        }
    }

    /// Print a success message with a checkmark
    pub fn success(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "✓".green().bold(), message.green());
        } else {
            println!("  [OK] {}", message);
        }
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "•".blue(), message);
        } else {
            println!("  [INFO] {}", message);
        }
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "⚠".yellow().bold(), message.yellow());
        } else {
            println!("  [WARN] {}", message);
        }
    }

    /// Print an error message
    pub fn error(&self, message: &str) {
        if self.colored {
            eprintln!("  {} {}", "✗".red().bold(), message.red());
        } else {
            eprintln!("  [ERROR] {}", message);
        }
    }

    /// Print a section heading
    pub fn heading(&self, title: &str) {
        if self.colored {
            println!("\n  {}", title.bright_white().bold());
        } else {
            println!("\n  {}", title);
        }
    }

    /// Render a complete research run
    pub fn run_outcome(&self, outcome: &RunOutcome) {
        match &outcome.status {
            RunStatus::Complete => self.success(&format!(
                "Research complete in {} ms",
                outcome.duration_ms
            )),
            RunStatus::NoResults => {
                self.warning("Search succeeded but returned no papers")
            }
            RunStatus::AllSourcesFailed => {
                self.error("Every search source failed");
            }
            RunStatus::StageFailure { stage, reason } => {
                self.warning(&format!(
                    "Stage '{}' failed ({}); showing partial results",
                    stage, reason
                ));
            }
        }

        for err in &outcome.errors {
            self.warning(&format!("source '{}': {}", err.source, err.message));
        }

        if !outcome.papers.is_empty() {
            self.heading(&format!("Papers ({})", outcome.papers.len()));
            for (i, paper) in outcome.papers.iter().enumerate().take(10) {
                let year = paper
                    .year
                    .map(|y| y.to_string())
                    .unwrap_or_else(|| "n.d.".to_string());
                if self.colored {
                    println!(
                        "  {} {} {}",
                        format!("{:>2}.", i + 1).dimmed(),
                        paper.title.bright_white(),
                        format!("({}, {})", paper.source, year).dimmed()
                    );
                } else {
                    println!(
                        "  {:>2}. {} ({}, {})",
                        i + 1,
                        paper.title,
                        paper.source,
                        year
                    );
                }
            }
        }

        if !outcome.findings.is_empty() {
            self.heading(&format!("Findings ({})", outcome.findings.len()));
            for finding in &outcome.findings {
                self.info(&finding.text);
            }
        }

        if let Some(synthesis) = &outcome.synthesis {
            self.heading("Synthesis");
            for line in synthesis.body.lines() {
                println!("  {}", line);
            }
        }

        if !outcome.gaps.is_empty() {
            self.heading("Research Gaps");
            for gap in &outcome.gaps {
                self.info(gap);
            }
        }
    }
}
