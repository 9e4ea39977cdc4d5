//! Terminal summaries for one-shot runs.
//!
//! Logging covers the per-entry detail; this module prints the short coloured
//! recap a person running `dorg --once` reads at the end.

use crate::organizer::PassReport;
use colored::*;

/// Prints styled end-of-run messages.
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark.
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a warning message in yellow with a warning symbol.
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    /// Prints a section header.
    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Prints a dry-run notice message.
    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }

    /// Prints the recap table for a finished pass.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use dorg::organizer::PassReport;
    /// use dorg::output::OutputFormatter;
    ///
    /// let mut report = PassReport::new(false);
    /// report.files_moved = 3;
    /// OutputFormatter::pass_summary(&report);
    /// ```
    pub fn pass_summary(report: &PassReport) {
        Self::header("SUMMARY");

        let rows = [
            ("Files", report.files_moved),
            ("Folders", report.dirs_moved),
        ];
        let width = 8;

        println!("{:<width$} | {}", "Entry".bold(), "Count".bold());
        println!("{}", "-".repeat(width + 10));
        for (label, count) in rows {
            println!("{:<width$} | {}", label, count.to_string().green());
        }
        if !report.failures.is_empty() {
            println!(
                "{:<width$} | {}",
                "Failed",
                report.failures.len().to_string().red()
            );
        }
        println!("{}", "-".repeat(width + 10));

        let total = report.processed();
        let noun = if total == 1 { "entry" } else { "entries" };
        if report.dry_run {
            Self::dry_run_notice(&format!("{} {} would be moved. Nothing was changed.", total, noun));
        } else if report.failures.is_empty() {
            Self::success(&format!("{} {} organized", total, noun));
        } else {
            Self::warning(&format!(
                "{} {} organized, {} failed. See the log for details.",
                total,
                noun,
                report.failures.len()
            ));
            for failure in &report.failures {
                Self::error(&format!("{}: {}", failure.entry.display(), failure.error));
            }
        }
    }
}
