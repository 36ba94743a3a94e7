//! Terminal output for the command-line front end.
//!
//! Colored status lines, a progress bar fed by polling events, and a few
//! formatting helpers.

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use std::io::IsTerminal;
use std::time::Duration;

use crate::drive::ImportWarning;
use crate::models::{ExhibitKind, PackageStatus};
use crate::pipeline::ProgressEvent;

/// Check if stdout is a terminal.
pub fn is_terminal() -> bool {
    std::io::stdout().is_terminal()
}

/// Status types for colored output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Error,
    Warning,
    Info,
}

pub fn status_icon(status: Status) -> &'static str {
    match status {
        Status::Success => "✓",
        Status::Error => "✗",
        Status::Warning => "⚠",
        Status::Info => "ℹ",
    }
}

/// Print a styled status message.
pub fn print_status(status: Status, msg: &str) {
    let icon = status_icon(status);
    match status {
        Status::Success => println!("{} {}", icon.green().bold(), msg),
        Status::Error => eprintln!("{} {}", icon.red().bold(), msg),
        Status::Warning => eprintln!("{} {}", icon.yellow().bold(), msg),
        Status::Info => println!("{} {}", icon.cyan().bold(), msg),
    }
}

/// Print a partial import failure the way the picker reports it
pub fn print_import_warning(warning: &ImportWarning) {
    print_status(Status::Warning, &warning.to_string());
}

/// Print a section header.
pub fn print_section(title: &str) {
    println!();
    println!("{}", format!("━━━ {} ━━━", title).bold().cyan());
}

/// Icon shown next to an exhibit
pub fn kind_icon(kind: ExhibitKind) -> &'static str {
    match kind {
        ExhibitKind::Pdf => "📄",
        ExhibitKind::Image => "🖼",
        ExhibitKind::Url => "🔗",
    }
}

/// Colored package status
pub fn styled_status(status: PackageStatus) -> String {
    let text = status.as_str();
    match status {
        PackageStatus::Completed => text.green().bold().to_string(),
        PackageStatus::Failed => text.red().bold().to_string(),
        PackageStatus::TimedOut => text.yellow().bold().to_string(),
        PackageStatus::Processing | PackageStatus::Submitted => text.cyan().to_string(),
        PackageStatus::Draft => text.dimmed().to_string(),
    }
}

/// Get a human-readable file size.
pub fn format_file_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Spinner for short network calls
pub struct Spinner {
    pb: ProgressBar,
}

impl Spinner {
    pub fn new(msg: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ "),
        );
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));

        Self { pb }
    }

    pub fn finish_with_success(&self, msg: &str) {
        self.pb
            .finish_with_message(format!("{} {}", "✓".green().bold(), msg));
    }

    pub fn finish_with_error(&self, msg: &str) {
        self.pb
            .finish_with_message(format!("{} {}", "✗".red().bold(), msg));
    }
}

/// Percent bar driven by [`ProgressEvent`]s; new log lines print above it
#[derive(Clone)]
pub struct GenerationProgress {
    pb: ProgressBar,
    show_logs: bool,
}

impl GenerationProgress {
    pub fn new(show_logs: bool) -> Self {
        let pb = if is_terminal() {
            ProgressBar::new(100)
        } else {
            ProgressBar::hidden()
        };
        pb.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} [{elapsed_precise}] {bar:40.cyan/blue} {pos:>3}% {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓▒░ "),
        );
        pb.enable_steady_tick(Duration::from_millis(120));
        pb.set_message("Waiting for the generation service");

        Self { pb, show_logs }
    }

    pub fn update(&self, event: &ProgressEvent) {
        self.pb.set_position(u64::from(event.progress_percent));
        if let Some(message) = &event.status_message {
            self.pb.set_message(message.clone());
        }
        if self.show_logs {
            for line in &event.new_log_lines {
                self.pb.println(format!("  {}", line.dimmed()));
            }
        }
    }

    pub fn finish(&self, status: PackageStatus) {
        self.pb
            .finish_with_message(format!("Package {}", styled_status(status)));
    }

    pub fn abandon(&self, msg: &str) {
        self.pb.abandon_with_message(msg.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_icon() {
        assert_eq!(status_icon(Status::Success), "✓");
        assert_eq!(status_icon(Status::Error), "✗");
        assert_eq!(status_icon(Status::Warning), "⚠");
    }

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(500), "500 B");
        assert_eq!(format_file_size(1024), "1.00 KB");
        assert_eq!(format_file_size(1048576), "1.00 MB");
    }

    #[test]
    fn test_progress_accepts_events() {
        let progress = GenerationProgress::new(false);
        progress.update(&ProgressEvent {
            package_id: "p1".to_string(),
            attempt: 1,
            progress_percent: 42,
            status_message: Some("Merging".to_string()),
            new_log_lines: vec!["merged A".to_string()],
        });
        progress.finish(PackageStatus::Completed);
    }
}
