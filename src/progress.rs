//! Terminal output: colors, download progress and status lines.
//!
//! All human-facing output goes to stderr so stdout stays machine-readable
//! for the enclosing build script.

use colored::{Colorize, control};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::io::IsTerminal;

/// Configure colors from `NO_COLOR`, `CLICOLOR_FORCE`, `CLICOLOR` and TTY status
pub fn init_colors() {
    // NO_COLOR takes precedence over everything (https://no-color.org/)
    if std::env::var_os("NO_COLOR").is_some() {
        control::set_override(false);
        return;
    }

    if std::env::var("CLICOLOR_FORCE")
        .map(|v| v != "0")
        .unwrap_or(false)
    {
        control::set_override(true);
        return;
    }

    if std::env::var("CLICOLOR").map(|v| v == "0").unwrap_or(false) {
        control::set_override(false);
        return;
    }

    control::set_override(std::io::stderr().is_terminal());
}

/// Byte progress bar for one download; hidden when stderr is not a terminal
pub fn download_bar(name: &str, total: Option<u64>) -> ProgressBar {
    if !std::io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::with_draw_target(total, ProgressDrawTarget::stderr());
    let style = ProgressStyle::default_bar()
        .template("{msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    pb.set_style(style);
    pb.set_message(format!("⬇ {}", name));
    pb
}

pub fn success(message: &str) {
    eprintln!("{} {}", "✓".green(), message);
}

pub fn failure(message: &str) {
    eprintln!("{} {}", "✗".red(), message.bold());
}

/// Human-readable byte count
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}
