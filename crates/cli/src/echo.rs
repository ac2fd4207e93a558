use std::time::Duration;

use gleaner_core::{ExtractionMethod, PageSummary};
use owo_colors::OwoColorize;

use crate::VERSION;

/// Print a styled banner for verbose mode
pub fn print_banner() {
    eprintln!("\n{} {} {}", "Gleaner".bold().bright_blue(), "v".dimmed(), VERSION.dimmed());
    eprintln!("{}", "Extract listing records from web pages\n".dimmed());
}

/// Print a styled step message
pub fn print_step(step: usize, total: usize, message: &str) {
    eprintln!("{} {}", format!("[{}/{}]", step, total).dimmed(), message.bright_cyan());
}

/// Print a success message
pub fn print_success(message: &str) {
    eprintln!("{} {}", "✓".green(), message.bright_green());
}

/// Print an info message
pub fn print_info(message: &str) {
    eprintln!("{} {}", "ℹ".blue(), message.bright_blue());
}

/// Print one labelled value
pub fn print_field(label: &str, value: &str) {
    eprintln!("  {} {}", format!("{label}:").dimmed(), value.bright_white());
}

/// Print the outcome of one page, confidence colored against its threshold
pub fn print_extraction_details(summary: &PageSummary) {
    let method = match &summary.method {
        ExtractionMethod::Structured { label } => format!("embedded data ({label})"),
        ExtractionMethod::Dom { selector } => format!("DOM cards ({selector})"),
        ExtractionMethod::None => "nothing found".to_string(),
    };

    print_field("Method", &method);
    print_field("Records", &summary.records.to_string());

    let percent = format!("{}%", summary.confidence.percent);
    if summary.low_confidence {
        eprintln!("  {} {}\n", "Confidence:".dimmed(), percent.bright_red());
    } else {
        eprintln!("  {} {}\n", "Confidence:".dimmed(), percent.bright_green());
    }
}

/// Print timing information with color coding
pub fn print_timing(label: &str, duration: Duration) {
    let ms = duration.as_secs_f64() * 1000.0;
    let label = format!("{}:", label);

    if ms < 50.0 {
        eprintln!("  {} {:>8.2}ms ({})", label.dimmed(), ms, "fast".dimmed());
    } else if ms < 500.0 {
        eprintln!("  {} {:>8.2}ms ({})", label.dimmed(), ms, "moderate".bright_yellow());
    } else {
        eprintln!("  {} {:>8.2}ms ({})", label.dimmed(), ms, "slow".bright_red());
    }
}

/// Print timing summary
pub fn print_timing_summary(total: Duration, timings: &[(String, Duration)]) {
    eprintln!("{}", "═".repeat(60).dimmed());
    eprintln!("{}", "Timing Summary".bold().cyan());
    eprintln!("{}", "═".repeat(60).dimmed());

    for (label, duration) in timings {
        print_timing(label, *duration);
    }

    eprintln!("  {} {:>8.2}ms\n", "Total:".bold().dimmed(), total.as_secs_f64() * 1000.0);
}

/// Format file size for display
pub fn format_size(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = 1024 * KB;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MB");
    }
}
