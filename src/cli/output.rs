//! CLI output formatting utilities.

use chrono::{DateTime, Utc};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print an indexed source.
    pub fn source_info(source_id: &str, chunks: u32, unit: &str, indexed_at: &DateTime<Utc>) {
        println!(
            "  {} {} ({} {}, indexed {})",
            style("*").cyan(),
            style(source_id).bold(),
            chunks,
            unit,
            style(indexed_at.format("%Y-%m-%d %H:%M")).dim()
        );
    }

    /// Print search result.
    pub fn search_result(source: &str, location: &str, content: Option<&str>, link: &str) {
        println!(
            "\n{} {} @ {}",
            style(">>").green(),
            style(source).bold(),
            style(location).cyan()
        );
        if let Some(content) = content {
            println!("   {}", content_preview(content, 200));
        }
        println!("   {}", style(link).dim());
    }

    /// Create a progress bar.
    pub fn progress_bar(len: u64, msg: &str) -> ProgressBar {
        let pb = ProgressBar::new(len);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb.set_message(msg.to_string());
        pb
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

/// Format seconds as `h:mm:ss` or `m:ss`.
pub fn format_timestamp(seconds: i64) -> String {
    let total = seconds.max(0);
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}

/// Truncate content with ellipsis.
fn content_preview(content: &str, max_len: usize) -> String {
    let content = content.replace('\n', " ");
    if content.len() <= max_len {
        return content;
    }

    let mut end = max_len;
    while !content.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &content[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0), "0:00");
        assert_eq!(format_timestamp(75), "1:15");
        assert_eq!(format_timestamp(3723), "1:02:03");
    }

    #[test]
    fn test_content_preview_respects_char_boundaries() {
        assert_eq!(content_preview("short\ntext", 20), "short text");
        assert_eq!(content_preview("ééé", 3), "é...");
    }
}
