//! Doctor command - verify system requirements and configuration.

use crate::cli::Output;
use crate::config::{Settings, VectorStoreProvider};
use crate::openai::API_KEY_VARS;
use console::style;
use std::process::Command;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostic checks.
pub fn run_doctor(settings: &Settings) -> anyhow::Result<()> {
    Output::header("Amplon Doctor");
    println!();

    let mut checks = Vec::new();

    let sections: [(&str, Vec<CheckResult>); 4] = [
        ("External Tools", vec![check_tool("yt-dlp", install_hint_ytdlp())]),
        ("API Configuration", vec![check_api_key(api_key_from_vars())]),
        ("Storage", check_storage(settings)),
        ("Configuration", vec![check_config_file()]),
    ];

    for (title, results) in sections {
        println!("{}", style(title).bold());
        for check in &results {
            check.print();
        }
        println!();
        checks.extend(results);
    }

    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!("{} error(s) found.", errors));
        anyhow::bail!("{} doctor check(s) failed", errors);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed.");
    }

    Ok(())
}

/// Check if an external tool is available.
fn check_tool(name: &str, hint: &str) -> CheckResult {
    match Command::new(name).arg("--version").output() {
        Ok(output) if output.status.success() => {
            let version = String::from_utf8_lossy(&output.stdout)
                .lines()
                .next()
                .unwrap_or("installed")
                .trim()
                .to_string();
            CheckResult::ok(name, &version)
        }
        Ok(_) => CheckResult::error(name, "installed but not working", hint),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            CheckResult::error(name, "not found", hint)
        }
        Err(e) => CheckResult::error(name, &format!("error: {}", e), hint),
    }
}

fn api_key_from_vars() -> Option<(&'static str, String)> {
    API_KEY_VARS
        .iter()
        .find_map(|var| std::env::var(var).ok().map(|key| (*var, key)))
}

/// Check that an OpenAI API key is configured.
fn check_api_key(found: Option<(&str, String)>) -> CheckResult {
    let hint = "Set OPENAI_API_KEY in the environment or a .env file";

    match found {
        Some((var, key)) if key.starts_with("sk-") && key.len() > 20 => {
            let masked = format!("{}...{}", &key[..7], &key[key.len() - 4..]);
            CheckResult::ok(var, &format!("configured ({})", masked))
        }
        Some((var, key)) if key.trim().is_empty() => CheckResult::error(var, "empty", hint),
        Some((var, _)) => CheckResult::warning(
            var,
            "set but format looks unusual",
            "Expected format: sk-... (OpenAI API key)",
        ),
        None => CheckResult::error("OPENAI_API_KEY", "not set", hint),
    }
}

/// Check database and upload locations.
fn check_storage(settings: &Settings) -> Vec<CheckResult> {
    let mut results = Vec::new();

    if settings.vector_store.provider == VectorStoreProvider::Memory {
        results.push(CheckResult::warning(
            "Vector store",
            "in-memory",
            "Indexed chunks are lost when the process exits",
        ));
    } else {
        let db_path = settings.sqlite_path();
        if db_path.exists() {
            let size = std::fs::metadata(&db_path)
                .map(|m| format_size(m.len()))
                .unwrap_or_else(|_| "unknown size".to_string());
            results.push(CheckResult::ok(
                "Database",
                &format!("{} ({})", db_path.display(), size),
            ));
        } else {
            results.push(CheckResult::warning(
                "Database",
                &format!("{} (not created yet)", db_path.display()),
                "Run: amplon ingest defaults",
            ));
        }
    }

    let upload_dir = settings.upload_dir();
    if upload_dir.exists() {
        results.push(CheckResult::ok("PDF directory", &upload_dir.display().to_string()));
    } else {
        results.push(CheckResult::warning(
            "PDF directory",
            &format!("{} (will be created)", upload_dir.display()),
            "Created on first PDF ingestion",
        ));
    }

    results
}

/// Check if config file exists.
fn check_config_file() -> CheckResult {
    let config_path = Settings::default_config_path();
    if config_path.exists() {
        CheckResult::ok("Config file", &format!("{}", config_path.display()))
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults",
            "Create with: amplon config init",
        )
    }
}

/// Format file size in human-readable format.
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Platform-specific install hint for yt-dlp.
fn install_hint_ytdlp() -> &'static str {
    if cfg!(target_os = "macos") {
        "Install with: brew install yt-dlp"
    } else if cfg!(target_os = "linux") {
        "Install with: pip install yt-dlp (or your package manager)"
    } else {
        "Install from: https://github.com/yt-dlp/yt-dlp"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_key_checks() {
        let ok = check_api_key(Some(("OPEN_AI_KEY", "sk-abcdefghijklmnopqrstuvwxyz".to_string())));
        assert_eq!(ok.status, CheckStatus::Ok);
        assert_eq!(ok.name, "OPEN_AI_KEY");
        assert!(ok.message.contains("sk-abcd...wxyz"));

        assert_eq!(check_api_key(None).status, CheckStatus::Error);
        assert_eq!(
            check_api_key(Some(("OPENAI_API_KEY", " ".to_string()))).status,
            CheckStatus::Error
        );
        assert_eq!(
            check_api_key(Some(("OPENAI_API_KEY", "token".to_string()))).status,
            CheckStatus::Warning
        );
    }

    #[test]
    fn test_memory_store_warns() {
        let mut settings = Settings::default();
        settings.vector_store.provider = VectorStoreProvider::Memory;
        let results = check_storage(&settings);
        assert_eq!(results[0].status, CheckStatus::Warning);
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(500), "500 B");
        assert_eq!(format_size(1024), "1.0 KB");
        assert_eq!(format_size(1024 * 1024), "1.0 MB");
        assert_eq!(format_size(1024 * 1024 * 1024), "1.0 GB");
    }
}
