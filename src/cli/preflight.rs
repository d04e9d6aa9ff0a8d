//! Pre-flight checks before expensive operations.
//!
//! Validates that required tools and configuration are available
//! before starting operations that would otherwise fail midway.

use crate::error::{AmplonError, Result};
use crate::openai::api_key_from_env;
use std::process::Command;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Video ingestion needs yt-dlp and an API key.
    IngestVideo,
    /// PDF ingestion needs an API key.
    IngestPdf,
    /// Queries are embedded, so search needs an API key.
    Search,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation) -> Result<()> {
    match operation {
        Operation::IngestVideo => {
            check_api_key()?;
            check_tool("yt-dlp")?;
        }
        Operation::IngestPdf | Operation::Search => {
            check_api_key()?;
        }
    }
    Ok(())
}

/// Check if an OpenAI API key is configured.
fn check_api_key() -> Result<()> {
    match api_key_from_env() {
        Some(_) => Ok(()),
        None => Err(AmplonError::Config(
            "OPENAI_API_KEY not set. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
    }
}

/// Check if an external tool is available.
fn check_tool(name: &str) -> Result<()> {
    match Command::new(name).arg("--version").output() {
        Ok(output) if output.status.success() => Ok(()),
        Ok(_) => Err(AmplonError::ToolNotFound(format!(
            "{} is installed but not working correctly",
            name
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(AmplonError::ToolNotFound(name.to_string()))
        }
        Err(e) => Err(AmplonError::ToolNotFound(format!("{}: {}", name, e))),
    }
}
