//! Configuration settings for Amplon.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub embedding: EmbeddingSettings,
    pub vector_store: VectorStoreSettings,
    pub search: SearchSettings,
    pub links: LinkSettings,
    pub ingest: IngestSettings,
    pub server: ServerSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Directory for temporary files.
    pub temp_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.amplon".to_string(),
            temp_dir: "/tmp/amplon".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding model to use.
    pub model: String,
    /// Embedding dimensions.
    pub dimensions: u32,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
        }
    }
}

/// Vector store backend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VectorStoreProvider {
    /// Persistent SQLite database.
    #[default]
    Sqlite,
    /// Process-local store, lost on exit.
    Memory,
}

impl std::fmt::Display for VectorStoreProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VectorStoreProvider::Sqlite => write!(f, "sqlite"),
            VectorStoreProvider::Memory => write!(f, "memory"),
        }
    }
}

/// Vector store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorStoreSettings {
    /// Vector store provider (sqlite, memory).
    pub provider: VectorStoreProvider,
    /// Path to SQLite database (for sqlite provider).
    pub sqlite_path: String,
    /// Collection holding transcript chunks.
    pub video_collection: String,
    /// Collection holding PDF page chunks.
    pub document_collection: String,
}

impl Default for VectorStoreSettings {
    fn default() -> Self {
        Self {
            provider: VectorStoreProvider::Sqlite,
            sqlite_path: "~/.amplon/vectors.db".to_string(),
            video_collection: "youtube_chunks".to_string(),
            document_collection: "pdf_chunks".to_string(),
        }
    }
}

/// Search behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Number of results requested when `top_k` is omitted.
    pub default_top_k: usize,
    /// Largest accepted `top_k`.
    pub max_top_k: usize,
    /// Minimum distance in seconds between two hits from the same video.
    pub proximity_threshold: u32,
    /// Minimum distance in pages between two hits from the same PDF.
    /// Zero only drops repeats of the exact same page.
    pub document_proximity_threshold: u32,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            default_top_k: 3,
            max_top_k: 50,
            proximity_threshold: 10,
            document_proximity_threshold: 0,
        }
    }
}

/// Base URLs used to build deep links.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkSettings {
    /// Video watch page; `?v=<id>&t=<secs>s` is appended.
    pub video_watch_url: String,
    /// Where PDFs are served from; `/<filename>#page=<n>` is appended.
    pub document_base_url: String,
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self {
            video_watch_url: "https://www.youtube.com/watch".to_string(),
            document_base_url: "http://localhost:8000/pdfs".to_string(),
        }
    }
}

/// Ingestion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestSettings {
    /// Videos ingested by `amplon ingest defaults`.
    pub video_ids: Vec<String>,
    /// PDF URLs ingested by `amplon ingest defaults`.
    pub pdf_urls: Vec<String>,
    /// Directory where ingested PDFs are kept and served from.
    pub upload_dir: String,
    /// Caption language requested from yt-dlp.
    pub subtitle_language: String,
    /// Attempts per source before giving up.
    pub max_attempts: u32,
    /// Delay before retry N is N times this value.
    pub retry_backoff_ms: u64,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            video_ids: vec!["NLg7Wa6HmYI".to_string()],
            pdf_urls: Vec::new(),
            upload_dir: "~/.amplon/pdfs".to_string(),
            subtitle_language: "en".to_string(),
            max_attempts: 3,
            retry_backoff_ms: 1000,
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Host to bind to.
    pub host: String,
    /// Port to bind to.
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::AmplonError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("amplon")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded temp directory path.
    pub fn temp_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.temp_dir)
    }

    /// Get the expanded SQLite database path.
    pub fn sqlite_path(&self) -> PathBuf {
        Self::expand_path(&self.vector_store.sqlite_path)
    }

    /// Get the expanded PDF upload directory.
    pub fn upload_dir(&self) -> PathBuf {
        Self::expand_path(&self.ingest.upload_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.search.default_top_k, 3);
        assert_eq!(settings.search.proximity_threshold, 10);
        assert_eq!(settings.vector_store.video_collection, "youtube_chunks");
        assert_eq!(settings.ingest.video_ids, vec!["NLg7Wa6HmYI".to_string()]);
        assert_eq!(settings.server.port, 8000);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [search]
            proximity_threshold = 30

            [vector_store]
            provider = "memory"
            "#,
        )
        .unwrap();

        assert_eq!(settings.search.proximity_threshold, 30);
        assert_eq!(settings.search.default_top_k, 3);
        assert_eq!(settings.vector_store.provider, VectorStoreProvider::Memory);
        assert_eq!(settings.vector_store.document_collection, "pdf_chunks");
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut settings = Settings::default();
        settings.links.document_base_url = "https://docs.example.com/files".to_string();
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(loaded.links.document_base_url, "https://docs.example.com/files");
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let loaded = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(loaded.server.host, "127.0.0.1");
    }
}
