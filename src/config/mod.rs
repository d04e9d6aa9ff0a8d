//! Configuration module for Amplon.
//!
//! Handles loading and saving application settings.

mod settings;

pub use settings::{
    EmbeddingSettings, GeneralSettings, IngestSettings, LinkSettings, SearchSettings,
    ServerSettings, Settings, VectorStoreProvider, VectorStoreSettings,
};
