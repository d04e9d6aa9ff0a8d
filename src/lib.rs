//! Amplon - semantic search over YouTube transcripts and PDFs
//!
//! Amplon indexes caption lines and PDF pages as OpenAI embeddings and
//! answers natural-language queries with deep links: a watch URL that
//! starts at the matching second, or a PDF URL that opens at the matching
//! page.
//!
//! # Architecture
//!
//! - `config` - Configuration management
//! - `ingest` - Transcript fetching, PDF extraction and indexing
//! - `embedding` - Embedding generation
//! - `vector_store` - Vector database abstraction
//! - `dedup` - Proximity deduplication of ranked hits
//! - `search` - Query embedding, ranking and link building
//! - `server` - HTTP API
//! - `context` - Wiring of the above for commands and handlers
//!
//! # Example
//!
//! ```rust,no_run
//! use amplon::config::Settings;
//! use amplon::context::AppContext;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let ctx = AppContext::from_settings(Settings::load()?)?;
//!
//!     ctx.ingestor().ingest_video("NLg7Wa6HmYI").await?;
//!     for hit in ctx.search().search_videos("what is a vector database", 3).await? {
//!         println!("{} -> {}", hit.text, hit.link);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod context;
pub mod dedup;
pub mod embedding;
pub mod error;
pub mod ingest;
pub mod openai;
pub mod search;
pub mod server;
pub mod vector_store;

pub use error::{AmplonError, Result};
