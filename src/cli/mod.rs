//! CLI module for Amplon.

pub mod commands;
mod output;
pub mod preflight;

pub use output::{format_timestamp, Output};

use clap::{Parser, Subcommand};

/// Amplon - semantic search over YouTube transcripts and PDFs
///
/// Indexes captions and PDF pages as embeddings and serves search results
/// as deep links to the exact second or page.
#[derive(Parser, Debug)]
#[command(name = "amplon")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "AMPLON_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP search API
    Serve {
        /// Host to bind to (defaults to server.host)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (defaults to server.port)
        #[arg(short, long)]
        port: Option<u16>,

        /// Ingest the configured default sources in the background
        #[arg(long)]
        ingest: bool,
    },

    /// Index a video, a PDF, or the configured defaults
    Ingest {
        #[command(subcommand)]
        target: IngestTarget,
    },

    /// Search indexed transcripts or PDFs
    Search {
        /// Search query
        query: String,

        /// Maximum number of results before deduplication
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Search PDF pages instead of video transcripts
        #[arg(long)]
        pdf: bool,
    },

    /// List indexed videos and documents
    Sources,

    /// Check system requirements and configuration
    Doctor,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum IngestTarget {
    /// Index the captions of a YouTube video
    Video {
        /// YouTube URL or video ID
        input: String,
    },

    /// Index a PDF from a local path or an http(s) URL
    Pdf {
        /// File path or URL
        input: String,
    },

    /// Index every source listed under [ingest] in the config
    Defaults,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write the current configuration to the config file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_serve_overrides() {
        let cli = Cli::parse_from(["amplon", "serve", "--port", "9000", "--ingest"]);
        match cli.command {
            Commands::Serve { host, port, ingest } => {
                assert_eq!(host, None);
                assert_eq!(port, Some(9000));
                assert!(ingest);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_pdf_search() {
        let cli = Cli::parse_from(["amplon", "-v", "search", "vector clocks", "-k", "5", "--pdf"]);
        assert_eq!(cli.verbose, 1);
        match cli.command {
            Commands::Search { query, top_k, pdf } => {
                assert_eq!(query, "vector clocks");
                assert_eq!(top_k, Some(5));
                assert!(pdf);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_ingest_video() {
        let cli = Cli::parse_from(["amplon", "ingest", "video", "NLg7Wa6HmYI"]);
        assert!(matches!(
            cli.command,
            Commands::Ingest { target: IngestTarget::Video { ref input } } if input == "NLg7Wa6HmYI"
        ));
    }
}
