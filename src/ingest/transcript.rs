//! Video transcript retrieval.
//!
//! Captions are fetched with `yt-dlp` in YouTube's `json3` timed-text format,
//! preferring uploaded subtitles and falling back to automatic captions.

use crate::error::{AmplonError, Result};
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::OnceLock;
use tokio::process::Command;
use tracing::{debug, info, instrument};

/// One timed caption line.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptSegment {
    /// Start time in seconds.
    pub start_seconds: f64,
    /// Display duration in seconds.
    pub duration_seconds: f64,
    pub text: String,
}

impl TranscriptSegment {
    pub fn new(start_seconds: f64, duration_seconds: f64, text: impl Into<String>) -> Self {
        Self {
            start_seconds,
            duration_seconds,
            text: text.into(),
        }
    }
}

/// Source of ordered transcript segments for a video.
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    async fn fetch(&self, video_id: &str) -> Result<Vec<TranscriptSegment>>;
}

/// Extract an 11-character video ID from a watch/short/embed URL or a bare ID.
pub fn parse_video_id(input: &str) -> Option<String> {
    static VIDEO_ID: OnceLock<Regex> = OnceLock::new();
    let regex = VIDEO_ID.get_or_init(|| {
        Regex::new(
            r"(?x)
            ^(?:https?://)?
            (?:www\.|m\.)?
            (?:youtube\.com/watch\?(?:[^\s&]*&)*v=|youtu\.be/|youtube\.com/embed/|youtube\.com/shorts/|youtube\.com/v/)
            ([a-zA-Z0-9_-]{11})
            (?:[^a-zA-Z0-9_-].*)?$
            |
            ^([a-zA-Z0-9_-]{11})$
        ",
        )
        .expect("video id regex is valid")
    });

    let caps = regex.captures(input.trim())?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str().to_string())
}

/// Collapse segments into one text per whole second of start time.
///
/// Lines that start within the same second share a position, so they are
/// joined to keep chunk IDs unique. Blank lines are dropped.
pub fn group_by_second(segments: &[TranscriptSegment]) -> Vec<(i64, String)> {
    let mut grouped: Vec<(i64, String)> = Vec::new();
    let mut index: HashMap<i64, usize> = HashMap::new();

    for segment in segments {
        let text = segment.text.split_whitespace().collect::<Vec<_>>().join(" ");
        if text.is_empty() {
            continue;
        }

        let second = segment.start_seconds.max(0.0).trunc() as i64;
        match index.get(&second) {
            Some(&i) => {
                let entry = &mut grouped[i].1;
                entry.push(' ');
                entry.push_str(&text);
            }
            None => {
                index.insert(second, grouped.len());
                grouped.push((second, text));
            }
        }
    }

    grouped
}

#[derive(Debug, Deserialize)]
struct TimedText {
    #[serde(default)]
    events: Vec<TimedTextEvent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TimedTextEvent {
    #[serde(default)]
    t_start_ms: u64,
    #[serde(default)]
    d_duration_ms: u64,
    #[serde(default)]
    segs: Vec<TimedTextSeg>,
}

#[derive(Debug, Deserialize)]
struct TimedTextSeg {
    #[serde(default)]
    utf8: String,
}

/// Parse a `json3` timed-text document into segments.
pub fn parse_json3(raw: &str) -> Result<Vec<TranscriptSegment>> {
    let doc: TimedText = serde_json::from_str(raw)
        .map_err(|e| AmplonError::Transcript(format!("Malformed json3 captions: {}", e)))?;

    Ok(doc
        .events
        .into_iter()
        .filter_map(|event| {
            let text: String = event.segs.iter().map(|s| s.utf8.as_str()).collect();
            let text = text.replace('\n', " ").trim().to_string();
            if text.is_empty() {
                return None;
            }
            Some(TranscriptSegment::new(
                event.t_start_ms as f64 / 1000.0,
                event.d_duration_ms as f64 / 1000.0,
                text,
            ))
        })
        .collect())
}

/// Transcript source backed by the `yt-dlp` executable.
pub struct YtDlpTranscriptSource {
    language: String,
    temp_dir: PathBuf,
}

impl YtDlpTranscriptSource {
    pub fn new(language: impl Into<String>, temp_dir: impl Into<PathBuf>) -> Self {
        Self {
            language: language.into(),
            temp_dir: temp_dir.into(),
        }
    }

    /// Locate the caption file yt-dlp wrote, e.g. `<id>.en.json3`.
    fn find_caption_file(dir: &Path, video_id: &str) -> Result<PathBuf> {
        let entries = std::fs::read_dir(dir)?;

        for entry in entries.flatten() {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with(video_id) && name.ends_with(".json3") {
                return Ok(entry.path());
            }
        }

        Err(AmplonError::Transcript(format!(
            "No captions available for video {}",
            video_id
        )))
    }
}

#[async_trait]
impl TranscriptSource for YtDlpTranscriptSource {
    #[instrument(skip(self))]
    async fn fetch(&self, video_id: &str) -> Result<Vec<TranscriptSegment>> {
        std::fs::create_dir_all(&self.temp_dir)?;
        let work_dir = tempfile::Builder::new()
            .prefix("captions-")
            .tempdir_in(&self.temp_dir)?;

        let url = format!("https://www.youtube.com/watch?v={}", video_id);
        let template = work_dir.path().join(format!("{}.%(ext)s", video_id));

        info!("Fetching captions for {}", video_id);

        let result = Command::new("yt-dlp")
            .arg("--skip-download")
            .arg("--write-subs")
            .arg("--write-auto-subs")
            .arg("--sub-langs").arg(&self.language)
            .arg("--sub-format").arg("json3")
            .arg("--output").arg(&template)
            .arg("--no-playlist")
            .arg("--quiet")
            .arg("--no-warnings")
            .arg(&url)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await;

        let output = match result {
            Ok(o) => o,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AmplonError::ToolNotFound("yt-dlp".into()));
            }
            Err(e) => {
                return Err(AmplonError::ToolFailed(format!("yt-dlp execution failed: {e}")));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AmplonError::Transcript(format!(
                "yt-dlp could not fetch captions for {}: {}",
                video_id,
                stderr.trim()
            )));
        }

        let caption_path = Self::find_caption_file(work_dir.path(), video_id)?;
        let raw = tokio::fs::read_to_string(&caption_path).await?;
        let segments = parse_json3(&raw)?;

        debug!("Parsed {} caption segments", segments.len());
        Ok(segments)
    }
}
