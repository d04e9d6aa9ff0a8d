//! Deep links back to the source of a hit.

use crate::config::LinkSettings;
use url::Url;

/// Builds timestamped video links and page-anchored document links.
#[derive(Debug, Clone)]
pub struct LinkBuilder {
    video_watch_url: String,
    document_base_url: String,
}

impl LinkBuilder {
    pub fn new(video_watch_url: impl Into<String>, document_base_url: impl Into<String>) -> Self {
        Self {
            video_watch_url: video_watch_url.into(),
            document_base_url: document_base_url.into(),
        }
    }

    pub fn from_settings(settings: &LinkSettings) -> Self {
        Self::new(&settings.video_watch_url, &settings.document_base_url)
    }

    /// `<watch-url>?v=<id>&t=<secs>s`
    pub fn video(&self, video_id: &str, start_seconds: i64) -> String {
        format!("{}?v={}&t={}s", self.video_watch_url, video_id, start_seconds)
    }

    /// `<base-url>/<filename>#page=<n>`, with the filename percent-encoded.
    pub fn document(&self, filename: &str, page: i64) -> String {
        match Url::parse(&self.document_base_url) {
            Ok(mut url) if !url.cannot_be_a_base() => {
                if let Ok(mut segments) = url.path_segments_mut() {
                    segments.pop_if_empty().push(filename);
                }
                url.set_fragment(Some(&format!("page={}", page)));
                url.to_string()
            }
            // Relative bases such as "/pdfs" are not URLs on their own
            _ => format!(
                "{}/{}#page={}",
                self.document_base_url.trim_end_matches('/'),
                filename,
                page
            ),
        }
    }
}

impl Default for LinkBuilder {
    fn default() -> Self {
        Self::from_settings(&LinkSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_link() {
        let links = LinkBuilder::default();
        assert_eq!(
            links.video("NLg7Wa6HmYI", 95),
            "https://www.youtube.com/watch?v=NLg7Wa6HmYI&t=95s"
        );
    }

    #[test]
    fn test_document_link() {
        let links = LinkBuilder::default();
        assert_eq!(
            links.document("manual.pdf", 3),
            "http://localhost:8000/pdfs/manual.pdf#page=3"
        );
    }

    #[test]
    fn test_document_link_trailing_slash_and_spaces() {
        let links = LinkBuilder::new("https://youtu.be/watch", "https://docs.example.com/files/");
        assert_eq!(
            links.document("field guide.pdf", 12),
            "https://docs.example.com/files/field%20guide.pdf#page=12"
        );
    }

    #[test]
    fn test_relative_document_base() {
        let links = LinkBuilder::new("https://www.youtube.com/watch", "/pdfs/");
        assert_eq!(links.document("a.pdf", 1), "/pdfs/a.pdf#page=1");
    }
}
