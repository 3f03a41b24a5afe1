//! Find in page, copying and saving to the downloads directory.

use crate::DocumentSession;
use gd_core::BrowserError;
use gd_core::BrowserResult;
use gd_ipc::SessionEvent;
use gd_net::GemUrl;
use gd_net::mime::extension_for;
use gd_net::url::absolute_url;
use gd_storage::download_file_name;
use gd_storage::save_to_downloads;
use std::ops::Range;
use std::path::PathBuf;

/// First case-insensitive match of `needle` at or after byte `from`.
pub(crate) fn find_text(haystack: &str, needle: &str, from: usize) -> Option<Range<usize>> {
    if needle.is_empty() {
        return None;
    }
    let lower = haystack.to_ascii_lowercase();
    let needle = needle.to_ascii_lowercase();
    let start = from + lower.get(from..)?.find(&needle)?;
    Some(start..start + needle.len())
}

/// Last case-insensitive match of `needle` ending at or before byte `until`.
pub(crate) fn find_text_before(haystack: &str, needle: &str, until: usize) -> Option<Range<usize>> {
    if needle.is_empty() {
        return None;
    }
    let lower = haystack.to_ascii_lowercase();
    let needle = needle.to_ascii_lowercase();
    let start = lower.get(..until)?.rfind(&needle)?;
    Some(start..start + needle.len())
}

impl DocumentSession {
    /// Marks the next occurrence of `needle`, wrapping around once.
    pub fn find_next(&mut self, needle: &str) -> bool {
        self.find(needle, true)
    }

    /// Marks the previous occurrence of `needle`, wrapping around once.
    pub fn find_prev(&mut self, needle: &str) -> bool {
        self.find(needle, false)
    }

    fn find(&mut self, needle: &str, forward: bool) -> bool {
        let previous = self.found_mark.take();
        if let Some(range) = previous.clone() {
            self.invalidate_source_range(range);
        }
        let source = self.doc.source();
        let search = |mark: Option<&Range<usize>>| {
            if forward {
                find_text(source, needle, mark.map_or(0, |range| range.end))
            } else {
                find_text_before(source, needle, mark.map_or(source.len(), |range| range.start))
            }
        };
        let mut found = search(previous.as_ref());
        if found.is_none() && previous.is_some() {
            found = search(None);
        }

        if let Some(range) = found.clone() {
            tracing::debug!(start = range.start, end = range.end, forward, "text found");
            let mid = self
                .doc
                .find_run_at_source(range.start)
                .and_then(|handle| self.doc.run(handle))
                .map(|run| run.bounds.mid().y);
            self.found_mark = Some(range.clone());
            if let Some(mid) = mid {
                self.scroll_to(mid, true);
            }
            self.invalidate_source_range(range);
        }
        // Marks are drawn unshifted.
        self.reset_wide_runs();
        found.is_some()
    }

    pub fn clear_find_mark(&mut self) {
        if let Some(range) = self.found_mark.take() {
            self.invalidate_source_range(range);
        }
    }

    /// Selected text, or the whole source when nothing is selected.
    pub fn copy_text(&self) -> String {
        let source = self.doc.source();
        self.selection()
            .and_then(|range| source.get(range))
            .unwrap_or(source)
            .to_owned()
    }

    /// URL of the context link, or of the page itself.
    pub fn copy_link_url(&self) -> String {
        let url = self
            .context_link()
            .and_then(|link| self.doc.link_url(link))
            .map_or_else(
                || self.persisted.url.clone(),
                |target| absolute_url(&self.persisted.url, target),
            );
        url.replace(' ', "%20")
    }

    /// Writes the page source to the downloads directory.
    pub fn save_page(&mut self) -> BrowserResult<PathBuf> {
        if self.request.is_some() {
            self.emit(SessionEvent::Message {
                title: "PAGE INCOMPLETE".to_owned(),
                text: "The page contents are still being downloaded.".to_owned(),
            });
            return Err(BrowserError::new(
                "session.page_incomplete",
                format!("`{}` is still loading", self.persisted.url),
            ));
        }
        if self.source_content.is_empty() {
            return Err(BrowserError::new(
                "session.nothing_to_save",
                format!("`{}` has no content to save", self.persisted.url),
            ));
        }
        let basename = GemUrl::parse(&self.persisted.url)
            .ok()
            .and_then(|url| url.basename())
            .unwrap_or_default();
        let name = download_file_name(&basename, Some(extension_for(&self.source_mime)));
        self.save_bytes(&name, &self.source_content)
    }

    pub(crate) fn save_bytes(&self, name: &str, bytes: &[u8]) -> BrowserResult<PathBuf> {
        match save_to_downloads(&self.config.downloads_dir, name, bytes) {
            Ok(path) => {
                self.emit(SessionEvent::Message {
                    title: "FILE SAVED".to_owned(),
                    text: format!(
                        "{}\nSize: {:.3} MB",
                        path.display(),
                        bytes.len() as f64 / 1.0e6
                    ),
                });
                Ok(path)
            }
            Err(error) => {
                tracing::warn!(%error, name, "saving failed");
                self.emit(SessionEvent::Message {
                    title: "ERROR SAVING FILE".to_owned(),
                    text: error.message.clone(),
                });
                Err(error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::find_text;
    use super::find_text_before;

    #[test]
    fn search_ignores_ascii_case() {
        let text = "Alpha beta ALPHA gamma";
        assert_eq!(find_text(text, "alpha", 0), Some(0..5));
        assert_eq!(find_text(text, "alpha", 5), Some(11..16));
        assert_eq!(find_text(text, "alpha", 16), None);
        assert_eq!(find_text(text, "", 0), None);
    }

    #[test]
    fn backwards_search_stops_before_the_mark() {
        let text = "one two one two";
        assert_eq!(find_text_before(text, "two", text.len()), Some(12..15));
        assert_eq!(find_text_before(text, "two", 12), Some(4..7));
        assert_eq!(find_text_before(text, "two", 4), None);
    }

    #[test]
    fn offsets_survive_multibyte_text() {
        let text = "Grüße und Grüße";
        assert_eq!(find_text(text, "GRÜSSE", 0), None);
        assert_eq!(find_text(text, "grüße", 1), Some(12..19));
        assert_eq!(find_text(text, "und", 0), Some(8..11));
    }
}
