use crate::codec::read_string_u16;
use crate::codec::read_u16;
use crate::codec::read_u32;
use crate::codec::write_string_u16;
use crate::codec::write_u16;
use crate::codec::write_u32;
use gd_core::BrowserError;
use gd_core::BrowserResult;
use gd_net::GmResponse;

/// Oldest entries are dropped beyond this many.
pub const MAX_HISTORY_ENTRIES: usize = 256;

const NO_CURSOR: u16 = u16::MAX;

/// One visited page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecentUrl {
    pub url: String,
    /// Scroll position as a fraction of the document height.
    pub norm_scroll_y: f32,
    /// Response kept for instant back/forward; never persisted.
    pub cached_response: Option<GmResponse>,
}

impl RecentUrl {
    fn new(url: String) -> Self {
        Self {
            url,
            ..Self::default()
        }
    }
}

/// Per-tab navigation history with a cursor at the current entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct History {
    entries: Vec<RecentUrl>,
    cursor: Option<usize>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = None;
    }

    /// Makes `url` the current entry, discarding anything forward of the cursor.
    pub fn add_url(&mut self, url: &str) {
        if let Some(index) = self.cursor {
            self.entries.truncate(index.saturating_add(1));
        }

        if self.entries.last().is_some_and(|existing| existing.url == url) {
            self.cursor = Some(self.entries.len().saturating_sub(1));
            return;
        }

        self.entries.push(RecentUrl::new(url.to_owned()));
        if self.entries.len() > MAX_HISTORY_ENTRIES {
            let excess = self.entries.len() - MAX_HISTORY_ENTRIES;
            self.entries.drain(..excess);
        }
        self.cursor = Some(self.entries.len().saturating_sub(1));
    }

    pub fn can_go_back(&self) -> bool {
        matches!(self.cursor, Some(index) if index > 0)
    }

    pub fn can_go_forward(&self) -> bool {
        matches!(self.cursor, Some(index) if index + 1 < self.entries.len())
    }

    pub fn go_back(&mut self) -> Option<&RecentUrl> {
        let index = self.cursor?;
        if index == 0 {
            return None;
        }
        self.cursor = Some(index - 1);
        self.entries.get(index - 1)
    }

    pub fn go_forward(&mut self) -> Option<&RecentUrl> {
        let next = self.cursor?.checked_add(1)?;
        if next >= self.entries.len() {
            return None;
        }
        self.cursor = Some(next);
        self.entries.get(next)
    }

    pub fn most_recent(&self) -> Option<&RecentUrl> {
        self.entries.get(self.cursor?)
    }

    pub fn most_recent_mut(&mut self) -> Option<&mut RecentUrl> {
        self.entries.get_mut(self.cursor?)
    }

    /// Latest entry for `url`, searching back from the cursor first.
    pub fn find_url(&self, url: &str) -> Option<&RecentUrl> {
        let split = self.cursor.map_or(self.entries.len(), |index| index + 1);
        let (behind, ahead) = self.entries.split_at(split.min(self.entries.len()));
        behind
            .iter()
            .rev()
            .chain(ahead.iter())
            .find(|entry| entry.url == url)
    }

    /// Caches `response` on the current entry.
    pub fn set_cached_response(&mut self, response: &GmResponse) {
        if let Some(entry) = self.most_recent_mut() {
            entry.cached_response = Some(response.clone());
        }
    }

    pub fn serialize(&self) -> BrowserResult<Vec<u8>> {
        let count = u16::try_from(self.entries.len()).map_err(|_| {
            BrowserError::new("storage.history_too_large", "history has too many entries")
        })?;
        let mut out = Vec::new();
        write_u16(&mut out, count);
        for entry in &self.entries {
            write_string_u16(&mut out, &entry.url, "history.url")?;
            write_u32(&mut out, entry.norm_scroll_y.to_bits());
        }
        let cursor = self
            .cursor
            .and_then(|index| u16::try_from(index).ok())
            .unwrap_or(NO_CURSOR);
        write_u16(&mut out, cursor);
        Ok(out)
    }

    /// Reads a history blob starting at `offset`, advancing it past the blob.
    pub fn deserialize(payload: &[u8], offset: &mut usize) -> BrowserResult<Self> {
        let count = usize::from(read_u16(payload, offset, "history.count")?);
        let mut entries = Vec::with_capacity(count.min(MAX_HISTORY_ENTRIES));
        for _ in 0..count {
            let url = read_string_u16(payload, offset, "history.url")?;
            let norm_scroll_y = f32::from_bits(read_u32(payload, offset, "history.scroll")?);
            entries.push(RecentUrl {
                url,
                norm_scroll_y: if norm_scroll_y.is_finite() {
                    norm_scroll_y.clamp(0.0, 1.0)
                } else {
                    0.0
                },
                cached_response: None,
            });
        }
        let raw_cursor = read_u16(payload, offset, "history.cursor")?;
        let cursor = if raw_cursor == NO_CURSOR || entries.is_empty() {
            entries.len().checked_sub(1)
        } else {
            Some(usize::from(raw_cursor).min(entries.len() - 1))
        };
        Ok(Self { entries, cursor })
    }
}

#[cfg(test)]
mod tests {
    use super::History;
    use super::MAX_HISTORY_ENTRIES;
    use gd_net::GmResponse;
    use gd_net::StatusCode;

    #[test]
    fn adding_after_going_back_drops_forward_entries() {
        let mut history = History::new();
        history.add_url("gemini://a/");
        history.add_url("gemini://b/");
        history.add_url("gemini://c/");
        assert_eq!(history.go_back().map(|entry| entry.url.as_str()), Some("gemini://b/"));
        assert!(history.can_go_forward());

        history.add_url("gemini://d/");
        assert_eq!(history.len(), 3);
        assert!(!history.can_go_forward());
        assert_eq!(
            history.most_recent().map(|entry| entry.url.as_str()),
            Some("gemini://d/")
        );
    }

    #[test]
    fn repeated_url_is_not_duplicated() {
        let mut history = History::new();
        history.add_url("gemini://a/");
        history.add_url("gemini://a/");
        assert_eq!(history.len(), 1);
        assert!(!history.can_go_back());
        assert!(history.go_back().is_none());
    }

    #[test]
    fn forward_stops_at_the_end() {
        let mut history = History::new();
        history.add_url("gemini://a/");
        history.add_url("gemini://b/");
        assert!(history.go_forward().is_none());
        history.go_back();
        assert_eq!(
            history.go_forward().map(|entry| entry.url.as_str()),
            Some("gemini://b/")
        );
    }

    #[test]
    fn cached_response_attaches_to_current_entry() {
        let mut history = History::new();
        history.add_url("gemini://a/");
        let response = GmResponse {
            status: StatusCode::SUCCESS,
            meta: "text/gemini".to_owned(),
            body: b"# A\n".to_vec(),
            ..GmResponse::default()
        };
        history.set_cached_response(&response);
        let found = history.find_url("gemini://a/");
        assert_eq!(
            found.and_then(|entry| entry.cached_response.as_ref()),
            Some(&response)
        );
        assert!(history.find_url("gemini://missing/").is_none());
    }

    #[test]
    fn serialized_history_keeps_entries_and_cursor() {
        let mut history = History::new();
        history.add_url("gemini://a/");
        history.add_url("gemini://b/");
        if let Some(entry) = history.most_recent_mut() {
            entry.norm_scroll_y = 0.25;
        }
        history.go_back();

        let bytes = history.serialize().unwrap_or_else(|_| unreachable!());
        let mut offset = 0;
        let restored = match History::deserialize(&bytes, &mut offset) {
            Ok(restored) => restored,
            Err(error) => panic!("{error}"),
        };
        assert_eq!(offset, bytes.len());
        assert_eq!(restored.len(), 2);
        assert_eq!(restored.cursor(), Some(0));
        assert_eq!(restored.find_url("gemini://b/").map(|e| e.norm_scroll_y), Some(0.25));
    }

    #[test]
    fn truncated_history_is_rejected() {
        let mut history = History::new();
        history.add_url("gemini://a/");
        let bytes = history.serialize().unwrap_or_else(|_| unreachable!());
        let mut offset = 0;
        let result = History::deserialize(&bytes[..bytes.len() - 1], &mut offset);
        assert!(result.is_err());
        if let Err(error) = result {
            assert_eq!(error.code, "storage.session_truncated");
        }
    }

    #[test]
    fn oldest_entries_fall_off() {
        let mut history = History::new();
        for index in 0..MAX_HISTORY_ENTRIES + 3 {
            history.add_url(&format!("gemini://host/{index}"));
        }
        assert_eq!(history.len(), MAX_HISTORY_ENTRIES);
        assert!(history.find_url("gemini://host/0").is_none());
        assert_eq!(history.cursor(), Some(MAX_HISTORY_ENTRIES - 1));
    }
}
