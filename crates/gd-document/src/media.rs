//! Inline media attached to document links.

use crate::run::LinkId;
use crate::run::MediaId;
use crate::run::MediaKind;
use bitflags::bitflags;
use gd_core::Int2;

const MAX_IMAGE_PIXELS: u64 = 64 * 1024 * 1024;

bitflags! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct MediaFlags: u8 {
        /// More data will follow.
        const PARTIAL = 1 << 0;
        /// The user may collapse the content again.
        const ALLOW_HIDE = 1 << 1;
    }
}

/// Playback state of an inline audio player.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Player {
    pub started: bool,
    pub paused: bool,
    pub volume: f32,
    pub adjusting_volume: bool,
    pub volume_grabbed: bool,
    pub last_interaction_ms: u64,
}

impl Default for Player {
    fn default() -> Self {
        Self {
            started: false,
            paused: true,
            volume: 1.0,
            adjusting_volume: false,
            volume_grabbed: false,
            last_interaction_ms: 0,
        }
    }
}

impl Player {
    pub fn is_playing(&self) -> bool {
        self.started && !self.paused
    }

    pub fn toggle_pause(&mut self, now_ms: u64) {
        if !self.started {
            self.started = true;
            self.paused = false;
        } else {
            self.paused = !self.paused;
        }
        self.last_interaction_ms = now_ms;
    }

    pub fn set_volume(&mut self, volume: f32, now_ms: u64) {
        self.volume = volume.clamp(0.0, 1.0);
        self.adjusting_volume = true;
        self.last_interaction_ms = now_ms;
    }

    pub fn idle_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.last_interaction_ms)
    }
}

/// Read-only summary of one media entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaInfo {
    pub kind: MediaKind,
    pub mime: String,
    pub bytes: usize,
    pub partial: bool,
    pub allow_hide: bool,
    pub size: Option<Int2>,
}

#[derive(Debug, Clone)]
struct Entry {
    link: LinkId,
    kind: MediaKind,
    mime: String,
    data: Vec<u8>,
    flags: MediaFlags,
    size: Option<Int2>,
    url: String,
    player: Option<Player>,
}

/// Media entries keyed by link; ids are 1-based positions.
#[derive(Debug, Clone, Default)]
pub struct MediaStore {
    entries: Vec<Option<Entry>>,
}

impl MediaStore {
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.iter().all(Option::is_none)
    }

    fn entry(&self, id: MediaId) -> Option<&Entry> {
        let index = usize::from(id).checked_sub(1)?;
        self.entries.get(index)?.as_ref()
    }

    fn entry_mut(&mut self, id: MediaId) -> Option<&mut Entry> {
        let index = usize::from(id).checked_sub(1)?;
        self.entries.get_mut(index)?.as_mut()
    }

    fn position_of(&self, link: LinkId) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.as_ref().is_some_and(|entry| entry.link == link))
    }

    fn id_at(index: usize) -> MediaId {
        MediaId::try_from(index + 1).unwrap_or(MediaId::MAX)
    }

    /// Stores or replaces the content shown for `link`.
    ///
    /// `mime == None` removes the content, which only happens for entries that
    /// allow hiding. Returns whether the document layout is affected.
    pub fn set_data(
        &mut self,
        link: LinkId,
        mime: Option<&str>,
        data: &[u8],
        flags: MediaFlags,
    ) -> bool {
        let existing = self.position_of(link);
        let Some(mime) = mime else {
            let Some(index) = existing else {
                return false;
            };
            let removable = self.entries[index]
                .as_ref()
                .is_some_and(|entry| entry.flags.contains(MediaFlags::ALLOW_HIDE));
            if flags.contains(MediaFlags::ALLOW_HIDE) || removable {
                self.entries[index] = None;
                return true;
            }
            return false;
        };

        let lower = mime.to_ascii_lowercase();
        let is_download = existing
            .and_then(|index| self.entries[index].as_ref())
            .is_some_and(|entry| entry.kind == MediaKind::Download);
        let kind = if is_download {
            MediaKind::Download
        } else if lower.starts_with("image/") {
            MediaKind::Image
        } else if lower.starts_with("audio/") {
            MediaKind::Audio
        } else {
            return false;
        };

        let size = if kind == MediaKind::Image && !flags.contains(MediaFlags::PARTIAL) {
            image_size(data)
        } else {
            None
        };

        match existing.and_then(|index| self.entries[index].as_mut()) {
            Some(entry) => {
                let size_changed = entry.size != size || entry.kind != kind;
                entry.kind = kind;
                entry.mime = mime.to_owned();
                entry.data = data.to_vec();
                entry.flags = flags;
                if kind == MediaKind::Image {
                    entry.size = size;
                }
                size_changed
            }
            None => {
                self.entries.push(Some(Entry {
                    link,
                    kind,
                    mime: mime.to_owned(),
                    data: data.to_vec(),
                    flags,
                    size,
                    url: String::new(),
                    player: (kind == MediaKind::Audio).then(Player::default),
                }));
                true
            }
        }
    }

    /// Marks `link` as a download target before any bytes arrive.
    pub fn set_download_url(&mut self, link: LinkId, url: &str) -> MediaId {
        if let Some(index) = self.position_of(link) {
            if let Some(entry) = self.entries[index].as_mut() {
                entry.kind = MediaKind::Download;
                entry.url = url.to_owned();
                entry.player = None;
            }
            return Self::id_at(index);
        }
        self.entries.push(Some(Entry {
            link,
            kind: MediaKind::Download,
            mime: String::new(),
            data: Vec::new(),
            flags: MediaFlags::ALLOW_HIDE.union(MediaFlags::PARTIAL),
            size: None,
            url: url.to_owned(),
            player: None,
        }));
        Self::id_at(self.entries.len() - 1)
    }

    pub fn find_for_link(&self, link: LinkId) -> Option<MediaId> {
        self.position_of(link).map(Self::id_at)
    }

    pub fn find_download_for(&self, link: LinkId) -> Option<MediaId> {
        let id = self.find_for_link(link)?;
        (self.entry(id)?.kind == MediaKind::Download).then_some(id)
    }

    pub fn info(&self, id: MediaId) -> Option<MediaInfo> {
        let entry = self.entry(id)?;
        Some(MediaInfo {
            kind: entry.kind,
            mime: entry.mime.clone(),
            bytes: entry.data.len(),
            partial: entry.flags.contains(MediaFlags::PARTIAL),
            allow_hide: entry.flags.contains(MediaFlags::ALLOW_HIDE),
            size: entry.size,
        })
    }

    pub fn data(&self, id: MediaId) -> Option<&[u8]> {
        self.entry(id).map(|entry| entry.data.as_slice())
    }

    pub fn link_of(&self, id: MediaId) -> Option<LinkId> {
        self.entry(id).map(|entry| entry.link)
    }

    pub fn download_url(&self, id: MediaId) -> Option<&str> {
        self.entry(id).map(|entry| entry.url.as_str())
    }

    pub fn player(&self, id: MediaId) -> Option<&Player> {
        self.entry(id)?.player.as_ref()
    }

    pub fn player_mut(&mut self, id: MediaId) -> Option<&mut Player> {
        self.entry_mut(id)?.player.as_mut()
    }

    /// Ids of entries, in insertion order.
    pub fn ids(&self) -> Vec<MediaId> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.is_some())
            .map(|(index, _)| Self::id_at(index))
            .collect()
    }
}

fn image_size(data: &[u8]) -> Option<Int2> {
    let decoded = match image::load_from_memory(data) {
        Ok(decoded) => decoded,
        Err(error) => {
            tracing::debug!(%error, bytes = data.len(), "inline image not decodable");
            return None;
        }
    };
    let (width, height) = (decoded.width(), decoded.height());
    if u64::from(width) * u64::from(height) > MAX_IMAGE_PIXELS {
        return None;
    }
    Some(Int2::new(
        i32::try_from(width).ok()?,
        i32::try_from(height).ok()?,
    ))
}

#[cfg(test)]
mod tests {
    use super::MediaFlags;
    use super::MediaStore;
    use crate::run::MediaKind;

    #[test]
    fn audio_entries_get_a_player() {
        let mut store = MediaStore::default();
        assert!(store.set_data(3, Some("audio/ogg"), b"Ogg", MediaFlags::PARTIAL));
        let id = store.find_for_link(3).unwrap_or_else(|| unreachable!());
        let info = store.info(id).unwrap_or_else(|| unreachable!());
        assert_eq!(info.kind, MediaKind::Audio);
        assert!(info.partial);
        assert!(store.player(id).is_some());

        assert!(!store.set_data(3, Some("audio/ogg"), b"OggS more", MediaFlags::empty()));
        assert_eq!(store.info(id).map(|info| info.bytes), Some(9));
    }

    #[test]
    fn hiding_requires_allow_hide() {
        let mut store = MediaStore::default();
        store.set_data(1, Some("image/png"), b"x", MediaFlags::empty());
        assert!(!store.set_data(1, None, &[], MediaFlags::empty()));
        assert!(store.find_for_link(1).is_some());

        store.set_data(2, Some("image/png"), b"x", MediaFlags::ALLOW_HIDE);
        assert!(store.set_data(2, None, &[], MediaFlags::empty()));
        assert!(store.find_for_link(2).is_none());
    }

    #[test]
    fn downloads_keep_their_kind() {
        let mut store = MediaStore::default();
        let id = store.set_download_url(4, "gemini://example/file.zip");
        assert_eq!(store.find_download_for(4), Some(id));
        store.set_data(4, Some("application/zip"), b"PK", MediaFlags::PARTIAL);
        let info = store.info(id).unwrap_or_else(|| unreachable!());
        assert_eq!(info.kind, MediaKind::Download);
        assert_eq!(info.bytes, 2);
        assert_eq!(store.download_url(id), Some("gemini://example/file.zip"));
    }

    #[test]
    fn unknown_types_are_ignored() {
        let mut store = MediaStore::default();
        assert!(!store.set_data(1, Some("application/pdf"), b"%PDF", MediaFlags::empty()));
        assert!(store.is_empty());
    }

    #[test]
    fn player_toggles_and_clamps_volume() {
        let mut store = MediaStore::default();
        store.set_data(1, Some("audio/mpeg"), b"ID3", MediaFlags::empty());
        let id = store.find_for_link(1).unwrap_or_else(|| unreachable!());
        let player = store.player_mut(id).unwrap_or_else(|| unreachable!());
        player.toggle_pause(10);
        assert!(player.is_playing());
        player.set_volume(1.7, 20);
        assert_eq!(player.volume, 1.0);
        assert_eq!(player.idle_ms(3_020), 3_000);
    }
}
