use bitflags::bitflags;
use gd_core::Rect;
use std::ops::Range;

/// 1-based link number within a document; 0 means no link.
pub type LinkId = u16;

/// 1-based preformatted block number; 0 means not preformatted.
pub type PreId = u16;

/// 1-based media entry number; 0 means no media.
pub type MediaId = u16;

/// Reference to a run in one layout generation of a document.
///
/// Handles from an older generation never resolve, so holders do not need
/// to be told when the document is replaced or laid out again.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RunHandle {
    pub generation: u32,
    pub index: u32,
}

bitflags! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct RunFlags: u8 {
        const DECORATION = 1 << 0;
        const WIDE = 1 << 1;
        const SITE_BANNER = 1 << 2;
    }
}

/// What an embedded media run presents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum MediaKind {
    #[default]
    None,
    Image,
    Audio,
    Download,
}

/// Positioned piece of the laid-out document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run {
    pub bounds: Rect,
    pub visual_width: i32,
    /// Byte range into the document source; empty for decorations.
    pub text: Range<usize>,
    pub label: Option<String>,
    pub link_id: LinkId,
    pub media_id: MediaId,
    pub media_kind: MediaKind,
    pub pre_id: PreId,
    pub flags: RunFlags,
}

impl Run {
    pub fn is_decoration(&self) -> bool {
        self.flags.contains(RunFlags::DECORATION)
    }

    pub fn is_wide(&self) -> bool {
        self.flags.contains(RunFlags::WIDE)
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct LinkFlags: u16 {
        const SUPPORTED_PROTOCOL = 1 << 0;
        const CONTENT = 1 << 1;
        const PERMANENT = 1 << 2;
        const IMAGE_EXT = 1 << 3;
        const AUDIO_EXT = 1 << 4;
        const REMOTE = 1 << 5;
    }
}

impl LinkFlags {
    /// Image or audio by file extension.
    pub fn is_media_link(self) -> bool {
        self.intersects(Self::IMAGE_EXT.union(Self::AUDIO_EXT))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub url: String,
    pub flags: LinkFlags,
}

/// Heading line; level 0 is `#`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    pub level: u8,
    pub text: Range<usize>,
    pub top: i32,
}

#[cfg(test)]
mod tests {
    use super::LinkFlags;
    use super::RunFlags;

    #[test]
    fn media_links_are_recognized_by_extension() {
        assert!(LinkFlags::IMAGE_EXT.is_media_link());
        assert!(LinkFlags::AUDIO_EXT.union(LinkFlags::REMOTE).is_media_link());
        assert!(!LinkFlags::SUPPORTED_PROTOCOL.is_media_link());
        assert!(!LinkFlags::empty().is_media_link());
    }

    #[test]
    fn flags_combine_and_clear() {
        let mut flags = LinkFlags::SUPPORTED_PROTOCOL;
        flags.insert(LinkFlags::CONTENT);
        assert!(flags.contains(LinkFlags::CONTENT.union(LinkFlags::SUPPORTED_PROTOCOL)));
        assert!(!flags.contains(LinkFlags::PERMANENT));
        flags.remove(LinkFlags::CONTENT);
        assert_eq!(flags, LinkFlags::SUPPORTED_PROTOCOL);

        let run = RunFlags::DECORATION.union(RunFlags::WIDE);
        assert!(run.intersects(RunFlags::WIDE));
        assert!(!run.contains(RunFlags::SITE_BANNER));
        assert_eq!(RunFlags::default(), RunFlags::empty());
    }
}
