use gd_document::LayoutMetrics;
use std::path::PathBuf;

/// Keyboard family used when assigning link keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrdinalPlatform {
    Standard,
    /// `h`, `m`, `q` and `w` are taken by system shortcuts.
    Apple,
}

impl OrdinalPlatform {
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Self::Apple
        } else {
            Self::Standard
        }
    }

    pub(crate) fn reserved_letters(self) -> &'static [char] {
        match self {
            Self::Standard => &[],
            Self::Apple => &['h', 'm', 'q', 'w'],
        }
    }

    pub(crate) fn save_shortcut(self) -> &'static str {
        match self {
            Self::Standard => "Ctrl+S",
            Self::Apple => "\u{2318}S",
        }
    }
}

/// Tunables of a document session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Base spacing unit in pixels.
    pub gap: i32,
    /// Page margin in multiples of `gap`.
    pub page_margin: i32,
    pub line_height: i32,
    pub char_width: i32,
    /// Upper bound for the laid-out document width.
    pub max_document_width: i32,
    pub smooth_scrolling: bool,
    pub smooth_duration_ms: u64,
    pub wide_scroll_duration_ms: u64,
    pub load_image_instead_of_scrolling: bool,
    pub center_short_docs: bool,
    pub ordinal_platform: OrdinalPlatform,
    pub downloads_dir: PathBuf,
    pub max_redirects: u8,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            gap: 6,
            page_margin: 5,
            line_height: 20,
            char_width: 9,
            max_document_width: 900,
            smooth_scrolling: true,
            smooth_duration_ms: 600,
            wide_scroll_duration_ms: 167,
            load_image_instead_of_scrolling: false,
            center_short_docs: false,
            ordinal_platform: OrdinalPlatform::current(),
            downloads_dir: std::env::temp_dir().join("gemdust-downloads"),
            max_redirects: 5,
        }
    }
}

impl SessionConfig {
    pub fn layout_metrics(&self) -> LayoutMetrics {
        LayoutMetrics {
            char_width: self.char_width,
            line_height: self.line_height,
            gap: self.gap,
        }
    }

    pub(crate) fn page_margin_px(&self) -> i32 {
        self.gap * self.page_margin
    }
}
