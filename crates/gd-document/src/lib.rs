//! Laid-out document model consumed by the session controller.

mod layout;
mod media;
mod run;

use gd_core::Int2;
use gd_core::RangeI;
use gd_core::Rect;
use gd_security::BannerKind;

pub use layout::LayoutMetrics;
pub use layout::LineDocument;
pub use media::MediaFlags;
pub use media::MediaInfo;
pub use media::MediaStore;
pub use media::Player;
pub use run::Heading;
pub use run::Link;
pub use run::LinkFlags;
pub use run::LinkId;
pub use run::MediaId;
pub use run::MediaKind;
pub use run::PreId;
pub use run::Run;
pub use run::RunFlags;
pub use run::RunHandle;

/// How the source text is interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SourceFormat {
    #[default]
    Gemini,
    PlainText,
}

/// Structured, positioned view of a source text.
///
/// Every layout pass starts a new generation; [`RunHandle`]s from earlier
/// generations resolve to `None`.
pub trait Document {
    fn generation(&self) -> u32;
    /// Drops the source, the layout and all media.
    fn reset(&mut self);
    fn set_url(&mut self, url: &str);
    fn url(&self) -> &str;
    fn set_format(&mut self, format: SourceFormat);
    fn format(&self) -> SourceFormat;
    fn set_banner(&mut self, banner: BannerKind);
    fn banner(&self) -> BannerKind;
    fn set_source(&mut self, source: &str, width: i32);
    fn source(&self) -> &str;
    fn set_width(&mut self, width: i32);
    fn redo_layout(&mut self);
    fn size(&self) -> Int2;
    fn run(&self, handle: RunHandle) -> Option<&Run>;
    fn run_text(&self, handle: RunHandle) -> Option<&str>;
    /// Visits runs overlapping `range` vertically, in document order.
    fn enumerate_runs(&self, range: RangeI, visitor: &mut dyn FnMut(RunHandle, &Run));
    fn find_run_at(&self, pos: Int2) -> Option<RunHandle>;
    /// Source byte offset nearest to a document position.
    fn find_loc(&self, pos: Int2) -> Option<usize>;
    fn find_run_at_source(&self, offset: usize) -> Option<RunHandle>;
    fn headings(&self) -> &[Heading];
    fn link_count(&self) -> LinkId;
    fn link_url(&self, link: LinkId) -> Option<&str>;
    fn link_flags(&self, link: LinkId) -> LinkFlags;
    fn link_runs(&self, link: LinkId) -> Vec<RunHandle>;
    fn pre_runs(&self, pre: PreId) -> Vec<RunHandle>;
    fn pre_width(&self, pre: PreId) -> i32;
    fn site_banner_rect(&self) -> Option<Rect>;
    fn has_site_banner(&self) -> bool {
        self.site_banner_rect().is_some()
    }
    fn title(&self) -> Option<String>;
    fn media(&self) -> &MediaStore;
    fn media_mut(&mut self) -> &mut MediaStore;
}
