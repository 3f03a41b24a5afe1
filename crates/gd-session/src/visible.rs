//! Which runs are on screen, and the document geometry behind that answer.

use crate::DocumentSession;
use crate::RequestState;
use gd_core::Int2;
use gd_core::RangeI;
use gd_core::Rect;
use gd_document::MediaKind;
use gd_document::Run;
use gd_document::RunHandle;

/// Runs intersecting the visible range, in document order.
///
/// Handles belong to the layout generation they were collected from and are
/// dropped wholesale whenever the document is laid out again.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisibleSet {
    pub first: Option<RunHandle>,
    pub last: Option<RunHandle>,
    pub links: Vec<RunHandle>,
    pub wide_runs: Vec<RunHandle>,
    pub media: Vec<RunHandle>,
}

impl VisibleSet {
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn is_empty(&self) -> bool {
        self.first.is_none() && self.links.is_empty() && self.media.is_empty()
    }

    fn add(&mut self, handle: RunHandle, run: &Run) {
        if !run.is_decoration() && run.media_id == 0 {
            if self.first.is_none() {
                self.first = Some(handle);
            }
            self.last = Some(handle);
        }
        if run.pre_id != 0 && run.is_wide() {
            self.wide_runs.push(handle);
        }
        if run.media_id != 0 && matches!(run.media_kind, MediaKind::Audio | MediaKind::Download) {
            self.media.push(handle);
        }
        if run.link_id != 0 {
            self.links.push(handle);
        }
    }
}

impl DocumentSession {
    pub(crate) fn scroll_value(&self) -> i32 {
        self.scroll_y.value_at(self.now()).round() as i32
    }

    /// Document-relative Y range shown in the viewport.
    pub(crate) fn visible_range(&self) -> RangeI {
        let top = self.scroll_value();
        let margin = if self.doc.has_site_banner() {
            0
        } else {
            self.config.page_margin_px()
        };
        RangeI::new(top - margin, top + self.viewport.y - margin)
    }

    /// Width the document is laid out at for the current viewport.
    pub fn document_width(&self) -> i32 {
        let gap = self.config.gap.max(1);
        let width = self.viewport.x;
        let adjust = (width as f32 / gap as f32 / 11.0 - 12.0).clamp(-2.0, 10.0);
        let available = width as f32 - gap as f32 * (self.config.page_margin as f32 + adjust) * 2.0;
        (available as i32)
            .max(50 * gap)
            .min(self.config.max_document_width)
    }

    /// Viewport rectangle the document is drawn into.
    pub(crate) fn document_bounds(&self) -> Rect {
        let width = self.document_width();
        let margin = self.config.page_margin_px();
        let mut rect = Rect::new(
            self.viewport.x / 2 - width / 2,
            0,
            width,
            self.viewport.y,
        );
        if !self.doc.has_site_banner() {
            rect.pos.y += margin;
            rect.size.y -= margin;
        }
        if self.center_vertically {
            let height = self.doc.size().y;
            if height < rect.size.y {
                rect.pos.y += (rect.size.y - height) / 2;
                rect.size.y = height;
            }
        }
        rect
    }

    /// Viewport position to document coordinates.
    pub(crate) fn document_pos(&self, pos: Int2) -> Int2 {
        pos.sub(self.document_bounds().pos)
            .add(Int2::new(0, self.scroll_value()))
    }

    /// Document rectangle to viewport coordinates.
    pub(crate) fn viewport_rect(&self, rect: Rect) -> Rect {
        rect.moved(
            self.document_bounds()
                .pos
                .sub(Int2::new(0, self.scroll_value())),
        )
    }

    /// Scroll position as a fraction of the document height.
    pub fn norm_scroll_pos(&self) -> f32 {
        let height = self.doc.size().y;
        if height <= 0 {
            return 0.0;
        }
        self.scroll_y.value_at(self.now()) / height as f32
    }

    /// Recollects the visible runs and everything derived from them.
    pub(crate) fn update_visible(&mut self) {
        if self.state == RequestState::Ready && self.doc.size().y > 0 {
            let norm = self.norm_scroll_pos();
            if let Some(entry) = self.persisted.history.most_recent_mut() {
                entry.norm_scroll_y = norm;
            }
        }
        self.center_vertically = self.config.center_short_docs
            || self.persisted.url.starts_with("about:")
            || !self.source_status.is_success();

        let range = self.visible_range();
        let mut visible = VisibleSet::default();
        self.doc
            .enumerate_runs(range, &mut |handle, run| visible.add(handle, run));
        self.visible = visible;
        tracing::trace!(
            start = range.start,
            end = range.end,
            links = self.visible.links.len(),
            wide = self.visible.wide_runs.len(),
            media = self.visible.media.len(),
            "visible runs updated"
        );

        self.update_side_heading();
        if let Some(pos) = self.last_pointer {
            self.update_hover(pos);
        }
        self.update_side_opacity(true);
        self.animate_media();
    }

    /// Last top-level heading that starts at or before the first visible run.
    pub(crate) fn current_heading(&self) -> Option<std::ops::Range<usize>> {
        let first = self.visible.first.and_then(|handle| self.doc.run(handle))?;
        let last_start = self
            .visible
            .last
            .and_then(|handle| self.doc.run(handle))
            .map(|run| run.text.start);
        let mut current = None;
        for heading in self.doc.headings().iter().filter(|heading| heading.level == 0) {
            if heading.text.start <= first.text.start {
                current = Some(heading.text.clone());
            }
            if last_start.is_some_and(|start| heading.text.start > start) {
                break;
            }
        }
        current
    }

    fn update_side_heading(&mut self) {
        let heading = self
            .current_heading()
            .and_then(|range| self.doc.source().get(range))
            .map(str::to_owned);
        if heading != self.side_heading {
            tracing::trace!(heading = heading.as_deref().unwrap_or(""), "side heading changed");
            self.side_heading = heading;
        }
    }
}
