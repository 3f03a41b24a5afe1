//! Vertical scrolling: clamped smooth scroll, jumps and wheel input.

use crate::DocumentSession;
use gd_core::Int2;
use gd_render::TileCache;

const WHEEL_LINES: i32 = 3;
const ACCELERATED_WHEEL_POS: f32 = 0.25;
const SIDE_FADE_OUT_MS: u64 = 100;
const SIDE_FADE_IN_MS: u64 = 200;

impl DocumentSession {
    /// Largest scroll position that still fills the viewport.
    pub fn scroll_max(&self) -> i32 {
        let margins = if self.doc.has_site_banner() { 1 } else { 2 };
        self.doc.size().y - self.viewport.y + margins * self.config.page_margin_px()
    }

    /// Instant scroll by `offset`, clamped to the document.
    pub fn scroll(&mut self, offset: i32) {
        self.smooth_scroll(offset, 0);
    }

    /// Scrolls by `offset` over `span_ms`; zero or disabled smoothing is instant.
    pub fn smooth_scroll(&mut self, offset: i32, span_ms: u64) {
        if offset != 0 && self.link_keys.visible {
            self.hide_link_numbers();
        }
        let span_ms = if self.config.smooth_scrolling { span_ms } else { 0 };
        let max = self.scroll_max();
        let dest = (self.scroll_y.target().round() as i32)
            .saturating_add(offset)
            .max(0);
        let dest = if max > 0 { dest.min(max) } else { 0 };
        let now = self.now();
        if span_ms > 0 {
            self.scroll_y.set_value_eased(dest as f32, span_ms, now);
            self.no_hover_while_scrolling = true;
        } else {
            self.scroll_y.set_value(dest as f32, 0, now);
        }
        self.update_visible();
    }

    /// Jumps so that document `y` is near the top, or centred.
    pub fn scroll_to(&mut self, y: i32, centered: bool) {
        let mut y = y;
        if !self.doc.has_site_banner() {
            y += self.config.page_margin_px();
        }
        let y = y - if centered {
            self.document_bounds().height() / 2
        } else {
            self.config.line_height
        };
        let now = self.now();
        self.scroll_y.init(y as f32, now);
        self.scroll(0);
    }

    pub fn scroll_to_top(&mut self) {
        let now = self.now();
        self.scroll_y.init(0.0, now);
        self.vis_buf.invalidate();
        self.scroll(0);
    }

    pub fn scroll_to_bottom(&mut self) {
        let now = self.now();
        self.scroll_y.init(self.scroll_max().max(0) as f32, now);
        self.vis_buf.invalidate();
        self.scroll(0);
    }

    /// Three lines up (`dir < 0`) or down.
    pub fn scroll_step(&mut self, dir: i32) {
        if dir > 0 && self.config.load_image_instead_of_scrolling && self.fetch_next_unfetched_image() {
            return;
        }
        let offset = WHEEL_LINES * self.config.line_height * dir.signum();
        self.smooth_scroll(offset, self.config.smooth_duration_ms);
    }

    /// A `fraction` of the page up or down.
    pub fn scroll_page(&mut self, dir: i32, fraction: f32) {
        if dir > 0 && self.config.load_image_instead_of_scrolling && self.fetch_next_unfetched_image() {
            return;
        }
        let height = self.document_bounds().height() as f32;
        let offset = (dir.signum() as f32 * fraction * height).round() as i32;
        self.smooth_scroll(offset, self.config.smooth_duration_ms);
    }

    /// Scrolls to the first heading starting with `prefix`, ignoring case.
    ///
    /// While a fetch is running the jump is remembered and made once the page
    /// has finished loading.
    pub fn scroll_to_heading(&mut self, prefix: &str) -> bool {
        if self.request.is_some() {
            self.pending_goto_heading = Some(prefix.to_owned());
            return true;
        }
        let prefix = prefix.to_lowercase();
        let found = self.doc.headings().iter().find_map(|heading| {
            self.doc
                .source()
                .get(heading.text.clone())
                .filter(|text| text.to_lowercase().starts_with(&prefix))
                .map(|_| heading.text.start)
        });
        match found {
            Some(offset) => self.goto_source_offset(offset),
            None => false,
        }
    }

    /// Brings the run containing source byte `offset` to the top.
    pub fn goto_source_offset(&mut self, offset: usize) -> bool {
        let Some(top) = self
            .doc
            .find_run_at_source(offset)
            .and_then(|handle| self.doc.run(handle))
            .map(|run| run.bounds.top())
        else {
            return false;
        };
        self.scroll_to(top, false);
        true
    }

    /// Mouse wheel or trackpad scroll at `pointer`.
    ///
    /// Per-pixel deltas move the page directly; notched wheels scroll three
    /// lines per notch with easing, faster when notches arrive in quick
    /// succession. Horizontal motion goes to the wide block under the pointer.
    pub fn wheel(&mut self, pointer: Int2, delta: Int2, per_pixel: bool) {
        let now = self.now();
        if per_pixel {
            self.scroll_y.stop(now);
            self.scroll(delta.y.saturating_neg());
            self.scroll_wide_block(pointer, delta.x.saturating_neg(), 0);
        } else {
            let accelerated = !self.scroll_y.is_finished(now)
                && self.scroll_y.pos(now) < ACCELERATED_WHEEL_POS;
            let span = if accelerated {
                self.config.smooth_duration_ms / 2
            } else {
                self.config.smooth_duration_ms
            };
            let step = -WHEEL_LINES * self.config.line_height;
            self.smooth_scroll(delta.y.saturating_mul(step), span);
            self.scroll_wide_block(
                pointer,
                delta.x.saturating_mul(step),
                self.config.wide_scroll_duration_ms,
            );
        }
        self.no_hover_while_scrolling = true;
    }

    /// Fades the side overlay in once the site banner has scrolled away.
    pub(crate) fn update_side_opacity(&mut self, animate: bool) {
        let now = self.now();
        let scrolled_past = self
            .doc
            .site_banner_rect()
            .is_some_and(|banner| (banner.bottom() as f32) < self.scroll_y.value_at(now));
        let opacity = if scrolled_past { 1.0 } else { 0.0 };
        let span = match (animate, scrolled_past) {
            (false, _) => 0,
            (true, false) => SIDE_FADE_OUT_MS,
            (true, true) => SIDE_FADE_IN_MS,
        };
        self.side_opacity.set_value(opacity, span, now);
    }
}
