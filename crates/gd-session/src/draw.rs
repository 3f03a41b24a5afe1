//! Per-frame animation stepping and tile synchronization.

use crate::DocumentSession;
use gd_document::Run;
use gd_render::Frame;
use gd_render::Painter;
use gd_render::sync_tiles;

impl DocumentSession {
    /// Advances running animations and the media ticker.
    ///
    /// Returns whether another frame is needed to finish an animation.
    pub fn tick(&mut self) -> bool {
        let now = self.now();
        let scrolling = !self.scroll_y.is_finished(now);
        if scrolling || self.scroll_animating {
            self.update_visible();
        }
        self.scroll_animating = scrolling;

        let mut animating = scrolling;
        let pre = self.wide.anim_id();
        if pre != 0 {
            let runs = self.doc.pre_runs(pre);
            self.invalid.extend(runs);
            if self.wide.is_finished(now) {
                self.wide.stop_animation();
            } else {
                animating = true;
            }
        }
        if self.ticker.poll(now) {
            self.update_media();
        }
        animating || !self.side_opacity.is_finished(now)
    }

    /// Brings the tile cache up to date through `painter`.
    pub(crate) fn draw(&mut self, painter: &mut dyn Painter) -> Frame {
        let vis = self.visible_range();
        let now = self.now();
        let wide = &self.wide;
        let run_offset = |run: &Run| wide.run_offset(run, now);
        sync_tiles(
            &mut self.vis_buf,
            self.doc.as_ref(),
            vis,
            &mut self.invalid,
            painter,
            &run_offset,
        )
    }
}
