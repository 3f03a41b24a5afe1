//! Horizontal scrolling of preformatted blocks wider than the page.

use crate::DocumentSession;
use gd_anim::AnimatedScalar;
use gd_core::Int2;
use gd_document::PreId;
use gd_document::Run;

/// Per-block horizontal offsets; one block at a time may be animating.
#[derive(Debug, Clone)]
pub(crate) struct WideBlocks {
    offsets: Vec<i32>,
    anim_id: PreId,
    anim: AnimatedScalar,
}

impl WideBlocks {
    pub(crate) fn new(now: u64) -> Self {
        Self {
            offsets: Vec::new(),
            anim_id: 0,
            anim: AnimatedScalar::new(0.0, now),
        }
    }

    pub(crate) fn reset(&mut self, now: u64) {
        *self = Self::new(now);
    }

    pub(crate) fn offset(&self, pre: PreId) -> i32 {
        usize::from(pre)
            .checked_sub(1)
            .and_then(|index| self.offsets.get(index))
            .copied()
            .unwrap_or(0)
    }

    fn set_offset(&mut self, pre: PreId, offset: i32) {
        let Some(index) = usize::from(pre).checked_sub(1) else {
            return;
        };
        if self.offsets.len() <= index {
            self.offsets.resize(index + 1, 0);
        }
        self.offsets[index] = offset;
    }

    /// Horizontal displacement applied to `run` when drawn.
    pub(crate) fn run_offset(&self, run: &Run, now: u64) -> i32 {
        if run.pre_id == 0 || !run.is_wide() {
            return 0;
        }
        if run.pre_id == self.anim_id {
            return -(self.anim.value_at(now).round() as i32);
        }
        -self.offset(run.pre_id)
    }

    /// Blocks currently scrolled away from their left edge.
    pub(crate) fn nonzero_blocks(&self) -> Vec<PreId> {
        self.offsets
            .iter()
            .enumerate()
            .filter(|(_, offset)| **offset != 0)
            .filter_map(|(index, _)| PreId::try_from(index + 1).ok())
            .collect()
    }

    fn animate(&mut self, pre: PreId, old: i32, new: i32, span_ms: u64, now: u64) {
        if self.anim_id != pre || self.anim.is_finished(now) {
            self.anim.init(old as f32, now);
        }
        self.anim_id = pre;
        self.anim.set_value_eased(new as f32, span_ms, now);
    }

    pub(crate) fn stop_animation(&mut self) {
        self.anim_id = 0;
    }

    pub(crate) fn anim_id(&self) -> PreId {
        self.anim_id
    }

    pub(crate) fn is_finished(&self, now: u64) -> bool {
        self.anim.is_finished(now)
    }
}

impl DocumentSession {
    /// Returns every wide block to its left edge.
    pub(crate) fn reset_wide_runs(&mut self) {
        self.invalidate_wide_runs_with_nonzero_offset();
        let now = self.now();
        self.wide.reset(now);
    }

    pub(crate) fn invalidate_wide_runs_with_nonzero_offset(&mut self) {
        for pre in self.wide.nonzero_blocks() {
            let runs = self.doc.pre_runs(pre);
            self.invalid.extend(runs);
        }
    }

    /// Current horizontal offset of preformatted block `pre`.
    pub fn wide_offset(&self, pre: PreId) -> i32 {
        self.wide.offset(pre)
    }

    /// Scrolls the wide block under `pointer` sideways by `delta` pixels.
    ///
    /// Returns whether a block moved.
    pub fn scroll_wide_block(&mut self, pointer: Int2, delta: i32, span_ms: u64) -> bool {
        if delta == 0 {
            return false;
        }
        let doc_pos = self.document_pos(pointer);
        let Some(pre) = self
            .visible
            .wide_runs
            .iter()
            .filter_map(|handle| self.doc.run(*handle))
            .find(|run| run.bounds.y_span().contains(doc_pos.y))
            .map(|run| run.pre_id)
        else {
            return false;
        };

        let margin = self.config.page_margin_px();
        let max = (self.doc.pre_width(pre) - self.document_width() + margin).max(0);
        let old = self.wide.offset(pre);
        let new = old.saturating_add(delta).clamp(0, max);
        if new == old {
            return false;
        }
        self.wide.set_offset(pre, new);
        let runs = self.doc.pre_runs(pre);
        self.invalid.extend(runs);
        self.select_mark = None;
        self.found_mark = None;

        let now = self.now();
        if span_ms > 0 {
            self.wide.animate(pre, old, new, span_ms, now);
        } else if self.wide.anim_id() == pre {
            self.wide.stop_animation();
        }
        tracing::trace!(pre, offset = new, max, "wide block scrolled");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::WideBlocks;
    use gd_core::Rect;
    use gd_document::MediaKind;
    use gd_document::Run;
    use gd_document::RunFlags;

    fn wide_run(pre_id: u16) -> Run {
        Run {
            bounds: Rect::new(0, 0, 900, 20),
            visual_width: 900,
            text: 0..100,
            label: None,
            link_id: 0,
            media_id: 0,
            media_kind: MediaKind::None,
            pre_id,
            flags: RunFlags::WIDE,
        }
    }

    #[test]
    fn offsets_are_per_block() {
        let mut blocks = WideBlocks::new(0);
        blocks.set_offset(2, 40);
        assert_eq!(blocks.offset(1), 0);
        assert_eq!(blocks.offset(2), 40);
        assert_eq!(blocks.nonzero_blocks(), vec![2]);
        assert_eq!(blocks.run_offset(&wide_run(2), 0), -40);

        let mut narrow = wide_run(2);
        narrow.flags = RunFlags::empty();
        assert_eq!(blocks.run_offset(&narrow, 0), 0);
    }

    #[test]
    fn animation_moves_from_old_to_new_offset() {
        let mut blocks = WideBlocks::new(0);
        blocks.set_offset(1, 100);
        blocks.animate(1, 0, 100, 100, 0);
        assert_eq!(blocks.run_offset(&wide_run(1), 0), 0);
        assert_eq!(blocks.run_offset(&wide_run(1), 100), -100);
        assert!(blocks.is_finished(100));

        blocks.stop_animation();
        assert_eq!(blocks.anim_id(), 0);
        assert_eq!(blocks.run_offset(&wide_run(1), 0), -100);
    }

    #[test]
    fn reset_clears_everything() {
        let mut blocks = WideBlocks::new(0);
        blocks.set_offset(3, 12);
        blocks.reset(5);
        assert!(blocks.nonzero_blocks().is_empty());
        assert_eq!(blocks.offset(3), 0);
    }
}
