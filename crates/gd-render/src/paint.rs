//! Synchronizes the tile cache with the document through a [`Painter`].

use crate::invalidation::InvalidationSet;
use crate::tiles::TILE_COUNT;
use crate::tiles::TileCache;
use gd_core::Int2;
use gd_core::RangeI;
use gd_core::Rect;
use gd_document::Document;
use gd_document::Run;
use gd_document::RunHandle;

/// Drawing backend for cache tiles; coordinates are tile-local.
pub trait Painter {
    fn clear_tile(&mut self, tile: usize);
    fn fill_background(&mut self, tile: usize, rect: Rect);
    fn draw_run(&mut self, tile: usize, rect: Rect, handle: RunHandle, run: &Run);
}

/// Work done by one [`sync_tiles`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Frame {
    pub draw_calls: usize,
    pub background_fills: usize,
    pub tiles_touched: usize,
}

/// Brings every tile up to date for the visible range `vis`.
///
/// `run_offset` gives the horizontal scroll applied to a run (wide blocks).
/// The invalidation set is cleared once all tiles have been processed.
pub fn sync_tiles(
    cache: &mut dyn TileCache,
    doc: &dyn Document,
    vis: RangeI,
    invalid: &mut InvalidationSet,
    painter: &mut dyn Painter,
    run_offset: &dyn Fn(&Run) -> i32,
) -> Frame {
    let full = RangeI::new(0, doc.size().y);
    cache.reposition(vis);
    let ranges = cache.invalid_ranges(full);
    let tile_height = cache.tile_height();
    let dirty = invalid.sorted();
    let mut frame = Frame::default();

    for (index, range) in ranges.iter().enumerate().take(TILE_COUNT) {
        let tile = cache.tile(index);
        let span = RangeI::new(tile.origin, tile.origin + tile_height);
        let mut touched = false;

        if !range.is_empty() {
            touched = true;
            if tile.valid.is_empty() {
                painter.clear_tile(index);
            }
            doc.enumerate_runs(*range, &mut |handle, run| {
                draw_run(painter, index, tile.origin, handle, run, run_offset);
                frame.draw_calls += 1;
            });
        }

        let overlapping: Vec<(RunHandle, &Run)> = dirty
            .iter()
            .filter_map(|handle| doc.run(*handle).map(|run| (*handle, run)))
            .filter(|(_, run)| run.bounds.y_span().overlaps(&span))
            .filter(|(_, run)| !covers(range, run))
            .collect();
        for (_, run) in &overlapping {
            painter.fill_background(
                index,
                Rect::new(
                    0,
                    run.bounds.top() - tile.origin,
                    doc.size().x.max(run.bounds.right()),
                    run.bounds.height(),
                ),
            );
            frame.background_fills += 1;
        }
        for (handle, run) in &overlapping {
            draw_run(painter, index, tile.origin, *handle, run, run_offset);
            frame.draw_calls += 1;
        }
        if touched || !overlapping.is_empty() {
            frame.tiles_touched += 1;
        }
    }

    cache.validate();
    invalid.clear();
    tracing::trace!(
        draw_calls = frame.draw_calls,
        fills = frame.background_fills,
        "tiles synced"
    );
    frame
}

/// Whether `run` lies entirely in the freshly drawn `range`.
fn covers(range: &RangeI, run: &Run) -> bool {
    !range.is_empty() && range.start <= run.bounds.top() && run.bounds.bottom() <= range.end
}

fn draw_run(
    painter: &mut dyn Painter,
    tile: usize,
    origin: i32,
    handle: RunHandle,
    run: &Run,
    run_offset: &dyn Fn(&Run) -> i32,
) {
    let rect = run.bounds.moved(Int2::new(run_offset(run), -origin));
    painter.draw_run(tile, rect, handle, run);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaintOp {
    ClearTile(usize),
    Fill { tile: usize, rect: Rect },
    Run { tile: usize, rect: Rect, handle: RunHandle },
}

/// Painter that records operations; used headless and in tests.
#[derive(Debug, Clone, Default)]
pub struct RecordingPainter {
    pub ops: Vec<PaintOp>,
}

impl RecordingPainter {
    pub fn runs_drawn(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, PaintOp::Run { .. }))
            .count()
    }

    pub fn clear(&mut self) {
        self.ops.clear();
    }
}

impl Painter for RecordingPainter {
    fn clear_tile(&mut self, tile: usize) {
        self.ops.push(PaintOp::ClearTile(tile));
    }

    fn fill_background(&mut self, tile: usize, rect: Rect) {
        self.ops.push(PaintOp::Fill { tile, rect });
    }

    fn draw_run(&mut self, tile: usize, rect: Rect, handle: RunHandle, _run: &Run) {
        self.ops.push(PaintOp::Run { tile, rect, handle });
    }
}

#[cfg(test)]
mod tests {
    use super::PaintOp;
    use super::RecordingPainter;
    use super::sync_tiles;
    use crate::invalidation::InvalidationSet;
    use crate::tiles::VisBuffer;
    use gd_core::Int2;
    use gd_core::RangeI;
    use gd_document::Document;
    use gd_document::LayoutMetrics;
    use gd_document::LineDocument;

    fn doc(lines: usize) -> LineDocument {
        let source: String = (0..lines).map(|index| format!("line {index}\n")).collect();
        let mut doc = LineDocument::new(LayoutMetrics {
            char_width: 10,
            line_height: 20,
            gap: 6,
        });
        doc.set_source(&source, 400);
        doc
    }

    #[test]
    fn first_sync_draws_visible_tiles_then_nothing() {
        let doc = doc(20);
        let mut cache = VisBuffer::new(100);
        let mut invalid = InvalidationSet::default();
        let mut painter = RecordingPainter::default();
        let frame = sync_tiles(
            &mut cache,
            &doc,
            RangeI::new(0, 100),
            &mut invalid,
            &mut painter,
            &|_| 0,
        );
        // three tiles of 100px cover the first 15 lines
        assert_eq!(frame.draw_calls, 15);
        assert_eq!(painter.ops.iter().filter(|op| matches!(op, PaintOp::ClearTile(_))).count(), 3);

        painter.clear();
        let frame = sync_tiles(
            &mut cache,
            &doc,
            RangeI::new(0, 100),
            &mut invalid,
            &mut painter,
            &|_| 0,
        );
        assert_eq!(frame.draw_calls, 0);
        assert!(painter.ops.is_empty());
    }

    #[test]
    fn invalidated_run_is_cleared_and_redrawn_once() {
        let doc = doc(20);
        let mut cache = VisBuffer::new(100);
        let mut invalid = InvalidationSet::default();
        let mut painter = RecordingPainter::default();
        sync_tiles(&mut cache, &doc, RangeI::new(0, 100), &mut invalid, &mut painter, &|_| 0);

        let handle = doc.find_run_at(Int2::new(5, 45)).unwrap_or_else(|| unreachable!());
        invalid.insert(handle);
        invalid.insert(handle);
        painter.clear();
        let frame = sync_tiles(&mut cache, &doc, RangeI::new(0, 100), &mut invalid, &mut painter, &|_| 0);
        assert_eq!(frame.draw_calls, 1);
        assert_eq!(frame.background_fills, 1);
        assert_eq!(
            painter.ops[0],
            PaintOp::Fill {
                tile: 0,
                rect: gd_core::Rect::new(0, 40, 400, 20),
            }
        );
        assert!(invalid.is_empty());
    }

    #[test]
    fn dirty_run_in_a_fresh_tile_is_drawn_once() {
        let doc = doc(20);
        let mut cache = VisBuffer::new(100);
        let mut invalid = InvalidationSet::default();
        let mut painter = RecordingPainter::default();
        let handle = doc.find_run_at(Int2::new(5, 45)).unwrap_or_else(|| unreachable!());
        invalid.insert(handle);

        let frame = sync_tiles(&mut cache, &doc, RangeI::new(0, 100), &mut invalid, &mut painter, &|_| 0);
        assert_eq!(frame.draw_calls, 15);
        assert_eq!(frame.background_fills, 0);
        let drawn = painter
            .ops
            .iter()
            .filter(|op| matches!(op, PaintOp::Run { handle: drawn, .. } if *drawn == handle))
            .count();
        assert_eq!(drawn, 1);
    }

    #[test]
    fn stale_handles_are_skipped() {
        let mut doc = doc(5);
        let mut cache = VisBuffer::new(100);
        let mut invalid = InvalidationSet::default();
        let mut painter = RecordingPainter::default();
        sync_tiles(&mut cache, &doc, RangeI::new(0, 100), &mut invalid, &mut painter, &|_| 0);
        let handle = doc.find_run_at(Int2::new(5, 5)).unwrap_or_else(|| unreachable!());
        doc.redo_layout();
        invalid.insert(handle);
        painter.clear();
        let frame = sync_tiles(&mut cache, &doc, RangeI::new(0, 100), &mut invalid, &mut painter, &|_| 0);
        assert_eq!(frame.draw_calls, 0);
    }

    #[test]
    fn run_offset_shifts_drawn_rect() {
        let doc = doc(1);
        let mut cache = VisBuffer::new(100);
        let mut invalid = InvalidationSet::default();
        let mut painter = RecordingPainter::default();
        sync_tiles(&mut cache, &doc, RangeI::new(0, 100), &mut invalid, &mut painter, &|_| -30);
        let drawn = painter.ops.iter().find_map(|op| match op {
            PaintOp::Run { rect, .. } => Some(*rect),
            _ => None,
        });
        assert_eq!(drawn.map(|rect| rect.left()), Some(-30));
    }
}
