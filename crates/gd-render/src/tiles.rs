//! Vertically tiled pixel cache bookkeeping.

use gd_core::RangeI;

pub const TILE_COUNT: usize = 3;

/// Placement and validity of one cache tile in document coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tile {
    pub origin: i32,
    pub valid: RangeI,
}

/// Tiled cache addressed by document-relative Y.
pub trait TileCache {
    /// Maps tiles onto `vis`; returns whether any tile moved.
    fn reposition(&mut self, vis: RangeI) -> bool;
    /// Per tile, the part of `full` that must be drawn before the tile can
    /// be shown.
    fn invalid_ranges(&mut self, full: RangeI) -> [RangeI; TILE_COUNT];
    /// Marks everything reported by the last `invalid_ranges` as drawn.
    fn validate(&mut self);
    /// Forgets every drawn region.
    fn invalidate(&mut self);
    fn tile(&self, index: usize) -> Tile;
    fn tile_height(&self) -> i32;
}

/// Three tiles, each as tall as the viewport, so any viewport-sized window
/// is covered by at most two of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisBuffer {
    tile_height: i32,
    tiles: [Tile; TILE_COUNT],
    vis: RangeI,
    full: RangeI,
    positioned: bool,
}

impl VisBuffer {
    pub fn new(tile_height: i32) -> Self {
        Self {
            tile_height: tile_height.max(1),
            tiles: [Tile::default(); TILE_COUNT],
            vis: RangeI::default(),
            full: RangeI::default(),
            positioned: false,
        }
    }

    /// Changes the tile size; all content becomes invalid.
    pub fn resize(&mut self, tile_height: i32) {
        *self = Self::new(tile_height);
    }

    fn span(&self, index: usize) -> RangeI {
        let origin = self.tiles[index].origin;
        RangeI::new(origin, origin + self.tile_height)
    }

    /// Document range currently backed by tiles.
    pub fn covered(&self) -> RangeI {
        (0..TILE_COUNT).fold(RangeI::default(), |acc, index| {
            if self.span(index).overlaps(&self.vis) {
                acc.union(&self.span(index))
            } else {
                acc
            }
        })
    }
}

impl TileCache for VisBuffer {
    fn reposition(&mut self, vis: RangeI) -> bool {
        if self.positioned && vis == self.vis {
            return false;
        }
        self.vis = vis;
        let height = self.tile_height;
        let mut used = [false; TILE_COUNT];
        for (index, slot) in used.iter_mut().enumerate() {
            *slot = self.span(index).overlaps(&vis);
        }

        if !self.positioned || !used.iter().any(|slot| *slot) {
            self.positioned = true;
            for (index, tile) in self.tiles.iter_mut().enumerate() {
                *tile = Tile {
                    origin: vis.start + height * index as i32,
                    valid: RangeI::default(),
                };
            }
            tracing::trace!(start = vis.start, "tiles reset");
            return true;
        }

        let top = (0..TILE_COUNT)
            .filter(|index| used[*index])
            .map(|index| self.tiles[index].origin)
            .min()
            .unwrap_or(vis.start);
        let bottom = (0..TILE_COUNT)
            .filter(|index| used[*index])
            .map(|index| self.tiles[index].origin + height)
            .max()
            .unwrap_or(vis.end);

        if vis.start < top {
            if let Some(free) = used.iter().position(|slot| !*slot) {
                self.tiles[free] = Tile {
                    origin: top - height,
                    valid: RangeI::default(),
                };
                used[free] = true;
            }
        }
        if vis.end > bottom {
            if let Some(free) = used.iter().position(|slot| !*slot) {
                self.tiles[free] = Tile {
                    origin: bottom,
                    valid: RangeI::default(),
                };
            }
        }
        true
    }

    fn invalid_ranges(&mut self, full: RangeI) -> [RangeI; TILE_COUNT] {
        self.full = full;
        let mut out = [RangeI::default(); TILE_COUNT];
        for (index, range) in out.iter_mut().enumerate() {
            let wanted = self.span(index).intersect(&full);
            let valid = self.tiles[index].valid;
            if valid.is_empty() {
                *range = wanted;
                continue;
            }
            let before = RangeI::new(wanted.start, valid.start).intersect(&wanted);
            let after = RangeI::new(valid.end, wanted.end).intersect(&wanted);
            *range = match (before.is_empty(), after.is_empty()) {
                (true, true) => RangeI::default(),
                (false, true) => before,
                (true, false) => after,
                (false, false) => wanted,
            };
        }
        out
    }

    fn validate(&mut self) {
        for index in 0..TILE_COUNT {
            let covered = self.span(index).intersect(&self.full);
            self.tiles[index].valid = covered;
        }
    }

    fn invalidate(&mut self) {
        for tile in &mut self.tiles {
            tile.valid = RangeI::default();
        }
    }

    fn tile(&self, index: usize) -> Tile {
        self.tiles[index.min(TILE_COUNT - 1)]
    }

    fn tile_height(&self) -> i32 {
        self.tile_height
    }
}

#[cfg(test)]
mod tests {
    use super::TILE_COUNT;
    use super::TileCache;
    use super::VisBuffer;
    use gd_core::RangeI;

    #[test]
    fn first_reposition_lays_tiles_from_viewport() {
        let mut buf = VisBuffer::new(100);
        assert!(buf.reposition(RangeI::new(0, 100)));
        assert_eq!(buf.tile(0).origin, 0);
        assert_eq!(buf.tile(1).origin, 100);
        assert_eq!(buf.tile(2).origin, 200);
        assert!(!buf.reposition(RangeI::new(0, 100)));
    }

    #[test]
    fn everything_is_invalid_until_validated() {
        let mut buf = VisBuffer::new(100);
        buf.reposition(RangeI::new(0, 100));
        let ranges = buf.invalid_ranges(RangeI::new(0, 250));
        assert_eq!(ranges[0], RangeI::new(0, 100));
        assert_eq!(ranges[1], RangeI::new(100, 200));
        assert_eq!(ranges[2], RangeI::new(200, 250));
        buf.validate();
        let ranges = buf.invalid_ranges(RangeI::new(0, 250));
        assert!(ranges.iter().all(RangeI::is_empty));
    }

    #[test]
    fn growing_document_invalidates_only_the_tail() {
        let mut buf = VisBuffer::new(100);
        buf.reposition(RangeI::new(0, 100));
        buf.invalid_ranges(RangeI::new(0, 150));
        buf.validate();
        let ranges = buf.invalid_ranges(RangeI::new(0, 180));
        assert!(ranges[0].is_empty());
        assert_eq!(ranges[1], RangeI::new(150, 180));
    }

    #[test]
    fn scrolling_up_reuses_a_free_tile_above() {
        let mut buf = VisBuffer::new(100);
        buf.reposition(RangeI::new(500, 600));
        buf.invalid_ranges(RangeI::new(0, 1_000));
        buf.validate();
        assert!(buf.reposition(RangeI::new(450, 550)));
        let origins: Vec<i32> = (0..TILE_COUNT).map(|index| buf.tile(index).origin).collect();
        assert!(origins.contains(&400));
        assert!(origins.contains(&500));
        let ranges = buf.invalid_ranges(RangeI::new(0, 1_000));
        let reused = origins.iter().position(|origin| *origin == 500).unwrap_or_else(|| unreachable!());
        assert!(ranges[reused].is_empty());
        let fresh = origins.iter().position(|origin| *origin == 400).unwrap_or_else(|| unreachable!());
        assert_eq!(ranges[fresh], RangeI::new(400, 500));
    }

    #[test]
    fn jump_far_away_resets_all_tiles() {
        let mut buf = VisBuffer::new(100);
        buf.reposition(RangeI::new(0, 100));
        buf.invalid_ranges(RangeI::new(0, 5_000));
        buf.validate();
        buf.reposition(RangeI::new(3_000, 3_100));
        assert_eq!(buf.tile(0).origin, 3_000);
        assert!(buf.tile(0).valid.is_empty());
        assert_eq!(buf.covered(), RangeI::new(3_000, 3_100));
    }

    #[test]
    fn invalidate_forgets_drawn_regions() {
        let mut buf = VisBuffer::new(50);
        buf.reposition(RangeI::new(0, 50));
        buf.invalid_ranges(RangeI::new(0, 150));
        buf.validate();
        buf.invalidate();
        let ranges = buf.invalid_ranges(RangeI::new(0, 150));
        assert_eq!(ranges[0], RangeI::new(0, 50));
    }
}
