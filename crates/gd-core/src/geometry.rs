/// Integer point or size in layout pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Int2 {
    pub x: i32,
    pub y: i32,
}

impl Int2 {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn add(self, other: Self) -> Self {
        Self::new(
            self.x.saturating_add(other.x),
            self.y.saturating_add(other.y),
        )
    }

    pub fn sub(self, other: Self) -> Self {
        Self::new(
            self.x.saturating_sub(other.x),
            self.y.saturating_sub(other.y),
        )
    }

    pub fn add_y(self, dy: i32) -> Self {
        Self::new(self.x, self.y.saturating_add(dy))
    }

    pub fn min(self, other: Self) -> Self {
        Self::new(self.x.min(other.x), self.y.min(other.y))
    }

    pub fn max(self, other: Self) -> Self {
        Self::new(self.x.max(other.x), self.y.max(other.y))
    }

    /// Euclidean distance between two points.
    pub fn dist(self, other: Self) -> f32 {
        let dx = (self.x - other.x) as f32;
        let dy = (self.y - other.y) as f32;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Half-open vertical or horizontal span, `start..end`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RangeI {
    pub start: i32,
    pub end: i32,
}

impl RangeI {
    pub const fn new(start: i32, end: i32) -> Self {
        Self { start, end }
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn len(&self) -> i32 {
        (self.end - self.start).max(0)
    }

    pub fn contains(&self, value: i32) -> bool {
        value >= self.start && value < self.end
    }

    pub fn overlaps(&self, other: &Self) -> bool {
        !self.is_empty() && !other.is_empty() && self.start < other.end && other.start < self.end
    }

    pub fn intersect(&self, other: &Self) -> Self {
        let out = Self::new(self.start.max(other.start), self.end.min(other.end));
        if out.is_empty() { Self::default() } else { out }
    }

    pub fn union(&self, other: &Self) -> Self {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Self::new(self.start.min(other.start), self.end.max(other.end))
    }
}

/// Axis-aligned rectangle with top-left position and size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Rect {
    pub pos: Int2,
    pub size: Int2,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            pos: Int2::new(x, y),
            size: Int2::new(width, height),
        }
    }

    /// Builds a rectangle spanning two arbitrary corners.
    pub fn from_corners(a: Int2, b: Int2) -> Self {
        let top_left = a.min(b);
        let bottom_right = a.max(b);
        Self {
            pos: top_left,
            size: bottom_right.sub(top_left),
        }
    }

    pub fn left(&self) -> i32 {
        self.pos.x
    }

    pub fn right(&self) -> i32 {
        self.pos.x + self.size.x
    }

    pub fn top(&self) -> i32 {
        self.pos.y
    }

    pub fn bottom(&self) -> i32 {
        self.pos.y + self.size.y
    }

    pub fn width(&self) -> i32 {
        self.size.x
    }

    pub fn height(&self) -> i32 {
        self.size.y
    }

    pub fn mid(&self) -> Int2 {
        Int2::new(self.pos.x + self.size.x / 2, self.pos.y + self.size.y / 2)
    }

    pub fn is_empty(&self) -> bool {
        self.size.x <= 0 || self.size.y <= 0
    }

    pub fn contains(&self, point: Int2) -> bool {
        point.x >= self.left()
            && point.x < self.right()
            && point.y >= self.top()
            && point.y < self.bottom()
    }

    /// Grows the rectangle by `amount` on every side.
    pub fn expanded(&self, amount: i32) -> Self {
        Self::new(
            self.pos.x - amount,
            self.pos.y - amount,
            self.size.x + 2 * amount,
            self.size.y + 2 * amount,
        )
    }

    pub fn moved(&self, offset: Int2) -> Self {
        Self {
            pos: self.pos.add(offset),
            size: self.size,
        }
    }

    pub fn y_span(&self) -> RangeI {
        RangeI::new(self.top(), self.bottom())
    }
}

#[cfg(test)]
mod tests {
    use super::Int2;
    use super::RangeI;
    use super::Rect;

    #[test]
    fn corners_normalize_reversed_drag() {
        let forward = Rect::from_corners(Int2::new(10, 40), Int2::new(30, 90));
        let reverse = Rect::from_corners(Int2::new(30, 90), Int2::new(10, 40));
        assert_eq!(forward, reverse);
        assert_eq!(forward.size, Int2::new(20, 50));
    }

    #[test]
    fn expanded_rect_closes_gaps() {
        let link = Rect::new(0, 20, 100, 20);
        assert!(!link.contains(Int2::new(5, 41)));
        assert!(link.expanded(3).contains(Int2::new(5, 41)));
    }

    #[test]
    fn range_overlap_and_intersection() {
        let tile = RangeI::new(0, 100);
        assert!(tile.overlaps(&RangeI::new(90, 120)));
        assert!(!tile.overlaps(&RangeI::new(100, 120)));
        assert_eq!(tile.intersect(&RangeI::new(50, 150)), RangeI::new(50, 100));
        assert!(tile.intersect(&RangeI::new(200, 300)).is_empty());
        assert_eq!(RangeI::default().union(&tile), tile);
    }
}
