use gd_core::Int2;
use gd_core::Rect;

/// Outcome of feeding one pointer event to a [`Click`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickResult {
    None,
    Started,
    Drag,
    Finished,
    Aborted,
    Double,
}

/// Tracks a press/drag/release gesture of one pointer button inside bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Click {
    active: bool,
    bounds: Rect,
    start_pos: Int2,
    pos: Int2,
}

const MOVE_THRESHOLD: f32 = 2.0;

impl Click {
    pub fn new(bounds: Rect) -> Self {
        Self {
            bounds,
            ..Self::default()
        }
    }

    pub fn set_bounds(&mut self, bounds: Rect) {
        self.bounds = bounds;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// `clicks` is the platform click count for this press (2 for a double click).
    pub fn press(&mut self, pos: Int2, clicks: u8) -> ClickResult {
        if clicks == 2 && self.bounds.contains(pos) {
            self.pos = pos;
            return ClickResult::Double;
        }
        if !self.active && self.bounds.contains(pos) {
            self.active = true;
            self.start_pos = pos;
            self.pos = pos;
            return ClickResult::Started;
        }
        ClickResult::None
    }

    pub fn motion(&mut self, pos: Int2) -> ClickResult {
        if !self.active {
            return ClickResult::None;
        }
        self.pos = pos;
        ClickResult::Drag
    }

    pub fn release(&mut self, pos: Int2) -> ClickResult {
        if !self.active {
            return ClickResult::None;
        }
        self.active = false;
        self.pos = pos;
        if self.bounds.contains(pos) {
            ClickResult::Finished
        } else {
            ClickResult::Aborted
        }
    }

    pub fn cancel(&mut self) {
        self.active = false;
    }

    pub fn is_moved(&self) -> bool {
        self.start_pos.dist(self.pos) > MOVE_THRESHOLD
    }

    pub fn pos(&self) -> Int2 {
        self.pos
    }

    pub fn start_pos(&self) -> Int2 {
        self.start_pos
    }

    /// Rectangle between press and current position, normalized.
    pub fn rect(&self) -> Rect {
        Rect::from_corners(self.start_pos, self.pos)
    }

    pub fn delta(&self) -> Int2 {
        self.pos.sub(self.start_pos)
    }
}

#[cfg(test)]
mod tests {
    use super::Click;
    use super::ClickResult;
    use gd_core::Int2;
    use gd_core::Rect;

    fn click() -> Click {
        Click::new(Rect::new(0, 0, 800, 600))
    }

    #[test]
    fn press_drag_release_inside_finishes() {
        let mut click = click();
        assert_eq!(click.press(Int2::new(10, 10), 1), ClickResult::Started);
        assert_eq!(click.motion(Int2::new(50, 30)), ClickResult::Drag);
        assert!(click.is_moved());
        assert_eq!(click.release(Int2::new(50, 30)), ClickResult::Finished);
        assert!(!click.is_active());
        assert_eq!(click.delta(), Int2::new(40, 20));
    }

    #[test]
    fn release_outside_aborts() {
        let mut click = click();
        click.press(Int2::new(10, 10), 1);
        assert_eq!(click.release(Int2::new(900, 10)), ClickResult::Aborted);
    }

    #[test]
    fn small_jitter_is_not_a_move() {
        let mut click = click();
        click.press(Int2::new(10, 10), 1);
        click.motion(Int2::new(11, 11));
        assert!(!click.is_moved());
    }

    #[test]
    fn motion_without_press_is_ignored() {
        let mut click = click();
        assert_eq!(click.motion(Int2::new(5, 5)), ClickResult::None);
        assert_eq!(click.release(Int2::new(5, 5)), ClickResult::None);
    }

    #[test]
    fn double_press_reports_double() {
        let mut click = click();
        assert_eq!(click.press(Int2::new(5, 5), 2), ClickResult::Double);
    }

    #[test]
    fn rect_is_normalized_for_reverse_drags() {
        let mut click = click();
        click.press(Int2::new(100, 100), 1);
        click.motion(Int2::new(20, 40));
        assert_eq!(click.rect(), Rect::new(20, 40, 80, 60));
    }
}
