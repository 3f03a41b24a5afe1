/// Command-line options of the headless driver.
#[derive(Debug, Clone, PartialEq, Eq)]
struct DriverOptions {
    url: String,
    width: i32,
    height: i32,
    /// Pixels to scroll after the page has loaded; negative scrolls up.
    scroll: i32,
    frames: u32,
    line_height: Option<i32>,
    smooth: bool,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_owned(),
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            scroll: 0,
            frames: DEFAULT_FRAMES,
            line_height: None,
            smooth: true,
        }
    }
}

impl DriverOptions {
    fn session_config(&self) -> SessionConfig {
        let mut config = SessionConfig {
            smooth_scrolling: self.smooth,
            ..SessionConfig::default()
        };
        if let Some(line_height) = self.line_height {
            config.line_height = line_height;
        }
        config
    }
}

/// What the driver saw after the last frame.
#[derive(Debug, Default)]
struct DriveSummary {
    frames: u32,
    draw_calls: usize,
    scroll_y: i32,
    visible_lines: Vec<String>,
    events: Vec<String>,
}
