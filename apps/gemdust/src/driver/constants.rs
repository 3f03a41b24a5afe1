const DEFAULT_URL: &str = "about:help";
const DEFAULT_WIDTH: i32 = 800;
const DEFAULT_HEIGHT: i32 = 600;
const DEFAULT_FRAMES: u32 = 30;
const MAX_EVENT_BYTES: usize = 256 * 1024;
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);
const FETCH_POLL_INTERVAL: Duration = Duration::from_millis(5);
const FRAME_INTERVAL: Duration = Duration::from_millis(16);
