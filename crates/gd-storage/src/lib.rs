//! Tab persistence: navigation history, reload intervals, saved session state and downloads.

mod codec;
mod downloads;
mod history;
mod session_state;

pub use downloads::download_file_name;
pub use downloads::save_to_downloads;
pub use history::History;
pub use history::MAX_HISTORY_ENTRIES;
pub use history::RecentUrl;
pub use session_state::CORRUPT_URL_MARKER;
pub use session_state::PersistedSession;
pub use session_state::ReloadInterval;
