//! Project-wide constants.

use std::path::PathBuf;
use std::time::Duration;

pub const AUTHOR: &str = env!("CARGO_PKG_AUTHORS");
pub const HOMEPAGE: &str = env!("CARGO_PKG_HOMEPAGE");
pub const REPO: &str = env!("CARGO_PKG_REPOSITORY");

/// Endpoint that hands out signed upload credentials.
pub const DEFAULT_AUTH_URL: &str = "http://localhost:3000/api/upload-auth";

/// ImageKit upload API.
pub const DEFAULT_UPLOAD_URL: &str = "https://upload.imagekit.io/api/v1/files/upload";

/// Remote folder uploads land in.
pub const UPLOAD_FOLDER: &str = "pixora-uploads";

/// Largest image accepted for upload (10 MB).
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Delay between two existence checks of a combined locator.
pub const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Checks before a job is resolved fail-open (5 minutes at the default interval).
pub const MAX_POLL_ATTEMPTS: u32 = 60;

/// Progress reported as soon as a job starts polling.
pub const INITIAL_PROGRESS: u8 = 10;

/// Progress never exceeds this until the job actually completes.
pub const PROGRESS_CEILING: u8 = 90;

/// Number of completed jobs kept in the session history.
pub const HISTORY_LIMIT: usize = 3;

/// Prefix of exported file names (`pixora-<millis>.<format>`).
pub const EXPORT_PREFIX: &str = "pixora";

/// Default database path: `~/.pixora/pixora.db`.
/// Holds the key-value config store.
pub fn default_db_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".pixora")
        .join("pixora.db")
}

/// Milliseconds since the unix epoch.
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Render a progress value as a fixed-width bar (e.g. `[#####.....]  50%`).
pub fn progress_bar(progress: u8) -> String {
    let progress = progress.min(100);
    let filled = (progress as usize) / 10;
    format!(
        "[{}{}] {:>3}%",
        "#".repeat(filled),
        ".".repeat(10 - filled),
        progress
    )
}
