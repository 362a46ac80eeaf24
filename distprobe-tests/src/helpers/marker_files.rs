//! Side-effect checks for launched scripts using marker files

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::time::{Instant, sleep};

#[derive(Clone)]
pub struct MarkerFileHelper {
    base_dir: PathBuf,
}

impl MarkerFileHelper {
    pub fn new(base_dir: &Path) -> Self {
        Self {
            base_dir: base_dir.to_path_buf(),
        }
    }

    pub fn marker_path(&self, name: &str) -> PathBuf {
        self.base_dir.join(format!("{}.marker", name))
    }

    /// Shell line appending the current time to a marker, for use inside
    /// fake start scripts.
    pub fn append_line_command(&self, name: &str) -> String {
        format!("date +%s >> '{}'", self.marker_path(name).display())
    }

    pub fn marker_exists(&self, name: &str) -> bool {
        self.marker_path(name).exists()
    }

    pub async fn wait_for_marker(&self, name: &str, timeout: Duration) -> bool {
        let marker_path = self.marker_path(name);
        let start = Instant::now();

        while start.elapsed() < timeout {
            if marker_path.exists() {
                return true;
            }
            sleep(Duration::from_millis(50)).await;
        }

        false
    }

    /// Number of lines in a marker, zero if it does not exist.
    pub fn count_marker_lines(&self, name: &str) -> usize {
        std::fs::read_to_string(self.marker_path(name))
            .map(|content| content.lines().count())
            .unwrap_or(0)
    }

    /// True if the marker stops growing for `quiet` (nobody is writing it).
    pub async fn marker_is_quiet(&self, name: &str, quiet: Duration) -> bool {
        let before = self.count_marker_lines(name);
        sleep(quiet).await;
        self.count_marker_lines(name) == before
    }

    pub fn read_marker(&self, name: &str) -> Option<String> {
        std::fs::read_to_string(self.marker_path(name)).ok()
    }
}
