//! Transfer progress tracking and terminal rendering

use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;

const BAR_WIDTH: usize = 40;
const REFRESH_INTERVAL: Duration = Duration::from_millis(100);

/// Byte counter for one transfer, shared between the writer and the renderer
#[derive(Debug, Clone)]
pub struct TransferProgress {
    inner: Arc<ProgressState>,
}

#[derive(Debug)]
struct ProgressState {
    current: AtomicU64,
    total: Option<u64>,
    started: Instant,
    finished: AtomicBool,
}

impl TransferProgress {
    /// Start tracking a transfer of `total` bytes, if known
    pub fn new(total: Option<u64>) -> Self {
        Self {
            inner: Arc::new(ProgressState {
                current: AtomicU64::new(0),
                total,
                started: Instant::now(),
                finished: AtomicBool::new(false),
            }),
        }
    }

    /// Record `bytes` more transferred
    pub fn add(&self, bytes: u64) {
        self.inner.current.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn current(&self) -> u64 {
        self.inner.current.load(Ordering::Relaxed)
    }

    pub fn total(&self) -> Option<u64> {
        self.inner.total
    }

    /// Percent complete; 0 when the total is unknown
    pub fn percentage(&self) -> f64 {
        match self.inner.total {
            Some(total) if total > 0 => {
                (self.current() as f64 / total as f64 * 100.0).min(100.0)
            },
            _ => 0.0,
        }
    }

    /// Average bytes per second since the transfer started
    pub fn speed(&self) -> f64 {
        let elapsed = self.inner.started.elapsed().as_secs_f64();
        if elapsed <= 0.0 {
            return 0.0;
        }
        self.current() as f64 / elapsed
    }

    pub fn finish(&self) {
        self.inner.finished.store(true, Ordering::Release);
    }

    pub fn is_finished(&self) -> bool {
        self.inner.finished.load(Ordering::Acquire)
    }

    /// Render as `[=====>    ] 42.0% 1.21 MB/s`
    pub fn render_line(&self) -> String {
        let percentage = self.percentage();
        let completed = ((percentage / 100.0) * BAR_WIDTH as f64) as usize;

        let mut line = String::with_capacity(BAR_WIDTH + 24);
        line.push('[');
        for i in 0..BAR_WIDTH {
            line.push(match i.cmp(&completed) {
                std::cmp::Ordering::Less => '=',
                std::cmp::Ordering::Equal => '>',
                std::cmp::Ordering::Greater => ' ',
            });
        }
        line.push(']');
        line.push_str(&format!(" {:.1}% {}", percentage, format_speed(self.speed())));
        line
    }
}

/// Format a transfer rate in bytes per second
pub fn format_speed(bytes_per_sec: f64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = 1024.0 * 1024.0;

    if bytes_per_sec > MB {
        format!("{:.2} MB/s", bytes_per_sec / MB)
    } else if bytes_per_sec > KB {
        format!("{:.2} KB/s", bytes_per_sec / KB)
    } else {
        format!("{:.0} B/s", bytes_per_sec)
    }
}

/// A progress bar redrawn on stderr until the transfer finishes.
///
/// Dropping the display stops the renderer on its next tick.
#[derive(Debug)]
pub struct ProgressDisplay {
    progress: TransferProgress,
    renderer: Option<JoinHandle<()>>,
}

impl ProgressDisplay {
    /// Spawn the renderer for `progress`
    pub fn start(progress: TransferProgress, label: String) -> Self {
        let tracked = progress.clone();
        let renderer = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(REFRESH_INTERVAL);
            loop {
                ticker.tick().await;
                let done = tracked.is_finished();
                draw(&label, &tracked, done);
                if done {
                    break;
                }
            }
        });

        Self {
            progress,
            renderer: Some(renderer),
        }
    }

    pub fn progress(&self) -> &TransferProgress {
        &self.progress
    }

    /// Mark the transfer finished and wait for the final redraw
    pub async fn finish(mut self) {
        self.progress.finish();
        if let Some(renderer) = self.renderer.take() {
            let _ = renderer.await;
        }
    }
}

fn draw(label: &str, progress: &TransferProgress, done: bool) {
    let mut stderr = std::io::stderr().lock();
    let _ = write!(stderr, "\r{} {}", label, progress.render_line());
    if done {
        let _ = writeln!(stderr);
    }
    let _ = stderr.flush();
}

impl Drop for ProgressDisplay {
    fn drop(&mut self) {
        self.progress.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage() {
        let progress = TransferProgress::new(Some(200));
        assert_eq!(progress.percentage(), 0.0);
        progress.add(50);
        assert_eq!(progress.current(), 50);
        assert_eq!(progress.percentage(), 25.0);
        progress.add(150);
        assert_eq!(progress.percentage(), 100.0);
    }

    #[test]
    fn test_unknown_total() {
        let progress = TransferProgress::new(None);
        progress.add(1024);
        assert_eq!(progress.total(), None);
        assert_eq!(progress.percentage(), 0.0);
    }

    #[test]
    fn test_clones_share_counter() {
        let progress = TransferProgress::new(Some(10));
        let other = progress.clone();
        other.add(4);
        assert_eq!(progress.current(), 4);
        other.finish();
        assert!(progress.is_finished());
    }

    #[test]
    fn test_render_line() {
        let progress = TransferProgress::new(Some(100));
        progress.add(50);
        let line = progress.render_line();
        assert!(line.starts_with(&format!("[{}>{}]", "=".repeat(20), " ".repeat(19))));
        assert!(line.contains(" 50.0% "));

        progress.add(50);
        let line = progress.render_line();
        assert!(line.starts_with(&format!("[{}]", "=".repeat(40))));
        assert!(line.contains(" 100.0% "));
    }

    #[test]
    fn test_format_speed() {
        assert_eq!(format_speed(512.0), "512 B/s");
        assert_eq!(format_speed(1536.0), "1.50 KB/s");
        assert_eq!(format_speed(1.21 * 1024.0 * 1024.0), "1.21 MB/s");
    }

    #[tokio::test]
    async fn test_display_stops_when_finished() {
        let progress = TransferProgress::new(Some(10));
        let display = ProgressDisplay::start(progress.clone(), "test".to_string());
        progress.add(10);
        tokio::time::timeout(Duration::from_secs(2), display.finish())
            .await
            .unwrap();
        assert!(progress.is_finished());
    }
}
