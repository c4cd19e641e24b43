use core::time::Duration;
use std::{path::Path, time::Instant};

use desktop_capture::{CaptureBackend, CaptureError, CaptureOutcome, CaptureSession};
use image::{ImageFormat, RgbImage};
use thiserror::Error;
use tracing::{info, info_span, warn};

/// Captures attempted before a snapshot gives up waiting for a fresh frame.
const SNAPSHOT_ATTEMPTS: usize = 300;

/// Counts of capture outcomes since the last report.
#[derive(Debug)]
pub struct CaptureStats {
    interval: Duration,
    since: Instant,
    fresh: u64,
    retained: u64,
    absent: u64,
    failed: u64,
}

impl CaptureStats {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            since: Instant::now(),
            fresh: 0,
            retained: 0,
            absent: 0,
            failed: 0,
        }
    }

    pub fn record(&mut self, outcome: &CaptureOutcome) {
        match outcome {
            CaptureOutcome::Fresh(_) => self.fresh += 1,
            CaptureOutcome::Retained(_) => self.retained += 1,
            CaptureOutcome::Absent => self.absent += 1,
        }
    }

    pub fn record_failure(&mut self) {
        self.failed += 1;
    }

    pub fn total(&self) -> u64 {
        self.fresh + self.retained + self.absent + self.failed
    }

    /// Logs and resets the counts once the interval has passed.
    pub fn report_if_due(&mut self, last_capture: Duration) {
        if self.interval.is_zero() {
            return;
        }

        let elapsed = self.since.elapsed();
        if elapsed < self.interval {
            return;
        }

        let fps = self.total() as f64 / elapsed.as_secs_f64();
        info!(
            "{fps:.1} captures/s {{ fresh: {}, retained: {}, absent: {}, failed: {}, last capture: {last_capture:?} }}",
            self.fresh, self.retained, self.absent, self.failed
        );

        *self = Self::new(self.interval);
    }
}

/// Captures and paces frames until a capture fails in a way retrying cannot fix.
///
/// Transient failures, such as the duplication being refused while the secure desktop is
/// shown, are logged and the next capture retries.
pub fn run<B: CaptureBackend>(
    session: &mut CaptureSession<B>,
    report_interval: Duration,
) -> Result<(), CaptureError<B::Error>> {
    let _span = info_span!("[Capture Loop]").entered();
    let mut stats = CaptureStats::new(report_interval);

    loop {
        match session.capture() {
            Ok(outcome) => stats.record(&outcome),

            Err(error) if error.is_transient() => {
                warn!("Capture failed, retrying:\n{error}");
                stats.record_failure();
            }

            Err(error) => return Err(error),
        }

        stats.report_if_due(session.last_capture_duration());
        session.delay_next_capture();
    }
}

/// Saves the first fresh frame as a PNG at `path`.
pub fn save_snapshot<B: CaptureBackend>(
    session: &mut CaptureSession<B>,
    path: &Path,
) -> Result<(), SnapshotError<B::Error>> {
    let _span = info_span!("[Snapshot]").entered();

    let [width, height] = session.capture_size().ok_or(SnapshotError::NoFrame)?;

    for _ in 0..SNAPSHOT_ATTEMPTS {
        if let CaptureOutcome::Fresh(frame) = session.capture()? {
            let image =
                RgbImage::from_raw(width, height, frame.to_vec()).ok_or(SnapshotError::Size)?;
            image.save_with_format(path, ImageFormat::Png)?;

            info!("Saved {width}×{height} snapshot to {}", path.display());
            return Ok(());
        }

        session.delay_next_capture();
    }

    Err(SnapshotError::NoFrame)
}

#[derive(Debug, Error)]
pub enum SnapshotError<E> {
    #[error("Failed to capture a frame:\n{0}")]
    Capture(#[from] CaptureError<E>),

    #[error("No fresh frame arrived, is the display asleep?")]
    NoFrame,

    #[error("The frame does not match the capture size")]
    Size,

    #[error("Failed to save the snapshot:\n{0}")]
    Save(#[from] image::ImageError),
}
