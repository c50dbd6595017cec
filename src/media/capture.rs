//! Live media capture with a bounded recording window.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::time::Instant;

use crate::error::AssessmentError;
use crate::media::artifact::MediaArtifact;
use crate::media::backend::{DeviceStream, MediaBackend, StreamConstraints};

/// Interval between preview updates while recording.
const PREVIEW_TICK: Duration = Duration::from_millis(100);

/// Observer of the live stream while a recording is in progress.
///
/// The preview is attached when capture starts and detached when it stops;
/// no observation happens outside that window.
pub trait PreviewSink {
    fn observe(&mut self, level: f32, elapsed: Duration);
    fn detach(&mut self);
}

/// Preview that ignores everything.
pub struct NullPreview;

impl PreviewSink for NullPreview {
    fn observe(&mut self, _level: f32, _elapsed: Duration) {}
    fn detach(&mut self) {}
}

/// Terminal level meter drawn on a single line.
pub struct LevelMeter {
    width: usize,
}

impl LevelMeter {
    pub fn new() -> Self {
        Self { width: 24 }
    }
}

impl Default for LevelMeter {
    fn default() -> Self {
        Self::new()
    }
}

impl PreviewSink for LevelMeter {
    fn observe(&mut self, level: f32, elapsed: Duration) {
        let filled = ((level.clamp(0.0, 1.0) * self.width as f32).round() as usize).min(self.width);
        let bar: String = "█".repeat(filled) + &"░".repeat(self.width - filled);
        let secs = elapsed.as_secs();
        eprint!(
            "\r  {} {}  {:01}:{:02}  (Enter to stop)",
            console::style("●").red(),
            bar,
            secs / 60,
            secs % 60
        );
    }

    fn detach(&mut self) {
        eprint!("\r{}\r", " ".repeat(self.width + 32));
    }
}

/// Owns the device stream for one recording attempt.
///
/// Only this type starts and stops the stream; device tracks are released
/// on every exit path, including the wall-clock timeout and drop.
pub struct MediaCapture<'a> {
    backend: &'a dyn MediaBackend,
    max_duration: Duration,
    stream: Option<Box<dyn DeviceStream>>,
    started_at: Option<Instant>,
}

impl<'a> MediaCapture<'a> {
    pub fn new(backend: &'a dyn MediaBackend, max_duration: Duration) -> Self {
        Self {
            backend,
            max_duration,
            stream: None,
            started_at: None,
        }
    }

    /// Acquires the devices and starts buffering.
    ///
    /// # Errors
    /// - [`AssessmentError::DeviceAccess`] if the devices cannot be opened
    /// - [`AssessmentError::InvalidTransition`] if a recording is already
    ///   active
    pub fn start(&mut self, constraints: &StreamConstraints) -> Result<(), AssessmentError> {
        if self.stream.is_some() {
            return Err(AssessmentError::InvalidTransition(
                "a recording is already active".to_string(),
            ));
        }

        let stream = self.backend.open_stream(constraints)?;
        tracing::info!(
            "Recording started ({}Hz, video: {})",
            stream.sample_rate(),
            stream.has_video()
        );
        self.stream = Some(stream);
        self.started_at = Some(Instant::now());
        Ok(())
    }

    pub fn is_recording(&self) -> bool {
        self.stream.is_some()
    }

    /// Time since the recording started, zero when idle.
    pub fn elapsed(&self) -> Duration {
        self.started_at
            .map(|t| t.elapsed())
            .unwrap_or(Duration::ZERO)
    }

    /// Stops the recording and finalizes the buffered data.
    ///
    /// Idempotent: returns `Ok(None)` when no recording is active. The
    /// returned artifact may be empty; validating that is the session's
    /// job.
    pub fn stop(&mut self) -> Result<Option<MediaArtifact>, AssessmentError> {
        let Some(stream) = self.stream.take() else {
            return Ok(None);
        };
        self.started_at = None;
        let artifact = stream.finish()?;
        tracing::info!(
            "Recording finalized: {} artifact, {} bytes",
            artifact.kind(),
            artifact.size()
        );
        Ok(Some(artifact))
    }

    /// Stops the recording and discards whatever was captured.
    pub fn abort(&mut self) {
        if let Some(stream) = self.stream.take() {
            stream.abort();
            tracing::info!("Recording aborted");
        }
        self.started_at = None;
    }

    /// Drives an active recording to completion.
    ///
    /// Feeds `preview` while the stream is live and stops when `stop` is
    /// set or the maximum duration is reached, whichever comes first.
    /// Returns the finalized artifact and the recording's elapsed time.
    pub async fn run(
        &mut self,
        preview: &mut dyn PreviewSink,
        stop: &AtomicBool,
    ) -> Result<(MediaArtifact, Duration), AssessmentError> {
        let started_at = self.started_at.ok_or_else(|| {
            AssessmentError::InvalidTransition("no recording is active".to_string())
        })?;
        let deadline = started_at + self.max_duration;

        loop {
            if stop.load(Ordering::Relaxed) {
                break;
            }
            if Instant::now() >= deadline {
                tracing::info!(
                    "Maximum recording duration of {}s reached, stopping",
                    self.max_duration.as_secs()
                );
                break;
            }

            if let Some(stream) = &self.stream {
                preview.observe(stream.level(), started_at.elapsed());
            }
            tokio::time::sleep(PREVIEW_TICK).await;
        }

        preview.detach();
        let elapsed = started_at.elapsed().min(self.max_duration);
        let artifact = self
            .stop()?
            .expect("stream present while recording loop was running");
        Ok((artifact, elapsed))
    }
}

impl Drop for MediaCapture<'_> {
    fn drop(&mut self) {
        self.abort();
    }
}
