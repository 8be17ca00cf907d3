//! Frame-paced analysis task — the consumer half of the audio pipeline.
//!
//! [`AnalysisTask`] ticks once per frame period and pulls the oldest frame
//! out of the shared ring buffer:
//!
//! ```text
//!          every frame_size / sample_rate seconds
//!                        │
//! RingBuffer ─read_into──▶ SignalConditioner ──▶ PitchDetector
//! (locked only                                        │
//!  around the read)                                   ▼
//!                                    mpsc::Sender<PitchFrame> (try_send)
//! ```
//!
//! The ring-buffer lock is held only for the `read_into` itself, never
//! across conditioning or detection, so the real-time capture callback is
//! starved for at most one memcpy.  Results are published with a
//! non-blocking send: when the consumer lags, frames are dropped on the
//! producer side instead of stalling the pacing loop.

use std::time::Duration;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::audio::SharedRingBuffer;
use crate::dsp::{PitchDetector, PitchFrame, SignalConditioner};

// ---------------------------------------------------------------------------
// AnalysisTask
// ---------------------------------------------------------------------------

/// Periodic frame → condition → detect → publish loop.
///
/// Build one with [`AnalysisTask::new`] and put it on the runtime with
/// [`spawn`](Self::spawn).  The task ends when the returned
/// [`AnalysisHandle`] is stopped (or dropped), when the frame channel
/// closes, or when the ring-buffer lock is poisoned.
pub struct AnalysisTask {
    ring: SharedRingBuffer,
    conditioner: SignalConditioner,
    detector: Box<dyn PitchDetector>,
    frame_size: usize,
    period: Duration,
    frames: mpsc::Sender<PitchFrame>,
}

impl AnalysisTask {
    /// Create a task analyzing `frame_size`-sample frames at the cadence
    /// they are produced (`frame_size / sample_rate` seconds).
    ///
    /// Degenerate values are clamped to keep the period finite: a zero
    /// frame size or sample rate is treated as 1.
    pub fn new(
        ring: SharedRingBuffer,
        conditioner: SignalConditioner,
        detector: Box<dyn PitchDetector>,
        frame_size: usize,
        sample_rate: u32,
        frames: mpsc::Sender<PitchFrame>,
    ) -> Self {
        let frame_size = frame_size.max(1);
        let period = Duration::from_secs_f64(frame_size as f64 / sample_rate.max(1) as f64);
        Self {
            ring,
            conditioner,
            detector,
            frame_size,
            period,
            frames,
        }
    }

    /// Spawn the loop onto the current tokio runtime.
    pub fn spawn(self) -> AnalysisHandle {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(self.run(shutdown_rx));
        AnalysisHandle {
            shutdown: shutdown_tx,
            task,
        }
    }

    async fn run(mut self, mut shutdown: oneshot::Receiver<()>) {
        log::debug!(
            "analysis: task started ({} samples per frame, {:.1} ms period)",
            self.frame_size,
            self.period.as_secs_f64() * 1000.0
        );

        // The first frame cannot exist before one frame period has elapsed,
        // so the first tick is scheduled one period out.
        let start = tokio::time::Instant::now() + self.period;
        let mut ticker = tokio::time::interval_at(start, self.period);
        // After a stall, skip ahead instead of bursting: the ring only holds
        // the newest samples anyway.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut frame = vec![0.0f32; self.frame_size];

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {
                    if !self.analyze_once(&mut frame) {
                        break;
                    }
                }
            }
        }

        log::debug!("analysis: task stopped");
    }

    /// One tick: read a frame, condition, detect, publish.
    ///
    /// Returns `false` when the task should wind down.
    fn analyze_once(&mut self, frame: &mut [f32]) -> bool {
        let filled = match self.ring.lock() {
            Ok(mut buf) => buf.read_into(frame),
            Err(e) => {
                log::error!("analysis: ring buffer lock poisoned, stopping: {e}");
                return false;
            }
        };
        // Not enough samples yet; the buffer has already counted the
        // underrun.
        if !filled {
            return true;
        }

        let conditioned = self.conditioner.condition(frame);
        let result = self.detector.detect(&conditioned);

        match self.frames.try_send(result) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                // Slow consumer — drop this frame rather than stall pacing.
                log::debug!("analysis: frame channel full, dropping result");
                true
            }
            Err(TrySendError::Closed(_)) => {
                log::info!("analysis: frame channel closed, stopping");
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// AnalysisHandle
// ---------------------------------------------------------------------------

/// Handle to a spawned [`AnalysisTask`].
///
/// Dropping the handle also ends the task (the shutdown sender closes);
/// [`stop`](Self::stop) does the same but waits until the loop has actually
/// wound down.
pub struct AnalysisHandle {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl AnalysisHandle {
    /// Signal shutdown and wait for the loop to finish.
    pub async fn stop(self) {
        // Sending (rather than just dropping) wakes the task immediately
        // instead of on its next tick.
        let _ = self.shutdown.send(());
        if let Err(e) = self.task.await {
            log::warn!("analysis: task ended abnormally: {e}");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
