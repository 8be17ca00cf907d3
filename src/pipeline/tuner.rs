//! Tuner session facade — wires capture, buffering and analysis together.
//!
//! [`TunerSession`] owns the full pipeline for one tuning run:
//!
//! ```text
//! start()                     stop()
//!   ├─ configure + activate     ├─ stop analysis task
//!   │  the audio backend        ├─ deactivate the backend
//!   └─ spawn AnalysisTask       └─ log counters, reset the ring
//! ```
//!
//! Between those two calls the session reacts to manual pause/resume and to
//! out-of-band [`SessionEvent`]s: the [`SessionController`] decides what the
//! hardware should do, and the facade keeps the pacing task aligned with the
//! resulting state — running while `Active`, stopped otherwise.  Pause and
//! interruption never touch the ring buffer, so captured audio survives
//! until resume; only [`stop`](TunerSession::stop) resets it.

use tokio::sync::mpsc;

use crate::audio::SharedRingBuffer;
use crate::config::{AppConfig, AudioSettings};
use crate::dsp::{
    AutocorrelationDetector, ConditionerConfig, DetectorConfig, PitchFrame, SignalConditioner,
};
use crate::pipeline::analysis::{AnalysisHandle, AnalysisTask};
use crate::session::{AudioBackend, SessionController, SessionError, SessionEvent, SessionState};

// ---------------------------------------------------------------------------
// TunerSession
// ---------------------------------------------------------------------------

/// One running tuning session.
///
/// # Example
///
/// ```rust,no_run
/// use stringtune::audio::new_shared_ring;
/// use stringtune::config::AppConfig;
/// use stringtune::pipeline::TunerSession;
/// use stringtune::session::CpalBackend;
/// use tokio::sync::mpsc;
///
/// # async fn example() {
/// let config = AppConfig::default();
/// let ring = new_shared_ring(config.audio.ring_capacity());
/// let (event_tx, _event_rx) = mpsc::channel(16);
/// let (frame_tx, mut frame_rx) = mpsc::channel(32);
///
/// let backend = CpalBackend::new(config.audio.clone(), ring.clone(), event_tx);
/// let session = TunerSession::start(backend, ring, &config, frame_tx).unwrap();
///
/// if let Some(frame) = frame_rx.recv().await {
///     println!("pitch: {:?}", frame.frequency);
/// }
/// session.stop().await;
/// # }
/// ```
pub struct TunerSession<B: AudioBackend> {
    controller: SessionController<B>,
    ring: SharedRingBuffer,
    frames: mpsc::Sender<PitchFrame>,
    conditioner: ConditionerConfig,
    detector: DetectorConfig,
    frame_size: usize,
    /// Rate the device actually delivers; analysis is derived from this.
    sample_rate: u32,
    analysis: Option<AnalysisHandle>,
}

impl<B: AudioBackend> TunerSession<B> {
    /// Configure and activate `backend`, then spawn the analysis task.
    ///
    /// Must be called from within a tokio runtime.  `ring` is the buffer the
    /// backend captures into; detection results go out on `frames`.
    ///
    /// # Errors
    ///
    /// [`SessionError::ConfigurationFailed`] or
    /// [`SessionError::ActivationFailed`] when the audio subsystem cannot be
    /// brought up.
    pub fn start(
        backend: B,
        ring: SharedRingBuffer,
        config: &AppConfig,
        frames: mpsc::Sender<PitchFrame>,
    ) -> Result<Self, SessionError> {
        let mut controller = SessionController::new(backend);
        controller.configure()?;
        controller.activate()?;

        // The device may not support the configured rate; lag ranges and
        // frame pacing have to follow the negotiated one.
        let sample_rate = controller
            .backend()
            .sample_rate()
            .unwrap_or(config.audio.sample_rate);

        let mut frame_size = config.audio.frame_size;
        if frame_size == 0 {
            frame_size = AudioSettings::default().frame_size;
            log::warn!("frame_size 0 in settings, using {frame_size}");
        }

        let mut session = Self {
            controller,
            ring,
            frames,
            conditioner: config.conditioner,
            detector: config.detector,
            frame_size,
            sample_rate,
            analysis: None,
        };
        session.spawn_analysis();
        log::info!("tuner session started ({sample_rate} Hz, {frame_size}-sample frames)");
        Ok(session)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.controller.state()
    }

    /// Whether capture and analysis are currently running.
    pub fn is_active(&self) -> bool {
        self.controller.is_active()
    }

    /// Rate the capture device actually runs at, in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Manually pause capture and analysis.
    ///
    /// The ring buffer keeps its contents; [`resume`](Self::resume) picks up
    /// where capture left off.
    pub async fn pause(&mut self) {
        self.controller.pause();
        self.align_analysis().await;
    }

    /// Restart capture and analysis after a pause or interruption.
    ///
    /// # Errors
    ///
    /// [`SessionError::ResumeFailed`] when the stream cannot be restarted;
    /// the caller should [`stop`](Self::stop) the session.
    pub async fn resume(&mut self) -> Result<(), SessionError> {
        let result = self.controller.resume();
        self.align_analysis().await;
        result
    }

    /// Apply one out-of-band session notification.
    ///
    /// # Errors
    ///
    /// [`SessionError::ResumeFailed`] when an interruption-ended event asks
    /// for a resume the hardware refuses; the caller should
    /// [`stop`](Self::stop) the session.
    pub async fn handle_event(&mut self, event: SessionEvent) -> Result<(), SessionError> {
        let result = self.controller.handle_event(event);
        self.align_analysis().await;
        result
    }

    /// Stop the session: end analysis, tear down capture, reset the buffer.
    ///
    /// Teardown is ordered so no write can land after the reset — the
    /// capture callback is uninstalled before the ring is cleared.
    pub async fn stop(mut self) {
        if let Some(handle) = self.analysis.take() {
            handle.stop().await;
        }
        self.controller.deactivate();

        match self.ring.lock() {
            Ok(mut buf) => {
                log::info!(
                    "session stopped: {} underruns, {} samples overflowed, {:.2} s unread audio discarded",
                    buf.underrun_count(),
                    buf.overflow_count(),
                    buf.duration_secs(self.sample_rate)
                );
                buf.reset();
                buf.reset_underrun_count();
            }
            Err(e) => log::warn!("session stop: ring buffer lock poisoned: {e}"),
        }
    }

    /// Keep the pacing task in step with the controller: running while
    /// `Active`, stopped otherwise.  The ring buffer is never reallocated or
    /// reset here.
    async fn align_analysis(&mut self) {
        match self.controller.state() {
            SessionState::Active => {
                if self.analysis.is_none() {
                    self.spawn_analysis();
                }
            }
            SessionState::Interrupted | SessionState::Inactive => {
                if let Some(handle) = self.analysis.take() {
                    handle.stop().await;
                }
            }
        }
    }

    fn spawn_analysis(&mut self) {
        let task = AnalysisTask::new(
            self.ring.clone(),
            SignalConditioner::new(self.conditioner),
            Box::new(AutocorrelationDetector::new(self.detector, self.sample_rate)),
            self.frame_size,
            self.sample_rate,
            self.frames.clone(),
        );
        self.analysis = Some(task.spawn());
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::new_shared_ring;
    use crate::session::backend::MockBackend;
    use crate::session::RouteChangeReason;
    use std::time::Duration;
    use tokio::time::timeout;

    // The mock backend always negotiates 44.1 kHz, so frame sizes double as
    // pacing controls: 1024 ≈ 23 ms per tick, 8192 ≈ 186 ms (slow enough
    // that no tick fires while a test is mid-assertion).
    const FAST_FRAME: usize = 1_024;
    const SLOW_FRAME: usize = 8_192;

    fn test_config(frame_size: usize) -> AppConfig {
        AppConfig {
            audio: AudioSettings {
                sample_rate: 44_100,
                frame_size,
                buffer_secs: 0.25,
                input_device: None,
            },
            conditioner: ConditionerConfig::none(),
            detector: DetectorConfig::default(),
        }
    }

    fn started(
        frame_size: usize,
    ) -> (
        TunerSession<MockBackend>,
        SharedRingBuffer,
        mpsc::Receiver<PitchFrame>,
    ) {
        let ring = new_shared_ring(SLOW_FRAME * 2);
        let (tx, rx) = mpsc::channel(32);
        let session =
            TunerSession::start(MockBackend::ok(), ring.clone(), &test_config(frame_size), tx)
                .unwrap();
        (session, ring, rx)
    }

    fn sine(freq: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| 0.8 * (2.0 * std::f32::consts::PI * freq * i as f32 / 44_100.0).sin())
            .collect()
    }

    // ---- start ----

    #[tokio::test]
    async fn start_activates_and_streams_pitch_frames() {
        let (session, ring, mut rx) = started(FAST_FRAME);
        assert_eq!(session.state(), SessionState::Active);
        assert_eq!(
            session.controller.backend().calls,
            vec!["configure", "activate"]
        );

        // Pretend the capture callback delivered a low A.
        ring.lock().unwrap().write(&sine(220.0, FAST_FRAME * 3));

        let frame = timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("a frame should be emitted within two seconds")
            .expect("channel should still be open");
        let freq = frame.frequency.expect("a clean sine should lock");
        assert!((freq - 220.0).abs() < 2.0, "expected ≈220 Hz, got {freq}");

        session.stop().await;
    }

    #[tokio::test]
    async fn configure_failure_fails_start() {
        let ring = new_shared_ring(SLOW_FRAME);
        let (tx, _rx) = mpsc::channel(32);
        let backend = MockBackend {
            fail_configure: true,
            ..MockBackend::ok()
        };

        // `matches!` on the whole Result: the Ok side is a live session and
        // has no Debug impl for `unwrap_err` to lean on.
        let result = TunerSession::start(backend, ring, &test_config(FAST_FRAME), tx);
        assert!(matches!(result, Err(SessionError::ConfigurationFailed(_))));
    }

    #[tokio::test]
    async fn activation_failure_fails_start() {
        let ring = new_shared_ring(SLOW_FRAME);
        let (tx, _rx) = mpsc::channel(32);
        let backend = MockBackend {
            fail_activate: true,
            ..MockBackend::ok()
        };

        let result = TunerSession::start(backend, ring, &test_config(FAST_FRAME), tx);
        assert!(matches!(result, Err(SessionError::ActivationFailed(_))));
    }

    // ---- interruptions ----

    #[tokio::test]
    async fn interruption_pauses_without_touching_the_buffer() {
        let (mut session, ring, _rx) = started(SLOW_FRAME);
        ring.lock().unwrap().write(&[0.5; 100]);

        session
            .handle_event(SessionEvent::InterruptionBegan)
            .await
            .unwrap();

        assert_eq!(session.state(), SessionState::Interrupted);
        assert!(session.analysis.is_none(), "pacing task should be stopped");
        assert_eq!(
            ring.lock().unwrap().len(),
            100,
            "interruption must preserve captured audio"
        );
        assert_eq!(
            session.controller.backend().calls,
            vec!["configure", "activate", "pause"]
        );

        session.stop().await;
    }

    #[tokio::test]
    async fn interruption_end_resumes_capture_and_analysis() {
        let (mut session, _ring, _rx) = started(SLOW_FRAME);

        session
            .handle_event(SessionEvent::InterruptionBegan)
            .await
            .unwrap();
        session
            .handle_event(SessionEvent::InterruptionEnded {
                should_resume: true,
            })
            .await
            .unwrap();

        assert_eq!(session.state(), SessionState::Active);
        assert!(session.analysis.is_some(), "pacing task should be back");
        assert_eq!(
            session.controller.backend().calls,
            vec!["configure", "activate", "pause", "resume"]
        );

        session.stop().await;
    }

    #[tokio::test]
    async fn interruption_end_without_resume_leaves_session_stopped() {
        let (mut session, _ring, _rx) = started(SLOW_FRAME);

        session
            .handle_event(SessionEvent::InterruptionBegan)
            .await
            .unwrap();
        session
            .handle_event(SessionEvent::InterruptionEnded {
                should_resume: false,
            })
            .await
            .unwrap();

        assert_eq!(session.state(), SessionState::Inactive);
        assert!(session.analysis.is_none());
        assert!(session.controller.backend().calls.contains(&"deactivate"));

        session.stop().await;
    }

    #[tokio::test]
    async fn resume_failure_surfaces_and_stays_interrupted() {
        let ring = new_shared_ring(SLOW_FRAME);
        let (tx, _rx) = mpsc::channel(32);
        let backend = MockBackend {
            fail_resume: true,
            ..MockBackend::ok()
        };
        let mut session =
            TunerSession::start(backend, ring, &test_config(SLOW_FRAME), tx).unwrap();

        session
            .handle_event(SessionEvent::InterruptionBegan)
            .await
            .unwrap();
        let err = session
            .handle_event(SessionEvent::InterruptionEnded {
                should_resume: true,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, SessionError::ResumeFailed(_)));
        assert_eq!(session.state(), SessionState::Interrupted);
        assert!(session.analysis.is_none());

        session.stop().await;
    }

    // ---- route changes ----

    #[tokio::test]
    async fn losing_the_device_stops_the_session() {
        let (mut session, _ring, _rx) = started(SLOW_FRAME);

        session
            .handle_event(SessionEvent::RouteChanged {
                reason: RouteChangeReason::DeviceDisconnected,
            })
            .await
            .unwrap();

        assert_eq!(session.state(), SessionState::Inactive);
        assert!(session.analysis.is_none());
        assert!(session.controller.backend().calls.contains(&"deactivate"));

        session.stop().await;
    }

    #[tokio::test]
    async fn informational_route_change_keeps_running() {
        let (mut session, _ring, _rx) = started(SLOW_FRAME);

        session
            .handle_event(SessionEvent::RouteChanged {
                reason: RouteChangeReason::NewDeviceAvailable,
            })
            .await
            .unwrap();

        assert_eq!(session.state(), SessionState::Active);
        assert!(session.analysis.is_some());

        session.stop().await;
    }

    // ---- manual pause / resume ----

    #[tokio::test]
    async fn manual_pause_resume_cycle() {
        let (mut session, _ring, _rx) = started(SLOW_FRAME);

        session.pause().await;
        assert_eq!(session.state(), SessionState::Interrupted);
        assert!(session.analysis.is_none());

        session.resume().await.unwrap();
        assert_eq!(session.state(), SessionState::Active);
        assert!(session.analysis.is_some());
        assert_eq!(
            session.controller.backend().calls,
            vec!["configure", "activate", "pause", "resume"]
        );

        session.stop().await;
    }

    // ---- stop ----

    #[tokio::test]
    async fn stop_resets_the_buffer_after_teardown() {
        let (session, ring, _rx) = started(SLOW_FRAME);
        ring.lock().unwrap().write(&[0.5; 100]);

        // The unread audio stop() reports as discarded: 100 samples at the
        // negotiated rate.
        let pending = ring.lock().unwrap().duration_secs(session.sample_rate());
        assert!((pending - 100.0 / 44_100.0).abs() < 1e-6);

        session.stop().await;

        let buf = ring.lock().unwrap();
        assert_eq!(buf.len(), 0, "stop must clear captured audio");
        assert_eq!(buf.capacity(), SLOW_FRAME * 2);
        assert_eq!(buf.underrun_count(), 0);
    }
}
