//! Backend seam between the session state machine and the capture hardware.
//!
//! [`SessionController`](crate::session::SessionController) never talks to
//! `cpal` directly; it drives an [`AudioBackend`].  [`CpalBackend`] is the
//! production implementation wrapping [`AudioCapture`], and tests use the
//! scripted [`MockBackend`] to exercise every state transition without
//! touching real hardware.

use thiserror::Error;
use tokio::sync::mpsc;

use crate::audio::capture::{AudioCapture, CaptureError, StreamHandle};
use crate::audio::SharedRingBuffer;
use crate::config::AudioSettings;
use crate::session::{RouteChangeReason, SessionEvent};

// ---------------------------------------------------------------------------
// BackendError
// ---------------------------------------------------------------------------

/// Errors reported by an [`AudioBackend`].
#[derive(Debug, Error)]
pub enum BackendError {
    /// The operation requires a successful [`AudioBackend::configure`] first.
    #[error("capture is not configured")]
    NotConfigured,

    /// The operation requires an active stream.
    #[error("capture is not active")]
    NotActive,

    /// The capture layer reported a failure.
    #[error("capture failed: {0}")]
    Capture(#[from] CaptureError),
}

// ---------------------------------------------------------------------------
// AudioBackend
// ---------------------------------------------------------------------------

/// Operations the session state machine needs from the audio subsystem.
///
/// Implementations own whatever handles the platform requires; the
/// controller only sequences the calls and never inspects the hardware.
/// No `Send` bound: `cpal::Stream` is not `Send` on any platform, so a
/// backend stays on the thread that created it.
pub trait AudioBackend {
    /// Negotiate device and stream parameters.  Idempotent before
    /// activation.
    fn configure(&mut self) -> Result<(), BackendError>;

    /// Install the capture callback and start the hardware stream.
    fn activate(&mut self) -> Result<(), BackendError>;

    /// Stop the stream and uninstall the callback.
    fn deactivate(&mut self) -> Result<(), BackendError>;

    /// Suspend sample delivery, keeping the stream installed.
    fn pause(&mut self) -> Result<(), BackendError>;

    /// Restart delivery after [`pause`](Self::pause).
    fn resume(&mut self) -> Result<(), BackendError>;

    /// Negotiated capture rate in Hz; `None` before configuration.
    fn sample_rate(&self) -> Option<u32>;
}

// Compile-time proof the trait stays object-safe.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn AudioBackend>) {}
};

// ---------------------------------------------------------------------------
// CpalBackend
// ---------------------------------------------------------------------------

/// Production backend driving a cpal input stream.
///
/// Samples land in the shared ring buffer handed in at construction; stream
/// errors that take the device away are surfaced as
/// [`SessionEvent::RouteChanged`] on the event channel so the session owner
/// can wind the session down.
///
/// # Example
///
/// ```rust,no_run
/// use stringtune::audio::new_shared_ring;
/// use stringtune::config::AudioSettings;
/// use stringtune::session::CpalBackend;
/// use tokio::sync::mpsc;
///
/// let settings = AudioSettings::default();
/// let ring = new_shared_ring(settings.ring_capacity());
/// let (events, _rx) = mpsc::channel(16);
/// let backend = CpalBackend::new(settings, ring, events);
/// ```
pub struct CpalBackend {
    settings: AudioSettings,
    sink: SharedRingBuffer,
    events: mpsc::Sender<SessionEvent>,
    capture: Option<AudioCapture>,
    stream: Option<StreamHandle>,
}

impl CpalBackend {
    /// Create an unconfigured backend.
    ///
    /// No device is opened until [`configure`](AudioBackend::configure).
    pub fn new(
        settings: AudioSettings,
        sink: SharedRingBuffer,
        events: mpsc::Sender<SessionEvent>,
    ) -> Self {
        Self {
            settings,
            sink,
            events,
            capture: None,
            stream: None,
        }
    }
}

impl AudioBackend for CpalBackend {
    fn configure(&mut self) -> Result<(), BackendError> {
        if self.stream.is_some() {
            // Re-negotiating under a live stream would orphan its callback.
            log::debug!("backend: configure ignored while a stream is active");
            return Ok(());
        }
        let capture = AudioCapture::new(
            self.settings.input_device.as_deref(),
            self.settings.sample_rate,
        )?;
        self.capture = Some(capture);
        Ok(())
    }

    fn activate(&mut self) -> Result<(), BackendError> {
        let capture = self.capture.as_ref().ok_or(BackendError::NotConfigured)?;
        let events = self.events.clone();
        let handle = capture.start(self.sink.clone(), move |err| {
            if matches!(err, cpal::StreamError::DeviceNotAvailable) {
                // Audio-thread context: non-blocking send.  A full queue only
                // loses a duplicate disconnect notification.
                let _ = events.try_send(SessionEvent::RouteChanged {
                    reason: RouteChangeReason::DeviceDisconnected,
                });
            }
        })?;
        self.stream = Some(handle);
        Ok(())
    }

    fn deactivate(&mut self) -> Result<(), BackendError> {
        // Dropping the handle stops the stream and uninstalls the callback;
        // after this no further writes can reach the ring buffer.
        self.stream = None;
        Ok(())
    }

    fn pause(&mut self) -> Result<(), BackendError> {
        let stream = self.stream.as_ref().ok_or(BackendError::NotActive)?;
        stream.pause()?;
        Ok(())
    }

    fn resume(&mut self) -> Result<(), BackendError> {
        let stream = self.stream.as_ref().ok_or(BackendError::NotActive)?;
        stream.resume()?;
        Ok(())
    }

    fn sample_rate(&self) -> Option<u32> {
        self.capture.as_ref().map(AudioCapture::sample_rate)
    }
}

// ---------------------------------------------------------------------------
// MockBackend (tests)
// ---------------------------------------------------------------------------

/// Scripted backend for state-machine tests.
///
/// Records operations in invocation order and fails the ones a test arms,
/// using the same error values the cpal backend would produce.
#[cfg(test)]
#[derive(Default)]
pub struct MockBackend {
    /// Operation names in invocation order.
    pub calls: Vec<&'static str>,
    pub fail_configure: bool,
    pub fail_activate: bool,
    pub fail_pause: bool,
    pub fail_resume: bool,
}

#[cfg(test)]
impl MockBackend {
    /// A backend on which every operation succeeds.
    pub fn ok() -> Self {
        Self::default()
    }
}

#[cfg(test)]
impl AudioBackend for MockBackend {
    fn configure(&mut self) -> Result<(), BackendError> {
        self.calls.push("configure");
        if self.fail_configure {
            return Err(BackendError::Capture(CaptureError::NoDevice));
        }
        Ok(())
    }

    fn activate(&mut self) -> Result<(), BackendError> {
        self.calls.push("activate");
        if self.fail_activate {
            return Err(BackendError::Capture(CaptureError::PlayStream(
                cpal::PlayStreamError::DeviceNotAvailable,
            )));
        }
        Ok(())
    }

    fn deactivate(&mut self) -> Result<(), BackendError> {
        self.calls.push("deactivate");
        Ok(())
    }

    fn pause(&mut self) -> Result<(), BackendError> {
        self.calls.push("pause");
        if self.fail_pause {
            return Err(BackendError::Capture(CaptureError::PauseStream(
                cpal::PauseStreamError::DeviceNotAvailable,
            )));
        }
        Ok(())
    }

    fn resume(&mut self) -> Result<(), BackendError> {
        self.calls.push("resume");
        if self.fail_resume {
            return Err(BackendError::Capture(CaptureError::PlayStream(
                cpal::PlayStreamError::DeviceNotAvailable,
            )));
        }
        Ok(())
    }

    fn sample_rate(&self) -> Option<u32> {
        if self.calls.contains(&"configure") {
            Some(44_100)
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
