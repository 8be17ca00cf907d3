//! Session lifecycle state machine.
//!
//! [`SessionController`] owns the [`SessionState`] and an [`AudioBackend`],
//! and is the only place either is mutated.  Lifecycle calls and
//! [`SessionEvent`] notifications both funnel through it, serially, so the
//! machine needs no locking of its own.

use thiserror::Error;

use crate::session::backend::{AudioBackend, BackendError};
use crate::session::SessionEvent;

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Lifecycle state of a tuning session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No capture; nothing is configured or running.
    #[default]
    Inactive,
    /// Capture is running and frames are being analyzed.
    Active,
    /// Capture is paused by an interruption or a manual pause; the stream
    /// and buffers are still installed.
    Interrupted,
}

impl SessionState {
    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            SessionState::Inactive => "inactive",
            SessionState::Active => "active",
            SessionState::Interrupted => "interrupted",
        }
    }
}

// ---------------------------------------------------------------------------
// SessionError
// ---------------------------------------------------------------------------

/// Failures surfaced by the session lifecycle.
///
/// Only configuration, activation and resume can fail; teardown paths are
/// best-effort and never leave the caller holding an error.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The audio subsystem rejected the requested capture parameters.
    #[error("session configuration failed: {0}")]
    ConfigurationFailed(BackendError),

    /// The audio subsystem refused to start capturing.
    #[error("session activation failed: {0}")]
    ActivationFailed(BackendError),

    /// Capture could not be restarted after an interruption or pause.
    #[error("session resume failed: {0}")]
    ResumeFailed(BackendError),
}

// ---------------------------------------------------------------------------
// SessionController
// ---------------------------------------------------------------------------

/// Drives an [`AudioBackend`] through the session state machine.
///
/// The controller guarantees that teardown cannot get stuck: `deactivate`
/// forces [`SessionState::Inactive`] even when the backend misbehaves, so a
/// failed stop never wedges the application in a half-open state.
pub struct SessionController<B: AudioBackend> {
    backend: B,
    state: SessionState,
}

impl<B: AudioBackend> SessionController<B> {
    /// Wrap `backend` in a fresh controller in the [`SessionState::Inactive`]
    /// state.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            state: SessionState::Inactive,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether capture is currently running.
    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    /// Access the underlying backend, e.g. for the negotiated sample rate.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Establish capture parameters against the audio subsystem.
    ///
    /// Idempotent before activation; once the session has left
    /// [`SessionState::Inactive`] further calls are ignored.
    ///
    /// # Errors
    ///
    /// [`SessionError::ConfigurationFailed`] when the subsystem rejects the
    /// parameters (no device, unsupported configuration).
    pub fn configure(&mut self) -> Result<(), SessionError> {
        if self.state != SessionState::Inactive {
            log::debug!("session: configure ignored while {}", self.state.label());
            return Ok(());
        }
        self.backend
            .configure()
            .map_err(SessionError::ConfigurationFailed)
    }

    /// Start capture: `Inactive → Active`.
    ///
    /// A no-op when already [`SessionState::Active`].  From
    /// [`SessionState::Interrupted`] the stream already exists but is
    /// paused, so this delegates to [`resume`](Self::resume).
    ///
    /// # Errors
    ///
    /// [`SessionError::ActivationFailed`] when the subsystem refuses to
    /// start the stream.
    pub fn activate(&mut self) -> Result<(), SessionError> {
        match self.state {
            SessionState::Active => Ok(()),
            SessionState::Interrupted => self.resume(),
            SessionState::Inactive => {
                self.backend
                    .activate()
                    .map_err(SessionError::ActivationFailed)?;
                self.transition(SessionState::Active);
                Ok(())
            }
        }
    }

    /// Stop capture: any state `→ Inactive`, best-effort.
    ///
    /// A backend failure is logged, never returned; the state is forced to
    /// [`SessionState::Inactive`] regardless.
    pub fn deactivate(&mut self) {
        if self.state == SessionState::Inactive {
            return;
        }
        if let Err(e) = self.backend.deactivate() {
            log::warn!("session: deactivation failed (forcing inactive): {e}");
        }
        self.transition(SessionState::Inactive);
    }

    /// Manually pause capture: `Active → Interrupted`.
    ///
    /// Mirrors an interruption: the stream and buffers stay installed.  A
    /// backend failure is logged and the state still moves to
    /// [`SessionState::Interrupted`], so a later [`resume`](Self::resume)
    /// can recover.
    pub fn pause(&mut self) {
        if self.state != SessionState::Active {
            log::debug!("session: pause ignored while {}", self.state.label());
            return;
        }
        if let Err(e) = self.backend.pause() {
            log::warn!("session: pause failed, treating capture as interrupted anyway: {e}");
        }
        self.transition(SessionState::Interrupted);
    }

    /// Restart paused capture: `Interrupted → Active`.
    ///
    /// A no-op in any other state.
    ///
    /// # Errors
    ///
    /// [`SessionError::ResumeFailed`] when the subsystem cannot restart the
    /// stream; the state stays [`SessionState::Interrupted`] and the caller
    /// is expected to stop the session rather than retry blindly.
    pub fn resume(&mut self) -> Result<(), SessionError> {
        if self.state != SessionState::Interrupted {
            log::debug!("session: resume ignored while {}", self.state.label());
            return Ok(());
        }
        self.backend.resume().map_err(SessionError::ResumeFailed)?;
        self.transition(SessionState::Active);
        Ok(())
    }

    /// Apply one out-of-band session notification.
    ///
    /// # Errors
    ///
    /// Only the resume path can fail: an
    /// [`SessionEvent::InterruptionEnded`] with `should_resume` set
    /// propagates [`SessionError::ResumeFailed`] when the stream cannot be
    /// restarted.  Every other event is absorbed.
    pub fn handle_event(&mut self, event: SessionEvent) -> Result<(), SessionError> {
        match event {
            SessionEvent::InterruptionBegan => {
                if self.state == SessionState::Active {
                    log::info!("session: interruption began, pausing capture");
                    self.pause();
                } else {
                    log::debug!(
                        "session: interruption began while {}, ignored",
                        self.state.label()
                    );
                }
                Ok(())
            }

            SessionEvent::InterruptionEnded { should_resume } => {
                if self.state != SessionState::Interrupted {
                    log::debug!(
                        "session: interruption ended while {}, ignored",
                        self.state.label()
                    );
                    return Ok(());
                }
                if should_resume {
                    log::info!("session: interruption ended, resuming capture");
                    self.resume()
                } else {
                    log::info!("session: interruption ended without resume, stopping capture");
                    self.deactivate();
                    Ok(())
                }
            }

            SessionEvent::RouteChanged { reason } => {
                if reason.ends_capture() {
                    log::warn!("session: route change ({reason:?}) lost the input, stopping");
                    self.deactivate();
                } else {
                    log::info!("session: route changed ({reason:?})");
                }
                Ok(())
            }
        }
    }

    fn transition(&mut self, next: SessionState) {
        if next != self.state {
            log::debug!("session: {} -> {}", self.state.label(), next.label());
            self.state = next;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::backend::MockBackend;
    use crate::session::RouteChangeReason;

    fn started() -> SessionController<MockBackend> {
        let mut controller = SessionController::new(MockBackend::ok());
        controller.configure().unwrap();
        controller.activate().unwrap();
        controller
    }

    // ---- configure / activate ----

    #[test]
    fn configure_then_activate_reaches_active() {
        let controller = started();
        assert_eq!(controller.state(), SessionState::Active);
        assert!(controller.is_active());
        assert_eq!(controller.backend().calls, vec!["configure", "activate"]);
    }

    #[test]
    fn activate_when_active_is_a_no_op() {
        let mut controller = started();
        controller.activate().unwrap();
        // The backend was not asked a second time.
        assert_eq!(controller.backend().calls, vec!["configure", "activate"]);
    }

    #[test]
    fn activate_from_interrupted_resumes_the_stream() {
        let mut controller = started();
        controller.pause();
        controller.activate().unwrap();
        assert_eq!(controller.state(), SessionState::Active);
        assert_eq!(
            controller.backend().calls,
            vec!["configure", "activate", "pause", "resume"]
        );
    }

    #[test]
    fn configure_failure_surfaces_and_stays_inactive() {
        let mut controller = SessionController::new(MockBackend {
            fail_configure: true,
            ..MockBackend::ok()
        });
        let err = controller.configure().unwrap_err();
        assert!(matches!(err, SessionError::ConfigurationFailed(_)));
        assert_eq!(controller.state(), SessionState::Inactive);
    }

    #[test]
    fn activation_failure_surfaces_and_stays_inactive() {
        let mut controller = SessionController::new(MockBackend {
            fail_activate: true,
            ..MockBackend::ok()
        });
        controller.configure().unwrap();
        let err = controller.activate().unwrap_err();
        assert!(matches!(err, SessionError::ActivationFailed(_)));
        assert_eq!(controller.state(), SessionState::Inactive);
    }

    #[test]
    fn configure_is_ignored_once_active() {
        let mut controller = started();
        controller.configure().unwrap();
        assert_eq!(controller.backend().calls, vec!["configure", "activate"]);
    }

    // ---- deactivate ----

    #[test]
    fn deactivate_returns_to_inactive() {
        let mut controller = started();
        controller.deactivate();
        assert_eq!(controller.state(), SessionState::Inactive);
        assert_eq!(
            controller.backend().calls,
            vec!["configure", "activate", "deactivate"]
        );
    }

    #[test]
    fn deactivate_when_inactive_skips_the_backend() {
        let mut controller = SessionController::new(MockBackend::ok());
        controller.deactivate();
        assert!(controller.backend().calls.is_empty());
    }

    // ---- pause / resume ----

    #[test]
    fn pause_and_resume_round_trip() {
        let mut controller = started();

        controller.pause();
        assert_eq!(controller.state(), SessionState::Interrupted);

        controller.resume().unwrap();
        assert_eq!(controller.state(), SessionState::Active);
        assert_eq!(
            controller.backend().calls,
            vec!["configure", "activate", "pause", "resume"]
        );
    }

    #[test]
    fn pause_when_not_active_is_ignored() {
        let mut controller = SessionController::new(MockBackend::ok());
        controller.pause();
        assert_eq!(controller.state(), SessionState::Inactive);
        assert!(controller.backend().calls.is_empty());
    }

    #[test]
    fn resume_failure_propagates_and_stays_interrupted() {
        let mut controller = SessionController::new(MockBackend {
            fail_resume: true,
            ..MockBackend::ok()
        });
        controller.configure().unwrap();
        controller.activate().unwrap();
        controller.pause();

        let err = controller.resume().unwrap_err();
        assert!(matches!(err, SessionError::ResumeFailed(_)));
        assert_eq!(controller.state(), SessionState::Interrupted);
    }

    // ---- interruption events ----

    #[test]
    fn interruption_pauses_active_capture() {
        let mut controller = started();
        controller
            .handle_event(SessionEvent::InterruptionBegan)
            .unwrap();

        assert_eq!(controller.state(), SessionState::Interrupted);
        // Paused, not torn down: buffers and the stream stay installed.
        assert_eq!(
            controller.backend().calls,
            vec!["configure", "activate", "pause"]
        );
    }

    #[test]
    fn interruption_while_inactive_is_ignored() {
        let mut controller = SessionController::new(MockBackend::ok());
        controller
            .handle_event(SessionEvent::InterruptionBegan)
            .unwrap();
        assert_eq!(controller.state(), SessionState::Inactive);
        assert!(controller.backend().calls.is_empty());
    }

    #[test]
    fn interruption_end_resumes_when_asked() {
        let mut controller = started();
        controller
            .handle_event(SessionEvent::InterruptionBegan)
            .unwrap();
        controller
            .handle_event(SessionEvent::InterruptionEnded {
                should_resume: true,
            })
            .unwrap();

        assert_eq!(controller.state(), SessionState::Active);
        assert_eq!(
            controller.backend().calls,
            vec!["configure", "activate", "pause", "resume"]
        );
    }

    #[test]
    fn interruption_end_without_resume_stops_capture() {
        let mut controller = started();
        controller
            .handle_event(SessionEvent::InterruptionBegan)
            .unwrap();
        controller
            .handle_event(SessionEvent::InterruptionEnded {
                should_resume: false,
            })
            .unwrap();

        assert_eq!(controller.state(), SessionState::Inactive);
        assert_eq!(
            controller.backend().calls,
            vec!["configure", "activate", "pause", "deactivate"]
        );
    }

    #[test]
    fn interruption_end_after_manual_stop_does_not_restart() {
        let mut controller = started();
        controller
            .handle_event(SessionEvent::InterruptionBegan)
            .unwrap();
        controller.deactivate();

        controller
            .handle_event(SessionEvent::InterruptionEnded {
                should_resume: true,
            })
            .unwrap();

        assert_eq!(controller.state(), SessionState::Inactive);
        assert!(!controller.backend().calls.contains(&"resume"));
    }

    #[test]
    fn interruption_end_resume_failure_propagates() {
        let mut controller = SessionController::new(MockBackend {
            fail_resume: true,
            ..MockBackend::ok()
        });
        controller.configure().unwrap();
        controller.activate().unwrap();
        controller
            .handle_event(SessionEvent::InterruptionBegan)
            .unwrap();

        let err = controller
            .handle_event(SessionEvent::InterruptionEnded {
                should_resume: true,
            })
            .unwrap_err();

        assert!(matches!(err, SessionError::ResumeFailed(_)));
        assert_eq!(controller.state(), SessionState::Interrupted);
    }

    // ---- route changes ----

    #[test]
    fn losing_the_input_route_stops_capture_outright() {
        let mut controller = started();
        controller
            .handle_event(SessionEvent::RouteChanged {
                reason: RouteChangeReason::DeviceDisconnected,
            })
            .unwrap();

        assert_eq!(controller.state(), SessionState::Inactive);
        assert!(controller.backend().calls.contains(&"deactivate"));
    }

    #[test]
    fn losing_the_input_route_while_interrupted_also_stops() {
        let mut controller = started();
        controller.pause();
        controller
            .handle_event(SessionEvent::RouteChanged {
                reason: RouteChangeReason::DeviceDisconnected,
            })
            .unwrap();
        assert_eq!(controller.state(), SessionState::Inactive);
    }

    #[test]
    fn informational_route_change_leaves_state_alone() {
        let mut controller = started();
        controller
            .handle_event(SessionEvent::RouteChanged {
                reason: RouteChangeReason::NewDeviceAvailable,
            })
            .unwrap();

        assert_eq!(controller.state(), SessionState::Active);
        assert_eq!(controller.backend().calls, vec!["configure", "activate"]);
    }

    // ---- state labels ----

    #[test]
    fn labels_cover_every_state() {
        assert_eq!(SessionState::Inactive.label(), "inactive");
        assert_eq!(SessionState::Active.label(), "active");
        assert_eq!(SessionState::Interrupted.label(), "interrupted");
    }
}
