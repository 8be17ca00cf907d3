//! Audio-session lifecycle — notifications, backend seam and state machine.
//!
//! A tuning session is driven from two directions: lifecycle calls made by
//! the session owner (configure, activate, pause, resume, stop) and
//! asynchronous [`SessionEvent`] notifications arriving out-of-band from the
//! platform (interruptions, route changes).  [`SessionController`] folds both
//! into a single three-state machine:
//!
//! ```text
//!              configure() + activate()
//!  Inactive ─────────────────────────────────▶ Active
//!     ▲  ▲                                      │
//!     │  │   ended(should_resume=true) /        │ interruption began /
//!     │  │   resume()                           │ pause()
//!     │  │                                      ▼
//!     │  └────────────────────────────── Interrupted
//!     │                                         │
//!     └─────────────────────────────────────────┘
//!       deactivate() / ended(should_resume=false) / input route lost
//! ```
//!
//! Events are delivered over a single `tokio::sync::mpsc` channel and applied
//! serially by the session owner, so the controller needs no internal
//! locking.  The hardware sits behind the [`AudioBackend`] trait; production
//! code uses [`CpalBackend`], tests use a scripted mock.

pub mod backend;
pub mod controller;

pub use backend::{AudioBackend, BackendError, CpalBackend};
pub use controller::{SessionController, SessionError, SessionState};

// ---------------------------------------------------------------------------
// SessionEvent
// ---------------------------------------------------------------------------

/// Out-of-band session notifications.
///
/// The audio data path never produces these; they come from the platform
/// side (the capture error callback, OS notifications) and are forwarded to
/// [`SessionController::handle_event`] by the session owner, one at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Another audio client or the OS took over the input.  Capture is
    /// paused; buffers and callbacks stay installed.
    InterruptionBegan,

    /// The interruption is over.  `should_resume` tells whether the platform
    /// wants capture restarted.
    InterruptionEnded {
        /// `true` when the session should re-activate and resume capture.
        should_resume: bool,
    },

    /// The input route changed (device unplugged, new device, …).
    RouteChanged {
        /// What kind of change occurred.
        reason: RouteChangeReason,
    },
}

// ---------------------------------------------------------------------------
// RouteChangeReason
// ---------------------------------------------------------------------------

/// Why an input route changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteChangeReason {
    /// The active input device disappeared; capture cannot continue on it.
    DeviceDisconnected,
    /// A new input device became available.  Informational.
    NewDeviceAvailable,
    /// The device configuration changed (sample rate, channel layout).
    /// Informational.
    ConfigurationChanged,
}

impl RouteChangeReason {
    /// Whether this route change makes continued capture impossible.
    ///
    /// A disruptive change stops the session outright; the informational
    /// kinds are logged and otherwise ignored.
    pub fn ends_capture(self) -> bool {
        matches!(self, RouteChangeReason::DeviceDisconnected)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_disconnect_ends_capture() {
        assert!(RouteChangeReason::DeviceDisconnected.ends_capture());
    }

    #[test]
    fn informational_route_changes_do_not_end_capture() {
        assert!(!RouteChangeReason::NewDeviceAvailable.ends_capture());
        assert!(!RouteChangeReason::ConfigurationChanged.ends_capture());
    }
}
