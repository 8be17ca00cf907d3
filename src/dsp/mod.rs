//! Frame analysis — signal conditioning and autocorrelation pitch detection.
//!
//! # Pipeline
//!
//! ```text
//! raw frame ──► SignalConditioner::condition ──► PitchDetector::detect ──► PitchFrame
//!               (DC removal, pre-emphasis,        (silence gate, lag scan,
//!                cached window taper)              parabolic refinement)
//! ```
//!
//! Both halves run on the analysis task only.  They are pure computation:
//! no I/O, no locks, no failure paths — degenerate input always produces a
//! [`PitchFrame`] with an absent frequency rather than an error.

pub mod conditioner;
pub mod detector;
pub mod window;

pub use conditioner::{apply_pre_emphasis, remove_dc_offset, ConditionerConfig, SignalConditioner};
pub use detector::{rms, AutocorrelationDetector, DetectorConfig, PitchDetector, PitchFrame};
pub use window::{WindowCache, WindowType};
