//! Real-time guitar-tuner pitch pipeline.
//!
//! `stringtune` captures microphone audio, slices it into fixed-size frames
//! and estimates the fundamental frequency with a normalized time-domain
//! autocorrelation, publishing one [`PitchFrame`](dsp::PitchFrame) per frame
//! period.
//!
//! # Architecture
//!
//! ```text
//! cpal callback ──▶ downmix ──▶ RingBuffer ──▶ AnalysisTask ──▶ PitchFrame
//! (audio thread)            Arc<Mutex<…>>    (tokio task:        (mpsc)
//!                                             condition → detect)
//!
//! SessionEvent (mpsc) ──▶ TunerSession ──▶ SessionController ──▶ AudioBackend
//!                         (pause / resume / stop everything above)
//! ```
//!
//! The capture side is real-time: the hardware callback only down-mixes and
//! copies into the ring buffer under a brief lock, overwriting the oldest
//! audio when full.  Everything else — conditioning, detection, session
//! control — runs on the tokio runtime.  See [`pipeline::TunerSession`] for
//! the way in.

pub mod audio;
pub mod config;
pub mod dsp;
pub mod pipeline;
pub mod session;
