//! Pipeline wiring — capture, buffering, analysis and session control.
//!
//! This module connects the pieces the rest of the crate provides into a
//! running tuner and exposes [`TunerSession`] as the one entry point an
//! application needs.
//!
//! # Architecture
//!
//! ```text
//! cpal callback (audio thread)
//!        │  downmix to mono, write under a brief lock
//!        ▼
//! SharedRingBuffer (Arc<Mutex<RingBuffer<f32>>>)
//!        │  read_into, one frame per frame period
//!        ▼
//! AnalysisTask (tokio) ── SignalConditioner ── PitchDetector
//!        │
//!        ▼
//! mpsc::Sender<PitchFrame>  ←─ consumed by the UI / meter
//!
//! SessionEvent (mpsc) ─▶ TunerSession::handle_event ─▶ SessionController
//!                        (pause / resume / stop the parts above)
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use stringtune::audio::new_shared_ring;
//! use stringtune::config::AppConfig;
//! use stringtune::pipeline::TunerSession;
//! use stringtune::session::CpalBackend;
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!     let ring = new_shared_ring(config.audio.ring_capacity());
//!
//!     let (event_tx, mut event_rx) = mpsc::channel(16);
//!     let (frame_tx, mut frame_rx) = mpsc::channel(32);
//!
//!     let backend = CpalBackend::new(config.audio.clone(), ring.clone(), event_tx);
//!     let mut session = TunerSession::start(backend, ring, &config, frame_tx).unwrap();
//!
//!     loop {
//!         tokio::select! {
//!             Some(frame) = frame_rx.recv() => println!("{:?}", frame.frequency),
//!             Some(event) = event_rx.recv() => {
//!                 if session.handle_event(event).await.is_err() {
//!                     break;
//!                 }
//!             }
//!             else => break,
//!         }
//!     }
//!     session.stop().await;
//! }
//! ```

pub mod analysis;
pub mod tuner;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use analysis::{AnalysisHandle, AnalysisTask};
pub use tuner::TunerSession;
