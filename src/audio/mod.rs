//! Audio capture layer — microphone → down-mix → shared ring buffer.
//!
//! # Pipeline
//!
//! ```text
//! Microphone → cpal callback → downmix_into → RingBuffer (Arc<Mutex<…>>)
//!                                                  ↑ producer (audio thread)
//!                                                  ↓ consumer (analysis task)
//!                                     read_into(frame) every frame period
//! ```
//!
//! The ring buffer is the only structure shared between the audio thread and
//! the analysis task.  Both sides hold the lock only for the duration of a
//! single copy; the producer is never blocked (full buffer → oldest samples
//! are overwritten).
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use stringtune::audio::{new_shared_ring, AudioCapture};
//!
//! let ring = new_shared_ring(44_100); // one second at 44.1 kHz
//! let capture = AudioCapture::new(None, 44_100).unwrap();
//! let _handle = capture
//!     .start(ring.clone(), |err| eprintln!("stream error: {err}"))
//!     .unwrap();
//!
//! // elsewhere: ring.lock().unwrap().read(4096)
//! ```

use std::sync::{Arc, Mutex};

pub mod buffer;
pub mod capture;
pub mod downmix;

pub use buffer::RingBuffer;
pub use capture::{AudioCapture, CaptureError, StreamHandle};
pub use downmix::{downmix_into, downmix_to_mono};

/// The sample store shared between the capture callback and the analysis
/// task.  The lock is held only for the duration of a single read or write
/// (cursor arithmetic plus memcpy — see [`RingBuffer`]).
pub type SharedRingBuffer = Arc<Mutex<RingBuffer<f32>>>;

/// Convenience constructor for a [`SharedRingBuffer`] of `capacity` samples.
pub fn new_shared_ring(capacity: usize) -> SharedRingBuffer {
    Arc::new(Mutex::new(RingBuffer::new(capacity)))
}
