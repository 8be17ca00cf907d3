//! Window functions and the per-conditioner coefficient cache.
//!
//! Windows taper a frame's edges before autocorrelation to reduce spectral
//! leakage.  Coefficients depend only on the window type and the frame
//! length, so each [`SignalConditioner`](crate::dsp::SignalConditioner) owns
//! a [`WindowCache`] that memoizes them per length: the first frame of a
//! given size pays the `cos` loop, every later frame is a single multiply
//! pass.

use std::collections::HashMap;
use std::f32::consts::PI;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// WindowType
// ---------------------------------------------------------------------------

/// Taper shape applied to a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowType {
    /// Cosine bell reaching 0.0 at both edges.
    #[default]
    Hann,
    /// Raised cosine with ~0.08 residual at the edges.
    Hamming,
}

impl WindowType {
    /// Generate the coefficient sequence for a window of `len` samples.
    ///
    /// Lengths 0 and 1 degenerate gracefully: an empty sequence and the
    /// identity coefficient `[1.0]` respectively.
    pub fn coefficients(self, len: usize) -> Vec<f32> {
        if len == 0 {
            return Vec::new();
        }
        if len == 1 {
            return vec![1.0];
        }

        let denom = (len - 1) as f32;
        (0..len)
            .map(|i| {
                let phase = 2.0 * PI * i as f32 / denom;
                match self {
                    WindowType::Hann => 0.5 * (1.0 - phase.cos()),
                    WindowType::Hamming => 0.54 - 0.46 * phase.cos(),
                }
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// WindowCache
// ---------------------------------------------------------------------------

/// Memoized window coefficients, keyed by frame length.
///
/// Entries are computed on first use and never invalidated; the window type
/// is fixed at construction so one cache never mixes shapes.  Owned by a
/// single conditioner instance — there is no global cache, so sessions and
/// tests cannot interfere with each other.
#[derive(Debug)]
pub struct WindowCache {
    kind: WindowType,
    by_len: HashMap<usize, Vec<f32>>,
}

impl WindowCache {
    /// Create an empty cache for the given window type.
    pub fn new(kind: WindowType) -> Self {
        Self {
            kind,
            by_len: HashMap::new(),
        }
    }

    /// The window type this cache generates.
    pub fn window_type(&self) -> WindowType {
        self.kind
    }

    /// Coefficients for a `len`-sample frame, computed on first request.
    pub fn get(&mut self, len: usize) -> &[f32] {
        let kind = self.kind;
        self.by_len
            .entry(len)
            .or_insert_with(|| kind.coefficients(len))
    }

    /// Number of distinct frame lengths cached so far.
    pub fn entry_count(&self) -> usize {
        self.by_len.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
