//! Frame conditioning ahead of pitch detection.
//!
//! Raw capture frames carry DC bias (cheap microphones, ADC offsets) and
//! hard edges that smear the autocorrelation peak.  [`SignalConditioner`]
//! applies up to three stages in fixed order:
//!
//! 1. DC removal — subtract the frame mean (shape-preserving).
//! 2. Pre-emphasis — first-order high-pass, `y[i] = x[i] − c·x[i−1]`.
//! 3. Windowing — multiply by a cached Hann/Hamming taper.
//!
//! Every stage is length-preserving and total: empty or degenerate input
//! comes back empty/unchanged, never as an error.

use serde::{Deserialize, Serialize};

use crate::dsp::window::{WindowCache, WindowType};

// ---------------------------------------------------------------------------
// ConditionerConfig
// ---------------------------------------------------------------------------

/// Stage selection for [`SignalConditioner`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConditionerConfig {
    /// Subtract the frame mean before anything else.
    pub remove_dc_offset: bool,
    /// Apply the first-order pre-emphasis filter.
    pub apply_pre_emphasis: bool,
    /// Filter coefficient for pre-emphasis (typical range 0.95–0.97).
    pub pre_emphasis_coefficient: f32,
    /// Multiply by a window taper.
    pub apply_window: bool,
    /// Which taper to use when `apply_window` is set.
    pub window: WindowType,
}

impl Default for ConditionerConfig {
    /// All stages enabled: DC removal, pre-emphasis at 0.97, Hann window.
    fn default() -> Self {
        Self {
            remove_dc_offset: true,
            apply_pre_emphasis: true,
            pre_emphasis_coefficient: 0.97,
            apply_window: true,
            window: WindowType::Hann,
        }
    }
}

impl ConditionerConfig {
    /// Pass-through preset: every stage disabled, `condition` is identity.
    pub fn none() -> Self {
        Self {
            remove_dc_offset: false,
            apply_pre_emphasis: false,
            pre_emphasis_coefficient: 0.97,
            apply_window: false,
            window: WindowType::Hann,
        }
    }
}

// ---------------------------------------------------------------------------
// Stage functions
// ---------------------------------------------------------------------------

/// Subtract the arithmetic mean from every sample.
///
/// The mean is accumulated in `f64` so long frames keep the residual mean
/// within tolerance.  Sample-to-sample differences are unchanged.
pub fn remove_dc_offset(frame: &[f32]) -> Vec<f32> {
    if frame.is_empty() {
        return Vec::new();
    }
    let mean = (frame.iter().map(|&s| s as f64).sum::<f64>() / frame.len() as f64) as f32;
    frame.iter().map(|&s| s - mean).collect()
}

/// First-order high-pass: `y[0] = x[0]`, `y[i] = x[i] − coefficient·x[i−1]`.
///
/// Empty and single-sample frames are returned unchanged.
pub fn apply_pre_emphasis(frame: &[f32], coefficient: f32) -> Vec<f32> {
    if frame.len() < 2 {
        return frame.to_vec();
    }
    let mut out = Vec::with_capacity(frame.len());
    out.push(frame[0]);
    for i in 1..frame.len() {
        out.push(frame[i] - coefficient * frame[i - 1]);
    }
    out
}

// ---------------------------------------------------------------------------
// SignalConditioner
// ---------------------------------------------------------------------------

/// Per-session frame conditioner.
///
/// Stateless per call except for the window cache, which memoizes
/// coefficients per frame length for the lifetime of this instance.  Owned
/// and driven by the analysis task only — no internal synchronization.
///
/// # Example
///
/// ```rust
/// use stringtune::dsp::{ConditionerConfig, SignalConditioner};
///
/// let mut conditioner = SignalConditioner::new(ConditionerConfig::default());
/// let frame = vec![0.5_f32; 1024];
/// let conditioned = conditioner.condition(&frame);
/// assert_eq!(conditioned.len(), frame.len());
/// ```
pub struct SignalConditioner {
    config: ConditionerConfig,
    windows: WindowCache,
}

impl SignalConditioner {
    /// Create a conditioner with the given stage selection.
    pub fn new(config: ConditionerConfig) -> Self {
        Self {
            windows: WindowCache::new(config.window),
            config,
        }
    }

    /// Run the enabled stages in fixed order: DC removal → pre-emphasis →
    /// window.  Empty input yields empty output; length is always preserved.
    pub fn condition(&mut self, frame: &[f32]) -> Vec<f32> {
        if frame.is_empty() {
            return Vec::new();
        }

        let mut out = if self.config.remove_dc_offset {
            remove_dc_offset(frame)
        } else {
            frame.to_vec()
        };

        if self.config.apply_pre_emphasis {
            // In place, back to front, so each y[i] still sees the raw x[i-1].
            let c = self.config.pre_emphasis_coefficient;
            for i in (1..out.len()).rev() {
                out[i] -= c * out[i - 1];
            }
        }

        if self.config.apply_window {
            let window = self.windows.get(out.len());
            for (sample, &w) in out.iter_mut().zip(window) {
                *sample *= w;
            }
        }

        out
    }

    /// Multiply `frame` by this conditioner's window, via the cache.
    ///
    /// Empty input yields empty output; a single sample is returned
    /// unchanged (identity coefficient).
    pub fn apply_window(&mut self, frame: &[f32]) -> Vec<f32> {
        let window = self.windows.get(frame.len());
        frame.iter().zip(window).map(|(&s, &w)| s * w).collect()
    }

    /// The stage selection this conditioner was built with.
    pub fn config(&self) -> &ConditionerConfig {
        &self.config
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
