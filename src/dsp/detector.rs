//! Autocorrelation pitch detection.
//!
//! The detector scans integer lags in the range implied by the configured
//! frequency band, picks the lag whose autocorrelation against the frame is
//! highest, refines it to sub-sample precision with parabolic interpolation,
//! and reports the result as a [`PitchFrame`].
//!
//! Everything degenerate — empty frame, silence, a frame too short for the
//! requested band, zero energy — comes back as a frame with an absent
//! frequency.  Detection never fails; the caller distinguishes "no pitch
//! lock" (absent frequency, live session) from hard failures (session
//! errors) by construction.
//!
//! # Example
//!
//! ```rust
//! use stringtune::dsp::{AutocorrelationDetector, DetectorConfig, PitchDetector};
//!
//! let mut detector = AutocorrelationDetector::new(DetectorConfig::default(), 44_100);
//! let frame: Vec<f32> = (0..4096)
//!     .map(|i| (2.0 * std::f32::consts::PI * 110.0 * i as f32 / 44_100.0).sin())
//!     .collect();
//!
//! let result = detector.detect(&frame);
//! let freq = result.frequency.unwrap();
//! assert!((freq - 110.0).abs() < 2.0);
//! ```

use std::time::Instant;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// PitchFrame
// ---------------------------------------------------------------------------

/// One detection result, emitted per analysis frame.
///
/// `frequency` is `None` whenever the detector cannot commit to a pitch:
/// silence, insufficient data, or confidence below the configured threshold.
/// `confidence` and `rms` are always populated so a meter can keep showing
/// signal level while the pitch is unlocked.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchFrame {
    /// Estimated fundamental frequency in Hz, when confidently detected.
    pub frequency: Option<f32>,
    /// Normalized autocorrelation of the winning lag, in `[0, 1]`.
    pub confidence: f32,
    /// Root-mean-square amplitude of the analyzed frame (≥ 0).
    pub rms: f32,
    /// When this frame was analyzed.
    pub captured_at: Instant,
}

impl PitchFrame {
    /// Result carrying level information but no pitch lock.
    fn without_pitch(rms: f32) -> Self {
        Self {
            frequency: None,
            confidence: 0.0,
            rms,
            captured_at: Instant::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// DetectorConfig
// ---------------------------------------------------------------------------

/// Tuning parameters for [`AutocorrelationDetector`].
///
/// The frequency band bounds the lag scan:
/// `min_lag = round(sample_rate / max_frequency)`,
/// `max_lag = round(sample_rate / min_frequency)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Lowest detectable fundamental in Hz.
    pub min_frequency: f32,
    /// Highest detectable fundamental in Hz.
    pub max_frequency: f32,
    /// RMS floor below which a frame is treated as silence.
    pub silence_threshold: f32,
    /// Minimum normalized correlation required to report a frequency.
    pub confidence_threshold: f32,
}

impl Default for DetectorConfig {
    /// Guitar band with headroom for drop tunings: 70–1000 Hz.
    fn default() -> Self {
        Self {
            min_frequency: 70.0,
            max_frequency: 1000.0,
            silence_threshold: 0.01,
            confidence_threshold: 0.5,
        }
    }
}

// ---------------------------------------------------------------------------
// PitchDetector trait
// ---------------------------------------------------------------------------

/// A pluggable pitch estimation algorithm.
///
/// Implementors must be `Send` so the analysis task can own one inside a
/// spawned future.  `detect` takes `&mut self` so implementations can keep
/// scratch storage between calls.
pub trait PitchDetector: Send {
    /// Estimate the fundamental frequency of one conditioned frame.
    fn detect(&mut self, frame: &[f32]) -> PitchFrame;
}

// Compile-time proof the trait stays object-safe (it is used as
// `Box<dyn PitchDetector>` in the analysis task).
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn PitchDetector>) {}
};

// ---------------------------------------------------------------------------
// AutocorrelationDetector
// ---------------------------------------------------------------------------

/// Normalized time-domain autocorrelation with silence gating, confidence
/// scoring and parabolic peak refinement.
pub struct AutocorrelationDetector {
    sample_rate: u32,
    /// First lag scanned (inclusive), from `max_frequency`.
    min_lag: usize,
    /// One past the last lag scanned, from `min_frequency`.
    max_lag: usize,
    silence_threshold: f32,
    confidence_threshold: f32,
    /// Correlation values for the scanned lag range, reused across calls.
    correlations: Vec<f64>,
}

impl AutocorrelationDetector {
    /// Build a detector for the given configuration and capture rate.
    ///
    /// Out-of-range configuration values (non-positive or inverted band
    /// bounds) are clamped so the lag range stays ordered; a band the frame
    /// cannot satisfy simply yields no detections.
    pub fn new(config: DetectorConfig, sample_rate: u32) -> Self {
        let min_frequency = config.min_frequency.max(1.0);
        let max_frequency = config.max_frequency.max(min_frequency);

        let min_lag = (sample_rate as f32 / max_frequency).round().max(1.0) as usize;
        let max_lag = (sample_rate as f32 / min_frequency).round() as usize;

        Self {
            sample_rate,
            min_lag,
            max_lag,
            silence_threshold: config.silence_threshold,
            confidence_threshold: config.confidence_threshold,
            correlations: Vec::new(),
        }
    }

    /// Sample rate this detector was built for, in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

impl PitchDetector for AutocorrelationDetector {
    fn detect(&mut self, frame: &[f32]) -> PitchFrame {
        let rms = rms(frame);
        if frame.is_empty() || rms < self.silence_threshold {
            return PitchFrame::without_pitch(rms);
        }

        // The longest lag must still leave an overlap to correlate.
        if self.max_lag >= frame.len() || self.min_lag >= self.max_lag {
            return PitchFrame::without_pitch(rms);
        }

        let energy: f64 = frame.iter().map(|&s| s as f64 * s as f64).sum();
        if energy <= 0.0 {
            return PitchFrame::without_pitch(rms);
        }

        self.correlations.clear();
        for lag in self.min_lag..self.max_lag {
            let mut sum = 0.0_f64;
            for i in 0..frame.len() - lag {
                sum += frame[i] as f64 * frame[i + lag] as f64;
            }
            self.correlations.push(sum);
        }

        // Strict comparison keeps the first (smallest) lag on ties.
        let mut best_idx = 0;
        let mut best_corr = self.correlations[0];
        for (idx, &corr) in self.correlations.iter().enumerate().skip(1) {
            if corr > best_corr {
                best_idx = idx;
                best_corr = corr;
            }
        }

        let confidence = (best_corr / energy).clamp(0.0, 1.0) as f32;
        let best_lag = self.min_lag + best_idx;
        let delta = parabolic_delta(&self.correlations, best_idx);
        let frequency = self.sample_rate as f64 / (best_lag as f64 + delta);

        PitchFrame {
            frequency: (confidence >= self.confidence_threshold).then_some(frequency as f32),
            confidence,
            rms,
            captured_at: Instant::now(),
        }
    }
}

/// Sub-sample peak offset from a parabola through the peak and its two
/// neighbors.  Zero when the peak sits at either end of the scanned range or
/// the curvature is too flat to trust.
fn parabolic_delta(correlations: &[f64], peak: usize) -> f64 {
    if peak == 0 || peak + 1 >= correlations.len() {
        return 0.0;
    }
    let left = correlations[peak - 1];
    let center = correlations[peak];
    let right = correlations[peak + 1];

    let denom = left - 2.0 * center + right;
    if denom.abs() < 1e-9 {
        return 0.0;
    }
    0.5 * (left - right) / denom
}

/// Root-mean-square amplitude of a frame; 0.0 for an empty frame.
pub fn rms(frame: &[f32]) -> f32 {
    if frame.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = frame.iter().map(|&s| s as f64 * s as f64).sum();
    (sum_sq / frame.len() as f64).sqrt() as f32
}

// ---------------------------------------------------------------------------
// MockDetector
// ---------------------------------------------------------------------------

/// Scripted detector for pipeline tests: always returns the configured
/// result, counting calls.
#[cfg(test)]
pub struct MockDetector {
    frequency: Option<f32>,
    pub calls: usize,
}

#[cfg(test)]
impl MockDetector {
    /// Always "detects" the given frequency with high confidence.
    pub fn locked(frequency: f32) -> Self {
        Self {
            frequency: Some(frequency),
            calls: 0,
        }
    }

    /// Never detects anything.
    pub fn silent() -> Self {
        Self {
            frequency: None,
            calls: 0,
        }
    }
}

#[cfg(test)]
impl PitchDetector for MockDetector {
    fn detect(&mut self, frame: &[f32]) -> PitchFrame {
        self.calls += 1;
        PitchFrame {
            frequency: self.frequency,
            confidence: if self.frequency.is_some() { 0.99 } else { 0.0 },
            rms: rms(frame),
            captured_at: Instant::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
