//! Channel down-mixing at the capture boundary.
//!
//! The analysis pipeline works on **mono** samples; capture devices deliver
//! interleaved multi-channel buffers.  Down-mixing is done in the capture
//! callback *before* the ring-buffer lock is taken, so the critical section
//! stays a plain memory copy.
//!
//! [`downmix_into`] reuses a caller-owned scratch vector so the steady-state
//! callback performs no allocation; [`downmix_to_mono`] is the allocating
//! convenience form.

// ---------------------------------------------------------------------------
// downmix_to_mono
// ---------------------------------------------------------------------------

/// Mix interleaved multi-channel audio down to mono by averaging all channels.
///
/// The output length is `samples.len() / channels`.
///
/// * If `channels == 1` the input slice is returned as an owned `Vec` with no
///   averaging.
/// * If `channels == 0` an empty vector is returned.
///
/// # Example
///
/// ```rust
/// use stringtune::audio::downmix_to_mono;
///
/// let stereo = vec![0.5_f32, -0.5, 0.2, -0.2]; // L R L R
/// let mono = downmix_to_mono(&stereo, 2);
/// assert_eq!(mono.len(), 2);
/// assert!((mono[0] - 0.0).abs() < 1e-6);
/// assert!((mono[1] - 0.0).abs() < 1e-6);
/// ```
pub fn downmix_to_mono(samples: &[f32], channels: u16) -> Vec<f32> {
    let mut out = Vec::new();
    downmix_into(samples, channels, &mut out);
    out
}

/// Down-mix into a reusable output vector (cleared first).
///
/// Identical semantics to [`downmix_to_mono`], but the output buffer is owned
/// by the caller so a capture callback can reuse it across invocations
/// without allocating once its capacity has grown to the chunk size.
pub fn downmix_into(samples: &[f32], channels: u16, out: &mut Vec<f32>) {
    out.clear();
    match channels {
        0 => {}
        1 => out.extend_from_slice(samples),
        n => {
            let n = n as usize;
            out.extend(
                samples
                    .chunks_exact(n)
                    .map(|frame| frame.iter().sum::<f32>() / n as f32),
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn already_mono_is_copied_verbatim() {
        let input = vec![0.1_f32, 0.2, 0.3];
        let out = downmix_to_mono(&input, 1);
        assert_eq!(out, input);
    }

    #[test]
    fn two_channel_average() {
        let input = vec![1.0_f32, -1.0, 0.5, 0.5];
        let out = downmix_to_mono(&input, 2);
        assert_eq!(out.len(), 2);
        assert!((out[0] - 0.0).abs() < 1e-6); // (1.0 + -1.0) / 2
        assert!((out[1] - 0.5).abs() < 1e-6); // (0.5 + 0.5) / 2
    }

    #[test]
    fn four_channel_average() {
        let input = vec![0.4_f32; 4];
        let out = downmix_to_mono(&input, 4);
        assert_eq!(out.len(), 1);
        assert!((out[0] - 0.4).abs() < 1e-6);
    }

    #[test]
    fn zero_channels_yields_empty() {
        let out = downmix_to_mono(&[1.0_f32, 2.0], 0);
        assert!(out.is_empty());
    }

    #[test]
    fn trailing_partial_frame_is_dropped() {
        // 5 samples at 2 channels: the dangling half-frame is ignored.
        let input = vec![1.0_f32, 1.0, 2.0, 2.0, 3.0];
        let out = downmix_to_mono(&input, 2);
        assert_eq!(out, vec![1.0, 2.0]);
    }

    #[test]
    fn downmix_into_reuses_buffer() {
        let mut scratch = Vec::new();
        downmix_into(&[1.0_f32, -1.0], 2, &mut scratch);
        assert_eq!(scratch, vec![0.0]);

        // Second call with a smaller result must fully replace the first.
        downmix_into(&[0.5_f32], 1, &mut scratch);
        assert_eq!(scratch, vec![0.5]);
    }
}
