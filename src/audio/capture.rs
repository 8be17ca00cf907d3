//! Microphone capture via `cpal`.
//!
//! [`AudioCapture`] wraps the cpal host/device/stream lifecycle.  Call
//! [`AudioCapture::start`] with a shared ring buffer to begin streaming: the
//! hardware callback down-mixes each chunk to mono and writes it straight
//! into the buffer.  The returned [`StreamHandle`] is a RAII guard — dropping
//! it uninstalls the callback and stops the underlying cpal stream.
//!
//! The data callback runs on the platform's real-time audio thread.  It must
//! never block or panic: the ring-buffer lock is taken only around the write
//! itself, the down-mix scratch vector is reused across invocations, and a
//! poisoned lock is skipped rather than unwrapped.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use thiserror::Error;

use crate::audio::downmix::downmix_into;
use crate::audio::SharedRingBuffer;

// ---------------------------------------------------------------------------
// StreamHandle
// ---------------------------------------------------------------------------

/// RAII guard that keeps the cpal stream alive.
///
/// Dropping this value drops the `cpal::Stream`, which stops the hardware
/// stream and uninstalls the data callback — after that no further writes can
/// reach the ring buffer.
pub struct StreamHandle {
    stream: cpal::Stream,
}

impl StreamHandle {
    /// Pause the hardware stream without tearing it down.
    ///
    /// The callback stays installed; no samples are delivered until
    /// [`resume`](Self::resume).
    pub fn pause(&self) -> Result<(), CaptureError> {
        self.stream.pause()?;
        Ok(())
    }

    /// Restart a paused hardware stream.
    pub fn resume(&self) -> Result<(), CaptureError> {
        self.stream.play()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// CaptureError
// ---------------------------------------------------------------------------

/// Errors that can occur while setting up or controlling audio capture.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no input device found on the default audio host")]
    NoDevice,

    #[error("failed to query default input config: {0}")]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("failed to build input stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("failed to pause audio stream: {0}")]
    PauseStream(#[from] cpal::PauseStreamError),
}

// ---------------------------------------------------------------------------
// AudioCapture
// ---------------------------------------------------------------------------

/// Microphone capture device wrapper built on top of `cpal`.
///
/// # Example
///
/// ```rust,no_run
/// use stringtune::audio::{new_shared_ring, AudioCapture};
///
/// let ring = new_shared_ring(44_100);
/// let capture = AudioCapture::new(None, 44_100).unwrap();
/// let _handle = capture
///     .start(ring.clone(), |err| eprintln!("stream error: {err}"))
///     .unwrap();
/// // `_handle` keeps the stream alive; drop it to stop capturing.
/// ```
pub struct AudioCapture {
    device: cpal::Device,
    config: cpal::StreamConfig,
    /// Actual sample rate of the stream (Hz); may differ from the requested
    /// rate when the device does not support it.
    sample_rate: u32,
    /// Number of interleaved channels the device delivers.
    channels: u16,
}

impl AudioCapture {
    /// Create a new [`AudioCapture`].
    ///
    /// `preferred_device` selects an input device by case-insensitive name
    /// substring; `None` (or no match, with a warning) uses the host default.
    /// `requested_rate` is negotiated against the device's supported
    /// configurations — when the device cannot run at that rate its default
    /// configuration is used instead and the actual rate is reported by
    /// [`sample_rate`](Self::sample_rate).
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::NoDevice`] when no input device is available,
    /// or [`CaptureError::DefaultConfig`] when the device cannot report a
    /// stream configuration.
    pub fn new(preferred_device: Option<&str>, requested_rate: u32) -> Result<Self, CaptureError> {
        let host = cpal::default_host();
        let device = match preferred_device {
            Some(name) => find_input_device(&host, name)?,
            None => host.default_input_device().ok_or(CaptureError::NoDevice)?,
        };

        let supported = negotiate_config(&device, requested_rate)?;
        let channels = supported.channels();
        let sample_rate = supported.sample_rate().0;
        let config: cpal::StreamConfig = supported.into();

        if sample_rate != requested_rate {
            log::warn!(
                "input device does not support {requested_rate} Hz, capturing at {sample_rate} Hz"
            );
        }
        log::info!(
            "capture device: '{}' ({sample_rate} Hz, {channels} ch)",
            device.name().unwrap_or_else(|_| "unknown".into())
        );

        Ok(Self {
            device,
            config,
            sample_rate,
            channels,
        })
    }

    /// Start capturing into `sink`.
    ///
    /// Each hardware buffer is down-mixed to mono and appended to the ring
    /// buffer; when the buffer is full the oldest samples are overwritten, so
    /// the audio thread is never blocked by a slow consumer.  `on_error` is
    /// invoked (after logging) when the platform reports a stream error, e.g.
    /// the device disappearing mid-session.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::BuildStream`] or [`CaptureError::PlayStream`]
    /// if the platform rejects the stream configuration.
    pub fn start(
        &self,
        sink: SharedRingBuffer,
        on_error: impl FnMut(cpal::StreamError) + Send + 'static,
    ) -> Result<StreamHandle, CaptureError> {
        let channels = self.channels;
        let mut scratch: Vec<f32> = Vec::new();
        let mut on_error = on_error;

        let stream = self.device.build_input_stream(
            &self.config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                deliver(&sink, data, channels, &mut scratch);
            },
            move |err: cpal::StreamError| {
                log::error!("cpal stream error: {err}");
                on_error(err);
            },
            None, // no timeout
        )?;

        stream.play()?;
        Ok(StreamHandle { stream })
    }

    /// Actual sample rate of the capture stream in Hz.
    ///
    /// Downstream analysis (lag ranges, frame pacing) must be derived from
    /// this value, not from the requested rate.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of interleaved channels the device delivers.
    pub fn channels(&self) -> u16 {
        self.channels
    }
}

/// Find an input device whose name contains `name` (case-insensitive),
/// falling back to the host default with a warning.
fn find_input_device(host: &cpal::Host, name: &str) -> Result<cpal::Device, CaptureError> {
    let needle = name.to_lowercase();
    if let Ok(devices) = host.input_devices() {
        for device in devices {
            if let Ok(device_name) = device.name() {
                if device_name.to_lowercase().contains(&needle) {
                    return Ok(device);
                }
            }
        }
    }
    log::warn!("no input device matching '{name}', using host default");
    host.default_input_device().ok_or(CaptureError::NoDevice)
}

/// Pick a stream configuration: an `f32` config at `requested_rate` when the
/// device offers one, otherwise the device default.
fn negotiate_config(
    device: &cpal::Device,
    requested_rate: u32,
) -> Result<cpal::SupportedStreamConfig, CaptureError> {
    if let Ok(ranges) = device.supported_input_configs() {
        for range in ranges {
            if range.sample_format() != cpal::SampleFormat::F32 {
                continue;
            }
            if let Some(config) = range.try_with_sample_rate(cpal::SampleRate(requested_rate)) {
                return Ok(config);
            }
        }
    }
    Ok(device.default_input_config()?)
}

/// Push one hardware buffer into the ring: down-mix outside the lock, then
/// write under it.  A poisoned lock (consumer panicked) drops the chunk
/// instead of panicking the audio thread.
fn deliver(sink: &SharedRingBuffer, data: &[f32], channels: u16, scratch: &mut Vec<f32>) {
    if channels == 1 {
        if let Ok(mut buf) = sink.lock() {
            buf.write(data);
        }
        return;
    }

    downmix_into(data, channels, scratch);
    if let Ok(mut buf) = sink.lock() {
        buf.write(scratch);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
