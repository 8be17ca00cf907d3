//! Application entry point — console tuner meter.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (returns default on first run) and write
//!    a template settings file when none exists yet.
//! 3. Create [`tokio`] runtime (multi-thread, 2 workers).
//! 4. Allocate the shared ring buffer and the frame / event channels.
//! 5. Start a [`TunerSession`] over the cpal backend.
//! 6. Print one meter line per [`PitchFrame`] until Ctrl-C or the input
//!    device disappears.

use tokio::sync::mpsc;

use stringtune::audio::new_shared_ring;
use stringtune::config::AppConfig;
use stringtune::dsp::PitchFrame;
use stringtune::pipeline::TunerSession;
use stringtune::session::{CpalBackend, SessionEvent, SessionState};

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> anyhow::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("stringtune starting up");

    // 2. Configuration
    let first_run = AppConfig::is_first_run();
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });
    if first_run {
        // Leave a template behind so there is something to edit.
        match config.save() {
            Ok(()) => log::info!("wrote default settings file"),
            Err(e) => log::warn!("could not write default settings: {e}"),
        }
    }

    // 3. Tokio runtime (2 worker threads — analysis task + meter loop)
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()?;

    rt.block_on(run(config))
}

// ---------------------------------------------------------------------------
// Meter loop
// ---------------------------------------------------------------------------

async fn run(config: AppConfig) -> anyhow::Result<()> {
    // 4. Shared ring buffer and channels
    let ring = new_shared_ring(config.audio.ring_capacity());
    let (event_tx, mut event_rx) = mpsc::channel::<SessionEvent>(16);
    let (frame_tx, mut frame_rx) = mpsc::channel::<PitchFrame>(32);

    // 5. Tuner session over the cpal backend
    let backend = CpalBackend::new(config.audio.clone(), ring.clone(), event_tx);
    let mut session = TunerSession::start(backend, ring, &config, frame_tx)?;
    log::info!("listening — play a note (Ctrl-C to quit)");

    // 6. Meter loop until Ctrl-C or the session stops itself
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            maybe_frame = frame_rx.recv() => match maybe_frame {
                Some(frame) => print_frame(&frame),
                None => break,
            },

            maybe_event = event_rx.recv() => {
                let Some(event) = maybe_event else { break };
                if let Err(e) = session.handle_event(event).await {
                    log::error!("session cannot continue: {e}");
                    break;
                }
                if session.state() == SessionState::Inactive {
                    log::info!("capture stopped, exiting");
                    break;
                }
            },

            result = &mut ctrl_c => {
                if let Err(e) = result {
                    log::warn!("ctrl-c handler failed: {e}");
                }
                log::info!("shutting down");
                break;
            }
        }
    }

    session.stop().await;
    Ok(())
}

/// One meter line per analyzed frame.
///
/// A frame without a pitch lock prints dashes, so a quiet or ambiguous
/// signal looks clearly different from a hard failure (which logs an error
/// and exits).
fn print_frame(frame: &PitchFrame) {
    match frame.frequency {
        Some(hz) => println!(
            "{hz:8.2} Hz   conf {:.2}   rms {:.4}",
            frame.confidence, frame.rms
        ),
        None => println!(
            "      --      conf {:.2}   rms {:.4}",
            frame.confidence, frame.rms
        ),
    }
}
