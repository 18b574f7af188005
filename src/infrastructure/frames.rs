//! Boundary to the external vision pipeline.
//!
//! The pipeline emits a time-ordered stream of landmark frames at its own
//! rate. Concretely it pipes newline-delimited JSON into this process; a
//! blocking reader thread bridges stdin into a bounded tokio channel, the
//! same thread-plus-channel shape the rest of the runtime uses.

use crate::domain::models::LandmarkFrame;
use std::io::BufRead;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Queue depth between the reader thread and the event loop. Small on
/// purpose: the loop drops to the newest frame anyway.
pub const FRAME_QUEUE_DEPTH: usize = 8;

/// Spawn the stdin reader thread and return the frame receiver.
pub fn spawn_stdin_source() -> mpsc::Receiver<LandmarkFrame> {
    let (tx, rx) = mpsc::channel(FRAME_QUEUE_DEPTH);

    std::thread::Builder::new()
        .name("frame-source".into())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        warn!("frame input error: {e}");
                        break;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<LandmarkFrame>(&line) {
                    Ok(frame) => {
                        if tx.blocking_send(frame).is_err() {
                            // Receiver gone: the supervisor shut down.
                            break;
                        }
                    }
                    // Malformed input degrades that frame only.
                    Err(e) => debug!("discarding malformed frame: {e}"),
                }
            }
            info!("frame source ended");
        })
        .expect("Failed to spawn frame-source thread");

    rx
}

/// Collapse any backlog, keeping only the newest frame.
///
/// Pointer deltas are relative, so skipping stale frames loses a little
/// motion but never corrupts state; queueing them would add unbounded lag.
pub fn drain_to_latest(
    receiver: &mut mpsc::Receiver<LandmarkFrame>,
    newest: LandmarkFrame,
) -> LandmarkFrame {
    let mut newest = newest;
    let mut dropped = 0usize;
    while let Ok(frame) = receiver.try_recv() {
        newest = frame;
        dropped += 1;
    }
    if dropped > 0 {
        debug!("dropped {} stale frames", dropped);
    }
    newest
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_keeps_only_newest_frame() {
        let (tx, mut rx) = mpsc::channel(FRAME_QUEUE_DEPTH);
        for timestamp in 1..=3u64 {
            tx.try_send(LandmarkFrame::empty(timestamp)).unwrap();
        }

        let newest = drain_to_latest(&mut rx, LandmarkFrame::empty(0));
        assert_eq!(newest.timestamp_ms, 3);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn drain_with_empty_queue_returns_input() {
        let (_tx, mut rx) = mpsc::channel(FRAME_QUEUE_DEPTH);
        let newest = drain_to_latest(&mut rx, LandmarkFrame::empty(42));
        assert_eq!(newest.timestamp_ms, 42);
    }

    #[test]
    fn frame_json_round_trip() {
        let json = r#"{"timestamp_ms": 7, "hands": []}"#;
        let frame: LandmarkFrame = serde_json::from_str(json).unwrap();
        assert_eq!(frame.timestamp_ms, 7);
        assert!(frame.hands.is_empty());
    }
}
