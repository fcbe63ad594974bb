//! The widget event loop.
//!
//! One task owns the [`CommandDispatcher`] (and through it the reconciler
//! and the surface).  It drains two input queues, host frames and renderer
//! gestures, handling each item to completion before taking the next, so
//! the board never sees interleaved mutations.  A single one-shot timer
//! self-initialises the board if the host stays silent.
//!
//! ```text
//!   host_rx ────┐
//!               ├──▶ select! ──▶ CommandDispatcher ──▶ out_tx
//!   gesture_rx ─┤
//!   fallback ───┘ (fires once, disarmed by a genuine init)
//! ```

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::application::dispatcher::{CommandDispatcher, InboundFrame, OutboundFrame};
use crate::application::surface::{SurfaceFactory, SurfaceGesture};

/// The queues connecting the event loop to its transport.
pub struct WidgetChannels {
    pub host_rx: mpsc::Receiver<InboundFrame>,
    pub gesture_rx: mpsc::Receiver<SurfaceGesture>,
    pub out_tx: mpsc::Sender<OutboundFrame>,
}

/// Runs the widget until both input queues close or the outbound queue does.
///
/// Sends `hello` first.  Returns the dispatcher so callers can inspect the
/// final state.
pub async fn run_widget<F: SurfaceFactory>(
    mut dispatcher: CommandDispatcher<F>,
    channels: WidgetChannels,
    init_fallback: Duration,
) -> CommandDispatcher<F> {
    let WidgetChannels {
        mut host_rx,
        mut gesture_rx,
        out_tx,
    } = channels;

    if out_tx.send(dispatcher.hello()).await.is_err() {
        warn!("outbound queue closed before hello");
        return dispatcher;
    }

    let fallback = tokio::time::sleep(init_fallback);
    tokio::pin!(fallback);
    let mut fallback_armed = true;
    let mut host_open = true;
    let mut gestures_open = true;

    while host_open || gestures_open {
        let frames = tokio::select! {
            biased;

            maybe = host_rx.recv(), if host_open => match maybe {
                Some(frame) => dispatcher.handle_frame(frame),
                None => {
                    debug!("host queue closed");
                    host_open = false;
                    continue;
                }
            },

            maybe = gesture_rx.recv(), if gestures_open => match maybe {
                Some(gesture) => dispatcher.handle_gesture(gesture),
                None => {
                    debug!("gesture queue closed");
                    gestures_open = false;
                    continue;
                }
            },

            () = &mut fallback, if fallback_armed => {
                fallback_armed = false;
                dispatcher.fallback_init();
                Vec::new()
            }
        };

        if fallback_armed && dispatcher.is_initialized() {
            debug!("host init received; fallback disarmed");
            fallback_armed = false;
        }

        for frame in frames {
            if out_tx.send(frame).await.is_err() {
                warn!("outbound queue closed; stopping widget");
                return dispatcher;
            }
        }
    }

    info!("widget inputs closed; event loop finished");
    dispatcher
}

// ── Tests ─────────────────────────────────────────────────────────────────────
