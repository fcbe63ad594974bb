//! Command dispatcher: the inbound-frame pipeline and its failure boundary.
//!
//! ```text
//!   InboundFrame ─▶ Origin Guard ─▶ decode_envelope ─▶ CommandKind lookup
//!                       │ drop            │ drop             │ unknown: ack{ok:false}
//!                       ▼                 ▼                  ▼
//!                                                     HostCommand::parse
//!                                                            │
//!                                                            ▼
//!                                                execute on BoardReconciler
//!                                                            │
//!                            board events, ack, ready / error ◀┘
//!                                        │
//!                                        ▼
//!                     OutboundFrame{target: trusted origin, counterpart}
//! ```
//!
//! Nothing a single command does can take the session down: every handler
//! error becomes an `ack{ok:false}` (when the command carried an `id`) plus
//! a standalone `error` event, and the dispatcher stays ready for the next
//! frame.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, info, warn};

use board_core::protocol::{
    decode_envelope, CommandKind, Envelope, HostCommand, WidgetEvent, WILDCARD_ORIGIN,
};
use board_core::protocol::messages::InitPayload;

use super::clock::Clock;
use super::reconciler::{BoardReconciler, CommandError};
use super::session::{CounterpartHandle, Session};
use super::surface::{SurfaceConfig, SurfaceFactory, SurfaceGesture};
use crate::domain::config::WidgetConfig;

/// A raw frame as delivered by the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundFrame {
    /// Origin of the sending page.
    pub origin: String,
    /// Handle of the sending window.
    pub source: CounterpartHandle,
    /// The undecoded message text.
    pub data: String,
}

/// A frame ready for the transport to deliver.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundFrame {
    /// Origin the frame may be delivered to, or `*`.
    pub target: String,
    /// The bound counterpart, if any frame has been accepted yet.
    pub counterpart: Option<CounterpartHandle>,
    pub envelope: Envelope,
}

/// Routes host commands to the board and addresses the replies.
pub struct CommandDispatcher<F: SurfaceFactory> {
    factory: F,
    config: WidgetConfig,
    clock: Arc<dyn Clock>,
    session: Session,
    board: Option<BoardReconciler<F::Surface>>,
}

impl<F: SurfaceFactory> CommandDispatcher<F> {
    pub fn new(factory: F, config: WidgetConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            factory,
            config,
            clock,
            session: Session::new(),
            board: None,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn board(&self) -> Option<&BoardReconciler<F::Surface>> {
        self.board.as_ref()
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// `true` once a host `init` has succeeded (and until `reset`).
    pub fn is_initialized(&self) -> bool {
        self.session.is_initialized()
    }

    /// The load-time announcement.  Always addressed to the wildcard.
    pub fn hello(&self) -> OutboundFrame {
        OutboundFrame {
            target: WILDCARD_ORIGIN.to_string(),
            counterpart: None,
            envelope: WidgetEvent::Hello.to_envelope(Some(self.clock.epoch_ms())),
        }
    }

    /// Runs one inbound frame through the full pipeline.
    ///
    /// Frames from untrusted origins and frames that fail to decode are
    /// dropped without a reply.
    pub fn handle_frame(&mut self, frame: InboundFrame) -> Vec<OutboundFrame> {
        if !self.session.admits(&frame.origin) {
            debug!(origin = %frame.origin, "dropping frame from untrusted origin");
            return Vec::new();
        }
        let envelope = match decode_envelope(&frame.data) {
            Ok(envelope) => envelope,
            Err(e) => {
                debug!("dropping undecodable frame: {e}");
                return Vec::new();
            }
        };
        self.session.bind_counterpart(frame.source);
        let events = self.dispatch(envelope, &frame.origin);
        self.address(events)
    }

    /// Executes a decoded envelope and returns the events it produced, in
    /// delivery order: board events, then the `ack`, then `ready` or `error`.
    pub fn dispatch(&mut self, envelope: Envelope, origin: &str) -> Vec<WidgetEvent> {
        let Some(kind) = CommandKind::from_type(&envelope.kind) else {
            debug!(command = %envelope.kind, "unknown command type");
            return match envelope.id {
                Some(id) => vec![WidgetEvent::Ack {
                    for_id: id,
                    ok: false,
                    error: Some(format!("Unknown type {}", envelope.kind)),
                }],
                None => Vec::new(),
            };
        };

        let payload = envelope.payload_or_null();
        let result = self.execute(kind, payload, origin);

        let mut events = match self.board.as_mut() {
            Some(board) => board.drain_events(),
            None => Vec::new(),
        };
        match result {
            Ok(()) => {
                if let Some(id) = envelope.id {
                    events.push(ack(id, None));
                }
                if kind == CommandKind::Init {
                    events.push(WidgetEvent::Ready);
                }
            }
            Err(err) => {
                warn!(command = kind.as_str(), "command failed: {err}");
                let message = err.to_string();
                if let Some(id) = envelope.id {
                    events.push(ack(id, Some(message.clone())));
                }
                events.push(WidgetEvent::Error {
                    message,
                    ctx: Some(json!({ "type": kind.as_str() })),
                });
            }
        }
        events
    }

    /// Feeds a renderer gesture to the board.  Dropped before any board exists.
    pub fn handle_gesture(&mut self, gesture: SurfaceGesture) -> Vec<OutboundFrame> {
        let Some(board) = self.board.as_mut() else {
            debug!("dropping gesture: no board");
            return Vec::new();
        };
        board.handle_gesture(gesture);
        let events = board.drain_events();
        self.address(events)
    }

    /// Builds a default board when the host never sent `init`.
    ///
    /// Adopts no origin and announces nothing.  Returns `false` if a board
    /// already exists.
    pub fn fallback_init(&mut self) -> bool {
        if self.board.is_some() || self.session.is_initialized() {
            return false;
        }
        info!("no init received; self-initialising with defaults");
        self.init_board(&InitPayload::default());
        true
    }

    /// Stamps and addresses `events` for the transport.
    pub fn address(&self, events: Vec<WidgetEvent>) -> Vec<OutboundFrame> {
        if events.is_empty() {
            return Vec::new();
        }
        let ts = self.clock.epoch_ms();
        let target = self.session.outbound_target();
        let counterpart = self.session.counterpart();
        events
            .iter()
            .map(|event| OutboundFrame {
                target: target.to_string(),
                counterpart,
                envelope: event.to_envelope(Some(ts)),
            })
            .collect()
    }

    fn execute(&mut self, kind: CommandKind, payload: Value, origin: &str) -> Result<(), CommandError> {
        debug!(command = kind.as_str(), "executing command");
        match HostCommand::parse(kind, payload)? {
            HostCommand::Init(init) => {
                self.session.adopt_origin(origin);
                self.init_board(&init);
                self.session.mark_initialized();
                info!("board initialised by host");
            }
            HostCommand::Reset => {
                if let Some(board) = self.board.take() {
                    board.teardown();
                }
                self.session.mark_reset();
                info!("board reset");
            }
            HostCommand::SetPosition(p) => self.ready_board()?.set_position(p)?,
            HostCommand::SetLegalDests(dests) => self.ready_board()?.set_legal_dests(dests),
            HostCommand::SetPremoveDests(dests) => self.ready_board()?.set_premove_dests(dests),
            HostCommand::SetTurn(color) => self.ready_board()?.set_turn(color),
            HostCommand::SetDraggable(p) => self.ready_board()?.set_draggable(p),
            HostCommand::SetFreeMode(free) => self.ready_board()?.set_free_mode(free),
            HostCommand::ClearPremoves => self.ready_board()?.clear_premoves(),
            HostCommand::PlayPremove => self.ready_board()?.play_premove(),
            HostCommand::Flip => self.ready_board()?.flip(),
            HostCommand::SetSize(size) => self.ready_board()?.resize(size.width, size.height)?,
        }
        Ok(())
    }

    fn ready_board(&mut self) -> Result<&mut BoardReconciler<F::Surface>, CommandError> {
        self.board.as_mut().ok_or(CommandError::BoardNotReady)
    }

    fn init_board(&mut self, init: &InitPayload) {
        if let Some(previous) = self.board.take() {
            debug!("tearing down previous board before re-init");
            previous.teardown();
        }
        let defaults = &self.config.board;
        let options = &init.options;
        let config = SurfaceConfig {
            orientation: options.orientation.unwrap_or(defaults.orientation),
            coordinates: options.coordinates.unwrap_or(defaults.coordinates),
            animation_ms: options.animation_ms.unwrap_or(defaults.animation_ms),
            block_touch_scroll: options
                .block_touch_scroll
                .unwrap_or(defaults.block_touch_scroll),
            movable_color: options.player_color.unwrap_or(defaults.player_color),
            theme: init.theme.clone(),
        };
        let surface = self.factory.configure(&config);
        self.board = Some(BoardReconciler::new(
            surface,
            &config,
            &self.config.timing,
            Arc::clone(&self.clock),
        ));
    }
}

fn ack(for_id: Value, error: Option<String>) -> WidgetEvent {
    WidgetEvent::Ack {
        for_id,
        ok: error.is_none(),
        error,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
