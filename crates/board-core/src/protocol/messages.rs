//! Typed commands (host → widget) and events (widget → host).
//!
//! The [`Envelope`](super::envelope::Envelope) only knows a `type` string and
//! an untyped `payload`.  This module turns the two into strongly typed
//! values:
//!
//! ```text
//! Host → Widget:  Envelope{type, payload}  →  CommandKind + HostCommand
//! Widget → Host:  WidgetEvent              →  Envelope{type, payload}
//! ```
//!
//! Splitting the lookup ([`CommandKind::from_type`]) from payload parsing
//! ([`HostCommand::parse`]) lets the dispatcher tell an *unknown* command
//! (reported as `Unknown type …`) apart from a *known command with a bad
//! payload* (a handler failure, also broadcast as an `error` event).

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use super::envelope::{Envelope, PROTOCOL_VERSION};
use crate::domain::{Color, DestinationSet, MovableColor, Promotion, Square};

/// A recognised command name whose payload failed to parse.
#[derive(Debug, Error, PartialEq)]
#[error("malformed {kind} payload: {reason}")]
pub struct PayloadError {
    pub kind: &'static str,
    pub reason: String,
}

// ── Command names ─────────────────────────────────────────────────────────────

/// Every command type the widget understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Init,
    SetPosition,
    SetLegalDests,
    SetPremoveDests,
    SetTurn,
    SetDraggable,
    SetFreeMode,
    ClearPremoves,
    PlayPremove,
    Flip,
    SetSize,
    Reset,
}

impl CommandKind {
    /// All variants, in protocol-table order.
    pub const ALL: [CommandKind; 12] = [
        CommandKind::Init,
        CommandKind::SetPosition,
        CommandKind::SetLegalDests,
        CommandKind::SetPremoveDests,
        CommandKind::SetTurn,
        CommandKind::SetDraggable,
        CommandKind::SetFreeMode,
        CommandKind::ClearPremoves,
        CommandKind::PlayPremove,
        CommandKind::Flip,
        CommandKind::SetSize,
        CommandKind::Reset,
    ];

    /// Looks up a wire `type` string.  Matching is case-sensitive.
    pub fn from_type(kind: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == kind)
    }

    /// The wire `type` string.
    pub fn as_str(self) -> &'static str {
        match self {
            CommandKind::Init => "init",
            CommandKind::SetPosition => "setPosition",
            CommandKind::SetLegalDests => "setLegalDests",
            CommandKind::SetPremoveDests => "setPremoveDests",
            CommandKind::SetTurn => "setTurn",
            CommandKind::SetDraggable => "setDraggable",
            CommandKind::SetFreeMode => "setFreeMode",
            CommandKind::ClearPremoves => "clearPremoves",
            CommandKind::PlayPremove => "playPremove",
            CommandKind::Flip => "flip",
            CommandKind::SetSize => "setSize",
            CommandKind::Reset => "reset",
        }
    }
}

// ── Command payloads ──────────────────────────────────────────────────────────

/// `init.options`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InitOptions {
    /// Which side is at the bottom of the board.
    pub orientation: Option<Color>,
    /// Whether to draw file/rank labels.
    pub coordinates: Option<bool>,
    /// Piece animation duration in milliseconds.
    pub animation_ms: Option<u32>,
    /// Whether touch drags should be prevented from scrolling the page.
    pub block_touch_scroll: Option<bool>,
    /// Which side the local user controls.
    pub player_color: Option<MovableColor>,
}

/// `init` payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InitPayload {
    pub options: InitOptions,
    /// Opaque theme description, passed through to the surface untouched.
    pub theme: Option<Value>,
}

/// `setPosition` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetPositionPayload {
    pub fen: String,
    #[serde(default)]
    pub last_move: Option<(Square, Square)>,
    #[serde(default)]
    pub check: Option<bool>,
    #[serde(default)]
    pub turn_color: Option<Color>,
    #[serde(default)]
    pub orientation: Option<Color>,
}

/// `setLegalDests` / `setPremoveDests` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DestsPayload {
    pub dests: DestinationSet,
}

/// `setTurn` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetTurnPayload {
    pub color: Color,
}

/// `setDraggable` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetDraggablePayload {
    pub enabled: bool,
    #[serde(default)]
    pub player_color: Option<MovableColor>,
}

/// `setFreeMode` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetFreeModePayload {
    pub free: bool,
}

/// `setSize` payload, in CSS pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetSizePayload {
    pub width: u32,
    pub height: u32,
}

/// A fully parsed host command.
#[derive(Debug, Clone, PartialEq)]
pub enum HostCommand {
    Init(InitPayload),
    SetPosition(SetPositionPayload),
    SetLegalDests(DestinationSet),
    SetPremoveDests(DestinationSet),
    SetTurn(Color),
    SetDraggable(SetDraggablePayload),
    SetFreeMode(bool),
    ClearPremoves,
    PlayPremove,
    Flip,
    SetSize(SetSizePayload),
    Reset,
}

impl HostCommand {
    /// Parses `payload` according to `kind`.
    ///
    /// Commands that take no arguments ignore whatever payload was sent.
    /// A missing `init` payload is treated as `{}`.
    ///
    /// # Errors
    ///
    /// Returns [`PayloadError`] if the payload does not match the command's
    /// schema (missing field, wrong type, invalid square key, ...).
    pub fn parse(kind: CommandKind, payload: Value) -> Result<Self, PayloadError> {
        Ok(match kind {
            CommandKind::Init => {
                let payload = if payload.is_null() { json!({}) } else { payload };
                HostCommand::Init(from_payload(kind, payload)?)
            }
            CommandKind::SetPosition => HostCommand::SetPosition(from_payload(kind, payload)?),
            CommandKind::SetLegalDests => {
                HostCommand::SetLegalDests(from_payload::<DestsPayload>(kind, payload)?.dests)
            }
            CommandKind::SetPremoveDests => {
                HostCommand::SetPremoveDests(from_payload::<DestsPayload>(kind, payload)?.dests)
            }
            CommandKind::SetTurn => {
                HostCommand::SetTurn(from_payload::<SetTurnPayload>(kind, payload)?.color)
            }
            CommandKind::SetDraggable => HostCommand::SetDraggable(from_payload(kind, payload)?),
            CommandKind::SetFreeMode => {
                HostCommand::SetFreeMode(from_payload::<SetFreeModePayload>(kind, payload)?.free)
            }
            CommandKind::ClearPremoves => HostCommand::ClearPremoves,
            CommandKind::PlayPremove => HostCommand::PlayPremove,
            CommandKind::Flip => HostCommand::Flip,
            CommandKind::SetSize => HostCommand::SetSize(from_payload(kind, payload)?),
            CommandKind::Reset => HostCommand::Reset,
        })
    }
}

fn from_payload<T: serde::de::DeserializeOwned>(
    kind: CommandKind,
    payload: Value,
) -> Result<T, PayloadError> {
    serde_json::from_value(payload).map_err(|e| PayloadError {
        kind: kind.as_str(),
        reason: e.to_string(),
    })
}

// ── Widget → Host events ──────────────────────────────────────────────────────

/// Everything the widget may send to its host.
#[derive(Debug, Clone, PartialEq)]
pub enum WidgetEvent {
    /// Load-time announcement; the only frame sent to the wildcard target.
    Hello,
    /// A host `init` completed.
    Ready,
    /// The user completed a move on the board.
    Move {
        from: Square,
        to: Square,
        promotion: Option<Promotion>,
    },
    /// The user selected a square, or cleared the selection (`None`).
    Select { square: Option<Square> },
    /// The user committed a premove.
    Premove { from: Square, to: Square },
    /// A committed premove was released by a permitted gesture.
    PremoveCleared,
    /// Reply to a command that carried an `id`.
    Ack {
        for_id: Value,
        ok: bool,
        error: Option<String>,
    },
    /// A command handler failed.
    Error { message: String, ctx: Option<Value> },
}

impl WidgetEvent {
    /// The wire `type` string.
    pub fn kind(&self) -> &'static str {
        match self {
            WidgetEvent::Hello => "hello",
            WidgetEvent::Ready => "ready",
            WidgetEvent::Move { .. } => "move",
            WidgetEvent::Select { .. } => "select",
            WidgetEvent::Premove { .. } => "premove",
            WidgetEvent::PremoveCleared => "premoveCleared",
            WidgetEvent::Ack { .. } => "ack",
            WidgetEvent::Error { .. } => "error",
        }
    }

    /// The wire payload.
    pub fn payload(&self) -> Value {
        match self {
            WidgetEvent::Hello => json!({ "version": PROTOCOL_VERSION }),
            WidgetEvent::Ready | WidgetEvent::PremoveCleared => json!({}),
            WidgetEvent::Move {
                from,
                to,
                promotion,
            } => {
                let mut body = json!({ "from": from, "to": to });
                if let Some(p) = promotion {
                    body["promotion"] = json!(p);
                }
                body
            }
            WidgetEvent::Select { square } => json!({ "square": square }),
            WidgetEvent::Premove { from, to } => json!({ "from": from, "to": to }),
            WidgetEvent::Ack { for_id, ok, error } => {
                let mut body = json!({ "for": for_id, "ok": ok });
                if let Some(e) = error {
                    body["error"] = json!(e);
                }
                body
            }
            WidgetEvent::Error { message, ctx } => {
                let mut body = json!({ "message": message });
                if let Some(c) = ctx {
                    body["ctx"] = c.clone();
                }
                body
            }
        }
    }

    /// Wraps the event in an outbound envelope stamped with `ts`.
    pub fn to_envelope(&self, ts: Option<i64>) -> Envelope {
        Envelope::outbound(self.kind(), Some(self.payload()), ts)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn sq(s: &str) -> Square {
        s.parse().unwrap()
    }

    #[test]
    fn test_every_kind_round_trips_through_its_name() {
        for kind in CommandKind::ALL {
            assert_eq!(CommandKind::from_type(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn test_unknown_and_miscased_types_are_not_commands() {
        assert_eq!(CommandKind::from_type("explode"), None);
        assert_eq!(CommandKind::from_type("SetPosition"), None);
    }

    #[test]
    fn test_parse_init_with_null_payload_uses_defaults() {
        let cmd = HostCommand::parse(CommandKind::Init, Value::Null).unwrap();
        assert_eq!(cmd, HostCommand::Init(InitPayload::default()));
    }

    #[test]
    fn test_parse_init_options() {
        // Arrange
        let payload = json!({
            "options": {"orientation": "black", "playerColor": "black", "animationMs": 150,
                        "coordinates": false, "blockTouchScroll": true},
            "theme": {"board": "green"}
        });

        // Act
        let HostCommand::Init(init) = HostCommand::parse(CommandKind::Init, payload).unwrap()
        else {
            panic!("expected Init");
        };

        // Assert
        assert_eq!(init.options.orientation, Some(Color::Black));
        assert_eq!(init.options.player_color, Some(MovableColor::Black));
        assert_eq!(init.options.animation_ms, Some(150));
        assert_eq!(init.options.coordinates, Some(false));
        assert_eq!(init.options.block_touch_scroll, Some(true));
        assert_eq!(init.theme, Some(json!({"board": "green"})));
    }

    #[test]
    fn test_parse_set_position_with_last_move() {
        let payload = json!({"fen": "8/8/8/8/8/8/8/8", "lastMove": ["e2", "e4"], "check": true,
                             "turnColor": "black"});
        let HostCommand::SetPosition(p) =
            HostCommand::parse(CommandKind::SetPosition, payload).unwrap()
        else {
            panic!("expected SetPosition");
        };
        assert_eq!(p.last_move, Some((sq("e2"), sq("e4"))));
        assert_eq!(p.check, Some(true));
        assert_eq!(p.turn_color, Some(Color::Black));
        assert_eq!(p.orientation, None);
    }

    #[test]
    fn test_parse_set_position_without_fen_fails() {
        let err = HostCommand::parse(CommandKind::SetPosition, json!({})).unwrap_err();
        assert_eq!(err.kind, "setPosition");
        assert!(err.to_string().contains("fen"));
    }

    #[test]
    fn test_parse_legal_dests() {
        let payload = json!({"dests": [["e2", ["e3", "e4"]]]});
        let HostCommand::SetLegalDests(d) =
            HostCommand::parse(CommandKind::SetLegalDests, payload).unwrap()
        else {
            panic!("expected SetLegalDests");
        };
        assert_eq!(d.get(sq("e2")), &[sq("e3"), sq("e4")]);
    }

    #[test]
    fn test_parse_dests_with_bad_square_fails() {
        let payload = json!({"dests": [["e2", ["z9"]]]});
        assert!(HostCommand::parse(CommandKind::SetPremoveDests, payload).is_err());
    }

    #[test]
    fn test_argumentless_commands_ignore_payload() {
        assert_eq!(
            HostCommand::parse(CommandKind::Flip, json!({"junk": 1})).unwrap(),
            HostCommand::Flip
        );
        assert_eq!(
            HostCommand::parse(CommandKind::Reset, Value::Null).unwrap(),
            HostCommand::Reset
        );
    }

    #[test]
    fn test_parse_set_draggable_optional_player_colour() {
        let cmd = HostCommand::parse(CommandKind::SetDraggable, json!({"enabled": false})).unwrap();
        assert_eq!(
            cmd,
            HostCommand::SetDraggable(SetDraggablePayload {
                enabled: false,
                player_color: None
            })
        );
    }

    #[test]
    fn test_parse_set_size_requires_numbers() {
        assert!(HostCommand::parse(CommandKind::SetSize, json!({"width": "big"})).is_err());
        assert_eq!(
            HostCommand::parse(CommandKind::SetSize, json!({"width": 400, "height": 400})).unwrap(),
            HostCommand::SetSize(SetSizePayload {
                width: 400,
                height: 400
            })
        );
    }

    #[test]
    fn test_ack_payload_echoes_id_and_omits_absent_error() {
        let ok = WidgetEvent::Ack {
            for_id: json!("1"),
            ok: true,
            error: None,
        };
        assert_eq!(ok.payload(), json!({"for": "1", "ok": true}));

        let failed = WidgetEvent::Ack {
            for_id: json!(9),
            ok: false,
            error: Some("board not ready".into()),
        };
        assert_eq!(
            failed.payload(),
            json!({"for": 9, "ok": false, "error": "board not ready"})
        );
    }

    #[test]
    fn test_select_null_payload() {
        let ev = WidgetEvent::Select { square: None };
        assert_eq!(ev.payload(), json!({"square": null}));
    }

    #[test]
    fn test_move_payload_with_promotion() {
        let ev = WidgetEvent::Move {
            from: sq("e7"),
            to: sq("e8"),
            promotion: Some(Promotion::Queen),
        };
        assert_eq!(
            ev.payload(),
            json!({"from": "e7", "to": "e8", "promotion": "q"})
        );
    }

    #[test]
    fn test_hello_envelope_carries_protocol_version() {
        let env = WidgetEvent::Hello.to_envelope(Some(10));
        assert_eq!(env.kind, "hello");
        assert_eq!(env.version, PROTOCOL_VERSION);
        assert_eq!(env.ts, Some(10));
        assert_eq!(env.payload, Some(json!({"version": 1})));
    }
}
