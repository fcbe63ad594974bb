//! Widget configuration types.
//!
//! [`WidgetConfig`] is the single source of truth for all runtime settings:
//! timing windows, the board options used when the host never sends
//! `init`, and the transport's bind address.  It can be built from
//! defaults, from a TOML document, or from CLI arguments layered on top of
//! either.
//!
//! # Serde default values
//!
//! Every field carries `#[serde(default = ...)]`, so a configuration file
//! only needs to mention what it changes:
//!
//! ```toml
//! [timing]
//! init_fallback_ms = 1000
//!
//! [server]
//! port = 9000
//! ```

use serde::{Deserialize, Serialize};

use board_core::domain::{Color, MovableColor};

/// Top-level widget configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WidgetConfig {
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub board: BoardDefaults,
    #[serde(default)]
    pub server: ServerConfig,
}

impl WidgetConfig {
    /// Parses a TOML document, filling gaps with defaults.
    ///
    /// # Errors
    ///
    /// Returns the TOML parse error if the document is malformed.
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

/// Suppression and fallback windows, in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingConfig {
    /// A deselect this soon after a selection is ignored.
    #[serde(default = "default_select_suppress_ms")]
    pub select_suppress_ms: u64,
    /// An empty destination push this soon after a non-empty one is ignored.
    #[serde(default = "default_dests_clear_suppress_ms")]
    pub dests_clear_suppress_ms: u64,
    /// A selection younger than this survives a position push on the
    /// player's own turn.
    #[serde(default = "default_selection_persist_ms")]
    pub selection_persist_ms: u64,
    /// Delay after load before the widget initialises itself.
    #[serde(default = "default_init_fallback_ms")]
    pub init_fallback_ms: u64,
}

/// Board options used by the fallback self-init and for `init` fields the
/// host leaves out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardDefaults {
    #[serde(default = "default_orientation")]
    pub orientation: Color,
    #[serde(default = "default_true")]
    pub coordinates: bool,
    #[serde(default = "default_animation_ms")]
    pub animation_ms: u32,
    #[serde(default = "default_true")]
    pub block_touch_scroll: bool,
    #[serde(default = "default_player_color")]
    pub player_color: MovableColor,
}

/// Transport settings for the `board-widget` binary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// IP address the WebSocket listener binds to.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// TCP port of the WebSocket listener.
    #[serde(default = "default_port")]
    pub port: u16,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_select_suppress_ms() -> u64 {
    200
}
fn default_dests_clear_suppress_ms() -> u64 {
    200
}
fn default_selection_persist_ms() -> u64 {
    800
}
fn default_init_fallback_ms() -> u64 {
    600
}
fn default_orientation() -> Color {
    Color::White
}
fn default_true() -> bool {
    true
}
fn default_animation_ms() -> u32 {
    200
}
fn default_player_color() -> MovableColor {
    MovableColor::Both
}
fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    24850
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            select_suppress_ms: default_select_suppress_ms(),
            dests_clear_suppress_ms: default_dests_clear_suppress_ms(),
            selection_persist_ms: default_selection_persist_ms(),
            init_fallback_ms: default_init_fallback_ms(),
        }
    }
}

impl Default for BoardDefaults {
    fn default() -> Self {
        Self {
            orientation: default_orientation(),
            coordinates: true,
            animation_ms: default_animation_ms(),
            block_touch_scroll: true,
            player_color: default_player_color(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
