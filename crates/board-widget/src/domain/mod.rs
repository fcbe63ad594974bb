//! Domain layer of the board widget: runtime configuration.
//!
//! Board value types (squares, colours, destination sets) live in
//! `board_core::domain`; this module only adds what is specific to running
//! a widget instance.

pub mod config;

pub use config::{BoardDefaults, ServerConfig, TimingConfig, WidgetConfig};
