//! Infrastructure layer: the in-memory surface, the event loop, the
//! configuration file loader and the WebSocket transport.
//!
//! **Dependency rule**: this layer may depend on `application`, `domain` and
//! `board_core`, but MUST NOT be imported by them.

pub mod config_file;
pub mod headless;
pub mod runtime;
pub mod ws_server;

pub use config_file::{load_config, ConfigError};
pub use runtime::{run_widget, WidgetChannels};
pub use ws_server::run_server;
