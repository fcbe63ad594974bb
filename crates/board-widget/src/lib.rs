//! # board-widget
//!
//! Runtime for the embedded board widget: the state reconciler, the
//! command dispatcher and a WebSocket transport that lets host pages and a
//! remote renderer talk to it.
//!
//! # Architecture overview
//!
//! ```text
//! Host page  (envelope JSON over WebSocket /host)
//!       ↕
//! board-widget  ← this crate
//!   domain/          WidgetConfig
//!   application/     dispatcher → reconciler → RenderingSurface
//!   infrastructure/
//!     runtime        single-threaded event loop + init fallback timer
//!     headless       in-memory RenderingSurface
//!     ws_server      /host and /surface WebSocket endpoints
//!       ↕
//! Renderer  (PartialState JSON out, gestures in, over /surface)
//! ```
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.

pub mod application;
pub mod domain;
pub mod infrastructure;
