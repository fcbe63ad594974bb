//! Application layer of the board widget.
//!
//! # What is the "application" layer? (for beginners)
//!
//! This layer holds the widget's behaviour: what happens when a host
//! command or a user gesture arrives.  It talks to the outside world only
//! through traits ([`surface::RenderingSurface`], [`clock::Clock`]), so
//! every rule here runs unchanged against the in-memory surface used in
//! tests.
//!
//! # Sub-modules
//!
//! - **`surface`**      – The narrow contract of the rendering surface.
//! - **`clock`**        – Monotonic and wall-clock time behind a trait.
//! - **`premove_lock`** – Keeps a committed premove until a permitted
//!   gesture releases it.
//! - **`suppression`**  – Windows that swallow flicker-inducing deselects
//!   and destination clears.
//! - **`reconciler`**   – The single writer of board state; applies every
//!   host mutation and re-applies derived state afterwards.
//! - **`session`**      – Trusted origin, counterpart handle and the
//!   initialised flag.
//! - **`dispatcher`**   – Turns inbound frames into reconciler calls and
//!   replies.

pub mod clock;
pub mod dispatcher;
pub mod premove_lock;
pub mod reconciler;
pub mod session;
pub mod suppression;
pub mod surface;
