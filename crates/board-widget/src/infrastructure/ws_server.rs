//! WebSocket transport for the widget.
//!
//! Two kinds of client connect to the same listener, told apart by the
//! request path:
//!
//! - **`/host`**: an embedding page.  Its `Origin` handshake header is the
//!   frame origin the Origin Guard checks, and each connection gets its own
//!   [`CounterpartHandle`].  Text frames are envelopes.
//! - **`/surface`**: a remote renderer.  It receives every
//!   [`PartialState`](crate::application::surface::PartialState) the
//!   headless surface applies, as JSON, and sends
//!   [`SurfaceGesture`] JSON back.
//!
//! ```text
//!   /host conns ──InboundFrame──▶ ┌────────────┐ ──OutboundFrame──▶ router ──▶ /host conns
//!                                 │ run_widget │
//!   /surface conns ──gesture────▶ └────────────┘ ──PartialState──▶ broadcast ──▶ /surface conns
//! ```
//!
//! Frames produced before any host has connected (the load-time `hello`)
//! are held by the router and delivered to the first host that connects.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};
use tokio::time::timeout;
use tokio_tungstenite::{
    accept_hdr_async,
    tungstenite::{
        handshake::server::{ErrorResponse, Request, Response},
        Error as WsError, Message as WsMessage,
    },
};
use tracing::{debug, error, info, warn};

use board_core::protocol::{encode_envelope, WILDCARD_ORIGIN};

use crate::application::clock::SystemClock;
use crate::application::dispatcher::{CommandDispatcher, InboundFrame, OutboundFrame};
use crate::application::session::CounterpartHandle;
use crate::application::surface::{PartialState, SurfaceGesture};
use crate::domain::config::WidgetConfig;
use crate::infrastructure::headless::HeadlessSurfaceFactory;
use crate::infrastructure::runtime::{run_widget, WidgetChannels};

/// Path host pages connect to.
pub const HOST_PATH: &str = "/host";
/// Path remote renderers connect to.
pub const SURFACE_PATH: &str = "/surface";
/// Origin reported for connections without an `Origin` header.
pub const OPAQUE_ORIGIN: &str = "null";

const QUEUE_DEPTH: usize = 256;

/// Frames held for the first host connection; later ones are dropped so the
/// `hello` at the front always survives.
const MAX_PENDING_FRAMES: usize = 64;

// ── Entry points ──────────────────────────────────────────────────────────────

/// Binds the configured address and serves until `running` is cleared.
///
/// # Errors
///
/// Returns an error if the bind address is invalid or cannot be bound.
pub async fn run_server(config: WidgetConfig, running: Arc<AtomicBool>) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.bind_address, config.server.port)
        .parse()
        .with_context(|| {
            format!(
                "invalid bind address: '{}:{}'",
                config.server.bind_address, config.server.port
            )
        })?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind WebSocket listener on {addr}"))?;

    info!("board widget listening on {addr}");
    serve(listener, config, running).await
}

/// Serves on an already bound listener.
///
/// Spawns the widget event loop, the outbound router and the renderer
/// mirror, then accepts connections until `running` is cleared.
///
/// # Errors
///
/// Currently infallible once the listener is bound; the `Result` mirrors
/// [`run_server`].
pub async fn serve(
    listener: TcpListener,
    config: WidgetConfig,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    let (host_tx, host_rx) = mpsc::channel::<InboundFrame>(QUEUE_DEPTH);
    let (gesture_tx, gesture_rx) = mpsc::channel::<SurfaceGesture>(QUEUE_DEPTH);
    let (out_tx, out_rx) = mpsc::channel::<OutboundFrame>(QUEUE_DEPTH);
    let (mirror_tx, mirror_rx) = mpsc::unbounded_channel::<PartialState>();
    let (surface_tx, _) = broadcast::channel::<String>(QUEUE_DEPTH);
    let (router_tx, router_rx) = mpsc::unbounded_channel::<RouterEvent>();

    let fallback = Duration::from_millis(config.timing.init_fallback_ms);
    let dispatcher = CommandDispatcher::new(
        HeadlessSurfaceFactory::with_mirror(mirror_tx),
        config,
        Arc::new(SystemClock::new()),
    );
    let channels = WidgetChannels {
        host_rx,
        gesture_rx,
        out_tx,
    };
    let widget_task = tokio::spawn(async move {
        run_widget(dispatcher, channels, fallback).await;
    });
    let router_task = tokio::spawn(route_outbound(router_rx, out_rx));
    let mirror_task = tokio::spawn(mirror_states(mirror_rx, surface_tx.clone()));

    let peers = Peers {
        host_tx,
        gesture_tx,
        router_tx,
        surface_tx,
    };

    loop {
        if !running.load(Ordering::Relaxed) {
            info!("shutdown flag set; stopping accept loop");
            break;
        }

        // Short timeout so the shutdown flag is polled regularly.
        match timeout(Duration::from_millis(200), listener.accept()).await {
            Ok(Ok((stream, peer_addr))) => {
                debug!("new connection from {peer_addr}");
                let peers = peers.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, peer_addr, peers).await {
                        warn!("connection {peer_addr} closed with error: {e:#}");
                    }
                });
            }
            Ok(Err(e)) => error!("accept error: {e}"),
            Err(_) => {}
        }
    }

    widget_task.abort();
    router_task.abort();
    mirror_task.abort();
    Ok(())
}

// ── Connections ───────────────────────────────────────────────────────────────

/// Senders every connection needs.
#[derive(Clone)]
struct Peers {
    host_tx: mpsc::Sender<InboundFrame>,
    gesture_tx: mpsc::Sender<SurfaceGesture>,
    router_tx: mpsc::UnboundedSender<RouterEvent>,
    surface_tx: broadcast::Sender<String>,
}

async fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    peers: Peers,
) -> anyhow::Result<()> {
    let mut path = String::new();
    let mut origin = None;
    let ws = accept_hdr_async(stream, |req: &Request, resp: Response| {
        path = req.uri().path().to_string();
        origin = req
            .headers()
            .get("origin")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        Ok::<Response, ErrorResponse>(resp)
    })
    .await
    .with_context(|| format!("WebSocket handshake failed with {peer_addr}"))?;

    match path.as_str() {
        HOST_PATH => {
            let origin = origin.unwrap_or_else(|| OPAQUE_ORIGIN.to_string());
            run_host_session(ws, origin, peers).await
        }
        SURFACE_PATH => run_surface_session(ws, peers).await,
        other => {
            warn!("{peer_addr}: unknown path {other}; closing");
            Ok(())
        }
    }
}

async fn run_host_session(
    ws: tokio_tungstenite::WebSocketStream<TcpStream>,
    origin: String,
    peers: Peers,
) -> anyhow::Result<()> {
    let handle = CounterpartHandle::new_v4();
    info!("host {handle} connected from origin {origin}");

    let (mut sink, mut stream) = ws.split();
    let (peer_tx, mut peer_rx) = mpsc::unbounded_channel::<String>();
    peers
        .router_tx
        .send(RouterEvent::Register {
            handle,
            origin: origin.clone(),
            tx: peer_tx,
        })
        .context("router stopped")?;

    let writer = tokio::spawn(async move {
        while let Some(text) = peer_rx.recv().await {
            if sink.send(WsMessage::Text(text)).await.is_err() {
                break;
            }
        }
    });

    while let Some(message) = stream.next().await {
        match message {
            Ok(WsMessage::Text(data)) => {
                let frame = InboundFrame {
                    origin: origin.clone(),
                    source: handle,
                    data,
                };
                if peers.host_tx.send(frame).await.is_err() {
                    warn!("host {handle}: widget stopped");
                    break;
                }
            }
            Ok(WsMessage::Close(_)) => break,
            Ok(_) => {}
            Err(WsError::ConnectionClosed | WsError::Protocol(_)) => break,
            Err(e) => {
                warn!("host {handle}: WebSocket error: {e}");
                break;
            }
        }
    }

    // The router may already be gone during shutdown.
    let _ = peers.router_tx.send(RouterEvent::Unregister(handle));
    writer.abort();
    info!("host {handle} disconnected");
    Ok(())
}

async fn run_surface_session(
    ws: tokio_tungstenite::WebSocketStream<TcpStream>,
    peers: Peers,
) -> anyhow::Result<()> {
    info!("renderer connected");
    let (mut sink, mut stream) = ws.split();
    let mut states = peers.surface_tx.subscribe();

    let writer = tokio::spawn(async move {
        loop {
            match states.recv().await {
                Ok(text) => {
                    if sink.send(WsMessage::Text(text)).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("renderer lagged; skipped {n} surface updates");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    while let Some(message) = stream.next().await {
        match message {
            Ok(WsMessage::Text(data)) => match serde_json::from_str::<SurfaceGesture>(&data) {
                Ok(gesture) => {
                    if peers.gesture_tx.send(gesture).await.is_err() {
                        break;
                    }
                }
                Err(e) => warn!("renderer sent an invalid gesture: {e}"),
            },
            Ok(WsMessage::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                debug!("renderer connection ended: {e}");
                break;
            }
        }
    }

    writer.abort();
    info!("renderer disconnected");
    Ok(())
}

async fn mirror_states(
    mut mirror_rx: mpsc::UnboundedReceiver<PartialState>,
    surface_tx: broadcast::Sender<String>,
) {
    while let Some(state) = mirror_rx.recv().await {
        match serde_json::to_string(&state) {
            // No subscribers is not an error: no renderer is attached.
            Ok(text) => {
                let _ = surface_tx.send(text);
            }
            Err(e) => error!("failed to serialise surface state: {e}"),
        }
    }
}

// ── Outbound routing ──────────────────────────────────────────────────────────

enum RouterEvent {
    Register {
        handle: CounterpartHandle,
        origin: String,
        tx: mpsc::UnboundedSender<String>,
    },
    Unregister(CounterpartHandle),
}

struct HostPeer {
    origin: String,
    tx: mpsc::UnboundedSender<String>,
}

/// Delivers outbound frames to the host connections they are addressed to.
#[derive(Default)]
struct Router {
    peers: HashMap<CounterpartHandle, HostPeer>,
    pending: Vec<OutboundFrame>,
}

impl Router {
    fn register(&mut self, handle: CounterpartHandle, peer: HostPeer) {
        self.peers.insert(handle, peer);
        for frame in std::mem::take(&mut self.pending) {
            self.deliver(frame);
        }
    }

    fn unregister(&mut self, handle: CounterpartHandle) {
        self.peers.remove(&handle);
    }

    /// Sends `frame` to every matching peer and returns how many got it.
    ///
    /// A peer matches when the frame is addressed to its origin (or to the
    /// wildcard) and, once a counterpart is bound, only that counterpart.
    fn deliver(&mut self, frame: OutboundFrame) -> usize {
        if self.peers.is_empty() {
            if frame.counterpart.is_some() {
                return 0;
            }
            if self.pending.len() < MAX_PENDING_FRAMES {
                self.pending.push(frame);
            } else {
                debug!(
                    "no host connected; dropping {} frame",
                    frame.envelope.kind
                );
            }
            return 0;
        }
        let text = match encode_envelope(&frame.envelope) {
            Ok(text) => text,
            Err(e) => {
                error!("dropping outbound frame: {e}");
                return 0;
            }
        };

        let mut sent = 0;
        for (handle, peer) in &self.peers {
            if frame.counterpart.is_some_and(|bound| bound != *handle) {
                continue;
            }
            if frame.target != WILDCARD_ORIGIN && frame.target != peer.origin {
                continue;
            }
            if peer.tx.send(text.clone()).is_ok() {
                sent += 1;
            }
        }
        if sent == 0 {
            debug!(
                "no connected host matches {} frame for {}",
                frame.envelope.kind, frame.target
            );
        }
        sent
    }
}

async fn route_outbound(
    mut events: mpsc::UnboundedReceiver<RouterEvent>,
    mut out_rx: mpsc::Receiver<OutboundFrame>,
) {
    let mut router = Router::default();
    loop {
        tokio::select! {
            Some(event) = events.recv() => match event {
                RouterEvent::Register { handle, origin, tx } => {
                    router.register(handle, HostPeer { origin, tx });
                }
                RouterEvent::Unregister(handle) => router.unregister(handle),
            },
            maybe = out_rx.recv() => match maybe {
                Some(frame) => {
                    router.deliver(frame);
                }
                None => break,
            },
        }
    }
    debug!("outbound router finished");
}

// ── Tests ─────────────────────────────────────────────────────────────────────
