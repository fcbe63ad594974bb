//! WebSocket transport tests: a real listener, real client connections.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use board_core::protocol::{decode_envelope, Envelope};
use board_widget::domain::WidgetConfig;
use board_widget::infrastructure::ws_server::serve;

const HOST: &str = "https://host.example";

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct Server {
    addr: std::net::SocketAddr,
    running: Arc<AtomicBool>,
    task: tokio::task::JoinHandle<anyhow::Result<()>>,
}

impl Server {
    async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let running = Arc::new(AtomicBool::new(true));
        let mut config = WidgetConfig::default();
        // Keep the fallback out of the way of these tests.
        config.timing.init_fallback_ms = 60_000;
        let task = tokio::spawn(serve(listener, config, Arc::clone(&running)));
        Self {
            addr,
            running,
            task,
        }
    }

    async fn connect(&self, path: &str, origin: &str) -> Client {
        let mut request = format!("ws://{}{path}", self.addr)
            .into_client_request()
            .expect("request");
        request
            .headers_mut()
            .insert("Origin", HeaderValue::from_str(origin).expect("header"));
        let (ws, _) = connect_async(request).await.expect("connect");
        ws
    }

    async fn stop(self) {
        self.running.store(false, Ordering::Relaxed);
        self.task.await.expect("server task").expect("server result");
    }
}

async fn next_text(ws: &mut Client) -> String {
    let wait = async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => return text,
                Some(Ok(_)) => continue,
                other => panic!("connection ended: {other:?}"),
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(5), wait)
        .await
        .expect("timed out waiting for a frame")
}

async fn next_envelope(ws: &mut Client) -> Envelope {
    decode_envelope(&next_text(ws).await).expect("valid envelope")
}

#[tokio::test]
async fn test_host_receives_hello_then_init_replies() {
    // Arrange
    let server = Server::start().await;
    let mut host = server.connect("/host", HOST).await;

    // Act / Assert: the buffered hello arrives first
    let hello = next_envelope(&mut host).await;
    assert_eq!(hello.kind, "hello");

    host.send(Message::Text(
        json!({"type": "init", "version": 1, "id": "1", "payload": {}}).to_string(),
    ))
    .await
    .expect("send init");

    let ack = next_envelope(&mut host).await;
    assert_eq!(ack.kind, "ack");
    assert_eq!(ack.payload, Some(json!({"for": "1", "ok": true})));
    assert!(ack.ts.is_some());
    assert_eq!(next_envelope(&mut host).await.kind, "ready");

    server.stop().await;
}

#[tokio::test]
async fn test_renderer_receives_board_state_after_init() {
    // Arrange
    let server = Server::start().await;
    let mut renderer = server.connect("/surface", HOST).await;
    let mut host = server.connect("/host", HOST).await;
    next_envelope(&mut host).await; // hello
    tokio::time::sleep(Duration::from_millis(100)).await;

    // Act
    host.send(Message::Text(
        json!({"type": "init", "version": 1, "payload": {"options": {"orientation": "black"}}})
            .to_string(),
    ))
    .await
    .expect("send init");

    // Assert: the first applied state is the full initial board
    let state: serde_json::Value =
        serde_json::from_str(&next_text(&mut renderer).await).expect("json state");
    assert_eq!(state["orientation"], json!("black"));
    assert!(state["fen"].is_string());

    server.stop().await;
}
