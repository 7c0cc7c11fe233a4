//! Live session behavior against an in-process mock websocket server.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

use genai_live::{
    ClientContentParams, Error, LiveBackend, LiveClient, LiveConnectConfig, LiveHandler,
    LiveSession, RealtimeInputParams, ServerMessage,
};
use genai::common::Blob;
use genai::tools::FunctionResponse;

/// Handler collecting everything the router dispatches.
#[derive(Default)]
struct Collector {
    messages: Mutex<Vec<ServerMessage>>,
    errors: Mutex<Vec<Error>>,
    closed: AtomicBool,
}

#[async_trait]
impl LiveHandler for Collector {
    async fn on_message(&self, message: ServerMessage) {
        self.messages.lock().unwrap().push(message);
    }

    async fn on_error(&self, error: Error) {
        self.errors.lock().unwrap().push(error);
    }

    async fn on_close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

impl Collector {
    async fn wait_for_messages(&self, count: usize) {
        timeout(Duration::from_secs(5), async {
            loop {
                if self.messages.lock().unwrap().len() >= count {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("timed out waiting for messages");
    }
}

async fn bind() -> (TcpListener, Url) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let url = Url::parse(&format!("ws://{addr}/session")).unwrap();
    (listener, url)
}

fn test_client(url: Url) -> LiveClient {
    LiveClient::new(LiveBackend::Studio { api_key: "test-key".into() }).with_base_url(url)
}

async fn connect(
    url: Url,
    handler: Arc<Collector>,
) -> Result<LiveSession, Error> {
    test_client(url)
        .connect("models/test-live", LiveConnectConfig::default(), handler)
        .await
}

/// Mock server: acknowledges setup, forwards every later client frame
/// to the test body, and plays back the supplied server frames after
/// the first post-setup client frame.
fn spawn_echo_server(
    listener: TcpListener,
    replies: Vec<Value>,
    frames_tx: mpsc::UnboundedSender<Value>,
) {
    tokio::spawn(async move {
        let (stream, _addr) = listener.accept().await.unwrap();
        let mut ws_stream = accept_async(stream).await.expect("websocket handshake failed");
        let mut replies = Some(replies);

        while let Some(frame) = ws_stream.next().await {
            let frame = match frame {
                Ok(frame) => frame,
                Err(_) => break,
            };
            if !frame.is_text() {
                continue;
            }
            let value: Value = serde_json::from_str(frame.to_text().unwrap()).unwrap();

            if value.get("setup").is_some() {
                ws_stream
                    .send(Message::Text(json!({"setupComplete": {}}).to_string().into()))
                    .await
                    .unwrap();
                continue;
            }

            frames_tx.send(value).unwrap();
            if let Some(replies) = replies.take() {
                for reply in replies {
                    ws_stream
                        .send(Message::Text(reply.to_string().into()))
                        .await
                        .unwrap();
                }
            }
        }
    });
}

#[tokio::test]
async fn connect_completes_after_setup_acknowledgment() {
    let (listener, url) = bind().await;
    let (frames_tx, _frames_rx) = mpsc::unbounded_channel();
    spawn_echo_server(listener, Vec::new(), frames_tx);

    let handler = Arc::new(Collector::default());
    let session = connect(url, handler).await.unwrap();
    assert!(session.is_open());
    session.close();
}

#[tokio::test]
async fn connect_rejects_when_socket_closes_before_setup_complete() {
    let (listener, url) = bind().await;
    tokio::spawn(async move {
        let (stream, _addr) = listener.accept().await.unwrap();
        let mut ws_stream = accept_async(stream).await.unwrap();
        // Swallow the setup frame, then close without acknowledging.
        let _ = ws_stream.next().await;
        let _ = ws_stream.close(None).await;
    });

    let handler = Arc::new(Collector::default());
    let result = timeout(Duration::from_secs(5), connect(url, handler)).await.unwrap();
    assert!(matches!(result, Err(Error::Connection { .. })));
}

#[tokio::test]
async fn client_content_defaults_turn_complete_and_normalizes_turns() {
    let (listener, url) = bind().await;
    let (frames_tx, mut frames_rx) = mpsc::unbounded_channel();
    spawn_echo_server(listener, Vec::new(), frames_tx);

    let handler = Arc::new(Collector::default());
    let session = connect(url, handler).await.unwrap();

    session.send_client_content(ClientContentParams::new("hi")).unwrap();

    let frame = timeout(Duration::from_secs(5), frames_rx.recv()).await.unwrap().unwrap();
    assert_eq!(
        frame,
        json!({"clientContent": {
            "turns": [{"parts": [{"text": "hi"}], "role": "user"}],
            "turnComplete": true
        }})
    );

    session.close();
}

#[tokio::test]
async fn tool_response_single_and_list_hit_the_wire_identically() {
    let (listener, url) = bind().await;
    let (frames_tx, mut frames_rx) = mpsc::unbounded_channel();
    spawn_echo_server(listener, Vec::new(), frames_tx);

    let handler = Arc::new(Collector::default());
    let session = connect(url, handler).await.unwrap();

    let response = FunctionResponse::new("lookup", json!({"ok": true})).with_id("call-7");
    session.send_tool_response(response.clone()).unwrap();
    session.send_tool_response(vec![response]).unwrap();

    let first = timeout(Duration::from_secs(5), frames_rx.recv()).await.unwrap().unwrap();
    let second = timeout(Duration::from_secs(5), frames_rx.recv()).await.unwrap().unwrap();
    assert_eq!(first, second);
    assert_eq!(first["toolResponse"]["functionResponses"][0]["id"], "call-7");

    session.close();
}

#[tokio::test]
async fn realtime_input_applies_the_documented_precedence() {
    let (listener, url) = bind().await;
    let (frames_tx, mut frames_rx) = mpsc::unbounded_channel();
    spawn_echo_server(listener, Vec::new(), frames_tx);

    let handler = Arc::new(Collector::default());
    let session = connect(url, handler).await.unwrap();

    // media + audio set together: the more specific audio field wins.
    let params = RealtimeInputParams {
        media: Some(Blob::new("image/png", "aW1n")),
        audio: Some(Blob::new("audio/pcm", "cGNt")),
        ..Default::default()
    };
    session.send_realtime_input(params).unwrap();

    let frame = timeout(Duration::from_secs(5), frames_rx.recv()).await.unwrap().unwrap();
    assert_eq!(
        frame,
        json!({"realtimeInput": {"audio": {"mimeType": "audio/pcm", "data": "cGNt"}}})
    );

    // No payload at all fails synchronously, without a socket write.
    let result = session.send_realtime_input(RealtimeInputParams::default());
    assert!(matches!(result, Err(Error::InvalidArgument { .. })));

    session.close();
}

#[tokio::test]
async fn sends_after_close_fail_fast_without_writing() {
    let (listener, url) = bind().await;
    let (frames_tx, mut frames_rx) = mpsc::unbounded_channel();
    spawn_echo_server(listener, Vec::new(), frames_tx);

    let handler = Arc::new(Collector::default());
    let session = connect(url, handler).await.unwrap();

    session.close();
    session.close(); // idempotent
    assert!(!session.is_open());

    let content = session.send_client_content(ClientContentParams::new("late"));
    assert!(matches!(content, Err(Error::InvalidState { .. })));
    let realtime = session.send_realtime_input(RealtimeInputParams::text("late"));
    assert!(matches!(realtime, Err(Error::InvalidState { .. })));
    let tool = session.send_tool_response(FunctionResponse::new("f", json!({})));
    assert!(matches!(tool, Err(Error::InvalidState { .. })));

    // Nothing but the close frame went out after setup.
    assert!(timeout(Duration::from_millis(200), frames_rx.recv()).await.is_err());
}

#[tokio::test]
async fn router_dispatches_each_server_message_and_drops_unknown_frames() {
    let (listener, url) = bind().await;
    let (frames_tx, _frames_rx) = mpsc::unbounded_channel();
    let replies = vec![
        json!({"serverContent": {
            "modelTurn": {"parts": [{"text": "thinking aloud"}]},
            "interrupted": true
        }}),
        json!({"toolCall": {"functionCalls": [{"id": "call-1", "name": "lookup", "args": {"q": "x"}}]}}),
        json!({"someFutureMessageKind": {"ignored": true}}),
        json!({"toolCallCancellation": {"ids": ["call-1"]}}),
        json!({"goAway": {"timeLeft": "30s"}}),
        json!({"sessionResumptionUpdate": {"newHandle": "h-2", "resumable": true}}),
        json!({"usageMetadata": {"promptTokenCount": 3, "totalTokenCount": 9}}),
    ];
    spawn_echo_server(listener, replies, frames_tx);

    let handler = Arc::new(Collector::default());
    let session = connect(url, handler.clone()).await.unwrap();

    // Any post-setup frame triggers the playback.
    session.send_client_content(ClientContentParams::new("go")).unwrap();

    // Six known messages; the unknown frame is dropped silently.
    handler.wait_for_messages(6).await;
    let messages = handler.messages.lock().unwrap();
    assert_eq!(messages.len(), 6);

    // Delivered in socket-receive order, one dispatch path each.
    let ServerMessage::ServerContent(content) = &messages[0] else {
        panic!("expected server content first");
    };
    assert_eq!(content.text().as_deref(), Some("thinking aloud"));
    assert_eq!(content.interrupted, Some(true));

    let ServerMessage::ToolCall(tool_call) = &messages[1] else {
        panic!("expected tool call second");
    };
    assert_eq!(tool_call.function_calls[0].id.as_deref(), Some("call-1"));

    assert!(matches!(&messages[2], ServerMessage::ToolCallCancellation(c) if c.ids == ["call-1"]));
    assert!(matches!(&messages[3], ServerMessage::GoAway(g) if g.time_left.as_deref() == Some("30s")));
    assert!(
        matches!(&messages[4], ServerMessage::SessionResumptionUpdate(u) if u.new_handle.as_deref() == Some("h-2"))
    );
    assert!(matches!(&messages[5], ServerMessage::UsageMetadata(u) if u.total_token_count == 9));

    assert!(handler.errors.lock().unwrap().is_empty());
    drop(messages);
    session.close();
}

#[tokio::test]
async fn remote_close_surfaces_through_on_close() {
    let (listener, url) = bind().await;
    tokio::spawn(async move {
        let (stream, _addr) = listener.accept().await.unwrap();
        let mut ws_stream = accept_async(stream).await.unwrap();
        // Acknowledge setup, then hang up.
        let _ = ws_stream.next().await;
        ws_stream
            .send(Message::Text(json!({"setupComplete": {}}).to_string().into()))
            .await
            .unwrap();
        let _ = ws_stream.close(None).await;
    });

    let handler = Arc::new(Collector::default());
    let session = connect(url, handler.clone()).await.unwrap();

    timeout(Duration::from_secs(5), async {
        while !handler.closed.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("on_close was never invoked");

    // The session observed the close; further sends fail fast.
    assert!(!session.is_open());
    let result = session.send_client_content(ClientContentParams::new("late"));
    assert!(matches!(result, Err(Error::InvalidState { .. })));
}
