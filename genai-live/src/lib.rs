//! # genai-live
//!
//! Live bidirectional streaming sessions for the `genai` client: a
//! websocket connection carrying a setup handshake, ordered turn
//! exchange, unordered realtime input, tool-call round trips,
//! interruption signaling, session resumption and context-window
//! compression notices.
//!
//! ```no_run
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use genai_live::{
//!     ClientContentParams, LiveBackend, LiveClient, LiveConnectConfig, LiveHandler,
//!     ServerMessage,
//! };
//!
//! struct Printer;
//!
//! #[async_trait]
//! impl LiveHandler for Printer {
//!     async fn on_message(&self, message: ServerMessage) {
//!         if let ServerMessage::ServerContent(content) = message {
//!             if let Some(text) = content.text() {
//!                 print!("{text}");
//!             }
//!         }
//!     }
//! }
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let client = LiveClient::new(LiveBackend::Studio { api_key: "YOUR_API_KEY".into() });
//! let session = client
//!     .connect("models/gemini-2.5-flash", LiveConnectConfig::default(), Arc::new(Printer))
//!     .await?;
//!
//! session.send_client_content(ClientContentParams::new("Hello!"))?;
//! # Ok(())
//! # }
//! ```

pub mod connect;
pub mod error;
pub mod message;
pub mod session;

pub use connect::{LiveBackend, LiveClient, LiveConnectConfig, LiveHandler};
pub use error::{Error, Result};
pub use message::{
    ClientContentParams, ClientMessage, ContentUnion, ContextWindowCompressionConfig,
    FunctionResponseUnion, GoAway, LiveServerContent, LiveToolCall, LiveToolCallCancellation,
    RealtimeInputParams, ServerMessage, SessionResumptionConfig, SessionResumptionUpdate,
    SlidingWindow, Transcription,
};
pub use session::LiveSession;
