//! The send side of a live connection.
//!
//! A session owns its socket exclusively. All outbound frames funnel
//! through one channel into a single writer task, so
//! [`LiveSession::send_client_content`] calls reach the socket strictly
//! in call order. Sends are fire-and-forget: they validate, serialize
//! and enqueue without awaiting socket I/O, and socket failures surface
//! through the handler callbacks instead of the send's return value.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::instrument;

use crate::error::{Error, Result};
use crate::message::{
    ClientContentParams, ClientMessage, FunctionResponseUnion, LiveToolResponse,
    RealtimeInputParams,
};

/// One live bidirectional session, ready for sending after the setup
/// handshake completed (see [`LiveClient::connect`](crate::LiveClient::connect)).
pub struct LiveSession {
    session_id: String,
    outbound: mpsc::UnboundedSender<Message>,
    closed: Arc<AtomicBool>,
}

impl LiveSession {
    pub(crate) fn new(
        session_id: String,
        outbound: mpsc::UnboundedSender<Message>,
        closed: Arc<AtomicBool>,
    ) -> Self {
        Self { session_id, outbound, closed }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// False once [`LiveSession::close`] was called or the remote end
    /// closed the socket.
    pub fn is_open(&self) -> bool {
        !self.closed.load(Ordering::SeqCst)
    }

    /// Send ordered conversation turns.
    ///
    /// `turn_complete` defaults to `true` when unset — omission means
    /// "generate now", not "wait for more".
    #[instrument(skip_all, fields(session.id = %self.session_id), err)]
    pub fn send_client_content(&self, params: ClientContentParams) -> Result<()> {
        let envelope = params.into_envelope()?;
        self.send_message(&ClientMessage::ClientContent(envelope))
    }

    /// Send realtime input. No ordering guarantee relative to other
    /// frames; the server may interleave for lower latency.
    #[instrument(skip_all, fields(session.id = %self.session_id), err)]
    pub fn send_realtime_input(&self, params: RealtimeInputParams) -> Result<()> {
        let envelope = params.into_envelope()?;
        self.send_message(&ClientMessage::RealtimeInput(envelope))
    }

    /// Answer outstanding tool calls. Each entry should carry the id of
    /// the call it answers; id matching is the server's concern.
    #[instrument(skip_all, fields(session.id = %self.session_id), err)]
    pub fn send_tool_response(
        &self,
        responses: impl Into<FunctionResponseUnion>,
    ) -> Result<()> {
        let function_responses = responses.into().into_list()?;
        self.send_message(&ClientMessage::ToolResponse(LiveToolResponse { function_responses }))
    }

    /// Close the session. Idempotent; subsequent sends fail with
    /// [`Error::InvalidState`].
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            tracing::debug!(session.id = %self.session_id, "closing live session");
            // The writer task forwards the close frame and stops.
            let _ = self.outbound.send(Message::Close(None));
        }
    }

    fn send_message(&self, message: &ClientMessage) -> Result<()> {
        if !self.is_open() {
            return Err(Error::invalid_state("session is closed"));
        }
        let json = serde_json::to_string(message).map_err(|source| Error::Serialize { source })?;
        self.outbound
            .send(Message::Text(json.into()))
            .map_err(|_| Error::invalid_state("connection is closed"))
    }
}

impl Drop for LiveSession {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for LiveSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveSession")
            .field("session_id", &self.session_id)
            .field("open", &self.is_open())
            .finish()
    }
}
