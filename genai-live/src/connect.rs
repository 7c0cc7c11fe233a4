//! Connection bootstrap: build the setup envelope, open the socket,
//! install the message router, and hand over a ready session.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::instrument;
use url::Url;

use genai::common::{Content, Modality, Model};
use genai::generation::{GenerationConfig, SpeechConfig};
use genai::tools::Tool;

use crate::error::{Error, Result};
use crate::message::{
    AudioTranscriptionConfig, ClientMessage, ContextWindowCompressionConfig, LiveSetup,
    ServerMessage, SessionResumptionConfig,
};
use crate::session::LiveSession;

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

const STUDIO_WS_URL: &str = "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent";

/// Receive-side callback set, installed at connect time.
///
/// Inbound frames are dispatched in socket-receive order; the router
/// performs no buffering or reordering. Keep implementations light —
/// a slow callback delays every following frame.
#[async_trait]
pub trait LiveHandler: Send + Sync {
    /// One routed server message. Never called for the setup-complete
    /// acknowledgment, which resolves the pending connect instead.
    async fn on_message(&self, message: ServerMessage);

    /// Socket-level failure. The connection is unusable afterwards.
    async fn on_error(&self, _error: Error) {}

    /// The socket closed, locally or remotely.
    async fn on_close(&self) {}
}

/// Which endpoint the socket connects to, fixed per client.
#[derive(Debug, Clone)]
pub enum LiveBackend {
    /// Direct endpoint, API key in the connection URL.
    Studio { api_key: String },
    /// Cloud project/location endpoint, bearer-token header.
    Vertex {
        project_id: String,
        location: String,
        bearer_token: String,
    },
}

/// Parameters of the setup handshake.
#[derive(Debug, Default, Clone)]
pub struct LiveConnectConfig {
    pub response_modalities: Option<Vec<Modality>>,
    pub temperature: Option<f32>,
    pub speech_config: Option<SpeechConfig>,
    pub system_instruction: Option<Content>,
    pub tools: Option<Vec<Tool>>,
    /// Resumption handle from a prior session, or an empty config to
    /// start receiving handles for this one.
    pub session_resumption: Option<SessionResumptionConfig>,
    pub context_window_compression: Option<ContextWindowCompressionConfig>,
    pub input_audio_transcription: bool,
    pub output_audio_transcription: bool,
}

impl LiveConnectConfig {
    pub fn with_response_modalities(mut self, modalities: Vec<Modality>) -> Self {
        self.response_modalities = Some(modalities);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_speech_config(mut self, speech_config: SpeechConfig) -> Self {
        self.speech_config = Some(speech_config);
        self
    }

    pub fn with_system_instruction(mut self, text: impl Into<String>) -> Self {
        self.system_instruction = Some(Content::text(text));
        self
    }

    pub fn with_tool(mut self, tool: Tool) -> Self {
        self.tools.get_or_insert_default().push(tool);
        self
    }

    pub fn with_session_resumption(mut self, config: SessionResumptionConfig) -> Self {
        self.session_resumption = Some(config);
        self
    }

    pub fn with_context_window_compression(
        mut self,
        config: ContextWindowCompressionConfig,
    ) -> Self {
        self.context_window_compression = Some(config);
        self
    }

    pub fn with_input_audio_transcription(mut self) -> Self {
        self.input_audio_transcription = true;
        self
    }

    pub fn with_output_audio_transcription(mut self) -> Self {
        self.output_audio_transcription = true;
        self
    }

    fn into_setup(self, model: String) -> LiveSetup {
        let wants_generation_config = self.response_modalities.is_some()
            || self.temperature.is_some()
            || self.speech_config.is_some();
        let generation_config = wants_generation_config.then(|| GenerationConfig {
            temperature: self.temperature,
            response_modalities: self.response_modalities,
            speech_config: self.speech_config,
            ..Default::default()
        });

        LiveSetup {
            model,
            generation_config,
            system_instruction: self.system_instruction,
            tools: self.tools,
            session_resumption: self.session_resumption,
            context_window_compression: self.context_window_compression,
            input_audio_transcription: self
                .input_audio_transcription
                .then(AudioTranscriptionConfig::default),
            output_audio_transcription: self
                .output_audio_transcription
                .then(AudioTranscriptionConfig::default),
        }
    }
}

/// Entry point for live sessions.
pub struct LiveClient {
    backend: LiveBackend,
    base_url: Option<Url>,
}

impl LiveClient {
    pub fn new(backend: LiveBackend) -> Self {
        Self { backend, base_url: None }
    }

    /// Override the socket endpoint, e.g. to point at a test server.
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = Some(base_url);
        self
    }

    fn ws_url(&self) -> Result<Url> {
        match &self.backend {
            LiveBackend::Studio { api_key } => {
                let mut url = match &self.base_url {
                    Some(url) => url.clone(),
                    None => Url::parse(STUDIO_WS_URL)
                        .map_err(|e| Error::connection(format!("invalid endpoint URL: {e}")))?,
                };
                url.query_pairs_mut().append_pair("key", api_key);
                Ok(url)
            }
            LiveBackend::Vertex { location, .. } => match &self.base_url {
                Some(url) => Ok(url.clone()),
                None => Url::parse(&format!(
                    "wss://{location}-aiplatform.googleapis.com/ws/google.cloud.aiplatform.v1beta1.LlmBidiService.BidiGenerateContent"
                ))
                .map_err(|e| Error::connection(format!("invalid endpoint URL: {e}"))),
            },
        }
    }

    /// Resource name the setup names, fully qualified for the cloud
    /// mode.
    fn setup_model(&self, model: String) -> String {
        match &self.backend {
            LiveBackend::Studio { .. } => model,
            LiveBackend::Vertex { project_id, location, .. } => {
                Model::new(model).vertex_model_path(project_id, location)
            }
        }
    }

    /// Open a connection, perform the setup handshake, and return the
    /// session once the server acknowledged it.
    ///
    /// Suspends until setup-complete is observed; if the socket errors
    /// or closes first, this fails with that error instead of hanging.
    #[instrument(skip_all, err)]
    pub async fn connect(
        &self,
        model: impl Into<String>,
        config: LiveConnectConfig,
        handler: Arc<dyn LiveHandler>,
    ) -> Result<LiveSession> {
        let url = self.ws_url()?;
        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(|e| Error::connection(format!("failed to create client request: {e}")))?;

        if let LiveBackend::Vertex { bearer_token, .. } = &self.backend {
            request.headers_mut().insert(
                "Authorization",
                HeaderValue::from_str(&format!("Bearer {bearer_token}"))
                    .map_err(|e| Error::connection(format!("invalid auth token header: {e}")))?,
            );
        }

        let (stream, _response) = connect_async(request)
            .await
            .map_err(|e| Error::connection(format!("websocket connect error: {e}")))?;
        let (sink, source) = stream.split();

        let session_id = uuid::Uuid::new_v4().to_string();
        let closed = Arc::new(AtomicBool::new(false));
        let (outbound, outbound_rx) = mpsc::unbounded_channel::<Message>();
        let (ready_tx, ready_rx) = oneshot::channel::<Result<()>>();

        let setup = ClientMessage::Setup(config.into_setup(self.setup_model(model.into())));
        let setup_json =
            serde_json::to_string(&setup).map_err(|source| Error::Serialize { source })?;
        tracing::debug!(session.id = %session_id, raw_setup = %setup_json, "sending setup message");
        outbound
            .send(Message::Text(setup_json.into()))
            .map_err(|_| Error::connection("connection closed before setup was sent"))?;

        tokio::spawn(run_writer(outbound_rx, sink, handler.clone(), closed.clone()));
        tokio::spawn(run_reader(source, handler, closed.clone(), ready_tx));

        match ready_rx.await {
            Ok(Ok(())) => Ok(LiveSession::new(session_id, outbound, closed)),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(Error::connection("connection task ended before setup completed")),
        }
    }
}

/// Forwards enqueued frames to the socket, preserving enqueue order.
async fn run_writer(
    mut outbound: mpsc::UnboundedReceiver<Message>,
    mut sink: WsSink,
    handler: Arc<dyn LiveHandler>,
    closed: Arc<AtomicBool>,
) {
    while let Some(frame) = outbound.recv().await {
        let is_close = matches!(frame, Message::Close(_));
        if let Err(e) = sink.send(frame).await {
            // A write failure after close() is the expected shutdown
            // race, not an error worth reporting.
            if !closed.swap(true, Ordering::SeqCst) {
                handler.on_error(Error::connection(format!("send error: {e}"))).await;
            }
            break;
        }
        if is_close {
            let _ = sink.flush().await;
            break;
        }
    }
}

/// Routes inbound frames: resolves the pending connect on
/// setup-complete, dispatches everything else to the handler.
async fn run_reader(
    mut source: WsSource,
    handler: Arc<dyn LiveHandler>,
    closed: Arc<AtomicBool>,
    ready: oneshot::Sender<Result<()>>,
) {
    let mut ready = Some(ready);

    while let Some(frame) = source.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                route_frame(text.as_str(), &handler, &mut ready).await;
            }
            Ok(Message::Binary(bytes)) => match String::from_utf8(bytes.to_vec()) {
                Ok(text) => route_frame(&text, &handler, &mut ready).await,
                Err(e) => {
                    handler
                        .on_error(Error::protocol(format!("invalid UTF-8 in binary frame: {e}")))
                        .await;
                }
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {} // ping/pong, handled by the transport
            Err(e) => {
                let error = Error::connection(format!("receive error: {e}"));
                match ready.take() {
                    Some(tx) => {
                        let _ = tx.send(Err(error));
                    }
                    None => handler.on_error(error).await,
                }
                break;
            }
        }
    }

    closed.store(true, Ordering::SeqCst);
    if let Some(tx) = ready.take() {
        let _ = tx.send(Err(Error::connection("connection closed before setup completed")));
    }
    handler.on_close().await;
}

async fn route_frame(
    raw: &str,
    handler: &Arc<dyn LiveHandler>,
    ready: &mut Option<oneshot::Sender<Result<()>>>,
) {
    let value: serde_json::Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            handler.on_error(Error::protocol(format!("malformed server frame: {e}"))).await;
            return;
        }
    };

    match serde_json::from_value::<ServerMessage>(value) {
        Ok(ServerMessage::SetupComplete(_)) => {
            if let Some(tx) = ready.take() {
                let _ = tx.send(Ok(()));
            }
        }
        Ok(message) => handler.on_message(message).await,
        // Unknown discriminants are tolerated for forward compatibility.
        Err(_) => tracing::debug!(%raw, "ignoring unrecognized server frame"),
    }
}
