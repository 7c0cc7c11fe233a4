//! Wire envelopes exchanged on a live connection.
//!
//! Both directions are discriminated unions carrying exactly one
//! payload per frame. They are modeled as externally tagged serde
//! enums, so the one-field-per-frame invariant holds by construction
//! rather than by convention.

use base64::prelude::*;
use serde::{Deserialize, Serialize};

use genai::common::{Blob, Content, Part, Role};
use genai::generation::{GenerationConfig, UsageMetadata};
use genai::tools::{FunctionCall, FunctionResponse, Tool};

use crate::error::{Error, Result};

/// Client → server frame. Serializes as a single-key JSON object keyed
/// by the variant, e.g. `{"clientContent": {...}}`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ClientMessage {
    Setup(LiveSetup),
    ClientContent(LiveClientContent),
    RealtimeInput(LiveRealtimeInput),
    ToolResponse(LiveToolResponse),
}

/// The setup handshake: first frame on every connection.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveSetup {
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Tool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_resumption: Option<SessionResumptionConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_window_compression: Option<ContextWindowCompressionConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_audio_transcription: Option<AudioTranscriptionConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_audio_transcription: Option<AudioTranscriptionConfig>,
}

/// Ask the server to resume a prior session, or to start issuing
/// resumption handles for this one.
#[derive(Debug, Default, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResumptionConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,
}

#[derive(Debug, Default, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextWindowCompressionConfig {
    /// Token count that triggers compression.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger_tokens: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sliding_window: Option<SlidingWindow>,
}

#[derive(Debug, Default, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlidingWindow {
    /// Token count the window is compressed down to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_tokens: Option<i64>,
}

/// Empty marker object enabling a transcription direction.
#[derive(Debug, Default, Clone, Serialize)]
pub struct AudioTranscriptionConfig {}

/// Ordered conversation turns. Appended to server-side state strictly
/// in client-send order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveClientContent {
    pub turns: Vec<Content>,
    pub turn_complete: bool,
}

/// Unordered realtime input. The server may interleave these with
/// other traffic for lower latency; exactly one payload is set.
#[derive(Debug, Default, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveRealtimeInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_chunks: Option<Vec<Blob>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<Blob>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video: Option<Blob>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity_start: Option<ActivityStart>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity_end: Option<ActivityEnd>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_stream_end: Option<bool>,
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct ActivityStart {}

#[derive(Debug, Default, Clone, Serialize)]
pub struct ActivityEnd {}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveToolResponse {
    pub function_responses: Vec<FunctionResponse>,
}

/// Server → client frame; exactly one variant per frame.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ServerMessage {
    SetupComplete(SetupComplete),
    ServerContent(LiveServerContent),
    ToolCall(LiveToolCall),
    ToolCallCancellation(LiveToolCallCancellation),
    UsageMetadata(UsageMetadata),
    GoAway(GoAway),
    SessionResumptionUpdate(SessionResumptionUpdate),
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct SetupComplete {}

/// Incremental content from the model's side of the conversation.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveServerContent {
    pub model_turn: Option<Content>,
    #[serde(default)]
    pub turn_complete: Option<bool>,
    /// Set when the model was cut off by newer realtime input.
    #[serde(default)]
    pub interrupted: Option<bool>,
    #[serde(default)]
    pub generation_complete: Option<bool>,
    #[serde(default)]
    pub grounding_metadata: Option<serde_json::Value>,
    #[serde(default)]
    pub input_transcription: Option<Transcription>,
    #[serde(default)]
    pub output_transcription: Option<Transcription>,
}

impl LiveServerContent {
    /// Concatenated text of the model turn's text parts, if any.
    pub fn text(&self) -> Option<String> {
        let parts = self.model_turn.as_ref()?.parts.as_ref()?;
        let texts: Vec<&str> = parts
            .iter()
            .filter_map(|p| match p {
                Part::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        if texts.is_empty() { None } else { Some(texts.concat()) }
    }

    /// Concatenated decoded bytes of the model turn's inline-data
    /// parts, if any. Undecodable chunks are skipped.
    pub fn data(&self) -> Option<Vec<u8>> {
        let parts = self.model_turn.as_ref()?.parts.as_ref()?;
        let chunks: Vec<Vec<u8>> = parts
            .iter()
            .filter_map(|p| match p {
                Part::InlineData { inline_data } => {
                    BASE64_STANDARD.decode(&inline_data.data).ok()
                }
                _ => None,
            })
            .collect();
        if chunks.is_empty() { None } else { Some(chunks.concat()) }
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transcription {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub finished: Option<bool>,
}

/// Function calls the client is expected to execute and answer.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveToolCall {
    #[serde(default)]
    pub function_calls: Vec<FunctionCall>,
}

/// Ids of previously issued calls the client should abort.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveToolCallCancellation {
    #[serde(default)]
    pub ids: Vec<String>,
}

/// Notice that the server will close the connection soon.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoAway {
    /// Remaining connection lifetime as a duration string.
    #[serde(default)]
    pub time_left: Option<String>,
}

/// A fresh resumption handle for reconnecting into this session.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResumptionUpdate {
    #[serde(default)]
    pub new_handle: Option<String>,
    #[serde(default)]
    pub resumable: Option<bool>,
    #[serde(default)]
    pub last_consumed_client_message_index: Option<i64>,
}

/// Flexible content input: a bare string, one content, or a list.
#[derive(Debug, Clone)]
pub enum ContentUnion {
    Text(String),
    Content(Content),
    Contents(Vec<Content>),
}

impl From<&str> for ContentUnion {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for ContentUnion {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Content> for ContentUnion {
    fn from(content: Content) -> Self {
        Self::Content(content)
    }
}

impl From<Vec<Content>> for ContentUnion {
    fn from(contents: Vec<Content>) -> Self {
        Self::Contents(contents)
    }
}

impl ContentUnion {
    /// Normalize into the canonical ordered turn list. A bare string
    /// becomes a single user turn; an empty list is rejected before any
    /// socket write happens.
    pub(crate) fn into_turns(self) -> Result<Vec<Content>> {
        let turns = match self {
            Self::Text(text) => vec![Content::text(text).with_role(Role::User)],
            Self::Content(content) => vec![content],
            Self::Contents(contents) => contents,
        };
        if turns.is_empty() {
            return Err(Error::invalid_argument("client content requires at least one turn"));
        }
        Ok(turns)
    }
}

/// Flexible tool-response input: one response or a list.
#[derive(Debug, Clone)]
pub enum FunctionResponseUnion {
    Single(FunctionResponse),
    List(Vec<FunctionResponse>),
}

impl From<FunctionResponse> for FunctionResponseUnion {
    fn from(response: FunctionResponse) -> Self {
        Self::Single(response)
    }
}

impl From<Vec<FunctionResponse>> for FunctionResponseUnion {
    fn from(responses: Vec<FunctionResponse>) -> Self {
        Self::List(responses)
    }
}

impl FunctionResponseUnion {
    /// Normalize to a non-empty list. Id matching against outstanding
    /// calls is the server's concern, not validated here.
    pub(crate) fn into_list(self) -> Result<Vec<FunctionResponse>> {
        let responses = match self {
            Self::Single(response) => vec![response],
            Self::List(responses) => responses,
        };
        if responses.is_empty() {
            return Err(Error::invalid_argument("tool response requires at least one entry"));
        }
        Ok(responses)
    }
}

/// Parameters of a client-content send.
#[derive(Debug, Clone)]
pub struct ClientContentParams {
    pub turns: ContentUnion,
    /// Defaults to `true` when unset: omission means "generate now".
    pub turn_complete: Option<bool>,
}

impl ClientContentParams {
    pub fn new(turns: impl Into<ContentUnion>) -> Self {
        Self { turns: turns.into(), turn_complete: None }
    }

    pub fn with_turn_complete(mut self, turn_complete: bool) -> Self {
        self.turn_complete = Some(turn_complete);
        self
    }

    pub(crate) fn into_envelope(self) -> Result<LiveClientContent> {
        Ok(LiveClientContent {
            turns: self.turns.into_turns()?,
            turn_complete: self.turn_complete.unwrap_or(true),
        })
    }
}

/// Parameters of a realtime-input send.
///
/// Exactly one payload goes on the wire per call. When several fields
/// are set, the most specific one wins, in this fixed order: `text`,
/// `audio`, `video`, `media`, `activity_start`, `activity_end`,
/// `audio_stream_end`. Setting none of them is an error.
#[derive(Debug, Default, Clone)]
pub struct RealtimeInputParams {
    /// Generic media chunk; prefer the typed `audio`/`video` fields.
    pub media: Option<Blob>,
    pub audio: Option<Blob>,
    pub video: Option<Blob>,
    pub text: Option<String>,
    pub activity_start: bool,
    pub activity_end: bool,
    pub audio_stream_end: bool,
}

impl RealtimeInputParams {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: Some(text.into()), ..Self::default() }
    }

    pub fn audio(audio: Blob) -> Self {
        Self { audio: Some(audio), ..Self::default() }
    }

    pub fn video(video: Blob) -> Self {
        Self { video: Some(video), ..Self::default() }
    }

    pub fn media(media: Blob) -> Self {
        Self { media: Some(media), ..Self::default() }
    }

    pub fn activity_start() -> Self {
        Self { activity_start: true, ..Self::default() }
    }

    pub fn activity_end() -> Self {
        Self { activity_end: true, ..Self::default() }
    }

    pub fn audio_stream_end() -> Self {
        Self { audio_stream_end: true, ..Self::default() }
    }

    pub(crate) fn into_envelope(self) -> Result<LiveRealtimeInput> {
        let mut envelope = LiveRealtimeInput::default();
        if let Some(text) = self.text {
            envelope.text = Some(text);
        } else if let Some(audio) = self.audio {
            envelope.audio = Some(audio);
        } else if let Some(video) = self.video {
            envelope.video = Some(video);
        } else if let Some(media) = self.media {
            envelope.media_chunks = Some(vec![media]);
        } else if self.activity_start {
            envelope.activity_start = Some(ActivityStart {});
        } else if self.activity_end {
            envelope.activity_end = Some(ActivityEnd {});
        } else if self.audio_stream_end {
            envelope.audio_stream_end = Some(true);
        } else {
            return Err(Error::invalid_argument("realtime input requires exactly one payload"));
        }
        Ok(envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn client_message_serializes_with_one_top_level_field() {
        let message = ClientMessage::ClientContent(
            ClientContentParams::new("hi").into_envelope().unwrap(),
        );
        let value = serde_json::to_value(&message).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object.len(), 1);
        assert_eq!(
            value,
            json!({"clientContent": {
                "turns": [{"parts": [{"text": "hi"}], "role": "user"}],
                "turnComplete": true
            }})
        );
    }

    #[test]
    fn turn_complete_defaults_to_true_and_can_be_cleared() {
        let envelope = ClientContentParams::new("hi").into_envelope().unwrap();
        assert!(envelope.turn_complete);

        let envelope = ClientContentParams::new("hi")
            .with_turn_complete(false)
            .into_envelope()
            .unwrap();
        assert!(!envelope.turn_complete);
    }

    #[test]
    fn empty_turn_list_is_rejected() {
        let result = ClientContentParams::new(Vec::<Content>::new()).into_envelope();
        assert!(matches!(result, Err(Error::InvalidArgument { .. })));
    }

    #[test]
    fn tool_response_single_and_list_normalize_identically() {
        let response = FunctionResponse::new("lookup", json!({"ok": true})).with_id("call-1");

        let single: FunctionResponseUnion = response.clone().into();
        let list: FunctionResponseUnion = vec![response].into();

        let single = LiveToolResponse { function_responses: single.into_list().unwrap() };
        let list = LiveToolResponse { function_responses: list.into_list().unwrap() };
        assert_eq!(
            serde_json::to_value(&single).unwrap(),
            serde_json::to_value(&list).unwrap()
        );
    }

    #[test]
    fn realtime_input_specific_field_wins_over_media() {
        let params = RealtimeInputParams {
            media: Some(Blob::new("image/png", "aW1n")),
            audio: Some(Blob::new("audio/pcm", "cGNt")),
            ..Default::default()
        };
        let envelope = params.into_envelope().unwrap();
        assert!(envelope.media_chunks.is_none());
        assert_eq!(envelope.audio.unwrap().mime_type, "audio/pcm");
    }

    #[test]
    fn realtime_input_with_no_payload_is_rejected() {
        let result = RealtimeInputParams::default().into_envelope();
        assert!(matches!(result, Err(Error::InvalidArgument { .. })));
    }

    #[test]
    fn server_messages_parse_to_exactly_one_variant() {
        let fixtures = [
            (json!({"setupComplete": {}}), "setupComplete"),
            (
                json!({"serverContent": {"modelTurn": {"parts": [{"text": "hi"}]}, "turnComplete": true}}),
                "serverContent",
            ),
            (
                json!({"toolCall": {"functionCalls": [{"id": "1", "name": "f", "args": {}}]}}),
                "toolCall",
            ),
            (json!({"toolCallCancellation": {"ids": ["1", "2"]}}), "toolCallCancellation"),
            (json!({"usageMetadata": {"totalTokenCount": 5}}), "usageMetadata"),
            (json!({"goAway": {"timeLeft": "10s"}}), "goAway"),
            (
                json!({"sessionResumptionUpdate": {"newHandle": "h", "resumable": true}}),
                "sessionResumptionUpdate",
            ),
        ];

        for (fixture, expected) in fixtures {
            let message: ServerMessage = serde_json::from_value(fixture.clone()).unwrap();
            let routed = match message {
                ServerMessage::SetupComplete(_) => "setupComplete",
                ServerMessage::ServerContent(_) => "serverContent",
                ServerMessage::ToolCall(_) => "toolCall",
                ServerMessage::ToolCallCancellation(_) => "toolCallCancellation",
                ServerMessage::UsageMetadata(_) => "usageMetadata",
                ServerMessage::GoAway(_) => "goAway",
                ServerMessage::SessionResumptionUpdate(_) => "sessionResumptionUpdate",
            };
            assert_eq!(routed, expected, "fixture {fixture} routed to the wrong variant");
        }
    }

    #[test]
    fn unknown_server_frame_does_not_parse() {
        let result: std::result::Result<ServerMessage, _> =
            serde_json::from_value(json!({"someFutureField": {}}));
        assert!(result.is_err());
    }

    #[test]
    fn server_content_derived_views() {
        let content: LiveServerContent = serde_json::from_value(json!({
            "modelTurn": {"parts": [
                {"text": "Hello "},
                {"inlineData": {"mimeType": "audio/pcm", "data": "AAAA"}},
                {"text": "world"},
                {"inlineData": {"mimeType": "audio/pcm", "data": "AQE="}}
            ]}
        }))
        .unwrap();

        assert_eq!(content.text().unwrap(), "Hello world");
        assert_eq!(content.data().unwrap(), vec![0, 0, 0, 1, 1]);
    }

    #[test]
    fn resumption_update_carries_handle_and_index() {
        let message: ServerMessage = serde_json::from_value(json!({
            "sessionResumptionUpdate": {
                "newHandle": "handle-2",
                "resumable": true,
                "lastConsumedClientMessageIndex": 17
            }
        }))
        .unwrap();
        let ServerMessage::SessionResumptionUpdate(update) = message else {
            panic!("wrong variant");
        };
        assert_eq!(update.new_handle.as_deref(), Some("handle-2"));
        assert_eq!(update.resumable, Some(true));
        assert_eq!(update.last_consumed_client_message_index, Some(17));
    }
}
