//! Content generation: request/response records and the fluent builder.

pub mod builder;
pub mod model;

pub use builder::ContentBuilder;
pub use model::{
    Candidate, FinishReason, GenerateContentRequest, GenerationConfig, GenerationResponse,
    HarmBlockThreshold, HarmCategory, PrebuiltVoiceConfig, PromptFeedback, SafetyRating,
    SafetySetting, SpeechConfig, UsageMetadata, VoiceConfig,
};
