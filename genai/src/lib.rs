//! # genai
//!
//! A typed Rust client for a generative AI REST service: content
//! generation (unary and streamed), embeddings, file resources, cached
//! content, fine-tuning jobs, batch jobs and the model catalog.
//!
//! The endpoint mode — the direct API-key endpoint or a cloud
//! project/location endpoint — is chosen once when the client is built;
//! all calling code is mode-agnostic.
//!
//! ```no_run
//! use futures::TryStreamExt;
//! use genai::{ClientBuilder, ListParams};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ClientBuilder::new("YOUR_API_KEY").build()?;
//!
//! let response = client
//!     .generate_content()
//!     .with_user_message("Explain cursor-based pagination in one sentence.")
//!     .execute()
//!     .await?;
//! println!("{}", response.text());
//!
//! // List endpoints come back as a pager: a directly indexable page
//! // plus a lazy stream over all items across all pages.
//! let mut models = client.list_models(ListParams::new().with_page_size(10)).await?;
//! let mut items = std::pin::pin!(models.items());
//! while let Some(model) = items.try_next().await? {
//!     println!("{}", model.name);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Live bidirectional sessions are provided by the companion
//! `genai-live` crate.

pub mod backend;
pub mod batch;
pub mod builder;
pub mod cache;
pub mod client;
pub mod common;
pub mod embedding;
pub mod error;
pub mod files;
pub mod generation;
pub mod models;
pub mod pager;
pub mod tools;
pub mod tuning;

pub use builder::{set_default_base_url, ClientBuilder};
pub use client::Client;
pub use common::{Blob, Content, Modality, Model, Part, Role};
pub use error::Error;
pub use generation::{GenerationConfig, GenerationResponse, SpeechConfig, UsageMetadata};
pub use pager::{ListParams, PagedItem, Pager};
pub use tools::{FunctionCall, FunctionDeclaration, FunctionResponse, Tool};
