//! Cached content: reusable prefixes billed at a reduced rate.

pub mod builder;
pub mod handle;
pub mod model;

pub use builder::CacheBuilder;
pub use handle::CachedContentHandle;
pub use model::{CacheExpirationRequest, CachedContent, CreateCachedContentRequest};
