use eventsource_stream::EventStreamError;
use reqwest::header::InvalidHeaderValue;
use snafu::Snafu;
use url::Url;

/// Errors produced by the REST client and the pager.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("failed to parse API key"))]
    InvalidApiKey { source: InvalidHeaderValue },

    #[snafu(display("no credentials configured; supply an API key or a service account"))]
    MissingCredentials,

    #[snafu(display("failed to construct URL (probably incorrect resource name): {suffix}"))]
    ConstructUrl {
        source: url::ParseError,
        suffix: String,
    },

    PerformRequestNew { source: reqwest::Error },

    #[snafu(display("failed to perform request to '{url}'"))]
    PerformRequest { source: reqwest::Error, url: Url },

    #[snafu(display(
        "bad response from server; code {code}; description: {}",
        description.as_deref().unwrap_or("none")
    ))]
    BadResponse {
        /// HTTP status code
        code: u16,
        /// HTTP error description
        description: Option<String>,
    },

    MissingResponseHeader { header: String },

    #[snafu(display("failed to obtain stream SSE part"))]
    BadPart {
        source: EventStreamError<reqwest::Error>,
    },

    #[snafu(display("failed to deserialize JSON response"))]
    Deserialize { source: serde_json::Error },

    #[snafu(display("failed to decode response body"))]
    DecodeResponse { source: reqwest::Error },

    #[snafu(display("failed to parse URL"))]
    UrlParse { source: url::ParseError },

    #[snafu(display("failed to parse service account key"))]
    ServiceAccountKeyParse { source: serde_json::Error },

    #[snafu(display("failed to build service account JWT assertion"))]
    ServiceAccountJwt { source: jsonwebtoken::errors::Error },

    #[snafu(display("failed to exchange JWT for access token at '{url}'"))]
    ServiceAccountToken { source: reqwest::Error, url: String },

    #[snafu(display("operation '{operation}' is not supported by the cloud project/location mode"))]
    Unsupported { operation: String },

    #[snafu(display("page item index {index} out of range for page of {len} items"))]
    OutOfRange { index: usize, len: usize },

    #[snafu(display("no further pages: the last response carried no next-page token"))]
    NoMorePages,

    #[snafu(display("I/O error during file operations"))]
    Io { source: std::io::Error },
}
