//! Cursor-based pager over the service's list endpoints.
//!
//! Every list API returns one page of items plus an opaque
//! `nextPageToken`. [`Pager`] wraps the list call behind a uniform
//! cursor: the current page is directly indexable, and [`Pager::items`]
//! exposes the whole result set as a lazy stream that fetches the next
//! page on demand.

use futures::future::BoxFuture;
use futures::Stream;
use serde::de::DeserializeOwned;
use serde_json::Value;
use snafu::{OptionExt, ResultExt};
use strum::{Display, IntoStaticStr};

use crate::error::{DeserializeSnafu, Error, NoMorePagesSnafu, OutOfRangeSnafu};

/// The entity kind a pager iterates over.
///
/// The kind names the envelope field the items are read from; the other
/// envelope fields (`nextPageToken`) are kind-independent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr)]
pub enum PagedItem {
    #[strum(serialize = "batchJobs")]
    BatchJobs,
    #[strum(serialize = "models")]
    Models,
    #[strum(serialize = "tuningJobs")]
    TuningJobs,
    #[strum(serialize = "files")]
    Files,
    #[strum(serialize = "cachedContents")]
    CachedContents,
}

impl PagedItem {
    /// Envelope field holding this kind's items.
    pub fn field_name(self) -> &'static str {
        self.into()
    }
}

/// Parameters of a list call.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ListParams {
    pub page_size: Option<i32>,
    pub page_token: Option<String>,
    pub filter: Option<String>,
}

impl ListParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page_size(mut self, page_size: i32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    pub fn with_page_token(mut self, page_token: impl Into<String>) -> Self {
        self.page_token = Some(page_token.into());
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }
}

/// One unary list call returning the raw response envelope.
pub type ListRequestFn =
    Box<dyn Fn(ListParams) -> BoxFuture<'static, Result<Value, Error>> + Send + Sync>;

/// Decoded view of one response envelope.
#[derive(Debug, Clone)]
struct PageState<T> {
    items: Vec<T>,
    next_page_token: Option<String>,
}

/// Decode an envelope into items + token. A missing item field is an
/// empty page, not an error; an empty-string token means no next page.
fn advance<T: DeserializeOwned>(kind: PagedItem, envelope: &Value) -> Result<PageState<T>, Error> {
    let items = match envelope.get(kind.field_name()) {
        Some(items) => serde_json::from_value(items.clone()).context(DeserializeSnafu)?,
        None => Vec::new(),
    };
    let next_page_token = envelope
        .get("nextPageToken")
        .and_then(Value::as_str)
        .filter(|token| !token.is_empty())
        .map(str::to_string);
    Ok(PageState { items, next_page_token })
}

/// Client-side cursor over a paginated list endpoint.
///
/// Constructed from an already-fetched first page; [`Pager::next_page`]
/// replaces the current page in place. The cursor only moves forward:
/// the item stream returned by [`Pager::items`] resumes wherever the
/// cursor currently points, and a second iteration after exhaustion
/// stays on the final page instead of restarting.
pub struct Pager<T> {
    name: PagedItem,
    request: ListRequestFn,
    params: ListParams,
    state: PageState<T>,
    index: usize,
}

impl<T: DeserializeOwned + Clone + Send> Pager<T> {
    /// Wrap a list call. `first_page` is the raw envelope of the page
    /// already fetched with `params`.
    pub fn new(
        name: PagedItem,
        request: ListRequestFn,
        first_page: &Value,
        params: ListParams,
    ) -> Result<Self, Error> {
        let state = advance(name, first_page)?;
        Ok(Self { name, request, params, state, index: 0 })
    }

    /// Items of the current page. Never fetches.
    pub fn page(&self) -> &[T] {
        &self.state.items
    }

    /// The entity kind this pager iterates over.
    pub fn name(&self) -> PagedItem {
        self.name
    }

    /// The configured page size. The server may return fewer items than
    /// this on the last page.
    pub fn page_size(&self) -> Option<i32> {
        self.params.page_size
    }

    /// Parameters of the most recent list call.
    pub fn params(&self) -> &ListParams {
        &self.params
    }

    /// Item at `index` within the current page only.
    pub fn get_item(&self, index: usize) -> Result<&T, Error> {
        let len = self.state.items.len();
        self.state.items.get(index).context(OutOfRangeSnafu { index, len })
    }

    /// Whether the most recent response carried a next-page token.
    pub fn has_next_page(&self) -> bool {
        self.state.next_page_token.is_some()
    }

    /// Fetch the next page, replacing the current page and params.
    ///
    /// Fails with [`Error::NoMorePages`] when the prior response carried
    /// no token. On any failure the cursor is left untouched, so the
    /// same call may be retried.
    pub async fn next_page(&mut self) -> Result<&[T], Error> {
        let token = self
            .state
            .next_page_token
            .clone()
            .context(NoMorePagesSnafu)?;
        let mut params = self.params.clone();
        params.page_token = Some(token);

        let envelope = (self.request)(params.clone()).await?;
        let state = advance(self.name, &envelope)?;

        self.params = params;
        self.state = state;
        self.index = 0;
        Ok(&self.state.items)
    }

    /// Lazy stream over all remaining items across all remaining pages.
    ///
    /// Single pass and forward-only: the stream picks up at the cursor's
    /// current position, awaits [`Pager::next_page`] at each page
    /// boundary, and ends when no token remains. Transport failures are
    /// yielded unchanged and do not advance the cursor.
    pub fn items(&mut self) -> impl Stream<Item = Result<T, Error>> + Send + '_
    where
        T: Sync,
    {
        async_stream::try_stream! {
            loop {
                while self.index < self.state.items.len() {
                    let item = self.state.items[self.index].clone();
                    self.index += 1;
                    yield item;
                }
                if !self.has_next_page() {
                    break;
                }
                self.next_page().await?;
            }
        }
    }
}

impl<T> std::fmt::Debug for Pager<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pager")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("page.len", &self.state.items.len())
            .field("index", &self.index)
            .field("has_next_page", &self.state.next_page_token.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn field_names_match_wire_envelope_keys() {
        assert_eq!(PagedItem::BatchJobs.field_name(), "batchJobs");
        assert_eq!(PagedItem::Models.field_name(), "models");
        assert_eq!(PagedItem::TuningJobs.field_name(), "tuningJobs");
        assert_eq!(PagedItem::Files.field_name(), "files");
        assert_eq!(PagedItem::CachedContents.field_name(), "cachedContents");
        assert_eq!(PagedItem::Files.to_string(), "files");
    }

    #[test]
    fn advance_reads_items_and_token() {
        let envelope = json!({"models": [1, 2, 3], "nextPageToken": "abc"});
        let state: PageState<i32> = advance(PagedItem::Models, &envelope).unwrap();
        assert_eq!(state.items, vec![1, 2, 3]);
        assert_eq!(state.next_page_token.as_deref(), Some("abc"));
    }

    #[test]
    fn advance_treats_missing_field_as_empty_page() {
        let envelope = json!({"nextPageToken": "abc"});
        let state: PageState<i32> = advance(PagedItem::Files, &envelope).unwrap();
        assert!(state.items.is_empty());
        assert_eq!(state.next_page_token.as_deref(), Some("abc"));
    }

    #[test]
    fn advance_ignores_empty_token() {
        let envelope = json!({"files": [], "nextPageToken": ""});
        let state: PageState<i32> = advance(PagedItem::Files, &envelope).unwrap();
        assert!(state.next_page_token.is_none());
    }

    #[test]
    fn advance_rejects_mistyped_items() {
        let envelope = json!({"models": "not-an-array"});
        let result: Result<PageState<i32>, _> = advance(PagedItem::Models, &envelope);
        assert!(matches!(result, Err(Error::Deserialize { .. })));
    }
}
