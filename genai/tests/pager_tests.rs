//! Pager behavior against stubbed list calls: no network involved.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use futures::TryStreamExt;
use serde_json::{json, Value};

use genai::error::Error;
use genai::pager::{ListParams, ListRequestFn, PagedItem, Pager};

/// Stub list call resolving pages by token. The empty token addresses
/// the first page, matching a pager built before any token exists.
fn stub_request(
    pages: HashMap<String, Value>,
    calls: Arc<Mutex<Vec<ListParams>>>,
) -> ListRequestFn {
    Box::new(move |params| {
        let pages = pages.clone();
        let calls = calls.clone();
        Box::pin(async move {
            calls.lock().unwrap().push(params.clone());
            let token = params.page_token.clone().unwrap_or_default();
            pages.get(&token).cloned().ok_or(Error::BadResponse {
                code: 500,
                description: Some(format!("no page for token {token:?}")),
            })
        })
    })
}

fn three_pages() -> HashMap<String, Value> {
    HashMap::from([
        ("".to_string(), json!({"models": [1, 2, 3], "nextPageToken": "t1"})),
        ("t1".to_string(), json!({"models": [4, 5], "nextPageToken": "t2"})),
        ("t2".to_string(), json!({"models": [6]})),
    ])
}

fn pager_over(
    pages: HashMap<String, Value>,
    params: ListParams,
    calls: Arc<Mutex<Vec<ListParams>>>,
) -> Pager<i32> {
    let first_page = pages.get("").cloned().unwrap();
    let request = stub_request(pages, calls);
    Pager::new(PagedItem::Models, request, &first_page, params).unwrap()
}

#[tokio::test]
async fn iteration_yields_all_pages_in_order() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let params = ListParams::new().with_page_size(3);
    let mut pager = pager_over(three_pages(), params, calls.clone());

    assert_eq!(pager.page(), &[1, 2, 3]);
    assert!(pager.has_next_page());

    let items: Vec<i32> = pager.items().try_collect().await.unwrap();
    assert_eq!(items, vec![1, 2, 3, 4, 5, 6]);

    // Terminal only once the last page is current.
    assert!(!pager.has_next_page());
    assert_eq!(pager.page(), &[6]);

    // Each fetch overwrote the page token while keeping the page size.
    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].page_token.as_deref(), Some("t1"));
    assert_eq!(calls[1].page_token.as_deref(), Some("t2"));
    assert!(calls.iter().all(|c| c.page_size == Some(3)));
}

#[tokio::test]
async fn get_item_is_bounded_by_the_current_page() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let pager = pager_over(three_pages(), ListParams::new(), calls);

    assert_eq!(*pager.get_item(0).unwrap(), 1);
    assert_eq!(*pager.get_item(2).unwrap(), 3);
    assert!(matches!(
        pager.get_item(3),
        Err(Error::OutOfRange { index: 3, len: 3 })
    ));
}

#[tokio::test]
async fn terminal_next_page_rejects_and_leaves_state_unchanged() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let mut pager = pager_over(three_pages(), ListParams::new(), calls);

    let _: Vec<i32> = pager.items().try_collect().await.unwrap();
    let params_before = pager.params().clone();

    assert!(matches!(pager.next_page().await, Err(Error::NoMorePages)));
    assert_eq!(pager.page(), &[6]);
    assert_eq!(pager.params(), &params_before);
}

#[tokio::test]
async fn failed_fetch_leaves_cursor_retryable() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    // Second page missing from the stub: the fetch fails like a
    // transport error would.
    let pages = HashMap::from([(
        "".to_string(),
        json!({"models": [1, 2], "nextPageToken": "gone"}),
    )]);
    let first_page = pages.get("").cloned().unwrap();
    let request = stub_request(pages, calls);
    let mut pager: Pager<i32> =
        Pager::new(PagedItem::Models, request, &first_page, ListParams::new()).unwrap();

    assert!(matches!(pager.next_page().await, Err(Error::BadResponse { .. })));

    // No partial page was applied: the same call can be retried.
    assert_eq!(pager.page(), &[1, 2]);
    assert!(pager.has_next_page());
    assert!(pager.params().page_token.is_none());
}

#[tokio::test]
async fn iteration_is_single_pass_and_resumes_from_the_cursor() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let mut pager = pager_over(three_pages(), ListParams::new(), calls);

    {
        let mut items = std::pin::pin!(pager.items());
        assert_eq!(items.try_next().await.unwrap(), Some(1));
        assert_eq!(items.try_next().await.unwrap(), Some(2));
    }

    // A fresh stream picks up where the last one stopped.
    let rest: Vec<i32> = pager.items().try_collect().await.unwrap();
    assert_eq!(rest, vec![3, 4, 5, 6]);

    // After exhaustion, re-iterating stays on the final page instead of
    // restarting from the first.
    let again: Vec<i32> = pager.items().try_collect().await.unwrap();
    assert!(again.is_empty());
    assert_eq!(pager.page(), &[6]);
}

#[tokio::test]
async fn missing_item_field_is_an_empty_page_not_an_error() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let pages = HashMap::from([
        ("".to_string(), json!({"files": [{"name": "files/a"}], "nextPageToken": "t1"})),
        // Envelope with no `files` field at all.
        ("t1".to_string(), json!({"nextPageToken": "t2"})),
        ("t2".to_string(), json!({"files": [{"name": "files/b"}]})),
    ]);
    let first_page = pages.get("").cloned().unwrap();
    let request = stub_request(pages, calls);
    let mut pager: Pager<Value> =
        Pager::new(PagedItem::Files, request, &first_page, ListParams::new()).unwrap();

    let items: Vec<Value> = pager.items().try_collect().await.unwrap();
    let names: Vec<&str> = items.iter().map(|f| f["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["files/a", "files/b"]);
}

#[tokio::test]
async fn page_size_reflects_the_request_not_the_page() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let pager = pager_over(three_pages(), ListParams::new().with_page_size(50), calls);

    // The server returned fewer items than requested.
    assert_eq!(pager.page_size(), Some(50));
    assert_eq!(pager.page().len(), 3);
    assert_eq!(pager.name(), PagedItem::Models);
}
