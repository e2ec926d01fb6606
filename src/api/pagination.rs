//! Paginated collection fetching
//!
//! Collection endpoints answer with
//! `{"data": [...], "pagination": {"first", "last", "prev", "next"}}`
//! where `next` is an absolute URL, or null on the last page.

use super::client::ApiClient;
use anyhow::Result;
use futures::stream::{self, Stream, TryStreamExt};
use serde_json::Value;
use std::collections::HashSet;

/// One page of a collection
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub data: Vec<Value>,
    pub next: Option<String>,
}

impl Page {
    /// Split a collection response into items and the next link
    pub fn from_response(response: &Value) -> Self {
        let data = response
            .get("data")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();

        let next = response
            .get("pagination")
            .and_then(|p| p.get("next"))
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string());

        Self { data, next }
    }
}

enum Pending {
    Path(String),
    Link(String),
}

struct Cursor {
    pending: Option<Pending>,
    visited: HashSet<String>,
}

/// Stream the pages of a collection, following `next` links
///
/// The stream ends when `next` is null or points at a page that was already
/// fetched.
pub fn pages<'a>(client: &'a ApiClient, path: &str) -> impl Stream<Item = Result<Page>> + 'a {
    let cursor = Cursor {
        pending: Some(Pending::Path(path.to_string())),
        visited: HashSet::new(),
    };

    stream::try_unfold(cursor, move |cursor| next_page(client, cursor))
}

async fn next_page(client: &ApiClient, mut cursor: Cursor) -> Result<Option<(Page, Cursor)>> {
    let url = match cursor.pending.take() {
        None => return Ok(None),
        Some(Pending::Path(path)) => client.endpoint(&path)?,
        Some(Pending::Link(link)) => client.validate_link(&link)?.to_string(),
    };
    cursor.visited.insert(url.clone());

    let response = client.get_url(&url).await?;
    let page = Page::from_response(&response);
    tracing::debug!("Fetched page with {} items from {}", page.data.len(), url);

    if let Some(next) = &page.next {
        let next_url = client.validate_link(next)?.to_string();
        if cursor.visited.contains(&next_url) {
            tracing::warn!("Pagination loop detected at {}, stopping", next_url);
        } else {
            cursor.pending = Some(Pending::Link(next_url));
        }
    }

    Ok(Some((page, cursor)))
}

/// Fetch every item of a collection (auto-paginate)
pub async fn fetch_all(client: &ApiClient, path: &str) -> Result<Vec<Value>> {
    pages(client, path)
        .try_fold(Vec::new(), |mut all_items, page| async move {
            all_items.extend(page.data);
            Ok(all_items)
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_page_from_response_with_next() {
        let page = Page::from_response(&json!({
            "data": [{"id": "1"}, {"id": "2"}],
            "pagination": {
                "first": "https://uptime.example.com/api/v2/monitors?page=1",
                "last": "https://uptime.example.com/api/v2/monitors?page=2",
                "prev": null,
                "next": "https://uptime.example.com/api/v2/monitors?page=2"
            }
        }));
        assert_eq!(page.data.len(), 2);
        assert_eq!(
            page.next.as_deref(),
            Some("https://uptime.example.com/api/v2/monitors?page=2")
        );
    }

    #[test]
    fn test_page_from_response_last_page() {
        let page = Page::from_response(&json!({
            "data": [],
            "pagination": {"next": null}
        }));
        assert!(page.data.is_empty());
        assert!(page.next.is_none());
    }

    #[test]
    fn test_page_without_pagination_block() {
        let page = Page::from_response(&json!({"data": [{"id": "1"}]}));
        assert_eq!(page.data.len(), 1);
        assert!(page.next.is_none());
    }
}
