//! Page envelope returned by listing operations.

use serde::Serialize;

use crate::{Cursor, PageLimit};

/// One page of results plus the token that resumes after it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    items: Vec<T>,
    next_cursor: Option<Cursor>,
}

impl<T> Page<T> {
    /// Wrap items fetched with `limit`, deriving the continuation token from
    /// the key of the last item.
    ///
    /// `next_cursor` is only set when the page came back full; a shorter page
    /// marks the end of the stream.
    pub fn from_items<F>(items: Vec<T>, limit: PageLimit, key_of: F) -> Self
    where
        F: Fn(&T) -> Vec<u8>,
    {
        let next_cursor = if items.len() == limit.as_usize() {
            items.last().map(|last| Cursor::from_key(&key_of(last)))
        } else {
            None
        };
        Self { items, next_cursor }
    }

    /// A page that never continues, such as a ranked top-N listing.
    #[must_use]
    pub const fn terminal(items: Vec<T>) -> Self {
        Self {
            items,
            next_cursor: None,
        }
    }

    /// A page with no items and no continuation.
    #[must_use]
    pub const fn empty() -> Self {
        Self::terminal(Vec::new())
    }

    /// Items on this page.
    #[must_use]
    pub fn items(&self) -> &[T] {
        self.items.as_slice()
    }

    /// Token for the following page, if any.
    #[must_use]
    pub const fn next_cursor(&self) -> Option<&Cursor> {
        self.next_cursor.as_ref()
    }
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn limit(value: u64) -> PageLimit {
        PageLimit::new(value).expect("test limit in range")
    }

    #[rstest]
    fn full_page_points_at_last_item() {
        let page = Page::from_items(vec![1_u8, 2, 3], limit(3), |item| vec![*item]);
        assert_eq!(page.next_cursor().map(Cursor::as_str), Some("03"));
    }

    #[rstest]
    fn short_page_ends_the_stream() {
        let page = Page::from_items(vec![1_u8, 2], limit(3), |item| vec![*item]);
        assert!(page.next_cursor().is_none());
        assert_eq!(page.items(), &[1, 2]);
    }

    #[rstest]
    fn empty_page_ends_the_stream() {
        let page: Page<u8> = Page::from_items(Vec::new(), limit(1), |item| vec![*item]);
        assert!(page.next_cursor().is_none());
        assert!(page.items().is_empty());
    }

    #[rstest]
    fn serialises_with_snake_case_fields() {
        let page = Page::terminal(vec!["a"]);
        let json = serde_json::to_value(&page).expect("serialise page");
        assert_eq!(json, serde_json::json!({ "items": ["a"], "next_cursor": null }));
    }
}
