//! Pagination primitives shared by cocraft feed queries.
//!
//! Feeds are walked with keyset pagination: every page carries an opaque
//! [`Cursor`] built from the key of its last item, and the next request
//! resumes strictly after that key in the requested [`SortDirection`]. A
//! [`Page`] only advertises a continuation when it came back full, so a short
//! tail never costs the caller an extra empty round-trip.
//!
//! # Example
//!
//! ```
//! use pagination::{Page, PageLimit};
//!
//! let limit = PageLimit::new(2).expect("limit within bounds");
//! let page = Page::from_items(vec![[1_u8], [2_u8]], limit, |item| item.to_vec());
//! assert_eq!(page.next_cursor().map(|cursor| cursor.as_str()), Some("02"));
//! ```

mod cursor;
mod direction;
mod limit;
mod page;

pub use cursor::{Cursor, CursorError};
pub use direction::{SortDirection, SortDirectionError};
pub use limit::{LimitError, PageLimit};
pub use page::Page;
