// ABOUTME: Ordered page draining for cursor-paginated platform endpoints
// ABOUTME: Streams pages lazily and refuses to surface a partial result as complete
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Page Draining
//!
//! Platforms split results across pages (Facebook `paging.next`, GoHighLevel
//! `startAfterId` cursors) or batches (Google Ads `searchStream`, Sheets
//! value ranges). Cursors are stateful, so pages are requested strictly one
//! after another in the order received.
//!
//! A page fetch that fails ends the stream with that error; callers that
//! collect the stream therefore either see every page or an error, never a
//! truncated list.

use std::future::Future;
use std::pin::Pin;

use async_stream::try_stream;
use futures_util::{Stream, TryStreamExt};
use tracing::debug;

use crate::constants::tuning::MAX_PAGES;
use crate::errors::{PlatformError, PlatformResult};
use crate::models::Platform;

/// One page of items plus the cursor for the next page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    /// Items on this page, in platform order
    pub items: Vec<T>,
    /// Cursor or URL for the next page, `None` on the last page
    pub next: Option<String>,
}

impl<T> Page<T> {
    /// Final page
    #[must_use]
    pub const fn last(items: Vec<T>) -> Self {
        Self { items, next: None }
    }
}

/// Stream of pages returned by [`drain_pages`]
pub type PageStream<'a, T> = Pin<Box<dyn Stream<Item = PlatformResult<Page<T>>> + Send + 'a>>;

/// Lazily request pages until the platform stops returning a cursor
///
/// `fetch` receives `None` for the first page and then each page's `next`
/// cursor. A repeated cursor or more than [`MAX_PAGES`] pages ends the
/// stream with an error instead of looping forever.
pub fn drain_pages<'a, T, F, Fut>(platform: Platform, mut fetch: F) -> PageStream<'a, T>
where
    T: Send + 'a,
    F: FnMut(Option<String>) -> Fut + Send + 'a,
    Fut: Future<Output = PlatformResult<Page<T>>> + Send + 'a,
{
    Box::pin(try_stream! {
        let mut cursor: Option<String> = None;
        let mut pages = 0_usize;

        loop {
            if pages >= MAX_PAGES {
                Err::<(), _>(PlatformError::api(
                    platform,
                    None,
                    format!("pagination exceeded {MAX_PAGES} pages"),
                ))?;
            }

            let current = cursor.take();
            let page = fetch(current.clone()).await?;
            pages += 1;
            debug!(platform = %platform, page = pages, items = page.items.len(), "fetched page");

            let next = page.next.clone();
            yield page;

            match next {
                Some(next_cursor) if !next_cursor.is_empty() => {
                    if current.as_ref() == Some(&next_cursor) {
                        Err::<(), _>(PlatformError::api(platform, None, "pagination cursor did not advance"))?;
                    }
                    cursor = Some(next_cursor);
                }
                _ => break,
            }
        }
    })
}

/// Drain every page and concatenate items in order
///
/// # Errors
///
/// The first page error; items from earlier pages are discarded
pub async fn collect_all<T>(stream: PageStream<'_, T>) -> PlatformResult<Vec<T>> {
    stream
        .try_fold(Vec::new(), |mut items, page| async move {
            items.extend(page.items);
            Ok(items)
        })
        .await
}
