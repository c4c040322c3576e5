//! Logical page assembly over native store pages.
//!
//! A caller's page may span several native list calls (the store caps each
//! call at its own page size). Calls are made in sequence, each asking only
//! for the records still missing, so the store's own token at the cut point
//! resumes exactly after the last record returned.

use tracing::debug;

use super::{ListingPage, ObjectStore};
use crate::types::AppResult;

/// List up to `max_keys` records, starting fresh under `prefix` or resuming
/// from `continuation_token`. The token is passed to the store verbatim.
pub async fn list_objects(
    store: &dyn ObjectStore,
    prefix: Option<&str>,
    max_keys: usize,
    continuation_token: Option<&str>,
) -> AppResult<ListingPage> {
    let mut records = Vec::with_capacity(max_keys.min(store.native_page_size()));
    let mut token = continuation_token.map(str::to_owned);

    if max_keys == 0 {
        return Ok(ListingPage {
            records,
            next_token: token,
        });
    }

    loop {
        let remaining = max_keys - records.len();
        // a resumed listing gets its prefix back from the token
        let scope = if token.is_some() { None } else { prefix };

        let page = store.list_page(scope, remaining, token.as_deref()).await?;
        debug!(
            store = store.name(),
            fetched = page.records.len(),
            remaining,
            truncated = page.next_token.is_some(),
            "Fetched native listing page"
        );

        records.extend(page.records);
        token = page.next_token;

        if records.len() >= max_keys || token.is_none() {
            break;
        }
    }

    Ok(ListingPage {
        records,
        next_token: token,
    })
}
