//! Enumerates every known article uid, newest first.

use std::{collections::HashSet, num::NonZeroU32, sync::Arc};

use tracing::{debug, warn};

use crate::application::content::{ContentApi, ContentError, TypeQuery};

#[derive(Clone)]
pub struct PathEnumerator {
    content: Arc<dyn ContentApi>,
    doc_type: String,
    page_size: NonZeroU32,
}

impl PathEnumerator {
    pub fn new(content: Arc<dyn ContentApi>, doc_type: impl Into<String>, page_size: NonZeroU32) -> Self {
        Self {
            content,
            doc_type: doc_type.into(),
            page_size,
        }
    }

    /// Follows `next_page` until exhausted. Documents without a uid are
    /// skipped and repeated uids keep their first position.
    pub async fn paths(&self) -> Result<Vec<String>, ContentError> {
        let query = TypeQuery::new(self.doc_type.clone(), self.page_size).with_fields(["title"]);
        let mut response = self.content.query_by_type(&query).await?;

        let mut uids = Vec::new();
        let mut seen_uids = HashSet::new();
        let mut seen_cursors = HashSet::new();
        let mut pages = 1usize;

        loop {
            for doc in response.results {
                match doc.uid {
                    Some(uid) if seen_uids.insert(uid.clone()) => uids.push(uid),
                    Some(_) => {}
                    None => debug!(
                        target = "spacetraveling::paths",
                        doc_type = %self.doc_type,
                        "skipping document without uid"
                    ),
                }
            }

            let Some(cursor) = response.next_page else {
                break;
            };
            if !seen_cursors.insert(cursor.clone()) {
                warn!(
                    target = "spacetraveling::paths",
                    cursor = %cursor,
                    "content API repeated a pagination cursor; stopping"
                );
                break;
            }

            response = self.content.fetch_page(&cursor).await?;
            pages += 1;
        }

        debug!(
            target = "spacetraveling::paths",
            paths = uids.len(),
            pages,
            "Enumerated article paths"
        );
        Ok(uids)
    }
}
