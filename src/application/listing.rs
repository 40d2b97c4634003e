//! Listing view: raw search pages into [`PostsPage`]s, and the [`Feed`]
//! accumulator behind "load more".

use std::{collections::HashSet, num::NonZeroU32, sync::Arc};

use chrono_tz::Tz;
use tracing::debug;

use crate::application::content::{ContentApi, ContentError, TypeQuery};
use crate::domain::{
    dates,
    entities::{RawDocument, SearchResponse},
    posts::{PostsPage, Summary},
};

pub const LISTING_FIELDS: [&str; 3] = ["title", "subtitle", "author"];

pub fn summarize(doc: &RawDocument, tz: Tz) -> Summary {
    Summary {
        uid: doc.uid.clone(),
        published: dates::publication_date(doc.first_publication_date.as_deref(), tz),
        title: doc.data.title.clone(),
        subtitle: doc.data.subtitle.clone(),
        author: doc.data.author.clone(),
    }
}

/// Maps a page in order. A uid repeated within the page keeps its first
/// occurrence.
pub fn summarize_page(response: SearchResponse, tz: Tz) -> PostsPage {
    let mut seen = HashSet::new();
    let summaries = response
        .results
        .iter()
        .filter(|doc| match &doc.uid {
            Some(uid) => seen.insert(uid.clone()),
            None => true,
        })
        .map(|doc| summarize(doc, tz))
        .collect();

    PostsPage {
        summaries,
        next_page: response.next_page,
    }
}

/// Handle for one in-flight load-more request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    token: u64,
    cursor: String,
}

impl LoadTicket {
    pub fn cursor(&self) -> &str {
        &self.cursor
    }

    pub fn token(&self) -> u64 {
        self.token
    }
}

/// Accumulated listing state. Items are only ever appended; at most one load
/// is in flight and late responses for an older ticket are dropped.
#[derive(Debug, Clone)]
pub struct Feed {
    summaries: Vec<Summary>,
    next_page: Option<String>,
    in_flight: Option<u64>,
    issued: u64,
}

impl Feed {
    pub fn new(first: PostsPage) -> Self {
        Self {
            summaries: first.summaries,
            next_page: first.next_page,
            in_flight: None,
            issued: 0,
        }
    }

    pub fn begin_load(&mut self) -> Option<LoadTicket> {
        if self.in_flight.is_some() {
            return None;
        }
        let cursor = self.next_page.clone()?;
        self.issued += 1;
        self.in_flight = Some(self.issued);
        Some(LoadTicket {
            token: self.issued,
            cursor,
        })
    }

    /// Applies a fetched page. Returns `false` when the ticket is stale.
    pub fn complete(&mut self, ticket: LoadTicket, page: PostsPage) -> bool {
        if self.in_flight != Some(ticket.token) {
            return false;
        }
        self.in_flight = None;
        self.summaries.extend(page.summaries);
        self.next_page = page.next_page;
        true
    }

    pub fn abandon(&mut self, ticket: LoadTicket) {
        if self.in_flight == Some(ticket.token) {
            self.in_flight = None;
        }
    }

    pub fn show_load_more(&self) -> bool {
        self.next_page.is_some()
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn summaries(&self) -> &[Summary] {
        &self.summaries
    }

    pub fn next_page(&self) -> Option<&str> {
        self.next_page.as_deref()
    }

    pub fn len(&self) -> usize {
        self.summaries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.summaries.is_empty()
    }
}

#[derive(Clone)]
pub struct ListingService {
    content: Arc<dyn ContentApi>,
    doc_type: String,
    page_size: NonZeroU32,
    tz: Tz,
}

impl ListingService {
    pub fn new(
        content: Arc<dyn ContentApi>,
        doc_type: impl Into<String>,
        page_size: NonZeroU32,
        tz: Tz,
    ) -> Self {
        Self {
            content,
            doc_type: doc_type.into(),
            page_size,
            tz,
        }
    }

    pub fn query(&self) -> TypeQuery {
        TypeQuery::new(self.doc_type.clone(), self.page_size).with_fields(LISTING_FIELDS)
    }

    pub async fn first_page(&self) -> Result<PostsPage, ContentError> {
        let response = self.content.query_by_type(&self.query()).await?;
        Ok(summarize_page(response, self.tz))
    }

    pub async fn page_at(&self, cursor: &str) -> Result<PostsPage, ContentError> {
        let response = self.content.fetch_page(cursor).await?;
        Ok(summarize_page(response, self.tz))
    }

    /// Runs one load-more cycle against `feed` and returns how many
    /// summaries were appended. A feed with nothing left to load, or with a
    /// load already running, is left untouched.
    pub async fn load_more(&self, feed: &mut Feed) -> Result<usize, ContentError> {
        if feed.is_loading() {
            debug!("Load more skipped: a load is already in flight");
            return Ok(0);
        }
        let Some(ticket) = feed.begin_load() else {
            return Ok(0);
        };

        match self.page_at(ticket.cursor()).await {
            Ok(page) => {
                let appended = page.summaries.len();
                Ok(if feed.complete(ticket, page) {
                    appended
                } else {
                    0
                })
            }
            Err(err) => {
                feed.abandon(ticket);
                Err(err)
            }
        }
    }
}
