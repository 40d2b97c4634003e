//! In-memory content API shared by the integration tests.

#![allow(dead_code)]

use std::{
    collections::HashMap,
    num::NonZeroU32,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use serde_json::json;
use spacetraveling::{
    application::{
        article::ArticleService,
        content::{ContentApi, ContentError, TypeQuery},
        listing::ListingService,
        paths::PathEnumerator,
        site::SiteGenerator,
    },
    domain::entities::{RawDocument, SearchResponse},
    presentation::views::LayoutChrome,
};

pub const SECOND_PAGE: &str =
    "https://spacetraveling.cdn.prismic.io/api/v2/documents/search?page=2&pageSize=2";

#[derive(Default)]
pub struct FakeContent {
    first: SearchResponse,
    pages: HashMap<String, SearchResponse>,
    documents: HashMap<String, RawDocument>,
    failing: AtomicBool,
    pub uid_lookups: AtomicUsize,
}

impl FakeContent {
    /// Three posts over two listing pages. `sem-conteudo` is listed but
    /// cannot be fetched by uid.
    pub fn blog() -> Self {
        let hooks = post(
            "como-utilizar-hooks",
            "2021-03-15T19:25:28+0000",
            "Como utilizar Hooks",
            "Pensando em sincronização em vez de ciclos de vida",
        );
        let redux = post(
            "criando-um-app-cra-do-zero",
            "2021-03-10T12:00:00+0000",
            "Criando um app CRA do zero",
            "Tudo sobre como criar a sua primeira aplicação",
        );
        let orphan = post(
            "sem-conteudo",
            "2021-02-01T12:00:00+0000",
            "Post removido",
            "Ainda listado",
        );

        let mut fake = Self {
            first: SearchResponse {
                page: 1,
                results_per_page: 2,
                total_results_size: 3,
                total_pages: 2,
                next_page: Some(SECOND_PAGE.to_string()),
                prev_page: None,
                results: vec![hooks.clone(), redux.clone()],
            },
            ..Self::default()
        };
        fake.pages.insert(
            SECOND_PAGE.to_string(),
            SearchResponse {
                page: 2,
                results_per_page: 2,
                total_results_size: 3,
                total_pages: 2,
                next_page: None,
                prev_page: None,
                results: vec![orphan],
            },
        );
        for doc in [hooks, redux] {
            if let Some(uid) = doc.uid.clone() {
                fake.documents.insert(uid, doc);
            }
        }
        fake
    }

    pub fn fail_requests(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), ContentError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(ContentError::Status {
                status: 503,
                body: "upstream unavailable".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ContentApi for FakeContent {
    async fn query_by_type(&self, _query: &TypeQuery) -> Result<SearchResponse, ContentError> {
        self.check_available()?;
        Ok(self.first.clone())
    }

    async fn fetch_page(&self, cursor: &str) -> Result<SearchResponse, ContentError> {
        self.check_available()?;
        self.pages
            .get(cursor)
            .cloned()
            .ok_or_else(|| ContentError::InvalidCursor(cursor.to_string()))
    }

    async fn get_by_uid(&self, doc_type: &str, uid: &str) -> Result<RawDocument, ContentError> {
        self.check_available()?;
        self.uid_lookups.fetch_add(1, Ordering::SeqCst);
        self.documents
            .get(uid)
            .cloned()
            .ok_or_else(|| ContentError::not_found(doc_type, uid))
    }
}

pub fn post(uid: &str, published: &str, title: &str, subtitle: &str) -> RawDocument {
    serde_json::from_value(json!({
        "id": format!("id-{uid}"),
        "uid": uid,
        "type": "posts",
        "first_publication_date": published,
        "data": {
            "title": title,
            "subtitle": subtitle,
            "author": "Joseph Oliveira",
            "banner": { "url": format!("https://images.prismic.io/{uid}.png"), "alt": null },
            "content": [
                {
                    "heading": "Proin et varius",
                    "body": [
                        {
                            "type": "paragraph",
                            "text": "Nullam dolor sapien, vulputate eu diam at, condimentum hendrerit tellus.",
                            "spans": [{ "start": 0, "end": 6, "type": "strong" }]
                        },
                        { "type": "list-item", "text": "Primeiro", "spans": [] },
                        { "type": "list-item", "text": "Segundo", "spans": [] }
                    ]
                }
            ]
        }
    }))
    .expect("fixture document decodes")
}

pub fn site(content: Arc<FakeContent>) -> SiteGenerator {
    let tz = chrono_tz::America::Sao_Paulo;
    let page_size = NonZeroU32::new(2).expect("non-zero");
    let content: Arc<dyn ContentApi> = content;

    SiteGenerator::new(
        ListingService::new(Arc::clone(&content), "posts", page_size, tz),
        ArticleService::new(Arc::clone(&content), "posts", tz),
        PathEnumerator::new(content, "posts", NonZeroU32::new(100).expect("non-zero")),
        LayoutChrome::new("spacetraveling", "Blog de tecnologia", None),
        NonZeroU32::new(1).expect("non-zero"),
    )
}
