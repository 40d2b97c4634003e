//! HTTP adapter for the Prismic REST API v2.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, de::DeserializeOwned};
use tracing::debug;
use url::Url;

use crate::application::content::{ContentApi, ContentError, TypeQuery, validate_cursor};
use crate::config::ContentSettings;
use crate::domain::entities::{RawDocument, SearchResponse};
use crate::infra::error::InfraError;

const ERROR_BODY_LIMIT: usize = 512;
const PUBLICATION_ORDERING: &str = "[document.first_publication_date desc]";

#[derive(Debug, Deserialize)]
struct ApiDescriptor {
    #[serde(default)]
    refs: Vec<ApiRef>,
}

#[derive(Debug, Deserialize)]
struct ApiRef {
    #[serde(rename = "ref")]
    value: String,
    #[serde(default, rename = "isMasterRef")]
    is_master_ref: bool,
}

pub struct PrismicClient {
    client: Client,
    endpoint: Url,
    search_url: Url,
    access_token: Option<String>,
    timeout: Duration,
}

impl PrismicClient {
    pub fn new(settings: &ContentSettings) -> Result<Self, InfraError> {
        let client = Client::builder()
            .user_agent(concat!("spacetraveling/", env!("CARGO_PKG_VERSION")))
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| InfraError::http(format!("failed to build HTTP client: {err}")))?;

        Self::with_client(client, settings)
    }

    pub fn with_client(client: Client, settings: &ContentSettings) -> Result<Self, InfraError> {
        let search_url = search_url_for(&settings.endpoint)?;
        Ok(Self {
            client,
            endpoint: settings.endpoint.clone(),
            search_url,
            access_token: settings.access_token.clone(),
            timeout: settings.request_timeout,
        })
    }

    async fn master_ref(&self) -> Result<String, ContentError> {
        let mut url = self.endpoint.clone();
        self.append_access_token(&mut url);

        let descriptor: ApiDescriptor = self.get_json(url).await?;
        descriptor
            .refs
            .into_iter()
            .find(|api_ref| api_ref.is_master_ref)
            .map(|api_ref| api_ref.value)
            .ok_or(ContentError::MissingMasterRef)
    }

    fn type_query_url(&self, master_ref: &str, query: &TypeQuery) -> Url {
        let mut url = self.search_url.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("ref", master_ref);
            pairs.append_pair("q", &at_predicate("document.type", &query.doc_type));
            pairs.append_pair("pageSize", &query.page_size.to_string());
            pairs.append_pair("orderings", PUBLICATION_ORDERING);
            if !query.fetch.is_empty() {
                pairs.append_pair("fetch", &query.fetch.join(","));
            }
        }
        self.append_access_token(&mut url);
        url
    }

    fn uid_query_url(&self, master_ref: &str, doc_type: &str, uid: &str) -> Url {
        let mut url = self.search_url.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("ref", master_ref);
            pairs.append_pair("q", &at_predicate(&format!("my.{doc_type}.uid"), uid));
            pairs.append_pair("pageSize", "1");
        }
        self.append_access_token(&mut url);
        url
    }

    fn append_access_token(&self, url: &mut Url) {
        let Some(token) = self.access_token.as_deref() else {
            return;
        };
        if url.query_pairs().any(|(key, _)| key == "access_token") {
            return;
        }
        url.query_pairs_mut().append_pair("access_token", token);
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ContentError> {
        let started = Instant::now();
        let path = url.path().to_string();

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| self.map_transport_error(err))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ContentError::Status {
                status: status.as_u16(),
                body: truncate(body, ERROR_BODY_LIMIT),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|err| self.map_transport_error(err))?;

        debug!(
            target = "spacetraveling::prismic",
            path = %path,
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "content API request completed"
        );

        serde_json::from_slice(&bytes).map_err(ContentError::decode)
    }

    fn map_transport_error(&self, err: reqwest::Error) -> ContentError {
        if err.is_timeout() {
            ContentError::Timeout(self.timeout)
        } else {
            ContentError::transport(err)
        }
    }
}

#[async_trait]
impl ContentApi for PrismicClient {
    async fn query_by_type(&self, query: &TypeQuery) -> Result<SearchResponse, ContentError> {
        let master_ref = self.master_ref().await?;
        self.get_json(self.type_query_url(&master_ref, query)).await
    }

    async fn fetch_page(&self, cursor: &str) -> Result<SearchResponse, ContentError> {
        let mut url = validate_cursor(&self.endpoint, cursor)?;
        self.append_access_token(&mut url);
        self.get_json(url).await
    }

    async fn get_by_uid(&self, doc_type: &str, uid: &str) -> Result<RawDocument, ContentError> {
        if !is_plain_uid(uid) {
            return Err(ContentError::not_found(doc_type, uid));
        }

        let master_ref = self.master_ref().await?;
        let response: SearchResponse = self
            .get_json(self.uid_query_url(&master_ref, doc_type, uid))
            .await?;

        response
            .results
            .into_iter()
            .next()
            .ok_or_else(|| ContentError::not_found(doc_type, uid))
    }
}

fn search_url_for(endpoint: &Url) -> Result<Url, InfraError> {
    let base = format!("{}/documents/search", endpoint.as_str().trim_end_matches('/'));
    let mut url = Url::parse(&base)
        .map_err(|err| InfraError::configuration(format!("invalid content endpoint: {err}")))?;
    url.set_query(None);
    Ok(url)
}

fn at_predicate(path: &str, value: &str) -> String {
    format!("[[at({path},\"{value}\")]]")
}

// Uids are slugs; anything else cannot match and must not reach the query.
fn is_plain_uid(uid: &str) -> bool {
    !uid.is_empty()
        && uid
            .chars()
            .all(|ch| ch.is_alphanumeric() || ch == '-' || ch == '_' || ch == '.')
}

fn truncate(mut body: String, limit: usize) -> String {
    if body.len() > limit {
        let mut end = limit;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        body.truncate(end);
    }
    body
}
