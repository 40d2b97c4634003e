//! Content API port. Every flow talks to the CMS through [`ContentApi`].

use std::{fmt, num::NonZeroU32, time::Duration};

use async_trait::async_trait;
use thiserror::Error;
use url::Url;

use crate::domain::entities::{RawDocument, SearchResponse};

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("document `{uid}` of type `{doc_type}` not found")]
    NotFound { doc_type: String, uid: String },
    #[error("content API request failed: {0}")]
    Transport(String),
    #[error("content API request timed out after {0:?}")]
    Timeout(Duration),
    #[error("content API responded with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("content API payload could not be decoded: {0}")]
    Decode(String),
    #[error("pagination cursor `{0}` does not belong to the content API")]
    InvalidCursor(String),
    #[error("content API repository has no master ref")]
    MissingMasterRef,
}

impl ContentError {
    pub fn not_found(doc_type: impl Into<String>, uid: impl Into<String>) -> Self {
        Self::NotFound {
            doc_type: doc_type.into(),
            uid: uid.into(),
        }
    }

    pub fn transport(err: impl fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }

    pub fn decode(err: impl fmt::Display) -> Self {
        Self::Decode(err.to_string())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ContentError::NotFound { .. })
    }
}

/// A listing query over one document type, newest publication first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeQuery {
    pub doc_type: String,
    pub page_size: NonZeroU32,
    /// Fully qualified field names (`posts.title`); empty selects everything.
    pub fetch: Vec<String>,
}

impl TypeQuery {
    pub fn new(doc_type: impl Into<String>, page_size: NonZeroU32) -> Self {
        Self {
            doc_type: doc_type.into(),
            page_size,
            fetch: Vec::new(),
        }
    }

    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.fetch = fields
            .into_iter()
            .map(|field| format!("{}.{}", self.doc_type, field.as_ref()))
            .collect();
        self
    }
}

#[async_trait]
pub trait ContentApi: Send + Sync {
    /// First page of documents of the query's type.
    async fn query_by_type(&self, query: &TypeQuery) -> Result<SearchResponse, ContentError>;

    /// A page addressed by a `next_page` cursor. Cursors that do not point
    /// at the content API fail with [`ContentError::InvalidCursor`].
    async fn fetch_page(&self, cursor: &str) -> Result<SearchResponse, ContentError>;

    /// The single document with `uid`, or [`ContentError::NotFound`].
    async fn get_by_uid(&self, doc_type: &str, uid: &str) -> Result<RawDocument, ContentError>;
}

/// Parses `cursor` and checks that it shares scheme, host and port with
/// `endpoint`.
pub fn validate_cursor(endpoint: &Url, cursor: &str) -> Result<Url, ContentError> {
    let parsed = Url::parse(cursor).map_err(|_| ContentError::InvalidCursor(cursor.to_string()))?;

    let same_origin = parsed.scheme() == endpoint.scheme()
        && parsed.host_str() == endpoint.host_str()
        && parsed.port_or_known_default() == endpoint.port_or_known_default();

    if same_origin {
        Ok(parsed)
    } else {
        Err(ContentError::InvalidCursor(cursor.to_string()))
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint() -> Url {
        Url::parse("https://spacetraveling.cdn.prismic.io/api/v2").expect("endpoint")
    }

    #[test]
    fn accepts_cursor_on_same_origin() {
        let cursor = "https://spacetraveling.cdn.prismic.io:443/api/v2/documents/search?page=2";
        assert!(validate_cursor(&endpoint(), cursor).is_ok());
    }

    #[test]
    fn rejects_foreign_or_malformed_cursors() {
        for cursor in [
            "https://evil.example/api/v2/documents/search?page=2",
            "http://spacetraveling.cdn.prismic.io/api/v2/documents/search?page=2",
            "https://spacetraveling.cdn.prismic.io:8443/api/v2/documents/search",
            "page=2",
        ] {
            assert!(
                matches!(
                    validate_cursor(&endpoint(), cursor),
                    Err(ContentError::InvalidCursor(_))
                ),
                "cursor {cursor} should be rejected"
            );
        }
    }

    #[test]
    fn query_fields_are_qualified_by_type() {
        let query = TypeQuery::new("posts", NonZeroU32::MIN).with_fields(["title", "author"]);
        assert_eq!(query.fetch, vec!["posts.title", "posts.author"]);
    }
}
