//! Raw documents as delivered by the content API.
//!
//! Every field the CMS may omit is optional here; normalisation into
//! [`crate::domain::posts`] types decides what an absent value means.

use serde::{Deserialize, Deserializer};

use crate::domain::rich_text::RichText;

/// Decodes an explicit `null` the same way as a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// One document from the content API.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RawDocument {
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(default, rename = "type")]
    pub doc_type: Option<String>,
    #[serde(default)]
    pub first_publication_date: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: PostData,
}

/// CMS-defined fields of a post document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PostData {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub author: Option<String>,
    pub banner: Option<Banner>,
    #[serde(deserialize_with = "null_as_default")]
    pub content: Vec<ContentBlock>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Banner {
    pub url: Option<String>,
    pub alt: Option<String>,
}

/// A titled chunk of article content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ContentBlock {
    pub heading: Option<String>,
    pub body: Option<RichText>,
}

/// One page of a content API query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SearchResponse {
    #[serde(deserialize_with = "null_as_default")]
    pub page: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub results_per_page: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub total_results_size: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub total_pages: u32,
    pub next_page: Option<String>,
    pub prev_page: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub results: Vec<RawDocument>,
}

impl SearchResponse {
    pub fn empty() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_search_response_with_missing_fields() {
        let payload = r#"{
            "page": 1,
            "results_per_page": 1,
            "total_results_size": 2,
            "total_pages": 2,
            "next_page": "https://blog.cdn.prismic.io/api/v2/documents/search?page=2",
            "prev_page": null,
            "results": [
                {
                    "id": "YE4x",
                    "uid": "como-utilizar-hooks",
                    "type": "posts",
                    "first_publication_date": "2021-03-15T19:25:28+0000",
                    "data": {
                        "title": "Como utilizar Hooks",
                        "author": "Joseph Oliveira",
                        "content": [
                            { "heading": "Proin et varius" }
                        ]
                    }
                }
            ]
        }"#;

        let response: SearchResponse = serde_json::from_str(payload).expect("valid payload");

        assert_eq!(response.total_pages, 2);
        assert!(response.next_page.is_some());
        let doc = &response.results[0];
        assert_eq!(doc.uid.as_deref(), Some("como-utilizar-hooks"));
        assert_eq!(doc.doc_type.as_deref(), Some("posts"));
        assert_eq!(doc.data.subtitle, None);
        assert_eq!(doc.data.banner, None);
        assert_eq!(doc.data.content.len(), 1);
        assert_eq!(doc.data.content[0].body, None);
    }

    #[test]
    fn null_fields_decode_as_absent() {
        let payload = r#"{ "uid": null, "first_publication_date": null, "data": { "title": null, "content": [] } }"#;
        let doc: RawDocument = serde_json::from_str(payload).expect("valid document");

        assert_eq!(doc.uid, None);
        assert_eq!(doc.first_publication_date, None);
        assert_eq!(doc.data.title, None);
    }

    #[test]
    fn null_collections_decode_as_empty() {
        let payload = r#"{ "uid": "a", "data": { "title": "A", "content": null } }"#;
        let doc: RawDocument = serde_json::from_str(payload).expect("null content");
        assert_eq!(doc.data.title.as_deref(), Some("A"));
        assert!(doc.data.content.is_empty());

        let payload = r#"{ "uid": "b", "data": null }"#;
        let doc: RawDocument = serde_json::from_str(payload).expect("null data");
        assert_eq!(doc.data, PostData::default());

        let payload = r#"{ "page": 1, "total_pages": null, "results": null, "next_page": null }"#;
        let response: SearchResponse = serde_json::from_str(payload).expect("null results");
        assert_eq!(response.total_pages, 0);
        assert!(response.results.is_empty());
    }
}
