//! Article detail: a raw document into a render-ready [`Article`].

use std::sync::Arc;

use chrono_tz::Tz;

use crate::application::content::{ContentApi, ContentError};
use crate::domain::{
    dates,
    entities::RawDocument,
    posts::{Article, ArticleSection},
    reading_time, rich_text,
};

pub fn build_article(doc: &RawDocument, tz: Tz) -> Article {
    let sections = doc
        .data
        .content
        .iter()
        .map(|block| ArticleSection {
            heading: block.heading.clone(),
            body_html: block
                .body
                .as_ref()
                .map(rich_text::as_html)
                .unwrap_or_default(),
        })
        .collect();

    Article {
        uid: doc.uid.clone().unwrap_or_default(),
        title: doc.data.title.clone(),
        banner_url: doc
            .data
            .banner
            .as_ref()
            .and_then(|banner| banner.url.clone()),
        author: doc.data.author.clone(),
        published: dates::publication_date(doc.first_publication_date.as_deref(), tz),
        sections,
        reading_time_minutes: reading_time::estimate(&doc.data.content),
    }
}

#[derive(Clone)]
pub struct ArticleService {
    content: Arc<dyn ContentApi>,
    doc_type: String,
    tz: Tz,
}

impl ArticleService {
    pub fn new(content: Arc<dyn ContentApi>, doc_type: impl Into<String>, tz: Tz) -> Self {
        Self {
            content,
            doc_type: doc_type.into(),
            tz,
        }
    }

    /// `Ok(None)` when the CMS has no document with `uid`.
    pub async fn article(&self, uid: &str) -> Result<Option<Article>, ContentError> {
        let mut doc = match self.content.get_by_uid(&self.doc_type, uid).await {
            Ok(doc) => doc,
            Err(err) if err.is_not_found() => return Ok(None),
            Err(err) => return Err(err),
        };

        if doc.uid.is_none() {
            doc.uid = Some(uid.to_string());
        }

        Ok(Some(build_article(&doc, self.tz)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::content::fake::PagedContent;
    use crate::domain::{
        entities::{Banner, ContentBlock, PostData},
        rich_text::{RichText, RichTextNode},
    };
    use chrono_tz::UTC;

    fn doc() -> RawDocument {
        RawDocument {
            uid: Some("como-utilizar-hooks".to_string()),
            doc_type: Some("posts".to_string()),
            first_publication_date: Some("2021-03-25T19:27:35+0000".to_string()),
            data: PostData {
                title: Some("Como utilizar Hooks".to_string()),
                subtitle: Some("Pensando em sincronização".to_string()),
                author: Some("Joseph Oliveira".to_string()),
                banner: Some(Banner {
                    url: Some("https://images.prismic.io/banner.png".to_string()),
                    alt: None,
                }),
                content: vec![
                    ContentBlock {
                        heading: Some("Proin <et> varius".to_string()),
                        body: Some(RichText(vec![
                            RichTextNode::paragraph("Nullam dolor sapien, vulputate eu."),
                            RichTextNode::paragraph("Fusce ac & mattis."),
                        ])),
                    },
                    ContentBlock {
                        heading: None,
                        body: None,
                    },
                ],
            },
        }
    }

    #[test]
    fn builds_article_with_sections_and_reading_time() {
        let article = build_article(&doc(), UTC);

        assert_eq!(article.uid, "como-utilizar-hooks");
        assert_eq!(article.title.as_deref(), Some("Como utilizar Hooks"));
        assert_eq!(
            article.banner_url.as_deref(),
            Some("https://images.prismic.io/banner.png")
        );
        assert_eq!(article.published.as_deref(), Some("25 março 2021"));
        assert_eq!(article.sections.len(), 2);
        assert_eq!(article.sections[0].heading.as_deref(), Some("Proin <et> varius"));
        assert_eq!(
            article.sections[0].body_html,
            "<p>Nullam dolor sapien, vulputate eu.</p><p>Fusce ac &amp; mattis.</p>"
        );
        assert_eq!(article.sections[1].body_html, "");
        // 3 heading words + 5 + 3 body words
        assert_eq!(article.reading_time_minutes, 1);
    }

    #[test]
    fn building_twice_yields_identical_articles() {
        let raw = doc();
        assert_eq!(build_article(&raw, UTC), build_article(&raw, UTC));
    }

    #[test]
    fn missing_optional_fields_stay_absent() {
        let raw = RawDocument {
            uid: Some("bare".to_string()),
            doc_type: None,
            first_publication_date: None,
            data: PostData::default(),
        };

        let article = build_article(&raw, UTC);

        assert_eq!(article.title, None);
        assert_eq!(article.banner_url, None);
        assert_eq!(article.published, None);
        assert!(article.sections.is_empty());
        assert_eq!(article.reading_time_minutes, 0);
    }

    #[tokio::test]
    async fn unknown_uid_is_not_found_outcome() {
        let service = ArticleService::new(Arc::new(PagedContent::default()), "posts", UTC);

        assert_eq!(service.article("missing").await.expect("lookup"), None);
    }

    #[tokio::test]
    async fn known_uid_is_transformed() {
        let content = PagedContent::default().document(doc());
        let service = ArticleService::new(Arc::new(content), "posts", UTC);

        let article = service
            .article("como-utilizar-hooks")
            .await
            .expect("lookup")
            .expect("article");

        assert_eq!(article, build_article(&doc(), UTC));
    }
}
