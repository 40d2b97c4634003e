//! Page generation shared by the static build and the HTTP server.

use std::{
    collections::HashSet,
    num::NonZeroU32,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use futures::{TryStreamExt, stream};
use tracing::{info, warn};

use crate::application::{
    article::ArticleService,
    content::ContentApi,
    error::AppError,
    listing::{Feed, ListingService},
    paths::PathEnumerator,
};
use crate::config::Settings;
use crate::domain::posts::post_href;
use crate::infra::output::{self, OutputDir};
use crate::presentation::views::{
    self, ErrorPageView, ErrorTemplate, IndexTemplate, IndexView, LayoutChrome, LayoutContext,
    LoadMoreView, PostCardsAppendTemplate, PostDetailContext, PostTemplate,
};

/// How "load more" controls address the next page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMoreLinks {
    /// Pre-rendered fragments at `/feed/<n>.html`.
    Static,
    /// The live `/posts/more?cursor=` endpoint.
    Live,
}

impl LoadMoreLinks {
    fn href(self, cursor: &str, next_fragment: usize) -> String {
        match self {
            LoadMoreLinks::Static => format!("/{}", output::feed_fragment(next_fragment)),
            LoadMoreLinks::Live => {
                let encoded: String = url::form_urlencoded::byte_serialize(cursor.as_bytes()).collect();
                format!("/posts/more?cursor={encoded}")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildReport {
    pub articles: usize,
    pub feed_pages: usize,
    pub skipped: usize,
}

#[derive(Clone)]
pub struct SiteGenerator {
    listing: ListingService,
    articles: ArticleService,
    paths: PathEnumerator,
    chrome: LayoutChrome,
    initial_pages: NonZeroU32,
}

impl SiteGenerator {
    pub fn new(
        listing: ListingService,
        articles: ArticleService,
        paths: PathEnumerator,
        chrome: LayoutChrome,
        initial_pages: NonZeroU32,
    ) -> Self {
        Self {
            listing,
            articles,
            paths,
            chrome,
            initial_pages,
        }
    }

    /// Wires every service against `content` as configured in `settings`.
    pub fn from_settings(content: Arc<dyn ContentApi>, settings: &Settings) -> Self {
        let doc_type = settings.content.document_type.as_str();
        let tz = settings.site.timezone;
        Self::new(
            ListingService::new(
                Arc::clone(&content),
                doc_type,
                settings.content.listing_page_size,
                tz,
            ),
            ArticleService::new(Arc::clone(&content), doc_type, tz),
            PathEnumerator::new(content, doc_type, settings.content.paths_page_size),
            LayoutChrome::new(
                settings.site.title.clone(),
                settings.site.description.clone(),
                settings.site.public_url.as_ref().map(|url| url.to_string()),
            ),
            settings.site.initial_pages,
        )
    }

    pub fn chrome(&self) -> &LayoutChrome {
        &self.chrome
    }

    pub fn listing(&self) -> &ListingService {
        &self.listing
    }

    pub fn paths(&self) -> &PathEnumerator {
        &self.paths
    }

    /// The first listing page plus `initial_pages - 1` further pages.
    pub async fn index_feed(&self) -> Result<Feed, AppError> {
        let mut feed = Feed::new(self.listing.first_page().await?);
        for _ in 1..self.initial_pages.get() {
            if !feed.show_load_more() {
                break;
            }
            self.listing.load_more(&mut feed).await?;
        }
        Ok(feed)
    }

    pub fn render_index(&self, feed: &Feed, links: LoadMoreLinks) -> Result<String, AppError> {
        let load_more = LoadMoreView {
            href: feed.next_page().map(|cursor| links.href(cursor, 1)),
        };
        let view = LayoutContext::new(
            self.chrome.for_page("/", None),
            IndexView {
                posts: views::post_cards(feed.summaries()),
                load_more,
            },
        );
        Ok(views::render_html(IndexTemplate { view })?)
    }

    pub async fn index(&self, links: LoadMoreLinks) -> Result<String, AppError> {
        let feed = self.index_feed().await?;
        self.render_index(&feed, links)
    }

    /// `None` when the CMS has no article with `uid`.
    pub async fn article_page(&self, uid: &str) -> Result<Option<String>, AppError> {
        let Some(article) = self.articles.article(uid).await? else {
            return Ok(None);
        };

        let view = LayoutContext::new(
            self.chrome
                .for_page(&post_href(uid), article.title.as_deref()),
            PostDetailContext::from(&article),
        );
        Ok(Some(views::render_html(PostTemplate { view })?))
    }

    /// Cards of the page at `cursor`, followed by a live control for the
    /// page after it.
    pub async fn more_fragment(&self, cursor: &str) -> Result<String, AppError> {
        let page = self.listing.page_at(cursor).await?;
        let load_more = LoadMoreView {
            href: page
                .next_page
                .as_deref()
                .map(|next| LoadMoreLinks::Live.href(next, 0)),
        };
        Ok(views::render_html(PostCardsAppendTemplate {
            posts: views::post_cards(&page.summaries),
            load_more,
        })?)
    }

    pub fn not_found_page(&self) -> Result<String, AppError> {
        let view = LayoutContext::new(
            self.chrome.for_page("/404", Some("Página não encontrada")),
            ErrorPageView::not_found(),
        );
        Ok(views::render_html(ErrorTemplate { view })?)
    }

    /// Writes the whole site below `output`. Articles render concurrently,
    /// at most `concurrency` at a time.
    pub async fn build(
        &self,
        target: &OutputDir,
        concurrency: NonZeroU32,
    ) -> Result<BuildReport, AppError> {
        let uids = self.paths.paths().await?;
        info!(
            target = "spacetraveling::build",
            paths = uids.len(),
            output = %target.root().display(),
            "Starting static build"
        );

        let mut feed = self.index_feed().await?;
        let index = self.render_index(&feed, LoadMoreLinks::Static)?;
        target.write_page(output::INDEX_PAGE, &index).await?;

        let feed_pages = self.write_feed_fragments(target, &mut feed).await?;

        let rendered = Arc::new(AtomicUsize::new(0));
        let skipped = Arc::new(AtomicUsize::new(0));
        let limit = usize::try_from(concurrency.get()).unwrap_or(usize::MAX);

        stream::iter(uids.into_iter().map(Ok::<String, AppError>))
            .try_for_each_concurrent(Some(limit), |uid| {
                let rendered = Arc::clone(&rendered);
                let skipped = Arc::clone(&skipped);
                async move {
                    match self.article_page(&uid).await? {
                        Some(html) => {
                            target
                                .write_page(&output::article_page(&uid), &html)
                                .await?;
                            rendered.fetch_add(1, Ordering::Relaxed);
                        }
                        None => {
                            warn!(
                                target = "spacetraveling::build",
                                uid = %uid,
                                "article disappeared between enumeration and fetch; skipping"
                            );
                            skipped.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                    Ok(())
                }
            })
            .await?;

        target
            .write_page(output::NOT_FOUND_PAGE, &self.not_found_page()?)
            .await?;
        let assets = target.copy_assets().await?;

        let report = BuildReport {
            articles: rendered.load(Ordering::Relaxed),
            feed_pages,
            skipped: skipped.load(Ordering::Relaxed),
        };
        info!(
            target = "spacetraveling::build",
            articles = report.articles,
            feed_pages = report.feed_pages,
            skipped = report.skipped,
            assets,
            "Static build finished"
        );
        Ok(report)
    }

    // Each load-more step becomes `feed/<n>.html`: the newly appended cards
    // plus a control pointing at fragment n + 1.
    async fn write_feed_fragments(
        &self,
        target: &OutputDir,
        feed: &mut Feed,
    ) -> Result<usize, AppError> {
        let mut written = 0;
        let mut seen_cursors = HashSet::new();

        while let Some(cursor) = feed.next_page().map(str::to_string) {
            if !seen_cursors.insert(cursor.clone()) {
                warn!(
                    target = "spacetraveling::build",
                    cursor = %cursor,
                    "content API repeated a pagination cursor; stopping"
                );
                break;
            }

            let before = feed.len();
            self.listing.load_more(feed).await?;
            written += 1;

            let load_more = LoadMoreView {
                href: feed
                    .next_page()
                    .map(|next| LoadMoreLinks::Static.href(next, written + 1)),
            };
            let html = views::render_html(PostCardsAppendTemplate {
                posts: views::post_cards(&feed.summaries()[before..]),
                load_more,
            })?;
            target
                .write_page(&output::feed_fragment(written), &html)
                .await?;
        }

        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_links_point_at_numbered_fragments() {
        assert_eq!(LoadMoreLinks::Static.href("ignored", 3), "/feed/3.html");
    }

    #[test]
    fn live_links_encode_the_cursor() {
        assert_eq!(
            LoadMoreLinks::Live.href("https://blog.cdn.prismic.io/api/v2/documents/search?page=2&ref=X", 0),
            "/posts/more?cursor=https%3A%2F%2Fblog.cdn.prismic.io%2Fapi%2Fv2%2Fdocuments%2Fsearch%3Fpage%3D2%26ref%3DX"
        );
    }
}
