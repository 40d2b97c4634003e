use crate::application::error::{ErrorReport, HttpError};
use crate::domain::posts::{Article, Summary};
use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

/// Renders a template to a standalone HTML string.
pub fn render_html<T: Template>(template: T) -> Result<String, TemplateRenderError> {
    template.render().map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_html",
            "Template rendering failed",
            err,
        )
    })
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    render_html(template).map(Html).map_err(HttpError::from)
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn render_not_found_response(chrome: LayoutChrome) -> Response {
    let view = LayoutContext::new(chrome, ErrorPageView::not_found());
    let mut response = render_template_response(ErrorTemplate { view }, StatusCode::NOT_FOUND);
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        "Resource not found",
    )
    .attach(&mut response);
    response
}

/// Error page for a failed request. `report` carries the internal detail.
pub fn render_error_response(
    chrome: LayoutChrome,
    status: StatusCode,
    public_message: &str,
    report: ErrorReport,
) -> Response {
    let view = LayoutContext::new(chrome, ErrorPageView::failure(status, public_message));
    let mut response = render_template_response(ErrorTemplate { view }, status);
    report.attach(&mut response);
    response
}

#[derive(Clone)]
pub struct BrandView {
    pub title: String,
    pub href: String,
}

#[derive(Clone)]
pub struct PageMetaView {
    pub title: String,
    pub description: String,
    pub canonical: Option<String>,
}

impl PageMetaView {
    pub fn with_title(self, title: String) -> Self {
        Self { title, ..self }
    }

    pub fn with_canonical(self, canonical: Option<String>) -> Self {
        Self { canonical, ..self }
    }
}

/// Site-wide pieces shared by every full page.
#[derive(Clone)]
pub struct LayoutChrome {
    pub brand: BrandView,
    pub meta: PageMetaView,
    pub public_url: Option<String>,
}

impl LayoutChrome {
    pub fn new(title: impl Into<String>, description: impl Into<String>, public_url: Option<String>) -> Self {
        let title = title.into();
        Self {
            brand: BrandView {
                title: title.clone(),
                href: "/".to_string(),
            },
            meta: PageMetaView {
                title,
                description: description.into(),
                canonical: None,
            },
            public_url: public_url.map(|url| url.trim_end_matches('/').to_string()),
        }
    }

    /// Chrome for a page at `path`, titled `page_title` when given.
    pub fn for_page(&self, path: &str, page_title: Option<&str>) -> Self {
        let meta = self.meta.clone();
        let meta = match page_title {
            Some(page_title) => meta.with_title(format!("{page_title} | {}", self.brand.title)),
            None => meta,
        };
        let canonical = self.public_url.as_ref().map(|base| format!("{base}{path}"));

        Self {
            brand: self.brand.clone(),
            meta: meta.with_canonical(canonical),
            public_url: self.public_url.clone(),
        }
    }
}

#[derive(Clone)]
pub struct LayoutContext<T> {
    pub brand: BrandView,
    pub meta: PageMetaView,
    pub content: T,
}

impl<T> LayoutContext<T> {
    pub fn new(chrome: LayoutChrome, content: T) -> Self {
        Self {
            brand: chrome.brand,
            meta: chrome.meta,
            content,
        }
    }
}

#[derive(Clone)]
pub struct PostCard {
    pub href: Option<String>,
    pub title: String,
    pub subtitle: Option<String>,
    pub author: Option<String>,
    pub published: Option<String>,
}

impl From<&Summary> for PostCard {
    fn from(summary: &Summary) -> Self {
        Self {
            href: summary.href(),
            title: summary.title.clone().unwrap_or_default(),
            subtitle: summary.subtitle.clone(),
            author: summary.author.clone(),
            published: summary.published.clone(),
        }
    }
}

pub fn post_cards(summaries: &[Summary]) -> Vec<PostCard> {
    summaries.iter().map(PostCard::from).collect()
}

#[derive(Clone)]
pub struct LoadMoreView {
    pub href: Option<String>,
}

pub struct IndexView {
    pub posts: Vec<PostCard>,
    pub load_more: LoadMoreView,
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub view: LayoutContext<IndexView>,
}

/// Cards appended by "load more", followed by the next control.
#[derive(Template)]
#[template(path = "partials/post_cards_append.html")]
pub struct PostCardsAppendTemplate {
    pub posts: Vec<PostCard>,
    pub load_more: LoadMoreView,
}

pub struct PostSectionView {
    pub heading: Option<String>,
    pub body_html: String,
}

pub struct PostDetailContext {
    pub title: String,
    pub banner_url: Option<String>,
    pub author: Option<String>,
    pub published: Option<String>,
    pub reading_time: String,
    pub sections: Vec<PostSectionView>,
}

impl From<&Article> for PostDetailContext {
    fn from(article: &Article) -> Self {
        Self {
            title: article.title.clone().unwrap_or_default(),
            banner_url: article.banner_url.clone(),
            author: article.author.clone(),
            published: article.published.clone(),
            reading_time: format!("{} min", article.reading_time_minutes),
            sections: article
                .sections
                .iter()
                .map(|section| PostSectionView {
                    heading: section.heading.clone(),
                    body_html: section.body_html.clone(),
                })
                .collect(),
        }
    }
}

#[derive(Template)]
#[template(path = "post.html")]
pub struct PostTemplate {
    pub view: LayoutContext<PostDetailContext>,
}

pub struct ErrorPageView {
    pub title: String,
    pub message: String,
    pub primary_action: Option<ErrorAction>,
}

impl ErrorPageView {
    pub fn not_found() -> Self {
        Self {
            title: "Página não encontrada".to_string(),
            message: "O post que você procura não existe ou foi removido.".to_string(),
            primary_action: Some(ErrorAction::home()),
        }
    }

    pub fn failure(status: StatusCode, message: &str) -> Self {
        Self {
            title: status
                .canonical_reason()
                .unwrap_or("Error")
                .to_string(),
            message: message.to_string(),
            primary_action: Some(ErrorAction::home()),
        }
    }
}

pub struct ErrorAction {
    pub href: String,
    pub label: String,
}

impl ErrorAction {
    pub fn home() -> Self {
        Self {
            href: "/".to_string(),
            label: "Voltar para o início".to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub view: LayoutContext<ErrorPageView>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::posts::ArticleSection;

    fn chrome() -> LayoutChrome {
        LayoutChrome::new(
            "spacetraveling",
            "Blog",
            Some("https://blog.example/".to_string()),
        )
    }

    fn summary(uid: &str) -> Summary {
        Summary {
            uid: Some(uid.to_string()),
            published: Some("15 março 2021".to_string()),
            title: Some("Como utilizar <Hooks>".to_string()),
            subtitle: None,
            author: Some("Joseph Oliveira".to_string()),
        }
    }

    #[test]
    fn page_chrome_sets_title_and_canonical() {
        let page = chrome().for_page("/post/hooks", Some("Hooks"));

        assert_eq!(page.meta.title, "Hooks | spacetraveling");
        assert_eq!(
            page.meta.canonical.as_deref(),
            Some("https://blog.example/post/hooks")
        );
    }

    #[test]
    fn appended_cards_escape_text_and_link_the_next_page() {
        let html = render_html(PostCardsAppendTemplate {
            posts: post_cards(&[summary("hooks")]),
            load_more: LoadMoreView {
                href: Some("/feed/2.html".to_string()),
            },
        })
        .expect("render");

        assert!(html.contains(r#"href="/post/hooks""#));
        assert!(html.contains("Como utilizar &#60;Hooks&#62;") || html.contains("Como utilizar &lt;Hooks&gt;"));
        assert!(html.contains("15 março 2021"));
        assert!(html.contains(r#"data-load-more="/feed/2.html""#));
    }

    #[test]
    fn appended_cards_without_cursor_hide_the_control() {
        let html = render_html(PostCardsAppendTemplate {
            posts: post_cards(&[summary("hooks")]),
            load_more: LoadMoreView { href: None },
        })
        .expect("render");

        assert!(!html.contains("data-load-more"));
    }

    #[test]
    fn post_page_renders_body_html_unescaped() {
        let article = Article {
            uid: "hooks".to_string(),
            title: Some("Hooks".to_string()),
            banner_url: Some("https://images.example/banner.png".to_string()),
            author: Some("Joseph Oliveira".to_string()),
            published: Some("15 março 2021".to_string()),
            sections: vec![ArticleSection {
                heading: Some("Intro".to_string()),
                body_html: "<p><strong>bold</strong></p>".to_string(),
            }],
            reading_time_minutes: 4,
        };
        let view = LayoutContext::new(
            chrome().for_page("/post/hooks", Some("Hooks")),
            PostDetailContext::from(&article),
        );

        let html = render_html(PostTemplate { view }).expect("render");

        assert!(html.contains("<p><strong>bold</strong></p>"));
        assert!(html.contains("4 min"));
        assert!(html.contains(r#"src="https://images.example/banner.png""#));
        assert!(html.contains(r#"<link rel="canonical" href="https://blog.example/post/hooks""#));
    }

    #[test]
    fn post_page_passes_headings_through_verbatim() {
        let article = Article {
            uid: "hooks".to_string(),
            title: Some("Hooks".to_string()),
            banner_url: None,
            author: None,
            published: None,
            sections: vec![ArticleSection {
                heading: Some("Proin <em>et</em> varius &amp; more".to_string()),
                body_html: String::new(),
            }],
            reading_time_minutes: 1,
        };
        let view = LayoutContext::new(
            chrome().for_page("/post/hooks", Some("Hooks")),
            PostDetailContext::from(&article),
        );

        let html = render_html(PostTemplate { view }).expect("render");

        assert!(html.contains("<h2>Proin <em>et</em> varius &amp; more</h2>"));
    }

    #[test]
    fn not_found_response_carries_status_and_report() {
        let response = render_not_found_response(chrome());

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.extensions().get::<ErrorReport>().is_some());
    }
}
