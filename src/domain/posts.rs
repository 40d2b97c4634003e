//! Normalised post values handed to the render layer.
//!
//! These are built once from a [`RawDocument`](crate::domain::entities::RawDocument)
//! and never mutated afterwards.

/// One entry of the listing view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub uid: Option<String>,
    pub published: Option<String>,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub author: Option<String>,
}

impl Summary {
    pub fn href(&self) -> Option<String> {
        self.uid.as_ref().map(|uid| post_href(uid))
    }
}

/// A listing page plus the cursor for the following one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostsPage {
    pub summaries: Vec<Summary>,
    pub next_page: Option<String>,
}

impl PostsPage {
    pub fn has_more(&self) -> bool {
        self.next_page.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleSection {
    pub heading: Option<String>,
    pub body_html: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    pub uid: String,
    pub title: Option<String>,
    pub banner_url: Option<String>,
    pub author: Option<String>,
    pub published: Option<String>,
    pub sections: Vec<ArticleSection>,
    pub reading_time_minutes: u32,
}

pub fn post_href(uid: &str) -> String {
    format!("/post/{uid}")
}
