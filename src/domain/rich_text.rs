//! Structured rich text as stored by the content API, and its two
//! projections: HTML ([`as_html`]) and plain text ([`as_text`]).
//!
//! Both projections walk the same node sequence. Span offsets count UTF-16
//! code units of the node text, as the API reports them; spans that run past
//! the text are clamped.

use serde::Deserialize;

use crate::domain::entities::null_as_default;

/// An ordered sequence of rich text nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct RichText(pub Vec<RichTextNode>);

impl RichText {
    pub fn nodes(&self) -> &[RichTextNode] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<RichTextNode>> for RichText {
    fn from(nodes: Vec<RichTextNode>) -> Self {
        Self(nodes)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawNode")]
pub enum RichTextNode {
    Heading { level: u8, text: StyledText },
    Paragraph(StyledText),
    Preformatted(StyledText),
    ListItem(StyledText),
    OrderedListItem(StyledText),
    Image {
        url: String,
        alt: Option<String>,
    },
    Embed {
        html: String,
        url: Option<String>,
        kind: Option<String>,
        provider: Option<String>,
    },
    Unsupported {
        kind: String,
    },
}

impl RichTextNode {
    pub fn paragraph(text: impl Into<String>) -> Self {
        Self::Paragraph(StyledText::plain(text))
    }

    /// Text carried by the node, if the node kind has any.
    pub fn text(&self) -> Option<&str> {
        match self {
            RichTextNode::Heading { text, .. }
            | RichTextNode::Paragraph(text)
            | RichTextNode::Preformatted(text)
            | RichTextNode::ListItem(text)
            | RichTextNode::OrderedListItem(text) => Some(text.text.as_str()),
            RichTextNode::Image { .. }
            | RichTextNode::Embed { .. }
            | RichTextNode::Unsupported { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyledText {
    pub text: String,
    pub spans: Vec<Span>,
}

impl StyledText {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            spans: Vec::new(),
        }
    }

    pub fn with_span(mut self, start: usize, end: usize, kind: SpanKind) -> Self {
        self.spans.push(Span { start, end, kind });
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawSpan")]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub kind: SpanKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpanKind {
    Strong,
    Emphasis,
    Hyperlink { url: String, target: Option<String> },
    Label(String),
    Unsupported,
}

#[derive(Deserialize)]
struct RawNode {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    spans: Vec<Span>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    alt: Option<String>,
    #[serde(default)]
    oembed: Option<RawOEmbed>,
}

#[derive(Deserialize)]
struct RawOEmbed {
    #[serde(default)]
    html: Option<String>,
    #[serde(default)]
    embed_url: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    provider_name: Option<String>,
}

#[derive(Deserialize)]
struct RawSpan {
    start: usize,
    end: usize,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Option<RawSpanData>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct RawSpanData {
    url: Option<String>,
    target: Option<String>,
    label: Option<String>,
}

impl From<RawNode> for RichTextNode {
    fn from(raw: RawNode) -> Self {
        let styled = || StyledText {
            text: raw.text.clone().unwrap_or_default(),
            spans: raw.spans.clone(),
        };

        match raw.kind.as_str() {
            "paragraph" => RichTextNode::Paragraph(styled()),
            "preformatted" => RichTextNode::Preformatted(styled()),
            "list-item" => RichTextNode::ListItem(styled()),
            "o-list-item" => RichTextNode::OrderedListItem(styled()),
            "image" => match raw.url {
                Some(url) => RichTextNode::Image { url, alt: raw.alt },
                None => RichTextNode::Unsupported { kind: raw.kind },
            },
            "embed" => match raw.oembed {
                Some(oembed) => RichTextNode::Embed {
                    html: oembed.html.unwrap_or_default(),
                    url: oembed.embed_url,
                    kind: oembed.kind,
                    provider: oembed.provider_name,
                },
                None => RichTextNode::Unsupported { kind: raw.kind },
            },
            other => match heading_level(other) {
                Some(level) => RichTextNode::Heading {
                    level,
                    text: styled(),
                },
                None => RichTextNode::Unsupported { kind: raw.kind },
            },
        }
    }
}

impl From<RawSpan> for Span {
    fn from(raw: RawSpan) -> Self {
        let data = raw.data.unwrap_or_default();
        let kind = match raw.kind.as_str() {
            "strong" => SpanKind::Strong,
            "em" => SpanKind::Emphasis,
            "hyperlink" => match data.url {
                Some(url) => SpanKind::Hyperlink {
                    url,
                    target: data.target,
                },
                None => SpanKind::Unsupported,
            },
            "label" => SpanKind::Label(data.label.unwrap_or_default()),
            _ => SpanKind::Unsupported,
        };

        Span {
            start: raw.start,
            end: raw.end,
            kind,
        }
    }
}

fn heading_level(kind: &str) -> Option<u8> {
    let level = kind.strip_prefix("heading")?.parse::<u8>().ok()?;
    (1..=6).contains(&level).then_some(level)
}

/// Plain text of every text-bearing node, separated by a single space.
pub fn as_text(rich_text: &RichText) -> String {
    let mut out = String::new();
    for text in rich_text.nodes().iter().filter_map(RichTextNode::text) {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(text);
    }
    out
}

/// HTML rendering. Consecutive list items are grouped into one list.
pub fn as_html(rich_text: &RichText) -> String {
    let mut out = String::new();
    let mut open_list: Option<&'static str> = None;

    for node in rich_text.nodes() {
        let wanted = match node {
            RichTextNode::ListItem(_) => Some("ul"),
            RichTextNode::OrderedListItem(_) => Some("ol"),
            _ => None,
        };

        if open_list != wanted {
            if let Some(tag) = open_list {
                out.push_str(&format!("</{tag}>"));
            }
            if let Some(tag) = wanted {
                out.push_str(&format!("<{tag}>"));
            }
            open_list = wanted;
        }

        write_node(&mut out, node);
    }

    if let Some(tag) = open_list {
        out.push_str(&format!("</{tag}>"));
    }

    out
}

fn write_node(out: &mut String, node: &RichTextNode) {
    match node {
        RichTextNode::Heading { level, text } => {
            out.push_str(&format!("<h{level}>"));
            write_styled(out, text);
            out.push_str(&format!("</h{level}>"));
        }
        RichTextNode::Paragraph(text) => wrap(out, "p", text),
        RichTextNode::Preformatted(text) => wrap(out, "pre", text),
        RichTextNode::ListItem(text) | RichTextNode::OrderedListItem(text) => {
            wrap(out, "li", text)
        }
        RichTextNode::Image { url, alt } => {
            out.push_str(r#"<p class="block-img"><img src=""#);
            out.push_str(&escape_html(url));
            out.push_str(r#"" alt=""#);
            out.push_str(&escape_html(alt.as_deref().unwrap_or_default()));
            out.push_str(r#"" /></p>"#);
        }
        RichTextNode::Embed {
            html,
            url,
            kind,
            provider,
        } => {
            out.push_str("<div");
            for (name, value) in [
                ("data-oembed", url),
                ("data-oembed-type", kind),
                ("data-oembed-provider", provider),
            ] {
                if let Some(value) = value {
                    out.push_str(&format!(r#" {name}="{}""#, escape_html(value)));
                }
            }
            out.push('>');
            out.push_str(html);
            out.push_str("</div>");
        }
        RichTextNode::Unsupported { .. } => {}
    }
}

fn wrap(out: &mut String, tag: &str, text: &StyledText) {
    out.push_str(&format!("<{tag}>"));
    write_styled(out, text);
    out.push_str(&format!("</{tag}>"));
}

fn write_styled(out: &mut String, styled: &StyledText) {
    let chars: Vec<char> = styled.text.chars().collect();
    let mut spans: Vec<Span> = styled
        .spans
        .iter()
        .map(|span| Span {
            start: utf16_to_char_index(&chars, span.start),
            end: utf16_to_char_index(&chars, span.end),
            kind: span.kind.clone(),
        })
        .filter(|span| span.start < span.end && span.start < chars.len())
        .collect();
    spans.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));
    write_range(out, &chars, &spans, 0, chars.len());
}

/// Maps a UTF-16 offset to the index of the char that starts at or after it.
/// Offsets past the text map to its length.
fn utf16_to_char_index(chars: &[char], offset: usize) -> usize {
    let mut units = 0;
    for (index, ch) in chars.iter().enumerate() {
        if units >= offset {
            return index;
        }
        units += ch.len_utf16();
    }
    chars.len()
}

// Spans are sorted by start, longest first. A span that starts inside the
// previous one is nested in it and clamped to its end.
fn write_range(out: &mut String, chars: &[char], spans: &[Span], start: usize, end: usize) {
    let mut cursor = start;
    let mut index = 0;

    while index < spans.len() {
        let span = &spans[index];
        let span_start = span.start.max(cursor);
        let span_end = span.end.min(end);
        if span_start >= span_end {
            index += 1;
            continue;
        }

        write_text(out, &chars[cursor..span_start]);

        let mut children_end = index + 1;
        while children_end < spans.len() && spans[children_end].start < span_end {
            children_end += 1;
        }

        open_span(out, &span.kind);
        write_range(out, chars, &spans[index + 1..children_end], span_start, span_end);
        close_span(out, &span.kind);

        cursor = span_end;
        index = children_end;
    }

    write_text(out, &chars[cursor..end]);
}

fn open_span(out: &mut String, kind: &SpanKind) {
    match kind {
        SpanKind::Strong => out.push_str("<strong>"),
        SpanKind::Emphasis => out.push_str("<em>"),
        SpanKind::Hyperlink { url, target } => {
            out.push_str(&format!(r#"<a href="{}""#, escape_html(url)));
            if let Some(target) = target {
                out.push_str(&format!(
                    r#" target="{}" rel="noopener noreferrer""#,
                    escape_html(target)
                ));
            }
            out.push('>');
        }
        SpanKind::Label(label) => {
            out.push_str(&format!(r#"<span class="{}">"#, escape_html(label)))
        }
        SpanKind::Unsupported => {}
    }
}

fn close_span(out: &mut String, kind: &SpanKind) {
    match kind {
        SpanKind::Strong => out.push_str("</strong>"),
        SpanKind::Emphasis => out.push_str("</em>"),
        SpanKind::Hyperlink { .. } => out.push_str("</a>"),
        SpanKind::Label(_) => out.push_str("</span>"),
        SpanKind::Unsupported => {}
    }
}

fn write_text(out: &mut String, chars: &[char]) {
    for ch in chars {
        match ch {
            '\n' => out.push_str("<br />"),
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(*other),
        }
    }
}

pub(crate) fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(json: &str) -> RichText {
        serde_json::from_str(json).expect("valid rich text")
    }

    #[test]
    fn decodes_api_nodes_and_spans() {
        let rich = decode(
            r#"[
                { "type": "heading2", "text": "Title", "spans": [] },
                { "type": "paragraph", "text": "Read the docs", "spans": [
                    { "start": 9, "end": 13, "type": "hyperlink",
                      "data": { "link_type": "Web", "url": "https://example.com", "target": "_blank" } }
                ] },
                { "type": "image", "url": "https://images.prismic.io/a.png", "alt": null, "dimensions": { "width": 1, "height": 1 } },
                { "type": "group-list-item", "text": "?" }
            ]"#,
        );

        assert_eq!(rich.nodes().len(), 4);
        assert!(matches!(rich.nodes()[0], RichTextNode::Heading { level: 2, .. }));
        match &rich.nodes()[1] {
            RichTextNode::Paragraph(text) => assert_eq!(
                text.spans[0].kind,
                SpanKind::Hyperlink {
                    url: "https://example.com".to_string(),
                    target: Some("_blank".to_string()),
                }
            ),
            other => panic!("unexpected node {other:?}"),
        }
        assert!(matches!(rich.nodes()[3], RichTextNode::Unsupported { .. }));
    }

    #[test]
    fn html_groups_consecutive_list_items() {
        let rich = RichText(vec![
            RichTextNode::paragraph("Intro"),
            RichTextNode::ListItem(StyledText::plain("one")),
            RichTextNode::ListItem(StyledText::plain("two")),
            RichTextNode::OrderedListItem(StyledText::plain("first")),
            RichTextNode::paragraph("Outro"),
        ]);

        insta::assert_snapshot!(
            as_html(&rich),
            @"<p>Intro</p><ul><li>one</li><li>two</li></ul><ol><li>first</li></ol><p>Outro</p>"
        );
    }

    #[test]
    fn html_nests_spans_and_escapes_text() {
        let text = StyledText::plain("Hello <world> & friends")
            .with_span(0, 14, SpanKind::Strong)
            .with_span(6, 13, SpanKind::Emphasis);
        let rich = RichText(vec![RichTextNode::Paragraph(text)]);

        assert_eq!(
            as_html(&rich),
            "<p><strong>Hello <em>&lt;world&gt;</em></strong> &amp; friends</p>"
        );
    }

    #[test]
    fn html_clamps_overlapping_spans() {
        let text = StyledText::plain("abcdef")
            .with_span(0, 4, SpanKind::Strong)
            .with_span(2, 6, SpanKind::Emphasis);
        let rich = RichText(vec![RichTextNode::Paragraph(text)]);

        assert_eq!(as_html(&rich), "<p><strong>ab<em>cd</em></strong>ef</p>");
    }

    #[test]
    fn html_renders_links_labels_and_line_breaks() {
        let text = StyledText::plain("go\nhere now")
            .with_span(
                3,
                7,
                SpanKind::Hyperlink {
                    url: "https://example.com/?a=1&b=2".to_string(),
                    target: None,
                },
            )
            .with_span(8, 11, SpanKind::Label("codigo".to_string()));
        let rich = RichText(vec![RichTextNode::Paragraph(text)]);

        assert_eq!(
            as_html(&rich),
            r#"<p>go<br /><a href="https://example.com/?a=1&amp;b=2">here</a> <span class="codigo">now</span></p>"#
        );
    }

    #[test]
    fn html_uses_character_offsets() {
        let text = StyledText::plain("olá você").with_span(4, 8, SpanKind::Strong);
        let rich = RichText(vec![RichTextNode::Paragraph(text)]);

        assert_eq!(as_html(&rich), "<p>olá <strong>você</strong></p>");
    }

    #[test]
    fn html_counts_astral_characters_as_two_offset_units() {
        // The emoji occupies offsets 0..2, so "hi" sits at 3..5.
        let text = StyledText::plain("😀 hi").with_span(3, 5, SpanKind::Strong);
        let rich = RichText(vec![RichTextNode::Paragraph(text)]);

        assert_eq!(as_html(&rich), "<p>😀 <strong>hi</strong></p>");
    }

    #[test]
    fn null_spans_decode_as_unstyled() {
        let rich = decode(r#"[{ "type": "paragraph", "text": "plain", "spans": null }]"#);

        assert_eq!(as_html(&rich), "<p>plain</p>");
    }

    #[test]
    fn html_renders_images_and_embeds() {
        let rich = RichText(vec![
            RichTextNode::Image {
                url: "https://images.example/banner.png".to_string(),
                alt: Some("A \"quoted\" alt".to_string()),
            },
            RichTextNode::Embed {
                html: "<iframe src=\"https://youtube.com/embed/x\"></iframe>".to_string(),
                url: Some("https://youtu.be/x".to_string()),
                kind: Some("video".to_string()),
                provider: Some("YouTube".to_string()),
            },
        ]);

        assert_eq!(
            as_html(&rich),
            concat!(
                r#"<p class="block-img"><img src="https://images.example/banner.png" alt="A &quot;quoted&quot; alt" /></p>"#,
                r#"<div data-oembed="https://youtu.be/x" data-oembed-type="video" data-oembed-provider="YouTube">"#,
                r#"<iframe src="https://youtube.com/embed/x"></iframe></div>"#
            )
        );
    }

    #[test]
    fn text_joins_text_nodes_with_single_space() {
        let rich = RichText(vec![
            RichTextNode::Heading {
                level: 1,
                text: StyledText::plain("Title"),
            },
            RichTextNode::Image {
                url: "https://images.example/a.png".to_string(),
                alt: None,
            },
            RichTextNode::paragraph("Hello, world!"),
        ]);

        assert_eq!(as_text(&rich), "Title Hello, world!");
    }

    #[test]
    fn text_of_empty_rich_text_is_empty() {
        assert_eq!(as_text(&RichText::default()), "");
        assert_eq!(as_html(&RichText::default()), "");
    }
}
