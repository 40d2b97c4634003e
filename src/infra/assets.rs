//! Embedded static assets: served over HTTP and copied into static builds.

use axum::{
    body::Body,
    extract::Path,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use include_dir::{Dir, DirEntry, include_dir};
use mime_guess::{Mime, MimeGuess};

use crate::application::error::ErrorReport;

static STATIC_ASSETS: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/static");

/// Serve embedded static assets.
pub async fn serve_public(path: Option<Path<String>>) -> Response {
    let captured = path.map(|Path(value)| value);
    match resolve_asset(captured) {
        Some(asset) => asset.into_response(),
        None => not_found_response("infra::assets::serve_public"),
    }
}

/// Every embedded asset as `(relative path, contents)`.
pub fn files() -> Vec<(String, &'static [u8])> {
    let mut collected = Vec::new();
    collect(&STATIC_ASSETS, &mut collected);
    collected.sort_by(|a, b| a.0.cmp(&b.0));
    collected
}

fn collect(dir: &'static Dir<'static>, out: &mut Vec<(String, &'static [u8])>) {
    for entry in dir.entries() {
        match entry {
            DirEntry::Dir(child) => collect(child, out),
            DirEntry::File(file) => out.push((
                file.path().to_string_lossy().replace('\\', "/"),
                file.contents(),
            )),
        }
    }
}

fn not_found_response(source: &'static str) -> Response {
    let mut response = StatusCode::NOT_FOUND.into_response();
    ErrorReport::from_message(source, StatusCode::NOT_FOUND, "Static asset not found")
        .attach(&mut response);
    response
}

struct Asset {
    contents: &'static [u8],
    mime: MimeGuess,
}

fn resolve_asset(path: Option<String>) -> Option<Asset> {
    let candidate = path.unwrap_or_default();
    let candidate = candidate.trim_start_matches('/');

    if candidate.is_empty() || candidate.ends_with('/') || candidate.contains("..") {
        return None;
    }

    let file = STATIC_ASSETS.get_file(candidate)?;
    Some(Asset {
        contents: file.contents(),
        mime: mime_guess::from_path(candidate),
    })
}

impl IntoResponse for Asset {
    fn into_response(self) -> Response {
        build_response(
            Bytes::from_static(self.contents),
            self.mime.first_or_octet_stream(),
        )
    }
}

fn build_response(bytes: Bytes, mime: Mime) -> Response {
    let len = bytes.len();
    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
        headers.insert(header::CONTENT_TYPE, value);
    }
    if let Ok(value) = HeaderValue::from_str(&len.to_string()) {
        headers.insert(header::CONTENT_LENGTH, value);
    }
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=3600"),
    );

    response
}
