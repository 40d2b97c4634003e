//! Static site output directory.

use std::{
    io,
    path::{Component, Path, PathBuf},
};

use tokio::fs;

use crate::infra::{assets, error::InfraError};

pub const INDEX_PAGE: &str = "index.html";
pub const NOT_FOUND_PAGE: &str = "404.html";
pub const STATIC_DIR: &str = "static";

pub fn article_page(uid: &str) -> String {
    format!("post/{uid}.html")
}

pub fn feed_fragment(ordinal: usize) -> String {
    format!("feed/{ordinal}.html")
}

#[derive(Debug, Clone)]
pub struct OutputDir {
    root: PathBuf,
}

impl OutputDir {
    /// Creates `root` (and parents) when missing.
    pub async fn prepare(root: impl Into<PathBuf>) -> Result<Self, InfraError> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes `contents` at `relative`, creating parent directories. Paths
    /// escaping the output root are rejected.
    pub async fn write(&self, relative: &str, contents: &[u8]) -> Result<PathBuf, InfraError> {
        let target = self.resolve(relative)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&target, contents).await?;
        Ok(target)
    }

    pub async fn write_page(&self, relative: &str, html: &str) -> Result<PathBuf, InfraError> {
        self.write(relative, html.as_bytes()).await
    }

    /// Copies every embedded asset below `static/`. Returns how many were written.
    pub async fn copy_assets(&self) -> Result<usize, InfraError> {
        let files = assets::files();
        for (name, contents) in &files {
            self.write(&format!("{STATIC_DIR}/{name}"), contents).await?;
        }
        Ok(files.len())
    }

    fn resolve(&self, relative: &str) -> Result<PathBuf, InfraError> {
        let path = Path::new(relative);
        let contained = !relative.is_empty()
            && path
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if !contained {
            return Err(InfraError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("output path `{relative}` escapes the output directory"),
            )));
        }
        Ok(self.root.join(path))
    }
}
