use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use shared::{
    config::{load_settings, SiteSettings},
    pages::{load_pages, PagesConfig},
    protocol::PageSummary,
};
use tracing::info;

pub mod assets;
pub mod minify;
pub mod render;
pub mod sitemap;

/// Everything a build needs: the site root plus its parsed configuration.
#[derive(Debug, Clone)]
pub struct BuildContext {
    pub root: PathBuf,
    pub settings: SiteSettings,
    pub pages: PagesConfig,
}

impl BuildContext {
    /// Loads settings and page metadata from `root`. Fails fast when the
    /// content directory is absent; missing config files only warn.
    pub fn load(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let content_dir = root.join("src").join("content");
        if !content_dir.is_dir() {
            anyhow::bail!(
                "content directory '{}' not found; expected a site root containing src/content",
                content_dir.display()
            );
        }

        let settings = load_settings(&root);
        let pages = load_pages(&root);
        Ok(Self {
            root,
            settings,
            pages,
        })
    }

    pub fn content_dir(&self) -> PathBuf {
        self.root.join("src").join("content")
    }

    pub fn templates_dir(&self) -> PathBuf {
        self.root.join("src").join("templates")
    }

    pub fn assets_dir(&self) -> PathBuf {
        self.root.join("assets")
    }

    pub fn public_dir(&self) -> PathBuf {
        self.root.join("public")
    }
}

#[derive(Debug, Default)]
pub struct BuildReport {
    /// Stems of the pages written to `public/`.
    pub rendered: Vec<String>,
    pub warnings: Vec<String>,
    pub css_built: bool,
    pub sitemap_written: bool,
    pub robots_written: bool,
}

/// Full build: CSS, pages, static assets, then sitemap/robots when enabled.
pub fn build_site(ctx: &BuildContext) -> Result<BuildReport> {
    let public_dir = ctx.public_dir();
    fs::create_dir_all(&public_dir)
        .with_context(|| format!("failed to create '{}'", public_dir.display()))?;

    let mut report = BuildReport::default();
    report.css_built = assets::build_css(ctx)?;
    render::render_pages(ctx, &mut report)?;
    assets::copy_static_files(ctx)?;

    if ctx.settings.generate_sitemap {
        sitemap::create_sitemap(ctx)?;
        report.sitemap_written = true;
    }
    if ctx.settings.generate_robots {
        sitemap::create_robots(ctx)?;
        report.robots_written = true;
    }

    info!(pages = report.rendered.len(), "build completed");
    Ok(report)
}

/// One summary per content page, titled from page metadata when present,
/// otherwise derived from the file stem. Feeds the search surfaces.
pub fn page_index(ctx: &BuildContext) -> Result<Vec<PageSummary>> {
    let mut index = Vec::new();
    for name in render::content_page_names(ctx)? {
        let title = ctx
            .pages
            .get(&name)
            .and_then(|metadata| metadata.title.clone())
            .unwrap_or_else(|| title_from_stem(&name));
        let path = if name == "index" {
            "/".to_string()
        } else {
            format!("/{name}")
        };
        index.push(PageSummary { path, title });
    }
    Ok(index)
}

fn title_from_stem(stem: &str) -> String {
    stem.split(['-', '_'])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub(crate) fn url_path_for(relative: &Path) -> String {
    let joined = relative
        .components()
        .filter_map(|component| component.as_os_str().to_str())
        .collect::<Vec<_>>()
        .join("/");
    let trimmed = joined.strip_suffix(".html").unwrap_or(&joined);
    if trimmed == "index" {
        String::new()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
