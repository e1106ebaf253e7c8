use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::Utc;
use quick_xml::{
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
    Writer,
};
use tracing::info;
use url::Url;

use crate::{url_path_for, BuildContext};

const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

/// Writes `public/sitemap.xml` from the rendered HTML files. Page `last_mod`
/// metadata wins over today's date; paths in `sitemap_exclude` are dropped.
pub fn create_sitemap(ctx: &BuildContext) -> Result<PathBuf> {
    let base = parsed_base_url(&ctx.settings.base_url)?;
    let base = base.as_str().trim_end_matches('/').to_string();
    let public_dir = ctx.public_dir();

    let mut html_files = Vec::new();
    collect_html_files(&public_dir, &mut html_files)?;
    html_files.sort();

    let today = Utc::now().format("%Y-%m-%d").to_string();
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    let mut urlset = BytesStart::new("urlset");
    urlset.push_attribute(("xmlns", SITEMAP_NS));
    writer.write_event(Event::Start(urlset))?;

    for file in &html_files {
        let relative = file.strip_prefix(&public_dir).with_context(|| {
            format!("'{}' is outside '{}'", file.display(), public_dir.display())
        })?;
        let url_path = url_path_for(relative);
        if ctx
            .settings
            .sitemap_exclude
            .iter()
            .any(|excluded| excluded == &url_path)
        {
            continue;
        }

        let loc = format!("{base}/{url_path}");
        let lookup_key = if url_path.is_empty() {
            "index"
        } else {
            url_path.as_str()
        };
        let last_mod = ctx
            .pages
            .get(lookup_key)
            .and_then(|metadata| metadata.last_mod.clone())
            .unwrap_or_else(|| today.clone());
        let priority = if url_path.is_empty() { "1.0" } else { "0.8" };

        writer.write_event(Event::Start(BytesStart::new("url")))?;
        write_text_element(&mut writer, "loc", &loc)?;
        write_text_element(&mut writer, "lastmod", &last_mod)?;
        write_text_element(&mut writer, "priority", priority)?;
        writer.write_event(Event::End(BytesEnd::new("url")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("urlset")))?;

    let path = public_dir.join("sitemap.xml");
    fs::write(&path, writer.into_inner())
        .with_context(|| format!("failed to write '{}'", path.display()))?;
    info!(path = %path.display(), urls = html_files.len(), "sitemap written");
    Ok(path)
}

/// Writes an allow-all `public/robots.txt` pointing at the sitemap.
pub fn create_robots(ctx: &BuildContext) -> Result<PathBuf> {
    let base = parsed_base_url(&ctx.settings.base_url)?;
    let base = base.as_str().trim_end_matches('/');

    let robots = format!("User-agent: *\nAllow: /\nSitemap: {base}/sitemap.xml\n");
    let path = ctx.public_dir().join("robots.txt");
    fs::write(&path, robots).with_context(|| format!("failed to write '{}'", path.display()))?;
    info!(path = %path.display(), "robots.txt written");
    Ok(path)
}

fn parsed_base_url(raw: &str) -> Result<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        anyhow::bail!("base_url is not set in site.toml; required for sitemap and robots output");
    }
    Url::parse(raw).with_context(|| format!("base_url '{raw}' is not an absolute url"))
}

fn collect_html_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    let entries =
        fs::read_dir(dir).with_context(|| format!("failed to read '{}'", dir.display()))?;
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            if entry.file_name() == "node_modules" {
                continue;
            }
            collect_html_files(&path, files)?;
        } else if path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("html"))
        {
            files.push(path);
        }
    }
    Ok(())
}

fn write_text_element<W: Write>(writer: &mut Writer<W>, name: &str, text: &str) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use shared::{config::SiteSettings, pages::PageMetadata};
    use tempfile::TempDir;

    use super::*;
    use crate::BuildContext;

    fn built_site() -> (TempDir, BuildContext) {
        let dir = TempDir::new().expect("tempdir");
        let root = dir.path().to_path_buf();
        fs::create_dir_all(root.join("public/guides")).expect("public");
        fs::create_dir_all(root.join("public/node_modules/pkg")).expect("node_modules");
        fs::write(root.join("public/index.html"), "<p>home</p>").expect("file");
        fs::write(root.join("public/tip-calculator.html"), "<p>tip</p>").expect("file");
        fs::write(root.join("public/guides/mortgages.html"), "<p>guide</p>").expect("file");
        fs::write(root.join("public/node_modules/pkg/readme.html"), "x").expect("file");
        fs::write(root.join("public/styles.css"), "body{}").expect("file");

        let settings = SiteSettings {
            base_url: "https://calchub.example".into(),
            ..SiteSettings::default()
        };
        let ctx = BuildContext {
            root,
            settings,
            pages: Default::default(),
        };
        (dir, ctx)
    }

    #[test]
    fn sitemap_lists_pages_with_priorities() {
        let (_dir, ctx) = built_site();
        let path = create_sitemap(&ctx).expect("sitemap");
        let xml = fs::read_to_string(path).expect("read");

        assert!(xml.contains(r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">"#));
        assert!(xml.contains("<loc>https://calchub.example/</loc>"));
        assert!(xml.contains("<loc>https://calchub.example/tip-calculator</loc>"));
        assert!(xml.contains("<loc>https://calchub.example/guides/mortgages</loc>"));
        assert!(xml.contains("<priority>1.0</priority>"));
        assert!(xml.contains("<priority>0.8</priority>"));
    }

    #[test]
    fn node_modules_and_non_html_files_are_ignored() {
        let (_dir, ctx) = built_site();
        let path = create_sitemap(&ctx).expect("sitemap");
        let xml = fs::read_to_string(path).expect("read");

        assert!(!xml.contains("node_modules"));
        assert!(!xml.contains("styles.css"));
    }

    #[test]
    fn excluded_paths_are_dropped() {
        let (_dir, mut ctx) = built_site();
        ctx.settings.sitemap_exclude = vec!["guides/mortgages".into()];
        let path = create_sitemap(&ctx).expect("sitemap");
        let xml = fs::read_to_string(path).expect("read");

        assert!(!xml.contains("guides/mortgages"));
        assert!(xml.contains("tip-calculator"));
    }

    #[test]
    fn page_last_mod_overrides_todays_date() {
        let (_dir, mut ctx) = built_site();
        ctx.pages.insert(
            "tip-calculator".into(),
            PageMetadata {
                last_mod: Some("2024-11-02".into()),
                ..PageMetadata::default()
            },
        );
        let path = create_sitemap(&ctx).expect("sitemap");
        let xml = fs::read_to_string(path).expect("read");

        assert!(xml.contains("<lastmod>2024-11-02</lastmod>"));
    }

    #[test]
    fn robots_points_at_the_sitemap() {
        let (_dir, ctx) = built_site();
        let path = create_robots(&ctx).expect("robots");
        let robots = fs::read_to_string(path).expect("read");

        assert_eq!(
            robots,
            "User-agent: *\nAllow: /\nSitemap: https://calchub.example/sitemap.xml\n"
        );
    }

    #[test]
    fn missing_base_url_is_an_error() {
        let (_dir, mut ctx) = built_site();
        ctx.settings.base_url = String::new();
        assert!(create_sitemap(&ctx).is_err());
        assert!(create_robots(&ctx).is_err());
    }

    #[test]
    fn invalid_base_url_is_an_error() {
        let (_dir, mut ctx) = built_site();
        ctx.settings.base_url = "not a url".into();
        assert!(create_robots(&ctx).is_err());
    }
}
