use std::fs;

use anyhow::{Context, Result};
use minijinja::Environment;
use serde::Serialize;
use shared::pages::PageMetadata;
use tracing::{info, warn};

use crate::{minify, BuildContext, BuildReport};

/// Values every template render sees: the page's metadata entry flattened
/// next to the site-wide version and analytics flags.
#[derive(Serialize)]
struct PageContext<'a> {
    version: &'a str,
    enable_analytics: bool,
    #[serde(flatten)]
    metadata: &'a PageMetadata,
}

/// Template environment loading by name from `src/templates` first, then
/// `src/content`, so content pages can extend or include shared templates.
pub(crate) fn environment(ctx: &BuildContext) -> Environment<'static> {
    let templates_dir = ctx.templates_dir();
    let content_dir = ctx.content_dir();

    let mut env = Environment::new();
    env.set_loader(move |name| {
        if name.split('/').any(|segment| segment == "..") {
            return Ok(None);
        }
        for dir in [&templates_dir, &content_dir] {
            let path = dir.join(name);
            if path.is_file() {
                let source = fs::read_to_string(&path).map_err(|error| {
                    minijinja::Error::new(
                        minijinja::ErrorKind::InvalidOperation,
                        format!("failed to read template '{}': {error}", path.display()),
                    )
                })?;
                return Ok(Some(source));
            }
        }
        Ok(None)
    });
    env
}

/// Stems of the `*.html` files directly under `src/content`, sorted.
pub fn content_page_names(ctx: &BuildContext) -> Result<Vec<String>> {
    let content_dir = ctx.content_dir();
    let entries = fs::read_dir(&content_dir)
        .with_context(|| format!("failed to read content directory '{}'", content_dir.display()))?;

    let mut names = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        if path.extension().and_then(|ext| ext.to_str()) != Some("html") {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
            names.push(stem.to_string());
        }
    }
    names.sort();
    Ok(names)
}

/// Renders every content page into `public/`. A page that fails to render is
/// logged and skipped; the rest of the build continues.
pub fn render_pages(ctx: &BuildContext, report: &mut BuildReport) -> Result<()> {
    let env = environment(ctx);
    let public_dir = ctx.public_dir();
    fs::create_dir_all(&public_dir)
        .with_context(|| format!("failed to create '{}'", public_dir.display()))?;

    for name in content_page_names(ctx)? {
        let file_name = format!("{name}.html");

        let metadata = match ctx.pages.get(&name) {
            Some(metadata) => {
                let missing = metadata.missing_keys();
                if !missing.is_empty() {
                    let warning =
                        format!("metadata for '{name}' is missing: {}", missing.join(", "));
                    warn!("{warning}");
                    report.warnings.push(warning);
                }
                metadata.clone()
            }
            None => {
                let warning =
                    format!("no entry for '{name}' in pages.toml; rendering with default metadata");
                warn!("{warning}");
                report.warnings.push(warning);
                PageMetadata::default()
            }
        };

        let context = PageContext {
            version: &ctx.settings.version,
            enable_analytics: ctx.settings.enable_analytics,
            metadata: &metadata,
        };

        let rendered = env
            .get_template(&file_name)
            .and_then(|template| template.render(&context));
        let rendered = match rendered {
            Ok(rendered) => rendered,
            Err(error) => {
                let warning = format!("failed to render '{file_name}': {error}");
                warn!("{warning}");
                report.warnings.push(warning);
                continue;
            }
        };

        let output = if ctx.settings.minify_html {
            minify::minify_html(&rendered)
        } else {
            rendered
        };
        let output_path = public_dir.join(&file_name);
        fs::write(&output_path, output)
            .with_context(|| format!("failed to write '{}'", output_path.display()))?;
        info!(page = %file_name, minified = ctx.settings.minify_html, "rendered page");
        report.rendered.push(name);
    }

    Ok(())
}
