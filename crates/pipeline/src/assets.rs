use std::{fs, path::Path, process::Command};

use anyhow::{Context, Result};
use tracing::{debug, error, info};

use crate::{minify, BuildContext};

/// Copies `assets/{images,icons,js}` into `public/`. JS files pass through
/// the minifier when `minify_js` is set; missing source directories are
/// skipped.
pub fn copy_static_files(ctx: &BuildContext) -> Result<()> {
    for dir in ["images", "icons"] {
        let src = ctx.assets_dir().join(dir);
        if !src.is_dir() {
            continue;
        }
        let dest = ctx.public_dir().join(dir);
        copy_dir_recursive(&src, &dest)?;
        info!(from = %src.display(), to = %dest.display(), "copied assets");
    }

    let js_src = ctx.assets_dir().join("js");
    if js_src.is_dir() {
        copy_js_files(&js_src, &ctx.public_dir().join("js"), ctx.settings.minify_js)?;
        info!(minified = ctx.settings.minify_js, "copied js assets");
    }

    Ok(())
}

fn copy_js_files(src: &Path, dest: &Path, minify_flag: bool) -> Result<()> {
    fs::create_dir_all(dest).with_context(|| format!("failed to create '{}'", dest.display()))?;

    let entries =
        fs::read_dir(src).with_context(|| format!("failed to read '{}'", src.display()))?;
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() || path.extension().and_then(|ext| ext.to_str()) != Some("js") {
            continue;
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed to read '{}'", path.display()))?;
        let content = if minify_flag {
            minify::minify_js(&content)
        } else {
            content
        };
        let target = dest.join(entry.file_name());
        fs::write(&target, content)
            .with_context(|| format!("failed to write '{}'", target.display()))?;
    }

    Ok(())
}

fn copy_dir_recursive(src: &Path, dest: &Path) -> Result<()> {
    fs::create_dir_all(dest).with_context(|| format!("failed to create '{}'", dest.display()))?;

    let entries =
        fs::read_dir(src).with_context(|| format!("failed to read '{}'", src.display()))?;
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        let target = dest.join(entry.file_name());
        if path.is_dir() {
            copy_dir_recursive(&path, &target)?;
        } else {
            fs::copy(&path, &target).with_context(|| {
                format!("failed to copy '{}' to '{}'", path.display(), target.display())
            })?;
        }
    }

    Ok(())
}

/// Invokes the external `tailwindcss` binary against the site's stylesheet.
/// Returns false when the step was skipped or the binary failed; the build
/// carries on either way, matching the tool's standalone usage.
pub fn build_css(ctx: &BuildContext) -> Result<bool> {
    let input = ctx.assets_dir().join("css").join("styles.css");
    if !input.is_file() {
        debug!("no assets/css/styles.css; skipping css build");
        return Ok(false);
    }

    let public_dir = ctx.public_dir();
    fs::create_dir_all(&public_dir)
        .with_context(|| format!("failed to create '{}'", public_dir.display()))?;
    let output = public_dir.join("styles.css");
    let config = ctx.root.join("tailwind.config.js");

    let status = Command::new("tailwindcss")
        .arg("-i")
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .arg("-c")
        .arg(&config)
        .arg("--minify")
        .status();

    match status {
        Ok(status) if status.success() => {
            info!(output = %output.display(), "css built");
            Ok(true)
        }
        Ok(status) => {
            error!(%status, "tailwindcss exited with failure");
            Ok(false)
        }
        Err(err) => {
            error!(%err, "failed to run tailwindcss; is it on PATH?");
            Ok(false)
        }
    }
}
