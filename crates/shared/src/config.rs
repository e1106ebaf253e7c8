use std::{env, fs, path::Path};

use serde::Deserialize;
use tracing::warn;

/// Site-wide settings, read from `site.toml` at the site root.
///
/// Every field has a default so a missing or partial file still produces a
/// usable configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SiteSettings {
    pub base_url: String,
    pub version: String,
    pub enable_analytics: bool,
    pub minify_html: bool,
    pub minify_js: bool,
    pub generate_sitemap: bool,
    pub generate_robots: bool,
    pub sitemap_exclude: Vec<String>,
    pub dev_bind: String,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            version: "1.0.0".into(),
            enable_analytics: false,
            minify_html: false,
            minify_js: false,
            generate_sitemap: false,
            generate_robots: false,
            sitemap_exclude: Vec::new(),
            dev_bind: "127.0.0.1:8000".into(),
        }
    }
}

pub fn load_settings(root: &Path) -> SiteSettings {
    let mut settings = SiteSettings::default();
    apply_file(&mut settings, root);
    apply_env(&mut settings);
    settings
}

fn apply_file(settings: &mut SiteSettings, root: &Path) {
    let path = root.join("site.toml");
    let raw = match fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(_) => {
            warn!(path = %path.display(), "site.toml not found; using default settings");
            return;
        }
    };

    match toml::from_str::<SiteSettings>(&raw) {
        Ok(parsed) => *settings = parsed,
        Err(error) => {
            warn!(path = %path.display(), %error, "failed to parse site.toml; using default settings");
        }
    }
}

fn apply_env(settings: &mut SiteSettings) {
    if let Ok(v) = env::var("SITE__BASE_URL") {
        settings.base_url = v;
    }
    if let Ok(v) = env::var("SITE__DEV_BIND") {
        settings.dev_bind = v;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_file_is_absent() {
        let settings = load_settings(Path::new("/definitely/not/a/site/root"));
        assert_eq!(settings.version, "1.0.0");
        assert_eq!(settings.dev_bind, "127.0.0.1:8000");
        assert!(!settings.minify_html);
        assert!(settings.sitemap_exclude.is_empty());
    }

    #[test]
    fn partial_file_keeps_defaults_for_missing_keys() {
        let parsed: SiteSettings = toml::from_str(
            r#"
            base_url = "https://calchub.example"
            minify_html = true
            sitemap_exclude = ["drafts/wip"]
            "#,
        )
        .expect("parse");
        assert_eq!(parsed.base_url, "https://calchub.example");
        assert!(parsed.minify_html);
        assert!(!parsed.minify_js);
        assert_eq!(parsed.version, "1.0.0");
        assert_eq!(parsed.sitemap_exclude, vec!["drafts/wip".to_string()]);
    }
}
