use std::{collections::BTreeMap, fs, path::Path};

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Per-page head metadata, read from `data/pages.toml` keyed by the content
/// file stem. Every key is optional; templates receive `None` values as
/// undefined and fall back to their own defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
    pub keywords: Option<String>,
    pub author: Option<String>,
    pub og_title: Option<String>,
    pub og_description: Option<String>,
    pub og_image: Option<String>,
    pub og_url: Option<String>,
    pub twitter_title: Option<String>,
    pub twitter_description: Option<String>,
    pub twitter_image: Option<String>,
    pub favicon: Option<String>,
    pub canonical_url: Option<String>,
    pub last_mod: Option<String>,
}

impl PageMetadata {
    /// Names of the metadata keys this entry leaves unset, in declaration
    /// order. Used for the per-page build warning.
    pub fn missing_keys(&self) -> Vec<&'static str> {
        macro_rules! collect_missing {
            ($($field:ident),+ $(,)?) => {{
                let mut missing = Vec::new();
                $(
                    if self.$field.is_none() {
                        missing.push(stringify!($field));
                    }
                )+
                missing
            }};
        }

        collect_missing!(
            title,
            description,
            keywords,
            author,
            og_title,
            og_description,
            og_image,
            og_url,
            twitter_title,
            twitter_description,
            twitter_image,
            favicon,
            canonical_url,
        )
    }
}

pub type PagesConfig = BTreeMap<String, PageMetadata>;

pub fn load_pages(root: &Path) -> PagesConfig {
    let path = root.join("data").join("pages.toml");
    let raw = match fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(_) => {
            warn!(path = %path.display(), "pages.toml not found; pages render with default metadata");
            return PagesConfig::new();
        }
    };

    match toml::from_str::<PagesConfig>(&raw) {
        Ok(pages) => pages,
        Err(error) => {
            warn!(path = %path.display(), %error, "failed to parse pages.toml; pages render with default metadata");
            PagesConfig::new()
        }
    }
}
