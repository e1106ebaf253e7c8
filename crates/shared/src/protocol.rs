use serde::{Deserialize, Serialize};

/// Events pushed to connected dev-server sockets.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum DevEvent {
    /// A rebuild finished; clients should refresh.
    Reload,
    /// A rebuild failed; the previous output keeps being served.
    BuildFailed { message: String },
}

/// One entry of the built page index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSummary {
    /// URL path of the page, e.g. `/tip-calculator` (`/` for the index).
    pub path: String,
    /// Display title, from page metadata or derived from the file stem.
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: String,
    pub pages: Vec<PageSummary>,
}
