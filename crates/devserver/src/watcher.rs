//! Debounced file watching that drives rebuild-and-reload.

use std::{
    path::{Path, PathBuf},
    sync::{mpsc, Arc, RwLock},
    thread,
    time::Duration,
};

use anyhow::{Context, Result};
use notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{new_debouncer, DebouncedEvent, DebouncedEventKind, Debouncer};
use pipeline::{build_site, page_index, BuildContext};
use shared::protocol::{DevEvent, PageSummary};
use tokio::sync::broadcast;
use tracing::{error, info, warn};

/// Source extensions whose changes trigger a rebuild.
const WATCHED_EXTENSIONS: [&str; 5] = ["html", "css", "js", "md", "toml"];

const DEBOUNCE: Duration = Duration::from_secs(1);

/// Watches the site's source trees and rebuilds on change, broadcasting
/// `reload` on success and `build_failed` otherwise. The returned debouncer
/// must stay alive for watching to continue.
pub fn spawn_watcher(
    root: PathBuf,
    events: broadcast::Sender<DevEvent>,
    index: Arc<RwLock<Vec<PageSummary>>>,
) -> Result<Debouncer<RecommendedWatcher>> {
    let (tx, rx) = mpsc::channel();
    let mut debouncer = new_debouncer(DEBOUNCE, tx).context("failed to create file watcher")?;

    for dir in ["src", "assets", "data"] {
        let path = root.join(dir);
        if path.is_dir() {
            debouncer
                .watcher()
                .watch(&path, RecursiveMode::Recursive)
                .with_context(|| format!("failed to watch '{}'", path.display()))?;
            info!(path = %path.display(), "watching directory");
        }
    }
    for file in ["site.toml", "tailwind.config.js"] {
        let path = root.join(file);
        if path.is_file() {
            debouncer
                .watcher()
                .watch(&path, RecursiveMode::NonRecursive)
                .with_context(|| format!("failed to watch '{}'", path.display()))?;
            info!(path = %path.display(), "watching file");
        }
    }

    thread::spawn(move || watch_loop(root, rx, events, index));
    Ok(debouncer)
}

fn watch_loop(
    root: PathBuf,
    rx: mpsc::Receiver<std::result::Result<Vec<DebouncedEvent>, notify::Error>>,
    events: broadcast::Sender<DevEvent>,
    index: Arc<RwLock<Vec<PageSummary>>>,
) {
    while let Ok(result) = rx.recv() {
        match result {
            Ok(batch) => {
                let changed: Vec<PathBuf> = batch
                    .into_iter()
                    .filter(|event| {
                        event.kind == DebouncedEventKind::Any && is_relevant(&event.path)
                    })
                    .map(|event| event.path)
                    .collect();
                if changed.is_empty() {
                    continue;
                }
                info!(
                    files = changed.len(),
                    first = %changed[0].display(),
                    "change detected; rebuilding"
                );
                rebuild(&root, &events, &index);
            }
            Err(err) => warn!(%err, "file watcher error"),
        }
    }
}

fn is_relevant(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            WATCHED_EXTENSIONS
                .iter()
                .any(|watched| ext.eq_ignore_ascii_case(watched))
        })
}

fn rebuild(
    root: &Path,
    events: &broadcast::Sender<DevEvent>,
    index: &Arc<RwLock<Vec<PageSummary>>>,
) {
    let outcome = BuildContext::load(root.to_path_buf()).and_then(|ctx| {
        build_site(&ctx)?;
        page_index(&ctx)
    });

    match outcome {
        Ok(pages) => {
            if let Ok(mut guard) = index.write() {
                *guard = pages;
            }
            info!("rebuild complete; reload broadcast");
            let _ = events.send(DevEvent::Reload);
        }
        Err(err) => {
            error!(%err, "rebuild failed; keeping previous output");
            let _ = events.send(DevEvent::BuildFailed {
                message: err.to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_extensions_are_relevant() {
        assert!(is_relevant(Path::new("src/content/index.html")));
        assert!(is_relevant(Path::new("assets/css/styles.css")));
        assert!(is_relevant(Path::new("assets/js/script.js")));
        assert!(is_relevant(Path::new("site.toml")));
    }

    #[test]
    fn other_files_are_ignored() {
        assert!(!is_relevant(Path::new("assets/images/hero.png")));
        assert!(!is_relevant(Path::new("notes.txt")));
        assert!(!is_relevant(Path::new("Makefile")));
    }

    #[test]
    fn failed_rebuild_broadcasts_the_failure() {
        let (events, mut rx) = broadcast::channel(4);
        let index = Arc::new(RwLock::new(Vec::new()));

        // Not a site root: no src/content, so the rebuild fails.
        rebuild(Path::new("/definitely/not/a/site"), &events, &index);

        match rx.try_recv() {
            Ok(DevEvent::BuildFailed { message }) => {
                assert!(message.contains("src/content"));
            }
            other => panic!("expected BuildFailed, got {other:?}"),
        }
    }
}
