use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver};

/// Reports external changes to the files of the open document.
pub struct ChangeWatcher {
    watcher: RecommendedWatcher,
    rx: Receiver<notify::Result<Event>>,
    watched: Vec<PathBuf>,
}

impl ChangeWatcher {
    pub fn new() -> notify::Result<Self> {
        let (tx, rx) = channel();
        let watcher = notify::recommended_watcher(tx)?;
        Ok(Self {
            watcher,
            rx,
            watched: Vec::new(),
        })
    }

    pub fn watch(&mut self, path: &Path) -> notify::Result<()> {
        if self.watched.iter().any(|p| p == path) {
            return Ok(());
        }
        self.watcher.watch(path, RecursiveMode::NonRecursive)?;
        self.watched.push(path.to_path_buf());
        Ok(())
    }

    /// Stops watching everything. Pending events are dropped.
    pub fn unwatch_all(&mut self) {
        for path in self.watched.drain(..) {
            if let Err(err) = self.watcher.unwatch(&path) {
                log::debug!("unwatch {path:?}: {err}");
            }
        }
        self.discard_pending();
    }

    pub fn watched(&self) -> &[PathBuf] {
        &self.watched
    }

    /// Changed watched paths since the last call, without duplicates.
    pub fn poll(&mut self) -> Vec<PathBuf> {
        let mut changed: Vec<PathBuf> = Vec::new();
        while let Ok(res) = self.rx.try_recv() {
            let event = match res {
                Ok(event) => event,
                Err(err) => {
                    log::warn!("file watcher: {err}");
                    continue;
                }
            };
            if !matches!(
                event.kind,
                EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_)
            ) {
                continue;
            }
            for path in event.paths {
                if !changed.contains(&path) {
                    changed.push(path);
                }
            }
        }
        changed
    }

    pub fn discard_pending(&mut self) {
        while self.rx.try_recv().is_ok() {}
    }
}
