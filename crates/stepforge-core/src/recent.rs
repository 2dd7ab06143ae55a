use std::path::{Path, PathBuf};

pub const DEFAULT_MAX_RECENT_FILES: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentEntry {
    pub path: PathBuf,
    /// Menu text, e.g. `&1 house.mpd`.
    pub label: String,
}

/// Most-recently-used model files, newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentFiles {
    files: Vec<PathBuf>,
    max: usize,
}

impl RecentFiles {
    pub fn new(files: Vec<PathBuf>, max: usize) -> Self {
        let mut recent = Self {
            files: Vec::new(),
            max: max.max(1),
        };
        for file in files.into_iter().rev() {
            recent.push(&file);
        }
        recent
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn first(&self) -> Option<&Path> {
        self.files.first().map(PathBuf::as_path)
    }

    pub fn get(&self, index: usize) -> Option<&Path> {
        self.files.get(index).map(PathBuf::as_path)
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Moves `path` to the front, dropping the oldest entries over the limit.
    pub fn push(&mut self, path: &Path) {
        if path.as_os_str().is_empty() {
            return;
        }
        self.files.retain(|f| !f.as_os_str().is_empty() && f != path);
        self.files.insert(0, path.to_path_buf());
        self.files.truncate(self.max);
    }

    /// Drops entries whose file no longer exists. Returns how many went.
    pub fn prune_missing(&mut self) -> usize {
        let before = self.files.len();
        self.files.retain(|f| f.is_file());
        before - self.files.len()
    }

    pub fn clear(&mut self) {
        self.files.clear();
    }

    pub fn entries(&self) -> Vec<RecentEntry> {
        self.files
            .iter()
            .enumerate()
            .map(|(i, path)| {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                RecentEntry {
                    path: path.clone(),
                    label: format!("&{} {name}", i + 1),
                }
            })
            .collect()
    }
}
