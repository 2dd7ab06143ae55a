//! Line-oriented model store.
//!
//! Keeps the model text verbatim and answers the few structural questions the
//! session and the renderer ask. It does not interpret geometry.

use crate::error::SessionError;
use crate::session::ModelStore;
use crate::strutil::{find_ignore_ascii_case, starts_with_ignore_ascii_case};
use std::path::{Path, PathBuf};

const FILE_META: &str = "0 FILE ";

#[derive(Debug, Clone, Default)]
pub struct TextModelStore {
    path: Option<PathBuf>,
    lines: Vec<String>,
    sections: Vec<String>,
}

impl TextModelStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Names of the `0 FILE` sections of a multi-part document, in order.
    pub fn sub_file_order(&self) -> &[String] {
        &self.sections
    }

    pub fn set_lines(&mut self, lines: Vec<String>) {
        self.sections = section_names(&lines);
        self.lines = lines;
    }

    fn is_section(&self, name: &str) -> bool {
        self.sections.iter().any(|s| s.eq_ignore_ascii_case(name))
    }
}

fn section_names(lines: &[String]) -> Vec<String> {
    lines
        .iter()
        .map(|l| l.trim())
        .filter(|l| starts_with_ignore_ascii_case(l, FILE_META))
        .map(|l| l[FILE_META.len()..].trim().to_string())
        .collect()
}

fn is_part_line(line: &str) -> bool {
    line.split_whitespace().next() == Some("1")
}

/// Referenced file name of a type-1 line.
fn part_reference(line: &str) -> Option<String> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.first() != Some(&"1") || tokens.len() < 15 {
        return None;
    }
    Some(tokens[14..].join(" "))
}

impl ModelStore for TextModelStore {
    fn load(&mut self, path: &Path) -> Result<(), SessionError> {
        let text = std::fs::read_to_string(path)?;
        let lines: Vec<String> = text.lines().map(str::to_string).collect();
        if lines.iter().all(|l| l.trim().is_empty()) {
            return Err(SessionError::Load {
                path: path.to_path_buf(),
                message: "file is empty".to_string(),
            });
        }
        self.set_lines(lines);
        self.path = Some(path.to_path_buf());
        Ok(())
    }

    fn save(&self, path: &Path) -> Result<(), SessionError> {
        let mut text = self.lines.join("\n");
        text.push('\n');
        std::fs::write(path, text)?;
        Ok(())
    }

    fn clear(&mut self) {
        self.path = None;
        self.lines.clear();
        self.sections.clear();
    }

    fn part_count(&self) -> usize {
        self.lines.iter().filter(|l| is_part_line(l)).count()
    }

    fn top_level_file(&self) -> Option<String> {
        self.sections.first().cloned().or_else(|| {
            self.path
                .as_deref()
                .and_then(Path::file_name)
                .map(|n| n.to_string_lossy().into_owned())
        })
    }

    fn sub_file_paths(&self) -> Vec<PathBuf> {
        let Some(dir) = self.path.as_deref().and_then(Path::parent) else {
            return Vec::new();
        };
        let mut paths: Vec<PathBuf> = Vec::new();
        for name in self.lines.iter().filter_map(|l| part_reference(l)) {
            if self.is_section(&name) {
                continue;
            }
            let candidate = dir.join(name.replace('\\', "/"));
            if candidate.is_file() && !paths.contains(&candidate) {
                paths.push(candidate);
            }
        }
        paths
    }

    fn step_contents(&self) -> Vec<String> {
        if self.sections.is_empty() {
            return self.lines.clone();
        }
        let mut out = Vec::new();
        let mut seen_first = false;
        for line in &self.lines {
            if starts_with_ignore_ascii_case(line.trim(), FILE_META) {
                if seen_first {
                    break;
                }
                seen_first = true;
            }
            out.push(line.clone());
        }
        out
    }

    fn header_contains(&self, meta: &str) -> bool {
        self.lines
            .iter()
            .take_while(|l| !is_part_line(l))
            .any(|l| l.trim_start().starts_with('0') && find_ignore_ascii_case(l, meta).is_some())
    }
}
