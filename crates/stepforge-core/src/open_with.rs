//! External programs the open document can be handed to.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

pub const DEFAULT_MAX_OPEN_WITH_PROGRAMS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenWithProgram {
    /// Menu text; empty means the executable's file name is shown.
    #[serde(default)]
    pub name: String,
    pub path: PathBuf,
}

impl OpenWithProgram {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    /// Starts the program on `file` without waiting for it. Returns its pid.
    pub fn launch(&self, file: &Path) -> std::io::Result<u32> {
        let child = Command::new(&self.path)
            .arg(file)
            .current_dir(std::env::current_dir()?)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        Ok(child.id())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenWithEntry {
    pub program: OpenWithProgram,
    pub label: String,
}

/// Configured "Open With" programs, in menu order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenWithPrograms {
    programs: Vec<OpenWithProgram>,
    max: usize,
}

impl OpenWithPrograms {
    pub fn new(mut programs: Vec<OpenWithProgram>, max: usize) -> Self {
        programs.truncate(max);
        Self { programs, max }
    }

    pub fn programs(&self) -> &[OpenWithProgram] {
        &self.programs
    }

    pub fn get(&self, index: usize) -> Option<&OpenWithProgram> {
        self.programs.get(index)
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    /// Appends `program`, replacing an entry with the same path. Returns
    /// `false` when the list is full.
    pub fn add(&mut self, program: OpenWithProgram) -> bool {
        if let Some(existing) = self.programs.iter_mut().find(|p| p.path == program.path) {
            *existing = program;
            return true;
        }
        if self.programs.len() >= self.max {
            return false;
        }
        self.programs.push(program);
        true
    }

    pub fn remove(&mut self, index: usize) -> Option<OpenWithProgram> {
        (index < self.programs.len()).then(|| self.programs.remove(index))
    }

    /// Drops programs whose executable no longer exists. Returns how many went.
    pub fn prune_missing(&mut self) -> usize {
        let before = self.programs.len();
        self.programs.retain(|p| p.path.exists());
        before - self.programs.len()
    }

    pub fn entries(&self) -> Vec<OpenWithEntry> {
        self.programs
            .iter()
            .enumerate()
            .map(|(i, program)| {
                let label = if program.name.is_empty() {
                    let file = program
                        .path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| program.path.display().to_string());
                    format!("&{} {file}", i + 1)
                } else {
                    program.name.clone()
                };
                OpenWithEntry {
                    program: program.clone(),
                    label,
                }
            })
            .collect()
    }
}
