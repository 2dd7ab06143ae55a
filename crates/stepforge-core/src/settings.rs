use crate::error::SessionError;
use crate::open_with::OpenWithProgram;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Session state persisted between runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub recent_files: Vec<PathBuf>,
    pub projects_path: Option<PathBuf>,
    /// Page to show after the next `load_file`; removed once used.
    pub saved_display_page: Option<u32>,
    pub open_with_programs: Vec<OpenWithProgram>,
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self, SessionError> {
        match std::fs::read_to_string(path) {
            Ok(json) => Ok(serde_json::from_str(&json)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(err.into()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), SessionError> {
        let json = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, json)?;
        Ok(())
    }
}
