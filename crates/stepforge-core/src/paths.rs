use std::path::{Path, PathBuf};

pub const TMP_DIR: &str = "tmp";
pub const RENDER_MODEL_FILE: &str = "csipovray.ldr";
pub const RENDER_MAP_FILE: &str = "stepforge-render-map.out";
pub const RENDER_LOG_FILE: &str = "stderr-povrayrender";

/// File locations used by one render dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderPaths {
    /// Directory of the open model.
    pub work_dir: PathBuf,
    /// Renderer working directory; POV-Ray will not write outside it.
    pub tmp_dir: PathBuf,
    /// Shared progress buffer written by the renderer.
    pub map_file: PathBuf,
    pub log_file: PathBuf,
}

impl RenderPaths {
    pub fn new(work_dir: &Path) -> Self {
        Self {
            work_dir: work_dir.to_path_buf(),
            tmp_dir: work_dir.join(TMP_DIR),
            map_file: std::env::temp_dir().join(RENDER_MAP_FILE),
            log_file: work_dir.join(RENDER_LOG_FILE),
        }
    }

    /// Rotated step parts handed to the exporter.
    pub fn model_file(&self) -> PathBuf {
        self.tmp_dir.join(RENDER_MODEL_FILE)
    }

    /// Scene description produced by the exporter.
    pub fn scene_file(&self) -> PathBuf {
        let mut name = self.model_file().into_os_string();
        name.push(".pov");
        PathBuf::from(name)
    }
}
