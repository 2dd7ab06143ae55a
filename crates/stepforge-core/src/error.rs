use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("a render is already in progress")]
    Busy,

    #[error("no parts received for the current step")]
    EmptyStep,

    #[error("{program} executable is not configured")]
    NotConfigured { program: &'static str },

    #[error("unsupported output image format: {path:?} (expected .png, .bmp or .jpg)")]
    UnsupportedOutput { path: PathBuf },

    /// Scene generation failed; no renderer process was started.
    #[error("scene export failed: {message}")]
    Export { message: String },

    #[error("failed to start {program:?}: {source}")]
    Launch {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Abnormal exit, nonzero exit code or missing completion marker.
    /// `log` carries the renderer's diagnostic output verbatim.
    #[error("render error ({status}); see renderer log for details")]
    Renderer { status: String, log: String },

    /// The render itself succeeded but the final image could not be written.
    #[error("error writing to image file {path:?}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("shared buffer: {0}")]
    Buffer(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("file not supported: {path:?} (set the extension to .mpd, .ldr or .dat)")]
    UnsupportedExtension { path: PathBuf },

    #[error("unable to load file {path:?}: not found")]
    NotFound { path: PathBuf },

    #[error("no recent file at position {index}")]
    NoRecentFile { index: usize },

    #[error("no open-with program at position {index}")]
    NoOpenWithProgram { index: usize },

    #[error("no model file is open")]
    NoDocument,

    #[error("failed to launch {program:?}: {source}")]
    Launch {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("load of {path:?} aborted: {message}")]
    Load { path: PathBuf, message: String },

    #[error("settings: {0}")]
    Settings(#[from] serde_json::Error),

    #[error("file watcher: {0}")]
    Watch(#[from] notify::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read preferences {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse preferences {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid step view key {key:?}: {message}")]
    ViewKey { key: String, message: String },
}
