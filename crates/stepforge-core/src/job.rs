use crate::args::ArgList;
use crate::error::RenderError;
use crate::paths::RenderPaths;
use crate::request::RenderRequest;
use crate::shm::{Progress, SharedBuffer};
use image::RgbaImage;
use std::fs::File;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

/// Suppresses POV-Ray's banner about a missing system configuration file.
pub const POV_IGNORE_SYSCONF_MSG: &str = "POV_IGNORE_SYSCONF_MSG";

/// A running renderer process and the files that belong to it.
///
/// Dropping the job kills the process if it is still running, unmaps the
/// shared buffer and removes the buffer and scene files. The log file is kept
/// so it can be inspected after a failure.
#[derive(Debug)]
pub struct RenderJob {
    child: Child,
    started: Instant,
    paths: RenderPaths,
    buffer: Option<SharedBuffer>,
    request: RenderRequest,
}

impl RenderJob {
    pub fn spawn(
        program: &Path,
        args: &ArgList,
        paths: &RenderPaths,
        request: RenderRequest,
        started: Instant,
    ) -> Result<Self, RenderError> {
        std::fs::create_dir_all(&paths.tmp_dir)?;
        let log = File::create(&paths.log_file)?;
        let child = Command::new(program)
            .args(args.to_vec())
            .env(POV_IGNORE_SYSCONF_MSG, "1")
            .current_dir(&paths.tmp_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::from(log))
            .spawn()
            .map_err(|source| RenderError::Launch {
                program: program.to_path_buf(),
                source,
            })?;
        log::debug!("renderer started with pid {}", child.id());
        Ok(Self {
            child,
            started,
            paths: paths.clone(),
            buffer: None,
            request,
        })
    }

    pub fn request(&self) -> &RenderRequest {
        &self.request
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn try_exit(&mut self) -> Result<Option<ExitStatus>, RenderError> {
        Ok(self.child.try_wait()?)
    }

    /// Decodes newly written pixels, mapping the buffer on first use.
    /// `Ok(None)` while the renderer has not created the buffer yet.
    pub fn drain(&mut self, image: &mut Option<RgbaImage>) -> Result<Option<Progress>, RenderError> {
        if self.buffer.is_none() {
            self.buffer = SharedBuffer::open(&self.paths.map_file)?;
        }
        match self.buffer.as_mut() {
            Some(buffer) => buffer.drain_into(image).map(Some),
            None => Ok(None),
        }
    }

    pub fn kill(&mut self) -> Result<(), RenderError> {
        match self.child.kill() {
            Ok(()) => {}
            // Already exited.
            Err(err) if err.kind() == std::io::ErrorKind::InvalidInput => {}
            Err(err) => return Err(err.into()),
        }
        self.child.wait()?;
        Ok(())
    }

    /// Renderer diagnostics, or a description of why they are unavailable.
    pub fn read_log(&self) -> String {
        match std::fs::read_to_string(&self.paths.log_file) {
            Ok(log) => log,
            Err(err) => format!("Failed to open log file: {}:\n{err}", self.paths.log_file.display()),
        }
    }
}

impl Drop for RenderJob {
    fn drop(&mut self) {
        if let Ok(None) = self.child.try_wait() {
            if let Err(err) = self.kill() {
                log::warn!("failed to stop renderer: {err}");
            }
        }
        self.buffer = None;
        remove_temp_files(&self.paths);
    }
}

/// Removes the shared buffer and the generated scene file.
pub fn remove_temp_files(paths: &RenderPaths) {
    for path in [paths.map_file.clone(), paths.scene_file()] {
        remove_if_exists(&path);
    }
}

fn remove_if_exists(path: &Path) {
    if let Err(err) = std::fs::remove_file(path) {
        if err.kind() != std::io::ErrorKind::NotFound {
            log::warn!("could not remove {path:?}: {err}");
        }
    }
}
