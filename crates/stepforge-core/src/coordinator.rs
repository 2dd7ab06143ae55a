//! Drives one external render from scene export to the final image.
//!
//! The coordinator is polled from a single event loop every
//! [`POLL_INTERVAL`]; nothing here blocks on the renderer except process
//! start-up.

use crate::args::{exporter_args, renderer_args, ArgList};
use crate::error::RenderError;
use crate::job::{remove_temp_files, RenderJob};
use crate::output::{write_image, OutputFormat};
use crate::paths::RenderPaths;
use crate::prefs::Preferences;
use crate::report::{elapsed_time, RenderReport};
use crate::request::RenderRequest;
use crate::rotate::write_rotated_parts;
use crate::shm::Progress;
use image::RgbaImage;
use std::path::Path;
use std::process::{Command, ExitStatus};
use std::time::{Duration, Instant};

pub const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Line POV-Ray writes to its diagnostic stream after a complete render.
pub const COMPLETION_MARKER: &str = "POV-Ray finished";

/// Produces the scene description file from the rotated step model.
pub trait SceneExporter {
    fn export(&self, program: &Path, args: &ArgList, paths: &RenderPaths) -> Result<(), RenderError>;
}

/// Runs LDView to completion and checks that the scene file exists.
#[derive(Debug, Clone, Copy, Default)]
pub struct LdviewExporter;

impl SceneExporter for LdviewExporter {
    fn export(&self, program: &Path, args: &ArgList, paths: &RenderPaths) -> Result<(), RenderError> {
        let output = Command::new(program)
            .args(args.to_vec())
            .current_dir(&paths.work_dir)
            .output()
            .map_err(|e| RenderError::Export {
                message: format!("failed to run {}: {e}", program.display()),
            })?;
        if !output.status.success() {
            return Err(RenderError::Export {
                message: format!(
                    "{} exited with {}: {}",
                    program.display(),
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }
        let scene = paths.scene_file();
        if !scene.is_file() {
            return Err(RenderError::Export {
                message: format!("{} did not produce {}", program.display(), scene.display()),
            });
        }
        Ok(())
    }
}

/// Asks the user whether a running render should be cancelled.
pub trait CancelPrompt {
    fn confirm_cancel(&mut self) -> bool;
}

/// Configuration a coordinator is constructed with.
#[derive(Debug, Clone)]
pub struct RenderContext {
    pub prefs: Preferences,
    pub paths: RenderPaths,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    /// A render was already running; the user was asked to cancel it.
    CancelPrompted { cancelled: bool },
}

#[derive(Debug, Clone)]
pub enum PollStatus {
    Idle,
    Running(Progress),
    Finished(RenderReport),
}

/// Classifies a finished renderer process. Success needs a normal exit, exit
/// code zero and the completion marker in the log.
pub fn evaluate_exit(code: Option<i32>, log: &str) -> Result<(), RenderError> {
    let finished = log.lines().any(|line| line.trim_end() == COMPLETION_MARKER);
    let status = match code {
        None => "abnormal exit".to_string(),
        Some(0) if finished => return Ok(()),
        Some(0) => "completion marker missing".to_string(),
        Some(code) => format!("exit code {code}"),
    };
    Err(RenderError::Renderer {
        status,
        log: log.to_string(),
    })
}

pub struct RenderCoordinator<E = LdviewExporter> {
    ctx: RenderContext,
    exporter: E,
    job: Option<RenderJob>,
    image: Option<RgbaImage>,
    progress: Progress,
    last_poll: Option<Instant>,
}

impl<E: SceneExporter> RenderCoordinator<E> {
    pub fn new(ctx: RenderContext, exporter: E) -> Self {
        Self {
            ctx,
            exporter,
            job: None,
            image: None,
            progress: Progress::default(),
            last_poll: None,
        }
    }

    pub fn context(&self) -> &RenderContext {
        &self.ctx
    }

    pub fn set_context(&mut self, ctx: RenderContext) -> Result<(), RenderError> {
        if self.job.is_some() {
            return Err(RenderError::Busy);
        }
        self.ctx = ctx;
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.job.is_some()
    }

    /// Image decoded so far, kept after the job ends for display.
    pub fn image(&self) -> Option<&RgbaImage> {
        self.image.as_ref()
    }

    pub fn progress(&self) -> Progress {
        self.progress
    }

    pub fn elapsed(&self) -> Option<Duration> {
        self.job.as_ref().map(RenderJob::elapsed)
    }

    /// Whether a poll is due at `now` under the fixed interval.
    pub fn poll_due(&self, now: Instant) -> bool {
        match self.last_poll {
            Some(last) => now.duration_since(last) >= POLL_INTERVAL,
            None => true,
        }
    }

    /// Starts a render, or offers to cancel the one in progress.
    pub fn request_render(
        &mut self,
        request: &RenderRequest,
        parts: &[String],
        prompt: &mut dyn CancelPrompt,
    ) -> Result<StartOutcome, RenderError> {
        if self.job.is_some() {
            let cancelled = self.prompt_cancel(prompt)?;
            return Ok(StartOutcome::CancelPrompted { cancelled });
        }
        self.start(request, parts)?;
        Ok(StartOutcome::Started)
    }

    pub fn start(&mut self, request: &RenderRequest, parts: &[String]) -> Result<(), RenderError> {
        if self.job.is_some() {
            return Err(RenderError::Busy);
        }
        if parts.is_empty() {
            return Err(RenderError::EmptyStep);
        }
        if OutputFormat::from_path(&request.output).is_none() {
            return Err(RenderError::UnsupportedOutput {
                path: request.output.clone(),
            });
        }
        let prefs = &self.ctx.prefs;
        let paths = &self.ctx.paths;
        let ldview = prefs
            .ldview_exe
            .clone()
            .ok_or(RenderError::NotConfigured { program: "LDView" })?;
        let povray = prefs
            .povray_exe
            .clone()
            .ok_or(RenderError::NotConfigured { program: "POV-Ray" })?;

        let started = Instant::now();
        self.image = None;
        self.progress = Progress::default();
        self.last_poll = None;

        std::fs::create_dir_all(&paths.tmp_dir)?;
        // A buffer left behind by an earlier run would be decoded as ours.
        remove_temp_files(paths);

        let model_file = paths.model_file();
        let camera = request.apply_camera_locally.then_some(&request.camera);
        let count = write_rotated_parts(parts, &model_file, &request.rotstep, camera).map_err(|e| {
            RenderError::Export {
                message: format!("write {}: {e}", model_file.display()),
            }
        })?;
        log::debug!("wrote {count} lines to {model_file:?}");

        let args = exporter_args(request, prefs, paths);
        log::info!("LDV POV file generation arguments: {} {args}", ldview.display());
        if let Err(err) = self.exporter.export(&ldview, &args, paths) {
            remove_temp_files(paths);
            return Err(err);
        }
        log::info!(
            "LDV POV file {} generated. {}",
            paths.scene_file().display(),
            elapsed_time(started.elapsed())
        );

        let args = renderer_args(request, prefs, paths);
        log::info!("POV-Ray render arguments: {} {args}", povray.display());
        match RenderJob::spawn(&povray, &args, paths, request.clone(), started) {
            Ok(job) => {
                self.job = Some(job);
                Ok(())
            }
            Err(err) => {
                log::error!("error starting POV-Ray: {err}");
                remove_temp_files(paths);
                Err(err)
            }
        }
    }

    /// Asks before cancelling. Returns `true` when no render is left running.
    pub fn prompt_cancel(&mut self, prompt: &mut dyn CancelPrompt) -> Result<bool, RenderError> {
        if self.job.is_none() {
            return Ok(true);
        }
        if !prompt.confirm_cancel() {
            return Ok(false);
        }
        self.cancel()?;
        Ok(true)
    }

    /// Kills the renderer and removes its temporary files. No output is
    /// written.
    pub fn cancel(&mut self) -> Result<(), RenderError> {
        let Some(mut job) = self.job.take() else {
            return Ok(());
        };
        log::info!("render cancelled. {}", elapsed_time(job.elapsed()));
        job.kill()
    }

    pub fn poll(&mut self) -> Result<PollStatus, RenderError> {
        self.last_poll = Some(Instant::now());
        let exited = match self.job.as_mut() {
            Some(job) => job.try_exit(),
            None => return Ok(PollStatus::Idle),
        };
        match exited {
            Ok(Some(status)) => self.finish(status),
            Ok(None) => {
                let drained = match self.job.as_mut() {
                    Some(job) => job.drain(&mut self.image),
                    None => return Ok(PollStatus::Idle),
                };
                match drained {
                    Ok(Some(progress)) => {
                        self.progress = progress;
                        Ok(PollStatus::Running(progress))
                    }
                    Ok(None) => Ok(PollStatus::Running(self.progress)),
                    Err(err) => {
                        self.job = None;
                        Err(err)
                    }
                }
            }
            Err(err) => {
                self.job = None;
                Err(err)
            }
        }
    }

    fn finish(&mut self, status: ExitStatus) -> Result<PollStatus, RenderError> {
        let Some(mut job) = self.job.take() else {
            return Ok(PollStatus::Idle);
        };
        match job.drain(&mut self.image) {
            Ok(Some(progress)) => self.progress = progress,
            Ok(None) => {}
            Err(err) => log::warn!("could not decode final pixels: {err}"),
        }
        let log = job.read_log();
        let elapsed = job.elapsed();
        let request = job.request().clone();
        drop(job);

        evaluate_exit(status.code(), &log)?;

        let Some(image) = self.image.as_ref() else {
            return Err(RenderError::Buffer("renderer produced no image".to_string()));
        };
        log::info!("Writing POV-Ray rendered image {}...", request.output.display());
        write_image(image, &request.output, request.auto_crop)?;
        log::info!(
            "POV-Ray CSI render generated {}. {}",
            request.output.display(),
            elapsed_time(elapsed)
        );
        Ok(PollStatus::Finished(RenderReport {
            output: request.output,
            width: image.width(),
            height: image.height(),
            auto_cropped: request.auto_crop,
            elapsed_ms: elapsed.as_millis() as u64,
            elapsed: elapsed_time(elapsed),
        }))
    }
}

impl<E> Drop for RenderCoordinator<E> {
    fn drop(&mut self) {
        if self.job.take().is_some() {
            log::warn!("render dialog closed with a render in progress; renderer stopped");
        }
    }
}
