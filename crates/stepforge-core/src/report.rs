use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderReport {
    pub output: PathBuf,
    pub width: u32,
    pub height: u32,
    pub auto_cropped: bool,
    pub elapsed_ms: u64,
    pub elapsed: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadReport {
    pub file: PathBuf,
    pub part_count: usize,
    pub fade_steps: bool,
    pub highlight_step: bool,
    pub elapsed_ms: u64,
    pub elapsed: String,
}

/// Human readable duration, e.g. `Elapsed time: 1 minute 2.050 seconds`.
pub fn elapsed_time(duration: Duration) -> String {
    let mut elapsed = duration.as_millis();
    let milliseconds = elapsed % 1000;
    elapsed /= 1000;
    let seconds = elapsed % 60;
    elapsed /= 60;
    let minutes = elapsed % 60;
    elapsed /= 60;
    let hours = elapsed % 24;

    let mut out = String::from("Elapsed time: ");
    if hours > 0 {
        out.push_str(&format!("{hours} {} ", if hours > 1 { "hours" } else { "hour" }));
    }
    if minutes > 0 {
        out.push_str(&format!(
            "{minutes} {} ",
            if minutes > 1 { "minutes" } else { "minute" }
        ));
    }
    out.push_str(&format!(
        "{seconds}.{milliseconds:03} {}",
        if seconds > 1 { "seconds" } else { "second" }
    ));
    out
}
