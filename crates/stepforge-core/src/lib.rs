//! Core of StepForge: the model document session and the external POV-Ray
//! render coordinator used by the CLI and GUI front ends.

pub mod args;
pub mod coordinator;
pub mod error;
pub mod geom;
pub mod job;
pub mod open_with;
pub mod output;
pub mod paths;
pub mod prefs;
pub mod recent;
pub mod report;
pub mod request;
pub mod rotate;
pub mod session;
pub mod settings;
pub mod shm;
pub mod store;
pub mod strutil;
pub mod view;
pub mod watch;

pub use coordinator::{
    CancelPrompt, LdviewExporter, PollStatus, RenderContext, RenderCoordinator, SceneExporter,
    StartOutcome,
};
pub use error::{ConfigError, RenderError, SessionError};
pub use prefs::{Preferences, RenderQuality};
pub use request::{RenderRequest, RenderSettings};
pub use session::{DocumentSession, ModelStore, SaveChoice, SaveSender, SessionConfig, SessionPrompt};
pub use store::TextModelStore;
pub use view::StepView;
