//! Applet execution backends and external collaborators
//!
//! An applet slot is backed either by a native title running as its own
//! process or by an in-process simulated (HLE) applet used when no
//! native title is installed. Delivery and teardown dispatch on the
//! `AppletRuntime` tag.

use crate::apt::types::{AppletId, MediaType, MessageParameter, SharedObject};
use octr_core::error::{AptError, LaunchError};
use octr_kernel::process::Process;
use std::path::PathBuf;
use std::sync::Arc;

/// What actually executes behind an applet slot
#[derive(Clone)]
pub enum AppletRuntime {
    /// A real loadable title, launched as a separate process
    Native(Arc<Process>),
    /// An in-process simulated applet
    Simulated(Arc<dyn HleApplet>),
}

impl std::fmt::Debug for AppletRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Native(process) => f.debug_tuple("Native").field(process).finish(),
            Self::Simulated(_) => f.debug_tuple("Simulated").finish(),
        }
    }
}

/// An in-process simulated applet instance
pub trait HleApplet: Send + Sync {
    /// Synchronous delivery of a mailbox parameter
    fn receive_parameter(&self, parameter: &MessageParameter) -> Result<(), AptError>;

    /// Begin execution with the startup payload
    fn start(&self, object: Option<SharedObject>, buffer: &[u8]) -> Result<(), AptError>;
}

/// Creates simulated applets when no native title is available
pub trait HleAppletFactory: Send + Sync {
    fn create(
        &self,
        applet_id: AppletId,
        parent: Option<AppletId>,
        preload: bool,
    ) -> Result<Arc<dyn HleApplet>, AptError>;
}

/// Loads and starts native titles
pub trait TitleLauncher: Send + Sync {
    fn launch_title(&self, media: MediaType, title_id: u64) -> Result<Arc<Process>, LaunchError>;

    /// Install path of a title's content, if it can be determined
    fn content_path(&self, media: MediaType, title_id: u64) -> Option<PathBuf>;
}

/// Receives system reset and shutdown requests
///
/// APT never performs the reset itself; application jumps and fatal
/// launch failures are surfaced here.
pub trait SystemResetHandler: Send + Sync {
    fn request_reset(&self, next_title: Option<PathBuf>);
    fn request_shutdown(&self);
}
