//! APT service - applet lifecycle and inter-applet messaging
//!
//! APT arbitrates between the foreground application, the Home Menu and
//! short-lived library applets. It owns four fixed execution slots, a
//! single-message mailbox used to pass control between them, and the
//! multi-step prepare/start/close protocols that launch, preempt, resume
//! and tear down applets.

pub mod mailbox;
pub mod manager;
pub mod runtime;
pub mod slot;
pub mod title;
pub mod types;

pub use manager::{AppletInfo, AppletManInfo, AppletManager, InitializeResult, LockHandle};
pub use runtime::{AppletRuntime, HleApplet, HleAppletFactory, SystemResetHandler, TitleLauncher};
pub use types::{
    AppletAttributes, AppletId, AppletPos, ApplicationJumpFlags, MediaType, MessageParameter,
    Notification, SignalType,
};
