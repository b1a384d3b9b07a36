//! Error types for the oxidized-ctr emulator

use thiserror::Error;

/// Main error type for the emulator
#[derive(Error, Debug)]
pub enum EmulatorError {
    #[error("Kernel error: {0}")]
    Kernel(#[from] KernelError),

    #[error("APT error: {0}")]
    Apt(#[from] AptError),

    #[error("Launch error: {0}")]
    Launch(#[from] LaunchError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),
}

/// Kernel (HLE object) errors
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelError {
    #[error("Invalid handle: {0}")]
    InvalidHandle(u32),

    #[error("Would block")]
    WouldBlock,

    #[error("Timeout")]
    Timeout,
}

/// APT (applet service) errors
///
/// These map to the result codes the real APT module hands back to its
/// clients. All of them are recoverable from the caller's point of view
/// except `NotSupported`, which accompanies a system shutdown request.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AptError {
    /// A parameter is already in flight and has not been consumed yet.
    #[error("A parameter is already present in the mailbox")]
    ParameterPresent,

    /// The target applet slot is already registered.
    #[error("Applet slot is already registered")]
    AlreadyExists,

    /// The supplied attributes or applet id do not resolve to a slot.
    #[error("Invalid applet slot")]
    InvalidAppletSlot,

    /// The requested applet is not present.
    #[error("Applet not found")]
    NotFound,

    /// No parameter is queued for the requesting applet.
    #[error("No parameter data available")]
    NoData,

    /// A native title is required but could not be launched.
    #[error("Native title not available")]
    NotSupported,
}

/// Title launch errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LaunchError {
    #[error("Title 0x{0:016X} is not installed")]
    TitleNotFound(u64),

    #[error("Media is not present")]
    MediaNotPresent,

    #[error("Title image is corrupted: {0}")]
    CorruptedTitle(String),
}

pub type Result<T> = std::result::Result<T, EmulatorError>;
