//! HLE system services for oxidized-ctr
//!
//! This crate provides high-level emulations of the 3DS system modules.
//! The APT service (applet lifecycle and inter-applet messaging) lives in
//! the `apt` module.

pub mod apt;

pub use apt::AppletManager;
