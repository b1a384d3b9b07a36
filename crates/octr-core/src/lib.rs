//! Core types for the oxidized-ctr 3DS emulator
//!
//! This crate provides the foundational types, error handling and
//! configuration infrastructure shared by the emulator crates.

pub mod config;
pub mod error;
pub mod logging;

pub use config::{Config, Region, SystemConfig};
pub use error::{AptError, EmulatorError, KernelError, LaunchError, Result};
