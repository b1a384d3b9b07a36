//! HLE kernel objects for oxidized-ctr
//!
//! The 3DS kernel exposes waitable objects to its services; this crate
//! implements the small subset the HLE services need: one-shot events
//! and launched-process bookkeeping.

pub mod event;
pub mod process;

pub use event::Event;
pub use process::{Process, ProcessId, ProcessManager};
