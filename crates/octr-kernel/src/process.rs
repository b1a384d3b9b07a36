//! Launched-process bookkeeping

use octr_core::error::KernelError;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Process ID type
pub type ProcessId = u32;

/// Process state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Running,
    Terminated,
}

/// Handle to a launched title
///
/// Services hold these to keep track of which program image backs an
/// execution slot; dropping the last handle does not terminate the
/// process, termination is explicit.
pub struct Process {
    pid: ProcessId,
    title_id: u64,
    state: Mutex<ProcessState>,
}

impl Process {
    pub fn new(pid: ProcessId, title_id: u64) -> Self {
        Self {
            pid,
            title_id,
            state: Mutex::new(ProcessState::Running),
        }
    }

    pub fn pid(&self) -> ProcessId {
        self.pid
    }

    pub fn title_id(&self) -> u64 {
        self.title_id
    }

    pub fn state(&self) -> ProcessState {
        *self.state.lock()
    }

    pub fn terminate(&self) {
        *self.state.lock() = ProcessState::Terminated;
        tracing::info!("Process {} (title 0x{:016X}) terminated", self.pid, self.title_id);
    }
}

impl std::fmt::Debug for Process {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Process")
            .field("pid", &self.pid)
            .field("title_id", &format_args!("{:#018X}", self.title_id))
            .field("state", &self.state())
            .finish()
    }
}

/// Allocates process ids and tracks launched titles
pub struct ProcessManager {
    next_pid: AtomicU32,
    processes: Mutex<Vec<Arc<Process>>>,
}

impl ProcessManager {
    pub fn new() -> Self {
        Self {
            // pid 0 is reserved for the kernel itself
            next_pid: AtomicU32::new(1),
            processes: Mutex::new(Vec::new()),
        }
    }

    /// Create and register a process for a launched title
    pub fn spawn(&self, title_id: u64) -> Arc<Process> {
        let pid = self.next_pid.fetch_add(1, Ordering::Relaxed);
        let process = Arc::new(Process::new(pid, title_id));
        self.processes.lock().push(Arc::clone(&process));
        tracing::debug!("Spawned process {} for title 0x{:016X}", pid, title_id);
        process
    }

    pub fn get(&self, pid: ProcessId) -> Result<Arc<Process>, KernelError> {
        self.processes
            .lock()
            .iter()
            .find(|p| p.pid() == pid)
            .cloned()
            .ok_or(KernelError::InvalidHandle(pid))
    }

    pub fn running_count(&self) -> usize {
        self.processes
            .lock()
            .iter()
            .filter(|p| p.state() == ProcessState::Running)
            .count()
    }
}

impl Default for ProcessManager {
    fn default() -> Self {
        Self::new()
    }
}
