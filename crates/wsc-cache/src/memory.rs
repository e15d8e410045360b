use std::sync::Mutex;
use std::sync::PoisonError;

use sysinfo::Pid;
use sysinfo::System;

/// Source of process memory usage for pressure eviction.
pub trait MemoryProbe: Send + Sync + 'static {
    /// Resident memory of the process, if it can be measured.
    fn resident_bytes(&self) -> Option<u64>;

    /// Best-effort request to hand freed memory back to the OS.
    fn reclaim(&self) {}
}

/// Measures the current process through `sysinfo`.
pub struct ProcessMemory {
    pid: Option<Pid>,
    system: Mutex<System>,
}

impl std::fmt::Debug for ProcessMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessMemory")
            .field("pid", &self.pid)
            .finish_non_exhaustive()
    }
}

impl ProcessMemory {
    #[must_use]
    pub fn new() -> Self {
        let pid = match sysinfo::get_current_pid() {
            Ok(pid) => Some(pid),
            Err(err) => {
                tracing::warn!("Process memory is unavailable on this platform: {err}");
                None
            }
        };
        Self {
            pid,
            system: Mutex::new(System::new()),
        }
    }
}

impl Default for ProcessMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProbe for ProcessMemory {
    fn resident_bytes(&self) -> Option<u64> {
        let pid = self.pid?;
        let mut system = self.system.lock().unwrap_or_else(PoisonError::into_inner);
        if !system.refresh_process(pid) {
            tracing::debug!("Failed to refresh memory usage for pid {pid}");
            return None;
        }
        system.process(pid).map(sysinfo::Process::memory)
    }

    fn reclaim(&self) {
        #[cfg(all(target_os = "linux", target_env = "gnu"))]
        {
            // SAFETY: `malloc_trim` only releases free heap pages; it has no
            // preconditions beyond running in a glibc process.
            let released = unsafe { libc::malloc_trim(0) };
            tracing::debug!(released = released != 0, "Trimmed allocator heap");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn measures_current_process() {
        let probe = ProcessMemory::new();
        if let Some(bytes) = probe.resident_bytes() {
            assert!(bytes > 0);
        }
        probe.reclaim();
    }
}
