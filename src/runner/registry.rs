// src/runner/registry.rs — Live process-group registry
//
// Every trial child is registered for the lifetime of its run so an
// external interrupt can take all of them down at once. Workers insert and
// remove concurrently, so the set sits behind a mutex.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

/// Shared set of live trial process ids. Each id is also its process-group id.
#[derive(Debug, Clone, Default)]
pub struct ProcessRegistry {
    pids: Arc<Mutex<HashSet<u32>>>,
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // A panicking worker must not wedge cleanup for everyone else.
    fn lock(&self) -> MutexGuard<'_, HashSet<u32>> {
        self.pids.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn register(&self, pid: u32) {
        self.lock().insert(pid);
    }

    pub fn unregister(&self, pid: u32) {
        self.lock().remove(&pid);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn contains(&self, pid: u32) -> bool {
        self.lock().contains(&pid)
    }

    /// Kill every registered process group. Returns how many were signalled.
    pub fn kill_all(&self) -> usize {
        let pids: Vec<u32> = self.lock().drain().collect();
        for pid in &pids {
            kill_process_group(*pid);
        }
        if !pids.is_empty() {
            tracing::warn!("Killed {} live trial process group(s)", pids.len());
        }
        pids.len()
    }

    /// Registration that is undone when the guard drops, on every exit path.
    pub fn track(&self, pid: u32) -> Registration {
        self.register(pid);
        Registration {
            registry: self.clone(),
            pid,
        }
    }
}

pub struct Registration {
    registry: ProcessRegistry,
    pid: u32,
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.registry.unregister(self.pid);
    }
}

/// SIGKILL the whole process group led by `pid`. Errors are logged, not raised.
#[cfg(unix)]
pub fn kill_process_group(pid: u32) {
    // killpg(0) and killpg(1) would hit our own group or init's
    if pid <= 1 {
        return;
    }
    tracing::debug!("Killing process group {}", pid);
    let Ok(pgid) = libc::pid_t::try_from(pid) else {
        tracing::error!("Process id {} out of range for killpg", pid);
        return;
    };
    // SAFETY: killpg has no memory-safety preconditions.
    let rc = unsafe { libc::killpg(pgid, libc::SIGKILL) };
    if rc != 0 {
        let err = std::io::Error::last_os_error();
        // ESRCH: the group already exited
        if err.raw_os_error() != Some(libc::ESRCH) {
            tracing::error!("Error killing process group {}: {}", pid, err);
        }
    }
}

#[cfg(not(unix))]
pub fn kill_process_group(pid: u32) {
    tracing::debug!("Process groups unsupported; cannot kill {}", pid);
}
