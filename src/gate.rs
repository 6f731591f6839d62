//! Single-flight guard for pipeline runs.

use crate::error::{ErrorKind, Result};
use tokio::sync::{Mutex, MutexGuard};

/// Ensures at most one pipeline run is in flight at any time.
///
/// A second trigger while a run holds the permit is rejected immediately
/// with [`ErrorKind::AlreadyRunning`], never queued. The permit releases
/// on drop, including when the run fails partway.
#[derive(Debug)]
pub struct RunGate {
    lock: Mutex<()>,
}

impl Default for RunGate {
    fn default() -> Self {
        Self::new()
    }
}

impl RunGate {
    /// Const so the gate can live in a `static`: triggers only contend if
    /// they share one instance.
    pub const fn new() -> Self {
        Self { lock: Mutex::const_new(()) }
    }

    pub fn try_acquire(&self) -> Result<MutexGuard<'_, ()>> {
        match self.lock.try_lock() {
            Ok(permit) => Ok(permit),
            Err(_) => exn::bail!(ErrorKind::AlreadyRunning),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_second_acquire_rejected_not_queued() {
        let gate = RunGate::new();
        let permit = gate.try_acquire().unwrap();
        let err = gate.try_acquire().unwrap_err();
        assert!(matches!(&*err, ErrorKind::AlreadyRunning));
        drop(permit);
        assert!(gate.try_acquire().is_ok());
    }
}
