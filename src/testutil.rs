//! Helpers shared by the unit tests.

use std::sync::{Mutex, MutexGuard};

static CWD_LOCK: Mutex<()> = Mutex::new(());

/// Serialize tests that change the process working directory.
pub(crate) fn lock_current_dir() -> MutexGuard<'static, ()> {
    CWD_LOCK.lock().unwrap_or_else(|e| e.into_inner())
}
