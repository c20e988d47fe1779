use std::sync::{Condvar, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Acquire a lock on a mutex, disregarding whether it was poisoned.
pub fn lock_discard_poison<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
  m.lock().unwrap_or_else(|e| e.into_inner())
}

/// Acquire a read lock, disregarding whether it was poisoned.
pub fn read_discard_poison<T: ?Sized>(l: &RwLock<T>) -> RwLockReadGuard<'_, T> {
  l.read().unwrap_or_else(|e| e.into_inner())
}

/// Acquire a write lock, disregarding whether it was poisoned.
pub fn write_discard_poison<T: ?Sized>(l: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
  l.write().unwrap_or_else(|e| e.into_inner())
}

/// Block on a condition variable until `done` holds, disregarding poison.
pub fn wait_discard_poison<'a, T>(cv: &Condvar,
                                  guard: MutexGuard<'a, T>,
                                  done: impl Fn(&T) -> bool)
                                  -> MutexGuard<'a, T> {
  cv.wait_while(guard, |t| !done(t)).unwrap_or_else(|e| e.into_inner())
}
