//! Lifecycle tracking for transmitter and receiver containers.

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lifecycle state of a transmitter or receiver container.
///
/// Every container starts `Active` and moves to `Closed` exactly once.
/// Operations on a closed container fail with the component's `Closed`
/// error instead of touching released state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Object is usable.
    Active,
    /// Object has been closed and must not be reused.
    Closed,
}

/// Interior-mutable lifecycle cell shared by the container objects.
#[derive(Debug)]
pub struct LifecycleCell(Mutex<Lifecycle>);

impl LifecycleCell {
    /// Create a cell in the `Active` state.
    pub fn new() -> Self {
        Self(Mutex::new(Lifecycle::Active))
    }

    /// Current lifecycle state.
    pub fn get(&self) -> Lifecycle {
        *lock(&self.0)
    }

    /// Whether the cell has been closed.
    pub fn is_closed(&self) -> bool {
        self.get() == Lifecycle::Closed
    }

    /// Transition to `Closed`.
    ///
    /// Returns `true` on the transitioning call and `false` on every
    /// subsequent call, so close side effects run exactly once.
    pub fn close(&self) -> bool {
        let mut state = lock(&self.0);
        match *state {
            Lifecycle::Active => {
                *state = Lifecycle::Closed;
                true
            }
            Lifecycle::Closed => false,
        }
    }
}

impl Default for LifecycleCell {
    fn default() -> Self {
        Self::new()
    }
}

/// Poison-tolerant mutex lock.
///
/// A panicked holder cannot leave these small state cells inconsistent,
/// so the poison flag is ignored rather than propagated.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
