// Change-tracking cell. Owners of cached derived data poll `take_dirt` to decide whether the
// cache must be rebuilt.

use std::cell::Cell;
use std::ops;


#[derive(Clone, Debug)]
pub struct Dirty<T> {
    value: T,
    dirty: Cell<bool>,
}

impl<T> Dirty<T> {
    pub fn new(value: T) -> Self { Self { value, dirty: Cell::new(false) } }

    // Always marks the value as changed.
    pub fn get_mut(&mut self) -> &mut T {
        self.dirty.set(true);
        &mut self.value
    }

    pub fn is_dirty(&self) -> bool { self.dirty.get() }
    pub fn take_dirt(&self) -> bool { self.dirty.replace(false) }
}

impl<T: Eq> Dirty<T> {
    // Marks the value as changed only if it is different.
    pub fn set(&mut self, value: T) {
        if self.value != value {
            self.value = value;
            self.dirty.set(true);
        }
    }
}

impl<T: Clone + Eq> Dirty<T> {
    // Applies `f` to a copy and keeps the result; marks the value as changed only if `f`
    // actually changed something.
    pub fn update<R>(&mut self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut value = self.value.clone();
        let result = f(&mut value);
        self.set(value);
        result
    }
}

impl<T> ops::Deref for Dirty<T> {
    type Target = T;
    fn deref(&self) -> &Self::Target { &self.value }
}
// No `DerefMut`: every mutable access must go through `get_mut`, `set` or `update`.
