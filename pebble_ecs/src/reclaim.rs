use std::any::Any;
use std::cmp::max;
use std::mem;

use log::{debug, trace};

use crate::EcsError;

/// Holds buffers that were replaced while a view was open.
///
/// Growing a column moves its contents into a fresh allocation. While at least one view is open the old allocation is
/// not dropped right away but parked here, and everything parked is dropped in one go when the last view closes.
pub(crate) struct Reclaimer {
    retired: Vec<Box<dyn Any>>,
    capacity: usize,
    min_capacity: usize,
    depth: usize,
}

impl Reclaimer {
    pub fn new(capacity: usize, min_capacity: usize) -> Self {
        Self {
            retired: Vec::with_capacity(capacity),
            capacity,
            min_capacity: max(min_capacity, 1),
            depth: 0,
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn pending(&self) -> usize {
        self.retired.len()
    }

    pub fn is_deferring(&self) -> bool {
        self.depth > 0
    }

    pub fn open(&mut self) {
        self.depth += 1;
    }

    /// Marks one view as closed. Commits everything parked once no view is left open.
    pub fn close(&mut self) {
        debug_assert!(self.depth > 0, "closing a view that was never opened");
        self.depth = self.depth.saturating_sub(1);

        if self.depth == 0 {
            self.commit();
        }
    }

    /// Drops every parked buffer. Returns how many there were.
    pub fn commit(&mut self) -> usize {
        let n = self.retired.len();
        if n > 0 {
            debug!("committing {} deferred reclamation(s)", n);
            self.retired.clear();
        }
        n
    }

    /// Gives up ownership of a buffer that has been replaced. Dropped now if no view is open, parked otherwise.
    pub fn release<V: 'static>(&mut self, old: Vec<V>) -> Result<(), EcsError> {
        // Never allocated, nothing to free
        if old.capacity() == 0 || mem::size_of::<V>() == 0 {
            return Ok(());
        }

        if !self.is_deferring() {
            return Ok(());
        }

        if self.retired.len() >= self.capacity {
            return Err(EcsError::ReclaimOverflow {
                capacity: self.capacity,
            });
        }

        trace!("retiring a buffer of {} x {}", old.capacity(), std::any::type_name::<V>());
        self.retired.push(Box::new(old));
        Ok(())
    }

    /// Moves the contents of `vec` into a new allocation of exactly `new_capacity` slots, releasing the old one.
    pub fn relocate<V: 'static>(&mut self, vec: &mut Vec<V>, new_capacity: usize) -> Result<(), EcsError> {
        debug_assert!(new_capacity >= vec.len());

        let mut moved = Vec::new();
        moved.try_reserve_exact(new_capacity)?;
        moved.extend(vec.drain(..));

        let old = mem::replace(vec, moved);
        self.release(old)
    }

    /// Makes room for one more element, doubling the capacity (from the configured floor) if `vec` is full.
    pub fn grow<V: 'static>(&mut self, vec: &mut Vec<V>) -> Result<(), EcsError> {
        if vec.len() < vec.capacity() {
            return Ok(());
        }

        let new_capacity = max(self.min_capacity, vec.capacity() * 2);
        self.relocate(vec, new_capacity)
    }

    /// Extends `vec` with `fill` until it is at least `len` long.
    pub fn cover<V: Clone + 'static>(&mut self, vec: &mut Vec<V>, len: usize, fill: V) -> Result<(), EcsError> {
        if vec.len() >= len {
            return Ok(());
        }

        if vec.capacity() < len {
            let new_capacity = max(len, max(self.min_capacity, vec.capacity() * 2));
            self.relocate(vec, new_capacity)?;
        }

        vec.resize(len, fill);
        Ok(())
    }
}
