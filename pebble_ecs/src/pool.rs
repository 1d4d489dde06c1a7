use std::any::{type_name, Any};
use std::mem;

use log::debug;

use crate::config::WorldConfig;
use crate::reclaim::Reclaimer;
use crate::world::Hook;
use crate::{Component, EcsError, Entity, ID};

/// Sparse set holding every `T` in a world.
///
/// `sparse` is indexed by entity id and points into the packed arrays. `packed` and `components` are index-aligned:
/// `packed[i]` is the entity owning `components[i]`.
pub(crate) struct Pool<T: Component> {
    sparse: Vec<Option<usize>>,
    packed: Vec<Entity>,
    components: Vec<T>,

    pub(crate) on_create: Option<Hook>,
    pub(crate) on_destroy: Option<Hook>,
}

impl<T: Component> Pool<T> {
    pub fn new() -> Self {
        Self {
            sparse: Vec::new(),
            packed: Vec::new(),
            components: Vec::new(),
            on_create: None,
            on_destroy: None,
        }
    }

    fn packed_idx(&self, entity_id: ID) -> Option<usize> {
        *self.sparse.get(entity_id as usize)?
    }

    /// Appends `component` for `entity`. The entity must not already have one.
    ///
    /// Every allocation happens before anything is written, so a failure leaves the pool untouched.
    pub fn attach(&mut self, entity: Entity, component: T, reclaim: &mut Reclaimer) -> Result<usize, EcsError> {
        debug_assert!(!self.has(entity.id), "attaching twice to the same entity");

        let entity_idx = entity.id as usize;

        reclaim.grow(&mut self.components)?;
        reclaim.grow(&mut self.packed)?;
        reclaim.cover(&mut self.sparse, entity_idx + 1, None)?;

        // The new component goes at the end of the packed arrays, so that's the index to store
        let packed_idx = self.packed.len();
        self.sparse[entity_idx] = Some(packed_idx);

        self.packed.push(entity);
        self.components.push(component);

        Ok(packed_idx)
    }

    /// Swap-removes the component of the entity with the given id.
    ///
    /// The last element of the packed arrays takes the removed one's place, so order is not preserved.
    pub fn detach(&mut self, entity_id: ID) -> Option<T> {
        let packed_idx = self.packed_idx(entity_id)?;
        let packed_idx_of_last = self.packed.len() - 1;

        // Point the last element at the slot it's about to move into. If the removed element is the last one this
        // writes to its own entry, which gets cleared right below anyway.
        let entity_id_of_last = self.packed[packed_idx_of_last].id;
        self.sparse[entity_id_of_last as usize] = Some(packed_idx);
        self.sparse[entity_id as usize] = None;

        self.packed.swap_remove(packed_idx);
        Some(self.components.swap_remove(packed_idx))
    }

    pub fn has(&self, entity_id: ID) -> bool {
        self.packed_idx(entity_id).is_some()
    }

    pub fn get(&self, entity_id: ID) -> Option<&T> {
        let packed_idx = self.packed_idx(entity_id)?;
        Some(&self.components[packed_idx])
    }

    pub fn get_mut(&mut self, entity_id: ID) -> Option<&mut T> {
        let packed_idx = self.packed_idx(entity_id)?;
        Some(&mut self.components[packed_idx])
    }

    pub fn entities(&self) -> &[Entity] {
        &self.packed
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Shrinks the packed arrays if they are mostly empty. Returns whether anything was reallocated.
    pub fn compact(&mut self, config: &WorldConfig, reclaim: &mut Reclaimer) -> Result<bool, EcsError> {
        // Zero-sized components don't own any memory
        if mem::size_of::<T>() == 0 {
            return Ok(false);
        }

        let len = self.components.len();
        let capacity = self.components.capacity();

        if len <= config.compact_min_len || capacity <= len * 2 {
            return Ok(false);
        }

        let granularity = config.compact_granularity.max(1);
        let new_capacity = (len + granularity - 1) / granularity * granularity;

        debug!("compacting pool of `{}`: {} -> {} slots ({} live)", type_name::<T>(), capacity, new_capacity, len);

        reclaim.relocate(&mut self.components, new_capacity)?;
        if self.packed.capacity() > new_capacity {
            reclaim.relocate(&mut self.packed, new_capacity)?;
        }

        Ok(true)
    }
}

/// Object-safe face of a [`Pool`], so that a world can keep pools of different types side by side.
pub(crate) trait AnyPool {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn has(&self, entity_id: ID) -> bool;
    fn len(&self) -> usize;
    fn capacity(&self) -> usize;
    fn entity_at(&self, packed_idx: usize) -> Option<Entity>;
    fn destroy_hook(&self) -> Option<Hook>;
    fn clear_entity(&mut self, entity_id: ID);
    fn compact(&mut self, config: &WorldConfig, reclaim: &mut Reclaimer) -> Result<bool, EcsError>;
}

impl<T: Component> AnyPool for Pool<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn has(&self, entity_id: ID) -> bool {
        Pool::has(self, entity_id)
    }

    fn len(&self) -> usize {
        Pool::len(self)
    }

    fn capacity(&self) -> usize {
        // A Vec of zero-sized values claims usize::MAX slots
        if mem::size_of::<T>() == 0 {
            self.components.len()
        } else {
            self.components.capacity()
        }
    }

    fn entity_at(&self, packed_idx: usize) -> Option<Entity> {
        self.packed.get(packed_idx).copied()
    }

    fn destroy_hook(&self) -> Option<Hook> {
        self.on_destroy.clone()
    }

    fn clear_entity(&mut self, entity_id: ID) {
        self.detach(entity_id);
    }

    fn compact(&mut self, config: &WorldConfig, reclaim: &mut Reclaimer) -> Result<bool, EcsError> {
        Pool::compact(self, config, reclaim)
    }
}
