use crate::{EcsError, Entity, ID, NULL_ID};

/// Every entity slot ever handed out, plus the list of free ones.
///
/// A live slot holds its own handle. A free slot holds a link instead: its id half is the next free slot (or
/// [`NULL_ID`]) and its version half is the version the slot will have once reused. Because a free slot never stores
/// its own index, comparing the stored value with a handle is enough to tell whether the handle is alive.
pub(crate) struct EntityTable {
    slots: Vec<Entity>,
    avail_id: ID,
    alive: usize,
}

impl EntityTable {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            avail_id: NULL_ID,
            alive: 0,
        }
    }

    pub fn allocate(&mut self) -> Result<Entity, EcsError> {
        let entity = if self.avail_id == NULL_ID {
            if self.slots.len() >= NULL_ID as usize {
                return Err(EcsError::EntityLimit {
                    max: NULL_ID as usize,
                });
            }

            self.slots.try_reserve(1)?;

            let entity = Entity::new(self.slots.len() as ID, 0);
            self.slots.push(entity);
            entity
        } else {
            let id = self.avail_id;
            let link = self.slots[id as usize];

            // Move the head to the next free slot (or NULL_ID)
            self.avail_id = link.id;

            // The version was already bumped on release
            let entity = Entity::new(id, link.version);
            self.slots[id as usize] = entity;
            entity
        };

        self.alive += 1;
        Ok(entity)
    }

    /// Frees the slot of a live entity. Bumping the version here, rather than on reuse, is what invalidates the
    /// outstanding copies of `entity`.
    pub fn release(&mut self, entity: Entity) {
        debug_assert!(self.is_valid(entity), "releasing a dead entity");

        self.slots[entity.id as usize] = Entity::new(self.avail_id, entity.version.wrapping_add(1));
        self.avail_id = entity.id;
        self.alive -= 1;
    }

    pub fn is_valid(&self, entity: Entity) -> bool {
        self.slots.get(entity.id as usize) == Some(&entity)
    }

    /// The live handle occupying slot `index`, if any.
    pub fn at(&self, index: usize) -> Option<Entity> {
        let slot = *self.slots.get(index)?;
        if slot.id as usize == index {
            Some(slot)
        } else {
            None
        }
    }

    pub fn alive(&self) -> usize {
        self.alive
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }
}
