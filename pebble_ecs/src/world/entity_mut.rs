use crate::world::World;
use crate::{Component, Entity};

/// An entity together with mutable access to its world, for when several calls target the same entity.
pub struct EntityMut<'w> {
    world: &'w mut World,
    entity: Entity,
}

impl<'w> EntityMut<'w> {
    pub(crate) fn new(world: &'w mut World, entity: Entity) -> Self {
        EntityMut { world, entity }
    }

    pub fn entity(&self) -> Entity {
        self.entity
    }

    pub fn id(&self) -> u32 {
        self.entity.id()
    }

    pub fn version(&self) -> u32 {
        self.entity.version()
    }

    pub fn is_alive(&self) -> bool {
        self.world.is_alive(self.entity)
    }

    pub fn world(&self) -> &World {
        &*self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut *self.world
    }

    pub fn attach<T: Component>(&mut self, component: T) -> &mut T {
        self.world.attach(self.entity, component)
    }

    /// Builder form of [`EntityMut::attach`].
    pub fn with<T: Component>(mut self, component: T) -> Self {
        self.attach(component);
        self
    }

    pub fn get<T: Component>(&self) -> &T {
        self.world.get(self.entity)
    }

    pub fn get_mut<T: Component>(&mut self) -> &mut T {
        self.world.get_mut(self.entity)
    }

    pub fn has<T: Component>(&self) -> bool {
        self.world.has::<T>(self.entity)
    }

    pub fn detach<T: Component>(&mut self) -> T {
        self.world.detach(self.entity)
    }

    pub fn destroy(self) {
        self.world.destroy(self.entity)
    }
}

#[cfg(test)]
mod test {
    use crate::test::*;

    use super::*;

    #[test]
    fn spawn_with() {
        let mut w = World::default();

        let e = w.spawn().with(CompZ(1)).with(CompX::new("A")).entity();

        assert_eq!(w.get::<CompZ>(e), &CompZ(1));
        assert_eq!(w.get::<CompX>(e), &CompX::new("A"));
    }

    #[test]
    fn forwards() {
        let mut w = World::default();
        let e = w.create();

        let mut em = w.entity_mut(e);
        em.attach(CompZ(1));
        em.get_mut::<CompZ>().0 = 5;
        assert!(em.has::<CompZ>());
        assert_eq!(em.detach::<CompZ>(), CompZ(5));
        assert!(!em.has::<CompZ>());
        assert_eq!((em.id(), em.version()), (0, 0));
        em.destroy();

        assert!(!w.is_alive(e));
    }
}
