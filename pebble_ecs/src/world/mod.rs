use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::ops::ControlFlow;
use std::rc::Rc;

use log::warn;

use crate::config::WorldConfig;
use crate::error::expect_ok;
use crate::pool::{AnyPool, Pool};
use crate::reclaim::Reclaimer;
use crate::world::entities::EntityTable;
use crate::world::entity_mut::EntityMut;
use crate::world::query::{Query, View, MAX_VIEW_COMPONENTS};
use crate::{Component, EcsError, Entity};

mod entities;
pub mod entity_mut;
pub mod query;

/// Callback run when a component is attached to or detached from an entity.
pub type Hook = Rc<dyn Fn(&mut World, Entity)>;

/// Dense per-world index of a component type, assigned the first time the type is touched.
#[derive(Eq, PartialEq, Hash, Copy, Clone, Debug, PartialOrd, Ord)]
pub struct ComponentId(u32);

impl ComponentId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Owner of every entity and component.
///
/// Entities, components and views may be created and destroyed while a [`View`] is being walked. Buffers that get
/// replaced in the meantime are only freed once the last open view is exhausted.
pub struct World {
    entities: EntityTable,

    pools: Vec<Box<dyn AnyPool>>,
    pool_ids: HashMap<TypeId, ComponentId>,

    reclaim: Reclaimer,
    config: WorldConfig,
}

impl Default for World {
    fn default() -> Self {
        World::with_config(WorldConfig::default())
    }
}

struct ScanGuard<'w> {
    world: &'w mut World,
    view: View,
}

impl Drop for ScanGuard<'_> {
    fn drop(&mut self) {
        self.view.close(&mut *self.world);
    }
}

impl World {
    pub fn with_config(config: WorldConfig) -> Self {
        World {
            entities: EntityTable::new(),
            pools: Vec::new(),
            pool_ids: HashMap::new(),
            reclaim: Reclaimer::new(config.reclaim_capacity, config.min_capacity),
            config,
        }
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn create(&mut self) -> Entity {
        expect_ok(self.try_create())
    }

    pub fn try_create(&mut self) -> Result<Entity, EcsError> {
        self.entities.allocate()
    }

    /// Creates an entity and hands it back wrapped for chained attaches.
    pub fn spawn(&mut self) -> EntityMut<'_> {
        let entity = self.create();
        EntityMut::new(self, entity)
    }

    pub fn entity_mut(&mut self, entity: Entity) -> EntityMut<'_> {
        expect_ok(self.check_alive(entity));
        EntityMut::new(self, entity)
    }

    pub fn is_alive(&self, entity: Entity) -> bool {
        self.entities.is_valid(entity)
    }

    /// Number of live entities.
    pub fn count(&self) -> usize {
        self.entities.alive()
    }

    /// The live entity occupying slot `index` of the entity table, if any.
    pub fn entity_at(&self, index: usize) -> Option<Entity> {
        self.entities.at(index)
    }

    /// Number of entity slots ever created, live or not.
    pub fn slots(&self) -> usize {
        self.entities.len()
    }

    fn check_alive(&self, entity: Entity) -> Result<(), EcsError> {
        if self.entities.is_valid(entity) {
            Ok(())
        } else {
            Err(EcsError::StaleEntity { entity })
        }
    }

    pub fn destroy(&mut self, entity: Entity) {
        expect_ok(self.try_destroy(entity))
    }

    /// Removes every component of `entity`, then frees its slot. Destroy hooks run while the entity is still alive.
    pub fn try_destroy(&mut self, entity: Entity) -> Result<(), EcsError> {
        self.check_alive(entity)?;

        // Hooks may register new types, so the pool count is read on every step
        let mut idx = 0;
        while idx < self.pools.len() {
            if self.pools[idx].has(entity.id) {
                if let Some(hook) = self.pools[idx].destroy_hook() {
                    hook(&mut *self, entity);

                    // The hook destroyed the entity itself
                    if !self.entities.is_valid(entity) {
                        return Ok(());
                    }
                }
                self.pools[idx].clear_entity(entity.id);
            }
            idx += 1;
        }

        self.entities.release(entity);
        Ok(())
    }

    pub fn register<T: Component>(&mut self) -> ComponentId {
        expect_ok(self.try_register::<T>())
    }

    /// Returns the id of `T`, creating an empty pool for it if this is the first time it's seen.
    pub fn try_register<T: Component>(&mut self) -> Result<ComponentId, EcsError> {
        if let Some(&id) = self.pool_ids.get(&TypeId::of::<T>()) {
            return Ok(id);
        }

        // Views only hold component ids, but the old array still goes through reclamation like every other column
        self.reclaim.grow(&mut self.pools)?;

        let id = ComponentId(self.pools.len() as u32);
        self.pools.push(Box::new(Pool::<T>::new()));
        self.pool_ids.insert(TypeId::of::<T>(), id);

        Ok(id)
    }

    /// The id of `T`, or `None` if no entity ever had one and no hook was registered for it.
    pub fn component_id<T: Component>(&self) -> Option<ComponentId> {
        self.pool_ids.get(&TypeId::of::<T>()).copied()
    }

    pub(crate) fn pool_at(&self, id: ComponentId) -> &dyn AnyPool {
        self.pools[id.index()].as_ref()
    }

    fn pool<T: Component>(&self) -> Option<&Pool<T>> {
        let id = self.component_id::<T>()?;
        Some(self.pools[id.index()].as_any().downcast_ref::<Pool<T>>().unwrap())
    }

    fn pool_mut<T: Component>(&mut self) -> Option<&mut Pool<T>> {
        let id = self.component_id::<T>()?;
        Some(self.pools[id.index()].as_any_mut().downcast_mut::<Pool<T>>().unwrap())
    }

    fn missing<T: Component>(entity: Entity) -> EcsError {
        EcsError::MissingComponent {
            entity,
            component: type_name::<T>(),
        }
    }

    pub fn attach<T: Component>(&mut self, entity: Entity, component: T) -> &mut T {
        expect_ok(self.try_attach(entity, component))
    }

    /// Gives `component` to `entity` and runs the create hook of `T`, if any.
    pub fn try_attach<T: Component>(&mut self, entity: Entity, component: T) -> Result<&mut T, EcsError> {
        self.check_alive(entity)?;

        let id = self.try_register::<T>()?;

        let World { pools, reclaim, .. } = self;
        let pool = pools[id.index()].as_any_mut().downcast_mut::<Pool<T>>().unwrap();

        if pool.has(entity.id) {
            return Err(EcsError::DuplicateComponent {
                entity,
                component: type_name::<T>(),
            });
        }

        pool.attach(entity, component, reclaim)?;

        if let Some(hook) = pool.on_create.clone() {
            hook(&mut *self, entity);
        }

        self.try_get_mut(entity)
    }

    pub fn detach<T: Component>(&mut self, entity: Entity) -> T {
        expect_ok(self.try_detach(entity))
    }

    /// Takes `T` away from `entity`, running the destroy hook first.
    pub fn try_detach<T: Component>(&mut self, entity: Entity) -> Result<T, EcsError> {
        self.check_alive(entity)?;

        let pool = self.pool::<T>().ok_or_else(|| Self::missing::<T>(entity))?;
        if !pool.has(entity.id) {
            return Err(Self::missing::<T>(entity));
        }

        if let Some(hook) = pool.on_destroy.clone() {
            hook(&mut *self, entity);
        }

        self.pool_mut::<T>()
            .and_then(|pool| pool.detach(entity.id))
            .ok_or_else(|| Self::missing::<T>(entity))
    }

    pub fn get<T: Component>(&self, entity: Entity) -> &T {
        expect_ok(self.try_get(entity))
    }

    pub fn try_get<T: Component>(&self, entity: Entity) -> Result<&T, EcsError> {
        self.check_alive(entity)?;

        self.pool::<T>()
            .and_then(|pool| pool.get(entity.id))
            .ok_or_else(|| Self::missing::<T>(entity))
    }

    pub fn get_mut<T: Component>(&mut self, entity: Entity) -> &mut T {
        expect_ok(self.try_get_mut(entity))
    }

    pub fn try_get_mut<T: Component>(&mut self, entity: Entity) -> Result<&mut T, EcsError> {
        self.check_alive(entity)?;

        self.pool_mut::<T>()
            .and_then(|pool| pool.get_mut(entity.id))
            .ok_or_else(|| Self::missing::<T>(entity))
    }

    pub fn has<T: Component>(&self, entity: Entity) -> bool {
        expect_ok(self.try_has::<T>(entity))
    }

    pub fn try_has<T: Component>(&self, entity: Entity) -> Result<bool, EcsError> {
        self.check_alive(entity)?;

        Ok(self.pool::<T>().map_or(false, |pool| pool.has(entity.id)))
    }

    /// Runs `hook` right after a `T` is attached to an entity.
    ///
    /// The hook gets the whole world and may attach, detach, create and destroy. If it takes the new `T` away again,
    /// [`World::try_attach`] reports it as missing.
    pub fn set_create_hook<T: Component>(&mut self, hook: impl Fn(&mut World, Entity) + 'static) {
        self.register::<T>();
        if let Some(pool) = self.pool_mut::<T>() {
            pool.on_create = Some(Rc::new(hook));
        }
    }

    /// Runs `hook` right before a `T` is taken away from an entity, including when the entity is destroyed and when
    /// the world itself is dropped.
    pub fn set_destroy_hook<T: Component>(&mut self, hook: impl Fn(&mut World, Entity) + 'static) {
        self.register::<T>();
        if let Some(pool) = self.pool_mut::<T>() {
            pool.on_destroy = Some(Rc::new(hook));
        }
    }

    /// Opens a view over the entities having every component in `Q`.
    ///
    /// The view must be driven until [`View::next`] returns `None` (or be [closed](View::close)). See [`World::scan`]
    /// for a form that can't forget to.
    pub fn view<Q: Query>(&mut self) -> View {
        let ids = Q::component_ids(self);
        View::open(self, ids)
    }

    pub fn view_of(&mut self, ids: &[ComponentId]) -> View {
        expect_ok(self.try_view_of(ids))
    }

    /// Like [`World::view`], but with the component set picked at run time.
    pub fn try_view_of(&mut self, ids: &[ComponentId]) -> Result<View, EcsError> {
        if ids.is_empty() || ids.len() > MAX_VIEW_COMPONENTS {
            return Err(EcsError::ViewArity {
                count: ids.len(),
                max: MAX_VIEW_COMPONENTS,
            });
        }

        Ok(View::open(self, Some(ids.iter().copied().collect())))
    }

    /// Calls `f` for every entity having every component in `Q`, closing the view however the loop is left.
    pub fn scan<Q: Query>(&mut self, f: impl FnMut(&mut World, Entity) -> ControlFlow<()>) {
        let view = self.view::<Q>();
        self.drive(view, f);
    }

    pub fn scan_of(&mut self, ids: &[ComponentId], f: impl FnMut(&mut World, Entity) -> ControlFlow<()>) {
        let view = self.view_of(ids);
        self.drive(view, f);
    }

    fn drive(&mut self, view: View, mut f: impl FnMut(&mut World, Entity) -> ControlFlow<()>) {
        let mut guard = ScanGuard { world: self, view };

        while let Some(entity) = guard.view.next(&mut *guard.world) {
            if f(&mut *guard.world, entity).is_break() {
                break;
            }
        }
    }

    pub(crate) fn open_view(&mut self) {
        self.reclaim.open();
    }

    pub(crate) fn close_view(&mut self) {
        self.reclaim.close();
    }

    /// Number of views currently open.
    pub fn iteration_depth(&self) -> usize {
        self.reclaim.depth()
    }

    /// Number of replaced buffers waiting for the last open view to close.
    pub fn pending_reclaims(&self) -> usize {
        self.reclaim.pending()
    }

    /// Number of `T` components in the world.
    pub fn pool_len<T: Component>(&self) -> usize {
        self.pool::<T>().map_or(0, |pool| pool.len())
    }

    /// Number of `T` components the world can hold without reallocating. Zero-sized types report their length.
    pub fn pool_capacity<T: Component>(&self) -> usize {
        self.pool::<T>().map_or(0, |pool| AnyPool::capacity(pool))
    }

    /// Gives back memory from pools that hold far fewer components than they have room for. Returns how many pools
    /// were shrunk.
    ///
    /// Meant to be called periodically, e.g. once per tick. Entity ids are never compacted.
    pub fn compact(&mut self) -> Result<usize, EcsError> {
        if !self.reclaim.is_deferring() {
            self.reclaim.commit();
        }

        let World { pools, reclaim, config, .. } = self;

        let mut shrunk = 0;
        for pool in pools.iter_mut() {
            if pool.compact(config, reclaim)? {
                shrunk += 1;
            }
        }

        Ok(shrunk)
    }
}

impl Drop for World {
    fn drop(&mut self) {
        if self.reclaim.is_deferring() {
            warn!("world dropped with {} view(s) still open", self.reclaim.depth());
        }

        // Every remaining component is going away, so destroy hooks get to see all of them
        for idx in 0..self.pools.len() {
            let hook = match self.pools[idx].destroy_hook() {
                Some(hook) => hook,
                None => continue,
            };

            // Taken up front, a hook may shuffle the pool while it runs
            let entities: Vec<Entity> = (0..self.pools[idx].len())
                .filter_map(|packed_idx| self.pools[idx].entity_at(packed_idx))
                .collect();

            for entity in entities {
                if self.entities.is_valid(entity) && self.pools[idx].has(entity.id) {
                    hook(&mut *self, entity);
                }
            }
        }
    }
}
