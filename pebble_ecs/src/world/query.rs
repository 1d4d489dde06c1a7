use log::warn;
use smallvec::{smallvec, SmallVec};

use crate::world::{ComponentId, World};
use crate::{Component, Entity};

/// Most component types a single view can intersect.
pub const MAX_VIEW_COMPONENTS: usize = 16;

pub type ComponentIds = SmallVec<[ComponentId; MAX_VIEW_COMPONENTS]>;

/// A set of component types to intersect, written as a tuple: `(Position,)`, `(Position, Velocity)`, ...
pub trait Query {
    /// The ids of the types in the set, or `None` if one of them was never registered in `world`.
    fn component_ids(world: &World) -> Option<ComponentIds>;
}

macro_rules! impl_query {
    ($($t:ident),+) => {
        impl<$($t: Component),+> Query for ($($t,)+) {
            fn component_ids(world: &World) -> Option<ComponentIds> {
                Some(smallvec![$(world.component_id::<$t>()?),+])
            }
        }
    };
}

impl_query!(A);
impl_query!(A, B);
impl_query!(A, B, C);
impl_query!(A, B, C, D);
impl_query!(A, B, C, D, E);
impl_query!(A, B, C, D, E, F);
impl_query!(A, B, C, D, E, F, G);
impl_query!(A, B, C, D, E, F, G, H);
impl_query!(A, B, C, D, E, F, G, H, I);
impl_query!(A, B, C, D, E, F, G, H, I, J);
impl_query!(A, B, C, D, E, F, G, H, I, J, K);
impl_query!(A, B, C, D, E, F, G, H, I, J, K, L);
impl_query!(A, B, C, D, E, F, G, H, I, J, K, L, M);
impl_query!(A, B, C, D, E, F, G, H, I, J, K, L, M, N);
impl_query!(A, B, C, D, E, F, G, H, I, J, K, L, M, N, O);
impl_query!(A, B, C, D, E, F, G, H, I, J, K, L, M, N, O, P);

/// Cursor over the entities that have every component of a set.
///
/// The view walks the packed array of the smallest pool in the set (the driver) from the back, checking every other
/// pool for membership. It borrows nothing: every step takes the world again, so the loop body is free to attach,
/// detach and destroy. Removing the entity just yielded is always safe, since the swap-remove only moves an element
/// that was already visited into its place.
///
/// Not supported: removing *other* entities from the driver pool mid-scan (an already-visited entity may be swapped
/// into an unvisited slot and show up twice), or re-adding an entity to the driver pool mid-scan.
///
/// A view counts as open from creation until [`View::next`] returns `None` or [`View::close`] is called. While any
/// view is open, replaced buffers are kept alive, so a view that is dropped half-way keeps them alive until the world
/// goes away.
pub struct View {
    ids: ComponentIds,
    driver: Option<ComponentId>,
    cursor: usize,
    current: Option<Entity>,
    started: bool,
    open: bool,
}

impl View {
    pub(crate) fn open(world: &mut World, ids: Option<ComponentIds>) -> View {
        world.open_view();

        // A type nobody ever touched means there's nothing to find
        let ids = ids.unwrap_or_default();

        let mut view = View {
            driver: ids.iter().copied().min_by_key(|&id| world.pool_at(id).len()),
            ids,
            cursor: 0,
            current: None,
            started: false,
            open: true,
        };
        view.seed(world);

        view
    }

    /// Positions the cursor on the last match of the driver.
    fn seed(&mut self, world: &World) {
        self.current = None;
        if let Some(driver) = self.driver {
            self.cursor = world.pool_at(driver).len();
            self.advance(world);
        }
    }

    fn seed_is_current(&self, world: &World) -> bool {
        match (self.driver, self.current) {
            (Some(driver), Some(entity)) => {
                world.pool_at(driver).entity_at(self.cursor) == Some(entity) && self.contains(world, entity)
            }
            _ => false,
        }
    }

    fn contains(&self, world: &World, entity: Entity) -> bool {
        self.ids.iter().all(|&id| world.pool_at(id).has(entity.id))
    }

    fn advance(&mut self, world: &World) {
        let driver = match self.driver {
            Some(driver) => world.pool_at(driver),
            None => {
                self.current = None;
                return;
            }
        };

        loop {
            if self.cursor == 0 {
                self.current = None;
                return;
            }
            self.cursor -= 1;

            // The driver may have shrunk by more than one since the last step
            if let Some(entity) = driver.entity_at(self.cursor) {
                if self.contains(world, entity) {
                    self.current = Some(entity);
                    return;
                }
            }
        }
    }

    /// Moves to the next matching entity and returns it. Closes the view when there are none left.
    pub fn next(&mut self, world: &mut World) -> Option<Entity> {
        if !self.open {
            return None;
        }

        if self.started {
            self.advance(world);
        } else {
            self.started = true;

            // Nothing was yielded yet, so if the world changed since opening it's safe to start over
            if !self.seed_is_current(world) {
                self.seed(world);
            }
        }

        if self.current.is_none() {
            self.close(world);
        }

        self.current
    }

    /// Closes the view without exhausting it. Does nothing if it is already closed.
    pub fn close(&mut self, world: &mut World) {
        if self.open {
            self.open = false;
            self.current = None;
            world.close_view();
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// The entity last returned by [`View::next`].
    pub fn entity(&self) -> Option<Entity> {
        if self.started {
            self.current
        } else {
            None
        }
    }

    fn current_or_panic(&self) -> Entity {
        match self.entity() {
            Some(entity) => entity,
            None => panic!("view is not positioned on an entity"),
        }
    }

    pub fn get<'w, T: Component>(&self, world: &'w World) -> &'w T {
        world.get(self.current_or_panic())
    }

    pub fn get_mut<'w, T: Component>(&self, world: &'w mut World) -> &'w mut T {
        world.get_mut(self.current_or_panic())
    }
}

impl Drop for View {
    fn drop(&mut self) {
        if self.open {
            warn!("view dropped before being exhausted, deferred reclamation will not commit");
        }
    }
}
