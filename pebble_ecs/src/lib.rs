use std::fmt;

use serde::{Deserialize, Serialize};

pub use config::WorldConfig;
pub use error::EcsError;
pub use pebble_ecs_proc::Component;
pub use world::entity_mut::EntityMut;
pub use world::query::{Query, View, MAX_VIEW_COMPONENTS};
pub use world::{ComponentId, Hook, World};

mod config;
mod error;
mod pool;
mod reclaim;
pub mod world;

type ID = u32;
type Version = u32;

/// Id that marks "no slot". Also the id half of [`Entity::NULL`].
const NULL_ID: ID = ID::MAX;

/// Handle to an entity living in a [`World`].
///
/// A handle is the pair (slot id, version). When an entity is destroyed its slot's version is bumped, so every copy of
/// the old handle stops being valid even after the slot gets reused.
#[derive(Eq, PartialEq, Hash, Copy, Clone, Debug, Serialize, Deserialize)]
pub struct Entity {
    id: ID,
    version: Version,
}

impl Entity {
    /// The reserved all-ones handle. Never valid in any world.
    pub const NULL: Entity = Entity {
        id: NULL_ID,
        version: Version::MAX,
    };

    pub(crate) const fn new(id: ID, version: Version) -> Entity {
        Entity { id, version }
    }

    pub fn id(self) -> u32 {
        self.id
    }

    pub fn version(self) -> u32 {
        self.version
    }

    pub fn is_null(self) -> bool {
        self == Entity::NULL
    }

    /// Packs the handle into one word: version in the high half, id in the low half.
    pub fn to_bits(self) -> u64 {
        (u64::from(self.version) << 32) | u64::from(self.id)
    }

    pub fn from_bits(bits: u64) -> Entity {
        Entity {
            id: bits as u32,
            version: (bits >> 32) as u32,
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "null")
        } else {
            write!(f, "{}v{}", self.id, self.version)
        }
    }
}

pub trait Component: 'static {}

#[cfg(test)]
mod entity_test {
    use super::*;

    #[test]
    fn bits() {
        let e = Entity::new(7, 3);
        assert_eq!(e.to_bits(), (3u64 << 32) | 7);
        assert_eq!(Entity::from_bits(e.to_bits()), e);
    }

    #[test]
    fn null_is_all_ones() {
        assert_eq!(Entity::NULL.to_bits(), u64::MAX);
        assert!(Entity::from_bits(u64::MAX).is_null());
        assert!(!Entity::new(0, 0).is_null());
    }

    #[test]
    fn equality_needs_both_halves() {
        assert_ne!(Entity::new(1, 0), Entity::new(1, 1));
        assert_ne!(Entity::new(1, 0), Entity::new(2, 0));
        assert_eq!(Entity::new(1, 0), Entity::new(1, 0));
    }

    #[test]
    fn serializes_as_struct() {
        let json = serde_json::to_string(&Entity::new(4, 2)).unwrap();
        assert_eq!(json, r#"{"id":4,"version":2}"#);
        assert_eq!(serde_json::from_str::<Entity>(&json).unwrap(), Entity::new(4, 2));
    }
}
