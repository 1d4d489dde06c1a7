use std::collections::TryReserveError;

use thiserror::Error;

use crate::Entity;

/// Everything that can go wrong while touching a [`World`](crate::World).
///
/// Only [`EcsError::OutOfMemory`] is a runtime condition. The rest are broken contracts: the panicking forms of the
/// world's methods turn them into a panic carrying this error's message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EcsError {
    #[error("entity {entity} is not alive in this world")]
    StaleEntity { entity: Entity },

    #[error("entity {entity} already has a `{component}`")]
    DuplicateComponent {
        entity: Entity,
        component: &'static str,
    },

    #[error("entity {entity} has no `{component}`")]
    MissingComponent {
        entity: Entity,
        component: &'static str,
    },

    #[error("a view needs between 1 and {max} component types, got {count}")]
    ViewArity { count: usize, max: usize },

    #[error("deferred reclamation buffer is full ({capacity} blocks retired while views were open)")]
    ReclaimOverflow { capacity: usize },

    #[error("entity table cannot hold more than {max} slots")]
    EntityLimit { max: usize },

    #[error("out of memory: {0}")]
    OutOfMemory(#[from] TryReserveError),
}

/// Unwraps a contract-checked result, panicking with the error's message.
pub(crate) fn expect_ok<T>(res: Result<T, EcsError>) -> T {
    match res {
        Ok(value) => value,
        Err(err) => panic!("{}", err),
    }
}
