//! Wire-level and schema types

mod consistency;
mod schema;
mod wire;

pub use consistency::{ConsistencyLevel, ConsistencyLevels, ConsistencyUpdate};
pub use schema::{ColumnFamilyDefinition, ColumnFamilyKind, KeyspaceDefinition};
pub use wire::{
    Column, ColumnOrSuperColumn, ColumnParent, CountResponse, DEFAULT_SLICE_COUNT, Deletion,
    Mutation, MutationMap, SliceRange, SlicePredicate, SliceResponse, SuperColumn,
};
