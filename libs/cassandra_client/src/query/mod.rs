//! Resolution of optional call parameters into slice queries

mod args;
mod resolver;

pub use args::{IntoQueryArgs, QueryArg, QueryOptions, WriteOptions};
pub use resolver::{ResolvedQuery, resolve};
