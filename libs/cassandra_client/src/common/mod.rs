//! Common utilities shared across the client

pub mod error;

pub use error::{ClientError, ClientFuture, ClientResult, RpcError};
