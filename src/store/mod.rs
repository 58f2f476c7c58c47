//! Persistence layer: libSQL-backed scoped settings for flow state.

pub mod libsql_backend;
pub mod migrations;
pub mod traits;

pub use libsql_backend::LibSqlBackend;
pub use traits::FlowStore;
