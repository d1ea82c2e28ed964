//! docbridge
//!
//! Document-store access layer: a typed schema registry for the application's
//! collections, a generic name-indexed CRUD accessor, and a SQL compatibility
//! shim that keeps row-oriented call sites working during the migration to the
//! document store. Connection lifecycle is owned by [`ConnectionManager`],
//! with a development-only in-memory fallback.

pub mod accessor;
pub mod config;
pub mod connection;
pub mod error;
pub mod schema;
pub mod sql;
pub mod store;

pub use accessor::Collections;
pub use config::{Config, Environment};
pub use connection::ConnectionManager;
pub use error::{Result, StoreError};
pub use schema::EntityKind;
pub use sql::{QueryResult, SqlShim};
pub use store::{Document, Filter, FindOptions, SortOrder, Store};
