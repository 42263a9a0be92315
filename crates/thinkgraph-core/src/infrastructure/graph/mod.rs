//! Knowledge graph storage backends

mod sqlite;

pub use sqlite::SqliteGraphStore;
