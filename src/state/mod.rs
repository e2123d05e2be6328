pub mod json_store;
pub mod store;

pub use json_store::{create_shared_store, JsonStore};
pub use store::{require_season, SharedStore, Store, Write, WriteBatch};
