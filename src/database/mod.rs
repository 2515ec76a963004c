pub mod collection;
pub mod manager;
pub mod models;
pub mod query_builder;
pub mod repository;
pub mod schema;

pub use collection::{Collection, FindQuery};
pub use manager::{DatabaseError, DatabaseManager};
pub use repository::Repository;
