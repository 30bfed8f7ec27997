//! Record store: MongoDB client, schemas and the store traits

pub mod memory;
pub mod mongo;
pub mod schemas;
pub mod store;

pub use memory::InMemoryStore;
pub use mongo::MongoClient;
pub use store::{BookStore, MongoStore, UserStore};
