pub mod connection;
pub mod repository;
pub mod schema;
pub mod store;

pub use connection::*;
pub use repository::*;
pub use schema::*;
pub use store::*;
