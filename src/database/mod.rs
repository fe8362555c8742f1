pub mod manager;
pub mod models;
pub mod pagination;
pub mod patch;

pub use manager::{DatabaseError, DatabaseManager};
pub use pagination::{Page, PageQuery, Pagination};
