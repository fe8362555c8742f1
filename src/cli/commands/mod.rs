pub mod migrate;
pub mod recurring;
pub mod server;
