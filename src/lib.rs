pub mod app;
pub mod auth;
pub mod board_view;
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod database;
pub mod error;
pub mod filter;
pub mod handlers;
pub mod middleware;
pub mod ordering;
pub mod scheduler;
pub mod services;
pub mod tracking;
pub mod types;
pub mod visibility;

#[cfg(test)]
pub mod testing;
