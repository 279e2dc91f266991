pub mod catalog;
pub mod collectors;
pub mod config;
pub mod errors;
pub mod export;
pub mod monitor;
pub mod resolver;
pub mod server;
pub mod store;
