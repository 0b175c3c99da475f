pub mod app;
pub mod config;
pub mod discovery;
pub mod engine;
pub mod server;
pub mod shared;
