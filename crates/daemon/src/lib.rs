// Re-export modules for library use
pub mod app;
pub mod cli;
pub mod config;
