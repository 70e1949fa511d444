pub mod build;
pub mod commands;
pub mod config;
pub mod error;
pub mod host;
pub mod installer;
pub mod package;
pub mod runtime;
pub mod store;
