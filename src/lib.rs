pub mod archive;
pub mod commands;
pub mod config;
pub mod error;
pub mod manager;
pub mod package;
pub mod repository;
pub mod runtime;
