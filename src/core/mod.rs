pub mod aggregate;
pub mod buffer;
pub mod cache;
pub mod calendar;
pub mod composite;
pub mod compression;
pub mod config;
pub mod constants;
pub mod data_handle;
pub mod engine;
pub mod error;
pub mod export;
pub mod format;
pub mod psychro;
pub mod reader;
pub mod scheduler;
pub mod service;
pub mod transport;
