pub mod analyzers;
pub mod archive;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod geocoding;
pub mod lockdown;
pub mod models;
pub mod processors;
pub mod readers;
pub mod utils;
pub mod writers;

pub use error::{ProcessingError, Result};
