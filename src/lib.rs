pub mod cli;
pub mod config;
pub mod error;
pub mod handler;
pub mod models;
pub mod processors;
pub mod readers;
pub mod storage;
pub mod uploader;
pub mod utils;
pub mod writers;

pub use error::{ProcessingError, Result};
