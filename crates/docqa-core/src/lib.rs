#![deny(unused_imports)]

pub mod chunk_loader;
pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
