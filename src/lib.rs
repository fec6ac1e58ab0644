pub mod cli;
pub mod config;
pub mod error;
pub mod fetch;
pub mod models;
pub mod normalize;
pub mod pipelines;
pub mod state;
pub mod utils;
pub mod warehouse;

pub use error::{IngestError, Result};
