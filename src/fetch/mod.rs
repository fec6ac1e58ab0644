pub mod client;
pub mod windows;

pub use client::FetchClient;
pub use windows::{DateWindows, FetchWindow};
