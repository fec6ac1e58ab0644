pub mod watermarks;

pub use watermarks::{Advance, WatermarkStore};
