pub mod info;
pub mod sink;

/// One warehouse row: column name to JSON value. The column set is dynamic
/// because the requested metric list decides which fields exist.
pub type Row = serde_json::Map<String, serde_json::Value>;

pub use info::TableInfo;
pub use sink::{LoadSummary, Warehouse, WriteMode};
