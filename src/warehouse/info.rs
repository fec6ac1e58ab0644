use std::fs::File;

use parquet::file::reader::{FileReader, SerializedFileReader};

use crate::error::Result;
use crate::warehouse::Warehouse;

/// Summary statistics for one warehouse table.
#[derive(Debug, Clone)]
pub struct TableInfo {
    pub name: String,
    pub total_rows: i64,
    pub row_groups: usize,
    pub file_size: u64,
}

impl TableInfo {
    pub fn summary(&self) -> String {
        format!(
            "{:<24} {:>10} rows  {:>3} row group(s)  {:>8.2} MB",
            self.name,
            self.total_rows,
            self.row_groups,
            self.file_size as f64 / 1_048_576.0
        )
    }
}

impl Warehouse {
    /// Names of all tables present in the warehouse, sorted.
    pub fn list_tables(&self) -> Result<Vec<String>> {
        let mut tables = Vec::new();
        for entry in std::fs::read_dir(self.root())? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "parquet") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    tables.push(stem.to_string());
                }
            }
        }
        tables.sort();
        Ok(tables)
    }

    /// Parquet-level statistics for a table; `None` when it does not exist.
    pub fn table_info(&self, table: &str) -> Result<Option<TableInfo>> {
        let path = self.table_path(table);
        if !path.exists() {
            return Ok(None);
        }

        let file = File::open(&path)?;
        let reader = SerializedFileReader::new(file)?;
        let metadata = reader.metadata();

        Ok(Some(TableInfo {
            name: table.to_string(),
            total_rows: metadata.file_metadata().num_rows(),
            row_groups: metadata.num_row_groups(),
            file_size: std::fs::metadata(&path)?.len(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::warehouse::WriteMode;
    use serde_json::json;

    #[test]
    fn test_table_info_and_listing() {
        let dir = tempfile::tempdir().unwrap();
        let warehouse = Warehouse::open(dir.path()).unwrap();

        let mut row = crate::warehouse::Row::new();
        row.insert("region_id".to_string(), json!("3010"));
        warehouse
            .load("avalanche_regions", vec![row], &["region_id"], WriteMode::Replace)
            .unwrap();

        assert_eq!(warehouse.list_tables().unwrap(), vec!["avalanche_regions"]);

        let info = warehouse.table_info("avalanche_regions").unwrap().unwrap();
        assert_eq!(info.total_rows, 1);
        assert!(info.file_size > 0);

        assert!(warehouse.table_info("weather_historic").unwrap().is_none());
    }
}
