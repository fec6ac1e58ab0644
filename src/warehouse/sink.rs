use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use arrow::array::{Array, ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{IngestError, Result};
use crate::utils::constants::DEFAULT_ROW_GROUP_SIZE;
use crate::warehouse::Row;

/// Load disposition for a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Incoming rows supersede existing rows sharing the primary key
    /// (last-writer-wins by load order); other rows are untouched.
    Merge,
    /// Prior table content is discarded before loading.
    Replace,
}

#[derive(Debug, Clone)]
pub struct LoadSummary {
    pub table: String,
    pub rows_incoming: usize,
    pub rows_total: usize,
}

/// Scalar column types the warehouse supports. Event timestamps are kept as
/// ISO strings, the way the upstream APIs serve them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnType {
    Utf8,
    Int64,
    Float64,
    Boolean,
}

impl ColumnType {
    fn as_arrow(self) -> DataType {
        match self {
            ColumnType::Utf8 => DataType::Utf8,
            ColumnType::Int64 => DataType::Int64,
            ColumnType::Float64 => DataType::Float64,
            ColumnType::Boolean => DataType::Boolean,
        }
    }

    fn from_arrow(data_type: &DataType) -> Option<Self> {
        match data_type {
            DataType::Utf8 => Some(ColumnType::Utf8),
            DataType::Int64 => Some(ColumnType::Int64),
            DataType::Float64 => Some(ColumnType::Float64),
            DataType::Boolean => Some(ColumnType::Boolean),
            _ => None,
        }
    }
}

/// Parquet-backed warehouse: one file per table under a root directory,
/// loaded under merge or replace semantics with a schema-evolution contract
/// (columns may be added; an existing column never changes type).
///
/// Writes are serialized internally, so concurrent partition tasks may share
/// one warehouse handle. Each write lands via temp file and atomic rename.
pub struct Warehouse {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl Warehouse {
    pub fn open(root: &Path) -> Result<Self> {
        std::fs::create_dir_all(root)?;
        Ok(Self {
            root: root.to_path_buf(),
            write_lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn table_path(&self, table: &str) -> PathBuf {
        self.root.join(format!("{}.parquet", table))
    }

    /// Load rows into a table under the given disposition.
    pub fn load(
        &self,
        table: &str,
        rows: Vec<Row>,
        primary_key: &[&str],
        mode: WriteMode,
    ) -> Result<LoadSummary> {
        let _guard = self.write_lock.lock().expect("warehouse lock poisoned");
        let path = self.table_path(table);

        if rows.is_empty() {
            if mode == WriteMode::Replace && path.exists() {
                std::fs::remove_file(&path)?;
            }
            debug!(table, "no incoming rows");
            return Ok(LoadSummary {
                table: table.to_string(),
                rows_incoming: 0,
                rows_total: 0,
            });
        }

        let incoming_types = infer_columns(table, &rows)?;

        let (existing_types, existing_rows) = if mode == WriteMode::Merge && path.exists() {
            self.read_table(table)?
        } else {
            (Vec::new(), Vec::new())
        };

        let column_types = unify_schema(table, &existing_types, &incoming_types)?;
        let merged = merge_rows(table, existing_rows, &rows, primary_key)?;

        self.write_table(table, &path, &merged, &column_types)?;

        info!(
            table,
            rows_incoming = rows.len(),
            rows_total = merged.len(),
            mode = ?mode,
            "loaded"
        );

        Ok(LoadSummary {
            table: table.to_string(),
            rows_incoming: rows.len(),
            rows_total: merged.len(),
        })
    }

    /// All rows of a table; empty when the table does not exist yet.
    pub fn read_rows(&self, table: &str) -> Result<Vec<Row>> {
        Ok(self.read_table(table)?.1)
    }

    fn read_table(&self, table: &str) -> Result<(Vec<(String, ColumnType)>, Vec<Row>)> {
        let path = self.table_path(table);
        if !path.exists() {
            return Ok((Vec::new(), Vec::new()));
        }

        let file = File::open(&path)?;
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;

        let mut types: Vec<(String, ColumnType)> = Vec::new();
        let mut rows: Vec<Row> = Vec::new();

        for batch_result in reader {
            let batch = batch_result?;
            let schema = batch.schema();

            if types.is_empty() {
                for field in schema.fields() {
                    let column_type =
                        ColumnType::from_arrow(field.data_type()).ok_or_else(|| {
                            IngestError::schema(
                                table,
                                format!(
                                    "column '{}' has unsupported stored type {}",
                                    field.name(),
                                    field.data_type()
                                ),
                            )
                        })?;
                    types.push((field.name().clone(), column_type));
                }
            }

            for i in 0..batch.num_rows() {
                let mut row = Row::new();
                for ((name, column_type), column) in types.iter().zip(batch.columns()) {
                    if column.is_null(i) {
                        continue;
                    }
                    let value = read_cell(column, *column_type, i);
                    row.insert(name.clone(), value);
                }
                rows.push(row);
            }
        }

        Ok((types, rows))
    }

    fn write_table(
        &self,
        table: &str,
        path: &Path,
        rows: &[Row],
        column_types: &[(String, ColumnType)],
    ) -> Result<()> {
        let fields: Vec<Field> = column_types
            .iter()
            .map(|(name, ty)| Field::new(name, ty.as_arrow(), true))
            .collect();
        let schema = Arc::new(Schema::new(fields));

        let arrays: Vec<ArrayRef> = column_types
            .iter()
            .map(|(name, ty)| build_column(table, rows, name, *ty))
            .collect::<Result<_>>()?;

        let batch = RecordBatch::try_new(schema.clone(), arrays)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&self.root)?;
        {
            let props = WriterProperties::builder()
                .set_compression(Compression::SNAPPY)
                .set_max_row_group_size(DEFAULT_ROW_GROUP_SIZE)
                .build();
            let mut writer = ArrowWriter::try_new(tmp.as_file_mut(), schema, Some(props))?;
            writer.write(&batch)?;
            writer.close()?;
        }
        tmp.persist(path).map_err(|e| e.error)?;

        Ok(())
    }
}

/// Infer the column types of an incoming row set. Mixed integer/float columns
/// widen to float; any other mixed typing within the batch is a violation.
fn infer_columns(table: &str, rows: &[Row]) -> Result<BTreeMap<String, ColumnType>> {
    let mut columns: BTreeMap<String, ColumnType> = BTreeMap::new();

    for row in rows {
        for (name, value) in row {
            let observed = match value {
                Value::Null => continue,
                Value::String(_) => ColumnType::Utf8,
                Value::Bool(_) => ColumnType::Boolean,
                Value::Number(n) => {
                    if n.is_i64() {
                        ColumnType::Int64
                    } else {
                        ColumnType::Float64
                    }
                }
                Value::Array(_) | Value::Object(_) => {
                    return Err(IngestError::schema(
                        table,
                        format!("column '{}' holds a nested value", name),
                    ));
                }
            };

            match columns.get(name) {
                None => {
                    columns.insert(name.clone(), observed);
                }
                Some(current) if *current == observed => {}
                Some(ColumnType::Float64) if observed == ColumnType::Int64 => {}
                Some(ColumnType::Int64) if observed == ColumnType::Float64 => {
                    columns.insert(name.clone(), ColumnType::Float64);
                }
                Some(current) => {
                    return Err(IngestError::schema(
                        table,
                        format!(
                            "column '{}' mixes {:?} and {:?} values",
                            name, current, observed
                        ),
                    ));
                }
            }
        }
    }

    Ok(columns)
}

/// Unify the stored schema with incoming columns. New columns are appended;
/// an existing column changing type is fatal, except integers arriving for a
/// stored float column, which upcast losslessly.
fn unify_schema(
    table: &str,
    existing: &[(String, ColumnType)],
    incoming: &BTreeMap<String, ColumnType>,
) -> Result<Vec<(String, ColumnType)>> {
    let mut unified = Vec::with_capacity(existing.len() + incoming.len());

    for (name, stored) in existing {
        if let Some(observed) = incoming.get(name) {
            let compatible = stored == observed
                || (*stored == ColumnType::Float64 && *observed == ColumnType::Int64);
            if !compatible {
                return Err(IngestError::schema(
                    table,
                    format!(
                        "column '{}' is stored as {:?} but incoming data is {:?}",
                        name, stored, observed
                    ),
                ));
            }
        }
        unified.push((name.clone(), *stored));
    }

    for (name, observed) in incoming {
        if !existing.iter().any(|(n, _)| n == name) {
            unified.push((name.clone(), *observed));
        }
    }

    Ok(unified)
}

/// Apply last-writer-wins merge by primary key: existing rows keep their
/// order, superseded in place; unseen keys append in arrival order.
fn merge_rows(
    table: &str,
    existing: Vec<Row>,
    incoming: &[Row],
    primary_key: &[&str],
) -> Result<Vec<Row>> {
    let mut merged = existing;
    let mut index: HashMap<String, usize> = HashMap::with_capacity(merged.len());

    for (i, row) in merged.iter().enumerate() {
        index.insert(row_key(table, row, primary_key)?, i);
    }

    for row in incoming {
        let key = row_key(table, row, primary_key)?;
        match index.get(&key) {
            Some(&i) => merged[i] = row.clone(),
            None => {
                index.insert(key, merged.len());
                merged.push(row.clone());
            }
        }
    }

    Ok(merged)
}

fn row_key(table: &str, row: &Row, primary_key: &[&str]) -> Result<String> {
    let mut parts = Vec::with_capacity(primary_key.len());
    for column in primary_key {
        let value = row.get(*column).filter(|v| !v.is_null()).ok_or_else(|| {
            IngestError::schema(
                table,
                format!("primary key column '{}' is missing or null", column),
            )
        })?;
        let part = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        parts.push(part);
    }
    Ok(parts.join("\u{1f}"))
}

fn build_column(table: &str, rows: &[Row], name: &str, ty: ColumnType) -> Result<ArrayRef> {
    let type_error = |value: &Value| {
        IngestError::schema(
            table,
            format!("value {} does not fit column '{}' ({:?})", value, name, ty),
        )
    };

    match ty {
        ColumnType::Utf8 => {
            let mut values: Vec<Option<String>> = Vec::with_capacity(rows.len());
            for row in rows {
                values.push(match row.get(name) {
                    None | Some(Value::Null) => None,
                    Some(Value::String(s)) => Some(s.clone()),
                    Some(other) => return Err(type_error(other)),
                });
            }
            Ok(Arc::new(StringArray::from(values)))
        }
        ColumnType::Int64 => {
            let mut values: Vec<Option<i64>> = Vec::with_capacity(rows.len());
            for row in rows {
                values.push(match row.get(name) {
                    None | Some(Value::Null) => None,
                    Some(v) => Some(v.as_i64().ok_or_else(|| type_error(v))?),
                });
            }
            Ok(Arc::new(Int64Array::from(values)))
        }
        ColumnType::Float64 => {
            let mut values: Vec<Option<f64>> = Vec::with_capacity(rows.len());
            for row in rows {
                values.push(match row.get(name) {
                    None | Some(Value::Null) => None,
                    Some(v) => Some(v.as_f64().ok_or_else(|| type_error(v))?),
                });
            }
            Ok(Arc::new(Float64Array::from(values)))
        }
        ColumnType::Boolean => {
            let mut values: Vec<Option<bool>> = Vec::with_capacity(rows.len());
            for row in rows {
                values.push(match row.get(name) {
                    None | Some(Value::Null) => None,
                    Some(v) => Some(v.as_bool().ok_or_else(|| type_error(v))?),
                });
            }
            Ok(Arc::new(BooleanArray::from(values)))
        }
    }
}

fn read_cell(column: &ArrayRef, column_type: ColumnType, i: usize) -> Value {
    match column_type {
        ColumnType::Utf8 => {
            let array = column.as_any().downcast_ref::<StringArray>().unwrap();
            Value::String(array.value(i).to_string())
        }
        ColumnType::Int64 => {
            let array = column.as_any().downcast_ref::<Int64Array>().unwrap();
            Value::Number(array.value(i).into())
        }
        ColumnType::Float64 => {
            let array = column.as_any().downcast_ref::<Float64Array>().unwrap();
            serde_json::Number::from_f64(array.value(i))
                .map(Value::Number)
                .unwrap_or(Value::Null)
        }
        ColumnType::Boolean => {
            let array = column.as_any().downcast_ref::<BooleanArray>().unwrap();
            Value::Bool(array.value(i))
        }
    }
}
