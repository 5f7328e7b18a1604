use crate::encoding::decoding_reader;
use arrow::array::{Array, ArrayRef, RecordBatch, RecordBatchReader, UInt32Array};
use arrow::compute::{concat_batches, take};
use arrow::csv::reader::Format;
use arrow::csv::ReaderBuilder;
use arrow::datatypes::{Field, FieldRef, Schema};
use arrow::util::display::{ArrayFormatter, FormatOptions};
use encoding_rs::Encoding;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use tablepulse_common::Result;
use tracing::warn;

const REFERENCE_BATCH_ROWS: usize = 65_536;

/// Read a whole reference table into one batch. Dispatches on extension:
/// parquet artifacts go through the parquet reader, anything else is CSV
/// decoded with `encoding` (UTF-8 when `None`).
fn read_table(path: &Path, encoding: Option<&'static Encoding>) -> Result<RecordBatch> {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    if name.ends_with(".parquet") || name.ends_with(".parquet.gz") {
        let reader = ParquetRecordBatchReaderBuilder::try_new(File::open(path)?)?
            .with_batch_size(REFERENCE_BATCH_ROWS)
            .build()?;
        let schema = reader.schema().clone();
        let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;
        return Ok(concat_batches(&schema, batches.iter())?);
    }

    let encoding = encoding.unwrap_or(encoding_rs::UTF_8);
    let format = Format::default().with_header(true);
    let sample = decoding_reader(File::open(path)?, encoding);
    let (schema, _) = format.infer_schema(sample, Some(1000))?;
    let schema = Arc::new(schema);
    let decoded = decoding_reader(File::open(path)?, encoding);
    let reader = ReaderBuilder::new(schema.clone())
        .with_format(format)
        .with_batch_size(REFERENCE_BATCH_ROWS)
        .build(decoded)?;
    let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(concat_batches(&schema, batches.iter())?)
}

fn value_at(formatter: &ArrayFormatter<'_>, array: &dyn Array, row: usize) -> Option<String> {
    if array.is_null(row) {
        None
    } else {
        Some(formatter.value(row).to_string())
    }
}

/// The reference table carrying the target/label column, loaded once per run
/// and held read-only. Keys are matched on their display form, so an integer
/// identifier in the main table lines up with the same identifier in a chunk
/// regardless of inferred width.
pub struct MainTable {
    join_column: String,
    target_column: String,
    index: HashMap<String, u32>,
    target: ArrayRef,
}

impl MainTable {
    /// Returns `None` (with a warning) when the table does not actually carry
    /// the configured join or target column; the run then proceeds unjoined.
    pub fn load(path: &Path, join_column: &str, target_column: &str) -> Result<Option<Self>> {
        let table = read_table(path, None)?;
        let schema = table.schema();
        let Some((key_idx, _)) = schema.column_with_name(join_column) else {
            warn!(file = %path.display(), column = join_column, "join column missing, target join disabled");
            return Ok(None);
        };
        let Some((target_idx, _)) = schema.column_with_name(target_column) else {
            warn!(file = %path.display(), column = target_column, "target column missing, target join disabled");
            return Ok(None);
        };

        let keys = table.column(key_idx);
        let options = FormatOptions::default();
        let formatter = ArrayFormatter::try_new(keys.as_ref(), &options)?;
        let mut index = HashMap::with_capacity(table.num_rows());
        for row in 0..table.num_rows() {
            if let Some(key) = value_at(&formatter, keys.as_ref(), row) {
                index.entry(key).or_insert(row as u32); // first occurrence wins
            }
        }
        Ok(Some(Self {
            join_column: join_column.to_owned(),
            target_column: target_column.to_owned(),
            index,
            target: table.column(target_idx).clone(),
        }))
    }

    pub fn target_column(&self) -> &str {
        &self.target_column
    }

    /// Left-join the target column onto `batch` by join key. Rows without a
    /// match get a null target; no row is ever dropped. Degrades to a no-op
    /// when the batch has no join column or already carries the target.
    pub fn join_target(&self, batch: &RecordBatch) -> Result<RecordBatch> {
        let schema = batch.schema();
        if schema.column_with_name(&self.target_column).is_some() {
            return Ok(batch.clone());
        }
        let Some((key_idx, _)) = schema.column_with_name(&self.join_column) else {
            return Ok(batch.clone());
        };

        let keys = batch.column(key_idx);
        let options = FormatOptions::default();
        let formatter = ArrayFormatter::try_new(keys.as_ref(), &options)?;
        let indices: UInt32Array = (0..keys.len())
            .map(|row| {
                value_at(&formatter, keys.as_ref(), row)
                    .and_then(|key| self.index.get(&key).copied())
            })
            .collect();
        let joined = take(self.target.as_ref(), &indices, None)?;

        let mut fields: Vec<FieldRef> = batch.schema().fields().iter().cloned().collect();
        fields.push(Arc::new(Field::new(
            self.target_column.as_str(),
            joined.data_type().clone(),
            true,
        )));
        let mut columns = batch.columns().to_vec();
        columns.push(joined);
        Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?)
    }
}

#[derive(Debug, Clone, Default)]
pub struct CatalogEntry {
    pub table: Option<String>,
    pub description: Option<String>,
}

/// Column name → human-readable metadata, from the externally maintained
/// description CSV (legacy Latin-1 export, `Row` holds the column name).
pub struct ColumnCatalog {
    entries: HashMap<String, CatalogEntry>,
}

impl ColumnCatalog {
    pub fn load(path: &Path) -> Result<Self> {
        let encoding = Encoding::for_label(b"ISO-8859-1").unwrap_or(encoding_rs::WINDOWS_1252);
        let table = read_table(path, Some(encoding))?;
        let schema = table.schema();
        let Some((name_idx, _)) = schema.column_with_name("Row") else {
            return Err(tablepulse_common::TablePulseError::InvalidConfig(format!(
                "columns description file {} has no 'Row' column",
                path.display()
            )));
        };
        let table_idx = schema.column_with_name("Table").map(|(i, _)| i);
        let desc_idx = schema.column_with_name("Description").map(|(i, _)| i);

        let options = FormatOptions::default();
        let names = table.column(name_idx);
        let name_fmt = ArrayFormatter::try_new(names.as_ref(), &options)?;
        let table_fmt = match table_idx {
            Some(i) => Some(ArrayFormatter::try_new(table.column(i).as_ref(), &options)?),
            None => None,
        };
        let desc_fmt = match desc_idx {
            Some(i) => Some(ArrayFormatter::try_new(table.column(i).as_ref(), &options)?),
            None => None,
        };

        let mut entries = HashMap::with_capacity(table.num_rows());
        for row in 0..table.num_rows() {
            let Some(name) = value_at(&name_fmt, names.as_ref(), row) else {
                continue;
            };
            let entry = CatalogEntry {
                table: match (&table_fmt, table_idx) {
                    (Some(fmt), Some(i)) => value_at(fmt, table.column(i).as_ref(), row),
                    _ => None,
                },
                description: match (&desc_fmt, desc_idx) {
                    (Some(fmt), Some(i)) => value_at(fmt, table.column(i).as_ref(), row),
                    _ => None,
                },
            };
            entries.entry(name).or_insert(entry); // duplicate rows keep the first description
        }
        Ok(Self { entries })
    }

    pub fn get(&self, column: &str) -> Option<&CatalogEntry> {
        self.entries.get(column)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
