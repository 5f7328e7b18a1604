use crate::profile::ProfileResults;
use crate::reference::ColumnCatalog;
use arrow::array::{ArrayRef, Float64Array, RecordBatch, StringArray, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema};
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, GzipLevel};
use parquet::file::properties::WriterProperties;
use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tablepulse_common::Result;

pub const COMBINED_FILE_NAME: &str = "combined_analysis.parquet.gz";

/// Merge the two record streams into one table, matched on the
/// (file, chunk, column) key rather than by position, and left-join the
/// column catalog on column name when one was loaded.
pub fn combine_results(
    results: &ProfileResults,
    catalog: Option<&ColumnCatalog>,
) -> Result<RecordBatch> {
    let metadata_by_key: HashMap<(&str, usize, &str), &crate::profile::ColumnMetadataRecord> =
        results
            .metadata
            .iter()
            .map(|m| ((m.file_name.as_str(), m.chunk_index, m.column.as_str()), m))
            .collect();

    let n = results.missing.len();
    let mut file_names = Vec::with_capacity(n);
    let mut chunks = Vec::with_capacity(n);
    let mut columns = Vec::with_capacity(n);
    let mut row_counts = Vec::with_capacity(n);
    let mut null_counts = Vec::with_capacity(n);
    let mut null_pcts = Vec::with_capacity(n);
    let mut distinct_counts: Vec<Option<u64>> = Vec::with_capacity(n);
    let mut data_types: Vec<Option<String>> = Vec::with_capacity(n);
    let mut target_corrs: Vec<Option<f64>> = Vec::with_capacity(n);
    let mut tables: Vec<Option<String>> = Vec::with_capacity(n);
    let mut descriptions: Vec<Option<String>> = Vec::with_capacity(n);

    for rec in &results.missing {
        file_names.push(rec.file_name.clone());
        chunks.push(rec.chunk_index as u64);
        columns.push(rec.column.clone());
        row_counts.push(rec.row_count as u64);
        null_counts.push(rec.null_count as u64);
        null_pcts.push(rec.null_percentage);

        let meta = metadata_by_key.get(&(rec.file_name.as_str(), rec.chunk_index, rec.column.as_str()));
        distinct_counts.push(meta.map(|m| m.distinct_count as u64));
        data_types.push(meta.map(|m| m.data_type.clone()));
        target_corrs.push(meta.and_then(|m| m.target_correlation));

        let entry = catalog.and_then(|c| c.get(&rec.column));
        tables.push(entry.and_then(|e| e.table.clone()));
        descriptions.push(entry.and_then(|e| e.description.clone()));
    }

    let schema = Arc::new(Schema::new(vec![
        Field::new("file_name", DataType::Utf8, false),
        Field::new("chunk", DataType::UInt64, false),
        Field::new("column", DataType::Utf8, false),
        Field::new("row_count", DataType::UInt64, false),
        Field::new("missing_count", DataType::UInt64, false),
        Field::new("missing_pct", DataType::Float64, false),
        Field::new("distinct_count", DataType::UInt64, true),
        Field::new("data_type", DataType::Utf8, true),
        Field::new("target_corr", DataType::Float64, true),
        Field::new("table_name", DataType::Utf8, true),
        Field::new("description", DataType::Utf8, true),
    ]));
    let arrays: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from(file_names)),
        Arc::new(UInt64Array::from(chunks)),
        Arc::new(StringArray::from(columns)),
        Arc::new(UInt64Array::from(row_counts)),
        Arc::new(UInt64Array::from(null_counts)),
        Arc::new(Float64Array::from(null_pcts)),
        Arc::new(UInt64Array::from(distinct_counts)),
        Arc::new(StringArray::from(data_types)),
        Arc::new(Float64Array::from(target_corrs)),
        Arc::new(StringArray::from(tables)),
        Arc::new(StringArray::from(descriptions)),
    ];
    Ok(RecordBatch::try_new(schema, arrays)?)
}

/// Persist the combined table as one gzip-compressed parquet artifact under
/// `out_dir`. Staged through a temp file so a crash mid-write never leaves a
/// plausible-looking final artifact.
pub fn write_combined(batch: &RecordBatch, out_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(out_dir)?;
    let dest = out_dir.join(COMBINED_FILE_NAME);
    let tmp = out_dir.join(format!("{COMBINED_FILE_NAME}.tmp"));

    let props = WriterProperties::builder()
        .set_compression(Compression::GZIP(GzipLevel::default()))
        .build();
    let result = (|| -> Result<()> {
        let mut writer = ArrowWriter::try_new(File::create(&tmp)?, batch.schema(), Some(props))?;
        writer.write(batch)?;
        writer.close()?;
        Ok(())
    })();
    if let Err(e) = result {
        let _ = std::fs::remove_file(&tmp);
        return Err(e);
    }
    std::fs::rename(&tmp, &dest)?;
    Ok(dest)
}
