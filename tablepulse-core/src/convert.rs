use crate::encoding::{decoding_reader, sniff_encoding};
use arrow::csv::reader::Format;
use arrow::csv::ReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, GzipLevel};
use parquet::file::properties::WriterProperties;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tablepulse_common::{ConvertConfig, Result, TablePulseError};
use tracing::{error, info, warn};

/// Rows of the decoded stream inspected for schema inference.
const SCHEMA_SAMPLE_ROWS: usize = 1000;

/// Convert every `*.csv` under `input_folder` into a gzip-compressed parquet
/// artifact named `<stem>.parquet.gz` under `output_folder`. With
/// `skip_existing` on, a present output is reused without touching the input.
/// Per-file failures are logged and skipped; the rest continue.
pub fn convert_dir(cfg: &ConvertConfig) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(&cfg.output_folder)?;

    let pattern = cfg.input_folder.join("*.csv");
    let csv_files: Vec<PathBuf> = glob::glob(&pattern.to_string_lossy())
        .map_err(|e| TablePulseError::Other(e.to_string()))?
        .flatten()
        .filter(|p| p.is_file())
        .collect();
    if csv_files.is_empty() {
        warn!(folder = %cfg.input_folder.display(), "no CSV files found in the input folder");
        return Ok(Vec::new());
    }

    let mut outputs = Vec::new();
    for csv_file in csv_files {
        let stem = match csv_file.file_stem().and_then(|s| s.to_str()) {
            Some(s) => s.to_owned(),
            None => continue,
        };
        let dest = cfg.output_folder.join(format!("{stem}.parquet.gz"));
        if cfg.skip_existing && dest.exists() {
            info!(output = %dest.display(), "skipping, output already exists");
            outputs.push(dest);
            continue;
        }
        let tmp = cfg.output_folder.join(format!("{stem}.parquet.gz.tmp"));
        match convert_csv_file(&csv_file, &tmp, &dest, cfg.chunk_size) {
            Ok(rows) => {
                info!(input = %csv_file.display(), output = %dest.display(), rows, "converted");
                outputs.push(dest);
            }
            Err(e) => {
                error!(input = %csv_file.display(), "conversion failed: {e}");
                let _ = std::fs::remove_file(&tmp);
            }
        }
    }
    Ok(outputs)
}

/// Stream one CSV into a single parquet file, one row group per chunk. The
/// output is staged at `tmp` and renamed to `dest` only after the writer
/// closes cleanly, so a failed conversion leaves no artifact behind.
fn convert_csv_file(src: &Path, tmp: &Path, dest: &Path, chunk_size: usize) -> Result<usize> {
    let encoding = sniff_encoding(src)?;
    let format = Format::default().with_header(true);

    let sample = decoding_reader(File::open(src)?, encoding);
    let (schema, _) = format.infer_schema(sample, Some(SCHEMA_SAMPLE_ROWS))?;
    let schema = Arc::new(schema);

    let decoded = decoding_reader(File::open(src)?, encoding);
    let reader = ReaderBuilder::new(schema.clone())
        .with_format(format)
        .with_batch_size(chunk_size)
        .build(decoded)?;

    let props = WriterProperties::builder()
        .set_compression(Compression::GZIP(GzipLevel::default()))
        .set_max_row_group_size(chunk_size)
        .build();
    let mut writer = ArrowWriter::try_new(File::create(tmp)?, schema, Some(props))?;

    let mut total_rows = 0;
    for batch in reader {
        let batch = batch?;
        total_rows += batch.num_rows();
        writer.write(&batch)?;
    }
    writer.close()?;
    std::fs::rename(tmp, dest)?;
    Ok(total_rows)
}
