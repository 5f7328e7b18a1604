use crate::cancel::CancelToken;
use crate::reference::MainTable;
use crate::report::ReportGenerator;
use arrow::array::{Array, Float64Array, RecordBatch};
use arrow::compute::cast;
use arrow::datatypes::DataType;
use arrow::util::display::{ArrayFormatter, FormatOptions};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::path::{Path, PathBuf};
use tablepulse_common::{AnalyzeConfig, Result, TablePulseError};
use tracing::{error, info};

/// Null statistics for one column of one chunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissingValueRecord {
    pub file_name: String,
    pub chunk_index: usize,
    pub column: String,
    pub row_count: usize,
    pub null_count: usize,
    /// Share of null rows within this chunk, 0..=100. Per-chunk by design;
    /// `row_count` is carried so a file-level weighting stays derivable.
    pub null_percentage: f64,
}

/// Shape metadata for one column of one chunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnMetadataRecord {
    pub file_name: String,
    pub chunk_index: usize,
    pub column: String,
    pub distinct_count: usize,
    pub data_type: String,
    /// Pearson correlation against the target column, for numeric columns in
    /// chunks that carry a target. None for the target itself, non-numeric
    /// columns, and degenerate (constant or empty) pairs.
    pub target_correlation: Option<f64>,
}

#[derive(Debug, Default)]
pub struct ProfileResults {
    pub missing: Vec<MissingValueRecord>,
    pub metadata: Vec<ColumnMetadataRecord>,
}

/// Profile every columnar file under `cfg.input_folder`, streaming each in
/// `chunk_size`-row chunks. A chunk is truncated (testing), projected,
/// target-joined, reported on, measured, then dropped; only the per-column
/// records accumulate. Schema errors abort the run; any other per-file
/// failure is logged and that file's records are discarded.
pub fn profile_dir<R: ReportGenerator>(
    cfg: &AnalyzeConfig,
    report: &R,
    cancel: &CancelToken,
) -> Result<ProfileResults> {
    let out_dir = cfg.final_output_dir();
    std::fs::create_dir_all(&out_dir)?;

    let files = list_columnar_files(&cfg.input_folder, &cfg.exclude_files)?;
    if files.is_empty() {
        info!(folder = %cfg.input_folder.display(), "no columnar files to profile");
        return Ok(ProfileResults::default());
    }

    let main = load_main_table(cfg)?;
    let mut results = ProfileResults::default();
    for path in files {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_owned();
        info!(file = %file_name, "profiling");
        match profile_file(&path, &file_name, cfg, main.as_ref(), report, &out_dir, cancel) {
            Ok((missing, metadata)) => {
                results.missing.extend(missing);
                results.metadata.extend(metadata);
            }
            Err(e @ TablePulseError::ColumnNotFound { .. }) => return Err(e),
            Err(e @ TablePulseError::Cancelled) => return Err(e),
            Err(e) => error!(file = %file_name, "profiling failed, file skipped: {e}"),
        }
    }
    Ok(results)
}

fn list_columnar_files(dir: &Path, exclude: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for pattern in ["*.parquet", "*.parquet.gz"] {
        let full = dir.join(pattern);
        files.extend(
            glob::glob(&full.to_string_lossy())
                .map_err(|e| TablePulseError::Other(e.to_string()))?
                .flatten()
                .filter(|p| p.is_file()),
        );
    }
    files.retain(|p| {
        let name = p.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        !exclude.iter().any(|x| x == name)
    });
    files.sort();
    Ok(files)
}

fn load_main_table(cfg: &AnalyzeConfig) -> Result<Option<MainTable>> {
    let (Some(main_file), Some(target), Some(join)) =
        (&cfg.main_file, &cfg.target_column, &cfg.join_column)
    else {
        return Ok(None);
    };
    MainTable::load(&cfg.input_folder.join(main_file), join, target)
}

fn profile_file<R: ReportGenerator>(
    path: &Path,
    file_name: &str,
    cfg: &AnalyzeConfig,
    main: Option<&MainTable>,
    report: &R,
    out_dir: &Path,
    cancel: &CancelToken,
) -> Result<(Vec<MissingValueRecord>, Vec<ColumnMetadataRecord>)> {
    let reader = ParquetRecordBatchReaderBuilder::try_new(File::open(path)?)?
        .with_batch_size(cfg.chunk_size)
        .build()?;
    let stem = artifact_stem(file_name);

    let mut missing = Vec::new();
    let mut metadata = Vec::new();
    for (chunk_index, batch) in reader.enumerate() {
        if cancel.is_cancelled() {
            return Err(TablePulseError::Cancelled);
        }
        let mut batch = batch?;

        if cfg.testing && batch.num_rows() > cfg.max_lines {
            batch = batch.slice(0, cfg.max_lines);
        }
        if let Some(columns) = &cfg.extract_columns {
            batch = project_columns(&batch, columns, file_name)?;
        }
        if let Some(main) = main {
            batch = main.join_target(&batch)?;
        }

        let report_batch = match &cfg.analyze_columns {
            Some(columns) => project_columns(&batch, columns, file_name)?,
            None => batch.clone(),
        };
        let report_path = out_dir.join(format!("{stem}_chunk{chunk_index}_report.html"));
        if let Err(e) = report.generate(&report_batch, &report_path) {
            error!(file = %file_name, chunk = chunk_index, "report generation failed: {e}");
        }

        let rows = batch.num_rows();
        let target = cfg
            .target_column
            .as_deref()
            .and_then(|t| batch.column_by_name(t).cloned());
        for (i, field) in batch.schema().fields().iter().enumerate() {
            let column = batch.column(i);
            let nulls = column.null_count();
            let null_percentage = if rows > 0 {
                100.0 * nulls as f64 / rows as f64
            } else {
                0.0 // zero-row chunk, fail closed rather than divide
            };
            missing.push(MissingValueRecord {
                file_name: file_name.to_owned(),
                chunk_index,
                column: field.name().clone(),
                row_count: rows,
                null_count: nulls,
                null_percentage,
            });
            let target_correlation = match &target {
                Some(t) if Some(field.name().as_str()) != cfg.target_column.as_deref() => {
                    correlation(column.as_ref(), t.as_ref())?
                }
                _ => None,
            };
            metadata.push(ColumnMetadataRecord {
                file_name: file_name.to_owned(),
                chunk_index,
                column: field.name().clone(),
                distinct_count: distinct_count(column.as_ref())?,
                data_type: field.data_type().to_string(),
                target_correlation,
            });
        }
    }
    Ok((missing, metadata))
}

/// Project `batch` to exactly `columns`. A requested column that is absent is
/// a configuration bug and fails loudly instead of being dropped.
fn project_columns(batch: &RecordBatch, columns: &[String], file_name: &str) -> Result<RecordBatch> {
    let schema = batch.schema();
    let mut indices = Vec::with_capacity(columns.len());
    for column in columns {
        match schema.column_with_name(column) {
            Some((idx, _)) => indices.push(idx),
            None => {
                return Err(TablePulseError::ColumnNotFound {
                    column: column.clone(),
                    file: file_name.to_owned(),
                })
            }
        }
    }
    Ok(batch.project(&indices)?)
}

/// Exact count of distinct non-null values, on the display form of each
/// value. Bounded by the chunk size, so no sketching is needed.
fn distinct_count(array: &dyn Array) -> Result<usize> {
    let options = FormatOptions::default();
    let formatter = ArrayFormatter::try_new(array, &options)?;
    let mut seen = HashSet::new();
    for row in 0..array.len() {
        if !array.is_null(row) {
            seen.insert(formatter.value(row).to_string());
        }
    }
    Ok(seen.len())
}

/// Pearson correlation over rows where both sides are non-null. Non-numeric
/// columns yield None, as do pairs with fewer than two points or zero
/// variance on either side.
fn correlation(column: &dyn Array, target: &dyn Array) -> Result<Option<f64>> {
    if !column.data_type().is_numeric() || !target.data_type().is_numeric() {
        return Ok(None);
    }
    let x = cast(column, &DataType::Float64)?;
    let y = cast(target, &DataType::Float64)?;
    let (Some(x), Some(y)) = (
        x.as_any().downcast_ref::<Float64Array>(),
        y.as_any().downcast_ref::<Float64Array>(),
    ) else {
        return Ok(None);
    };

    let (mut n, mut sx, mut sy, mut sxx, mut syy, mut sxy) = (0f64, 0f64, 0f64, 0f64, 0f64, 0f64);
    for row in 0..x.len() {
        if x.is_null(row) || y.is_null(row) {
            continue;
        }
        let (a, b) = (x.value(row), y.value(row));
        n += 1.0;
        sx += a;
        sy += b;
        sxx += a * a;
        syy += b * b;
        sxy += a * b;
    }
    if n < 2.0 {
        return Ok(None);
    }
    let denom = ((n * sxx - sx * sx) * (n * syy - sy * sy)).sqrt();
    if denom <= 0.0 || !denom.is_finite() {
        return Ok(None);
    }
    Ok(Some((n * sxy - sx * sy) / denom))
}

/// "app_train.parquet.gz" → "app_train"; report names derive from this.
fn artifact_stem(file_name: &str) -> &str {
    file_name
        .strip_suffix(".parquet.gz")
        .or_else(|| file_name.strip_suffix(".parquet"))
        .unwrap_or(file_name)
}
