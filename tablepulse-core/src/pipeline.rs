use crate::aggregate::{combine_results, write_combined};
use crate::cancel::CancelToken;
use crate::convert::convert_dir;
use crate::profile::profile_dir;
use crate::reference::ColumnCatalog;
use crate::report::ReportGenerator;
use crate::store::ObjectStore;
use crate::sync::sync_prefix;
use std::path::PathBuf;
use tablepulse_common::{AnalyzeConfig, PipelineConfig, Result, TablePulseError};
use tracing::info;

/// Profile the columnar folder and persist the combined analysis artifact.
/// Returns the artifact path; this is the pipeline's final output.
pub fn analyze_and_combine<R: ReportGenerator>(
    cfg: &AnalyzeConfig,
    report: &R,
    cancel: &CancelToken,
) -> Result<PathBuf> {
    let results = profile_dir(cfg, report, cancel)?;
    info!(
        missing_records = results.missing.len(),
        metadata_records = results.metadata.len(),
        "profiling complete"
    );

    let catalog = match &cfg.columns_description_file {
        Some(file) => Some(ColumnCatalog::load(&cfg.input_folder.join(file))?),
        None => None,
    };
    let combined = combine_results(&results, catalog.as_ref())?;
    let path = write_combined(&combined, &cfg.final_output_dir())?;
    info!(path = %path.display(), rows = combined.num_rows(), "combined analysis saved");
    Ok(path)
}

/// Run the full sequence: sync remote sources, convert to columnar,
/// profile, aggregate. Stages run strictly in order; each is idempotent and
/// resumable through its own skip logic.
pub async fn run_pipeline<S: ObjectStore, R: ReportGenerator>(
    cfg: &PipelineConfig,
    store: &S,
    report: &R,
    cancel: &CancelToken,
) -> Result<PathBuf> {
    let raw_files = sync_prefix(store, &cfg.sync).await?;
    info!(count = raw_files.len(), "source files in place");
    if cancel.is_cancelled() {
        return Err(TablePulseError::Cancelled);
    }

    let columnar_files = convert_dir(&cfg.convert)?;
    info!(count = columnar_files.len(), "columnar files ready");
    if cancel.is_cancelled() {
        return Err(TablePulseError::Cancelled);
    }

    analyze_and_combine(&cfg.analyze, report, cancel)
}
