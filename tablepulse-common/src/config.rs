use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Remote source settings for the sync stage. `bucket` has no sensible
/// default and must be provided before `sync` or `upload` can run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub bucket: String,
    #[serde(default)]
    pub prefix: String,
    #[serde(default = "default_raw_folder")]
    pub local_folder: PathBuf,
    #[serde(default)]
    pub endpoint_url: Option<String>,
    #[serde(default)]
    pub results_prefix: Option<String>, // key prefix for re-uploading analysis outputs
}

fn default_raw_folder() -> PathBuf {
    PathBuf::from("data/raw")
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            prefix: String::new(),
            local_folder: default_raw_folder(),
            endpoint_url: None,
            results_prefix: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvertConfig {
    #[serde(default = "default_raw_folder")]
    pub input_folder: PathBuf,
    #[serde(default = "default_columnar_folder")]
    pub output_folder: PathBuf,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_skip_existing")]
    pub skip_existing: bool,
}

fn default_columnar_folder() -> PathBuf {
    PathBuf::from("data/columnar")
}
fn default_chunk_size() -> usize {
    50_000
}
fn default_skip_existing() -> bool {
    true
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            input_folder: default_raw_folder(),
            output_folder: default_columnar_folder(),
            chunk_size: default_chunk_size(),
            skip_existing: default_skip_existing(),
        }
    }
}

/// Settings for the profiling stage. `main_file`, `columns_description_file`
/// are resolved relative to `input_folder`. The target join only engages when
/// `main_file`, `target_column`, and `join_column` are all set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeConfig {
    #[serde(default = "default_columnar_folder")]
    pub input_folder: PathBuf,
    #[serde(default = "default_analysis_folder")]
    pub output_folder: PathBuf,
    #[serde(default)]
    pub analyze_columns: Option<Vec<String>>,
    #[serde(default)]
    pub extract_columns: Option<Vec<String>>,
    #[serde(default)]
    pub exclude_files: Vec<String>,
    #[serde(default)]
    pub testing: bool,
    #[serde(default = "default_max_lines")]
    pub max_lines: usize,
    #[serde(default = "default_testing_subfolder")]
    pub testing_output_subfolder: String,
    #[serde(default)]
    pub columns_description_file: Option<String>,
    #[serde(default)]
    pub main_file: Option<String>,
    #[serde(default)]
    pub target_column: Option<String>,
    #[serde(default)]
    pub join_column: Option<String>,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

fn default_analysis_folder() -> PathBuf {
    PathBuf::from("data/analysis")
}
fn default_max_lines() -> usize {
    1000
}
fn default_testing_subfolder() -> String {
    "testing_data".into()
}

impl Default for AnalyzeConfig {
    fn default() -> Self {
        Self {
            input_folder: default_columnar_folder(),
            output_folder: default_analysis_folder(),
            analyze_columns: None,
            extract_columns: None,
            exclude_files: Vec::new(),
            testing: false,
            max_lines: default_max_lines(),
            testing_output_subfolder: default_testing_subfolder(),
            columns_description_file: None,
            main_file: None,
            target_column: None,
            join_column: None,
            chunk_size: default_chunk_size(),
        }
    }
}

impl AnalyzeConfig {
    /// Reports and the combined artifact land here; testing runs are scoped
    /// to a subfolder so they never shadow real outputs.
    pub fn final_output_dir(&self) -> PathBuf {
        if self.testing {
            self.output_folder.join(&self.testing_output_subfolder)
        } else {
            self.output_folder.clone()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PipelineConfig {
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub convert: ConvertConfig,
    #[serde(default)]
    pub analyze: AnalyzeConfig,
}

impl PipelineConfig {
    pub fn load(path: Option<&Path>) -> crate::Result<Self> {
        let path = if let Ok(env_path) = std::env::var("TABLEPULSE_CONFIG") {
            PathBuf::from(env_path) // $TABLEPULSE_CONFIG overrides any explicit path
        } else if let Some(p) = path {
            p.to_path_buf()
        } else {
            PathBuf::from("tablepulse.toml")
        };
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)?;
        let cfg: Self = toml::from_str(&content)
            .map_err(|e| crate::TablePulseError::InvalidConfig(e.to_string()))?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let cfg: PipelineConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.convert.chunk_size, 50_000);
        assert!(cfg.convert.skip_existing);
        assert_eq!(cfg.analyze.max_lines, 1000);
        assert_eq!(cfg.analyze.testing_output_subfolder, "testing_data");
        assert!(!cfg.analyze.testing);
    }

    #[test]
    fn testing_scopes_output_dir() {
        let mut cfg = AnalyzeConfig::default();
        assert_eq!(cfg.final_output_dir(), PathBuf::from("data/analysis"));
        cfg.testing = true;
        assert_eq!(
            cfg.final_output_dir(),
            PathBuf::from("data/analysis/testing_data")
        );
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let cfg: PipelineConfig = toml::from_str(
            r#"
            [analyze]
            target_column = "TARGET"
            join_column = "record_id"
            main_file = "application.parquet.gz"
            chunk_size = 10000
            "#,
        )
        .unwrap();
        assert_eq!(cfg.analyze.chunk_size, 10_000);
        assert_eq!(cfg.analyze.target_column.as_deref(), Some("TARGET"));
        assert_eq!(cfg.convert.chunk_size, 50_000);
    }
}
