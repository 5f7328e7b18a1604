#![allow(dead_code)]

use arrow::array::{Float64Array, Int64Array, RecordBatch, StringArray};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use parquet::arrow::ArrowWriter;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tablepulse_core::{ObjectStore, RemoteObject, ReportGenerator, Result, TablePulseError};

/// In-memory object store preserving listing order, with injectable
/// per-key failures and call recording.
pub struct MemStore {
    objects: Vec<(String, Vec<u8>)>,
    fail_keys: HashSet<String>,
    pub downloads: Mutex<Vec<String>>,
    pub uploads: Mutex<Vec<String>>,
}

impl MemStore {
    pub fn new(objects: Vec<(&str, &[u8])>) -> Self {
        Self {
            objects: objects
                .into_iter()
                .map(|(k, v)| (k.to_owned(), v.to_vec()))
                .collect(),
            fail_keys: HashSet::new(),
            downloads: Mutex::new(Vec::new()),
            uploads: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_on(mut self, key: &str) -> Self {
        self.fail_keys.insert(key.to_owned());
        self
    }

    pub fn download_count(&self) -> usize {
        self.downloads.lock().unwrap().len()
    }
}

impl ObjectStore for MemStore {
    async fn list(&self, _bucket: &str, prefix: &str) -> Result<Vec<RemoteObject>> {
        Ok(self
            .objects
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| RemoteObject {
                key: k.clone(),
                size: v.len() as u64,
            })
            .collect())
    }

    async fn get(&self, _bucket: &str, key: &str, dest: &Path) -> Result<u64> {
        if self.fail_keys.contains(key) {
            return Err(TablePulseError::Storage(format!("injected failure: {key}")));
        }
        let data = self
            .objects
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
            .ok_or_else(|| TablePulseError::Storage(format!("no such key: {key}")))?;
        std::fs::write(dest, &data)?;
        self.downloads.lock().unwrap().push(key.to_owned());
        Ok(data.len() as u64)
    }

    async fn put(&self, _src: &Path, _bucket: &str, key: &str) -> Result<()> {
        self.uploads.lock().unwrap().push(key.to_owned());
        Ok(())
    }
}

/// Records report invocations instead of writing anything.
#[derive(Default)]
pub struct RecordingReport {
    pub calls: Mutex<Vec<(PathBuf, usize)>>, // (output path, column count)
}

impl ReportGenerator for RecordingReport {
    fn generate(&self, batch: &RecordBatch, output: &Path) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push((output.to_path_buf(), batch.num_columns()));
        Ok(())
    }
}

pub fn fixture_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new("amount", DataType::Float64, true),
        Field::new("flag", DataType::Utf8, true),
    ]))
}

/// 10 rows: ids 0..10, `amount` null at rows 1, 5, 9, `flag` alternating.
pub fn fixture_batch() -> RecordBatch {
    let ids = Int64Array::from((0..10).collect::<Vec<i64>>());
    let amounts = Float64Array::from(
        (0..10)
            .map(|i| if i % 4 == 1 { None } else { Some(i as f64 * 1.5) })
            .collect::<Vec<Option<f64>>>(),
    );
    let flags = StringArray::from(
        (0..10)
            .map(|i| Some(if i % 2 == 0 { "a" } else { "b" }))
            .collect::<Vec<Option<&str>>>(),
    );
    RecordBatch::try_new(
        fixture_schema(),
        vec![Arc::new(ids), Arc::new(amounts), Arc::new(flags)],
    )
    .unwrap()
}

pub fn write_parquet(path: &Path, schema: SchemaRef, batches: &[RecordBatch]) {
    let file = std::fs::File::create(path).unwrap();
    let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
    for batch in batches {
        writer.write(batch).unwrap();
    }
    writer.close().unwrap();
}
