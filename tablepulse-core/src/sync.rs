use crate::store::ObjectStore;
use std::path::{Path, PathBuf};
use tablepulse_common::{Result, SyncConfig, TablePulseError};
use tracing::{error, info};

/// Mirror a bucket prefix into `local_folder`. An object whose base name
/// already exists locally with an exactly matching byte size is treated as
/// synced and not re-fetched. Per-object download failures are logged and the
/// object is left out of the result; the rest of the batch continues.
pub async fn sync_prefix<S: ObjectStore>(store: &S, cfg: &SyncConfig) -> Result<Vec<PathBuf>> {
    if cfg.bucket.is_empty() {
        return Err(TablePulseError::InvalidConfig("sync.bucket is not set".into()));
    }
    std::fs::create_dir_all(&cfg.local_folder)?;

    let objects = store.list(&cfg.bucket, &cfg.prefix).await?;
    if objects.is_empty() {
        info!(bucket = %cfg.bucket, prefix = %cfg.prefix, "no objects found under prefix");
        return Ok(Vec::new());
    }

    let mut local_files = Vec::new();
    for obj in objects {
        let base = obj.key.rsplit('/').next().unwrap_or(&obj.key);
        if base.is_empty() {
            continue; // prefix placeholder keys (trailing slash) carry no data
        }
        let dest = cfg.local_folder.join(base);
        if let Ok(meta) = std::fs::metadata(&dest) {
            if meta.len() == obj.size {
                info!(key = %obj.key, "skipped, already downloaded and size matches");
                local_files.push(dest);
                continue;
            }
        }
        match store.get(&cfg.bucket, &obj.key, &dest).await {
            Ok(bytes) => {
                info!(key = %obj.key, bytes, "downloaded");
                local_files.push(dest);
            }
            Err(e) => error!(key = %obj.key, "download failed: {e}"),
        }
    }
    info!(
        count = local_files.len(),
        folder = %cfg.local_folder.display(),
        "sync complete"
    );
    Ok(local_files)
}

/// Upload every file under `dir` (recursively) to `bucket` under `prefix`,
/// preserving relative paths with `/` separators. Per-file failures are
/// logged and skipped.
pub async fn upload_dir<S: ObjectStore>(
    store: &S,
    dir: &Path,
    bucket: &str,
    prefix: &str,
) -> Result<usize> {
    if bucket.is_empty() {
        return Err(TablePulseError::InvalidConfig("sync.bucket is not set".into()));
    }
    let mut files = Vec::new();
    collect_files(dir, &mut files)?;
    files.sort();

    let mut uploaded = 0;
    for file in files {
        let rel = file.strip_prefix(dir).unwrap_or(&file);
        let rel_key = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let key = if prefix.is_empty() {
            rel_key
        } else {
            format!("{}/{}", prefix.trim_end_matches('/'), rel_key)
        };
        match store.put(&file, bucket, &key).await {
            Ok(()) => {
                info!(path = %file.display(), key = %key, "uploaded");
                uploaded += 1;
            }
            Err(e) => error!(path = %file.display(), "upload failed: {e}"),
        }
    }
    Ok(uploaded)
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_files(&path, out)?;
        } else {
            out.push(path);
        }
    }
    Ok(())
}
