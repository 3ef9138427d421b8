use std::path::{Path, PathBuf};

use metrics::counter;
use redolog_core::meta::LogFileType;
use redolog_core::names::parse_log_file_name;
use redolog_core::reader::RedoError;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::object_store::ObjectStore;
use crate::reader_metrics::REDO_OBJECTS_MIRRORED_TOTAL;

/// Copy every remote file of the given kind into `dir`, keeping basenames.
///
/// Downloads run concurrently; the first failure cancels the in-flight
/// peers and is reported after all of them have settled. Re-running
/// overwrites existing local copies, so the step is idempotent.
pub(crate) async fn mirror_to_local(
    ctx: &CancellationToken,
    store: &ObjectStore,
    dir: &Path,
    file_type: LogFileType,
) -> Result<(), RedoError> {
    if ctx.is_cancelled() {
        return Err(RedoError::Canceled);
    }
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| RedoError::FileIo(format!("create log dir {}: {}", dir.display(), e)))?;

    let mut selected = Vec::new();
    for path in store.walk("").await? {
        let basename = basename_of(&path);
        match parse_log_file_name(basename) {
            Ok((_, kind)) if kind == file_type => selected.push(path),
            Ok(_) => {}
            Err(e) => {
                warn!(
                    target = "object_store",
                    object = %path,
                    error = %e,
                    "skipping remote object with unparseable name"
                );
            }
        }
    }
    if selected.is_empty() {
        return Ok(());
    }

    let cancel = ctx.child_token();
    let mut tasks = JoinSet::new();
    for path in selected {
        let store = store.clone();
        let dir = dir.to_path_buf();
        let token = cancel.clone();
        tasks.spawn(async move {
            tokio::select! {
                _ = token.cancelled() => Err(RedoError::Canceled),
                res = download_one(&store, &dir, &path) => res,
            }
        });
    }

    let mut first_err: Option<RedoError> = None;
    while let Some(joined) = tasks.join_next().await {
        let res = match joined {
            Ok(res) => res,
            Err(e) => Err(RedoError::ObjectStore(format!("download task failed: {}", e))),
        };
        if let Err(e) = res {
            if first_err.is_none() {
                // cancel the remaining downloads, then keep draining
                cancel.cancel();
                first_err = Some(e);
            }
        }
    }
    match first_err {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

async fn download_one(store: &ObjectStore, dir: &Path, path: &str) -> Result<(), RedoError> {
    let bytes = store.read(path).await?;
    let local: PathBuf = dir.join(basename_of(path));
    tokio::fs::write(&local, &bytes)
        .await
        .map_err(|e| RedoError::FileIo(format!("write {}: {}", local.display(), e)))?;
    counter!(REDO_OBJECTS_MIRRORED_TOTAL.name).increment(1);
    debug!(
        target = "object_store",
        object = %path,
        local = %local.display(),
        size = bytes.len(),
        "mirrored remote log file"
    );
    Ok(())
}

fn basename_of(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
