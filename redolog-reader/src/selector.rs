use std::path::Path;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

use metrics::counter;
use redolog_core::meta::{LogFileType, TMP_EXT};
use redolog_core::names::parse_log_file_name;
use redolog_core::reader::RedoError;
use tracing::warn;

use crate::file_reader::FileReader;
use crate::reader_metrics::REDO_FILES_OPENED_TOTAL;

/// Open every file in `dir` of the given kind whose commit-ts window
/// intersects `(start_ts, end_ts]`.
///
/// A sealed file is named with the largest commit ts it contains, so it is
/// selected iff `start_ts < file_commit_ts <= end_ts`. An in-progress
/// `.log.tmp` file carries no usable upper bound and is always selected.
/// Unparseable names are skipped with a warning. The returned order is
/// whatever the directory iteration yields.
pub(crate) async fn select_files(
    dir: &Path,
    file_type: LogFileType,
    start_ts: u64,
    end_ts: u64,
    handles: Arc<AtomicUsize>,
) -> Result<Vec<FileReader>, RedoError> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| RedoError::FileIo(format!("read log dir {}: {}", dir.display(), e)))?;

    let mut readers = Vec::new();
    loop {
        let entry = entries
            .next_entry()
            .await
            .map_err(|e| RedoError::FileIo(format!("read log dir {}: {}", dir.display(), e)))?;
        let entry = match entry {
            Some(entry) => entry,
            None => break,
        };
        let name = entry.file_name().to_string_lossy().into_owned();

        let (file_commit_ts, kind) = match parse_log_file_name(&name) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(
                    target = "redo",
                    file = %name,
                    error = %e,
                    "skipping file with unparseable name"
                );
                continue;
            }
        };
        if kind != file_type {
            continue;
        }
        let in_progress = name.ends_with(TMP_EXT);
        if !in_progress && !(file_commit_ts > start_ts && file_commit_ts <= end_ts) {
            continue;
        }

        let path = entry.path();
        readers.push(FileReader::open(&path, handles.clone()).await?);
        counter!(REDO_FILES_OPENED_TOTAL.name, "kind" => file_type.as_str()).increment(1);
    }

    Ok(readers)
}
