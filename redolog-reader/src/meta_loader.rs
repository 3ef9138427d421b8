use std::path::Path;

use redolog_core::meta::{LogMeta, META_EXT};
use redolog_core::reader::RedoError;
use tracing::debug;

/// Locate and decode the single `.meta` record in `dir`.
///
/// The writer keeps one meta file per directory; if several are present the
/// first one found wins.
pub(crate) async fn load_meta(dir: &Path) -> Result<LogMeta, RedoError> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| RedoError::FileIo(format!("read log dir {}: {}", dir.display(), e)))?;

    loop {
        let entry = entries
            .next_entry()
            .await
            .map_err(|e| RedoError::FileIo(format!("read log dir {}: {}", dir.display(), e)))?;
        let entry = match entry {
            Some(entry) => entry,
            None => return Err(RedoError::MetaMissing(dir.display().to_string())),
        };
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.ends_with(META_EXT) {
            continue;
        }

        let path = entry.path();
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| RedoError::FileIo(format!("read meta file {}: {}", path.display(), e)))?;
        let meta: LogMeta = bincode::deserialize(&bytes)
            .map_err(|e| RedoError::Corrupt(format!("decode meta file {}: {}", path.display(), e)))?;
        debug!(
            target = "redo",
            file = %path.display(),
            checkpoint_ts = meta.checkpoint_ts,
            resolved_ts = meta.resolved_ts,
            "loaded redo meta"
        );
        return Ok(meta);
    }
}
