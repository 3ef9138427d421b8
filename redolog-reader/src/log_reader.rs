use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use metrics::counter;
use redolog_core::event::{RedoDdlEvent, RedoLog, RedoRowChangedEvent};
use redolog_core::meta::{LogFileType, LogMeta};
use redolog_core::reader::{RedoError, RedoLogReader};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::merge::MergeReader;
use crate::meta_loader::load_meta;
use crate::object_store::{mirror_to_local, BackendConfig, ObjectStore};
use crate::reader_metrics::REDO_EVENTS_DELIVERED_TOTAL;
use crate::selector::select_files;

#[derive(Debug, Clone, Default)]
pub struct LogReaderConfig {
    /// Local directory scanned for (and, with an object store, populated
    /// with) log and meta files.
    pub dir: PathBuf,

    /// When true, remote files are mirrored into `dir` before each reset.
    pub use_object_store: bool,

    /// Remote root, e.g. `s3://logbucket/changefeed?endpoint=...`. Required
    /// when `use_object_store` is set and no store is injected.
    pub object_store_uri: Option<String>,
}

/// Replays a directory of redo log files as two commit-ts-ordered streams.
///
/// One `LogReader` per changefeed; the caller drives it through the
/// [`RedoLogReader`] contract: `read_meta`, `reset`, then drain
/// `read_next_row` / `read_next_ddl` until each returns an empty batch.
/// Row and DDL streams may be drained from different tasks; `reset` is
/// serialized against everything through the facade lock.
#[derive(Debug)]
pub struct LogReader {
    cfg: LogReaderConfig,
    store: Option<ObjectStore>,
    meta: Mutex<Option<LogMeta>>,
    row: Mutex<Option<MergeReader>>,
    ddl: Mutex<Option<MergeReader>>,
    // Serializes concurrent resets; taken before the stream locks
    facade: Mutex<()>,
    // Open OS handles across both streams, for leak accounting
    handles: Arc<AtomicUsize>,
}

impl LogReader {
    /// Build a reader from the config, constructing the object store from
    /// `object_store_uri` when one is requested.
    pub async fn new(ctx: &CancellationToken, cfg: LogReaderConfig) -> Result<LogReader, RedoError> {
        let store = if cfg.use_object_store {
            let uri = cfg.object_store_uri.as_deref().ok_or_else(|| {
                RedoError::ObjectStore("object store enabled without a store uri".to_string())
            })?;
            Some(ObjectStore::new(BackendConfig::from_uri(uri)?)?)
        } else {
            None
        };
        LogReader::with_store(ctx, cfg, store).await
    }

    /// Build a reader around an injected store (or none). Used by tests to
    /// substitute an in-memory backend; `new` funnels here.
    pub async fn with_store(
        ctx: &CancellationToken,
        cfg: LogReaderConfig,
        store: Option<ObjectStore>,
    ) -> Result<LogReader, RedoError> {
        if let Some(store) = &store {
            // fetch the meta eagerly so read_meta works before any reset
            mirror_to_local(ctx, store, &cfg.dir, LogFileType::Meta).await?;
        }
        info!(
            target = "redo",
            dir = %cfg.dir.display(),
            use_object_store = cfg.use_object_store,
            "redo log reader created"
        );
        Ok(LogReader {
            cfg,
            store,
            meta: Mutex::new(None),
            row: Mutex::new(None),
            ddl: Mutex::new(None),
            facade: Mutex::new(()),
            handles: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Number of log files currently held open across both streams.
    pub fn open_file_count(&self) -> usize {
        self.handles.load(Ordering::Acquire)
    }

    async fn reset_stream(
        &self,
        ctx: &CancellationToken,
        slot: &Mutex<Option<MergeReader>>,
        file_type: LogFileType,
        start_ts: u64,
        end_ts: u64,
    ) -> Result<(), RedoError> {
        let mut guard = slot.lock().await;
        if let Some(mut old) = guard.take() {
            old.close().await?;
        }
        if let Some(store) = &self.store {
            mirror_to_local(ctx, store, &self.cfg.dir, file_type).await?;
        }
        let readers =
            select_files(&self.cfg.dir, file_type, start_ts, end_ts, self.handles.clone()).await?;
        info!(
            target = "redo",
            kind = %file_type,
            files = readers.len(),
            start_ts,
            end_ts,
            "redo stream reset"
        );
        *guard = Some(MergeReader::new(readers, start_ts, end_ts));
        Ok(())
    }

    async fn next_batch(
        &self,
        ctx: &CancellationToken,
        slot: &Mutex<Option<MergeReader>>,
        max_events: u64,
    ) -> Result<Vec<RedoLog>, RedoError> {
        let mut guard = slot.lock().await;
        match guard.as_mut() {
            Some(merge) => merge.read_next_batch(ctx, max_events).await,
            // no reset yet: nothing to replay
            None => Ok(Vec::new()),
        }
    }

    async fn close_stream(&self, slot: &Mutex<Option<MergeReader>>) -> Result<(), RedoError> {
        let mut guard = slot.lock().await;
        match guard.take() {
            Some(mut merge) => merge.close().await,
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RedoLogReader for LogReader {
    async fn reset(
        &self,
        ctx: &CancellationToken,
        start_ts: u64,
        end_ts: u64,
    ) -> Result<(), RedoError> {
        if ctx.is_cancelled() {
            return Err(RedoError::Canceled);
        }
        let (checkpoint_ts, resolved_ts) = self.read_meta(ctx).await?;
        if start_ts < checkpoint_ts || end_ts > resolved_ts || start_ts >= end_ts {
            return Err(RedoError::Range(format!(
                "window ({}, {}] must lie inside [{}, {}]",
                start_ts, end_ts, checkpoint_ts, resolved_ts
            )));
        }

        let _guard = self.facade.lock().await;
        let mut errs = Vec::new();
        if let Err(e) = self
            .reset_stream(ctx, &self.row, LogFileType::Row, start_ts, end_ts)
            .await
        {
            errs.push(e);
        }
        if let Err(e) = self
            .reset_stream(ctx, &self.ddl, LogFileType::Ddl, start_ts, end_ts)
            .await
        {
            errs.push(e);
        }
        match RedoError::aggregate(errs) {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn read_next_row(
        &self,
        ctx: &CancellationToken,
        max_events: u64,
    ) -> Result<Vec<RedoRowChangedEvent>, RedoError> {
        if ctx.is_cancelled() {
            return Err(RedoError::Canceled);
        }
        let batch = self.next_batch(ctx, &self.row, max_events).await?;
        let mut out = Vec::with_capacity(batch.len());
        for log in batch {
            match log {
                RedoLog::Row(e) => out.push(e),
                RedoLog::Ddl(_) => {
                    return Err(RedoError::Corrupt(
                        "DDL record found in a row log file".to_string(),
                    ))
                }
            }
        }
        counter!(REDO_EVENTS_DELIVERED_TOTAL.name, "kind" => "row").increment(out.len() as u64);
        Ok(out)
    }

    async fn read_next_ddl(
        &self,
        ctx: &CancellationToken,
        max_events: u64,
    ) -> Result<Vec<RedoDdlEvent>, RedoError> {
        if ctx.is_cancelled() {
            return Err(RedoError::Canceled);
        }
        let batch = self.next_batch(ctx, &self.ddl, max_events).await?;
        let mut out = Vec::with_capacity(batch.len());
        for log in batch {
            match log {
                RedoLog::Ddl(e) => out.push(e),
                RedoLog::Row(_) => {
                    return Err(RedoError::Corrupt(
                        "row record found in a DDL log file".to_string(),
                    ))
                }
            }
        }
        counter!(REDO_EVENTS_DELIVERED_TOTAL.name, "kind" => "ddl").increment(out.len() as u64);
        Ok(out)
    }

    async fn read_meta(&self, ctx: &CancellationToken) -> Result<(u64, u64), RedoError> {
        if ctx.is_cancelled() {
            return Err(RedoError::Canceled);
        }
        let mut guard = self.meta.lock().await;
        if let Some(meta) = guard.as_ref() {
            return Ok((meta.checkpoint_ts, meta.resolved_ts));
        }
        let meta = load_meta(&self.cfg.dir).await?;
        let out = (meta.checkpoint_ts, meta.resolved_ts);
        *guard = Some(meta);
        Ok(out)
    }

    async fn close(&self) -> Result<(), RedoError> {
        let mut errs = Vec::new();
        if let Err(e) = self.close_stream(&self.row).await {
            errs.push(e);
        }
        if let Err(e) = self.close_stream(&self.ddl).await {
            errs.push(e);
        }
        match RedoError::aggregate(errs) {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
