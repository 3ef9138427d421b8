use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::event::{RedoDdlEvent, RedoRowChangedEvent};

#[derive(Debug, Error)]
pub enum RedoError {
    #[error("operation canceled")]
    Canceled,

    #[error("file I/O error: {0}")]
    FileIo(String),

    #[error("object store error: {0}")]
    ObjectStore(String),

    #[error("bad redo file name: {0}")]
    BadName(String),

    #[error("corrupt redo record: {0}")]
    Corrupt(String),

    #[error("no redo meta file found in dir: {0}")]
    MetaMissing(String),

    #[error("replay window out of range: {0}")]
    Range(String),

    #[error("multiple errors: [{}]", join_errors(.0))]
    Multiple(Vec<RedoError>),
}

impl RedoError {
    /// Collapse the errors gathered from a multi-part operation (closing a
    /// set of readers, resetting both streams) into at most one error.
    pub fn aggregate(mut errs: Vec<RedoError>) -> Option<RedoError> {
        match errs.len() {
            0 => None,
            1 => Some(errs.remove(0)),
            _ => Some(RedoError::Multiple(errs)),
        }
    }
}

fn join_errors(errs: &[RedoError]) -> String {
    errs.iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Contract between the redo log reader and the downstream applier.
///
/// The applier loads the meta first, resets the reader to a replay window
/// inside the meta's bounds, then drains both streams batch by batch until
/// each returns an empty batch. `reset` may be called again at any time to
/// rewind and replay a new window.
#[async_trait]
pub trait RedoLogReader: Send + Sync + std::fmt::Debug {
    /// Rewind to the `(start_ts, end_ts]` window, reopening the underlying
    /// files. The window must lie inside the meta's
    /// `[checkpoint_ts, resolved_ts]` bounds.
    async fn reset(
        &self,
        ctx: &CancellationToken,
        start_ts: u64,
        end_ts: u64,
    ) -> Result<(), RedoError>;

    /// Next batch of row changes, at most `max_events` long, non-decreasing
    /// in commit ts. An empty batch means the window is drained.
    async fn read_next_row(
        &self,
        ctx: &CancellationToken,
        max_events: u64,
    ) -> Result<Vec<RedoRowChangedEvent>, RedoError>;

    /// Next batch of DDLs; same ordering and termination contract as
    /// `read_next_row`, on an independent stream.
    async fn read_next_ddl(
        &self,
        ctx: &CancellationToken,
        max_events: u64,
    ) -> Result<Vec<RedoDdlEvent>, RedoError>;

    /// `(checkpoint_ts, resolved_ts)` from the meta file. Cached after the
    /// first successful load.
    async fn read_meta(&self, ctx: &CancellationToken) -> Result<(u64, u64), RedoError>;

    /// Release every open file handle. Idempotent.
    async fn close(&self) -> Result<(), RedoError>;
}
