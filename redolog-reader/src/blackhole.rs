use async_trait::async_trait;
use redolog_core::event::{RedoDdlEvent, RedoRowChangedEvent};
use redolog_core::reader::{RedoError, RedoLogReader};
use tokio_util::sync::CancellationToken;

/// A reader over nothing: every batch is empty and the meta window is
/// `(checkpoint=0, resolved=1)`. Substitutable wherever a [`RedoLogReader`]
/// is expected, which keeps applier tests free of fixture directories.
#[derive(Debug, Default)]
pub struct BlackholeReader;

impl BlackholeReader {
    pub fn new() -> BlackholeReader {
        BlackholeReader
    }
}

#[async_trait]
impl RedoLogReader for BlackholeReader {
    async fn reset(
        &self,
        _ctx: &CancellationToken,
        _start_ts: u64,
        _end_ts: u64,
    ) -> Result<(), RedoError> {
        Ok(())
    }

    async fn read_next_row(
        &self,
        _ctx: &CancellationToken,
        _max_events: u64,
    ) -> Result<Vec<RedoRowChangedEvent>, RedoError> {
        Ok(Vec::new())
    }

    async fn read_next_ddl(
        &self,
        _ctx: &CancellationToken,
        _max_events: u64,
    ) -> Result<Vec<RedoDdlEvent>, RedoError> {
        Ok(Vec::new())
    }

    async fn read_meta(&self, _ctx: &CancellationToken) -> Result<(u64, u64), RedoError> {
        Ok((0, 1))
    }

    async fn close(&self) -> Result<(), RedoError> {
        Ok(())
    }
}
