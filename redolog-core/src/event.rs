use serde::{Deserialize, Serialize};

// The replay pipeline identifies everything by the upstream commit timestamp.
// Both event kinds carry one, and the merge layer orders the combined stream
// by it, so the accessors here must stay cheap.

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableName {
    pub schema: String,
    pub table: String,
    // Upstream table ID, used as the key of the per-table resolved ts map
    pub table_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    // Encoded column value; None encodes SQL NULL
    pub value: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowChangedEvent {
    // Timestamp of the transaction start, assigned upstream
    pub start_ts: u64,
    // Timestamp of the transaction commit; the global ordering key
    pub commit_ts: u64,
    pub table: TableName,
    // Row image after the change; empty for deletes
    pub columns: Vec<Column>,
    // Row image before the change; empty for inserts
    pub pre_columns: Vec<Column>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DdlEvent {
    pub start_ts: u64,
    pub commit_ts: u64,
    pub query: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedoRowChangedEvent {
    pub row: RowChangedEvent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedoDdlEvent {
    pub ddl: DdlEvent,
}

/// A single record of the redo log. The serialized form carries the variant
/// tag, so a decoded record knows whether it holds a row change or a DDL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RedoLog {
    Row(RedoRowChangedEvent),
    Ddl(RedoDdlEvent),
}

impl RedoLog {
    /// Commit timestamp of the wrapped event, whichever variant it is.
    pub fn commit_ts(&self) -> u64 {
        match self {
            RedoLog::Row(e) => e.row.commit_ts,
            RedoLog::Ddl(e) => e.ddl.commit_ts,
        }
    }
}
