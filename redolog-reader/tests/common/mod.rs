use std::collections::HashMap;
use std::path::Path;

use redolog_core::event::{
    DdlEvent, RedoDdlEvent, RedoLog, RedoRowChangedEvent, RowChangedEvent, TableName,
};
use redolog_core::meta::LogMeta;

/// Creates a row-change record with the given commit ts.
pub fn make_row(commit_ts: u64) -> RedoLog {
    RedoLog::Row(RedoRowChangedEvent {
        row: RowChangedEvent {
            start_ts: commit_ts.saturating_sub(1),
            commit_ts,
            table: TableName {
                schema: "test".to_string(),
                table: "t1".to_string(),
                table_id: 47,
            },
            columns: vec![],
            pre_columns: vec![],
        },
    })
}

/// Creates a DDL record with the given commit ts.
pub fn make_ddl(commit_ts: u64) -> RedoLog {
    RedoLog::Ddl(RedoDdlEvent {
        ddl: DdlEvent {
            start_ts: commit_ts.saturating_sub(1),
            commit_ts,
            query: format!("ALTER TABLE t1 COMMENT 'at {}'", commit_ts),
        },
    })
}

/// Frames one serialized record the way the writer does: an 8-byte length
/// field (padding length in the top byte when set) followed by the record
/// and zero padding to an 8-byte multiple.
pub fn encode_frame(rec: &[u8]) -> Vec<u8> {
    let rec_len = rec.len() as i64;
    let pad = (8 - rec_len % 8) % 8;
    let len_field = if pad == 0 {
        rec_len
    } else {
        (rec_len as u64 | (0x80 | pad as u64) << 56) as i64
    };
    let mut out = len_field.to_le_bytes().to_vec();
    out.extend_from_slice(rec);
    out.extend(std::iter::repeat(0u8).take(pad as usize));
    out
}

/// Serializes and frames a sequence of records into one log file body.
pub fn encode_log_body(records: &[RedoLog]) -> Vec<u8> {
    let mut out = Vec::new();
    for rec in records {
        out.extend_from_slice(&encode_frame(&bincode::serialize(rec).unwrap()));
    }
    out
}

/// Writes a log file under `dir` with the given name and records.
pub async fn write_log_file(dir: &Path, name: &str, records: &[RedoLog]) {
    tokio::fs::write(dir.join(name), encode_log_body(records))
        .await
        .unwrap();
}

pub fn encode_meta(checkpoint_ts: u64, resolved_ts: u64) -> Vec<u8> {
    bincode::serialize(&LogMeta {
        checkpoint_ts,
        resolved_ts,
        resolved_ts_list: HashMap::new(),
    })
    .unwrap()
}

/// Writes the single `.meta` file the writer leaves in the directory.
pub async fn write_meta_file(dir: &Path, checkpoint_ts: u64, resolved_ts: u64) {
    tokio::fs::write(
        dir.join("cap_feed_1700000000_meta.meta"),
        encode_meta(checkpoint_ts, resolved_ts),
    )
    .await
    .unwrap();
}

pub fn row_commits(batch: &[RedoRowChangedEvent]) -> Vec<u64> {
    batch.iter().map(|e| e.row.commit_ts).collect()
}
