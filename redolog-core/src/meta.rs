use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Smallest block assumed to be written atomically (or observed as all
/// zeros) by the underlying storage on power loss.
pub const SECTOR_SIZE: i64 = 512;

/// Extension of a sealed log file.
pub const LOG_EXT: &str = ".log";
/// Extension suffix of a log file the writer is still appending to.
pub const TMP_EXT: &str = ".tmp";
/// Extension of the meta file.
pub const META_EXT: &str = ".meta";

/// Kind of file emitted by the redo writer, as encoded in its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFileType {
    Row,
    Ddl,
    Meta,
}

impl LogFileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogFileType::Row => "row",
            LogFileType::Ddl => "ddl",
            LogFileType::Meta => "meta",
        }
    }

    pub fn parse(s: &str) -> Option<LogFileType> {
        match s {
            "row" => Some(LogFileType::Row),
            "ddl" => Some(LogFileType::Ddl),
            "meta" => Some(LogFileType::Meta),
            _ => None,
        }
    }
}

impl std::fmt::Display for LogFileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress record persisted by the writer as the single record of the
/// `.meta` file. `checkpoint_ts <= resolved_ts` always holds; the reader
/// only replays windows inside `(checkpoint_ts, resolved_ts]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogMeta {
    pub checkpoint_ts: u64,
    pub resolved_ts: u64,
    // Per-table resolved timestamps, keyed by upstream table ID
    pub resolved_ts_list: HashMap<i64, u64>,
}
