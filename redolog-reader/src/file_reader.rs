use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use metrics::counter;
use redolog_core::event::RedoLog;
use redolog_core::reader::RedoError;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, BufReader};
use tokio::sync::Mutex;
use tracing::warn;

use crate::frames::{decode_frame_size, is_torn_entry, FRAME_SIZE_BYTES};
use crate::reader_metrics::{REDO_RECORDS_READ_TOTAL, REDO_TORN_TAILS_TOTAL};

/// Cursor over a single redo log file.
///
/// `read_next` decodes one record at a time and distinguishes three ends:
/// clean end-of-file, a torn tail (reported as end-of-file), and genuine
/// corruption. The internal mutex makes the cursor safe to share.
#[derive(Debug)]
pub struct FileReader {
    inner: Mutex<FileReaderInner>,
    file_name: String,
    // Shared open-handle counter owned by the facade, for leak accounting
    handles: Arc<AtomicUsize>,
}

#[derive(Debug)]
struct FileReaderInner {
    reader: Option<BufReader<File>>,
    // Byte offset just past the last successfully decoded record; anchors
    // the sector alignment of the torn-entry check
    last_valid_offset: i64,
}

impl FileReader {
    /// Open `path` read-only. The shared `handles` counter is incremented
    /// here and decremented on `close` (or drop).
    pub async fn open(path: &Path, handles: Arc<AtomicUsize>) -> Result<FileReader, RedoError> {
        let file = File::open(path)
            .await
            .map_err(|e| RedoError::FileIo(format!("open redo log {}: {}", path.display(), e)))?;
        handles.fetch_add(1, Ordering::AcqRel);
        Ok(FileReader {
            inner: Mutex::new(FileReaderInner {
                reader: Some(BufReader::new(file)),
                last_valid_offset: 0,
            }),
            file_name: path.display().to_string(),
            handles,
        })
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Decode the next record, or `Ok(None)` at end of stream.
    ///
    /// A torn tail is reported as end of stream: the writer appends records
    /// atomically up to sector granularity, so a zeroed sector can only be
    /// the final, never-completed entry.
    pub async fn read_next(&self) -> Result<Option<RedoLog>, RedoError> {
        let mut inner = self.inner.lock().await;
        let last_valid_offset = inner.last_valid_offset;
        let reader = match inner.reader.as_mut() {
            Some(r) => r,
            // a closed reader reads as exhausted
            None => return Ok(None),
        };

        let mut len_buf = [0u8; FRAME_SIZE_BYTES as usize];
        match reader.read_exact(&mut len_buf).await {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => {
                return Err(RedoError::FileIo(format!(
                    "read frame header from {}: {}",
                    self.file_name, e
                )))
            }
        }
        let (rec_bytes, pad_bytes) = decode_frame_size(i64::from_le_bytes(len_buf));

        let mut payload = vec![0u8; (rec_bytes + pad_bytes) as usize];
        let mut filled = 0usize;
        while filled < payload.len() {
            let n = reader.read(&mut payload[filled..]).await.map_err(|e| {
                RedoError::FileIo(format!("read frame payload from {}: {}", self.file_name, e))
            })?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        let payload_offset = last_valid_offset + FRAME_SIZE_BYTES;
        if filled < payload.len() {
            // A frame header with a missing payload is never a clean end of
            // stream; it is either a torn tail or a truncated file.
            if is_torn_entry(&payload[..filled], payload_offset) {
                counter!(REDO_TORN_TAILS_TOTAL.name).increment(1);
                warn!(
                    target = "redo",
                    file = %self.file_name,
                    expected = payload.len(),
                    read = filled,
                    "torn tail behind short frame payload, treating as end of log"
                );
                return Ok(None);
            }
            return Err(RedoError::FileIo(format!(
                "short frame payload in {}: want {} bytes, got {}",
                self.file_name,
                payload.len(),
                filled
            )));
        }

        let log: RedoLog = match bincode::deserialize(&payload[..rec_bytes as usize]) {
            Ok(log) => log,
            Err(e) => {
                if is_torn_entry(&payload, payload_offset) {
                    counter!(REDO_TORN_TAILS_TOTAL.name).increment(1);
                    warn!(
                        target = "redo",
                        file = %self.file_name,
                        "torn tail behind undecodable record, treating as end of log"
                    );
                    return Ok(None);
                }
                return Err(RedoError::Corrupt(format!(
                    "decode record in {}: {}",
                    self.file_name, e
                )));
            }
        };

        inner.last_valid_offset += FRAME_SIZE_BYTES + rec_bytes + pad_bytes;
        counter!(REDO_RECORDS_READ_TOTAL.name).increment(1);
        Ok(Some(log))
    }

    /// Byte offset just past the last successfully decoded record.
    pub async fn last_valid_offset(&self) -> i64 {
        self.inner.lock().await.last_valid_offset
    }

    /// Drop the underlying handle. Idempotent.
    pub async fn close(&self) -> Result<(), RedoError> {
        let mut inner = self.inner.lock().await;
        if inner.reader.take().is_some() {
            self.handles.fetch_sub(1, Ordering::AcqRel);
        }
        Ok(())
    }
}

impl Drop for FileReader {
    fn drop(&mut self) {
        if self.inner.get_mut().reader.take().is_some() {
            self.handles.fetch_sub(1, Ordering::AcqRel);
        }
    }
}
