use std::cmp::Reverse;
use std::collections::BinaryHeap;

use redolog_core::event::RedoLog;
use redolog_core::reader::RedoError;
use tokio_util::sync::CancellationToken;

use crate::file_reader::FileReader;

/// Head record of one source file, keyed for the min-heap.
///
/// Ordering is `(commit_ts, source_idx)` ascending; the source index breaks
/// ties so that delivery is deterministic across runs.
#[derive(Debug)]
struct HeapEntry {
    commit_ts: u64,
    source_idx: usize,
    log: RedoLog,
}

impl HeapEntry {
    fn new(source_idx: usize, log: RedoLog) -> HeapEntry {
        HeapEntry {
            commit_ts: log.commit_ts(),
            source_idx,
            log,
        }
    }
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.commit_ts == other.commit_ts && self.source_idx == other.source_idx
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.commit_ts, self.source_idx).cmp(&(other.commit_ts, other.source_idx))
    }
}

/// K-way merge over a set of file readers, yielding events in
/// non-decreasing commit-ts order within the `(start_ts, end_ts]` window.
///
/// The heap holds one undelivered head record per non-exhausted source.
/// Priming is lazy: the first delivery call reads one record from every
/// source. On any non-EOF error the current call rolls its batch back into
/// the heap and returns the error, so a later call can pick up where it
/// stopped.
#[derive(Debug)]
pub(crate) struct MergeReader {
    readers: Vec<FileReader>,
    heap: BinaryHeap<Reverse<HeapEntry>>,
    // Index of the next source to prime; == readers.len() once primed
    next_prime: usize,
    start_ts: u64,
    end_ts: u64,
}

impl MergeReader {
    pub(crate) fn new(readers: Vec<FileReader>, start_ts: u64, end_ts: u64) -> MergeReader {
        MergeReader {
            readers,
            heap: BinaryHeap::new(),
            next_prime: 0,
            start_ts,
            end_ts,
        }
    }

    pub(crate) async fn read_next_batch(
        &mut self,
        ctx: &CancellationToken,
        max_events: u64,
    ) -> Result<Vec<RedoLog>, RedoError> {
        self.prime(ctx).await?;

        let mut delivered: Vec<HeapEntry> = Vec::new();
        while (delivered.len() as u64) < max_events {
            if ctx.is_cancelled() {
                return Err(self.roll_back(delivered, RedoError::Canceled));
            }
            let entry = match self.heap.pop() {
                Some(Reverse(entry)) => entry,
                None => break,
            };
            if entry.commit_ts > self.end_ts {
                // Everything still queued is at least this late; leave the
                // head in place for a (no-op) retry and stop.
                self.heap.push(Reverse(entry));
                break;
            }

            let source_idx = entry.source_idx;
            // Events at or below the window start were already applied;
            // drop them without counting against the cap.
            if entry.commit_ts > self.start_ts {
                delivered.push(entry);
            }

            let refilled = self.readers[source_idx].read_next().await;
            match refilled {
                Ok(Some(log)) => self.heap.push(Reverse(HeapEntry::new(source_idx, log))),
                Ok(None) => {}
                Err(e) => return Err(self.roll_back(delivered, e)),
            }
        }

        Ok(delivered.into_iter().map(|e| e.log).collect())
    }

    /// Read the first record of every source into the heap.
    ///
    /// Kept restartable: if a source errors, the next call resumes priming
    /// at that source instead of re-reading the earlier ones.
    async fn prime(&mut self, ctx: &CancellationToken) -> Result<(), RedoError> {
        if self.next_prime >= self.readers.len() {
            return Ok(());
        }
        let mut heads = Vec::new();
        while self.next_prime < self.readers.len() {
            if ctx.is_cancelled() {
                self.heap.extend(heads);
                return Err(RedoError::Canceled);
            }
            let idx = self.next_prime;
            let head = self.readers[idx].read_next().await;
            match head {
                Ok(Some(log)) => heads.push(Reverse(HeapEntry::new(idx, log))),
                Ok(None) => {}
                Err(e) => {
                    self.heap.extend(heads);
                    return Err(e);
                }
            }
            self.next_prime += 1;
        }
        if self.heap.is_empty() {
            // common case: first call after a reset builds the heap in one go
            self.heap = BinaryHeap::from(heads);
        } else {
            self.heap.extend(heads);
        }
        Ok(())
    }

    fn roll_back(&mut self, delivered: Vec<HeapEntry>, err: RedoError) -> RedoError {
        for entry in delivered {
            self.heap.push(Reverse(entry));
        }
        err
    }

    /// Close every underlying file, aggregating failures.
    pub(crate) async fn close(&mut self) -> Result<(), RedoError> {
        let mut errs = Vec::new();
        for reader in &self.readers {
            if let Err(e) = reader.close().await {
                errs.push(e);
            }
        }
        match RedoError::aggregate(errs) {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
