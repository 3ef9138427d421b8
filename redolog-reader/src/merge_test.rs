#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    use redolog_core::event::{RedoLog, RedoRowChangedEvent, RowChangedEvent, TableName};
    use redolog_core::reader::RedoError;
    use tempfile::TempDir;
    use tokio_util::sync::CancellationToken;

    use crate::file_reader::FileReader;
    use crate::frames::encode_frame_size;
    use crate::merge::MergeReader;

    fn make_row(commit_ts: u64, table: &str) -> RedoLog {
        RedoLog::Row(RedoRowChangedEvent {
            row: RowChangedEvent {
                start_ts: commit_ts.saturating_sub(1),
                commit_ts,
                table: TableName {
                    schema: "test".to_string(),
                    table: table.to_string(),
                    table_id: 1,
                },
                columns: vec![],
                pre_columns: vec![],
            },
        })
    }

    async fn write_log_file(path: &Path, commit_ts: &[u64], table: &str) {
        let mut bytes = Vec::new();
        for ts in commit_ts {
            let rec = bincode::serialize(&make_row(*ts, table)).unwrap();
            let (len_field, pad_bytes) = encode_frame_size(rec.len() as i64);
            bytes.extend_from_slice(&len_field.to_le_bytes());
            bytes.extend_from_slice(&rec);
            bytes.extend(std::iter::repeat(0u8).take(pad_bytes as usize));
        }
        tokio::fs::write(path, bytes).await.unwrap();
    }

    async fn merge_over(
        tmp: &TempDir,
        files: &[(&str, &[u64])],
        start_ts: u64,
        end_ts: u64,
    ) -> MergeReader {
        let handles = Arc::new(AtomicUsize::new(0));
        let mut readers = Vec::new();
        for (name, commits) in files {
            let path = tmp.path().join(name);
            write_log_file(&path, commits, name).await;
            readers.push(FileReader::open(&path, handles.clone()).await.unwrap());
        }
        MergeReader::new(readers, start_ts, end_ts)
    }

    fn commits(batch: &[RedoLog]) -> Vec<u64> {
        batch.iter().map(|l| l.commit_ts()).collect()
    }

    #[tokio::test]
    async fn test_two_file_merge() {
        let tmp = TempDir::new().unwrap();
        let mut merge = merge_over(
            &tmp,
            &[("a.log", &[5, 20, 40]), ("b.log", &[10, 30, 50])],
            0,
            100,
        )
        .await;

        let ctx = CancellationToken::new();
        let batch = merge.read_next_batch(&ctx, 10).await.unwrap();
        assert_eq!(commits(&batch), vec![5, 10, 20, 30, 40, 50]);
        assert!(merge.read_next_batch(&ctx, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_window_filter() {
        let tmp = TempDir::new().unwrap();
        let mut merge = merge_over(
            &tmp,
            &[("a.log", &[5, 20, 40]), ("b.log", &[10, 30, 50])],
            15,
            35,
        )
        .await;

        let ctx = CancellationToken::new();
        let batch = merge.read_next_batch(&ctx, 10).await.unwrap();
        assert_eq!(commits(&batch), vec![20, 30]);
        assert!(merge.read_next_batch(&ctx, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cap_and_resume() {
        let tmp = TempDir::new().unwrap();
        let mut merge = merge_over(
            &tmp,
            &[("a.log", &[5, 20, 40]), ("b.log", &[10, 30, 50])],
            0,
            100,
        )
        .await;

        let ctx = CancellationToken::new();
        let first = merge.read_next_batch(&ctx, 3).await.unwrap();
        assert_eq!(commits(&first), vec![5, 10, 20]);
        let rest = merge.read_next_batch(&ctx, 10).await.unwrap();
        assert_eq!(commits(&rest), vec![30, 40, 50]);
    }

    #[tokio::test]
    async fn test_ties_break_by_source_index() {
        let tmp = TempDir::new().unwrap();
        let mut merge =
            merge_over(&tmp, &[("a.log", &[10, 20]), ("b.log", &[10, 20])], 0, 100).await;

        let ctx = CancellationToken::new();
        let batch = merge.read_next_batch(&ctx, 10).await.unwrap();
        assert_eq!(commits(&batch), vec![10, 10, 20, 20]);
        // within a tie, the lower source index is delivered first
        let tables: Vec<&str> = batch
            .iter()
            .map(|l| match l {
                RedoLog::Row(e) => e.row.table.table.as_str(),
                RedoLog::Ddl(_) => unreachable!(),
            })
            .collect();
        assert_eq!(tables, vec!["a.log", "b.log", "a.log", "b.log"]);
    }

    #[tokio::test]
    async fn test_events_past_window_end_are_not_delivered() {
        let tmp = TempDir::new().unwrap();
        let mut merge = merge_over(
            &tmp,
            &[("a.log", &[5, 20, 40]), ("b.log", &[10, 30, 50])],
            0,
            30,
        )
        .await;

        let ctx = CancellationToken::new();
        let batch = merge.read_next_batch(&ctx, 10).await.unwrap();
        assert_eq!(commits(&batch), vec![5, 10, 20, 30]);
        assert!(merge.read_next_batch(&ctx, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cancellation_mid_stream() {
        let tmp = TempDir::new().unwrap();
        let mut merge = merge_over(&tmp, &[("a.log", &[5, 20, 40])], 0, 100).await;

        let ctx = CancellationToken::new();
        ctx.cancel();
        assert!(matches!(
            merge.read_next_batch(&ctx, 10).await,
            Err(RedoError::Canceled)
        ));

        // a fresh token picks the stream back up without losing events
        let ctx = CancellationToken::new();
        let batch = merge.read_next_batch(&ctx, 10).await.unwrap();
        assert_eq!(commits(&batch), vec![5, 20, 40]);
    }

    #[tokio::test]
    async fn test_close_aggregates_and_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let mut merge =
            merge_over(&tmp, &[("a.log", &[5]), ("b.log", &[10])], 0, 100).await;
        merge.close().await.unwrap();
        merge.close().await.unwrap();
    }
}
