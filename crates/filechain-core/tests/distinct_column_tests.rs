#![allow(clippy::unwrap_used, clippy::expect_used)]

use filechain_core::errors::{ExErrorKind, UdfResult};
use filechain_core::model::{Row, Schema, Value};
use filechain_core::storage::MemoryStorage;
use filechain_core::{Executor, ExecutorConfig, Plan, Workers};
use std::sync::Arc;

/// One pose annotation file per clip, listing the frame id of every
/// detected pose. Frames with several people repeat.
fn pose_storage() -> MemoryStorage {
    let storage = MemoryStorage::new();
    storage.put("poses", "clip_a.txt", "0 0 1 3 3 3");
    storage.put("poses", "clip_b.txt", "1 2 2 4");
    storage
}

fn executor(storage: MemoryStorage) -> Executor {
    Executor::new(
        Arc::new(storage),
        ExecutorConfig::default()
            .with_workers(Workers::Fixed(2))
            .with_preserve_order(true),
    )
    .unwrap()
}

fn poses() -> Plan {
    Plan::from_storage("mem://poses").expand("poses", Schema::new(), |row, ctx| {
        let file = row.get("file").and_then(Value::as_file).cloned().unwrap();
        let text = ctx.read_to_string(&file)?;
        let rows: Vec<UdfResult<Row>> = text
            .split_whitespace()
            .map(|id| -> UdfResult<Row> {
                let frame_id: i64 = id.parse()?;
                let frame = Value::Struct(vec![
                    ("frame_id".to_string(), Value::Int(frame_id)),
                    ("clip".to_string(), Value::from(file.stem())),
                ]);
                Ok(Row::new().with("file", file.clone()).with("frame", frame))
            })
            .collect();
        Ok(rows)
    })
}

#[test]
fn test_distinct_frame_ids_in_first_seen_order() {
    let exec = executor(pose_storage());
    let ids = poses()
        .distinct("frame.frame_id")
        .unwrap()
        .collect_column(&exec, "frame.frame_id")
        .unwrap();
    let ids: Vec<i64> = ids.iter().filter_map(Value::as_i64).collect();
    assert_eq!(ids, vec![0, 1, 3, 2, 4]);
}

#[test]
fn test_distinct_keeps_whole_first_row() {
    let exec = executor(pose_storage());
    let snap = poses().distinct("frame.frame_id").unwrap().collect(&exec).unwrap();
    // Frame 1 appears in both clips; the clip_a row comes first.
    let clips = poses()
        .distinct("frame.frame_id")
        .unwrap()
        .collect_column(&exec, "frame.clip")
        .unwrap();
    assert_eq!(snap.len(), 5);
    assert_eq!(clips[1], Value::from("clip_a"));
    assert_eq!(clips[3], Value::from("clip_b"));
}

#[test]
fn test_collect_column_without_distinct_keeps_duplicates() {
    let exec = executor(pose_storage());
    let ids = poses().collect_column(&exec, "frame.frame_id").unwrap();
    assert_eq!(ids.len(), 10);
}

#[test]
fn test_collect_column_missing_field() {
    let exec = executor(pose_storage());
    let err = poses().collect_column(&exec, "frame.person").unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::ColumnNotFound);
    assert_eq!(err.row_index(), Some(0));
    assert_eq!(err.row_path(), Some("clip_a.txt"));
}

#[test]
fn test_collect_column_rejects_malformed_path() {
    let exec = executor(pose_storage());
    let err = poses().collect_column(&exec, "frame..id").unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::InvalidInput);
}
