// Session actions emit start/end events correlated by request_id

use filechain_core::core_types::schema::{
    EVENT_END, EVENT_END_ERROR, EVENT_START, OP_LIST_FILES, OP_LOAD, OP_SAVE,
};
use filechain_core::logging_facility::test_capture::init_test_capture;
use filechain_core::{ExecutorConfig, InMemoryRegistry, MemoryStorage, Plan};
use filechain_engine::{apply_engine_command, EngineCommand, EngineCommandResult, Session};
use std::sync::Arc;

fn session() -> Session {
    let storage = MemoryStorage::new();
    storage.put("docs", "a.pdf", b"%PDF".to_vec());
    Session::new(
        Arc::new(storage),
        Arc::new(InMemoryRegistry::new()),
        ExecutorConfig::default(),
    )
    .unwrap()
}

#[test]
fn test_failed_action_logs_start_and_end_error() {
    let capture = init_test_capture();
    let err = session()
        .load("logging_missing_dataset", None)
        .unwrap_err();
    let request_id = err.request_id().unwrap().to_string();

    let events: Vec<_> = capture
        .events_for_op(OP_LOAD)
        .into_iter()
        .filter(|e| e.field("request_id") == Some(request_id.as_str()))
        .collect();
    let kinds: Vec<_> = events.iter().filter_map(|e| e.event.clone()).collect();
    assert_eq!(kinds, vec![EVENT_START.to_string(), EVENT_END_ERROR.to_string()]);
    assert_eq!(events[1].field("err_code"), Some("ERR_DATASET_NOT_FOUND"));
}

#[test]
fn test_successful_save_logs_end_with_duration() {
    let capture = init_test_capture();
    let session = session();
    session
        .save(&Plan::from_storage("mem://docs"), "logging_saved_dataset")
        .unwrap();

    let ends: Vec<_> = capture
        .events_for_op(OP_SAVE)
        .into_iter()
        .filter(|e| e.event.as_deref() == Some(EVENT_END))
        .collect();
    assert!(!ends.is_empty());
    assert!(ends.iter().all(|e| e.field("duration_ms").is_some()));

    let starts = capture
        .events_for_op(OP_SAVE)
        .into_iter()
        .filter(|e| e.event.as_deref() == Some(EVENT_START))
        .count();
    assert!(starts >= 1);
}

#[test]
fn test_list_files_logs_like_other_actions() {
    let capture = init_test_capture();
    let session = session();

    let result = apply_engine_command(
        EngineCommand::ListFiles {
            location: "mem://docs".to_string(),
            glob: None,
        },
        &session,
    )
    .unwrap();
    let EngineCommandResult::Files(files) = result else {
        panic!("expected Files");
    };
    assert_eq!(files.len(), 1);

    let err = apply_engine_command(
        EngineCommand::ListFiles {
            location: "mem://logging_missing_bucket".to_string(),
            glob: None,
        },
        &session,
    )
    .unwrap_err();
    let request_id = err.request_id().unwrap().to_string();

    let events: Vec<_> = capture
        .events_for_op(OP_LIST_FILES)
        .into_iter()
        .filter(|e| e.field("request_id") == Some(request_id.as_str()))
        .collect();
    let kinds: Vec<_> = events.iter().filter_map(|e| e.event.clone()).collect();
    assert_eq!(kinds, vec![EVENT_START.to_string(), EVENT_END_ERROR.to_string()]);
    assert_eq!(events[1].field("err_code"), Some("ERR_STORAGE_UNAVAILABLE"));

    let ends = capture
        .events_for_op(OP_LIST_FILES)
        .into_iter()
        .filter(|e| e.event.as_deref() == Some(EVENT_END))
        .count();
    assert!(ends >= 1);
}
