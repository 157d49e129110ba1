#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{executor_over, storage_with};
use filechain_core::errors::ExErrorKind;
use filechain_core::model::{DataType, Row, Schema};
use filechain_core::{CancellationToken, Executor, ExecutorConfig, Plan, Workers};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[test]
fn test_cancel_before_execute() {
    let exec = executor_over(Arc::new(storage_with(&["a.txt"])), 1);
    exec.cancellation_token().cancel();

    let err = Plan::from_storage("mem://docs").collect(&exec).unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::Cancelled);
    assert_eq!(err.stage_index(), Some(0));
}

#[test]
fn test_cancel_during_expand_stops_dispatch() {
    let paths: Vec<String> = (0..200).map(|i| format!("f{:03}.txt", i)).collect();
    let refs: Vec<&str> = paths.iter().map(String::as_str).collect();
    let token = CancellationToken::new();
    let exec = Executor::new(
        Arc::new(storage_with(&refs)),
        ExecutorConfig::default().with_workers(Workers::Fixed(2)),
    )
    .unwrap()
    .with_cancellation(token.clone());

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let schema = Schema::new().with_field("n", DataType::Int);
    let plan = Plan::from_storage("mem://docs").expand("cancel_after_three", schema, move |_row, _ctx| {
        if counter.fetch_add(1, Ordering::SeqCst) == 2 {
            token.cancel();
        }
        Ok(vec![Ok::<_, filechain_core::UdfError>(Row::new().with("n", 1))])
    });

    let err = plan.collect(&exec).unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::Cancelled);
    assert_eq!(err.stage(), Some("expand(cancel_after_three)"));
    // Only invocations already in flight may run after the signal.
    assert!(calls.load(Ordering::SeqCst) < 200);
}
