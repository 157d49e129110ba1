#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{executor_over, storage_with};
use filechain_core::model::{DataType, Row, Schema};
use filechain_core::{Executor, ExecutorConfig, Plan, Value, Workers};
use proptest::prelude::*;
use std::sync::Arc;

/// One file whose Expand emits (bucket, seq) rows for the given buckets.
fn plan_for(buckets: Vec<i64>, descending: bool) -> Plan {
    let schema = Schema::new()
        .with_field("bucket", DataType::Int)
        .with_field("seq", DataType::Int);
    Plan::from_storage("mem://docs")
        .expand("emit", schema, move |_row, _ctx| {
            let rows: Vec<filechain_core::UdfResult<Row>> = buckets
                .iter()
                .enumerate()
                .map(|(seq, b)| Ok(Row::new().with("bucket", *b).with("seq", seq as i64)))
                .collect();
            Ok(rows)
        })
        .order_by("bucket", descending)
        .unwrap()
}

fn pairs(exec: &Executor, plan: &Plan) -> Vec<(i64, i64)> {
    plan.collect(exec)
        .unwrap()
        .rows()
        .iter()
        .map(|r| {
            (
                r.get("bucket").and_then(Value::as_i64).unwrap(),
                r.get("seq").and_then(Value::as_i64).unwrap(),
            )
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_order_by_is_stable(buckets in prop::collection::vec(0i64..4, 0..40), descending in any::<bool>()) {
        let exec = executor_over(Arc::new(storage_with(&["one.txt"])), 1);
        let result = pairs(&exec, &plan_for(buckets.clone(), descending));

        prop_assert_eq!(result.len(), buckets.len());
        for window in result.windows(2) {
            let (b0, s0) = window[0];
            let (b1, s1) = window[1];
            if descending {
                prop_assert!(b0 >= b1);
            } else {
                prop_assert!(b0 <= b1);
            }
            if b0 == b1 {
                // Ties keep emission order.
                prop_assert!(s0 < s1);
            }
        }
    }
}

#[test]
fn test_order_by_nested_file_field_then_limit() {
    let storage = storage_with(&["ccc.txt", "a.txt", "bb.txt"]);
    let exec = Executor::new(
        Arc::new(storage),
        ExecutorConfig::default().with_workers(Workers::Fixed(1)),
    )
    .unwrap();

    let plan = Plan::from_storage("mem://docs")
        .order_by("file.size", true)
        .unwrap()
        .limit(2);
    let snap = plan.collect(&exec).unwrap();
    let paths: Vec<&str> = snap
        .rows()
        .iter()
        .map(|r| r.get("file").and_then(Value::as_file).unwrap().path.as_str())
        .collect();
    assert_eq!(paths, vec!["ccc.txt", "bb.txt"]);
}
