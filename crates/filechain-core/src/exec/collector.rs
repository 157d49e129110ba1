//! Shared output collector for worker-pool stages.

use crate::model::Row;
use parking_lot::Mutex;

/// Accumulates per-input-row output groups.
///
/// Workers build a whole group in a local buffer and push it in one
/// locked append, so groups never interleave.
#[derive(Debug, Default)]
pub struct GroupCollector {
    groups: Mutex<Vec<(usize, Vec<Row>)>>,
}

impl GroupCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, input_index: usize, rows: Vec<Row>) {
        self.groups.lock().push((input_index, rows));
    }

    /// Flatten the groups, in completion order or sorted by input index.
    pub fn into_rows(self, preserve_order: bool) -> Vec<Row> {
        let mut groups = self.groups.into_inner();
        if preserve_order {
            groups.sort_by_key(|(index, _)| *index);
        }
        groups.into_iter().flat_map(|(_, rows)| rows).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preserve_order_sorts_groups() {
        let collector = GroupCollector::new();
        collector.push(1, vec![Row::new().with("g", 1), Row::new().with("g", 1)]);
        collector.push(0, vec![Row::new().with("g", 0)]);

        let rows = collector.into_rows(true);
        let groups: Vec<i64> = rows
            .iter()
            .map(|r| r.get("g").and_then(|v| v.as_i64()).unwrap())
            .collect();
        assert_eq!(groups, vec![0, 1, 1]);
    }

    #[test]
    fn test_completion_order_keeps_groups_contiguous() {
        let collector = GroupCollector::new();
        collector.push(1, vec![Row::new().with("g", 1).with("i", 0), Row::new().with("g", 1).with("i", 1)]);
        collector.push(0, vec![Row::new().with("g", 0).with("i", 0)]);

        let rows = collector.into_rows(false);
        assert_eq!(rows[0].get("g"), Some(&crate::model::Value::Int(1)));
        assert_eq!(rows[1].get("i"), Some(&crate::model::Value::Int(1)));
        assert_eq!(rows[2].get("g"), Some(&crate::model::Value::Int(0)));
    }
}
