//! Property-based invariants over the pure orchestration pieces: the
//! progress formula, count monotonicity and bounds, report idempotence,
//! terminal-state absorption, and queue ordering.

use std::collections::HashSet;

use proptest::prelude::*;
use serde_json::json;
use uuid::Uuid;

use patanalyse_core::config::BatchCoreConfig;
use patanalyse_core::models::{
    progress_for, AnalysisResult, BatchConfiguration, BatchJob, WorkItem,
};
use patanalyse_core::orchestration::WorkItemQueue;
use patanalyse_core::state_machine::{BatchEvent, BatchState, BatchStateMachine};

fn job_with_items(total: u32) -> BatchJob {
    let items = (0..total).map(|i| json!({ "index": i })).collect();
    BatchJob::new(
        "user-1".to_string(),
        None,
        "sweep".to_string(),
        "patent_analysis".to_string(),
        "prior_art".to_string(),
        items,
        1,
        BatchConfiguration::defaults_from(&BatchCoreConfig::default()),
    )
}

/// One simulated outcome report, possibly a duplicate of an earlier one.
#[derive(Debug, Clone)]
struct Report {
    index: u32,
    success: bool,
}

fn report_strategy(total: u32) -> impl Strategy<Value = Vec<Report>> {
    prop::collection::vec(
        (0..total, any::<bool>()).prop_map(|(index, success)| Report { index, success }),
        0..(total as usize * 3 + 1),
    )
}

proptest! {
    #[test]
    fn progress_matches_formula(completed in 0u32..500, failed in 0u32..500, headroom in 0u32..500) {
        let total = completed + failed + headroom;
        prop_assume!(total > 0);
        let progress = progress_for(completed, failed, total);
        let expected =
            (100.0 * f64::from(completed + failed) / f64::from(total)).round() as u8;
        prop_assert_eq!(progress, expected);
        prop_assert!(progress <= 100);
    }

    /// Applying any report sequence with duplicates through the
    /// index-set guard counts each index at most once, keeps counts
    /// monotone and bounded, and keeps the error log in lockstep with
    /// the failure count.
    #[test]
    fn duplicate_reports_count_at_most_once(total in 1u32..12, reports in report_strategy(12)) {
        let mut job = job_with_items(total);
        let mut completed_indexes: HashSet<u32> = HashSet::new();
        let mut failed_indexes: HashSet<u32> = HashSet::new();
        let mut last_accounted = 0u32;

        for report in reports {
            if report.index >= total {
                continue;
            }
            let already_counted = completed_indexes.contains(&report.index)
                || failed_indexes.contains(&report.index);
            if already_counted {
                continue;
            }
            if report.success {
                completed_indexes.insert(report.index);
                job.record_success(report.index, AnalysisResult::new(json!({})));
            } else {
                failed_indexes.insert(report.index);
                job.record_failure(report.index, "scripted failure".to_string());
            }

            let accounted = job.completed_items + job.failed_items;
            prop_assert!(accounted >= last_accounted, "counts must be non-decreasing");
            prop_assert!(accounted <= job.total_items);
            last_accounted = accounted;
        }

        prop_assert_eq!(job.completed_items as usize, completed_indexes.len());
        prop_assert_eq!(job.failed_items as usize, failed_indexes.len());
        prop_assert_eq!(job.error_log.len() as u32, job.failed_items);
        prop_assert_eq!(
            job.progress,
            progress_for(job.completed_items, job.failed_items, job.total_items)
        );
        prop_assert_eq!(job.results.len() as u32, job.completed_items);
    }

    /// No event sequence produces more than one terminal transition.
    #[test]
    fn at_most_one_terminal_transition(event_codes in prop::collection::vec(0u8..4, 1..20)) {
        let mut state = BatchState::Queued;
        let mut terminal_transitions = 0;

        for code in event_codes {
            let event = match code {
                0 => BatchEvent::Start,
                1 => BatchEvent::Complete,
                2 => BatchEvent::Fail("scripted".to_string()),
                _ => BatchEvent::Cancel,
            };
            if let Ok(next) = BatchStateMachine::determine_target_state(state, &event) {
                if next.is_terminal() {
                    terminal_transitions += 1;
                }
                state = next;
            }
        }

        prop_assert!(terminal_transitions <= 1);
    }

    /// Dequeue order is exactly (priority descending, enqueue sequence
    /// ascending), regardless of how batches interleave at enqueue time.
    #[test]
    fn queue_orders_by_priority_then_sequence(priorities in prop::collection::vec(-5i32..6, 1..6)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        runtime.block_on(async {
            let queue = WorkItemQueue::new();
            let mut expected: Vec<(i32, u64, Uuid)> = Vec::new();
            let mut seq = 0u64;

            for (batch_number, priority) in priorities.iter().enumerate() {
                let batch_id = Uuid::new_v4();
                let items: Vec<WorkItem> = (0..2)
                    .map(|i| WorkItem::new(batch_id, i, json!({ "batch": batch_number })))
                    .collect();
                queue.enqueue_batch(batch_id, items, *priority, 64).unwrap();
                for _ in 0..2 {
                    expected.push((*priority, seq, batch_id));
                    seq += 1;
                }
            }

            expected.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

            for (priority, _, batch_id) in expected {
                let item = queue.dequeue().await.expect("queue should not be closed");
                assert_eq!(item.batch_id, batch_id, "wrong batch for priority {priority}");
                queue.release(item.batch_id);
            }
        });
    }
}
