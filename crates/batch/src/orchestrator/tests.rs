use std::collections::BTreeSet;

use pretty_assertions::assert_eq;
use tokio::time::Instant;

use super::*;
use crate::error::HostError;
use crate::testing::{RecordingHost, RecordingRequester};

fn orchestrator(host: &Arc<RecordingHost>, interval: Duration) -> Orchestrator {
	let config = CoreConfig {
		interval,
		..CoreConfig::default()
	};
	Orchestrator::new(host.clone(), config)
}

fn console(requester: &Arc<RecordingRequester>) -> Invocation {
	Invocation::new(InvocationContext::Console, requester.clone())
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn range_batch_runs_in_order_and_replies() {
	let host = RecordingHost::new();
	let orch = orchestrator(&host, Duration::from_secs(1));
	let requester = RecordingRequester::new();
	let invocation = Invocation::new(InvocationContext::Player("Steve".into()), requester.clone());

	let started = Instant::now();
	let handle = orch.run_range_batch(BatchDescriptor::range("test", 1, 3, "spawn").unwrap(), invocation).unwrap();
	assert_eq!(handle.id(), BatchId(1));
	let report = handle.report().await.expect("batch report");

	assert_eq!(started.elapsed(), Duration::from_secs(2));
	assert_eq!(report.outcome, BatchOutcome::Completed);
	assert_eq!(host.commands(), vec![
		"execute as Steve at @s run player bot_test1 spawn",
		"execute as Steve at @s run player bot_test2 spawn",
		"execute as Steve at @s run player bot_test3 spawn",
	]);
	assert_eq!(requester.replies(), vec![(ReplyKind::Info, "operated bot_test[1-3] with `spawn`".to_string())]);
	assert!(orch.active_batches().is_empty());
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn non_spawn_actions_are_not_paced() {
	let host = RecordingHost::new();
	let orch = orchestrator(&host, Duration::from_secs(5));
	let requester = RecordingRequester::new();

	let started = Instant::now();
	let handle = orch.run_range_batch(BatchDescriptor::range("t", 1, 4, "jump").unwrap(), console(&requester)).unwrap();
	handle.report().await.expect("batch report");
	assert_eq!(started.elapsed(), Duration::ZERO);
	assert_eq!(host.commands().len(), 4);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn shape_mismatch_is_rejected_synchronously() {
	let host = RecordingHost::new();
	let orch = orchestrator(&host, Duration::ZERO);
	let requester = RecordingRequester::new();

	let range = BatchDescriptor::range("t", 1, 3, "spawn").unwrap();
	let err = orch.run_line_batch(range, console(&requester)).unwrap_err();
	assert_eq!(err, ValidationError::ShapeMismatch { expected: "line", found: "range" });
	assert!(orch.active_batches().is_empty());
	tokio::task::yield_now().await;
	assert!(host.commands().is_empty());
	assert!(requester.replies().is_empty());
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn line_and_grid_reply_with_their_geometry() {
	let host = RecordingHost::new();
	let orch = orchestrator(&host, Duration::ZERO);
	let requester = RecordingRequester::new();

	let line = BatchDescriptor::line("l", 1, 2, "+x", 3.0, "spawn").unwrap();
	orch.run_line_batch(line, console(&requester)).unwrap().report().await.expect("line report");
	let grid = BatchDescriptor::grid("g", 1, 5, "+x", "+z", 2.0, None, "spawn").unwrap();
	orch.run_grid_batch(grid, console(&requester)).unwrap().report().await.expect("grid report");

	assert_eq!(requester.replies(), vec![
		(ReplyKind::Info, "spawned line bot_l[1-2] towards +x, spacing 3".to_string()),
		(ReplyKind::Warning, "5 actors do not fill a 3-wide grid; the last row of bot_g[1-5] is 1 short".to_string()),
		(ReplyKind::Info, "spawned grid bot_g[1-5] along +x×+z, spacing 2".to_string()),
	]);
	assert_eq!(host.commands()[..2], ["player bot_l1 spawn at ~0 ~ ~".to_string(), "player bot_l2 spawn at ~3 ~ ~".to_string()]);
	assert_eq!(host.commands().last().map(String::as_str), Some("player bot_g5 spawn at ~2 ~ ~2"));
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn stop_is_idempotent_and_reports_progress() {
	let host = RecordingHost::new();
	let orch = orchestrator(&host, Duration::from_secs(1));
	let requester = RecordingRequester::new();

	let first = orch.run_range_batch(BatchDescriptor::range("a", 1, 5, "spawn").unwrap(), console(&requester)).unwrap();
	let second = orch.run_range_batch(BatchDescriptor::range("b", 1, 5, "spawn").unwrap(), console(&requester)).unwrap();
	tokio::time::sleep(Duration::from_millis(1500)).await;
	assert_eq!(orch.active_batches().len(), 2);

	assert_eq!(orch.request_stop(), StopSummary { batches: 2, cleared: 0 });
	assert_eq!(orch.request_stop(), StopSummary::default());

	for handle in [first, second] {
		let report = handle.report().await.expect("batch report");
		assert_eq!(report.outcome, BatchOutcome::Stopped { last_completed: Some(2) });
	}
	assert_eq!(host.commands().len(), 4);
	let replies = requester.replies();
	assert!(replies.iter().all(|(kind, _)| *kind == ReplyKind::Warning));
	assert!(replies.iter().any(|(_, msg)| msg == "batch bot_a[1-5] stopped; last completed index 2"));
	assert!(orch.active_batches().is_empty());
	assert_eq!(orch.request_stop(), StopSummary::default(), "stop with nothing running is a no-op");
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn stop_does_not_leak_into_later_batches() {
	let host = RecordingHost::new();
	let orch = orchestrator(&host, Duration::from_secs(1));
	let requester = RecordingRequester::new();

	let stopped = orch.run_range_batch(BatchDescriptor::range("a", 1, 3, "spawn").unwrap(), console(&requester)).unwrap();
	orch.request_stop();
	assert!(stopped.report().await.expect("report").is_stopped());

	let later = orch.run_range_batch(BatchDescriptor::range("b", 1, 3, "spawn").unwrap(), console(&requester)).unwrap();
	let report = later.report().await.expect("report");
	assert_eq!(report.outcome, BatchOutcome::Completed);
	assert_eq!(host.count_containing("bot_b"), 3);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn stopping_one_batch_leaves_the_others_running() {
	let host = RecordingHost::new();
	let orch = orchestrator(&host, Duration::from_secs(1));
	let requester = RecordingRequester::new();
	let follow = |name: &str| {
		BatchDescriptor::range(name, 1, 3, "spawn")
			.unwrap()
			.with_follow_ups(["look north".to_string()])
			.unwrap()
	};

	let first = orch.run_range_batch(follow("a"), console(&requester)).unwrap();
	let second = orch.run_range_batch(follow("b"), console(&requester)).unwrap();
	tokio::time::sleep(Duration::from_millis(500)).await;
	assert_eq!(orch.pending_actors(), vec![ActorId::from("bot_a1"), ActorId::from("bot_b1")]);

	assert_eq!(orch.request_stop_batch(first.id()), Some(StopSummary { batches: 1, cleared: 1 }));
	assert_eq!(orch.request_stop_batch(BatchId(42)), None);
	assert_eq!(orch.pending_actors(), vec![ActorId::from("bot_b1")]);

	assert_eq!(first.report().await.expect("report").outcome, BatchOutcome::Stopped { last_completed: Some(1) });
	assert_eq!(second.report().await.expect("report").outcome, BatchOutcome::Completed);
	assert_eq!(host.count_containing("bot_b"), 3);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn joined_actor_fires_follow_ups_once() {
	let host = RecordingHost::new();
	let orch = orchestrator(&host, Duration::ZERO);
	let requester = RecordingRequester::new();
	let desc = BatchDescriptor::range("f", 1, 1, "spawn").unwrap().with_follow_ups(["use once".to_string()]).unwrap();

	orch.run_range_batch(desc, console(&requester)).unwrap().report().await.expect("report");
	assert!(orch.actor_joined("bot_f1"));
	assert!(!orch.actor_joined("bot_f1"));
	assert_eq!(orch.poll_readiness(), 0);

	tokio::time::sleep(Duration::from_secs(1)).await;
	assert_eq!(host.commands(), vec!["player bot_f1 spawn", "player bot_f1 use once"]);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn poll_loop_covers_missed_join() {
	let host = RecordingHost::new();
	let orch = orchestrator(&host, Duration::ZERO);
	let requester = RecordingRequester::new();
	let desc = BatchDescriptor::range("f", 1, 1, "spawn").unwrap().with_follow_ups(["jump".to_string()]).unwrap();

	orch.run_range_batch(desc, console(&requester)).unwrap().report().await.expect("report");
	host.set_online(&["bot_f1"]);
	tokio::time::sleep(Duration::from_secs(2)).await;
	assert_eq!(host.count_containing("bot_f1 jump"), 1);
	assert!(orch.pending_actors().is_empty());
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn init_sequence_survives_a_never_ready_actor() {
	let host = RecordingHost::new();
	let orch = orchestrator(&host, Duration::ZERO);
	let requester = RecordingRequester::new();
	let desc = InitDescriptor::new("test", 1, 2, 1.0, 2.0, "kill").unwrap();

	let started = Instant::now();
	let report = orch.run_init_sequence(desc, console(&requester)).unwrap().report().await.expect("report");
	assert_eq!(started.elapsed(), Duration::from_secs(24));
	assert_eq!(report.outcome, BatchOutcome::Completed);
	assert_eq!(host.commands(), vec!["player bot_test1 spawn", "player bot_test1 kill", "player bot_test2 spawn", "player bot_test2 kill"]);
	assert_eq!(requester.replies(), vec![(ReplyKind::Info, "init sequence bot_test[1-2] finished".to_string())]);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn failed_commands_turn_the_reply_into_an_error() {
	let host = RecordingHost::new();
	host.fail_commands_containing("bot_t2");
	let orch = orchestrator(&host, Duration::ZERO);
	let requester = RecordingRequester::new();

	let report = orch.run_range_batch(BatchDescriptor::range("t", 1, 3, "jump").unwrap(), console(&requester)).unwrap().report().await.expect("report");
	assert_eq!(report.failed, 1);
	assert_eq!(requester.replies(), vec![(ReplyKind::Error, "batch bot_t[1-3] finished with 1 failed commands, see the server log".to_string())]);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn active_batches_track_progress() {
	let host = RecordingHost::new();
	let orch = orchestrator(&host, Duration::from_secs(1));
	let requester = RecordingRequester::new();

	let handle = orch.run_range_batch(BatchDescriptor::range("p", 1, 4, "spawn").unwrap(), console(&requester)).unwrap();
	tokio::time::sleep(Duration::from_millis(1500)).await;
	let active = orch.active_batches();
	assert_eq!(active.len(), 1);
	assert_eq!((active[0].label.as_str(), active[0].completed, active[0].total), ("bot_p[1-4]", 2, 4));

	handle.report().await.expect("report");
	assert!(orch.active_batches().is_empty());
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn huge_range_starts_without_materializing_commands() {
	let host = RecordingHost::new();
	let orch = orchestrator(&host, Duration::from_secs(1));
	let requester = RecordingRequester::new();

	let desc = BatchDescriptor::range("h", 0, 2_000_000_000, "spawn").unwrap();
	let handle = orch.run_range_batch(desc, console(&requester)).unwrap();
	tokio::time::sleep(Duration::from_millis(500)).await;
	let active = orch.active_batches();
	assert_eq!((active[0].label.as_str(), active[0].completed, active[0].total), ("bot_h[0-2000000000]", 1, 2_000_000_001));

	orch.request_stop();
	let report = handle.report().await.expect("report");
	assert_eq!(report.outcome, BatchOutcome::Stopped { last_completed: Some(0) });
	assert_eq!((report.total, report.issued), (2_000_000_001, 1));
	assert_eq!(host.commands(), vec!["player bot_h0 spawn"]);
}

struct PanickingHost;

impl ServerHost for PanickingHost {
	fn execute(&self, command: &str) -> Result<(), HostError> {
		panic!("host exploded on {command}");
	}

	fn online_actors(&self) -> Result<BTreeSet<String>, HostError> {
		Ok(BTreeSet::new())
	}
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn panicking_batch_is_contained_and_reported() {
	let orch = Orchestrator::new(Arc::new(PanickingHost), CoreConfig::default());
	let requester = RecordingRequester::new();

	let handle = orch.run_range_batch(BatchDescriptor::range("x", 1, 2, "jump").unwrap(), console(&requester)).unwrap();
	assert!(handle.report().await.is_none());
	tokio::time::sleep(Duration::from_millis(1)).await;
	assert_eq!(requester.replies(), vec![(ReplyKind::Error, "batch failed unexpectedly, see the server log".to_string())]);
	assert!(orch.active_batches().is_empty());

	let requester = RecordingRequester::new();
	let next = orch.run_range_batch(BatchDescriptor::range("y", 1, 1, "jump").unwrap(), console(&requester)).unwrap();
	assert!(next.report().await.is_none(), "orchestrator keeps accepting batches");
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn shutdown_stops_batches_and_drains_work() {
	let host = RecordingHost::new();
	let orch = orchestrator(&host, Duration::from_secs(1));
	let requester = RecordingRequester::new();
	let desc = BatchDescriptor::range("s", 1, 10, "spawn").unwrap().with_follow_ups(["jump".to_string()]).unwrap();

	let handle = orch.run_range_batch(desc, console(&requester)).unwrap();
	tokio::time::sleep(Duration::from_millis(1500)).await;
	let report = orch.shutdown(Duration::from_secs(5)).await;

	assert!(report.completed());
	assert!(!report.timed_out());
	assert_eq!(handle.report().await.expect("report").outcome, BatchOutcome::Stopped { last_completed: Some(2) });
	assert!(orch.pending_actors().is_empty());
}
