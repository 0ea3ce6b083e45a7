// Engine behavior against in-memory storage, driven by a manual clock so
// ticks are deterministic.

use std::sync::Arc;

use flotilla_core::types::{ActionStatus, JobStatus, NewJob, NewNode};
use flotilla_engine::{ManualClock, Scheduler};
use flotilla_storage::MemoryStore;

const T0: f64 = 1_000.0;

fn new_scheduler() -> (Scheduler, Arc<ManualClock>) {
    let storage = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(T0));
    (Scheduler::new(storage, clock.clone()), clock)
}

fn job(run_time: u64, cpu: f64, memory: i64) -> NewJob {
    NewJob {
        expected_run_time: run_time,
        requests_cpu: cpu,
        requests_memory: memory,
    }
}

fn node(slots: u32, cpu: f64, memory: i64) -> NewNode {
    NewNode {
        jobs_capacity: slots,
        cpu_capacity: cpu,
        memory_capacity: memory,
    }
}

/// Every node's counters must equal the sums over the jobs the index says
/// are placed on it, and stay within capacity.
async fn assert_allocation_invariants(scheduler: &Scheduler) {
    for n in scheduler.get_nodes().await.unwrap() {
        let placed = scheduler
            .get_node_jobs(&n.id)
            .await
            .unwrap()
            .expect("stored node must be known to the index");
        assert_eq!(n.jobs_allocated as usize, placed.len(), "node {}", n.id);
        let cpu: f64 = placed.iter().map(|j| j.requests_cpu).sum();
        let memory: i64 = placed.iter().map(|j| j.requests_memory).sum();
        assert!((n.cpu_allocated - cpu).abs() < 1e-9, "node {}", n.id);
        assert_eq!(n.memory_allocated, memory, "node {}", n.id);
        assert!(n.jobs_allocated <= n.jobs_capacity);
        assert!(n.cpu_allocated <= n.cpu_capacity);
        assert!(n.memory_allocated <= n.memory_capacity);
    }
}

#[tokio::test]
async fn submit_round_trips_through_storage() {
    let (scheduler, _clock) = new_scheduler();
    let id = scheduler.submit_job(job(3, 1.0, 100)).await.unwrap();
    assert_eq!(id, "1");

    let fetched = scheduler.get_job(&id).await.unwrap().unwrap();
    assert_eq!(fetched.status, JobStatus::New);
    assert_eq!(fetched.expected_run_time, 3);
    assert_eq!(fetched.requests_cpu, 1.0);
    assert_eq!(fetched.requests_memory, 100);
    assert_eq!(fetched.created_at, T0);
    assert_eq!(fetched.started_at, None);

    let all = scheduler.get_jobs().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].id, id);
}

#[tokio::test]
async fn id_counters_are_monotonic_and_independent() {
    let (scheduler, _clock) = new_scheduler();
    assert_eq!(scheduler.submit_job(job(1, 0.1, 1)).await.unwrap(), "1");
    assert_eq!(scheduler.submit_job(job(1, 0.1, 1)).await.unwrap(), "2");
    assert_eq!(scheduler.add_node(node(1, 1.0, 10)).await.unwrap(), "1");
    assert_eq!(scheduler.add_node(node(1, 1.0, 10)).await.unwrap(), "2");
}

#[tokio::test]
async fn tick_places_job_and_tracks_allocations() {
    let (scheduler, _clock) = new_scheduler();
    let job_id = scheduler.submit_job(job(4, 2.0, 200)).await.unwrap();
    let node_id = scheduler.add_node(node(20, 2.0, 1000)).await.unwrap();

    scheduler.tick().await.unwrap();

    let running = scheduler.get_job(&job_id).await.unwrap().unwrap();
    assert_eq!(running.status, JobStatus::Running);
    assert_eq!(running.started_at, Some(T0));

    let host = scheduler.get_node(&node_id).await.unwrap().unwrap();
    assert_eq!(host.jobs_allocated, 1);
    assert_eq!(host.cpu_allocated, 2.0);
    assert_eq!(host.memory_allocated, 200);

    let placed = scheduler.get_node_jobs(&node_id).await.unwrap().unwrap();
    assert_eq!(placed.len(), 1);
    assert_eq!(placed[0].id, job_id);
    assert_allocation_invariants(&scheduler).await;
}

#[tokio::test]
async fn job_completes_after_expected_run_time() {
    let (scheduler, clock) = new_scheduler();
    let job_id = scheduler.submit_job(job(4, 2.0, 200)).await.unwrap();
    let node_id = scheduler.add_node(node(20, 2.0, 1000)).await.unwrap();
    scheduler.tick().await.unwrap();

    // Not yet due: started_at + expected_run_time has not passed.
    clock.set(T0 + 3.0);
    scheduler.tick().await.unwrap();
    assert_eq!(
        scheduler.get_job(&job_id).await.unwrap().unwrap().status,
        JobStatus::Running
    );

    clock.set(T0 + 5.0);
    scheduler.tick().await.unwrap();

    let done = scheduler.get_job(&job_id).await.unwrap().unwrap();
    assert_eq!(done.status, JobStatus::Completed);
    assert_eq!(done.started_at, Some(T0));

    let host = scheduler.get_node(&node_id).await.unwrap().unwrap();
    assert_eq!(host.jobs_allocated, 0);
    assert_eq!(host.cpu_allocated, 0.0);
    assert_eq!(host.memory_allocated, 0);
    assert!(scheduler
        .get_node_jobs(&node_id)
        .await
        .unwrap()
        .unwrap()
        .is_empty());
    assert_allocation_invariants(&scheduler).await;
}

#[tokio::test]
async fn job_that_fits_nowhere_stays_pending() {
    let (scheduler, clock) = new_scheduler();
    let job_id = scheduler.submit_job(job(3, 2.0, 100)).await.unwrap();
    let node_id = scheduler.add_node(node(10, 1.0, 1000)).await.unwrap();

    for _ in 0..5 {
        scheduler.tick().await.unwrap();
        clock.advance(30.0);
    }

    let waiting = scheduler.get_job(&job_id).await.unwrap().unwrap();
    assert_eq!(waiting.status, JobStatus::New);
    assert_eq!(waiting.started_at, None);

    let idle = scheduler.get_node(&node_id).await.unwrap().unwrap();
    assert_eq!(idle.jobs_allocated, 0);
    assert_eq!(idle.cpu_allocated, 0.0);
    assert_eq!(idle.memory_allocated, 0);
}

#[tokio::test]
async fn submit_wakes_an_idle_loop() {
    let (scheduler, clock) = new_scheduler();
    scheduler.add_node(node(10, 4.0, 1000)).await.unwrap();
    scheduler.tick().await.unwrap();
    // Second pass with nothing due rolls the deadline a full interval out.
    clock.advance(1.0);
    scheduler.tick().await.unwrap();

    // The loop is now asleep; a submission drags the next pass back to
    // "now", so the very next tick places the job instead of skipping.
    clock.advance(1.0);
    let job_id = scheduler.submit_job(job(5, 1.0, 100)).await.unwrap();
    scheduler.tick().await.unwrap();

    assert_eq!(
        scheduler.get_job(&job_id).await.unwrap().unwrap().status,
        JobStatus::Running
    );
}

#[tokio::test]
async fn terminate_only_applies_to_running_jobs() {
    let (scheduler, clock) = new_scheduler();
    let job_id = scheduler.submit_job(job(100, 1.0, 100)).await.unwrap();
    assert_eq!(
        scheduler.terminate_job(&job_id).await.unwrap(),
        ActionStatus::NotFound
    );

    let node_id = scheduler.add_node(node(10, 4.0, 1000)).await.unwrap();
    scheduler.tick().await.unwrap();
    assert_eq!(
        scheduler.terminate_job(&job_id).await.unwrap(),
        ActionStatus::Ok
    );

    let stopped = scheduler.get_job(&job_id).await.unwrap().unwrap();
    assert_eq!(stopped.status, JobStatus::Terminated);
    // started_at stays on the record; only node deletion clears it.
    assert_eq!(stopped.started_at, Some(T0));

    assert_eq!(
        scheduler.terminate_job(&job_id).await.unwrap(),
        ActionStatus::NotFound
    );

    // Termination forced an immediate pass; the recount clears the node.
    scheduler.tick().await.unwrap();
    let host = scheduler.get_node(&node_id).await.unwrap().unwrap();
    assert_eq!(host.jobs_allocated, 0);
    assert_allocation_invariants(&scheduler).await;
}

#[tokio::test]
async fn delete_job_leaves_counters_stale_until_next_tick() {
    let (scheduler, _clock) = new_scheduler();
    let job_id = scheduler.submit_job(job(100, 2.0, 200)).await.unwrap();
    let node_id = scheduler.add_node(node(10, 4.0, 1000)).await.unwrap();
    scheduler.tick().await.unwrap();

    assert_eq!(
        scheduler.delete_job(&job_id).await.unwrap(),
        ActionStatus::Ok
    );
    assert!(scheduler.get_job(&job_id).await.unwrap().is_none());

    // Deletion removes placement membership but does not touch the host
    // node's persisted counters.
    let stale = scheduler.get_node(&node_id).await.unwrap().unwrap();
    assert_eq!(stale.jobs_allocated, 1);
    assert_eq!(stale.cpu_allocated, 2.0);
    assert_eq!(stale.memory_allocated, 200);

    // The deletion forced next_schedule_time to "now"; the recount runs on
    // the very next pass.
    scheduler.tick().await.unwrap();
    let reconciled = scheduler.get_node(&node_id).await.unwrap().unwrap();
    assert_eq!(reconciled.jobs_allocated, 0);
    assert_eq!(reconciled.cpu_allocated, 0.0);
    assert_eq!(reconciled.memory_allocated, 0);
    assert_allocation_invariants(&scheduler).await;
}

#[tokio::test]
async fn delete_pending_job() {
    let (scheduler, _clock) = new_scheduler();
    let job_id = scheduler.submit_job(job(3, 1.0, 100)).await.unwrap();
    assert_eq!(
        scheduler.delete_job(&job_id).await.unwrap(),
        ActionStatus::Ok
    );
    assert!(scheduler.get_jobs().await.unwrap().is_empty());
    assert_eq!(
        scheduler.delete_job(&job_id).await.unwrap(),
        ActionStatus::NotFound
    );
}

#[tokio::test]
async fn delete_node_requeues_interrupted_jobs_first() {
    let (scheduler, clock) = new_scheduler();
    // Two slots: a and b run, c queues behind them.
    let a = scheduler.submit_job(job(100, 1.0, 10)).await.unwrap();
    let b = scheduler.submit_job(job(100, 1.0, 10)).await.unwrap();
    let c = scheduler.submit_job(job(100, 1.0, 10)).await.unwrap();
    let first = scheduler.add_node(node(2, 4.0, 1000)).await.unwrap();
    scheduler.tick().await.unwrap();

    assert_eq!(
        scheduler.get_job(&a).await.unwrap().unwrap().status,
        JobStatus::Running
    );
    assert_eq!(
        scheduler.get_job(&c).await.unwrap().unwrap().status,
        JobStatus::New
    );

    assert_eq!(
        scheduler.delete_node(&first).await.unwrap(),
        ActionStatus::Ok
    );
    for id in [&a, &b] {
        let requeued = scheduler.get_job(id).await.unwrap().unwrap();
        assert_eq!(requeued.status, JobStatus::New);
        assert_eq!(requeued.started_at, None);
    }

    // One slot on the replacement: the interrupted jobs go first, in their
    // original placement order, ahead of the still-pending submission.
    clock.advance(1.0);
    let second = scheduler.add_node(node(1, 4.0, 1000)).await.unwrap();
    scheduler.tick().await.unwrap();

    assert_eq!(
        scheduler.get_job(&a).await.unwrap().unwrap().status,
        JobStatus::Running
    );
    assert_eq!(
        scheduler.get_job(&b).await.unwrap().unwrap().status,
        JobStatus::New
    );
    assert_eq!(
        scheduler.get_job(&c).await.unwrap().unwrap().status,
        JobStatus::New
    );
    let placed = scheduler.get_node_jobs(&second).await.unwrap().unwrap();
    assert_eq!(placed.len(), 1);
    assert_eq!(placed[0].id, a);
    assert_allocation_invariants(&scheduler).await;
}

#[tokio::test]
async fn delete_unknown_node_is_not_found() {
    let (scheduler, _clock) = new_scheduler();
    assert_eq!(
        scheduler.delete_node("42").await.unwrap(),
        ActionStatus::NotFound
    );
}

#[tokio::test]
async fn first_fit_prefers_earliest_registered_node() {
    let (scheduler, clock) = new_scheduler();
    let first = scheduler.add_node(node(1, 4.0, 1000)).await.unwrap();
    let second = scheduler.add_node(node(10, 4.0, 1000)).await.unwrap();

    let a = scheduler.submit_job(job(100, 1.0, 10)).await.unwrap();
    scheduler.tick().await.unwrap();
    assert_eq!(
        scheduler.get_node_jobs(&first).await.unwrap().unwrap()[0].id,
        a
    );

    // First node's single slot is taken; the next job spills to the second.
    clock.advance(1.0);
    let b = scheduler.submit_job(job(100, 1.0, 10)).await.unwrap();
    scheduler.tick().await.unwrap();
    assert_eq!(
        scheduler.get_node_jobs(&second).await.unwrap().unwrap()[0].id,
        b
    );
    assert_allocation_invariants(&scheduler).await;
}

#[tokio::test]
async fn one_pass_never_overcommits_a_node() {
    let (scheduler, _clock) = new_scheduler();
    scheduler.add_node(node(10, 2.0, 1000)).await.unwrap();
    // Both are pending when the pass starts; only one can fit.
    scheduler.submit_job(job(100, 1.5, 100)).await.unwrap();
    scheduler.submit_job(job(100, 1.5, 100)).await.unwrap();

    scheduler.tick().await.unwrap();

    let statuses: Vec<_> = scheduler
        .get_jobs()
        .await
        .unwrap()
        .into_iter()
        .map(|j| j.status)
        .collect();
    assert_eq!(
        statuses
            .iter()
            .filter(|s| **s == JobStatus::Running)
            .count(),
        1
    );
    assert_eq!(
        statuses.iter().filter(|s| **s == JobStatus::New).count(),
        1
    );
    assert_allocation_invariants(&scheduler).await;
}

#[tokio::test]
async fn tick_without_time_advance_is_idempotent() {
    let (scheduler, _clock) = new_scheduler();
    scheduler.submit_job(job(10, 1.0, 100)).await.unwrap();
    scheduler.submit_job(job(10, 9.0, 100)).await.unwrap();
    scheduler.add_node(node(5, 4.0, 1000)).await.unwrap();
    scheduler.tick().await.unwrap();

    let jobs_before = scheduler.get_jobs().await.unwrap();
    let nodes_before = scheduler.get_nodes().await.unwrap();

    scheduler.tick().await.unwrap();

    assert_eq!(scheduler.get_jobs().await.unwrap(), jobs_before);
    assert_eq!(scheduler.get_nodes().await.unwrap(), nodes_before);
}

#[tokio::test]
async fn node_jobs_distinguishes_unknown_from_empty() {
    let (scheduler, _clock) = new_scheduler();
    assert!(scheduler.get_node_jobs("42").await.unwrap().is_none());

    let node_id = scheduler.add_node(node(10, 4.0, 1000)).await.unwrap();
    let placed = scheduler.get_node_jobs(&node_id).await.unwrap();
    assert_eq!(placed, Some(vec![]));
}
