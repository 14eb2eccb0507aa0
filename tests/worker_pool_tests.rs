use actionserver::worker_pool::{
    CoroutineSpawner, InFlight, Task, TaskSpawner, WorkerPool, WorkerPoolConfig,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

mod common;
use common::test_server::setup_may_runtime;

fn wait_for(counter: &AtomicUsize, expected: usize) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if counter.load(Ordering::SeqCst) == expected {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    false
}

fn counting_task(counter: &Arc<AtomicUsize>) -> Task {
    let counter = Arc::clone(counter);
    Box::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    })
}

#[test]
fn coroutine_spawner_runs_every_task() {
    setup_may_runtime();
    let spawner = CoroutineSpawner::new(0x8000);
    let counter = Arc::new(AtomicUsize::new(0));
    for _ in 0..16 {
        spawner.submit(counting_task(&counter)).unwrap();
    }
    assert!(wait_for(&counter, 16));
}

#[test]
fn worker_pool_runs_every_task_and_counts_them() {
    setup_may_runtime();
    let pool = WorkerPool::new(WorkerPoolConfig::new(3, 0x8000)).unwrap();
    let counter = Arc::new(AtomicUsize::new(0));
    for _ in 0..20 {
        pool.submit(counting_task(&counter)).unwrap();
    }
    assert!(wait_for(&counter, 20));
    assert_eq!(pool.metrics().get_dispatched_count(), 20);
}

#[test]
fn worker_pool_survives_a_panicking_task() {
    setup_may_runtime();
    let pool = WorkerPool::new(WorkerPoolConfig::new(1, 0x8000)).unwrap();
    let counter = Arc::new(AtomicUsize::new(0));
    pool.submit(Box::new(|| panic!("task failure"))).unwrap();
    pool.submit(counting_task(&counter)).unwrap();
    assert!(wait_for(&counter, 1));
    assert_eq!(pool.metrics().get_panicked_count(), 1);
}

#[test]
fn in_flight_tracks_tasks_until_they_finish() {
    setup_may_runtime();
    let spawner = CoroutineSpawner::new(0x8000);
    let in_flight = InFlight::new();
    for _ in 0..4 {
        let guard = in_flight.enter();
        spawner
            .submit(Box::new(move || {
                let _guard = guard;
                may::coroutine::sleep(Duration::from_millis(50));
            }))
            .unwrap();
    }
    assert!(in_flight.count() > 0);
    assert!(in_flight.wait_idle(Duration::from_secs(5)));
    assert_eq!(in_flight.count(), 0);
}
