//! Benchmark tests for critical operations
//!
//! Run with: cargo test --release bench -- --ignored --nocapture

mod common;

use std::time::{Duration, Instant};

use common::{setup, OWNER};
use linkstash::model::Origin;

fn report(name: &str, iterations: usize, duration: Duration) {
    let avg_ms = duration.as_secs_f64() * 1000.0 / iterations as f64;
    let ops_per_sec = (iterations as f64 / duration.as_secs_f64()) as u64;

    println!("  {} ({} iterations)", name, iterations);
    println!("    Total time: {:?}", duration);
    println!("    Avg time: {:.3}ms", avg_ms);
    println!("    Throughput: {} ops/sec\n", ops_per_sec);
}

#[tokio::test]
#[ignore] // Run explicitly with: cargo test bench --release -- --ignored --nocapture
async fn bench_store_resources() {
    println!("\n=== Benchmark: Store Resources ===\n");

    let (state, _shortener, _temp_db) = setup();
    let resources = state.resources();
    let iterations = 1000;

    let start = Instant::now();
    for i in 0..iterations {
        resources
            .store(Origin::link(format!("https://t.me/bench{}", i)), OWNER)
            .unwrap();
    }
    report("Store new content", iterations, start.elapsed());

    let start = Instant::now();
    for i in 0..iterations {
        resources
            .store(Origin::link(format!("https://t.me/bench{}", i)), OWNER)
            .unwrap();
    }
    report("Store duplicate content", iterations, start.elapsed());
}

#[tokio::test]
#[ignore]
async fn bench_resolve_cached() {
    println!("\n=== Benchmark: Resolve Cached Links ===\n");

    let (state, _shortener, _temp_db) = setup();
    let pipeline = state.pipeline();
    let submission = pipeline
        .submit_link(OWNER, "https://t.me/bench")
        .await
        .unwrap();

    let iterations = 1000;
    let start = Instant::now();
    for i in 0..iterations {
        pipeline.resolve(&submission.token, i as i64).await.unwrap();
    }
    report("Resolve (cache hit)", iterations, start.elapsed());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
#[ignore]
async fn bench_concurrent_events() {
    println!("\n=== Benchmark: Concurrent Events ===\n");

    let (state, _shortener, _temp_db) = setup();
    let num_tasks = 50;
    let ops_per_task = 20;

    let start = Instant::now();
    let mut handles = vec![];
    for task_id in 0..num_tasks {
        let state = state.clone();
        handles.push(tokio::spawn(async move {
            let pipeline = state.pipeline();
            for op_id in 0..ops_per_task {
                let submission = pipeline
                    .submit_link(OWNER, &format!("https://t.me/c{}-{}", task_id, op_id))
                    .await
                    .unwrap();
                pipeline.resolve(&submission.token, task_id).await.unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    report("Submit + resolve", num_tasks as usize * ops_per_task, start.elapsed());
}
