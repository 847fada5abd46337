//! Main-thread integration example
//!
//! Run with `RUST_LOG=taskpool_rs=debug cargo run --example main_thread`
//! to see the pool's own log events.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use taskpool_rs::prelude::*;
use taskpool_rs::telemetry::{LogExporter, MetricsExporter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> taskpool_rs::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!("=== Main Thread Example ===\n");

    let main_loop = MainLoop::install()?;
    let pool = ThreadPool::with_threads(3)?;
    let progress = Arc::new(AtomicUsize::new(0));

    // Workers report progress to the UI thread and query it synchronously
    let mut group = TaskGroup::new(&pool);
    for (i, priority) in TaskPriority::ALL.iter().copied().enumerate() {
        let progress = progress.clone();
        group.enqueue(
            move || {
                std::thread::sleep(Duration::from_millis(20));
                let label = exec_in_main_thread_sync(move || format!("{:?} #{}", priority, i))
                    .unwrap_or_default();

                let done = progress.fetch_add(1, Ordering::SeqCst) + 1;
                let _ = exec_in_main_thread_async(move || {
                    println!("[UI] finished {} ({} done)", label, done);
                });
            },
            priority,
        );
    }

    // Waiting here keeps the main loop serviced
    let start = Instant::now();
    group.wait_all(None);
    main_loop.process_events();
    println!("\nAll {} tasks done in {:?}", progress.load(Ordering::SeqCst), start.elapsed());

    // Blocking work off the pool, while the UI thread still answers requests
    let checksum = exec_unlocked(|| {
        let greeting = exec_in_main_thread_sync(|| "hello from the UI thread").unwrap_or("");
        greeting.bytes().map(u64::from).sum::<u64>()
    })?;
    println!("Unlocked checksum: {}", checksum);

    // Background task that is awaited when it goes out of scope
    {
        let _background = NoLockedTask::with_pool(
            &pool,
            || std::thread::sleep(Duration::from_millis(10)),
            TaskPriority::Low,
        );
        println!("Background task running...");
    }
    println!("Background task complete");

    LogExporter.export(&pool.metrics())?;

    println!("\n=== Example Complete ===");
    Ok(())
}
