//! mergecache Stress Binary
//!
//! Hammers a cache from many threads, then checks that every counter
//! landed in the ordered index with the expected value.

use std::process;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use clap::Parser;
use mergecache::{Cache, CacheError, Config, Value};
use tracing_subscriber::{fmt, EnvFilter};

/// mergecache stress test
#[derive(Parser, Debug)]
#[command(name = "mergecache-stress")]
#[command(about = "Concurrent workload generator for mergecache")]
#[command(version)]
struct Args {
    /// Number of worker threads
    #[arg(short, long, default_value = "8")]
    threads: usize,

    /// Operations per thread
    #[arg(short, long, default_value = "100000")]
    ops: usize,

    /// Number of distinct keys
    #[arg(short, long, default_value = "1024")]
    keys: usize,

    /// Number of counter keys incremented by every thread
    #[arg(short, long, default_value = "16")]
    counters: usize,

    /// Pending buffer partitions
    #[arg(short = 's', long, default_value = "1")]
    shards: usize,

    /// Ordered index degree
    #[arg(short, long, default_value = "4")]
    degree: usize,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,mergecache=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("mergecache stress v{}", mergecache::VERSION);
    tracing::info!(
        "threads={} ops={} keys={} counters={} shards={}",
        args.threads,
        args.ops,
        args.keys,
        args.counters,
        args.shards
    );

    if let Err(e) = run(&args) {
        tracing::error!("Stress run failed: {}", e);
        process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), CacheError> {
    let config = Config::builder()
        .index_degree(args.degree)
        .buffer_shards(args.shards)
        .build();
    let cache: Arc<Cache> = Arc::new(Cache::open(config)?);

    let counters = args.counters.max(1);
    for c in 0..counters {
        cache.set(&counter_key(c), 0)?;
    }

    let started = Instant::now();
    let mut workers = Vec::with_capacity(args.threads);
    for t in 0..args.threads {
        let cache = Arc::clone(&cache);
        let ops = args.ops;
        let keys = args.keys.max(1);
        workers.push(thread::spawn(move || workload(&cache, t, ops, keys, counters)));
    }

    let mut increments = 0u64;
    for worker in workers {
        match worker.join() {
            Ok(result) => increments += result?,
            Err(_) => {
                tracing::error!("Worker thread panicked");
                process::exit(1);
            }
        }
    }
    let elapsed = started.elapsed();

    cache.sync()?;

    let total_ops = (args.threads * args.ops) as f64;
    tracing::info!(
        "{} ops in {:.2?} ({:.0} ops/s)",
        total_ops,
        elapsed,
        total_ops / elapsed.as_secs_f64()
    );

    let expected = increments / counters as u64;
    let mut mismatches = 0;
    for c in 0..counters {
        let key = counter_key(c);
        let got = cache.indexed(&key);
        if got != Some(Value::Int(expected as i64)) {
            tracing::warn!("Counter {} = {:?}, expected {}", key, got, expected);
            mismatches += 1;
        }
    }

    let stats = cache.stats();
    tracing::info!(
        "merged={} drains={} signals_dropped={} index_len={}",
        stats.merged,
        stats.drains,
        stats.signals_dropped,
        cache.index_len()
    );

    cache.close()?;

    if mismatches > 0 {
        tracing::error!("{} counters diverged", mismatches);
        process::exit(2);
    }
    tracing::info!("All {} counters consistent", counters);
    Ok(())
}

/// One thread's share of the load. Returns the number of counter
/// increments performed.
fn workload(
    cache: &Cache,
    thread_id: usize,
    ops: usize,
    keys: usize,
    counters: usize,
) -> Result<u64, CacheError> {
    let mut increments = 0u64;
    // Cheap deterministic mixing; no RNG dependency needed
    let mut state = (thread_id as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15);

    for i in 0..ops {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        let key = format!("key{:06}", state as usize % keys);

        match i % 8 {
            0 | 1 | 2 => {
                cache.get(&key)?;
            }
            3 | 4 => cache.set(&key, format!("t{}-{}", thread_id, i))?,
            5 => {
                cache.get_or_set(&key, i as i64)?;
            }
            6 => cache.del(&key)?,
            _ => {
                // Every thread hits every counter the same number of times
                cache.inc(&counter_key(i / 8 % counters), 1)?;
                increments += 1;
            }
        }
    }

    // Top up so each counter gets the same share
    let remainder = increments % counters as u64;
    if remainder != 0 {
        for c in remainder as usize..counters {
            cache.inc(&counter_key(c), 1)?;
            increments += 1;
        }
    }

    Ok(increments)
}

fn counter_key(index: usize) -> String {
    format!("counter{:04}", index)
}
