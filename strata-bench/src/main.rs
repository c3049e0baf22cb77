// Copyright 2025 strata Project Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Mixed read/write workload against a cache in front of an in-memory backing store.
//!
//! Readers look keys up in the cache, fall back to the backing store on a miss and queue the key for a background
//! fill. Writers update the backing store under the record lock of the key and invalidate the cached entry.

use std::{
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

use clap::Parser;
use hdrhistogram::Histogram;
use itertools::Itertools;
use parking_lot::Mutex;
use rand::Rng as _;
use strata::{Cache, CacheBuilder, CacheConfig, EvictionPolicy, InfoTracker, MockStore, Store};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about)]
pub struct Args {
    /// Count of shards.
    #[arg(long, default_value_t = 16)]
    shards: usize,

    /// Bench duration.
    #[arg(short, long, value_parser = humantime::parse_duration, default_value = "30s")]
    time: Duration,

    /// Report interval.
    #[arg(long, value_parser = humantime::parse_duration, default_value = "2s")]
    report_interval: Duration,

    /// Active expiration interval.
    #[arg(long, value_parser = humantime::parse_duration, default_value = "100ms")]
    cron_interval: Duration,

    /// Reader count.
    #[arg(long, default_value_t = 8)]
    readers: usize,

    /// Writer count.
    #[arg(long, default_value_t = 2)]
    writers: usize,

    /// Count of distinct keys.
    #[arg(long, default_value_t = 100_000)]
    keys: u64,

    /// Value size. (B)
    #[arg(long, default_value_t = 128)]
    value_size: usize,

    /// TTL of values, non-positive for no expiration. (s)
    #[arg(long, default_value_t = 0)]
    ttl: i64,

    /// Memory limit over every shard, the cache default if unset. (B)
    #[arg(long)]
    maxmemory: Option<u64>,

    /// Eviction policy, e.g. "allkeys-lru", "allkeys-lfu", "volatile-ttl", "noeviction".
    #[arg(long, default_value = "allkeys-lru")]
    policy: String,

    /// Backing store read latency.
    #[arg(long, value_parser = humantime::parse_duration, default_value = "0s")]
    store_latency: Duration,
}

#[derive(Debug)]
struct Metrics {
    hit_lats: Mutex<Histogram<u64>>,
    miss_lats: Mutex<Histogram<u64>>,
    reads: AtomicU64,
    writes: AtomicU64,
}

impl Metrics {
    fn new() -> anyhow::Result<Self> {
        Ok(Self {
            hit_lats: Mutex::new(Histogram::new_with_bounds(1, 10_000_000, 2)?),
            miss_lats: Mutex::new(Histogram::new_with_bounds(1, 10_000_000, 2)?),
            reads: AtomicU64::new(0),
            writes: AtomicU64::new(0),
        })
    }
}

fn value(key: u64, version: u64, size: usize) -> Vec<u8> {
    let seed = format!("{key}:{version}:");
    seed.bytes().cycle().take(size.max(seed.len())).collect()
}

fn ttl(args: &Args) -> i64 {
    if args.ttl > 0 {
        args.ttl
    } else {
        strata::TTL_NONE
    }
}

fn read(cache: &Cache<MockStore>, metrics: &Metrics, args: &Args, stop: &AtomicBool) {
    let mut rng = rand::rng();
    while !stop.load(Ordering::Relaxed) {
        let key = format!("key:{}", rng.random_range(0..args.keys));
        let start = Instant::now();
        match cache.get(key.as_bytes()) {
            Ok(_) => {
                let lat = start.elapsed().as_micros() as u64;
                if let Err(e) = metrics.hit_lats.lock().record(lat) {
                    tracing::error!("metrics error: {:?}, value: {}", e, lat);
                }
            }
            Err(e) if e.is_not_found() => {
                if cache.store().get_with_ttl(key.as_bytes()).is_ok() {
                    if let Err(e) = cache.push_key_to_async_load_queue('k', key.as_bytes()) {
                        tracing::error!("push error: {e}");
                    }
                }
                let lat = start.elapsed().as_micros() as u64;
                if let Err(e) = metrics.miss_lats.lock().record(lat) {
                    tracing::error!("metrics error: {:?}, value: {}", e, lat);
                }
            }
            Err(e) => tracing::warn!("get error: {e}"),
        }
        metrics.reads.fetch_add(1, Ordering::Relaxed);
    }
}

fn write(cache: &Cache<MockStore>, metrics: &Metrics, args: &Args, stop: &AtomicBool) {
    let mut rng = rand::rng();
    let mut version = 0;
    while !stop.load(Ordering::Relaxed) {
        let index = rng.random_range(0..args.keys);
        let key = format!("key:{index}");
        {
            let _guard = cache.record_locks().lock(key.as_bytes());
            cache
                .store()
                .insert_string(key.as_bytes(), &value(index, version, args.value_size), ttl(args));
            if let Err(e) = cache.del(key.as_bytes()) {
                if !e.is_not_found() {
                    tracing::warn!("invalidate error: {e}");
                }
            }
        }
        version += 1;
        metrics.writes.fetch_add(1, Ordering::Relaxed);
    }
}

fn report(cache: &Cache<MockStore>, tracker: &mut InfoTracker) -> anyhow::Result<()> {
    let display = tracker.update(&cache.info());
    println!("{}", serde_json::to_string(display)?);
    Ok(())
}

fn summary(metrics: &Metrics, elapsed: Duration) {
    let secs = elapsed.as_secs_f64();
    println!(
        "reads: {} ({:.0}/s), writes: {} ({:.0}/s)",
        metrics.reads.load(Ordering::Relaxed),
        metrics.reads.load(Ordering::Relaxed) as f64 / secs,
        metrics.writes.load(Ordering::Relaxed),
        metrics.writes.load(Ordering::Relaxed) as f64 / secs,
    );
    for (name, histogram) in [("hit", &metrics.hit_lats), ("miss", &metrics.miss_lats)] {
        let histogram = histogram.lock();
        let quantiles = [0.5, 0.9, 0.99, 0.999]
            .iter()
            .map(|q| format!("p{}: {}us", q * 100.0, histogram.value_at_quantile(*q)))
            .join(", ");
        println!("{name} latency: count: {}, {quantiles}, max: {}us", histogram.len(), histogram.max());
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    println!("{args:#?}");

    let policy: EvictionPolicy = serde_json::from_value(serde_json::Value::String(args.policy.clone()))?;
    let mut config = CacheConfig {
        maxmemory_policy: policy,
        ..Default::default()
    };
    if let Some(maxmemory) = args.maxmemory {
        config.maxmemory = maxmemory;
    }

    let store = Arc::new(MockStore::default().with_latency(args.store_latency));
    for index in 0..args.keys {
        store.insert_string(
            format!("key:{index}").as_bytes(),
            &value(index, 0, args.value_size),
            ttl(&args),
        );
    }

    let cache = Arc::new(
        CacheBuilder::new()
            .with_shards(args.shards)
            .with_config(config)
            .build(store)?,
    );
    let metrics = Arc::new(Metrics::new()?);
    let stop = Arc::new(AtomicBool::new(false));

    let mut handles = vec![];
    for _ in 0..args.readers {
        let (cache, metrics, args, stop) = (cache.clone(), metrics.clone(), args.clone(), stop.clone());
        handles.push(thread::spawn(move || read(&cache, &metrics, &args, &stop)));
    }
    for _ in 0..args.writers {
        let (cache, metrics, args, stop) = (cache.clone(), metrics.clone(), args.clone(), stop.clone());
        handles.push(thread::spawn(move || write(&cache, &metrics, &args, &stop)));
    }
    {
        let (cache, stop, interval) = (cache.clone(), stop.clone(), args.cron_interval);
        handles.push(thread::spawn(move || {
            while !stop.load(Ordering::Relaxed) {
                cache.process_cron_task();
                thread::sleep(interval);
            }
        }));
    }

    let start = Instant::now();
    let mut tracker = InfoTracker::default();
    while start.elapsed() < args.time {
        thread::sleep(args.report_interval.min(args.time.saturating_sub(start.elapsed())));
        report(&cache, &mut tracker)?;
    }

    stop.store(true, Ordering::Relaxed);
    for handle in handles {
        if handle.join().is_err() {
            tracing::error!("bench thread panicked");
        }
    }
    summary(&metrics, start.elapsed());

    Ok(())
}
