use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use clap::Parser;
use libc::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use tracing::info;
use tracing_subscriber::EnvFilter;

use dining_philosophers::{Manager, TableConfig};

// 観測ループが停止要求を確認する間隔
const POLL: Duration = Duration::from_millis(50);

#[derive(Parser)]
#[command(name = "dining_philosophers")]
#[command(version)]
#[command(about = "Dining philosophers with a waiter limiting concurrent diners to n - 1")]
struct Cli {
    /// TOML config file; command line flags override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of philosophers (and chopsticks)
    #[arg(short = 'n', long)]
    philosophers: Option<usize>,

    /// Minimum think time in milliseconds
    #[arg(long)]
    think_min: Option<u64>,

    /// Maximum think time in milliseconds
    #[arg(long)]
    think_max: Option<u64>,

    /// Minimum eat time in milliseconds
    #[arg(long)]
    eat_min: Option<u64>,

    /// Maximum eat time in milliseconds
    #[arg(long)]
    eat_max: Option<u64>,

    /// Seed for reproducible dwell times
    #[arg(long)]
    seed: Option<u64>,

    /// Stop after this many seconds (default: run until SIGINT/SIGTERM)
    #[arg(short, long)]
    duration: Option<u64>,

    /// Status print interval in milliseconds
    #[arg(long, default_value = "1000")]
    interval: u64,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn table_config(&self) -> Result<TableConfig> {
        let mut config = match &self.config {
            Some(path) => TableConfig::load(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => TableConfig::default(),
        };

        if let Some(n) = self.philosophers {
            config.philosophers = n;
        }
        if let Some(v) = self.think_min {
            config.think.min_ms = v;
        }
        if let Some(v) = self.think_max {
            config.think.max_ms = v;
        }
        if let Some(v) = self.eat_min {
            config.eat.min_ms = v;
        }
        if let Some(v) = self.eat_max {
            config.eat.max_ms = v;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }

        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = cli.table_config()?;
    info!(
        philosophers = config.philosophers,
        think = ?config.think,
        eat = ?config.eat,
        "configuration"
    );

    // シグナルを受けたら停止フラグを立てる
    let interrupted = Arc::new(AtomicBool::new(false));
    let mut signals = Signals::new([SIGINT, SIGTERM]).context("installing signal handlers")?;
    let signal_handle = signals.handle();
    let interrupted0 = interrupted.clone();
    let signal_thread = thread::spawn(move || {
        for sig in signals.forever() {
            info!(signal = sig, "received signal, stopping");
            interrupted0.store(true, Ordering::Release);
        }
    });

    let mut manager = Manager::new(config)?;
    manager.start()?;

    let deadline = cli.duration.map(|s| Instant::now() + Duration::from_secs(s));
    let interval = Duration::from_millis(cli.interval.max(1));
    let mut next_print = Instant::now() + interval;

    while !interrupted.load(Ordering::Acquire) {
        let now = Instant::now();
        if deadline.is_some_and(|d| now >= d) {
            break;
        }
        if now >= next_print {
            println!("{}", manager.snapshot());
            next_print = now + interval;
        }
        thread::sleep(POLL.min(interval));
    }

    info!("stopping philosophers (each finishes its current cycle)");
    let stopping = Instant::now();
    manager.stop();
    info!(took = ?stopping.elapsed(), "all philosophers joined");

    // シグナル用スレッドも join する
    signal_handle.close();
    if signal_thread.join().is_err() {
        anyhow::bail!("signal thread panicked");
    }

    println!("{}", manager.snapshot());
    for id in 0..manager.num_philosophers() {
        println!(
            "P{id}: ate {} times, longest wait {:.3}s",
            manager.eat_count(id),
            manager.longest_wait(id).as_secs_f64()
        );
    }
    Ok(())
}
