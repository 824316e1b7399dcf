//! Contention driver behind the `semakit` binary.
//!
//! Spawns `threads` threads that each perform `iterations` wait/signal pairs against one
//! semaphore seeded with `tokens` tokens, then checks that the semaphore ends with
//! exactly `tokens` tokens and that no more than `tokens` threads ever held one at once.
use std::{
    fmt,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Barrier,
    },
    thread,
    time::{Duration, Instant},
};

use rand::Rng;

use crate::{
    options::{Options, SemaphoreKind},
    semaphore::{NativeSemaphore, Semaphore},
    spinning::SpinningSemaphore,
};

#[derive(Debug, Clone)]
pub struct StressReport {
    pub kind: SemaphoreKind,
    pub threads: usize,
    pub iterations: usize,
    pub elapsed: Duration,
    pub expected_tokens: isize,
    pub final_tokens: isize,
    pub max_holders: usize,
}

impl StressReport {
    pub fn conserved(&self) -> bool {
        self.final_tokens == self.expected_tokens
            && self.max_holders as isize <= self.expected_tokens
    }

    pub fn pairs_per_sec(&self) -> f64 {
        let pairs = (self.threads * self.iterations) as f64;
        pairs / self.elapsed.as_secs_f64().max(f64::EPSILON)
    }
}

impl fmt::Display for StressReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?}: {} threads x {} pairs in {:?} ({:.0} pairs/s), tokens {}/{}, max holders {}",
            self.kind,
            self.threads,
            self.iterations,
            self.elapsed,
            self.pairs_per_sec(),
            self.final_tokens,
            self.expected_tokens,
            self.max_holders,
        )
    }
}

pub fn run(options: &Options) -> StressReport {
    log::info!(
        "stressing {:?} semaphore: {} threads, {} iterations, {} tokens",
        options.kind,
        options.threads,
        options.iterations,
        options.tokens
    );

    let (elapsed, max_holders, final_tokens) = match options.kind {
        SemaphoreKind::Native => {
            let sema = Arc::new(NativeSemaphore::new(options.tokens));
            let (elapsed, max_holders) = hammer(sema.clone(), options);
            let mut drained = 0;
            while sema.try_wait() {
                drained += 1;
            }
            (elapsed, max_holders, drained)
        }
        SemaphoreKind::Spinning => {
            let sema = Arc::new(SpinningSemaphore::with_spin_budget(
                options.tokens,
                options.spin_budget,
            ));
            let (elapsed, max_holders) = hammer(sema.clone(), options);
            (elapsed, max_holders, sema.available())
        }
    };

    let report = StressReport {
        kind: options.kind,
        threads: options.threads,
        iterations: options.iterations,
        elapsed,
        expected_tokens: options.tokens as isize,
        final_tokens,
        max_holders,
    };
    log::info!("{report}");
    report
}

fn hammer<S: Semaphore + 'static>(sema: Arc<S>, options: &Options) -> (Duration, usize) {
    let holders = Arc::new(AtomicUsize::new(0));
    let max_holders = Arc::new(AtomicUsize::new(0));
    let barrier = Arc::new(Barrier::new(options.threads + 1));

    let workers: Vec<_> = (0..options.threads)
        .map(|_| {
            let sema = sema.clone();
            let holders = holders.clone();
            let max_holders = max_holders.clone();
            let barrier = barrier.clone();
            let iterations = options.iterations;
            let hold_micros = options.hold_micros;
            thread::spawn(move || {
                let mut rng = rand::rng();
                barrier.wait();
                for _ in 0..iterations {
                    sema.wait();
                    let now_holding = holders.fetch_add(1, Ordering::Relaxed) + 1;
                    max_holders.fetch_max(now_holding, Ordering::Relaxed);
                    if hold_micros > 0 {
                        hold(Duration::from_micros(rng.random_range(0..=hold_micros)));
                    }
                    holders.fetch_sub(1, Ordering::Relaxed);
                    sema.signal(1);
                }
            })
        })
        .collect();

    barrier.wait();
    let start = Instant::now();
    for worker in workers {
        if worker.join().is_err() {
            log::error!("stress worker panicked");
        }
    }
    let elapsed = start.elapsed();
    (elapsed, max_holders.load(Ordering::Relaxed))
}

fn hold(duration: Duration) {
    let until = Instant::now() + duration;
    while Instant::now() < until {
        std::hint::spin_loop();
    }
}
