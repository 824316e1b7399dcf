use clap::{Parser, ValueEnum};

use crate::spinning::DEFAULT_SPIN_BUDGET;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum SemaphoreKind {
    Native,
    Spinning,
}

/// Stress-test a semaphore: every thread repeatedly takes a token, holds it for a
/// random moment and gives it back.
#[derive(Parser, Debug, Clone)]
#[clap(name = "semakit")]
pub struct Options {
    #[clap(long, value_enum, default_value_t = SemaphoreKind::Spinning)]
    pub kind: SemaphoreKind,

    #[clap(long, default_value_t = 4)]
    pub threads: usize,

    /// Wait/signal pairs performed by each thread.
    #[clap(long, default_value_t = 10_000)]
    pub iterations: usize,

    /// Initial token count. Also the maximum number of concurrent holders.
    #[clap(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub tokens: u32,

    /// Fast-path retries before a spinning waiter blocks in the kernel.
    #[clap(long, default_value_t = DEFAULT_SPIN_BUDGET)]
    pub spin_budget: u32,

    /// Upper bound on how long a token is held, in microseconds.
    #[clap(long, default_value_t = 0)]
    pub hold_micros: u64,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            kind: SemaphoreKind::Spinning,
            threads: 4,
            iterations: 10_000,
            tokens: 1,
            spin_budget: DEFAULT_SPIN_BUDGET,
            hold_micros: 0,
        }
    }
}
