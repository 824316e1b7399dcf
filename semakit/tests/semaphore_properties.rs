use std::{
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Barrier,
    },
    thread,
    time::{Duration, Instant},
};

use semakit::prelude::*;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Takes every token left, returning how many there were.
fn drain<S: Semaphore>(sema: &S) -> usize {
    let mut n = 0;
    while sema.try_wait() {
        n += 1;
    }
    n
}

fn never_grants_a_token_twice<S: Semaphore + 'static>(sema: Arc<S>, initial: usize) {
    let granted = Arc::new(AtomicUsize::new(0));
    let signalled = 50;
    let takers: Vec<_> = (0..4)
        .map(|_| {
            let sema = sema.clone();
            let granted = granted.clone();
            thread::spawn(move || {
                let deadline = Instant::now() + Duration::from_millis(300);
                while sema.try_wait_until(deadline) {
                    granted.fetch_add(1, Ordering::Relaxed);
                }
            })
        })
        .collect();

    for _ in 0..signalled {
        sema.signal(1);
    }
    for taker in takers {
        taker.join().unwrap();
    }

    let granted = granted.load(Ordering::Relaxed);
    assert_eq!(granted, initial + signalled);
    assert_eq!(drain(&*sema), 0);
}

#[test]
fn no_double_grant_native() {
    init_logging();
    never_grants_a_token_twice(Arc::new(NativeSemaphore::new(3)), 3);
}

#[test]
fn no_double_grant_spinning() {
    init_logging();
    never_grants_a_token_twice(Arc::new(SpinningSemaphore::with_spin_budget(3, 16)), 3);
}

fn conserves_tokens<S: Semaphore + 'static>(sema: Arc<S>, initial: usize) {
    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));
    let workers: Vec<_> = (0..threads)
        .map(|_| {
            let sema = sema.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..2_000 {
                    sema.wait();
                    sema.signal(1);
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }
    assert_eq!(drain(&*sema), initial);
}

#[test]
fn conservation_native() {
    init_logging();
    conserves_tokens(Arc::new(NativeSemaphore::new(2)), 2);
}

#[test]
fn conservation_spinning() {
    init_logging();
    let sema = Arc::new(SpinningSemaphore::with_spin_budget(2, 8));
    conserves_tokens(sema.clone(), 2);
    assert_eq!(sema.available(), 0);
}

#[test]
fn conservation_spinning_single_token() {
    init_logging();
    let sema = Arc::new(SpinningSemaphore::new(1));
    conserves_tokens(sema.clone(), 1);
}

fn wait_returns_only_after_signal<S: Semaphore + 'static>(sema: Arc<S>) {
    let signalled = Arc::new(AtomicBool::new(false));
    let waiter = {
        let sema = sema.clone();
        let signalled = signalled.clone();
        thread::spawn(move || {
            sema.wait();
            signalled.load(Ordering::Acquire)
        })
    };
    thread::sleep(Duration::from_millis(50));
    signalled.store(true, Ordering::Release);
    sema.signal(1);
    assert!(waiter.join().unwrap());
}

#[test]
fn delayed_signal_native() {
    wait_returns_only_after_signal(Arc::new(NativeSemaphore::new(0)));
}

#[test]
fn delayed_signal_spinning() {
    wait_returns_only_after_signal(Arc::new(SpinningSemaphore::new(0)));
}

fn three_tokens_scenario<S: Semaphore + 'static>(sema: Arc<S>) {
    let barrier = Arc::new(Barrier::new(4));
    let results: Vec<_> = (0..4)
        .map(|_| {
            let sema = sema.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                sema.try_wait()
            })
        })
        .collect::<Vec<_>>()
        .into_iter()
        .map(|t| t.join().unwrap())
        .collect();
    assert_eq!(results.iter().filter(|ok| **ok).count(), 3);

    sema.signal(2);
    assert!(sema.try_wait());
    assert!(sema.try_wait());
    assert!(!sema.try_wait());
}

#[test]
fn three_tokens_native() {
    three_tokens_scenario(Arc::new(NativeSemaphore::new(3)));
}

#[test]
fn three_tokens_spinning() {
    three_tokens_scenario(Arc::new(SpinningSemaphore::new(3)));
}

fn timed_wait_contract<S: Semaphore + 'static>(sema: Arc<S>) {
    // Nobody signals: fail after roughly the timeout.
    let start = Instant::now();
    assert!(!sema.try_wait_for(Duration::from_millis(25)));
    assert!(start.elapsed() >= Duration::from_millis(25));

    // Signalled well before the timeout: succeed.
    let waiter = {
        let sema = sema.clone();
        thread::spawn(move || sema.try_wait_for(Duration::from_secs(10)))
    };
    thread::sleep(Duration::from_millis(20));
    sema.signal(1);
    assert!(waiter.join().unwrap());

    // The failed wait left nothing behind: one signal, exactly one token.
    sema.signal(1);
    assert!(sema.try_wait());
    assert!(!sema.try_wait());
}

#[test]
fn timed_wait_native() {
    timed_wait_contract(Arc::new(NativeSemaphore::new(0)));
}

#[test]
fn timed_wait_spinning() {
    timed_wait_contract(Arc::new(SpinningSemaphore::new(0)));
}

fn past_deadline<S: Semaphore>(sema: &S) {
    let past = Instant::now();
    thread::sleep(Duration::from_millis(2));

    let start = Instant::now();
    assert!(!sema.try_wait_until(past));
    assert!(!sema.try_wait_deadline(Deadline::at(past)));
    assert!(start.elapsed() < Duration::from_millis(200));

    sema.signal(1);
    assert!(sema.try_wait_until(past));
}

#[test]
fn past_deadline_native() {
    past_deadline(&NativeSemaphore::new(0));
}

#[test]
fn past_deadline_spinning() {
    past_deadline(&SpinningSemaphore::new(0));
}

#[test]
fn semaphores_are_send_and_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<NativeSemaphore>();
    assert_send_sync::<SpinningSemaphore>();
}

#[test]
fn moving_a_native_semaphore_keeps_it_usable() {
    let sema = NativeSemaphore::new(1);
    let boxed = Box::new(sema);
    let moved = *boxed;
    assert!(moved.try_wait());
    moved.signal(2);
    assert_eq!(drain(&moved), 2);
}
