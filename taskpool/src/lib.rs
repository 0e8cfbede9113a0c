/*
 * Created on Wed Jun 16 2021
 *
 * This file is a part of Skytable
 * Skytable (formerly known as TerrabaseDB or Skybase) is a free and open-source
 * NoSQL database written by Sayan Nandan ("the Author") with the
 * vision to provide flexibility in data modelling without compromising
 * on performance, queryability or scalability.
 *
 * Copyright (c) 2021, Sayan Nandan <ohsayan@outlook.com>
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program. If not, see <https://www.gnu.org/licenses/>.
 *
*/

//! A generic, bounded-concurrency worker pool.
//!
//! A [`WorkerPool`] owns a fixed number of long-lived worker threads pulling
//! jobs off a shared channel. This keeps the "no more than N concurrently
//! running" invariant trivially true (there are only ever N workers) instead
//! of hand-rolling admission control with a mutex and a condition variable.

use {
    crossbeam_channel::{unbounded, Receiver, Sender},
    std::{
        fmt,
        panic::{catch_unwind, AssertUnwindSafe},
        thread::{self, JoinHandle},
        time::{Duration, Instant},
    },
};

/// A unit of work submitted to the pool: runs to completion and yields a status code,
/// `0` for success, any other value for a task-level failure.
pub type Job = Box<dyn FnOnce() -> i32 + Send + 'static>;

#[derive(Debug)]
pub enum PoolError {
    /// the pool was asked to start with zero workers
    BadSize,
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadSize => write!(f, "a worker pool needs at least one worker"),
        }
    }
}

impl std::error::Error for PoolError {}

/// How a single job completed.
#[derive(Debug)]
pub enum JobStatus {
    /// the job ran to completion and returned this status code
    Completed(i32),
    /// the job panicked; no payload is kept, matching the `catch(...)` semantics
    /// this pool is a Rust realization of
    Panicked,
}

impl JobStatus {
    /// a job counts against the failure tally if it panicked or returned non-zero
    fn is_failure(&self) -> bool {
        !matches!(self, Self::Completed(0))
    }
}

/// The outcome of one scheduled job.
#[derive(Debug)]
pub struct Outcome {
    pub id: u64,
    pub duration: Duration,
    pub status: JobStatus,
}

/// Aggregate result of draining a batch of jobs through the pool.
#[derive(Debug, Default)]
pub struct PoolReport {
    /// total jobs run
    pub total: usize,
    /// jobs that panicked or returned non-zero
    pub failed: usize,
    /// per-job outcomes, populated only when `keep_track` is requested by the caller
    pub outcomes: Vec<Outcome>,
}

enum Message {
    Run(u64, Job),
    Shutdown,
}

struct Worker {
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    fn spawn(task_rx: Receiver<Message>, res_tx: Sender<Outcome>) -> Self {
        let handle = thread::spawn(move || loop {
            match task_rx.recv() {
                Ok(Message::Run(id, job)) => {
                    let start = Instant::now();
                    let status = match catch_unwind(AssertUnwindSafe(job)) {
                        Ok(code) => JobStatus::Completed(code),
                        Err(_) => JobStatus::Panicked,
                    };
                    let duration = start.elapsed();
                    if res_tx.send(Outcome { id, duration, status }).is_err() {
                        // the pool that owns us is gone; nothing left to report to
                        return;
                    }
                }
                Ok(Message::Shutdown) | Err(_) => return,
            }
        });
        Self {
            handle: Some(handle),
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// A bounded pool of worker threads that drains an iterator of [`Job`]s, running at
/// most `size` of them concurrently, and reports an aggregate [`PoolReport`].
pub struct WorkerPool {
    workers: Vec<Worker>,
    task_tx: Sender<Message>,
    res_rx: Receiver<Outcome>,
}

impl WorkerPool {
    /// Create a pool with the given number of workers.
    pub fn new(size: usize) -> Result<Self, PoolError> {
        if size == 0 {
            return Err(PoolError::BadSize);
        }
        let (task_tx, task_rx) = unbounded();
        let (res_tx, res_rx) = unbounded();
        let workers = (0..size)
            .map(|_| Worker::spawn(task_rx.clone(), res_tx.clone()))
            .collect();
        Ok(Self {
            workers,
            task_tx,
            res_rx,
        })
    }

    /// Create a pool sized to the host's available parallelism.
    pub fn new_default_size() -> Result<Self, PoolError> {
        Self::new(num_cpus::get())
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Drain `jobs` through the pool, never running more than `size()` at once.
    ///
    /// Jobs are assigned monotonically increasing ids in submission order. When
    /// `keep_track` is false the per-job [`Outcome`] records are discarded as soon
    /// as they're tallied, so a very large batch doesn't retain a full history.
    pub fn run<I>(&self, jobs: I, keep_track: bool, verbose: bool) -> PoolReport
    where
        I: IntoIterator<Item = Job>,
    {
        let mut report = PoolReport::default();
        let mut next_id = 0u64;
        for job in jobs {
            let id = next_id;
            next_id += 1;
            // the channel is unbounded so submission never blocks on worker
            // availability; the `size()` workers themselves are what bounds
            // how many jobs run concurrently.
            if self.task_tx.send(Message::Run(id, job)).is_err() {
                break;
            }
            report.total += 1;
        }
        for _ in 0..report.total {
            let outcome = match self.res_rx.recv() {
                Ok(o) => o,
                Err(_) => break,
            };
            if verbose {
                match &outcome.status {
                    JobStatus::Completed(code) => {
                        log::info!(
                            "Completed [{}] in {:?}. Returned [{}]",
                            outcome.id,
                            outcome.duration,
                            code
                        );
                    }
                    JobStatus::Panicked => {
                        log::error!("Exception in task [{}]", outcome.id);
                    }
                }
            }
            if outcome.status.is_failure() {
                report.failed += 1;
            }
            if keep_track {
                report.outcomes.push(outcome);
            }
        }
        report
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        for _ in &self.workers {
            let _ = self.task_tx.send(Message::Shutdown);
        }
        // worker `Drop` joins each handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_size_is_rejected() {
        assert!(matches!(WorkerPool::new(0), Err(PoolError::BadSize)));
    }

    #[test]
    fn all_jobs_run_and_succeed() {
        let pool = WorkerPool::new(4).unwrap();
        let jobs: Vec<Job> = (0..50).map(|_| Box::new(|| 0) as Job).collect();
        let report = pool.run(jobs, true, false);
        assert_eq!(report.total, 50);
        assert_eq!(report.failed, 0);
        assert_eq!(report.outcomes.len(), 50);
    }

    #[test]
    fn failures_are_tallied() {
        let pool = WorkerPool::new(2).unwrap();
        let jobs: Vec<Job> = vec![
            Box::new(|| 0) as Job,
            Box::new(|| 1) as Job,
            Box::new(|| panic!("boom")) as Job,
        ];
        let report = pool.run(jobs, false, false);
        assert_eq!(report.total, 3);
        assert_eq!(report.failed, 2);
        assert!(report.outcomes.is_empty());
    }

    #[test]
    fn never_exceeds_pool_size() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let pool = WorkerPool::new(3).unwrap();
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let jobs: Vec<Job> = (0..30)
            .map(|_| {
                let active = active.clone();
                let peak = peak.clone();
                Box::new(move || {
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(5));
                    active.fetch_sub(1, Ordering::SeqCst);
                    0
                }) as Job
            })
            .collect();
        pool.run(jobs, false, false);
        assert!(peak.load(Ordering::SeqCst) <= 3);
    }
}
