//! Fixed pool of evaluator workers scoring routes against the grid.
//!
//! Each worker owns one slot. A slot is a pair of single-message channels:
//! the caller posts a command on the slot's start channel and then blocks on
//! its done channel until the worker posts the fitness back. A slot serves
//! one request at a time, guarded by its busy flag.
//!
//! Dispatch scans the slots round-robin from a persistent cursor and takes
//! the first idle one. If none is idle the call fails fast with
//! [`SENTINEL_FITNESS`] instead of waiting.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, bounded};

use crate::schema::{Move, Point};

use super::{SENTINEL_FITNESS, SearchContext, evaluate_route};

/// Anything that can score a route and report which slot served it.
pub trait RouteEvaluator {
    /// Number of worker slots.
    fn slot_count(&self) -> usize;

    /// Score one route, blocking until the result is available.
    fn evaluate(&self, start: Point, moves: &[Move]) -> Evaluation;
}

/// Result of one evaluation call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    /// Slot that served the request, `None` if no worker took it.
    pub slot: Option<usize>,
    pub fitness: f64,
}

impl Evaluation {
    fn rejected() -> Self {
        Self {
            slot: None,
            fitness: SENTINEL_FITNESS,
        }
    }
}

/// Request record handed to a worker.
#[derive(Debug, Clone)]
pub struct EvaluationRequest {
    pub start: Point,
    pub moves: Vec<Move>,
}

#[derive(Debug)]
enum WorkerCommand {
    Explore(EvaluationRequest),
    Exit,
}

struct WorkerSlot {
    busy: AtomicBool,
    start_tx: Sender<WorkerCommand>,
    done_rx: Receiver<f64>,
}

/// Clears a slot's busy flag when the call using it returns.
struct SlotGuard<'a>(&'a AtomicBool);

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Pool of long-lived evaluator threads, one per robot slot.
pub struct EvaluatorPool {
    slots: Vec<WorkerSlot>,
    handles: Vec<JoinHandle<()>>,
    cursor: AtomicUsize,
    served: AtomicU64,
    rejected: AtomicU64,
}

impl EvaluatorPool {
    /// Spawn `workers` evaluator threads sharing `ctx`.
    pub fn new(ctx: Arc<SearchContext>, workers: usize) -> Result<Self, PoolError> {
        if workers == 0 {
            return Err(PoolError::NoWorkers);
        }

        let mut pool = Self {
            slots: Vec::with_capacity(workers),
            handles: Vec::with_capacity(workers),
            cursor: AtomicUsize::new(0),
            served: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
        };

        for id in 0..workers {
            let (start_tx, start_rx) = bounded::<WorkerCommand>(1);
            let (done_tx, done_rx) = bounded::<f64>(1);
            let worker_ctx = Arc::clone(&ctx);

            // On error `pool` drops here and shuts down the workers spawned so far.
            let handle = thread::Builder::new()
                .name(format!("rescue-worker-{id}"))
                .spawn(move || worker_loop(id, &worker_ctx, &start_rx, &done_tx))
                .map_err(|source| PoolError::Spawn { id, source })?;

            pool.slots.push(WorkerSlot {
                busy: AtomicBool::new(false),
                start_tx,
                done_rx,
            });
            pool.handles.push(handle);
        }

        log::info!("evaluator pool started with {workers} workers");
        Ok(pool)
    }

    /// Number of worker slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Evaluations completed by a worker.
    pub fn served_count(&self) -> u64 {
        self.served.load(Ordering::Relaxed)
    }

    /// Evaluations that found no idle worker.
    pub fn rejected_count(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    /// Claim the first idle slot at or after the cursor.
    ///
    /// Every call probes all slots once, so with at most `len()` concurrent
    /// callers a call never comes back empty.
    fn acquire(&self) -> Option<usize> {
        let n = self.slots.len();
        let start = self.cursor.load(Ordering::Relaxed);
        for offset in 0..n {
            let idx = (start + offset) % n;
            if self.slots[idx]
                .busy
                .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
            {
                self.cursor.store((idx + 1) % n, Ordering::Relaxed);
                return Some(idx);
            }
        }
        None
    }

    /// Score a route on an idle worker, blocking until it answers.
    pub fn evaluate(&self, start: Point, moves: &[Move]) -> Evaluation {
        let Some(idx) = self.acquire() else {
            self.rejected.fetch_add(1, Ordering::Relaxed);
            log::warn!("no idle evaluator worker, candidate scored as invalid");
            return Evaluation::rejected();
        };

        let slot = &self.slots[idx];
        let _guard = SlotGuard(&slot.busy);

        let request = EvaluationRequest {
            start,
            moves: moves.to_vec(),
        };
        if slot.start_tx.send(WorkerCommand::Explore(request)).is_err() {
            log::error!("evaluator worker {idx} is gone, candidate scored as invalid");
            return Evaluation::rejected();
        }

        match slot.done_rx.recv() {
            Ok(fitness) => {
                self.served.fetch_add(1, Ordering::Relaxed);
                Evaluation {
                    slot: Some(idx),
                    fitness,
                }
            }
            Err(_) => {
                log::error!("evaluator worker {idx} exited mid-evaluation");
                Evaluation::rejected()
            }
        }
    }

    /// Tell every worker to exit and join them.
    ///
    /// Taking `&mut self` guarantees no evaluation is in flight. Calling it
    /// again is a no-op; dropping the pool calls it too.
    pub fn shutdown(&mut self) {
        if self.handles.is_empty() {
            return;
        }

        for (idx, slot) in self.slots.iter().enumerate() {
            if slot.start_tx.send(WorkerCommand::Exit).is_err() {
                log::debug!("worker {idx} already stopped");
            }
        }
        for (idx, handle) in self.handles.drain(..).enumerate() {
            if handle.join().is_err() {
                log::error!("evaluator worker {idx} panicked");
            }
        }

        log::info!(
            "evaluator pool shut down ({} served, {} rejected)",
            self.served_count(),
            self.rejected_count()
        );
    }
}

impl RouteEvaluator for EvaluatorPool {
    fn slot_count(&self) -> usize {
        self.len()
    }

    fn evaluate(&self, start: Point, moves: &[Move]) -> Evaluation {
        EvaluatorPool::evaluate(self, start, moves)
    }
}

impl Drop for EvaluatorPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(
    id: usize,
    ctx: &SearchContext,
    start_rx: &Receiver<WorkerCommand>,
    done_tx: &Sender<f64>,
) {
    while let Ok(command) = start_rx.recv() {
        match command {
            WorkerCommand::Explore(request) => {
                let fitness = evaluate_route(ctx, request.start, &request.moves);
                log::trace!(
                    "worker {id}: {} moves from {} scored {fitness:.2}",
                    request.moves.len(),
                    request.start
                );
                if done_tx.send(fitness).is_err() {
                    break;
                }
            }
            WorkerCommand::Exit => break,
        }
    }
    log::debug!("evaluator worker {id} exiting");
}

/// Evaluator pool setup errors.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("Evaluator pool needs at least one worker")]
    NoWorkers,
    #[error("Failed to spawn evaluator worker {id}: {source}")]
    Spawn {
        id: usize,
        #[source]
        source: io::Error,
    },
}
