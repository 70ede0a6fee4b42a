//! Worker-pool stages connected by bounded queues.
//!
//! A stage reads [`PipelineRecord`]s from one queue with `W` workers and
//! writes them, accepted or rejected, to one output queue. Rejected records
//! are forwarded without running the worker, so the collector at the end
//! of the chain sees every record exactly once.
//!
//! The output queue closes when the last worker drops its sender. That is
//! the join barrier: the next stage keeps reading until every worker of
//! this one has finished.

use std::thread::{self, Scope, ScopedJoinHandle};

use async_channel::{Receiver, Sender};
use log::{debug, error};

use crate::error::StageError;
use crate::pipeline::cancel::CancelToken;
use crate::pipeline::report::RejectReason;
use crate::record::PipelineRecord;

/// What a worker decided about one record.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Accept,
    Reject(RejectReason),
}

/// A running stage.
pub struct StageHandle<'scope> {
    name: &'static str,
    output: Receiver<PipelineRecord>,
    workers: Vec<ScopedJoinHandle<'scope, Result<usize, StageError>>>,
}

impl<'scope> StageHandle<'scope> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Queue carrying this stage's results.
    pub fn output(&self) -> Receiver<PipelineRecord> {
        self.output.clone()
    }

    /// Wait for every worker. Returns the number of records the stage
    /// handled, or the first worker failure.
    pub fn join(self) -> Result<usize, StageError> {
        let mut handled = 0;
        let mut failure = None;
        for worker in self.workers {
            match worker.join() {
                Ok(Ok(n)) => handled += n,
                Ok(Err(e)) => {
                    failure.get_or_insert(e);
                }
                Err(_) => {
                    failure.get_or_insert(StageError::Panicked { stage: self.name });
                }
            }
        }
        match failure {
            Some(e) => Err(e),
            None => Ok(handled),
        }
    }
}

/// Start `workers` threads applying workers built by `factory` to records
/// from `input`.
///
/// Each thread calls `factory` once, so per-worker state (a reusable
/// validator, an identity client) lives in the closure it returns. A worker
/// error or panic raises `cancel` and stops the stage.
pub fn spawn_stage<'scope, 'env, F, W>(
    scope: &'scope Scope<'scope, 'env>,
    name: &'static str,
    workers: usize,
    capacity: usize,
    input: Receiver<PipelineRecord>,
    cancel: &CancelToken,
    factory: F,
) -> Result<StageHandle<'scope>, StageError>
where
    F: Fn() -> W,
    W: FnMut(&mut PipelineRecord) -> Result<Outcome, StageError> + Send + 'scope,
{
    let (tx, rx) = async_channel::bounded(capacity);
    cancel.close_on_cancel(&rx);

    let mut handles = Vec::with_capacity(workers);
    for i in 0..workers {
        let work = factory();
        let input = input.clone();
        let output = tx.clone();
        let token = cancel.clone();
        let spawned = thread::Builder::new()
            .name(format!("{name}-{i}"))
            .spawn_scoped(scope, move || run_worker(name, work, input, output, token));
        match spawned {
            Ok(handle) => handles.push(handle),
            Err(source) => {
                cancel.cancel();
                return Err(StageError::Spawn {
                    stage: name,
                    source,
                });
            }
        }
    }

    Ok(StageHandle {
        name,
        output: rx,
        workers: handles,
    })
}

/// Raises the token if the worker thread unwinds, so that neighbouring
/// stages blocked on a queue shared with it wake up.
struct CancelOnPanic<'a> {
    stage: &'static str,
    cancel: &'a CancelToken,
}

impl Drop for CancelOnPanic<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            error!("{} worker panicked", self.stage);
            self.cancel.cancel();
        }
    }
}

fn run_worker<W>(
    name: &'static str,
    mut work: W,
    input: Receiver<PipelineRecord>,
    output: Sender<PipelineRecord>,
    cancel: CancelToken,
) -> Result<usize, StageError>
where
    W: FnMut(&mut PipelineRecord) -> Result<Outcome, StageError>,
{
    let _guard = CancelOnPanic {
        stage: name,
        cancel: &cancel,
    };
    let mut handled = 0;
    while let Ok(mut record) = input.recv_blocking() {
        if cancel.is_cancelled() {
            break;
        }
        if record.rejection.is_none() {
            match work(&mut record) {
                Ok(Outcome::Accept) => {}
                Ok(Outcome::Reject(reason)) => {
                    debug!("{name}: rejected record from {}: {reason}", record.archive);
                    record.rejection = Some(reason);
                }
                Err(e) => {
                    error!("{name}: {e}");
                    cancel.cancel();
                    return Err(e);
                }
            }
        }
        handled += 1;
        if output.send_blocking(record).is_err() {
            break;
        }
    }
    Ok(handled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IdentityExhausted;
    use crate::record::GameRecord;

    fn records(n: usize) -> Vec<PipelineRecord> {
        (0..n)
            .map(|i| {
                let game = GameRecord {
                    length: i,
                    ..GameRecord::default()
                };
                PipelineRecord::new(game, "test")
            })
            .collect()
    }

    #[test]
    fn test_every_record_comes_out_once() {
        let cancel = CancelToken::new();
        let (tx, rx) = async_channel::bounded(4);
        let out = thread::scope(|s| {
            let stage = spawn_stage(s, "odd", 3, 4, rx, &cancel, || {
                |r: &mut PipelineRecord| -> Result<Outcome, StageError> {
                    Ok(if r.game.length % 2 == 1 {
                        Outcome::Reject(RejectReason::Duplicate)
                    } else {
                        Outcome::Accept
                    })
                }
            })
            .unwrap();
            let output = stage.output();
            s.spawn(move || {
                for r in records(100) {
                    tx.send_blocking(r).unwrap();
                }
            });
            let collected: Vec<_> = std::iter::from_fn(|| output.recv_blocking().ok()).collect();
            assert_eq!(stage.join().unwrap(), 100);
            collected
        });
        assert_eq!(out.len(), 100);
        assert_eq!(out.iter().filter(|r| r.is_rejected()).count(), 50);
    }

    #[test]
    fn test_rejected_records_skip_the_worker() {
        let cancel = CancelToken::new();
        let (tx, rx) = async_channel::bounded(4);
        let mut rejected = PipelineRecord::new(GameRecord::default(), "test");
        rejected.rejection = Some(RejectReason::ParseFailed("bad".into()));
        tx.send_blocking(rejected.clone()).unwrap();
        drop(tx);
        thread::scope(|s| {
            let stage = spawn_stage(s, "panics", 1, 4, rx, &cancel, || {
                |_: &mut PipelineRecord| -> Result<Outcome, StageError> {
                    panic!("worker ran on a rejected record")
                }
            })
            .unwrap();
            assert_eq!(stage.output().recv_blocking().unwrap(), rejected);
            assert!(stage.join().is_ok());
        });
    }

    #[test]
    fn test_worker_error_cancels() {
        let cancel = CancelToken::new();
        let (tx, rx) = async_channel::bounded(4);
        cancel.close_on_cancel(&rx);
        thread::scope(|s| {
            let stage = spawn_stage(s, "fails", 2, 4, rx, &cancel, || {
                |_: &mut PipelineRecord| -> Result<Outcome, StageError> {
                    Err(IdentityExhausted { attempts: 1 }.into())
                }
            })
            .unwrap();
            s.spawn(move || {
                // Blocks once the queue fills; cancellation must release it.
                for r in records(1000) {
                    if tx.send_blocking(r).is_err() {
                        break;
                    }
                }
            });
            assert!(matches!(stage.join(), Err(StageError::Identity(_))));
        });
        assert!(cancel.is_cancelled());
    }

    #[test]
    fn test_worker_panic_releases_upstream_stage() {
        let cancel = CancelToken::new();
        let (tx, rx) = async_channel::bounded(1);
        cancel.close_on_cancel(&rx);
        thread::scope(|s| {
            let upstream = spawn_stage(s, "pass", 1, 1, rx, &cancel, || {
                |_: &mut PipelineRecord| -> Result<Outcome, StageError> { Ok(Outcome::Accept) }
            })
            .unwrap();
            let downstream = spawn_stage(s, "buggy", 1, 1, upstream.output(), &cancel, || {
                |_: &mut PipelineRecord| -> Result<Outcome, StageError> { panic!("worker bug") }
            })
            .unwrap();
            let output = downstream.output();
            s.spawn(move || {
                for r in records(50) {
                    if tx.send_blocking(r).is_err() {
                        break;
                    }
                }
            });
            assert!(output.recv_blocking().is_err(), "nothing gets past the panic");
            assert!(matches!(
                downstream.join(),
                Err(StageError::Panicked { stage: "buggy" })
            ));
            // The upstream worker was blocked on the full queue feeding the
            // panicked stage; cancellation must let it finish.
            assert!(upstream.join().is_ok());
        });
        assert!(cancel.is_cancelled());
    }
}
