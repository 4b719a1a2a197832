//! The fixed worker pool driving one sort invocation.
//!
//! `sort` spawns one OS thread per helper rank, runs the coordinator on the
//! calling thread, and joins every worker before returning. Workers share
//! nothing but the message domain; the first error anywhere aborts the
//! whole pool; there are no retries and no partial results.

use std::thread;

use ranksort_core::{SortError, Topology, Value};

use crate::protocol::Worker;
use crate::transport::{ControlHandle, Domain, Route};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Startup configuration for a pool, fixed for the whole run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Number of workers, coordinator included. Must be at least 1.
    pub workers: usize,
    /// Delegation addressing scheme.
    pub topology: Topology,
}

impl Default for PoolConfig {
    /// One worker per available CPU, doubling scheme.
    fn default() -> Self {
        Self {
            workers: num_cpus::get().max(1),
            topology: Topology::default(),
        }
    }
}

impl PoolConfig {
    fn validate(&self) -> Result<(), SortError> {
        if self.workers == 0 {
            return Err(SortError::Config(
                "worker pool size must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Run result
// ---------------------------------------------------------------------------

/// The outcome of one completed sort invocation.
#[derive(Debug)]
pub struct SortRun {
    /// The sorted array.
    pub values: Vec<Value>,
    /// Every frame delivery of the run, in send order per sender.
    pub traffic: Vec<Route>,
}

impl SortRun {
    /// Total number of messages the run exchanged.
    pub fn messages(&self) -> usize {
        self.traffic.len()
    }
}

// ---------------------------------------------------------------------------
// Pool entry point
// ---------------------------------------------------------------------------

/// Broadcasts an abort if the owning thread unwinds without reporting an
/// error itself, so no peer stays blocked behind a panic.
struct PanicFence {
    control: ControlHandle,
}

impl Drop for PanicFence {
    fn drop(&mut self) {
        if thread::panicking() {
            self.control.abort("worker thread panicked");
        }
    }
}

/// Sort `values` with a fixed pool of message-passing workers.
///
/// Blocks until every worker has exited. On success the returned
/// [`SortRun`] holds the sorted array and the run's traffic record; on
/// failure the first root-cause error is returned after the whole pool has
/// been unwound.
pub fn sort(values: Vec<Value>, config: &PoolConfig) -> Result<SortRun, SortError> {
    config.validate()?;
    let input_len = values.len();

    let domain = Domain::new(config.workers);
    let traffic = domain.traffic.clone();
    let mut endpoints = domain.endpoints.into_iter();
    let coordinator_ep = endpoints.next().ok_or_else(|| {
        SortError::Config("worker pool size must be at least 1".into())
    })?;

    let mut helpers = Vec::with_capacity(config.workers.saturating_sub(1));
    for endpoint in endpoints {
        let rank = endpoint.rank();
        let topology = config.topology;
        let pool_size = config.workers;
        let handle = thread::Builder::new()
            .name(format!("ranksort-worker-{}", rank.as_u32()))
            .spawn(move || -> Result<(), SortError> {
                let fence = PanicFence {
                    control: endpoint.control_handle(),
                };
                let mut worker = Worker::new(endpoint, topology, pool_size);
                let result = worker.run_helper();
                if let Err(error) = &result {
                    // An Aborted error is an echo of someone else's failure;
                    // re-broadcasting it would only add noise.
                    if !matches!(error, SortError::Aborted { .. }) {
                        worker.abort(error);
                    }
                }
                drop(fence);
                result
            })
            .map_err(|e| SortError::Config(format!("failed to spawn worker thread: {e}")))?;
        helpers.push(handle);
    }

    let control = coordinator_ep.control_handle();
    let mut worker = Worker::new(coordinator_ep, config.topology, config.workers);
    let mut data = values;
    let coordinated = worker.run_coordinator(&mut data);

    match &coordinated {
        // Helpers the recursion never reached are still blocked on their
        // first probe; let them exit.
        Ok(()) => control.release(),
        Err(error) => {
            if !matches!(error, SortError::Aborted { .. }) {
                worker.abort(error);
            }
        }
    }

    // Join every helper. An Aborted error is only an echo of another
    // worker's failure, so a root cause from any worker outranks it.
    let mut root: Option<SortError> = None;
    let mut echo: Option<SortError> = None;
    let mut note = |error: SortError| {
        let slot = match error {
            SortError::Aborted { .. } => &mut echo,
            _ => &mut root,
        };
        if slot.is_none() {
            *slot = Some(error);
        }
    };
    if let Err(error) = coordinated {
        note(error);
    }
    for handle in helpers {
        match handle.join() {
            Ok(Ok(())) => {}
            Ok(Err(error)) => note(error),
            Err(_) => note(SortError::Disconnected("worker thread panicked".into())),
        }
    }
    if let Some(error) = root.or(echo) {
        return Err(error);
    }

    if data.len() != input_len {
        return Err(SortError::length_changed(input_len, data.len()));
    }

    Ok(SortRun {
        values: data,
        traffic: traffic.routes(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_workers_is_a_configuration_error() {
        let config = PoolConfig {
            workers: 0,
            topology: Topology::Doubling,
        };
        let err = sort(vec![1, 2, 3], &config).unwrap_err();
        assert!(matches!(err, SortError::Config(_)), "{err}");
    }

    #[test]
    fn default_config_uses_at_least_one_worker() {
        let config = PoolConfig::default();
        assert!(config.workers >= 1);
        assert_eq!(config.topology, Topology::Doubling);
    }

    #[test]
    fn sorts_with_a_single_worker() {
        let config = PoolConfig {
            workers: 1,
            topology: Topology::Doubling,
        };
        let run = sort(vec![3, 1, 2], &config).unwrap();
        assert_eq!(run.values, vec![1, 2, 3]);
        assert_eq!(run.messages(), 0);
    }

    #[test]
    fn sorts_with_more_workers_than_elements() {
        let config = PoolConfig {
            workers: 8,
            topology: Topology::HeapIndex,
        };
        let run = sort(vec![2, 1], &config).unwrap();
        assert_eq!(run.values, vec![1, 2]);
    }
}
