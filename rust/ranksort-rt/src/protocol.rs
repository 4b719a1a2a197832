//! The recursive delegate/sort/merge state machine.
//!
//! Every worker, coordinator and helper alike, runs the same
//! procedure over the segment it owns: split at the midpoint, hand halves
//! to delegation targets chosen by the topology, sort whatever stays local,
//! collect the sorted halves, merge. When no target is available the whole
//! segment falls back to the local sequential sort.
//!
//! Per segment the machine passes through
//! `Start → {Delegate, Fallback} → Await → Merge → Done`; a segment of
//! length 0 or 1 is done at `Start` and sends no messages.
//!
//! Delegated sends are fire-and-forget: the half moves into the channel and
//! the sender proceeds immediately to its local work. Collecting a child's
//! result is always a blocking wait: a worker cannot proceed past its
//! children.

use ranksort_core::topology::Targets;
use ranksort_core::{fallback, merge, Rank, SortError, Topology, Value};

use crate::transport::{Endpoint, Probe};

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

/// The part a worker plays in a run, fixed at launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Rank 0: starts the protocol on the full array and keeps the result.
    Coordinator,
    /// Any other rank: serves exactly one delegated segment, then exits.
    Helper,
}

impl Role {
    /// The role a rank is expected to play.
    pub fn of(rank: Rank) -> Role {
        if rank.is_coordinator() {
            Role::Coordinator
        } else {
            Role::Helper
        }
    }
}

// ---------------------------------------------------------------------------
// Worker
// ---------------------------------------------------------------------------

/// A delegated half, between dispatch and collection.
enum Half {
    /// In flight to a child worker; collect with a blocking receive.
    Sent(Rank),
    /// Stayed local and is already sorted.
    Local(Vec<Value>),
}

/// One worker's protocol instance: its endpoint, the run-wide topology, and
/// a merge scratch buffer reused across levels.
pub struct Worker {
    endpoint: Endpoint,
    topology: Topology,
    pool_size: usize,
    scratch: Vec<Value>,
}

impl Worker {
    pub fn new(endpoint: Endpoint, topology: Topology, pool_size: usize) -> Self {
        Self {
            endpoint,
            topology,
            pool_size,
            scratch: Vec::new(),
        }
    }

    pub fn rank(&self) -> Rank {
        self.endpoint.rank()
    }

    /// Broadcast an abort on behalf of this worker.
    pub fn abort(&self, error: &SortError) {
        self.endpoint.control_handle().abort(&error.to_string());
    }

    /// Coordinator entry point: sort `values` in place.
    ///
    /// Must be invoked on rank 0; anything else is a configuration error,
    /// detected before any message is sent.
    pub fn run_coordinator(&mut self, values: &mut Vec<Value>) -> Result<(), SortError> {
        if Role::of(self.rank()) != Role::Coordinator {
            return Err(SortError::Config(format!(
                "coordinator entry invoked on {}; only rank:0 may coordinate",
                self.rank()
            )));
        }
        self.sort_segment(values, 0)
    }

    /// Helper entry point: wait for one delegated segment, sort it with the
    /// same recursive procedure, and return it to the sender.
    ///
    /// A helper accepts from any sender, discovering the segment length and
    /// the sender's identity by probing before the receive. It serves at
    /// most one segment per lifetime; if the run completes without
    /// delegating to this worker, the release broadcast lets it exit clean.
    pub fn run_helper(&mut self) -> Result<(), SortError> {
        if Role::of(self.rank()) != Role::Helper {
            return Err(SortError::Config(format!(
                "helper entry invoked on {}; rank:0 must coordinate",
                self.rank()
            )));
        }
        let (parent, len) = match self.endpoint.probe()? {
            Probe::Released => return Ok(()),
            Probe::Frame { src, len } => (src, len),
        };
        let mut segment = self.endpoint.recv_from(parent, len)?;
        let level = self.topology.starting_level(self.rank());
        self.sort_segment(&mut segment, level)?;
        self.endpoint.send(parent, segment)
    }

    // -- recursive core ----------------------------------------------------

    fn sort_segment(&mut self, segment: &mut Vec<Value>, level: u32) -> Result<(), SortError> {
        if segment.len() <= 1 {
            return Ok(());
        }
        match self.topology {
            Topology::Doubling => self.sort_doubling(segment, level),
            Topology::HeapIndex => self.sort_heap(segment),
        }
    }

    /// Doubling scheme: one delegation per depth, deep local recursion.
    ///
    /// The upper half goes to `rank + 2^level` when that worker exists;
    /// the lower half is recursed at `level + 1` on this worker while the
    /// upper half is in flight.
    fn sort_doubling(&mut self, segment: &mut Vec<Value>, level: u32) -> Result<(), SortError> {
        let targets = self.targets(level);
        let Some(helper) = targets.upper else {
            fallback::sort(segment);
            return Ok(());
        };

        let mid = segment.len() / 2;
        let upper = segment.split_off(mid);
        let upper_len = upper.len();

        self.endpoint.send(helper, upper)?;
        self.sort_segment(segment, level + 1)?;
        let mut sorted_upper = self.endpoint.recv_from(helper, upper_len)?;

        let mid = segment.len();
        segment.append(&mut sorted_upper);
        merge::merge_halves(segment, mid, &mut self.scratch)
    }

    /// Heap-index scheme: one fan-out per worker, no deeper local recursion.
    ///
    /// Both halves are dispatched (sent to a valid child, or fallback-sorted
    /// locally) before either result is collected.
    fn sort_heap(&mut self, segment: &mut Vec<Value>) -> Result<(), SortError> {
        let targets = self.targets(0);

        let mid = segment.len() / 2;
        let upper = segment.split_off(mid);
        let lower = std::mem::take(segment);
        let (lower_len, upper_len) = (lower.len(), upper.len());

        let lower_half = self.dispatch_half(targets.lower, lower)?;
        let upper_half = self.dispatch_half(targets.upper, upper)?;

        let lower_sorted = self.collect_half(lower_half, lower_len)?;
        let mut upper_sorted = self.collect_half(upper_half, upper_len)?;

        *segment = lower_sorted;
        let mid = segment.len();
        segment.append(&mut upper_sorted);
        merge::merge_halves(segment, mid, &mut self.scratch)
    }

    fn dispatch_half(
        &mut self,
        target: Option<Rank>,
        mut half: Vec<Value>,
    ) -> Result<Half, SortError> {
        match target {
            Some(child) => {
                self.endpoint.send(child, half)?;
                Ok(Half::Sent(child))
            }
            None => {
                fallback::sort(&mut half);
                Ok(Half::Local(half))
            }
        }
    }

    fn collect_half(&mut self, half: Half, expected_len: usize) -> Result<Vec<Value>, SortError> {
        match half {
            Half::Sent(child) => self.endpoint.recv_from(child, expected_len),
            Half::Local(segment) => Ok(segment),
        }
    }

    fn targets(&self, level: u32) -> Targets {
        self.topology.targets(self.rank(), level, self.pool_size)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::Domain;
    use std::thread;

    fn run_pair(topology: Topology, input: Vec<Value>) -> (Vec<Value>, usize) {
        let domain = Domain::new(2);
        let traffic = domain.traffic.clone();
        let mut eps = domain.endpoints.into_iter();
        let coordinator = eps.next().unwrap();
        let helper = eps.next().unwrap();

        let handle = thread::spawn(move || {
            let mut worker = Worker::new(helper, topology, 2);
            worker.run_helper()
        });

        let mut worker = Worker::new(coordinator, topology, 2);
        let mut values = input;
        worker.run_coordinator(&mut values).unwrap();
        worker.endpoint.control_handle().release();
        handle.join().unwrap().unwrap();

        (values, traffic.messages())
    }

    #[test]
    fn role_of_rank() {
        assert_eq!(Role::of(Rank::new(0)), Role::Coordinator);
        assert_eq!(Role::of(Rank::new(1)), Role::Helper);
        assert_eq!(Role::of(Rank::new(31)), Role::Helper);
    }

    #[test]
    fn coordinator_entry_rejects_helpers() {
        let domain = Domain::new(2);
        let helper_ep = domain.endpoints.into_iter().nth(1).unwrap();
        let mut worker = Worker::new(helper_ep, Topology::Doubling, 2);
        let err = worker.run_coordinator(&mut vec![1, 2]).unwrap_err();
        assert!(matches!(err, SortError::Config(_)), "{err}");
    }

    #[test]
    fn helper_entry_rejects_the_coordinator() {
        let domain = Domain::new(2);
        let coordinator_ep = domain.endpoints.into_iter().next().unwrap();
        let mut worker = Worker::new(coordinator_ep, Topology::Doubling, 2);
        let err = worker.run_helper().unwrap_err();
        assert!(matches!(err, SortError::Config(_)), "{err}");
    }

    #[test]
    fn two_workers_sort_under_both_schemes() {
        for topology in [Topology::Doubling, Topology::HeapIndex] {
            let (sorted, messages) = run_pair(topology, vec![9, -4, 7, 0, 7, 3]);
            assert_eq!(sorted, vec![-4, 0, 3, 7, 7, 9], "{topology}");
            // One delegation out, one result back.
            assert_eq!(messages, 2, "{topology}");
        }
    }

    #[test]
    fn trivial_segments_send_no_messages() {
        for input in [vec![], vec![42]] {
            let (sorted, messages) = run_pair(Topology::Doubling, input.clone());
            assert_eq!(sorted, input);
            assert_eq!(messages, 0);
        }
    }

    #[test]
    fn single_worker_pool_falls_back_locally() {
        let domain = Domain::new(1);
        let traffic = domain.traffic.clone();
        let ep = domain.endpoints.into_iter().next().unwrap();
        let mut worker = Worker::new(ep, Topology::Doubling, 1);

        let mut values = vec![5, 3, 4, 1, 2];
        worker.run_coordinator(&mut values).unwrap();
        assert_eq!(values, vec![1, 2, 3, 4, 5]);
        assert_eq!(traffic.messages(), 0);
    }
}
